//! Wire messages of the `chord.ChordNode` service.
//!
//! Identifiers travel as decimal strings. Every request carries the sender in
//! `requesting_node`.

#[derive(Clone, PartialEq, Eq, ::prost::Message)]
pub struct NodeInfo {
    #[prost(string, tag = "1")]
    pub node_id: ::prost::alloc::string::String,
    #[prost(string, tag = "2")]
    pub address: ::prost::alloc::string::String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct JoinRequest {
    #[prost(message, optional, tag = "1")]
    pub requesting_node: ::core::option::Option<NodeInfo>,
    /// Number of times the join has already been forwarded.
    #[prost(uint32, tag = "2")]
    pub hops: u32,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct JoinResponse {
    #[prost(message, optional, tag = "1")]
    pub successor: ::core::option::Option<NodeInfo>,
    #[prost(message, optional, tag = "2")]
    pub predecessor: ::core::option::Option<NodeInfo>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct SuccessorRequest {
    #[prost(message, optional, tag = "1")]
    pub requesting_node: ::core::option::Option<NodeInfo>,
    #[prost(string, tag = "2")]
    pub id: ::prost::alloc::string::String,
    /// Number of times the lookup has already been forwarded.
    #[prost(uint32, tag = "3")]
    pub hops: u32,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct SuccessorResponse {
    #[prost(message, optional, tag = "1")]
    pub successor: ::core::option::Option<NodeInfo>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct StabilizeRequest {
    #[prost(message, optional, tag = "1")]
    pub requesting_node: ::core::option::Option<NodeInfo>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct StabilizeResponse {
    #[prost(message, optional, tag = "1")]
    pub predecessor: ::core::option::Option<NodeInfo>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct NotifyRequest {
    #[prost(message, optional, tag = "1")]
    pub requesting_node: ::core::option::Option<NodeInfo>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct NotifyResponse {}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct CheckRequest {
    #[prost(message, optional, tag = "1")]
    pub requesting_node: ::core::option::Option<NodeInfo>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct CheckResponse {
    #[prost(message, optional, tag = "1")]
    pub node: ::core::option::Option<NodeInfo>,
    /// Unix timestamp (milliseconds) at which the responder answered.
    #[prost(int64, tag = "2")]
    pub timestamp: i64,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct LeaveRequest {
    #[prost(message, optional, tag = "1")]
    pub requesting_node: ::core::option::Option<NodeInfo>,
    #[prost(message, optional, tag = "2")]
    pub predecessor: ::core::option::Option<NodeInfo>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct LeaveResponse {}

include!(concat!(env!("OUT_DIR"), "/chord.ChordNode.rs"));
