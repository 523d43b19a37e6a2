use crate::chord::types::{Node, NodeId};
use crate::error::{ChordError, NetworkError};
use crate::network::messages::chord::NodeInfo;
use tonic::{Code, Status};

impl From<&Node> for NodeInfo {
    fn from(node: &Node) -> Self {
        NodeInfo {
            node_id: node.id.to_decimal(),
            address: node.endpoint.clone(),
        }
    }
}

impl From<Node> for NodeInfo {
    fn from(node: Node) -> Self {
        NodeInfo::from(&node)
    }
}

impl TryFrom<NodeInfo> for Node {
    type Error = ChordError;

    fn try_from(info: NodeInfo) -> Result<Self, Self::Error> {
        let id: NodeId = info.node_id.parse()?;
        if info.address.is_empty() {
            return Err(ChordError::InvalidRequest(format!(
                "node {} has no address",
                id
            )));
        }
        Ok(Node {
            id,
            endpoint: info.address,
        })
    }
}

/// Decodes a node field that the protocol requires to be present.
pub fn required_node(info: Option<NodeInfo>, field: &str) -> Result<Node, ChordError> {
    info.ok_or_else(|| ChordError::InvalidRequest(format!("missing {}", field)))?
        .try_into()
}

pub fn optional_node(info: Option<NodeInfo>) -> Result<Option<Node>, ChordError> {
    info.map(Node::try_from).transpose()
}

impl From<ChordError> for Status {
    fn from(error: ChordError) -> Self {
        match error {
            ChordError::InvalidNodeId(_) | ChordError::InvalidRequest(_) => {
                Status::invalid_argument(error.to_string())
            }
            ChordError::HopLimitExceeded { .. } => Status::resource_exhausted(error.to_string()),
            ChordError::Network(_) => Status::unavailable(error.to_string()),
            ChordError::JoinFailed(_) | ChordError::LookupFailed(_) => {
                Status::internal(error.to_string())
            }
        }
    }
}

impl From<Status> for NetworkError {
    fn from(status: Status) -> Self {
        let message = status.message().to_string();
        match status.code() {
            Code::InvalidArgument => NetworkError::Rejected(message),
            Code::Unavailable => NetworkError::PeerUnreachable(message),
            Code::DeadlineExceeded => NetworkError::Timeout,
            _ => NetworkError::Remote(message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_info_round_trip_uses_decimal_ids() {
        let node = Node::new(NodeId::pow2(70), "10.0.0.1:4000");
        let info = NodeInfo::from(&node);
        assert_eq!(info.node_id, "1180591620717411303424");
        assert_eq!(Node::try_from(info).unwrap(), node);
    }

    #[test]
    fn test_missing_or_malformed_nodes_are_rejected() {
        assert!(matches!(
            required_node(None, "requesting_node"),
            Err(ChordError::InvalidRequest(_))
        ));
        let bad_id = NodeInfo {
            node_id: "0x12".into(),
            address: "a:1".into(),
        };
        assert!(matches!(
            required_node(Some(bad_id), "requesting_node"),
            Err(ChordError::InvalidNodeId(_))
        ));
        let no_address = NodeInfo {
            node_id: "12".into(),
            address: String::new(),
        };
        assert!(optional_node(Some(no_address)).is_err());
        assert_eq!(optional_node(None).unwrap(), None);
    }

    #[test]
    fn test_validation_errors_survive_the_wire() {
        let status = Status::from(ChordError::InvalidRequest("missing requesting_node".into()));
        assert_eq!(status.code(), Code::InvalidArgument);
        assert!(matches!(NetworkError::from(status), NetworkError::Rejected(_)));
    }
}
