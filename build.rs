use tonic_build::manual::{Builder, Method, Service};

const MESSAGES: &str = "crate::network::messages::chord";

fn method(name: &str, route: &str, input: &str, output: &str) -> Method {
    Method::builder()
        .name(name)
        .route_name(route)
        .input_type(format!("{}::{}", MESSAGES, input))
        .output_type(format!("{}::{}", MESSAGES, output))
        .codec_path("tonic::codec::ProstCodec")
        .build()
}

fn main() {
    // Messages are declared with prost derives in src/network/messages/chord.rs,
    // so only the service stubs are generated here and no protoc is needed.
    let service = Service::builder()
        .name("ChordNode")
        .package("chord")
        .method(method("join", "Join", "JoinRequest", "JoinResponse"))
        .method(method("successor", "Successor", "SuccessorRequest", "SuccessorResponse"))
        .method(method("stabilize", "Stabilize", "StabilizeRequest", "StabilizeResponse"))
        .method(method("notify", "Notify", "NotifyRequest", "NotifyResponse"))
        .method(method("check", "Check", "CheckRequest", "CheckResponse"))
        .method(method("leave", "Leave", "LeaveRequest", "LeaveResponse"))
        .build();

    Builder::new()
        .build_server(true)
        .build_client(true)
        .compile(&[service]);

    println!("cargo:rerun-if-changed=build.rs");
}
