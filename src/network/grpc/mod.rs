pub mod client;
pub mod server;
pub mod thread;

pub use client::{ChordGrpcClient, GrpcTransport};
pub use thread::GrpcServerHandle;
