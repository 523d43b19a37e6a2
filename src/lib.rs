//! Chord ring maintenance: a 256-bit identifier ring whose nodes join,
//! stabilize and repair their routing tables over gRPC.

pub mod chord;
pub mod config;
pub mod error;
pub mod logging;
pub mod network;

pub use chord::events::RingEvent;
pub use chord::types::{Node, NodeId};
pub use config::PeerConfig;
pub use error::{ChordError, ConfigError, NetworkError, RingError};
pub use network::node::ChordPeer;
