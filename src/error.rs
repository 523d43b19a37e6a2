use thiserror::Error;

#[derive(Error, Debug)]
pub enum RingError {
    #[error("Network error: {0}")]
    Network(#[from] NetworkError),

    #[error("Chord protocol error: {0}")]
    Chord(#[from] ChordError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NetworkError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Peer unreachable: {0}")]
    PeerUnreachable(String),

    #[error("Request rejected: {0}")]
    Rejected(String),

    #[error("Remote failure: {0}")]
    Remote(String),

    #[error("gRPC error: {0}")]
    Grpc(String),

    #[error("Request timed out")]
    Timeout,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ChordError {
    #[error("Invalid node ID: {0}")]
    InvalidNodeId(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Failed to join ring: {0}")]
    JoinFailed(String),

    #[error("Lookup failed: {0}")]
    LookupFailed(String),

    #[error("Lookup for {id} exceeded {limit} hops")]
    HopLimitExceeded { id: String, limit: u32 },

    #[error(transparent)]
    Network(#[from] NetworkError),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Failed to initialize logging: {0}")]
    Logging(String),
}
