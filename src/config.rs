use crate::chord::types::{NodeId, BITS};
use crate::chord::{
    CHECK_INTERVAL_MS, FINGERS_PER_TICK, FIX_FINGERS_INTERVAL_MS, MAX_LOOKUP_HOPS,
    RPC_TIMEOUT_MS, STABILIZE_INTERVAL_MS, WORKERS,
};
use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Settings of one ring node. Every field has a default, so a config file
/// only needs the values it changes.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PeerConfig {
    /// Ring position; a random one is drawn when absent.
    pub node_id: Option<NodeId>,
    pub host: String,
    /// gRPC port (random if not specified).
    pub port: Option<u16>,
    /// Endpoint other nodes should use, when it differs from `host:port`.
    pub advertise: Option<String>,
    /// Endpoint of a ring member to join through; absent for a bootstrap node.
    pub join: Option<String>,
    pub stabilize_interval_ms: u64,
    pub check_interval_ms: u64,
    pub fix_fingers_interval_ms: u64,
    pub fingers_per_tick: usize,
    pub max_lookup_hops: u32,
    pub rpc_timeout_ms: u64,
    pub workers: usize,
    pub log_level: String,
    /// A log4rs configuration file, replacing the built-in console logger.
    pub log_config: Option<PathBuf>,
}

impl Default for PeerConfig {
    fn default() -> Self {
        Self {
            node_id: None,
            host: "127.0.0.1".to_string(),
            port: None,
            advertise: None,
            join: None,
            stabilize_interval_ms: STABILIZE_INTERVAL_MS,
            check_interval_ms: CHECK_INTERVAL_MS,
            fix_fingers_interval_ms: FIX_FINGERS_INTERVAL_MS,
            fingers_per_tick: FINGERS_PER_TICK,
            max_lookup_hops: MAX_LOOKUP_HOPS,
            rpc_timeout_ms: RPC_TIMEOUT_MS,
            workers: WORKERS,
            log_level: "info".to_string(),
            log_config: None,
        }
    }
}

impl PeerConfig {
    /// Reads a JSON config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path.as_ref())?;
        let config: PeerConfig = serde_json::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let intervals = [
            ("stabilize_interval_ms", self.stabilize_interval_ms),
            ("check_interval_ms", self.check_interval_ms),
            ("fix_fingers_interval_ms", self.fix_fingers_interval_ms),
            ("rpc_timeout_ms", self.rpc_timeout_ms),
        ];
        for (name, value) in intervals {
            if value == 0 {
                return Err(ConfigError::Invalid(format!("{} must be positive", name)));
            }
        }
        if self.fingers_per_tick == 0 || self.fingers_per_tick >= BITS {
            return Err(ConfigError::Invalid(format!(
                "fingers_per_tick must be in 1..{}",
                BITS
            )));
        }
        if self.max_lookup_hops == 0 {
            return Err(ConfigError::Invalid("max_lookup_hops must be positive".into()));
        }
        if self.workers == 0 {
            return Err(ConfigError::Invalid("workers must be positive".into()));
        }
        if self.host.is_empty() {
            return Err(ConfigError::Invalid("host must not be empty".into()));
        }
        Ok(())
    }

    pub fn is_bootstrap(&self) -> bool {
        self.join.is_none()
    }

    /// The endpoint peers reach this node at, given the port actually bound.
    pub fn endpoint(&self, bound_port: u16) -> String {
        self.advertise
            .clone()
            .unwrap_or_else(|| format!("{}:{}", self.host, bound_port))
    }

    pub fn stabilize_interval(&self) -> Duration {
        Duration::from_millis(self.stabilize_interval_ms)
    }

    pub fn check_interval(&self) -> Duration {
        Duration::from_millis(self.check_interval_ms)
    }

    pub fn fix_fingers_interval(&self) -> Duration {
        Duration::from_millis(self.fix_fingers_interval_ms)
    }

    pub fn rpc_timeout(&self) -> Duration {
        Duration::from_millis(self.rpc_timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_are_valid() {
        let config = PeerConfig::default();
        config.validate().unwrap();
        assert!(config.is_bootstrap());
        assert_eq!(config.endpoint(4000), "127.0.0.1:4000");
    }

    #[test]
    fn test_load_partial_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"node_id": "42", "port": 5000, "join": "10.0.0.2:5000", "fingers_per_tick": 16}}"#
        )
        .unwrap();

        let config = PeerConfig::load(file.path()).unwrap();
        assert_eq!(config.node_id, Some(NodeId::from(42u64)));
        assert_eq!(config.port, Some(5000));
        assert_eq!(config.join.as_deref(), Some("10.0.0.2:5000"));
        assert_eq!(config.fingers_per_tick, 16);
        assert_eq!(config.stabilize_interval_ms, STABILIZE_INTERVAL_MS);
        assert!(!config.is_bootstrap());
    }

    #[test]
    fn test_load_rejects_unknown_fields_and_bad_values() {
        let mut unknown = tempfile::NamedTempFile::new().unwrap();
        write!(unknown, r#"{{"prot": 5000}}"#).unwrap();
        assert!(matches!(PeerConfig::load(unknown.path()), Err(ConfigError::Parse(_))));

        let mut zero = tempfile::NamedTempFile::new().unwrap();
        write!(zero, r#"{{"stabilize_interval_ms": 0}}"#).unwrap();
        assert!(matches!(PeerConfig::load(zero.path()), Err(ConfigError::Invalid(_))));

        let mut bad_id = tempfile::NamedTempFile::new().unwrap();
        write!(bad_id, r#"{{"node_id": "abc"}}"#).unwrap();
        assert!(matches!(PeerConfig::load(bad_id.path()), Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_advertised_endpoint_wins() {
        let config = PeerConfig {
            advertise: Some("node-a.internal:7000".into()),
            ..PeerConfig::default()
        };
        assert_eq!(config.endpoint(4000), "node-a.internal:7000");
    }
}
