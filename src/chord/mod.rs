pub mod client;
pub mod events;
pub mod routing;
pub mod scheduler;
pub mod service;
pub mod types;
pub mod workers;

// Chord configuration defaults
pub const STABILIZE_INTERVAL_MS: u64 = 2_000;
pub const CHECK_INTERVAL_MS: u64 = 2_000;
pub const FIX_FINGERS_INTERVAL_MS: u64 = 2_000;
pub const FINGERS_PER_TICK: usize = 8;
pub const MAX_LOOKUP_HOPS: u32 = 64;
pub const RPC_TIMEOUT_MS: u64 = 3_000;
pub const WORKERS: usize = 4;
