//! Error types for the discovery module

use meshward_sharding::ShardingError;
use meshward_types::PeerId;
use std::time::Duration;
use thiserror::Error;

/// Discovery error types
#[derive(Debug, Error, Clone, PartialEq)]
pub enum DiscoveryError {
    /// Seeders would be redialed faster than the allowed minimum
    #[error("Invalid seeders reconnection interval: {actual:?}, minimum {minimum:?}")]
    InvalidSeedersReconnectionInterval { actual: Duration, minimum: Duration },

    /// A discovery setting is out of range
    #[error("Invalid value: {0}")]
    InvalidValue(String),

    /// The discoverer was stopped and cannot be bootstrapped again
    #[error("Discoverer stopped")]
    Stopped,

    /// Discoverers spawn tasks and must be created inside a Tokio runtime
    #[error("No Tokio runtime available")]
    NoRuntime,

    /// Error reported by the transport host
    #[error("Host error: {0}")]
    Host(String),

    /// Error reported by the DHT handler
    #[error("Kad-DHT error: {0}")]
    KadDht(String),

    /// The sharder would evict this peer right after connecting
    #[error("Peer not acceptable: {0}")]
    PeerNotAcceptable(PeerId),

    /// The peer is on the deny list
    #[error("Peer denied: {0}")]
    PeerDenied(PeerId),

    #[error(transparent)]
    Sharding(#[from] ShardingError),
}
