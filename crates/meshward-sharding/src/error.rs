//! Error types for the sharding module

use thiserror::Error;

/// Sharder error types
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ShardingError {
    /// The local peer identity is empty
    #[error("Empty self peer id")]
    EmptySelfPeerId,

    /// A resolver is required by this sharder
    #[error("Nil peer shard resolver")]
    NilPeerShardResolver,

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}
