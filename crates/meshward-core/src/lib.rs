//! Meshward Core - Shared library for the peer membership crates
//!
//! This crate provides the configuration surface and the collaborator
//! contracts (shard resolution, preferred peers) used by the sharder,
//! the rating handler and the discoverers.

pub mod config;
pub mod error;
pub mod preferred;
pub mod shard;

pub use config::{
    ConnectionWatcherType, KadDhtPeerDiscoveryConfig, KadDhtType, NetworkConfig, NodeConfig,
    P2pConfig, PeersRatingConfig, ShardingConfig, ShardingType,
};
pub use error::ConfigError;
pub use preferred::{PreferredPeers, PreferredPeersHolder};
pub use shard::{PeerShardResolver, ShardDirectory, UnknownPeerShardResolver};
