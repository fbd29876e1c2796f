//! Sharder factory
//!
//! Builds the `Sharder` variant named by `ShardingConfig::sharding_type`.

use meshward_core::{PeerShardResolver, PreferredPeersHolder, ShardingConfig, ShardingType};
use meshward_types::PeerId;
use std::sync::Arc;
use tracing::{debug, Span};

use crate::error::ShardingError;
use crate::sharder::{ListsSharder, ListsSharderArgs, NilListSharder, OneListSharder, Sharder};

/// Arguments for `new_sharder`
pub struct SharderFactoryArgs {
    pub peer_resolver: Arc<dyn PeerShardResolver>,
    pub self_peer_id: PeerId,
    pub config: ShardingConfig,
    pub preferred_peers: Arc<dyn PreferredPeersHolder>,
    pub span: Span,
}

/// Create the sharder selected by configuration
pub fn new_sharder(args: SharderFactoryArgs) -> Result<Sharder, ShardingError> {
    let config = &args.config;
    match config.sharding_type {
        ShardingType::ListsSharder => {
            debug!(
                parent: &args.span,
                max_connection_count = config.target_peer_count,
                max_intra_shard_validators = config.max_intra_shard_validators,
                max_cross_shard_validators = config.max_cross_shard_validators,
                max_intra_shard_observers = config.max_intra_shard_observers,
                max_cross_shard_observers = config.max_cross_shard_observers,
                max_seeders = config.max_seeders,
                "Using lists sharder"
            );
            let sharder = ListsSharder::new(ListsSharderArgs {
                peer_resolver: args.peer_resolver,
                self_peer_id: args.self_peer_id,
                config: args.config,
                preferred_peers: args.preferred_peers,
                span: args.span,
            })?;
            Ok(sharder.into())
        }
        ShardingType::OneListSharder => {
            debug!(
                parent: &args.span,
                max_connection_count = config.target_peer_count,
                "Using one list sharder"
            );
            let max_peer_count = config.target_peer_count as usize;
            let sharder = OneListSharder::new(args.self_peer_id, max_peer_count, args.span)?;
            Ok(sharder.into())
        }
        ShardingType::NilListSharder => {
            debug!(parent: &args.span, "Using nil list sharder");
            Ok(NilListSharder::new().into())
        }
    }
}
