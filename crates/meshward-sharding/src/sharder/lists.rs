//! Lists Sharder
//!
//! Splits the connected peers into six buckets (intra/cross shard
//! validators, intra/cross shard observers, seeders, unknown) and evicts the
//! excess of every bucket that went over its quota.
//!
//! Preferred peers and configured seeders count toward their bucket but are
//! never picked for eviction. Within a bucket the furthest peers in the
//! Kademlia key space go first.

use meshward_core::{PeerShardResolver, PreferredPeersHolder, ShardingConfig};
use meshward_types::{PeerId, PeerType, ShardId};
use parking_lot::RwLock;
use std::sync::Arc;
use tracing::{debug, trace, Span};

use super::SeederSet;
use crate::distance::sort_by_distance;
use crate::error::ShardingError;
use crate::types::{PeerBucket, ShardingQuotas, LISTS_SHARDER_NAME};

/// Arguments for `ListsSharder::new`
pub struct ListsSharderArgs {
    pub peer_resolver: Arc<dyn PeerShardResolver>,
    pub self_peer_id: PeerId,
    pub config: ShardingConfig,
    pub preferred_peers: Arc<dyn PreferredPeersHolder>,
    pub span: Span,
}

/// Quota-per-class sharder
pub struct ListsSharder {
    peer_resolver: RwLock<Arc<dyn PeerShardResolver>>,
    self_peer_id: PeerId,
    quotas: ShardingQuotas,
    preferred_peers: Arc<dyn PreferredPeersHolder>,
    seeders: SeederSet,
    span: Span,
}

impl ListsSharder {
    pub fn new(args: ListsSharderArgs) -> Result<Self, ShardingError> {
        if args.self_peer_id.is_empty() {
            return Err(ShardingError::EmptySelfPeerId);
        }
        let quotas = ShardingQuotas::from_config(&args.config)?;

        Ok(Self {
            peer_resolver: RwLock::new(args.peer_resolver),
            self_peer_id: args.self_peer_id,
            quotas,
            preferred_peers: args.preferred_peers,
            seeders: SeederSet::new(),
            span: args.span,
        })
    }

    pub fn quotas(&self) -> &ShardingQuotas {
        &self.quotas
    }

    /// Compute which of the connected peers should be disconnected
    pub fn compute_eviction_list(&self, connected: &[PeerId]) -> Vec<PeerId> {
        let buckets = self.split_peers(connected);
        let mut evicted = Vec::new();

        for bucket in PeerBucket::ALL {
            let members = &buckets[bucket.index()];
            let quota = self.quotas.quota_for(bucket);
            if members.len() <= quota {
                continue;
            }

            let excess = members.len() - quota;
            let before = evicted.len();
            // Members are sorted closest first
            evicted.extend(
                members
                    .iter()
                    .rev()
                    .filter(|pid| self.is_evictable(pid))
                    .take(excess)
                    .cloned(),
            );

            let selected = evicted.len() - before;
            if selected < excess {
                debug!(
                    parent: &self.span,
                    bucket = %bucket,
                    population = members.len(),
                    quota,
                    evictable = selected,
                    "Bucket over quota but not enough evictable peers"
                );
            }
        }

        if !evicted.is_empty() {
            debug!(
                parent: &self.span,
                connected = connected.len(),
                evicted = evicted.len(),
                "Computed eviction list"
            );
        }

        evicted
    }

    pub fn set_seeders(&self, addresses: Vec<String>) {
        trace!(parent: &self.span, seeders = addresses.len(), "Setting seeders");
        self.seeders.replace(addresses);
    }

    pub fn is_seeder(&self, pid: &PeerId) -> bool {
        self.seeders.contains(pid)
    }

    /// Replace the resolver; a sharder classifying peers cannot run without one
    pub fn set_peer_shard_resolver(
        &self,
        resolver: Option<Arc<dyn PeerShardResolver>>,
    ) -> Result<(), ShardingError> {
        let resolver = resolver.ok_or(ShardingError::NilPeerShardResolver)?;
        *self.peer_resolver.write() = resolver;
        Ok(())
    }

    fn is_evictable(&self, pid: &PeerId) -> bool {
        !self.preferred_peers.contains(pid) && !self.seeders.contains(pid)
    }

    /// Classify every peer except ourselves, each bucket sorted closest first
    fn split_peers(&self, connected: &[PeerId]) -> [Vec<PeerId>; 6] {
        let resolver = self.peer_resolver.read().clone();
        // Re-resolved on every call, our own shard may change
        let self_shard = resolver.get_peer_info(&self.self_peer_id).shard_id;

        let mut buckets: [Vec<PeerId>; 6] = Default::default();
        for pid in connected {
            if *pid == self.self_peer_id {
                continue;
            }
            let bucket = self.classify(pid, resolver.as_ref(), self_shard);
            buckets[bucket.index()].push(pid.clone());
        }

        for members in buckets.iter_mut() {
            sort_by_distance(members, &self.self_peer_id);
        }
        buckets
    }

    fn classify(
        &self,
        pid: &PeerId,
        resolver: &dyn PeerShardResolver,
        self_shard: ShardId,
    ) -> PeerBucket {
        if self.seeders.contains(pid) {
            return PeerBucket::Seeders;
        }

        let info = resolver.get_peer_info(pid);
        let same_shard = info.shard_id == self_shard;
        match info.peer_type {
            PeerType::Seeder => PeerBucket::Seeders,
            PeerType::Validator if same_shard => PeerBucket::IntraShardValidators,
            PeerType::Validator => PeerBucket::CrossShardValidators,
            PeerType::Observer if same_shard => PeerBucket::IntraShardObservers,
            PeerType::Observer => PeerBucket::CrossShardObservers,
            PeerType::Unknown => PeerBucket::Unknown,
        }
    }

    pub fn name(&self) -> &'static str {
        LISTS_SHARDER_NAME
    }
}
