//! One List Sharder
//!
//! Ignores peer roles and keeps a single budget over every connected peer.

use meshward_types::PeerId;
use tracing::{debug, Span};

use crate::distance::sort_by_distance;
use crate::error::ShardingError;
use crate::types::ONE_LIST_SHARDER_NAME;

/// Single quota sharder
#[derive(Debug)]
pub struct OneListSharder {
    self_peer_id: PeerId,
    max_peer_count: usize,
    span: Span,
}

impl OneListSharder {
    pub fn new(
        self_peer_id: PeerId,
        max_peer_count: usize,
        span: Span,
    ) -> Result<Self, ShardingError> {
        if self_peer_id.is_empty() {
            return Err(ShardingError::EmptySelfPeerId);
        }

        Ok(Self {
            self_peer_id,
            max_peer_count,
            span,
        })
    }

    /// Evict the furthest peers above the budget; never ourselves
    pub fn compute_eviction_list(&self, connected: &[PeerId]) -> Vec<PeerId> {
        let mut peers: Vec<PeerId> = connected
            .iter()
            .filter(|pid| **pid != self.self_peer_id)
            .cloned()
            .collect();
        if peers.len() <= self.max_peer_count {
            return Vec::new();
        }

        sort_by_distance(&mut peers, &self.self_peer_id);
        let evicted = peers.split_off(self.max_peer_count);
        debug!(
            parent: &self.span,
            connected = connected.len(),
            max_peer_count = self.max_peer_count,
            evicted = evicted.len(),
            "Computed eviction list"
        );
        evicted
    }

    pub fn max_peer_count(&self) -> usize {
        self.max_peer_count
    }

    pub fn name(&self) -> &'static str {
        ONE_LIST_SHARDER_NAME
    }
}
