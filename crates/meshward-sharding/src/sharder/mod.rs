//! Sharders
//!
//! This module contains the eviction policies:
//!
//! - `ListsSharder`: quota per peer class (validators, observers, seeders, unknown)
//! - `OneListSharder`: one quota over all connected peers
//! - `NilListSharder`: never evicts, sharding disabled
//!
//! The policy is chosen once from configuration and wrapped in the closed
//! `Sharder` enum that the connection management layer holds.

mod lists;
mod nil_list;
mod one_list;
mod seeders;

pub use lists::{ListsSharder, ListsSharderArgs};
pub use nil_list::NilListSharder;
pub use one_list::OneListSharder;
pub use seeders::SeederSet;

use meshward_core::PeerShardResolver;
use meshward_types::PeerId;
use std::sync::Arc;

use crate::error::ShardingError;

/// Eviction policy selected by configuration
pub enum Sharder {
    Lists(ListsSharder),
    OneList(OneListSharder),
    NilList(NilListSharder),
}

impl Sharder {
    /// Peers to disconnect so that the connected snapshot fits the budgets
    pub fn compute_eviction_list(&self, connected: &[PeerId]) -> Vec<PeerId> {
        match self {
            Sharder::Lists(sharder) => sharder.compute_eviction_list(connected),
            Sharder::OneList(sharder) => sharder.compute_eviction_list(connected),
            Sharder::NilList(sharder) => sharder.compute_eviction_list(connected),
        }
    }

    /// Whether `pid` is part of `list`
    pub fn has(&self, pid: &PeerId, list: &[PeerId]) -> bool {
        match self {
            Sharder::NilList(_) => false,
            Sharder::Lists(_) | Sharder::OneList(_) => list.contains(pid),
        }
    }

    pub fn set_seeders(&self, addresses: Vec<String>) {
        if let Sharder::Lists(sharder) = self {
            sharder.set_seeders(addresses);
        }
    }

    pub fn is_seeder(&self, pid: &PeerId) -> bool {
        match self {
            Sharder::Lists(sharder) => sharder.is_seeder(pid),
            Sharder::OneList(_) | Sharder::NilList(_) => false,
        }
    }

    /// Swap the resolver; `None` resets and is only valid where no resolver is used
    pub fn set_peer_shard_resolver(
        &self,
        resolver: Option<Arc<dyn PeerShardResolver>>,
    ) -> Result<(), ShardingError> {
        match self {
            Sharder::Lists(sharder) => sharder.set_peer_shard_resolver(resolver),
            Sharder::OneList(_) | Sharder::NilList(_) => Ok(()),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Sharder::Lists(sharder) => sharder.name(),
            Sharder::OneList(sharder) => sharder.name(),
            Sharder::NilList(sharder) => sharder.name(),
        }
    }
}

impl From<ListsSharder> for Sharder {
    fn from(sharder: ListsSharder) -> Self {
        Sharder::Lists(sharder)
    }
}

impl From<OneListSharder> for Sharder {
    fn from(sharder: OneListSharder) -> Self {
        Sharder::OneList(sharder)
    }
}

impl From<NilListSharder> for Sharder {
    fn from(sharder: NilListSharder) -> Self {
        Sharder::NilList(sharder)
    }
}
