//! Preferred peers, kept connected ahead of everyone else

use meshward_types::PeerId;
use parking_lot::RwLock;
use std::collections::HashSet;

/// Answers whether a peer must be retained during eviction
pub trait PreferredPeersHolder: Send + Sync {
    fn contains(&self, pid: &PeerId) -> bool;
}

/// Mutable set of preferred peers
#[derive(Debug, Default)]
pub struct PreferredPeers {
    peers: RwLock<HashSet<PeerId>>,
}

impl PreferredPeers {
    pub fn new(peers: impl IntoIterator<Item = PeerId>) -> Self {
        Self {
            peers: RwLock::new(peers.into_iter().collect()),
        }
    }

    pub fn insert(&self, pid: PeerId) -> bool {
        self.peers.write().insert(pid)
    }

    pub fn remove(&self, pid: &PeerId) -> bool {
        self.peers.write().remove(pid)
    }

    pub fn len(&self) -> usize {
        self.peers.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.peers.read().is_empty()
    }
}

impl PreferredPeersHolder for PreferredPeers {
    fn contains(&self, pid: &PeerId) -> bool {
        self.peers.read().contains(pid)
    }
}
