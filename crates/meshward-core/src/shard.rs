//! Peer shard resolution

use meshward_types::{PeerId, PeerShardInfo};
use parking_lot::RwLock;
use std::collections::HashMap;

/// Maps a peer identity to its role and shard
///
/// Implementations must be total: peers nobody knows about resolve to
/// `PeerType::Unknown`.
pub trait PeerShardResolver: Send + Sync {
    fn get_peer_info(&self, pid: &PeerId) -> PeerShardInfo;
}

/// Resolver that reports every peer as unknown
#[derive(Debug, Clone, Copy, Default)]
pub struct UnknownPeerShardResolver;

impl PeerShardResolver for UnknownPeerShardResolver {
    fn get_peer_info(&self, _pid: &PeerId) -> PeerShardInfo {
        PeerShardInfo::unknown()
    }
}

/// In-memory resolver fed by whoever learns peer roles (heartbeats, node lists)
#[derive(Debug, Default)]
pub struct ShardDirectory {
    peers: RwLock<HashMap<PeerId, PeerShardInfo>>,
}

impl ShardDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register or replace the info of a peer
    pub fn register(&self, pid: PeerId, info: PeerShardInfo) {
        self.peers.write().insert(pid, info);
    }

    pub fn remove(&self, pid: &PeerId) -> Option<PeerShardInfo> {
        self.peers.write().remove(pid)
    }

    pub fn get(&self, pid: &PeerId) -> Option<PeerShardInfo> {
        self.peers.read().get(pid).copied()
    }

    pub fn len(&self) -> usize {
        self.peers.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.peers.read().is_empty()
    }
}

impl PeerShardResolver for ShardDirectory {
    fn get_peer_info(&self, pid: &PeerId) -> PeerShardInfo {
        self.get(pid).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use meshward_types::PeerType;

    #[test]
    fn test_unknown_resolver() {
        let resolver = UnknownPeerShardResolver;
        let info = resolver.get_peer_info(&PeerId::from(""));

        assert_eq!(info, PeerShardInfo::unknown());
        assert_eq!(info.peer_type, PeerType::Unknown);
    }

    #[test]
    fn test_shard_directory() {
        let directory = ShardDirectory::new();
        let pid = PeerId::from("validator-1");

        assert_eq!(directory.get_peer_info(&pid), PeerShardInfo::unknown());

        directory.register(pid.clone(), PeerShardInfo::validator(2));
        assert_eq!(directory.len(), 1);
        assert_eq!(directory.get_peer_info(&pid), PeerShardInfo::validator(2));

        // Re-registering replaces the previous role
        directory.register(pid.clone(), PeerShardInfo::observer(3));
        assert_eq!(directory.get_peer_info(&pid).peer_type, PeerType::Observer);

        directory.remove(&pid);
        assert!(directory.is_empty());
        assert_eq!(directory.get_peer_info(&pid), PeerShardInfo::unknown());
    }
}
