//! Seeder identity set

use meshward_types::PeerId;
use parking_lot::RwLock;
use std::collections::HashSet;

/// Identities of the configured seeders, replaced wholesale
///
/// Only addresses ending in `/p2p/<id>` name a seeder; others are skipped.
#[derive(Debug, Default)]
pub struct SeederSet {
    peers: RwLock<HashSet<PeerId>>,
}

impl SeederSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn replace(&self, addresses: Vec<String>) {
        let peers = addresses
            .iter()
            .filter_map(|address| PeerId::from_address(address))
            .collect();
        *self.peers.write() = peers;
    }

    pub fn contains(&self, pid: &PeerId) -> bool {
        !pid.is_empty() && self.peers.read().contains(pid)
    }

    pub fn len(&self) -> usize {
        self.peers.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.peers.read().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seeder_lookup_by_address() {
        let seeders = SeederSet::new();
        let seeder = PeerId::from("seeder");
        let other = PeerId::from("other");

        assert!(!seeders.contains(&seeder));

        seeders.replace(vec![format!("/ip4/10.0.0.1/tcp/10000/p2p/{}", seeder.pretty())]);
        assert!(seeders.contains(&seeder));
        assert!(!seeders.contains(&other));
        assert!(!seeders.contains(&PeerId::default()));

        seeders.replace(vec![]);
        assert!(seeders.is_empty());
        assert!(!seeders.contains(&seeder));
    }

    #[test]
    fn test_identity_must_match_exactly() {
        let seeders = SeederSet::new();
        let seeder = PeerId::from("seeder");
        // "a" prints as "61", which appears in the address host part
        let lookalike = PeerId::from("a");

        seeders.replace(vec![format!("/ip4/10.0.0.61/tcp/10000/p2p/{}", seeder.pretty())]);
        assert!(seeders.contains(&seeder));
        assert!(!seeders.contains(&lookalike));
    }

    #[test]
    fn test_addresses_without_identity_are_skipped() {
        let seeders = SeederSet::new();
        seeders.replace(vec![
            "/ip4/10.0.0.1/tcp/10000".to_string(),
            format!("/p2p/{}", PeerId::from("seeder").pretty()),
        ]);

        assert_eq!(seeders.len(), 1);
    }
}
