//! Kademlia distance ordering
//!
//! Peers are ranked by the XOR distance between the blake3 digests of their
//! identity and ours. The routing table keeps close peers, so the furthest
//! ones are the cheapest to drop and reacquire.

use blake3::Hasher;
use meshward_types::PeerId;

/// XOR distance between two identities in the hashed key space
pub fn kad_distance(a: &PeerId, b: &PeerId) -> [u8; 32] {
    let ha = hash_id(a);
    let hb = hash_id(b);

    let mut out = [0u8; 32];
    for (i, byte) in out.iter_mut().enumerate() {
        *byte = ha[i] ^ hb[i];
    }
    out
}

fn hash_id(pid: &PeerId) -> [u8; 32] {
    let mut hasher = Hasher::new();
    hasher.update(pid.as_bytes());
    *hasher.finalize().as_bytes()
}

/// Sort peers closest first relative to `reference`
pub fn sort_by_distance(peers: &mut [PeerId], reference: &PeerId) {
    peers.sort_by_cached_key(|pid| kad_distance(pid, reference));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_distance_to_self_is_zero() {
        let pid = PeerId::from("self");
        assert_eq!(kad_distance(&pid, &pid), [0u8; 32]);
    }

    #[test]
    fn test_distance_is_symmetric() {
        let a = PeerId::from("a");
        let b = PeerId::from("b");
        assert_eq!(kad_distance(&a, &b), kad_distance(&b, &a));
    }

    #[test]
    fn test_sort_by_distance() {
        let reference = PeerId::from("self");
        let mut peers: Vec<PeerId> = (0..20).map(|i| PeerId::from(format!("peer-{i}"))).collect();
        sort_by_distance(&mut peers, &reference);

        for pair in peers.windows(2) {
            assert!(kad_distance(&pair[0], &reference) <= kad_distance(&pair[1], &reference));
        }
    }
}
