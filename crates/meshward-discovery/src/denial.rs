//! Temporary peer denial
//!
//! A denied peer is refused when dialed and disconnected by the next
//! eviction pass, until its denial expires.

use meshward_types::PeerId;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tracing::{debug, Span};

use crate::error::DiscoveryError;

pub trait PeerDenialEvaluator: Send + Sync {
    /// Deny `pid` for `duration` from now, replacing any earlier deadline
    fn upsert_peer_id(&self, pid: &PeerId, duration: Duration) -> Result<(), DiscoveryError>;

    fn is_denied(&self, pid: &PeerId) -> bool;
}

/// Denies nobody
#[derive(Debug, Default)]
pub struct DisabledPeerDenialEvaluator;

impl DisabledPeerDenialEvaluator {
    pub fn new() -> Self {
        Self
    }
}

impl PeerDenialEvaluator for DisabledPeerDenialEvaluator {
    fn upsert_peer_id(&self, _pid: &PeerId, _duration: Duration) -> Result<(), DiscoveryError> {
        Ok(())
    }

    fn is_denied(&self, _pid: &PeerId) -> bool {
        false
    }
}

/// In-memory deny list with per-peer deadlines
///
/// Expired entries are dropped lazily on lookup.
pub struct TimedPeerDenialEvaluator {
    denied: Mutex<HashMap<PeerId, Instant>>,
    span: Span,
}

impl TimedPeerDenialEvaluator {
    pub fn new(span: Span) -> Self {
        Self {
            denied: Mutex::new(HashMap::new()),
            span,
        }
    }

    /// Peers currently denied
    pub fn len(&self) -> usize {
        let now = Instant::now();
        let mut denied = self.denied.lock();
        denied.retain(|_, until| *until > now);
        denied.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl PeerDenialEvaluator for TimedPeerDenialEvaluator {
    fn upsert_peer_id(&self, pid: &PeerId, duration: Duration) -> Result<(), DiscoveryError> {
        if pid.is_empty() {
            return Err(DiscoveryError::InvalidValue("empty peer id".into()));
        }
        if duration.is_zero() {
            return Err(DiscoveryError::InvalidValue("zero denial duration".into()));
        }

        debug!(parent: &self.span, pid = %pid, ?duration, "Denying peer");
        self.denied.lock().insert(pid.clone(), Instant::now() + duration);
        Ok(())
    }

    fn is_denied(&self, pid: &PeerId) -> bool {
        let mut denied = self.denied.lock();
        match denied.get(pid) {
            Some(until) if *until > Instant::now() => true,
            Some(_) => {
                denied.remove(pid);
                false
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disabled_denies_nobody() {
        let evaluator = DisabledPeerDenialEvaluator::new();

        assert!(evaluator.upsert_peer_id(&PeerId::default(), Duration::from_secs(1)).is_ok());
        assert!(!evaluator.is_denied(&PeerId::default()));
    }

    #[test]
    fn test_denial_expires() {
        let evaluator = TimedPeerDenialEvaluator::new(Span::none());
        let pid = PeerId::from("peer");

        evaluator.upsert_peer_id(&pid, Duration::from_millis(50)).unwrap();
        assert!(evaluator.is_denied(&pid));
        assert!(!evaluator.is_denied(&PeerId::from("other")));
        assert_eq!(evaluator.len(), 1);

        std::thread::sleep(Duration::from_millis(80));
        assert!(!evaluator.is_denied(&pid));
        assert!(evaluator.is_empty());
    }

    #[test]
    fn test_upsert_replaces_deadline() {
        let evaluator = TimedPeerDenialEvaluator::new(Span::none());
        let pid = PeerId::from("peer");

        evaluator.upsert_peer_id(&pid, Duration::from_millis(20)).unwrap();
        evaluator.upsert_peer_id(&pid, Duration::from_secs(60)).unwrap();

        std::thread::sleep(Duration::from_millis(40));
        assert!(evaluator.is_denied(&pid));
    }

    #[test]
    fn test_invalid_upserts_rejected() {
        let evaluator = TimedPeerDenialEvaluator::new(Span::none());

        assert!(matches!(
            evaluator.upsert_peer_id(&PeerId::default(), Duration::from_secs(1)),
            Err(DiscoveryError::InvalidValue(_))
        ));
        assert!(matches!(
            evaluator.upsert_peer_id(&PeerId::from("peer"), Duration::ZERO),
            Err(DiscoveryError::InvalidValue(_))
        ));
        assert!(evaluator.is_empty());
    }
}
