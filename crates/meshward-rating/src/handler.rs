//! Peers rating handler
//!
//! Ratings live in two caches: the top rated cache holds peers rated zero or
//! above, the bad rated cache holds negative ones. A peer is in at most one
//! of them; crossing zero moves it under the peer's stripe lock.

use meshward_core::PeersRatingConfig;
use meshward_types::PeerId;
use parking_lot::Mutex;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use tracing::{debug, trace, Span};

use crate::cache::{LruRatingCache, RatingCache};
use crate::error::RatingError;

/// Lowest rating a peer can have
pub const MIN_RATING: i32 = -100;

/// Highest rating a peer can have
pub const MAX_RATING: i32 = 100;

/// Rating of a peer on first contact
pub const DEFAULT_RATING: i32 = 0;

/// Applied on every `increase_rating`
pub const INCREASE_FACTOR: i32 = 2;

/// Applied on every `decrease_rating`
pub const DECREASE_FACTOR: i32 = -1;

const LOCK_STRIPES: usize = 64;

/// Arguments for `PeersRatingHandler::new`
pub struct PeersRatingHandlerArgs {
    pub top_rated_cache: Arc<dyn RatingCache>,
    pub bad_rated_cache: Arc<dyn RatingCache>,
    pub span: Span,
}

/// Tracks a bounded reputation score per peer
pub struct PeersRatingHandler {
    top_rated_cache: Arc<dyn RatingCache>,
    bad_rated_cache: Arc<dyn RatingCache>,
    /// Serializes updates of the same peer, different peers rarely share a stripe
    stripes: Vec<Mutex<()>>,
    span: Span,
}

impl PeersRatingHandler {
    pub fn new(args: PeersRatingHandlerArgs) -> Self {
        Self {
            top_rated_cache: args.top_rated_cache,
            bad_rated_cache: args.bad_rated_cache,
            stripes: (0..LOCK_STRIPES).map(|_| Mutex::new(())).collect(),
            span: args.span,
        }
    }

    /// Create a handler backed by LRU caches sized from configuration
    pub fn from_config(config: &PeersRatingConfig, span: Span) -> Result<Self, RatingError> {
        let top_rated_cache =
            LruRatingCache::new("TopRatedCache", config.top_rated_cache_capacity)?;
        let bad_rated_cache =
            LruRatingCache::new("BadRatedCache", config.bad_rated_cache_capacity)?;

        Ok(Self::new(PeersRatingHandlerArgs {
            top_rated_cache: Arc::new(top_rated_cache),
            bad_rated_cache: Arc::new(bad_rated_cache),
            span,
        }))
    }

    pub fn increase_rating(&self, pid: &PeerId) {
        self.update_rating(pid, INCREASE_FACTOR);
    }

    pub fn decrease_rating(&self, pid: &PeerId) {
        self.update_rating(pid, DECREASE_FACTOR);
    }

    /// Current rating of a peer, if any cache knows it
    pub fn rating(&self, pid: &PeerId) -> Option<i32> {
        let _guard = self.stripe(pid).lock();
        self.top_rated_cache
            .get(pid)
            .or_else(|| self.bad_rated_cache.get(pid))
    }

    fn update_rating(&self, pid: &PeerId, delta: i32) {
        let _guard = self.stripe(pid).lock();

        let (old_rating, in_top) = match self.top_rated_cache.get(pid) {
            Some(rating) => (rating, true),
            None => match self.bad_rated_cache.get(pid) {
                Some(rating) => (rating, false),
                None => {
                    // First contact only seeds the peer
                    self.top_rated_cache.put(pid.clone(), DEFAULT_RATING);
                    return;
                }
            },
        };

        let new_rating = (old_rating + delta).clamp(MIN_RATING, MAX_RATING);
        if new_rating >= DEFAULT_RATING {
            self.top_rated_cache.put(pid.clone(), new_rating);
            if !in_top {
                self.bad_rated_cache.remove(pid);
                trace!(parent: &self.span, pid = %pid, rating = new_rating, "Peer moved to top rated");
            }
        } else {
            self.bad_rated_cache.put(pid.clone(), new_rating);
            if in_top {
                self.top_rated_cache.remove(pid);
                trace!(parent: &self.span, pid = %pid, rating = new_rating, "Peer moved to bad rated");
            }
        }
    }

    /// Up to `count` peers from `candidates`, top rated ones first
    ///
    /// Relative input order is kept within each tier. Peers neither cache
    /// knows are seeded as top rated.
    pub fn get_top_rated_peers_from_list(&self, candidates: &[PeerId], count: usize) -> Vec<PeerId> {
        if count == 0 || candidates.is_empty() {
            return Vec::new();
        }

        let mut top_rated = Vec::with_capacity(candidates.len());
        let mut bad_rated = Vec::new();
        for pid in candidates {
            let _guard = self.stripe(pid).lock();
            if self.top_rated_cache.has(pid) {
                top_rated.push(pid.clone());
            } else if self.bad_rated_cache.has(pid) {
                bad_rated.push(pid.clone());
            } else {
                self.top_rated_cache.put(pid.clone(), DEFAULT_RATING);
                top_rated.push(pid.clone());
            }
        }

        debug!(
            parent: &self.span,
            candidates = candidates.len(),
            top_rated = top_rated.len(),
            bad_rated = bad_rated.len(),
            requested = count,
            "Selecting top rated peers"
        );

        let mut selected = top_rated;
        selected.extend(bad_rated);
        selected.truncate(count);
        selected
    }

    fn stripe(&self, pid: &PeerId) -> &Mutex<()> {
        let mut hasher = DefaultHasher::new();
        pid.hash(&mut hasher);
        &self.stripes[(hasher.finish() as usize) % self.stripes.len()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;

    /// Unbounded cache counting writes
    #[derive(Default)]
    struct CountingCache {
        entries: Mutex<HashMap<PeerId, i32>>,
        puts: AtomicUsize,
    }

    impl CountingCache {
        fn puts(&self) -> usize {
            self.puts.load(Ordering::SeqCst)
        }
    }

    impl RatingCache for CountingCache {
        fn get(&self, pid: &PeerId) -> Option<i32> {
            self.entries.lock().get(pid).copied()
        }

        fn put(&self, pid: PeerId, rating: i32) -> bool {
            self.puts.fetch_add(1, Ordering::SeqCst);
            self.entries.lock().insert(pid, rating);
            false
        }

        fn remove(&self, pid: &PeerId) {
            self.entries.lock().remove(pid);
        }

        fn has(&self, pid: &PeerId) -> bool {
            self.entries.lock().contains_key(pid)
        }

        fn len(&self) -> usize {
            self.entries.lock().len()
        }
    }

    fn create_handler() -> (PeersRatingHandler, Arc<CountingCache>, Arc<CountingCache>) {
        let top = Arc::new(CountingCache::default());
        let bad = Arc::new(CountingCache::default());
        let handler = PeersRatingHandler::new(PeersRatingHandlerArgs {
            top_rated_cache: top.clone(),
            bad_rated_cache: bad.clone(),
            span: Span::none(),
        });
        (handler, top, bad)
    }

    #[test]
    fn test_from_config_rejects_zero_capacity() {
        let config = PeersRatingConfig {
            top_rated_cache_capacity: 0,
            ..PeersRatingConfig::default()
        };
        assert!(matches!(
            PeersRatingHandler::from_config(&config, Span::none()),
            Err(RatingError::InvalidCacheCapacity("TopRatedCache"))
        ));

        let config = PeersRatingConfig {
            bad_rated_cache_capacity: 0,
            ..PeersRatingConfig::default()
        };
        assert!(matches!(
            PeersRatingHandler::from_config(&config, Span::none()),
            Err(RatingError::InvalidCacheCapacity("BadRatedCache"))
        ));
    }

    #[test]
    fn test_new_peer_is_seeded_in_top_rated() {
        let (handler, top, bad) = create_handler();
        let pid = PeerId::from("provided pid");

        handler.increase_rating(&pid);
        assert_eq!(top.get(&pid), Some(DEFAULT_RATING));
        assert!(!bad.has(&pid));

        let other = PeerId::from("other pid");
        handler.decrease_rating(&other);
        assert_eq!(top.get(&other), Some(DEFAULT_RATING));
        assert!(!bad.has(&other));
    }

    #[test]
    fn test_increase_saturates_and_still_writes() {
        let (handler, top, _) = create_handler();
        let pid = PeerId::from("provided pid");

        handler.increase_rating(&pid);
        let num_calls = 100;
        for _ in 0..num_calls {
            handler.increase_rating(&pid);
        }

        assert_eq!(handler.rating(&pid), Some(MAX_RATING));
        assert_eq!(top.puts(), num_calls + 1);
    }

    #[test]
    fn test_decrease_moves_between_caches() {
        let (handler, top, bad) = create_handler();
        let pid = PeerId::from("provided pid");

        // first call adds it with the default rating
        handler.decrease_rating(&pid);
        assert_eq!(top.get(&pid), Some(DEFAULT_RATING));
        assert_eq!(top.puts(), 1);
        assert_eq!(bad.puts(), 0);

        // exceed the limit
        let num_calls = 200;
        for _ in 0..num_calls {
            handler.decrease_rating(&pid);
        }
        assert_eq!(bad.get(&pid), Some(MIN_RATING));
        assert!(!top.has(&pid));
        assert_eq!(top.puts(), 1);
        assert_eq!(bad.puts(), num_calls);

        // move back to the top tier
        for _ in 0..num_calls {
            handler.increase_rating(&pid);
        }
        assert!(!bad.has(&pid));
        assert_eq!(top.get(&pid), Some(MAX_RATING));

        // 49 calls take the rating from -100 to -2
        let calls_in_bad = 49;
        assert_eq!(bad.puts(), num_calls + calls_in_bad);
        assert_eq!(top.puts(), 1 + num_calls - calls_in_bad);
    }

    #[test]
    fn test_zero_counts_as_top_rated() {
        let (handler, top, bad) = create_handler();
        let pid = PeerId::from("pid");

        handler.increase_rating(&pid);
        handler.decrease_rating(&pid);
        handler.decrease_rating(&pid);
        assert_eq!(bad.get(&pid), Some(-2));

        handler.increase_rating(&pid);
        assert_eq!(top.get(&pid), Some(0));
        assert!(!bad.has(&pid));
    }

    #[test]
    fn test_top_rated_empty_requests() {
        let (handler, _, _) = create_handler();

        assert!(handler
            .get_top_rated_peers_from_list(&[PeerId::from("pid")], 0)
            .is_empty());
        assert!(handler.get_top_rated_peers_from_list(&[], 1).is_empty());
    }

    #[test]
    fn test_unknown_peers_are_seeded_and_returned() {
        let (handler, top, _) = create_handler();
        let peers = vec![PeerId::from("pid 1"), PeerId::from("pid 2")];

        let result = handler.get_top_rated_peers_from_list(&peers, 5);
        assert_eq!(result, peers);
        assert!(top.has(&peers[0]));
        assert!(top.has(&peers[1]));
    }

    #[test]
    fn test_top_rated_before_bad_rated() {
        let (handler, _, _) = create_handler();
        let bad_1 = PeerId::from("bad 1");
        let top_1 = PeerId::from("top 1");
        let bad_2 = PeerId::from("bad 2");
        let top_2 = PeerId::from("top 2");

        for pid in [&bad_1, &bad_2] {
            handler.decrease_rating(pid);
            handler.decrease_rating(pid);
        }
        handler.increase_rating(&top_1);
        handler.increase_rating(&top_2);

        let candidates = vec![bad_1.clone(), top_1.clone(), bad_2.clone(), top_2.clone()];

        let result = handler.get_top_rated_peers_from_list(&candidates, 4);
        assert_eq!(result, vec![top_1.clone(), top_2.clone(), bad_1.clone(), bad_2.clone()]);

        let result = handler.get_top_rated_peers_from_list(&candidates, 3);
        assert_eq!(result, vec![top_1.clone(), top_2.clone(), bad_1.clone()]);

        let result = handler.get_top_rated_peers_from_list(&candidates, 1);
        assert_eq!(result, vec![top_1]);
    }

    #[test]
    fn test_multiple_pids_concurrently() {
        let (handler, top, bad) = create_handler();
        let handler = Arc::new(handler);
        let pids: Vec<PeerId> = (1..=4).map(|i| PeerId::from(format!("pid{i}"))).collect();

        let workers: Vec<_> = (0..8)
            .map(|idx| {
                let handler = handler.clone();
                let pid = pids[idx % 4].clone();
                thread::spawn(move || {
                    for _ in 0..50 {
                        if idx < 4 {
                            handler.increase_rating(&pid);
                        } else {
                            handler.decrease_rating(&pid);
                        }
                    }
                })
            })
            .collect();
        for worker in workers {
            worker.join().unwrap();
        }

        for pid in &pids {
            let rating = handler.rating(pid).unwrap();
            assert!((MIN_RATING..=MAX_RATING).contains(&rating));
            assert_ne!(top.has(pid), bad.has(pid), "{pid} must be in exactly one cache");
        }
    }

    #[test]
    fn test_lru_backed_handler() {
        let handler =
            PeersRatingHandler::from_config(&PeersRatingConfig::default(), Span::none()).unwrap();
        let pid = PeerId::from("pid");

        handler.increase_rating(&pid);
        handler.increase_rating(&pid);
        assert_eq!(handler.rating(&pid), Some(INCREASE_FACTOR));
        assert_eq!(handler.rating(&PeerId::from("stranger")), None);
    }
}
