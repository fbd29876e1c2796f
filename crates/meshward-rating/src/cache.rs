//! Rating caches - bounded key/rating stores

use lru::LruCache;
use meshward_types::PeerId;
use parking_lot::Mutex;
use std::num::NonZeroUsize;

use crate::error::RatingError;

/// Store of peer ratings with its own capacity eviction policy
pub trait RatingCache: Send + Sync {
    /// Read a rating without touching recency
    fn get(&self, pid: &PeerId) -> Option<i32>;

    /// Insert or overwrite a rating; returns true if another entry was evicted
    fn put(&self, pid: PeerId, rating: i32) -> bool;

    fn remove(&self, pid: &PeerId);

    fn has(&self, pid: &PeerId) -> bool;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// LRU backed rating cache
pub struct LruRatingCache {
    inner: Mutex<LruCache<PeerId, i32>>,
}

impl LruRatingCache {
    /// `name` identifies the cache in configuration errors
    pub fn new(name: &'static str, capacity: usize) -> Result<Self, RatingError> {
        let capacity =
            NonZeroUsize::new(capacity).ok_or(RatingError::InvalidCacheCapacity(name))?;
        Ok(Self {
            inner: Mutex::new(LruCache::new(capacity)),
        })
    }
}

impl RatingCache for LruRatingCache {
    fn get(&self, pid: &PeerId) -> Option<i32> {
        self.inner.lock().peek(pid).copied()
    }

    fn put(&self, pid: PeerId, rating: i32) -> bool {
        let mut cache = self.inner.lock();
        match cache.push(pid, rating) {
            // `push` hands back the old entry when overwriting the same key
            Some((evicted, _)) => !cache.contains(&evicted),
            None => false,
        }
    }

    fn remove(&self, pid: &PeerId) {
        self.inner.lock().pop(pid);
    }

    fn has(&self, pid: &PeerId) -> bool {
        self.inner.lock().contains(pid)
    }

    fn len(&self) -> usize {
        self.inner.lock().len()
    }
}
