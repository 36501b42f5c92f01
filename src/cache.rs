//! Path match caching
//!
//! Each compiled [`PathMatcher`](crate::PathMatcher) keeps a small LRU of
//! match outcomes keyed by the raw path, so re-dispatching the same URL
//! (back/forward, repeated navigations) skips decoding and segment walking.
//! Misses are cached too.

use crate::matcher::PathMatch;
use crate::trace_log;
use lru::LruCache;
use parking_lot::Mutex;
use std::fmt;
use std::num::NonZeroUsize;

/// Cache performance statistics
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: usize,
    pub misses: usize,
    pub invalidations: usize,
}

impl CacheStats {
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

struct Inner {
    entries: LruCache<String, Option<PathMatch>>,
    stats: CacheStats,
}

/// Match outcome cache with LRU eviction
///
/// Default capacity: 256 paths per matcher.
pub struct MatchCache {
    inner: Mutex<Inner>,
}

impl MatchCache {
    const DEFAULT_CAPACITY: usize = 256;

    pub fn new() -> Self {
        Self::with_capacity(Self::DEFAULT_CAPACITY)
    }

    /// A zero capacity is bumped to one entry.
    pub fn with_capacity(capacity: usize) -> Self {
        let cap = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            inner: Mutex::new(Inner {
                entries: LruCache::new(cap),
                stats: CacheStats::default(),
            }),
        }
    }

    /// Look up a path. The outer `Option` is the cache hit, the inner one
    /// the cached match outcome.
    pub fn get(&self, path: &str) -> Option<Option<PathMatch>> {
        let mut inner = self.inner.lock();
        match inner.entries.get(path).cloned() {
            Some(outcome) => {
                inner.stats.hits += 1;
                trace_log!("Match cache hit for path: '{}'", path);
                Some(outcome)
            }
            None => {
                inner.stats.misses += 1;
                None
            }
        }
    }

    pub fn insert(&self, path: String, outcome: Option<PathMatch>) {
        self.inner.lock().entries.push(path, outcome);
    }

    pub fn clear(&self) {
        let mut inner = self.inner.lock();
        inner.entries.clear();
        inner.stats.invalidations += 1;
    }

    pub fn stats(&self) -> CacheStats {
        self.inner.lock().stats.clone()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for MatchCache {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for MatchCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.lock();
        f.debug_struct("MatchCache")
            .field("len", &inner.entries.len())
            .field("cap", &inner.entries.cap())
            .field("stats", &inner.stats)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matched(remainder: &str) -> Option<PathMatch> {
        Some(PathMatch {
            params: Vec::new(),
            remainder: Some(remainder.to_string()),
        })
    }

    #[test]
    fn test_cache_miss_then_hit() {
        let cache = MatchCache::new();
        assert!(cache.get("/a").is_none());

        cache.insert("/a".to_string(), matched("/"));
        assert_eq!(cache.get("/a"), Some(matched("/")));

        let stats = cache.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert!((stats.hit_rate() - 0.5).abs() < 0.001);
    }

    #[test]
    fn test_negative_outcomes_are_cached() {
        let cache = MatchCache::new();
        cache.insert("/nope".to_string(), None);
        assert_eq!(cache.get("/nope"), Some(None));
    }

    #[test]
    fn test_eviction_and_clear() {
        let cache = MatchCache::with_capacity(2);
        cache.insert("/a".to_string(), None);
        cache.insert("/b".to_string(), None);
        cache.insert("/c".to_string(), None);
        assert_eq!(cache.len(), 2);
        assert!(cache.get("/a").is_none());

        cache.clear();
        assert!(cache.is_empty());
        assert_eq!(cache.stats().invalidations, 1);
    }

    #[test]
    fn test_zero_capacity_is_bumped() {
        let cache = MatchCache::with_capacity(0);
        cache.insert("/a".to_string(), None);
        assert_eq!(cache.len(), 1);
    }
}
