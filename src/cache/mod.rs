//! Symmetric kernel value cache
//!
//! Memoizes K(i, j) between training examples while evaluating quantities
//! that visit every support vector pair, such as the dual objective. Kernels
//! are symmetric, so K(i, j) and K(j, i) share one entry.

use lru::LruCache;
use std::num::NonZeroUsize;

/// Cache key for a pair of training indices, normalized so that `lo <= hi`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct PairKey {
    lo: usize,
    hi: usize,
}

impl PairKey {
    fn new(i: usize, j: usize) -> Self {
        Self {
            lo: i.min(j),
            hi: i.max(j),
        }
    }
}

/// Bytes per entry: key, value and LRU bookkeeping
const ENTRY_BYTES: usize = 48;

/// LRU cache of kernel values between training examples
pub struct KernelCache {
    cache: LruCache<PairKey, f64>,
    hits: u64,
    misses: u64,
}

impl KernelCache {
    /// Create a cache holding at most `capacity` values (at least one)
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            cache: LruCache::new(capacity),
            hits: 0,
            misses: 0,
        }
    }

    /// Create a cache sized for the support vector pairs of a model,
    /// capped by `memory_bytes`
    pub fn for_support_vectors(num_svs: usize, memory_bytes: usize) -> Self {
        let pairs = num_svs.saturating_mul(num_svs.saturating_add(1)) / 2;
        Self::new(pairs.min(memory_bytes / ENTRY_BYTES))
    }

    /// Return K(i, j), computing and storing it on a miss
    pub fn get_or_compute<F>(&mut self, i: usize, j: usize, compute: F) -> f64
    where
        F: FnOnce() -> f64,
    {
        let key = PairKey::new(i, j);
        if let Some(&value) = self.cache.get(&key) {
            self.hits += 1;
            return value;
        }
        self.misses += 1;
        let value = compute();
        self.cache.put(key, value);
        value
    }

    /// Cached K(i, j) without computing
    pub fn peek(&self, i: usize, j: usize) -> Option<f64> {
        self.cache.peek(&PairKey::new(i, j)).copied()
    }

    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits,
            misses: self.misses,
            capacity: self.cache.cap().get(),
            size: self.cache.len(),
        }
    }

    pub fn clear(&mut self) {
        self.cache.clear();
        self.hits = 0;
        self.misses = 0;
    }
}

/// Cache statistics
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub capacity: usize,
    pub size: usize,
}
