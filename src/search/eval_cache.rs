//! Swappable evaluation memoization.
//!
//! Scores are cached from Red's point of view, keyed by the placement hash.
//! Correctness never depends on a cache being present: `NoEvalCache` turns
//! caching off entirely.

use std::collections::HashMap;

pub const DEFAULT_EVAL_CACHE_CAPACITY: usize = 100_000;

pub trait EvalCache: Send {
    fn get(&mut self, key: u64) -> Option<i32>;
    fn put(&mut self, key: u64, score: i32);
    /// Drop every cached score.
    fn evict(&mut self);
    fn len(&self) -> usize;
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Hash-map cache that clears itself once it grows past `capacity`.
#[derive(Debug, Clone)]
pub struct BoundedEvalCache {
    scores: HashMap<u64, i32>,
    capacity: usize,
}

impl Default for BoundedEvalCache {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_EVAL_CACHE_CAPACITY)
    }
}

impl BoundedEvalCache {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            scores: HashMap::with_capacity(capacity.min(1 << 16)),
            capacity: capacity.max(1),
        }
    }
}

impl EvalCache for BoundedEvalCache {
    #[inline]
    fn get(&mut self, key: u64) -> Option<i32> {
        self.scores.get(&key).copied()
    }

    fn put(&mut self, key: u64, score: i32) {
        if self.scores.len() >= self.capacity {
            self.scores.clear();
        }
        self.scores.insert(key, score);
    }

    fn evict(&mut self) {
        self.scores.clear();
    }

    fn len(&self) -> usize {
        self.scores.len()
    }
}

/// Cache that never stores anything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoEvalCache;

impl EvalCache for NoEvalCache {
    fn get(&mut self, _key: u64) -> Option<i32> {
        None
    }

    fn put(&mut self, _key: u64, _score: i32) {}

    fn evict(&mut self) {}

    fn len(&self) -> usize {
        0
    }
}
