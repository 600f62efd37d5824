//! Memo of book lookups keyed by position, side and game length.

use std::collections::{HashMap, VecDeque};

use crate::game_state::xiangqi_types::Side;
use crate::tables::book_matcher::BookHit;

pub const DEFAULT_BOOK_CACHE_CAPACITY: usize = 5_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BookKey {
    pub position: u64,
    pub side: Side,
    pub ply: usize,
}

/// A computed lookup. `NoMatch` is a real answer, distinct from "never asked".
#[derive(Debug, Clone, PartialEq)]
pub enum CachedLookup {
    Hit(BookHit),
    NoMatch,
}

#[derive(Debug, Clone)]
pub struct BookCache {
    entries: HashMap<BookKey, CachedLookup>,
    order: VecDeque<BookKey>,
    capacity: usize,
}

impl Default for BookCache {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_BOOK_CACHE_CAPACITY)
    }
}

impl BookCache {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: HashMap::new(),
            order: VecDeque::new(),
            capacity: capacity.max(2),
        }
    }

    pub fn get(&self, key: &BookKey) -> Option<&CachedLookup> {
        self.entries.get(key)
    }

    pub fn insert(&mut self, key: BookKey, value: CachedLookup) {
        if self.entries.insert(key, value).is_none() {
            self.order.push_back(key);
        }
        if self.entries.len() > self.capacity {
            self.evict_oldest_half();
        }
    }

    fn evict_oldest_half(&mut self) {
        let keep = self.capacity / 2;
        while self.order.len() > keep {
            if let Some(old) = self.order.pop_front() {
                self.entries.remove(&old);
            }
        }
        log::debug!("book cache trimmed to {} entries", self.entries.len());
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.order.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(position: u64) -> BookKey {
        BookKey {
            position,
            side: Side::Red,
            ply: 0,
        }
    }

    #[test]
    fn no_match_is_distinct_from_absent() {
        let mut cache = BookCache::default();
        assert!(cache.get(&key(1)).is_none());
        cache.insert(key(1), CachedLookup::NoMatch);
        assert_eq!(cache.get(&key(1)), Some(&CachedLookup::NoMatch));
    }

    #[test]
    fn overflow_keeps_the_newest_half() {
        let mut cache = BookCache::with_capacity(10);
        for i in 0..11 {
            cache.insert(key(i), CachedLookup::NoMatch);
        }
        assert_eq!(cache.len(), 5);
        assert!(cache.get(&key(0)).is_none());
        assert!(cache.get(&key(5)).is_none());
        assert!(cache.get(&key(6)).is_some());
        assert!(cache.get(&key(10)).is_some());
    }
}
