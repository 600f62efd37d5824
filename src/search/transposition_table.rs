//! Fixed-size transposition table keyed by the full position hash.
//!
//! Direct indexing with depth-preferred replacement and generation aging.
//! Once occupancy passes 80% the shallowest entries are dropped until at most
//! half the slots are in use.

use crate::game_state::xiangqi_types::Move;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bound {
    Exact,
    Lower,
    Upper,
}

#[derive(Debug, Clone, Copy)]
pub struct TTEntry {
    pub key: u64,
    pub depth: u8,
    pub score: i32,
    pub bound: Bound,
    pub best_move: Option<Move>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TTStats {
    pub probes: u64,
    pub hits: u64,
    pub stores: u64,
    pub compactions: u64,
}

impl TTStats {
    pub fn hit_rate(&self) -> f64 {
        if self.probes == 0 {
            0.0
        } else {
            self.hits as f64 / self.probes as f64
        }
    }
}

#[derive(Debug, Clone)]
pub struct TranspositionTable {
    entries: Vec<Option<TTEntry>>,
    generations: Vec<u8>,
    current_generation: u8,
    occupied: usize,
    stats: TTStats,
}

impl TranspositionTable {
    const AGE_REPLACE_THRESHOLD: u8 = 4;
    const DEPTH_REPLACE_MARGIN: u8 = 2;
    const COMPACT_TRIGGER_PERCENT: usize = 80;
    const COMPACT_TARGET_PERCENT: usize = 50;

    pub fn new_with_mb(size_mb: usize) -> Self {
        let bytes = size_mb.max(1) * 1024 * 1024;
        let entry_size = std::mem::size_of::<Option<TTEntry>>().max(1);
        Self::with_capacity(bytes / entry_size)
    }

    pub fn with_capacity(slots: usize) -> Self {
        let count = slots.max(1);
        Self {
            entries: vec![None; count],
            generations: vec![0; count],
            current_generation: 0,
            occupied: 0,
            stats: TTStats::default(),
        }
    }

    /// Advance the generation (once per iterative-deepening iteration) and
    /// compact when the table is crowded.
    pub fn new_generation(&mut self) {
        self.current_generation = self.current_generation.wrapping_add(1);
        self.maybe_compact();
    }

    #[inline]
    pub fn clear(&mut self) {
        self.entries.fill(None);
        self.generations.fill(0);
        self.current_generation = 0;
        self.occupied = 0;
        self.stats = TTStats::default();
    }

    /// Number of slots.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.entries.len()
    }

    /// Number of occupied slots.
    #[inline]
    pub fn len(&self) -> usize {
        self.occupied
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.occupied == 0
    }

    #[inline]
    pub fn stats(&self) -> TTStats {
        self.stats
    }

    #[inline]
    fn idx(&self, key: u64) -> usize {
        (key % self.entries.len() as u64) as usize
    }

    pub fn probe(&mut self, key: u64) -> Option<TTEntry> {
        self.stats.probes += 1;
        let idx = self.idx(key);
        let hit = self.entries[idx].filter(|e| e.key == key);
        if hit.is_some() {
            self.stats.hits += 1;
            self.generations[idx] = self.current_generation;
        }
        hit
    }

    pub fn store(&mut self, entry: TTEntry) {
        self.stats.stores += 1;
        let idx = self.idx(entry.key);
        match self.entries[idx] {
            None => {
                self.entries[idx] = Some(entry);
                self.generations[idx] = self.current_generation;
                self.occupied += 1;
            }
            Some(existing) => {
                let same_key = existing.key == entry.key;
                let age = self.current_generation.wrapping_sub(self.generations[idx]);
                let stale = age >= Self::AGE_REPLACE_THRESHOLD;

                let replace = if same_key {
                    entry.depth >= existing.depth
                } else {
                    stale || entry.depth.saturating_add(Self::DEPTH_REPLACE_MARGIN) >= existing.depth
                };

                if replace {
                    // Keep a known best move when the new entry has none.
                    let best_move = if same_key { entry.best_move.or(existing.best_move) } else { entry.best_move };
                    self.entries[idx] = Some(TTEntry { best_move, ..entry });
                    self.generations[idx] = self.current_generation;
                }
            }
        }
    }

    /// Drop the shallowest (then oldest) entries once occupancy exceeds the
    /// trigger, leaving at most the target share of slots filled.
    pub fn maybe_compact(&mut self) -> bool {
        let capacity = self.entries.len();
        if self.occupied * 100 <= capacity * Self::COMPACT_TRIGGER_PERCENT {
            return false;
        }
        let target = capacity * Self::COMPACT_TARGET_PERCENT / 100;

        let mut ranked: Vec<(u8, u8, usize)> = self
            .entries
            .iter()
            .enumerate()
            .filter_map(|(idx, e)| {
                e.map(|e| {
                    let age = self.current_generation.wrapping_sub(self.generations[idx]);
                    (e.depth, u8::MAX - age, idx)
                })
            })
            .collect();
        ranked.sort_unstable();

        let excess = self.occupied.saturating_sub(target);
        for &(_, _, idx) in ranked.iter().take(excess) {
            self.entries[idx] = None;
            self.generations[idx] = 0;
        }
        self.occupied -= excess.min(ranked.len());
        self.stats.compactions += 1;
        log::debug!("transposition table compacted to {} of {} slots", self.occupied, capacity);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::{Bound, TTEntry, TranspositionTable};

    fn entry(key: u64, depth: u8, score: i32) -> TTEntry {
        TTEntry {
            key,
            depth,
            score,
            bound: Bound::Exact,
            best_move: None,
        }
    }

    #[test]
    fn store_and_probe_round_trip() {
        let mut tt = TranspositionTable::new_with_mb(1);
        tt.store(entry(123, 5, 42));
        let got = tt.probe(123).expect("entry should exist");
        assert_eq!(got.key, 123);
        assert_eq!(got.depth, 5);
        assert_eq!(got.score, 42);
        assert!(tt.probe(124).is_none());
        assert_eq!(tt.len(), 1);
    }

    #[test]
    fn depth_preferred_replacement() {
        let mut tt = TranspositionTable::new_with_mb(1);
        let key = 555;
        tt.store(TTEntry {
            bound: Bound::Upper,
            ..entry(key, 2, 1)
        });
        tt.store(entry(key, 1, 9));
        assert_eq!(tt.probe(key).expect("exists").score, 1);
        tt.store(TTEntry {
            bound: Bound::Lower,
            ..entry(key, 6, 3)
        });
        let got = tt.probe(key).expect("exists");
        assert_eq!(got.depth, 6);
        assert_eq!(got.score, 3);
        assert_eq!(got.bound, Bound::Lower);
    }

    #[test]
    fn colliding_key_is_not_returned() {
        let mut tt = TranspositionTable::with_capacity(8);
        tt.store(entry(3, 4, 10));
        assert!(tt.probe(11).is_none());
    }

    #[test]
    fn compaction_keeps_deepest_entries() {
        let mut tt = TranspositionTable::with_capacity(10);
        for key in 0..9u64 {
            tt.store(entry(key, key as u8, 0));
        }
        assert_eq!(tt.len(), 9);
        tt.new_generation();
        assert_eq!(tt.len(), 5);
        assert_eq!(tt.stats().compactions, 1);
        assert!(tt.probe(0).is_none());
        assert!(tt.probe(3).is_none());
        assert!(tt.probe(4).is_some());
        assert!(tt.probe(8).is_some());

        tt.new_generation();
        assert_eq!(tt.stats().compactions, 1);
    }
}
