//! Killer and history tables shared across the nodes of one search.

use crate::game_state::xiangqi_types::{Move, BOARD_SQUARES};

pub const MAX_PLY: usize = 64;

const HISTORY_SATURATION: i32 = 1_000_000;

#[derive(Debug, Clone, Copy)]
struct KillerSlot {
    mv: Move,
    score: i32,
}

#[derive(Debug, Clone)]
pub struct SearchHeuristics {
    killers: [[Option<KillerSlot>; 2]; MAX_PLY],
    // Indexed by (from, to) square index.
    history: Box<[[i32; BOARD_SQUARES]; BOARD_SQUARES]>,
}

impl Default for SearchHeuristics {
    fn default() -> Self {
        Self {
            killers: [[None; 2]; MAX_PLY],
            history: Box::new([[0; BOARD_SQUARES]; BOARD_SQUARES]),
        }
    }
}

impl SearchHeuristics {
    pub fn clear(&mut self) {
        self.killers = [[None; 2]; MAX_PLY];
        self.history.iter_mut().for_each(|row| row.fill(0));
    }

    /// Forget killers from a previous search; history is kept and decays.
    pub fn reset_killers(&mut self) {
        self.killers = [[None; 2]; MAX_PLY];
    }

    /// Killer moves at `ply`, higher-scored slot first.
    pub fn killers_at(&self, ply: usize) -> [Option<Move>; 2] {
        let Some(slots) = self.killers.get(ply) else {
            return [None, None];
        };
        [slots[0].map(|s| s.mv), slots[1].map(|s| s.mv)]
    }

    /// Remember a quiet cutoff move; the lowest-scored slot gives way.
    pub fn record_killer(&mut self, ply: usize, mv: Move, score: i32) {
        let Some(slots) = self.killers.get_mut(ply) else {
            return;
        };
        let known = slots
            .iter()
            .position(|s| s.is_some_and(|s| s.mv.same_squares(&mv)));
        if let Some(idx) = known {
            if let Some(slot) = slots[idx].as_mut() {
                slot.score = slot.score.max(score);
            }
        } else {
            let weakest = match (slots[0], slots[1]) {
                (None, _) => 0,
                (_, None) => 1,
                (Some(a), Some(b)) if b.score < a.score => 1,
                _ => 0,
            };
            match slots[weakest] {
                Some(slot) if slot.score >= score => return,
                _ => slots[weakest] = Some(KillerSlot { mv, score }),
            }
        }
        if let (Some(a), Some(b)) = (slots[0], slots[1]) {
            if b.score > a.score {
                slots.swap(0, 1);
            }
        }
    }

    pub fn record_history(&mut self, mv: &Move, depth: u8) {
        let bonus = i32::from(depth) * i32::from(depth);
        let entry = &mut self.history[mv.from.index()][mv.to.index()];
        *entry += bonus;
        if *entry > HISTORY_SATURATION {
            self.decay_history();
        }
    }

    #[inline]
    pub fn history_score(&self, mv: &Move) -> i32 {
        self.history[mv.from.index()][mv.to.index()]
    }

    fn decay_history(&mut self) {
        for row in self.history.iter_mut() {
            for value in row.iter_mut() {
                *value /= 2;
            }
        }
    }
}
