//! Game-level position history used for perpetual-check adjudication.
//!
//! One record is appended per ply of the game (never per search node). Search
//! does not consult this history for pruning.

use crate::errors::XiangqiResult;
use crate::game_state::board::Board;
use crate::game_state::xiangqi_types::Side;
use crate::move_generation::legal_move_checks::is_in_check;
use crate::search::zobrist::position_key;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PositionRecord {
    pub hash: u64,
    pub side_to_move: Side,
    pub is_check: bool,
}

#[derive(Debug, Clone, Default)]
pub struct PositionHistory {
    records: Vec<PositionRecord>,
}

impl PositionHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `board` with `side_to_move` about to play.
    pub fn push(&mut self, board: &Board, side_to_move: Side) -> XiangqiResult<()> {
        let is_check = is_in_check(board, side_to_move)?;
        self.records.push(PositionRecord {
            hash: position_key(board, side_to_move),
            side_to_move,
            is_check,
        });
        Ok(())
    }

    #[inline]
    pub fn records(&self) -> &[PositionRecord] {
        &self.records
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Number of earlier occurrences of the `(hash, side)` position.
    pub fn occurrences(&self, hash: u64, side_to_move: Side) -> usize {
        self.records
            .iter()
            .filter(|r| r.hash == hash && r.side_to_move == side_to_move)
            .count()
    }

    pub fn clear(&mut self) {
        self.records.clear();
    }
}
