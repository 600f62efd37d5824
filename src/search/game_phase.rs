//! Game phase derived from the number of strong pieces left on the board.

use serde::{Deserialize, Serialize};

use crate::game_state::board::Board;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GamePhase {
    Opening,
    Midgame,
    LateMidgame,
    Endgame,
}

impl GamePhase {
    /// Classify by Rook/Knight/Cannon count (both sides).
    pub fn from_board(board: &Board) -> Self {
        Self::from_strong_count(board.strong_piece_count())
    }

    pub const fn from_strong_count(count: usize) -> Self {
        if count >= 10 {
            GamePhase::Opening
        } else if count >= 6 {
            GamePhase::Midgame
        } else if count >= 3 {
            GamePhase::LateMidgame
        } else {
            GamePhase::Endgame
        }
    }

    #[inline]
    pub const fn index(self) -> usize {
        match self {
            GamePhase::Opening => 0,
            GamePhase::Midgame => 1,
            GamePhase::LateMidgame => 2,
            GamePhase::Endgame => 3,
        }
    }

    /// 0.0 in the opening up to 1.0 in the endgame.
    #[inline]
    pub const fn factor(self) -> f32 {
        match self {
            GamePhase::Opening => 0.0,
            GamePhase::Midgame => 0.5,
            GamePhase::LateMidgame => 0.8,
            GamePhase::Endgame => 1.0,
        }
    }

    /// Final evaluation multiplier in percent.
    #[inline]
    pub const fn scale_percent(self) -> i32 {
        match self {
            GamePhase::Opening => 95,
            GamePhase::Midgame => 100,
            GamePhase::LateMidgame => 108,
            GamePhase::Endgame => 115,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::GamePhase;
    use crate::game_state::board::Board;

    #[test]
    fn thresholds() {
        assert_eq!(GamePhase::from_board(&Board::starting_position()), GamePhase::Opening);
        assert_eq!(GamePhase::from_strong_count(10), GamePhase::Opening);
        assert_eq!(GamePhase::from_strong_count(9), GamePhase::Midgame);
        assert_eq!(GamePhase::from_strong_count(6), GamePhase::Midgame);
        assert_eq!(GamePhase::from_strong_count(5), GamePhase::LateMidgame);
        assert_eq!(GamePhase::from_strong_count(3), GamePhase::LateMidgame);
        assert_eq!(GamePhase::from_strong_count(2), GamePhase::Endgame);
    }
}
