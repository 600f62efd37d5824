//! Canonical Xiangqi rule constants.
//!
//! Starting position text plus the palace and river geometry shared by move
//! generation and evaluation.

use crate::game_state::xiangqi_types::{Side, Square};

/// Standard Xiangqi starting position in FEN, Red to move.
pub const STARTING_POSITION_FEN: &str =
    "rnbakabnr/9/1c5c1/p1p1p1p1p/9/9/P1P1P1P1P/1C5C1/9/RNBAKABNR w";

pub const PALACE_COLS: std::ops::RangeInclusive<u8> = 3..=5;
pub const CENTER_COL: u8 = 4;

/// True when `square` lies inside `side`'s palace.
#[inline]
pub fn in_palace(side: Side, square: Square) -> bool {
    if !PALACE_COLS.contains(&square.col) {
        return false;
    }
    match side {
        Side::Red => square.row >= 7,
        Side::Black => square.row <= 2,
    }
}

/// True when `square` is on `side`'s own half (rows 5..=9 for Red, 0..=4 for Black).
#[inline]
pub fn on_own_half(side: Side, square: Square) -> bool {
    match side {
        Side::Red => square.row >= 5,
        Side::Black => square.row <= 4,
    }
}

/// True once a piece of `side` standing on `square` has crossed the river.
#[inline]
pub fn has_crossed_river(side: Side, square: Square) -> bool {
    !on_own_half(side, square)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn palace_geometry() {
        assert!(in_palace(Side::Red, Square::new(9, 4)));
        assert!(in_palace(Side::Red, Square::new(7, 3)));
        assert!(!in_palace(Side::Red, Square::new(6, 4)));
        assert!(in_palace(Side::Black, Square::new(0, 5)));
        assert!(!in_palace(Side::Black, Square::new(1, 6)));
    }

    #[test]
    fn river_geometry() {
        assert!(on_own_half(Side::Red, Square::new(5, 0)));
        assert!(has_crossed_river(Side::Red, Square::new(4, 0)));
        assert!(on_own_half(Side::Black, Square::new(4, 8)));
        assert!(has_crossed_river(Side::Black, Square::new(5, 8)));
    }
}
