//! Phase-dependent piece values and position-dependent pawn scaling.
//!
//! Lookups are keyed by `(GamePhase, PieceKind)`; side never enters the key.

use crate::game_state::xiangqi_rules::CENTER_COL;
use crate::game_state::xiangqi_types::*;
use crate::search::game_phase::GamePhase;

pub const KING_VALUE: i32 = 100_000;

// Indexed by PieceKind::index: K, A, B, N, R, C, P.
const BASE_VALUES: [i32; 7] = [KING_VALUE, 200, 200, 400, 900, 450, 100];

const PHASE_VALUES: [[i32; 7]; 4] = [
    [KING_VALUE, 180, 180, 400, 900, 500, 50],
    [KING_VALUE, 220, 220, 450, 950, 450, 150],
    [KING_VALUE, 250, 250, 480, 980, 420, 200],
    [KING_VALUE, 280, 280, 500, 1000, 400, 250],
];

#[inline]
pub const fn piece_value(kind: PieceKind, phase: GamePhase) -> i32 {
    PHASE_VALUES[phase.index()][kind.index()]
}

#[inline]
pub const fn base_value(kind: PieceKind) -> i32 {
    BASE_VALUES[kind.index()]
}

/// Value used by exchange estimates and move ordering; the King is capped so
/// that "captures" of it never dominate arithmetic.
#[inline]
pub const fn exchange_value(kind: PieceKind) -> i32 {
    match kind {
        PieceKind::King => 2_000,
        _ => BASE_VALUES[kind.index()],
    }
}

/// Pawn scaling in percent by how far the pawn has advanced.
pub fn pawn_multiplier_percent(side: Side, square: Square) -> i32 {
    let rel = square.relative_row(side);
    match rel {
        5..=9 => 50,
        3 | 4 => 150,
        1 if square.col == CENTER_COL => 400,
        1 | 2 => 200,
        _ => 80,
    }
}

/// Material contribution of `piece` on `square` in `phase`.
#[inline]
pub fn material_value(piece: Piece, square: Square, phase: GamePhase) -> i32 {
    let value = piece_value(piece.kind, phase);
    if piece.kind == PieceKind::Pawn {
        value * pawn_multiplier_percent(piece.side, square) / 100
    } else {
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn values_shift_with_phase() {
        assert!(piece_value(PieceKind::Pawn, GamePhase::Endgame) > piece_value(PieceKind::Pawn, GamePhase::Opening));
        assert!(piece_value(PieceKind::Cannon, GamePhase::Opening) > piece_value(PieceKind::Cannon, GamePhase::Endgame));
        assert!(piece_value(PieceKind::Knight, GamePhase::Endgame) > piece_value(PieceKind::Knight, GamePhase::Opening));
    }

    #[test]
    fn pawn_scaling_is_mirrored() {
        let red = Piece::new(PieceKind::Pawn, Side::Red);
        let black = Piece::new(PieceKind::Pawn, Side::Black);
        let sq = Square::new(1, 4);
        assert_eq!(pawn_multiplier_percent(Side::Red, sq), 400);
        assert_eq!(pawn_multiplier_percent(Side::Black, sq.flipped()), 400);
        assert_eq!(
            material_value(red, Square::new(6, 0), GamePhase::Midgame),
            material_value(black, Square::new(3, 0), GamePhase::Midgame)
        );
        assert_eq!(pawn_multiplier_percent(Side::Red, Square::new(0, 2)), 80);
        assert_eq!(pawn_multiplier_percent(Side::Red, Square::new(4, 2)), 150);
        assert_eq!(pawn_multiplier_percent(Side::Red, Square::new(2, 2)), 200);
    }
}
