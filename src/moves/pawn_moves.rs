use crate::game_state::board::Board;
use crate::game_state::xiangqi_rules::has_crossed_river;
use crate::game_state::xiangqi_types::*;
use crate::moves::move_builder::push_if_not_own;

/// One step forward; sideways steps only after crossing the river.
pub fn generate_pawn_moves(board: &Board, from: Square, piece: Piece, out: &mut Vec<Move>) {
    if let Some(to) = from.offset(piece.side.forward(), 0) {
        push_if_not_own(board, from, to, piece, out);
    }
    if has_crossed_river(piece.side, from) {
        for dc in [-1, 1] {
            if let Some(to) = from.offset(0, dc) {
                push_if_not_own(board, from, to, piece, out);
            }
        }
    }
}
