use crate::game_state::board::Board;
use crate::game_state::xiangqi_types::*;
use crate::moves::move_builder::{quiet_move, ORTHOGONAL};

/// Rook-like quiet moves; captures need exactly one screen in between.
pub fn generate_cannon_moves(board: &Board, from: Square, piece: Piece, out: &mut Vec<Move>) {
    for (dr, dc) in ORTHOGONAL {
        let mut cursor = from;
        let mut screened = false;
        while let Some(to) = cursor.offset(dr, dc) {
            cursor = to;
            match board.piece_at(to) {
                None if !screened => out.push(quiet_move(from, to, piece)),
                None => {}
                Some(_) if !screened => screened = true,
                Some(target) => {
                    if target.side != piece.side {
                        out.push(Move {
                            from,
                            to,
                            piece,
                            captured: Some(target),
                            gives_check: false,
                        });
                    }
                    break;
                }
            }
        }
    }
}

/// Number of directions in which the cannon has a screen (a capture platform).
pub fn platform_count(board: &Board, from: Square) -> usize {
    ORTHOGONAL
        .iter()
        .filter(|(dr, dc)| {
            let mut cursor = from;
            while let Some(next) = cursor.offset(*dr, *dc) {
                if !board.is_empty_at(next) {
                    return true;
                }
                cursor = next;
            }
            false
        })
        .count()
}
