use crate::game_state::board::Board;
use crate::game_state::xiangqi_types::*;

/// Push a pseudo-legal move unless `to` holds a friendly piece.
///
/// Returns `true` when `to` was empty, which sliding generators use to keep
/// scanning.
#[inline]
pub fn push_if_not_own(board: &Board, from: Square, to: Square, piece: Piece, out: &mut Vec<Move>) -> bool {
    match board.piece_at(to) {
        None => {
            out.push(quiet_move(from, to, piece));
            true
        }
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
            false
        }
    }
}

#[inline]
pub fn quiet_move(from: Square, to: Square, piece: Piece) -> Move {
    Move {
        from,
        to,
        piece,
        captured: None,
        gives_check: false,
    }
}

pub const ORTHOGONAL: [(i8, i8); 4] = [(-1, 0), (1, 0), (0, -1), (0, 1)];
pub const DIAGONAL: [(i8, i8); 4] = [(-1, -1), (-1, 1), (1, -1), (1, 1)];
