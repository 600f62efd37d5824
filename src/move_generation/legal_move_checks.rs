//! Attack detection, check tests and the flying-general rule.
//!
//! Attacks are found by scanning outward from the target square, so a check
//! test costs a handful of ray walks instead of a full move generation.

use crate::errors::XiangqiResult;
use crate::game_state::board::Board;
use crate::game_state::xiangqi_rules::{has_crossed_river, in_palace, on_own_half};
use crate::game_state::xiangqi_types::*;
use crate::moves::knight_moves::KNIGHT_JUMPS;
use crate::moves::move_builder::{DIAGONAL, ORTHOGONAL};

/// All pieces of `attacker` that attack `square`.
pub fn attackers_to_square(board: &Board, square: Square, attacker: Side) -> Vec<(Square, Piece)> {
    let mut out = Vec::with_capacity(4);
    scan_attackers(board, square, attacker, |sq, piece| {
        out.push((sq, piece));
        false
    });
    out
}

#[inline]
pub fn is_square_attacked(board: &Board, square: Square, attacker: Side) -> bool {
    scan_attackers(board, square, attacker, |_, _| true)
}

/// Walk every attack pattern toward `square`, calling `visit` per attacker.
/// Returns `true` as soon as `visit` asks to stop.
fn scan_attackers<F>(board: &Board, square: Square, attacker: Side, mut visit: F) -> bool
where
    F: FnMut(Square, Piece) -> bool,
{
    // Lines: Rook, adjacent King or Pawn on the first piece, Cannon on the second.
    for (dr, dc) in ORTHOGONAL {
        let mut cursor = square;
        let mut screened = false;
        while let Some(next) = cursor.offset(dr, dc) {
            cursor = next;
            let Some(piece) = board.piece_at(next) else {
                continue;
            };
            if screened {
                if piece.side == attacker && piece.kind == PieceKind::Cannon && visit(next, piece) {
                    return true;
                }
                break;
            }
            screened = true;
            if piece.side != attacker {
                continue;
            }
            let adjacent = next.manhattan(square) == 1;
            let hits = match piece.kind {
                PieceKind::Rook => true,
                PieceKind::King => adjacent && in_palace(attacker, square),
                PieceKind::Pawn => adjacent && pawn_hits(attacker, next, square),
                _ => false,
            };
            if hits && visit(next, piece) {
                return true;
            }
        }
    }

    for ((dr, dc), (lr, lc)) in KNIGHT_JUMPS {
        // A knight on `origin` jumps by (dr, dc) to reach `square`.
        let Some(origin) = square.offset(-dr, -dc) else {
            continue;
        };
        let Some(piece) = board.piece_at(origin) else {
            continue;
        };
        if piece.side != attacker || piece.kind != PieceKind::Knight {
            continue;
        }
        let Some(leg) = origin.offset(lr, lc) else {
            continue;
        };
        if board.is_empty_at(leg) && visit(origin, piece) {
            return true;
        }
    }

    for (dr, dc) in DIAGONAL {
        let Some(near) = square.offset(dr, dc) else {
            continue;
        };
        if let Some(piece) = board.piece_at(near) {
            if piece.side == attacker
                && piece.kind == PieceKind::Advisor
                && in_palace(attacker, square)
                && visit(near, piece)
            {
                return true;
            }
            // An occupied eye blocks the bishop behind it.
            continue;
        }
        let Some(origin) = square.offset(2 * dr, 2 * dc) else {
            continue;
        };
        if let Some(piece) = board.piece_at(origin) {
            if piece.side == attacker
                && piece.kind == PieceKind::Bishop
                && on_own_half(attacker, square)
                && visit(origin, piece)
            {
                return true;
            }
        }
    }

    false
}

#[inline]
fn pawn_hits(side: Side, from: Square, to: Square) -> bool {
    let d_row = to.row as i8 - from.row as i8;
    let d_col = to.col as i8 - from.col as i8;
    (d_col == 0 && d_row == side.forward()) || (d_row == 0 && has_crossed_river(side, from))
}

/// True when `side`'s King is attacked. Fails with `NoKing` on a corrupted board.
pub fn is_in_check(board: &Board, side: Side) -> XiangqiResult<bool> {
    let king = board.king_square(side)?;
    Ok(is_square_attacked(board, king, side.opposite()))
}

/// Flying general: both Kings on one file with nothing between them.
pub fn kings_facing(board: &Board) -> XiangqiResult<bool> {
    let red = board.king_square(Side::Red)?;
    let black = board.king_square(Side::Black)?;
    if red.col != black.col {
        return Ok(false);
    }
    let (low, high) = (black.row.min(red.row), black.row.max(red.row));
    Ok(((low + 1)..high).all(|row| board.is_empty_at(Square::new(row, red.col))))
}
