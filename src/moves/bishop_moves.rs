use crate::game_state::board::Board;
use crate::game_state::xiangqi_rules::on_own_half;
use crate::game_state::xiangqi_types::*;
use crate::moves::move_builder::{push_if_not_own, DIAGONAL};

/// Two diagonal steps with an empty eye; never crosses the river.
pub fn generate_bishop_moves(board: &Board, from: Square, piece: Piece, out: &mut Vec<Move>) {
    for (dr, dc) in DIAGONAL {
        let (Some(eye), Some(to)) = (from.offset(dr, dc), from.offset(2 * dr, 2 * dc)) else {
            continue;
        };
        if on_own_half(piece.side, to) && board.is_empty_at(eye) {
            push_if_not_own(board, from, to, piece, out);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::generate_bishop_moves;
    use crate::game_state::board::Board;
    use crate::game_state::xiangqi_types::*;

    #[test]
    fn blocked_eye_and_river_limit_bishop() {
        let mut board = Board::empty();
        let bishop = Piece::new(PieceKind::Bishop, Side::Red);
        let from = Square::new(5, 2);
        board.set_piece(from, Some(bishop));
        board.set_piece(Square::new(6, 3), Some(Piece::new(PieceKind::Pawn, Side::Black)));

        let mut out = Vec::new();
        generate_bishop_moves(&board, from, bishop, &mut out);
        let targets: Vec<Square> = out.iter().map(|m| m.to).collect();
        // Upward moves would cross the river and (6,3) blocks the eye toward (7,4).
        assert_eq!(targets, vec![Square::new(7, 0)]);
    }
}
