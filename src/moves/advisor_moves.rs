use crate::game_state::board::Board;
use crate::game_state::xiangqi_rules::in_palace;
use crate::game_state::xiangqi_types::*;
use crate::moves::move_builder::{push_if_not_own, DIAGONAL};

/// One diagonal step, confined to the palace.
pub fn generate_advisor_moves(board: &Board, from: Square, piece: Piece, out: &mut Vec<Move>) {
    for (dr, dc) in DIAGONAL {
        let Some(to) = from.offset(dr, dc) else {
            continue;
        };
        if in_palace(piece.side, to) {
            push_if_not_own(board, from, to, piece, out);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::generate_advisor_moves;
    use crate::game_state::board::Board;
    use crate::game_state::xiangqi_types::*;

    #[test]
    fn advisor_in_palace_center_has_four_moves() {
        let mut board = Board::empty();
        let advisor = Piece::new(PieceKind::Advisor, Side::Black);
        board.set_piece(Square::new(1, 4), Some(advisor));
        let mut out = Vec::new();
        generate_advisor_moves(&board, Square::new(1, 4), advisor, &mut out);
        assert_eq!(out.len(), 4);

        out.clear();
        board.set_piece(Square::new(1, 4), None);
        board.set_piece(Square::new(0, 3), Some(advisor));
        generate_advisor_moves(&board, Square::new(0, 3), advisor, &mut out);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].to, Square::new(1, 4));
    }
}
