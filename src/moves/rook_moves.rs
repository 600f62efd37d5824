use crate::game_state::board::Board;
use crate::game_state::xiangqi_types::*;
use crate::moves::move_builder::{push_if_not_own, ORTHOGONAL};

/// Slide through empty cells, capturing on the first occupied enemy cell.
pub fn generate_rook_moves(board: &Board, from: Square, piece: Piece, out: &mut Vec<Move>) {
    for (dr, dc) in ORTHOGONAL {
        let mut cursor = from;
        while let Some(to) = cursor.offset(dr, dc) {
            if !push_if_not_own(board, from, to, piece, out) {
                break;
            }
            cursor = to;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::generate_rook_moves;
    use crate::game_state::board::Board;
    use crate::game_state::xiangqi_types::*;

    #[test]
    fn rook_on_empty_board_has_seventeen_moves() {
        let mut board = Board::empty();
        let rook = Piece::new(PieceKind::Rook, Side::Black);
        board.set_piece(Square::new(0, 0), Some(rook));
        let mut out = Vec::new();
        generate_rook_moves(&board, Square::new(0, 0), rook, &mut out);
        assert_eq!(out.len(), 17);
    }

    #[test]
    fn rook_stops_at_first_piece() {
        let mut board = Board::empty();
        let rook = Piece::new(PieceKind::Rook, Side::Red);
        board.set_piece(Square::new(9, 0), Some(rook));
        board.set_piece(Square::new(6, 0), Some(Piece::new(PieceKind::Pawn, Side::Black)));
        board.set_piece(Square::new(9, 1), Some(Piece::new(PieceKind::Knight, Side::Red)));
        let mut out = Vec::new();
        generate_rook_moves(&board, Square::new(9, 0), rook, &mut out);
        assert_eq!(out.len(), 3);
        assert_eq!(out.iter().filter(|m| m.is_capture()).count(), 1);
    }
}
