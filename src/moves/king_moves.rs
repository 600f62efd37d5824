use crate::game_state::board::Board;
use crate::game_state::xiangqi_rules::in_palace;
use crate::game_state::xiangqi_types::*;
use crate::moves::move_builder::{push_if_not_own, ORTHOGONAL};

/// One orthogonal step, confined to the palace.
pub fn generate_king_moves(board: &Board, from: Square, piece: Piece, out: &mut Vec<Move>) {
    for (dr, dc) in ORTHOGONAL {
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
    use super::generate_king_moves;
    use crate::game_state::board::Board;
    use crate::game_state::xiangqi_types::*;

    #[test]
    fn king_stays_in_palace() {
        let mut board = Board::empty();
        let king = Piece::new(PieceKind::King, Side::Red);
        board.set_piece(Square::new(7, 3), Some(king));
        let mut out = Vec::new();
        generate_king_moves(&board, Square::new(7, 3), king, &mut out);
        let mut targets: Vec<Square> = out.iter().map(|m| m.to).collect();
        targets.sort();
        assert_eq!(targets, vec![Square::new(7, 4), Square::new(8, 3)]);
    }
}
