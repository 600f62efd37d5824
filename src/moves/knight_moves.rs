use crate::game_state::board::Board;
use crate::game_state::xiangqi_types::*;
use crate::moves::move_builder::push_if_not_own;

/// Knight jumps as `(d_row, d_col)` with the leg offset that must be empty.
pub const KNIGHT_JUMPS: [((i8, i8), (i8, i8)); 8] = [
    ((-2, -1), (-1, 0)),
    ((-2, 1), (-1, 0)),
    ((2, -1), (1, 0)),
    ((2, 1), (1, 0)),
    ((-1, -2), (0, -1)),
    ((1, -2), (0, -1)),
    ((-1, 2), (0, 1)),
    ((1, 2), (0, 1)),
];

pub fn generate_knight_moves(board: &Board, from: Square, piece: Piece, out: &mut Vec<Move>) {
    for ((dr, dc), (lr, lc)) in KNIGHT_JUMPS {
        let (Some(leg), Some(to)) = (from.offset(lr, lc), from.offset(dr, dc)) else {
            continue;
        };
        if board.is_empty_at(leg) {
            push_if_not_own(board, from, to, piece, out);
        }
    }
}

/// Squares a knight on `from` attacks, honoring the leg rule.
pub fn knight_targets(board: &Board, from: Square) -> impl Iterator<Item = Square> + '_ {
    KNIGHT_JUMPS.iter().filter_map(move |((dr, dc), (lr, lc))| {
        let leg = from.offset(*lr, *lc)?;
        let to = from.offset(*dr, *dc)?;
        board.is_empty_at(leg).then_some(to)
    })
}

#[cfg(test)]
mod tests {
    use super::generate_knight_moves;
    use crate::game_state::board::Board;
    use crate::game_state::xiangqi_types::*;

    #[test]
    fn knight_leg_blocks_two_jumps() {
        let mut board = Board::empty();
        let knight = Piece::new(PieceKind::Knight, Side::Red);
        let from = Square::new(5, 4);
        board.set_piece(from, Some(knight));

        let mut out = Vec::new();
        generate_knight_moves(&board, from, knight, &mut out);
        assert_eq!(out.len(), 8);

        board.set_piece(Square::new(4, 4), Some(Piece::new(PieceKind::Pawn, Side::Red)));
        out.clear();
        generate_knight_moves(&board, from, knight, &mut out);
        assert_eq!(out.len(), 6);
        assert!(out.iter().all(|m| m.to.row != 3));
    }
}
