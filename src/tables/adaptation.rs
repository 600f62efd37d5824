//! Re-locating stored book moves on boards that drifted from the book line.
//!
//! When the literal origin square no longer holds the expected piece, the
//! stored move is read as an abstract intention and a concrete legal move
//! satisfying it is searched for on the current board.

use crate::errors::XiangqiResult;
use crate::game_state::board::Board;
use crate::game_state::xiangqi_rules::{on_own_half, CENTER_COL};
use crate::game_state::xiangqi_types::*;
use crate::move_generation::legal_move_generator::{find_legal_move, legal_moves};
use crate::tables::book_data::BookMove;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveIntention {
    /// Long Rook/Cannon move into the enemy half.
    CrossRiver { kind: PieceKind },
    /// Knight jump forward onto a central file.
    ApproachCenter { kind: PieceKind },
    /// Same displacement from any piece of the kind.
    RelativeShift { kind: PieceKind, d_row: i8, d_col: i8 },
}

impl MoveIntention {
    pub fn of(book_move: &BookMove) -> Self {
        let kind = book_move.piece.kind;
        let d_row = book_move.to.row as i8 - book_move.from.row as i8;
        let d_col = book_move.to.col as i8 - book_move.from.col as i8;
        match kind {
            PieceKind::Rook | PieceKind::Cannon if d_row.abs() > 2 => Self::CrossRiver { kind },
            PieceKind::Knight if d_row.abs() == 2 && (book_move.to.col as i8 - CENTER_COL as i8).abs() <= 1 => {
                Self::ApproachCenter { kind }
            }
            _ => Self::RelativeShift { kind, d_row, d_col },
        }
    }

    pub fn kind(&self) -> PieceKind {
        match *self {
            Self::CrossRiver { kind } | Self::ApproachCenter { kind } | Self::RelativeShift { kind, .. } => kind,
        }
    }

    pub fn satisfied_by(&self, mv: &Move) -> bool {
        if mv.piece.kind != self.kind() {
            return false;
        }
        let side = mv.piece.side;
        match *self {
            Self::CrossRiver { .. } => !on_own_half(side, mv.to),
            Self::ApproachCenter { .. } => {
                (mv.to.col as i8 - CENTER_COL as i8).abs() <= 1 && mv.to.relative_row(side) < mv.from.relative_row(side)
            }
            Self::RelativeShift { d_row, d_col, .. } => {
                mv.to.row as i8 - mv.from.row as i8 == d_row && mv.to.col as i8 - mv.from.col as i8 == d_col
            }
        }
    }
}

/// Resolve `book_move` to a legal move for `side` on `board`.
///
/// `Ok(None)` when the move belongs to the other side or no reading of it
/// fits the board.
pub fn adapt_book_move(board: &Board, side: Side, book_move: &BookMove) -> XiangqiResult<Option<Move>> {
    if book_move.side() != side {
        return Ok(None);
    }
    if board.piece_at(book_move.from) == Some(book_move.piece) {
        let literal = Move {
            from: book_move.from,
            to: book_move.to,
            piece: book_move.piece,
            captured: None,
            gives_check: false,
        };
        if let Some(mv) = find_legal_move(board, side, &literal)? {
            return Ok(Some(mv));
        }
    }

    let intention = MoveIntention::of(book_move);
    let candidates = legal_moves(board, side)?.into_iter().filter(|m| intention.satisfied_by(m));
    let chosen = match intention {
        // The most advanced piece makes the crossing.
        MoveIntention::CrossRiver { .. } => candidates.min_by_key(|m| (m.from.relative_row(side), m.to.relative_row(side))),
        _ => candidates.min_by_key(|m| m.to.manhattan(book_move.to)),
    };
    if let Some(mv) = &chosen {
        log::debug!("book move {book_move} re-located as {:?} ({:?}->{:?})", intention, mv.from, mv.to);
    }
    Ok(chosen)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::fen_parser::parse_fen;

    fn book(text: &str) -> BookMove {
        BookMove::parse(text).expect("valid book move")
    }

    #[test]
    fn literal_move_is_used_when_it_fits() {
        let board = Board::starting_position();
        let mv = adapt_book_move(&board, Side::Red, &book("C h2e2"))
            .expect("kings present")
            .expect("adapted");
        assert_eq!((mv.from, mv.to), (Square::new(7, 7), Square::new(7, 4)));
    }

    #[test]
    fn wrong_side_is_no_match() {
        let board = Board::starting_position();
        assert!(adapt_book_move(&board, Side::Black, &book("C h2e2")).expect("kings present").is_none());
    }

    #[test]
    fn intention_classification() {
        assert_eq!(MoveIntention::of(&book("R h0h6")), MoveIntention::CrossRiver { kind: PieceKind::Rook });
        assert_eq!(MoveIntention::of(&book("N h0g2")), MoveIntention::RelativeShift {
            kind: PieceKind::Knight,
            d_row: -2,
            d_col: -1,
        });
        assert_eq!(MoveIntention::of(&book("N c2d4")), MoveIntention::ApproachCenter { kind: PieceKind::Knight });
    }

    #[test]
    fn displaced_rook_still_crosses_the_river() {
        // Red rook sits on h1 instead of h0 and the h2 cannon is gone.
        let (board, side) =
            parse_fen("rnbakabnr/9/1c5c1/p1p1p1p1p/9/9/P1P1P1P1P/1C7/7R1/RNBAKABN1 w").expect("valid fen");
        let mv = adapt_book_move(&board, side, &book("R h0h6"))
            .expect("kings present")
            .expect("re-located");
        assert_eq!(mv.piece.kind, PieceKind::Rook);
        assert!(!on_own_half(side, mv.to));
    }

    #[test]
    fn shift_falls_back_to_another_piece_of_the_kind() {
        // No knight on h0, the b0 knight makes the same jump shape.
        let (board, side) = parse_fen("rnbakabnr/9/1c5c1/p1p1p1p1p/9/9/P1P1P1P1P/1C5C1/9/RNBAKAB1R w").expect("valid fen");
        let mv = adapt_book_move(&board, side, &book("N h0g2"))
            .expect("kings present")
            .expect("re-located");
        assert_eq!(mv.from, Square::new(9, 1));
        assert_eq!(mv.to, Square::new(7, 0));
    }
}
