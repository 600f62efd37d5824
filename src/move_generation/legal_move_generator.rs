//! Full legal move generation pipeline.
//!
//! Orchestrates piece-wise pseudo-legal generation, applies candidate moves,
//! filters self-check and flying-general outcomes, and annotates checking
//! moves. Legality is always a post-condition of the applied move.

use crate::errors::XiangqiResult;
use crate::game_state::board::Board;
use crate::game_state::xiangqi_types::*;
use crate::move_generation::legal_move_checks::{is_in_check, kings_facing};
use crate::moves::advisor_moves::generate_advisor_moves;
use crate::moves::bishop_moves::generate_bishop_moves;
use crate::moves::cannon_moves::generate_cannon_moves;
use crate::moves::king_moves::generate_king_moves;
use crate::moves::knight_moves::generate_knight_moves;
use crate::moves::pawn_moves::generate_pawn_moves;
use crate::moves::rook_moves::generate_rook_moves;

/// Pseudo-legal moves of the piece standing on `from`.
pub fn pseudo_moves_from(board: &Board, from: Square, piece: Piece, out: &mut Vec<Move>) {
    match piece.kind {
        PieceKind::King => generate_king_moves(board, from, piece, out),
        PieceKind::Advisor => generate_advisor_moves(board, from, piece, out),
        PieceKind::Bishop => generate_bishop_moves(board, from, piece, out),
        PieceKind::Knight => generate_knight_moves(board, from, piece, out),
        PieceKind::Rook => generate_rook_moves(board, from, piece, out),
        PieceKind::Cannon => generate_cannon_moves(board, from, piece, out),
        PieceKind::Pawn => generate_pawn_moves(board, from, piece, out),
    }
}

/// Pseudo-legal moves for every piece of `side` (own King safety not checked).
pub fn pseudo_moves(board: &Board, side: Side) -> Vec<Move> {
    let mut out = Vec::with_capacity(64);
    for (from, piece) in board.pieces_of(side) {
        pseudo_moves_from(board, from, piece, &mut out);
    }
    out
}

/// Legal moves for `side`, each annotated with `gives_check`.
///
/// Fails with `NoKing` when either King is missing.
pub fn legal_moves(board: &Board, side: Side) -> XiangqiResult<Vec<Move>> {
    let mut scratch = board.clone();
    legal_moves_in_place(&mut scratch, side)
}

/// Same as [`legal_moves`] but makes/unmakes on the caller's board.
pub fn legal_moves_in_place(board: &mut Board, side: Side) -> XiangqiResult<Vec<Move>> {
    let pseudo = pseudo_moves(board, side);
    filter_legal(board, side, pseudo)
}

/// Legal captures only, for quiescence search.
pub fn legal_captures_in_place(board: &mut Board, side: Side) -> XiangqiResult<Vec<Move>> {
    let mut pseudo = pseudo_moves(board, side);
    pseudo.retain(Move::is_capture);
    filter_legal(board, side, pseudo)
}

fn filter_legal(board: &mut Board, side: Side, pseudo: Vec<Move>) -> XiangqiResult<Vec<Move>> {
    board.king_square(side)?;
    board.king_square(side.opposite())?;

    let mut legal = Vec::with_capacity(pseudo.len());
    for mut mv in pseudo {
        // Capturing the King never happens in a legal game; such positions are
        // already illegal for the opponent.
        if matches!(mv.captured, Some(p) if p.kind == PieceKind::King) {
            continue;
        }
        let undo = board.apply(&mv);
        let verdict = leaves_mover_safe(board, side).and_then(|safe| {
            if safe {
                is_in_check(board, side.opposite()).map(Some)
            } else {
                Ok(None)
            }
        });
        board.revert(undo);

        if let Some(gives_check) = verdict? {
            mv.gives_check = gives_check;
            legal.push(mv);
        }
    }
    Ok(legal)
}

/// Whether `side` has at least one legal move; stops at the first one found.
pub fn has_legal_reply(board: &mut Board, side: Side) -> XiangqiResult<bool> {
    board.king_square(side.opposite())?;
    for mv in pseudo_moves(board, side) {
        if matches!(mv.captured, Some(p) if p.kind == PieceKind::King) {
            continue;
        }
        let undo = board.apply(&mv);
        let safe = leaves_mover_safe(board, side);
        board.revert(undo);
        if safe? {
            return Ok(true);
        }
    }
    Ok(false)
}

/// Post-move legality: mover not in check and Kings not facing.
#[inline]
fn leaves_mover_safe(board: &Board, side: Side) -> XiangqiResult<bool> {
    Ok(!is_in_check(board, side)? && !kings_facing(board)?)
}

/// Re-verify an externally sourced move (book, cache, fallback).
///
/// Returns the generator's annotated copy when a legal move with the same
/// squares and moving piece exists.
pub fn find_legal_move(board: &Board, side: Side, candidate: &Move) -> XiangqiResult<Option<Move>> {
    if board.piece_at(candidate.from) != Some(candidate.piece) || candidate.piece.side != side {
        return Ok(None);
    }
    let mut scratch = board.clone();
    let mut pseudo = Vec::with_capacity(17);
    pseudo_moves_from(&scratch, candidate.from, candidate.piece, &mut pseudo);
    pseudo.retain(|m| m.to == candidate.to);
    Ok(filter_legal(&mut scratch, side, pseudo)?.into_iter().next())
}

/// Legal moves of the single piece on `from`.
pub fn legal_moves_from(board: &Board, side: Side, from: Square) -> XiangqiResult<Vec<Move>> {
    let Some(piece) = board.piece_at(from).filter(|p| p.side == side) else {
        return Ok(Vec::new());
    };
    let mut scratch = board.clone();
    let mut pseudo = Vec::with_capacity(17);
    pseudo_moves_from(&scratch, from, piece, &mut pseudo);
    filter_legal(&mut scratch, side, pseudo)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::XiangqiError;
    use crate::utils::fen_parser::parse_fen;

    fn place(board: &mut Board, row: u8, col: u8, kind: PieceKind, side: Side) {
        board.set_piece(Square::new(row, col), Some(Piece::new(kind, side)));
    }

    #[test]
    fn starting_position_has_44_moves() {
        let board = Board::starting_position();
        assert_eq!(legal_moves(&board, Side::Red).expect("kings present").len(), 44);
        assert_eq!(legal_moves(&board, Side::Black).expect("kings present").len(), 44);
    }

    #[test]
    fn flying_general_move_is_rejected() {
        // Red King on (9,3), Black King on (0,4), a Red Rook screens the e-file.
        let mut board = Board::empty();
        place(&mut board, 9, 3, PieceKind::King, Side::Red);
        place(&mut board, 0, 4, PieceKind::King, Side::Black);
        place(&mut board, 5, 0, PieceKind::Rook, Side::Red);

        let moves = legal_moves(&board, Side::Red).expect("kings present");
        // Basic movement would allow (9,3)->(9,4), but it faces the Black King.
        assert!(!moves
            .iter()
            .any(|m| m.piece.kind == PieceKind::King && m.to == Square::new(9, 4)));
        assert!(moves
            .iter()
            .any(|m| m.piece.kind == PieceKind::King && m.to == Square::new(8, 3)));
    }

    #[test]
    fn facing_kings_square_is_no_escape() {
        // Rooks hold e8 and the f file; d9 is unattacked but faces the Red King.
        let (mut board, side) = parse_fen("4k4/9/4R4/5R3/9/9/9/9/9/3K5 b").expect("valid fen");
        assert!(is_in_check(&board, side).expect("kings present"));

        let pseudo_escape = pseudo_moves(&board, side)
            .into_iter()
            .find(|m| m.to == Square::new(0, 3))
            .expect("king can step to d9");
        let undo = board.apply(&pseudo_escape);
        assert!(!is_in_check(&board, side).expect("kings present"));
        assert!(kings_facing(&board).expect("kings present"));
        board.revert(undo);

        assert!(!has_legal_reply(&mut board, side).expect("kings present"));
        assert!(legal_moves(&board, side).expect("kings present").is_empty());

        let (mut open, side) = parse_fen("4k4/9/4R4/9/9/9/9/9/9/3K5 b").expect("valid fen");
        assert!(has_legal_reply(&mut open, side).expect("kings present"));
    }

    #[test]
    fn screening_piece_cannot_leave_the_file() {
        let mut board = Board::empty();
        place(&mut board, 9, 4, PieceKind::King, Side::Red);
        place(&mut board, 0, 4, PieceKind::King, Side::Black);
        place(&mut board, 5, 4, PieceKind::Rook, Side::Red);

        let moves = legal_moves(&board, Side::Red).expect("kings present");
        assert!(moves
            .iter()
            .filter(|m| m.piece.kind == PieceKind::Rook)
            .all(|m| m.to.col == 4));
    }

    #[test]
    fn gives_check_is_annotated() {
        let (board, side) = parse_fen("3k5/9/9/9/9/9/9/9/9/4K3R w").expect("valid FEN");
        let moves = legal_moves(&board, side).expect("kings present");
        let check = moves
            .iter()
            .find(|m| m.to == Square::new(0, 8))
            .expect("rook slides up to the back rank");
        assert!(check.gives_check);
    }

    #[test]
    fn evasions_only_when_in_check() {
        let (board, side) = parse_fen("4k4/9/9/9/9/9/9/9/3r5/3K5 w").expect("valid FEN");
        let moves = legal_moves(&board, side).expect("kings present");
        for mv in &moves {
            let mut after = board.clone();
            after.apply(mv);
            assert!(!is_in_check(&after, Side::Red).expect("kings present"));
        }
        assert_eq!(moves.len(), 1);
        assert_eq!(moves[0].captured.map(|p| p.kind), Some(PieceKind::Rook));
    }

    #[test]
    fn missing_king_is_an_error() {
        let mut board = Board::empty();
        place(&mut board, 9, 4, PieceKind::King, Side::Red);
        assert_eq!(
            legal_moves(&board, Side::Red),
            Err(XiangqiError::NoKing(Side::Black))
        );
    }

    #[test]
    fn find_legal_move_rejects_mismatched_piece() {
        let board = Board::starting_position();
        let bogus = Move {
            from: Square::new(7, 7),
            to: Square::new(7, 4),
            piece: Piece::new(PieceKind::Rook, Side::Red),
            captured: None,
            gives_check: false,
        };
        assert_eq!(find_legal_move(&board, Side::Red, &bogus), Ok(None));

        let cannon = Move {
            piece: Piece::new(PieceKind::Cannon, Side::Red),
            ..bogus
        };
        let found = find_legal_move(&board, Side::Red, &cannon).expect("kings present");
        assert_eq!(found.map(|m| m.to), Some(Square::new(7, 4)));
    }
}
