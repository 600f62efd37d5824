//! ICCS coordinate notation (`h2e2`).
//!
//! Files `a`..`i` run left to right from Red's side, ranks `0`..`9` run from
//! Red's back rank upward, so board row `r` is rank `9 - r`.

use crate::errors::{XiangqiError, XiangqiResult};
use crate::game_state::board::Board;
use crate::game_state::xiangqi_types::*;
use crate::move_generation::legal_move_generator::legal_moves;

pub fn square_to_iccs(square: Square) -> String {
    let file = char::from(b'a' + square.col);
    let rank = char::from(b'0' + (9 - square.row));
    format!("{file}{rank}")
}

pub fn iccs_to_square(text: &str) -> XiangqiResult<Square> {
    let bytes = text.as_bytes();
    if bytes.len() != 2 {
        return Err(XiangqiError::Notation(format!("bad square '{text}'")));
    }
    let file = bytes[0].to_ascii_lowercase();
    let rank = bytes[1];
    if !(b'a'..=b'i').contains(&file) || !rank.is_ascii_digit() {
        return Err(XiangqiError::Notation(format!("bad square '{text}'")));
    }
    Ok(Square::new(9 - (rank - b'0'), file - b'a'))
}

pub fn move_to_iccs(mv: &Move) -> String {
    format!("{}{}", square_to_iccs(mv.from), square_to_iccs(mv.to))
}

/// Resolve `h2e2`-style text to the matching legal move for `side`.
pub fn iccs_to_move(text: &str, board: &Board, side: Side) -> XiangqiResult<Move> {
    let text = text.trim();
    if text.len() != 4 || !text.is_ascii() {
        return Err(XiangqiError::Notation(format!("bad move '{text}'")));
    }
    let from = iccs_to_square(&text[..2])?;
    let to = iccs_to_square(&text[2..])?;
    legal_moves(board, side)?
        .into_iter()
        .find(|m| m.from == from && m.to == to)
        .ok_or_else(|| XiangqiError::IllegalMove(text.to_owned()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn square_round_trip_corners() {
        assert_eq!(square_to_iccs(Square::new(9, 0)), "a0");
        assert_eq!(square_to_iccs(Square::new(0, 8)), "i9");
        assert_eq!(iccs_to_square("h2").expect("valid"), Square::new(7, 7));
    }

    #[test]
    fn central_cannon_opening_parses() {
        let board = Board::starting_position();
        let mv = iccs_to_move("h2e2", &board, Side::Red).expect("legal move");
        assert_eq!(mv.piece.kind, PieceKind::Cannon);
        assert_eq!(mv.to, Square::new(7, 4));
        assert_eq!(move_to_iccs(&mv), "h2e2");
    }

    #[test]
    fn illegal_and_malformed_moves_are_errors() {
        let board = Board::starting_position();
        assert!(matches!(
            iccs_to_move("h2h8", &board, Side::Red),
            Err(XiangqiError::IllegalMove(_))
        ));
        assert!(matches!(
            iccs_to_move("z2e2", &board, Side::Red),
            Err(XiangqiError::Notation(_))
        ));
    }
}
