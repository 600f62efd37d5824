//! FEN-to-Board parser.
//!
//! Accepts the common Xiangqi FEN layout: ten `/`-separated rows from Black's
//! back rank down, followed by the side to move (`w`/`r` for Red, `b` for
//! Black). Trailing move counters, when present, are ignored.

use crate::errors::{XiangqiError, XiangqiResult};
use crate::game_state::board::Board;
use crate::game_state::xiangqi_types::*;

pub fn parse_fen(fen: &str) -> XiangqiResult<(Board, Side)> {
    let mut parts = fen.split_whitespace();

    let board_part = parts
        .next()
        .ok_or_else(|| XiangqiError::Fen("missing board layout".to_owned()))?;
    let side = match parts.next() {
        None => Side::Red,
        Some(token) => parse_side_to_move(token)?,
    };

    let board = parse_board(board_part)?;
    board
        .validate()
        .map_err(|e| XiangqiError::Fen(format!("{e}")))?;
    Ok((board, side))
}

/// Parse only the piece placement, without validating King presence.
pub fn parse_board(board_part: &str) -> XiangqiResult<Board> {
    let rows: Vec<&str> = board_part.split('/').collect();
    if rows.len() != BOARD_ROWS {
        return Err(XiangqiError::Fen(format!(
            "board layout must contain {BOARD_ROWS} rows, found {}",
            rows.len()
        )));
    }

    let mut board = Board::empty();
    for (row, row_str) in rows.iter().enumerate() {
        let mut col = 0usize;
        for ch in row_str.chars() {
            if let Some(empty) = ch.to_digit(10) {
                if !(1..=9).contains(&empty) {
                    return Err(XiangqiError::Fen(format!("invalid empty-cell count '{ch}'")));
                }
                col += empty as usize;
            } else {
                let piece = Piece::from_char(ch)
                    .ok_or_else(|| XiangqiError::Fen(format!("invalid piece character '{ch}'")))?;
                if col >= BOARD_COLS {
                    return Err(XiangqiError::Fen(format!("row {row} overflows")));
                }
                board.set_piece(Square::new(row as u8, col as u8), Some(piece));
                col += 1;
            }
        }
        if col != BOARD_COLS {
            return Err(XiangqiError::Fen(format!(
                "row {row} describes {col} columns instead of {BOARD_COLS}"
            )));
        }
    }
    Ok(board)
}

fn parse_side_to_move(token: &str) -> XiangqiResult<Side> {
    match token {
        "w" | "r" | "red" => Ok(Side::Red),
        "b" | "black" => Ok(Side::Black),
        other => Err(XiangqiError::Fen(format!("invalid side to move '{other}'"))),
    }
}
