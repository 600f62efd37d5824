//! Board-to-FEN generator, the inverse of `fen_parser`.

use crate::game_state::board::Board;
use crate::game_state::xiangqi_types::*;

pub fn generate_fen(board: &Board, side: Side) -> String {
    let mut out = String::with_capacity(96);
    for row in 0..BOARD_ROWS {
        if row > 0 {
            out.push('/');
        }
        let mut empty = 0u8;
        for col in 0..BOARD_COLS {
            match board.piece_at(Square::new(row as u8, col as u8)) {
                None => empty += 1,
                Some(piece) => {
                    if empty > 0 {
                        out.push(char::from(b'0' + empty));
                        empty = 0;
                    }
                    out.push(piece.to_char());
                }
            }
        }
        if empty > 0 {
            out.push(char::from(b'0' + empty));
        }
    }
    out.push(' ');
    out.push(match side {
        Side::Red => 'w',
        Side::Black => 'b',
    });
    out
}
