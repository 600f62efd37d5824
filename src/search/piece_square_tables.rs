//! Piece-square placement tables, written from Red's side of the board.
//!
//! Black looks up the vertically mirrored row, so both sides share one table
//! per piece kind.

use crate::game_state::xiangqi_types::*;

type Table = [[i32; BOARD_COLS]; BOARD_ROWS];

const fn line_table(bases: [i32; BOARD_ROWS]) -> Table {
    let mut table = [[0; BOARD_COLS]; BOARD_ROWS];
    let center = [0, 0, 0, 5, 10, 5, 0, 0, 0];
    let mut row = 0;
    while row < BOARD_ROWS {
        let mut col = 0;
        while col < BOARD_COLS {
            table[row][col] = bases[row] + center[col];
            col += 1;
        }
        row += 1;
    }
    table
}

const ROOK_TABLE: Table = line_table([60, 55, 50, 45, 40, 45, 50, 55, 60, 65]);
const CANNON_TABLE: Table = line_table([40, 35, 30, 25, 20, 25, 30, 35, 40, 45]);

const KNIGHT_TABLE: Table = [
    [0, 0, 5, 0, 0, 0, 5, 0, 0],
    [0, 10, 0, 0, 0, 0, 0, 10, 0],
    [5, 0, 15, 0, 0, 0, 15, 0, 5],
    [0, 0, 0, 20, 0, 20, 0, 0, 0],
    [0, 0, 0, 0, 25, 0, 0, 0, 0],
    [0, 0, 20, 0, 0, 0, 20, 0, 0],
    [0, 25, 0, 30, 0, 30, 0, 25, 0],
    [35, 0, 40, 0, 45, 0, 40, 0, 35],
    [0, 45, 0, 50, 0, 50, 0, 45, 0],
    [0, 0, 0, 0, 0, 0, 0, 0, 0],
];

const PAWN_TABLE: Table = [
    [0, 0, 0, 0, 200, 0, 0, 0, 0],
    [10, 10, 10, 20, 80, 20, 10, 10, 10],
    [20, 20, 30, 40, 60, 40, 30, 20, 20],
    [30, 30, 40, 50, 50, 50, 40, 30, 30],
    [40, 40, 50, 60, 60, 60, 50, 40, 40],
    [20, 20, 25, 30, 35, 30, 25, 20, 20],
    [10, 10, 15, 20, 25, 20, 15, 10, 10],
    [5, 5, 10, 15, 20, 15, 10, 5, 5],
    [0, 0, 5, 10, 15, 10, 5, 0, 0],
    [0, 0, 0, 5, 10, 5, 0, 0, 0],
];

const KING_TABLE: Table = {
    let mut t = [[0; BOARD_COLS]; BOARD_ROWS];
    t[7] = [0, 0, 0, 10, 15, 10, 0, 0, 0];
    t[8] = [0, 0, 0, 15, 20, 15, 0, 0, 0];
    t[9] = [0, 0, 0, 10, 15, 10, 0, 0, 0];
    t
};

const ADVISOR_TABLE: Table = {
    let mut t = [[0; BOARD_COLS]; BOARD_ROWS];
    t[7] = [0, 0, 0, 15, 0, 15, 0, 0, 0];
    t[8] = [0, 0, 0, 0, 20, 0, 0, 0, 0];
    t[9] = [0, 0, 0, 15, 0, 15, 0, 0, 0];
    t
};

const BISHOP_TABLE: Table = {
    let mut t = [[0; BOARD_COLS]; BOARD_ROWS];
    t[6] = [0, 0, 10, 0, 0, 0, 10, 0, 0];
    t[8] = [0, 0, 15, 0, 0, 0, 15, 0, 0];
    t
};

#[inline]
const fn table_for(kind: PieceKind) -> &'static Table {
    match kind {
        PieceKind::King => &KING_TABLE,
        PieceKind::Advisor => &ADVISOR_TABLE,
        PieceKind::Bishop => &BISHOP_TABLE,
        PieceKind::Knight => &KNIGHT_TABLE,
        PieceKind::Rook => &ROOK_TABLE,
        PieceKind::Cannon => &CANNON_TABLE,
        PieceKind::Pawn => &PAWN_TABLE,
    }
}

/// Placement bonus for `piece` standing on `square`.
#[inline]
pub fn placement_value(piece: Piece, square: Square) -> i32 {
    let row = square.relative_row(piece.side) as usize;
    table_for(piece.kind)[row][square.col as usize]
}

#[cfg(test)]
mod tests {
    use super::placement_value;
    use crate::game_state::xiangqi_types::*;

    #[test]
    fn tables_are_mirrored_between_sides() {
        for kind in PieceKind::ALL {
            for sq in Square::all() {
                assert_eq!(
                    placement_value(Piece::new(kind, Side::Red), sq),
                    placement_value(Piece::new(kind, Side::Black), sq.flipped()),
                );
            }
        }
    }

    #[test]
    fn rook_prefers_center_file() {
        let rook = Piece::new(PieceKind::Rook, Side::Red);
        assert_eq!(placement_value(rook, Square::new(9, 4)), 75);
        assert_eq!(placement_value(rook, Square::new(4, 0)), 40);
    }
}
