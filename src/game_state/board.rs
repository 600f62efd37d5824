//! Mutable 10x9 board with incremental hashing and make/unmake support.
//!
//! `Board` is owned by exactly one search at a time and mutated in place by
//! `apply`/`revert` pairs. Each `apply` returns the [`UndoState`] that reverses
//! it; the board keeps no move history of its own.

use std::fmt;

use crate::errors::{XiangqiError, XiangqiResult};
use crate::game_state::undo_state::UndoState;
use crate::game_state::xiangqi_rules::in_palace;
use crate::game_state::xiangqi_types::*;
use crate::search::zobrist::piece_square_key;

const BACK_RANK: [PieceKind; BOARD_COLS] = [
    PieceKind::Rook,
    PieceKind::Knight,
    PieceKind::Bishop,
    PieceKind::Advisor,
    PieceKind::King,
    PieceKind::Advisor,
    PieceKind::Bishop,
    PieceKind::Knight,
    PieceKind::Rook,
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Board {
    cells: [[Cell; BOARD_COLS]; BOARD_ROWS],
    // King location cache, indexed by `Side::index`.
    kings: [Option<Square>; 2],
    // Placement-only Zobrist hash.
    hash: u64,
}

impl Default for Board {
    fn default() -> Self {
        Self::empty()
    }
}

impl Board {
    pub fn empty() -> Self {
        Self {
            cells: [[None; BOARD_COLS]; BOARD_ROWS],
            kings: [None; 2],
            hash: 0,
        }
    }

    pub fn starting_position() -> Self {
        let mut board = Self::empty();
        for (col, kind) in BACK_RANK.iter().enumerate() {
            let col = col as u8;
            board.set_piece(Square::new(0, col), Some(Piece::new(*kind, Side::Black)));
            board.set_piece(Square::new(9, col), Some(Piece::new(*kind, Side::Red)));
        }
        for col in [1, 7] {
            board.set_piece(Square::new(2, col), Some(Piece::new(PieceKind::Cannon, Side::Black)));
            board.set_piece(Square::new(7, col), Some(Piece::new(PieceKind::Cannon, Side::Red)));
        }
        for col in [0, 2, 4, 6, 8] {
            board.set_piece(Square::new(3, col), Some(Piece::new(PieceKind::Pawn, Side::Black)));
            board.set_piece(Square::new(6, col), Some(Piece::new(PieceKind::Pawn, Side::Red)));
        }
        board
    }

    #[inline]
    pub fn piece_at(&self, square: Square) -> Cell {
        self.cells[square.row as usize][square.col as usize]
    }

    #[inline]
    pub fn is_empty_at(&self, square: Square) -> bool {
        self.piece_at(square).is_none()
    }

    /// Place or clear a cell, keeping the hash and King cache consistent.
    pub fn set_piece(&mut self, square: Square, cell: Cell) {
        if let Some(old) = self.piece_at(square) {
            self.hash ^= piece_square_key(old, square);
            if old.kind == PieceKind::King && self.kings[old.side.index()] == Some(square) {
                self.kings[old.side.index()] = None;
            }
        }
        if let Some(new) = cell {
            self.hash ^= piece_square_key(new, square);
            if new.kind == PieceKind::King {
                self.kings[new.side.index()] = Some(square);
            }
        }
        self.cells[square.row as usize][square.col as usize] = cell;
    }

    #[inline]
    pub fn hash(&self) -> u64 {
        self.hash
    }

    /// All occupied squares in row-major order.
    pub fn pieces(&self) -> impl Iterator<Item = (Square, Piece)> + '_ {
        Square::all().filter_map(move |sq| self.piece_at(sq).map(|p| (sq, p)))
    }

    pub fn pieces_of(&self, side: Side) -> impl Iterator<Item = (Square, Piece)> + '_ {
        self.pieces().filter(move |(_, p)| p.side == side)
    }

    pub fn count(&self, side: Side, kind: PieceKind) -> usize {
        self.pieces_of(side).filter(|(_, p)| p.kind == kind).count()
    }

    /// Rooks, Knights and Cannons of both sides.
    pub fn strong_piece_count(&self) -> usize {
        self.pieces().filter(|(_, p)| p.kind.is_strong()).count()
    }

    /// King location, or `NoKing` for a corrupted/terminal board.
    #[inline]
    pub fn king_square(&self, side: Side) -> XiangqiResult<Square> {
        self.kings[side.index()].ok_or(XiangqiError::NoKing(side))
    }

    /// Check structural invariants: one King per side, inside its palace.
    pub fn validate(&self) -> XiangqiResult<()> {
        for side in [Side::Red, Side::Black] {
            let kings = self.count(side, PieceKind::King);
            if kings == 0 {
                return Err(XiangqiError::NoKing(side));
            }
            if kings > 1 {
                return Err(XiangqiError::InvalidBoard(format!("{side} has {kings} kings")));
            }
            let king = self.king_square(side)?;
            if !in_palace(side, king) {
                return Err(XiangqiError::InvalidBoard(format!(
                    "{side} king outside palace at ({}, {})",
                    king.row, king.col
                )));
            }
        }
        Ok(())
    }

    /// Make `mv` in place and return the record that reverses it.
    pub fn apply(&mut self, mv: &Move) -> UndoState {
        debug_assert_eq!(self.piece_at(mv.from), Some(mv.piece));
        let undo = UndoState {
            from: mv.from,
            to: mv.to,
            moved_piece: mv.piece,
            captured_piece: self.piece_at(mv.to),
            prev_hash: self.hash,
        };

        if let Some(captured) = undo.captured_piece {
            self.hash ^= piece_square_key(captured, mv.to);
            if captured.kind == PieceKind::King {
                self.kings[captured.side.index()] = None;
            }
        }
        self.hash ^= piece_square_key(mv.piece, mv.from) ^ piece_square_key(mv.piece, mv.to);
        self.cells[mv.from.row as usize][mv.from.col as usize] = None;
        self.cells[mv.to.row as usize][mv.to.col as usize] = Some(mv.piece);
        if mv.piece.kind == PieceKind::King {
            self.kings[mv.piece.side.index()] = Some(mv.to);
        }

        undo
    }

    /// Reverse a move made by [`Board::apply`].
    pub fn revert(&mut self, undo: UndoState) {
        self.cells[undo.from.row as usize][undo.from.col as usize] = Some(undo.moved_piece);
        self.cells[undo.to.row as usize][undo.to.col as usize] = undo.captured_piece;
        if undo.moved_piece.kind == PieceKind::King {
            self.kings[undo.moved_piece.side.index()] = Some(undo.from);
        }
        if let Some(captured) = undo.captured_piece {
            if captured.kind == PieceKind::King {
                self.kings[captured.side.index()] = Some(undo.to);
            }
        }
        self.hash = undo.prev_hash;
    }
}

impl fmt::Display for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for row in 0..BOARD_ROWS {
            for col in 0..BOARD_COLS {
                let c = self.cells[row][col].map_or('.', Piece::to_char);
                write!(f, "{c}")?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::Board;
    use crate::errors::XiangqiError;
    use crate::game_state::xiangqi_types::*;

    #[test]
    fn starting_position_layout() {
        let board = Board::starting_position();
        assert_eq!(board.pieces().count(), 32);
        assert_eq!(board.king_square(Side::Red), Ok(Square::new(9, 4)));
        assert_eq!(board.king_square(Side::Black), Ok(Square::new(0, 4)));
        assert_eq!(
            board.piece_at(Square::new(7, 1)),
            Some(Piece::new(PieceKind::Cannon, Side::Red))
        );
        assert_eq!(board.strong_piece_count(), 12);
        assert!(board.validate().is_ok());
    }

    #[test]
    fn apply_then_revert_restores_board() {
        let mut board = Board::starting_position();
        let before = board.clone();
        let mv = Move {
            from: Square::new(7, 1),
            to: Square::new(0, 1),
            piece: Piece::new(PieceKind::Cannon, Side::Red),
            captured: Some(Piece::new(PieceKind::Knight, Side::Black)),
            gives_check: false,
        };
        let undo = board.apply(&mv);
        assert_ne!(board, before);
        assert_eq!(
            board.piece_at(Square::new(0, 1)),
            Some(Piece::new(PieceKind::Cannon, Side::Red))
        );
        board.revert(undo);
        assert_eq!(board, before);
    }

    #[test]
    fn missing_king_is_reported() {
        let mut board = Board::starting_position();
        board.set_piece(Square::new(0, 4), None);
        assert_eq!(board.king_square(Side::Black), Err(XiangqiError::NoKing(Side::Black)));
        assert_eq!(board.validate(), Err(XiangqiError::NoKing(Side::Black)));
    }
}
