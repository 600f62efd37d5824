//! Core value types shared by the board, move generation and search.
//!
//! Rows run 0..=9 from Black's back rank to Red's back rank, columns 0..=8
//! from left to right as Red sees the board. Red moves "up" (decreasing row).

use std::fmt;

use serde::{Deserialize, Serialize};

pub const BOARD_ROWS: usize = 10;
pub const BOARD_COLS: usize = 9;
pub const BOARD_SQUARES: usize = BOARD_ROWS * BOARD_COLS;

/// Side to move.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Red,
    Black,
}

impl Side {
    #[inline]
    pub const fn index(self) -> usize {
        match self {
            Side::Red => 0,
            Side::Black => 1,
        }
    }

    #[inline]
    pub const fn opposite(self) -> Self {
        match self {
            Side::Red => Side::Black,
            Side::Black => Side::Red,
        }
    }

    /// Row delta of a forward step.
    #[inline]
    pub const fn forward(self) -> i8 {
        match self {
            Side::Red => -1,
            Side::Black => 1,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Red => write!(f, "red"),
            Side::Black => write!(f, "black"),
        }
    }
}

/// Piece kind (side is carried separately in [`Piece`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PieceKind {
    King,
    Advisor,
    #[serde(alias = "elephant")]
    Bishop,
    #[serde(alias = "horse")]
    Knight,
    #[serde(alias = "chariot")]
    Rook,
    Cannon,
    Pawn,
}

impl PieceKind {
    pub const ALL: [PieceKind; 7] = [
        PieceKind::King,
        PieceKind::Advisor,
        PieceKind::Bishop,
        PieceKind::Knight,
        PieceKind::Rook,
        PieceKind::Cannon,
        PieceKind::Pawn,
    ];

    #[inline]
    pub const fn index(self) -> usize {
        match self {
            PieceKind::King => 0,
            PieceKind::Advisor => 1,
            PieceKind::Bishop => 2,
            PieceKind::Knight => 3,
            PieceKind::Rook => 4,
            PieceKind::Cannon => 5,
            PieceKind::Pawn => 6,
        }
    }

    /// Rook, Knight and Cannon: the pieces that drive the game phase.
    #[inline]
    pub const fn is_strong(self) -> bool {
        matches!(self, PieceKind::Rook | PieceKind::Knight | PieceKind::Cannon)
    }

    /// Upper-case FEN letter.
    pub const fn letter(self) -> char {
        match self {
            PieceKind::King => 'K',
            PieceKind::Advisor => 'A',
            PieceKind::Bishop => 'B',
            PieceKind::Knight => 'N',
            PieceKind::Rook => 'R',
            PieceKind::Cannon => 'C',
            PieceKind::Pawn => 'P',
        }
    }

    pub fn from_letter(c: char) -> Option<Self> {
        match c.to_ascii_uppercase() {
            'K' => Some(PieceKind::King),
            'A' => Some(PieceKind::Advisor),
            'B' | 'E' => Some(PieceKind::Bishop),
            'N' | 'H' => Some(PieceKind::Knight),
            'R' => Some(PieceKind::Rook),
            'C' => Some(PieceKind::Cannon),
            'P' => Some(PieceKind::Pawn),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Piece {
    pub kind: PieceKind,
    pub side: Side,
}

impl Piece {
    #[inline]
    pub const fn new(kind: PieceKind, side: Side) -> Self {
        Self { kind, side }
    }

    /// FEN letter: upper case for Red, lower case for Black.
    pub fn to_char(self) -> char {
        match self.side {
            Side::Red => self.kind.letter(),
            Side::Black => self.kind.letter().to_ascii_lowercase(),
        }
    }

    pub fn from_char(c: char) -> Option<Self> {
        let kind = PieceKind::from_letter(c)?;
        let side = if c.is_ascii_uppercase() {
            Side::Red
        } else {
            Side::Black
        };
        Some(Self { kind, side })
    }
}

/// Board cell: empty or holding one piece.
pub type Cell = Option<Piece>;

/// Board coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "[u8; 2]", into = "[u8; 2]")]
pub struct Square {
    pub row: u8,
    pub col: u8,
}

impl Square {
    #[inline]
    pub const fn new(row: u8, col: u8) -> Self {
        Self { row, col }
    }

    /// Offset by a signed delta, `None` when the result leaves the board.
    #[inline]
    pub fn offset(self, d_row: i8, d_col: i8) -> Option<Self> {
        let row = self.row as i8 + d_row;
        let col = self.col as i8 + d_col;
        if (0..BOARD_ROWS as i8).contains(&row) && (0..BOARD_COLS as i8).contains(&col) {
            Some(Self::new(row as u8, col as u8))
        } else {
            None
        }
    }

    #[inline]
    pub const fn index(self) -> usize {
        self.row as usize * BOARD_COLS + self.col as usize
    }

    #[inline]
    pub const fn from_index(index: usize) -> Self {
        Self::new((index / BOARD_COLS) as u8, (index % BOARD_COLS) as u8)
    }

    #[inline]
    pub fn is_valid(self) -> bool {
        (self.row as usize) < BOARD_ROWS && (self.col as usize) < BOARD_COLS
    }

    /// Row as seen from `side`'s own back rank (9 = own back rank, 0 = enemy back rank).
    #[inline]
    pub const fn relative_row(self, side: Side) -> u8 {
        match side {
            Side::Red => self.row,
            Side::Black => 9 - self.row,
        }
    }

    /// Vertical mirror (swaps the two halves of the board).
    #[inline]
    pub const fn flipped(self) -> Self {
        Self::new(9 - self.row, self.col)
    }

    #[inline]
    pub fn manhattan(self, other: Square) -> i32 {
        (self.row as i32 - other.row as i32).abs() + (self.col as i32 - other.col as i32).abs()
    }

    pub fn all() -> impl Iterator<Item = Square> {
        (0..BOARD_SQUARES).map(Square::from_index)
    }
}

impl From<[u8; 2]> for Square {
    fn from(value: [u8; 2]) -> Self {
        Square::new(value[0], value[1])
    }
}

impl From<Square> for [u8; 2] {
    fn from(value: Square) -> Self {
        [value.row, value.col]
    }
}

/// A fully described move. Immutable once generated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Move {
    pub from: Square,
    pub to: Square,
    pub piece: Piece,
    pub captured: Option<Piece>,
    pub gives_check: bool,
}

impl Move {
    #[inline]
    pub const fn is_capture(&self) -> bool {
        self.captured.is_some()
    }

    /// Same origin and destination, ignoring annotations.
    #[inline]
    pub fn same_squares(&self, other: &Move) -> bool {
        self.from == other.from && self.to == other.to
    }
}
