//! Errors used throughout the engine.
//!
//! `XiangqiError` is the single error type across the crate. Search timeouts,
//! book misses and positions without legal moves are ordinary outcomes and are
//! reported through `Option`/result enums, never through this type.

use thiserror::Error;

use crate::game_state::xiangqi_types::Side;

pub type XiangqiResult<T> = Result<T, XiangqiError>;

/// Unified error type for the engine.
///
/// `NoKing` and `InvalidBoard` mean the caller handed over a corrupted
/// position and no move can be produced for it. The parsing and configuration
/// variants are recoverable input errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum XiangqiError {
    /// A side has no King on the board.
    #[error("no {0} king on the board")]
    NoKing(Side),

    /// The board violates a structural invariant (e.g. two Kings for one side).
    #[error("invalid board: {0}")]
    InvalidBoard(String),

    /// Position text could not be parsed.
    #[error("invalid FEN: {0}")]
    Fen(String),

    /// Coordinate notation could not be parsed.
    #[error("invalid move notation: {0}")]
    Notation(String),

    /// A requested move is not legal in the given position.
    #[error("illegal move: {0}")]
    IllegalMove(String),

    /// Book table text could not be deserialized.
    #[error("book data error: {0}")]
    BookData(String),

    /// Difficulty profile is malformed or out of range.
    #[error("configuration error: {0}")]
    Config(String),
}
