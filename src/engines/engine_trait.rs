//! Engine abstraction layer.
//!
//! Defines the position handed to an engine, the search limits, and the
//! decision it returns, so a substitute move provider can stand behind the
//! same trait as the built-in orchestrator.

use std::fmt;

use crate::errors::XiangqiResult;
use crate::game_state::board::Board;
use crate::game_state::position_history::PositionHistory;
use crate::game_state::xiangqi_types::{Move, Side};
use crate::tables::book_matcher::BookSource;

/// Position to move in, with the game record leading to it.
#[derive(Debug, Clone, Copy)]
pub struct GameContext<'a> {
    pub board: &'a Board,
    pub side: Side,
    /// Moves played since the start position.
    pub history: &'a [Move],
    /// One record per ply, for perpetual-check adjudication.
    pub positions: &'a PositionHistory,
}

#[derive(Debug, Clone, Default)]
pub struct GoParams {
    pub depth: Option<u8>,
    pub movetime_ms: Option<u64>,
    pub max_nodes: Option<u64>,
    pub red_time_ms: Option<u64>,
    pub black_time_ms: Option<u64>,
    pub red_inc_ms: Option<u64>,
    pub black_inc_ms: Option<u64>,
    pub movestogo: Option<u16>,
}

impl GoParams {
    /// Remaining clock and increment for `side`.
    pub fn clock_for(&self, side: Side) -> (Option<u64>, Option<u64>) {
        match side {
            Side::Red => (self.red_time_ms, self.red_inc_ms),
            Side::Black => (self.black_time_ms, self.black_inc_ms),
        }
    }
}

/// End of the game for the side to move. In Xiangqi both outcomes lose.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminalResult {
    Checkmate { loser: Side },
    Stalemate { loser: Side },
}

impl TerminalResult {
    pub fn loser(&self) -> Side {
        match *self {
            Self::Checkmate { loser } | Self::Stalemate { loser } => loser,
        }
    }
}

impl fmt::Display for TerminalResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Checkmate { loser } => write!(f, "{loser} is checkmated"),
            Self::Stalemate { loser } => write!(f, "{loser} is stalemated"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MoveSource {
    Book(BookSource),
    Emergency,
    Search,
    Fallback,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MoveChoice {
    pub mv: Move,
    pub source: MoveSource,
    /// Search score from the mover's point of view, when a search ran.
    pub score: Option<i32>,
    pub depth: u8,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Decision {
    Move(MoveChoice),
    Terminal(TerminalResult),
}

impl Decision {
    pub fn chosen_move(&self) -> Option<Move> {
        match self {
            Self::Move(choice) => Some(choice.mv),
            Self::Terminal(_) => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct EngineOutput {
    pub decision: Decision,
    pub info_lines: Vec<String>,
}

pub trait Engine: Send {
    fn new_game(&mut self) {}

    fn set_option(&mut self, _name: &str, _value: &str) -> XiangqiResult<()> {
        Ok(())
    }

    fn choose_move(&mut self, game: &GameContext<'_>, params: &GoParams) -> XiangqiResult<EngineOutput>;
}
