//! Book knowledge tables: opening lines, traps, tactics, endgame and
//! midgame patterns.
//!
//! Tables are plain TOML deserialized with serde. A default table ships
//! embedded in the binary; any conforming table can be loaded instead with
//! [`BookData::from_toml_str`].

use std::fmt;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::errors::{XiangqiError, XiangqiResult};
use crate::game_state::xiangqi_types::*;
use crate::search::piece_values::exchange_value;
use crate::utils::iccs::{iccs_to_square, square_to_iccs};

const EMBEDDED_BOOK: &str = include_str!("data/xiangqi_book.toml");

/// A stored move: piece letter (case gives the side) plus ICCS squares.
///
/// Serialized as `"C h2e2"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct BookMove {
    pub piece: Piece,
    pub from: Square,
    pub to: Square,
}

impl BookMove {
    pub fn parse(text: &str) -> XiangqiResult<Self> {
        let mut parts = text.split_whitespace();
        let (Some(letter), Some(squares), None) = (parts.next(), parts.next(), parts.next()) else {
            return Err(XiangqiError::BookData(format!("bad book move '{text}'")));
        };
        let mut letters = letter.chars();
        let piece = match (letters.next(), letters.next()) {
            (Some(c), None) => Piece::from_char(c),
            _ => None,
        }
        .ok_or_else(|| XiangqiError::BookData(format!("bad piece letter in '{text}'")))?;
        if squares.len() != 4 || !squares.is_ascii() {
            return Err(XiangqiError::BookData(format!("bad squares in '{text}'")));
        }
        let from = iccs_to_square(&squares[..2]).map_err(|e| XiangqiError::BookData(e.to_string()))?;
        let to = iccs_to_square(&squares[2..]).map_err(|e| XiangqiError::BookData(e.to_string()))?;
        Ok(Self { piece, from, to })
    }

    #[inline]
    pub fn side(&self) -> Side {
        self.piece.side
    }

    /// Same squares and same piece.
    pub fn matches(&self, mv: &Move) -> bool {
        self.from == mv.from && self.to == mv.to && self.piece == mv.piece
    }

    /// The same move seen from the other side of the board.
    pub fn mirrored(&self) -> Self {
        Self {
            piece: Piece::new(self.piece.kind, self.piece.side.opposite()),
            from: self.from.flipped(),
            to: self.to.flipped(),
        }
    }

    /// `self` oriented for `side`, assuming it was written for Red.
    pub fn oriented_for(&self, side: Side) -> Self {
        if self.side() == side {
            *self
        } else {
            self.mirrored()
        }
    }
}

impl TryFrom<String> for BookMove {
    type Error = XiangqiError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<BookMove> for String {
    fn from(value: BookMove) -> Self {
        value.to_string()
    }
}

impl fmt::Display for BookMove {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {}{}",
            self.piece.to_char(),
            square_to_iccs(self.from),
            square_to_iccs(self.to)
        )
    }
}

fn default_weight() -> f64 {
    1.0
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Variation {
    pub name: String,
    pub moves: Vec<BookMove>,
    #[serde(default = "default_weight")]
    pub weight: f64,
}

/// A main line for one side, alternating both sides' moves from the start.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpeningLine {
    pub name: String,
    pub side: Side,
    pub moves: Vec<BookMove>,
    #[serde(default)]
    pub variations: Vec<Variation>,
    #[serde(default = "default_weight")]
    pub weight: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DangerLevel {
    High,
    Medium,
}

/// Board feature that arms a trap without a specific triggering move.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrapTrigger {
    CentralPawnAdvanced,
    EnemyChariotInOurHalf,
    CentralPawnsExchanged,
    ExposedKnight,
    CannonForkSetup,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrapEntry {
    pub name: String,
    pub danger: DangerLevel,
    /// The opponent move that walks into the trap.
    #[serde(default)]
    pub trap_move: Option<BookMove>,
    #[serde(default)]
    pub trigger: Option<TrapTrigger>,
    /// Match on destination square only, for any piece of the right side.
    #[serde(default)]
    pub allow_any_piece: bool,
    /// Refutations for the side exploiting the trap.
    #[serde(default)]
    pub responses: Vec<BookMove>,
    /// Prepared follow-ups for the side that walks into the trap.
    #[serde(default)]
    pub counters: Vec<BookMove>,
}

impl TrapEntry {
    /// Whether `mv` is this trap's triggering move.
    pub fn triggered_by(&self, mv: &Move) -> bool {
        let Some(trap_move) = &self.trap_move else {
            return false;
        };
        trap_move.matches(mv)
            || (self.allow_any_piece && trap_move.to == mv.to && trap_move.side() == mv.piece.side)
    }
}

/// Tactical intention, each resolved by a dedicated solver.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TacticIntention {
    KnightFork {
        #[serde(default)]
        targets: Vec<PieceKind>,
        #[serde(default = "default_fork_value")]
        min_value: i32,
    },
    ChariotCheckCapture,
    KnightCannonMate,
    DiscoveredCheck,
    DoubleCheck,
    ClearanceSacrifice,
    Deflection,
    SmotheredMate,
    DoubleCannonMate,
}

fn default_fork_value() -> i32 {
    exchange_value(PieceKind::Knight)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TacticEntry {
    pub name: String,
    pub reward: i32,
    pub intention: TacticIntention,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EndgameFeature {
    ChariotVsAdvisor,
    ChariotVsBishop,
    ChariotVsTwoAdvisors,
    KnightPawnVsAdvisor,
    CannonPawnVsAdvisor,
    TwoPawnsVsAdvisor,
    Winning,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MidgameFeature {
    DoubleRooks,
    KnightNearKing,
    CentralCannon,
    MateThreat,
    OpenFile,
    DoubleCannons,
}

/// Feature-matched pattern; `suggested` moves are written from Red's side
/// and mirrored for Black.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pattern<F> {
    pub name: String,
    pub features: Vec<F>,
    pub suggested: Vec<BookMove>,
}

pub type EndgamePattern = Pattern<EndgameFeature>;
pub type MidgamePattern = Pattern<MidgameFeature>;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BookData {
    #[serde(default)]
    pub openings: Vec<OpeningLine>,
    #[serde(default)]
    pub traps: Vec<TrapEntry>,
    #[serde(default)]
    pub tactics: Vec<TacticEntry>,
    #[serde(default)]
    pub endgames: Vec<EndgamePattern>,
    #[serde(default)]
    pub midgames: Vec<MidgamePattern>,
}

impl BookData {
    /// The table compiled into the crate.
    pub fn embedded() -> XiangqiResult<Self> {
        Self::from_toml_str(EMBEDDED_BOOK)
    }

    pub fn from_toml_str(text: &str) -> XiangqiResult<Self> {
        let mut data: Self = toml::from_str(text).map_err(|e| XiangqiError::BookData(e.to_string()))?;
        data.tactics.sort_by_key(|t| -t.reward);
        Ok(data)
    }

    pub fn from_path(path: impl AsRef<Path>) -> XiangqiResult<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)
            .map_err(|e| XiangqiError::BookData(format!("failed reading {}: {e}", path.display())))?;
        Self::from_toml_str(&text)
    }

    pub fn openings_for(&self, side: Side) -> impl Iterator<Item = &OpeningLine> {
        self.openings.iter().filter(move |o| o.side == side)
    }
}
