//! Difficulty profiles: search depth, time and heuristic toggles per level.
//!
//! Built-in levels cover `beginner` through `master`. Custom profiles load
//! from TOML; omitted fields take the `normal` values.

use serde::{Deserialize, Serialize};

use crate::errors::{XiangqiError, XiangqiResult};
use crate::search::board_scoring::EvalWeights;
use crate::search::game_phase::GamePhase;
use crate::search::iterative_deepening::{SearchConfig, DEFAULT_TT_MB};

/// Hard ceiling on any profile's search depth.
pub const MAX_SEARCH_DEPTH: u8 = 24;
/// Shallowest depth a pressured search is cut back to.
pub const MIN_PRESSURE_DEPTH: u8 = 2;
const ENDGAME_EXTRA_DEPTH: u8 = 2;
const PRESSURE_DEPTH_CUT: u8 = 2;

pub const BUILTIN_LEVELS: [&str; 5] = ["beginner", "easy", "normal", "hard", "master"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DifficultyProfile {
    pub name: String,
    pub depth: u8,
    /// Ceiling for the endgame depth bonus.
    pub max_depth: u8,
    pub time_limit_ms: u64,
    pub use_book: bool,
    pub use_null_move: bool,
    pub use_lmr: bool,
    pub use_aspiration: bool,
    /// Random tie-breaking in move ordering.
    pub use_jitter: bool,
    pub tt_mb: usize,
    pub weights: EvalWeights,
}

impl Default for DifficultyProfile {
    fn default() -> Self {
        Self::normal()
    }
}

impl DifficultyProfile {
    fn normal() -> Self {
        Self {
            name: "normal".to_owned(),
            depth: 6,
            max_depth: 10,
            time_limit_ms: 3_000,
            use_book: true,
            use_null_move: true,
            use_lmr: true,
            use_aspiration: true,
            use_jitter: true,
            tt_mb: DEFAULT_TT_MB,
            weights: EvalWeights::default(),
        }
    }

    /// One of [`BUILTIN_LEVELS`], case-insensitive.
    pub fn builtin(level: &str) -> XiangqiResult<Self> {
        let normal = Self::normal();
        let profile = match level.trim().to_ascii_lowercase().as_str() {
            "beginner" => Self {
                name: "beginner".to_owned(),
                depth: 2,
                max_depth: 4,
                time_limit_ms: 500,
                use_book: false,
                use_null_move: false,
                use_lmr: false,
                weights: EvalWeights {
                    material: 80,
                    ..EvalWeights::default()
                },
                ..normal
            },
            "easy" => Self {
                name: "easy".to_owned(),
                depth: 3,
                max_depth: 5,
                time_limit_ms: 1_500,
                use_null_move: false,
                weights: EvalWeights {
                    material: 90,
                    ..EvalWeights::default()
                },
                ..normal
            },
            "normal" => normal,
            "hard" => Self {
                name: "hard".to_owned(),
                depth: 8,
                max_depth: 12,
                time_limit_ms: 8_000,
                tt_mb: 64,
                weights: EvalWeights {
                    material: 120,
                    ..EvalWeights::default()
                },
                ..normal
            },
            "master" => Self {
                name: "master".to_owned(),
                depth: 10,
                max_depth: 14,
                time_limit_ms: 12_000,
                use_jitter: false,
                tt_mb: 128,
                weights: EvalWeights {
                    material: 120,
                    ..EvalWeights::default()
                },
                ..normal
            },
            other => {
                return Err(XiangqiError::Config(format!(
                    "unknown difficulty '{other}', expected one of {}",
                    BUILTIN_LEVELS.join(", ")
                )))
            }
        };
        Ok(profile)
    }

    pub fn from_toml_str(text: &str) -> XiangqiResult<Self> {
        let profile: Self = toml::from_str(text).map_err(|e| XiangqiError::Config(e.to_string()))?;
        profile.validate()?;
        Ok(profile)
    }

    pub fn validate(&self) -> XiangqiResult<()> {
        if self.depth == 0 {
            return Err(XiangqiError::Config("depth must be at least 1".to_owned()));
        }
        if self.max_depth > MAX_SEARCH_DEPTH {
            return Err(XiangqiError::Config(format!(
                "max_depth {} exceeds the ceiling of {MAX_SEARCH_DEPTH}",
                self.max_depth
            )));
        }
        if self.depth > self.max_depth {
            return Err(XiangqiError::Config(format!(
                "depth {} is above max_depth {}",
                self.depth, self.max_depth
            )));
        }
        if self.time_limit_ms == 0 {
            return Err(XiangqiError::Config("time_limit_ms must be positive".to_owned()));
        }
        if self.tt_mb == 0 {
            return Err(XiangqiError::Config("tt_mb must be positive".to_owned()));
        }
        Ok(())
    }

    /// Target depth: deeper in the endgame, shallower under clock pressure.
    pub fn depth_for(&self, phase: GamePhase, under_pressure: bool) -> u8 {
        let mut depth = self.depth;
        if phase == GamePhase::Endgame {
            depth = depth.saturating_add(ENDGAME_EXTRA_DEPTH).min(self.max_depth.max(self.depth));
        }
        if under_pressure {
            depth = depth.saturating_sub(PRESSURE_DEPTH_CUT).max(MIN_PRESSURE_DEPTH);
        }
        depth
    }

    pub fn search_config(&self, max_depth: u8, movetime_ms: u64) -> SearchConfig {
        SearchConfig {
            max_depth,
            movetime_ms: Some(movetime_ms),
            use_null_move: self.use_null_move,
            use_lmr: self.use_lmr,
            use_aspiration: self.use_aspiration,
            ..SearchConfig::default()
        }
    }
}
