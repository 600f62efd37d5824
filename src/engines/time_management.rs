//! Per-move time budgeting.
//!
//! Callers pass raw clock data in [`GoParams`]; the engine turns it into a
//! move budget capped by the difficulty profile's time limit.

use serde::{Deserialize, Serialize};

use crate::engines::engine_trait::GoParams;
use crate::game_state::xiangqi_types::Side;

/// Fewer than this many profile-sized moves left on the clock is pressure.
const PRESSURE_MOVES: u64 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeManagementStrategy {
    /// Spend 1/20th of the remaining clock.
    Fraction20,
    /// Clock, increment and game length aware.
    #[default]
    Adaptive,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeBudget {
    pub movetime_ms: u64,
    pub under_pressure: bool,
}

/// Budget for `side` at game ply `ply`, never above `profile_time_ms`.
pub fn plan_budget(
    side: Side,
    ply: usize,
    params: &GoParams,
    profile_time_ms: u64,
    strategy: TimeManagementStrategy,
) -> TimeBudget {
    if let Some(movetime) = params.movetime_ms {
        return TimeBudget {
            movetime_ms: movetime.max(1),
            under_pressure: false,
        };
    }
    let (remaining, inc) = params.clock_for(side);
    let Some(remaining) = remaining else {
        return TimeBudget {
            movetime_ms: profile_time_ms,
            under_pressure: false,
        };
    };

    let clock_budget = match strategy {
        TimeManagementStrategy::Fraction20 => (remaining / 20).max(1),
        TimeManagementStrategy::Adaptive => adaptive_budget_ms(ply as u64, remaining, inc, params.movestogo),
    };
    TimeBudget {
        movetime_ms: clock_budget.min(profile_time_ms).max(1),
        under_pressure: remaining < profile_time_ms.saturating_mul(PRESSURE_MOVES),
    }
}

fn adaptive_budget_ms(ply: u64, remaining_ms: u64, inc_ms: Option<u64>, movestogo: Option<u16>) -> u64 {
    let expected_moves_left = if let Some(mtg) = movestogo {
        u64::from(mtg.max(1))
    } else if ply < 30 {
        45
    } else if ply < 90 {
        32
    } else {
        20
    };

    let reserve = (remaining_ms / 25).clamp(100, remaining_ms.saturating_sub(1).max(100));
    let usable = remaining_ms.saturating_sub(reserve);
    let base = usable / expected_moves_left.max(1);
    let inc_bonus = inc_ms.unwrap_or(0).saturating_mul(3) / 4;
    let panic = if remaining_ms < 2_000 { remaining_ms / 12 } else { 0 };
    let target = base.saturating_add(inc_bonus).saturating_add(panic);

    let min_budget = if remaining_ms < 1_000 { 5 } else { 15 };
    let max_budget = (remaining_ms / 4).max(1);
    target.clamp(min_budget.min(max_budget), max_budget).max(1)
}
