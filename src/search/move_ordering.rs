//! Move ordering scores and a cheap static exchange estimate.
//!
//! Priority bands, highest first: transposition move, killers, captures
//! (victim-weighted, adjusted by exchange estimate), quiet checks, history,
//! then a small centralization bonus and tie-break jitter.

use crate::game_state::board::Board;
use crate::game_state::xiangqi_rules::CENTER_COL;
use crate::game_state::xiangqi_types::*;
use crate::move_generation::legal_move_checks::is_square_attacked;
use crate::search::heuristics::SearchHeuristics;
use crate::search::jitter::TieBreakJitter;
use crate::search::piece_values::exchange_value;

const TT_MOVE_SCORE: i32 = 1_000_000;
const KILLER_SCORES: [i32; 2] = [900_000, 800_000];
const CAPTURE_BASE: i32 = 500_000;
const QUIET_CHECK_SCORE: i32 = 200_000;
const HIGH_VALUE_VICTIM: i32 = 500;
const MAX_JITTER: i32 = 40;

/// Per-node inputs to ordering besides the move itself.
#[derive(Debug, Clone, Copy, Default)]
pub struct OrderingHints {
    pub tt_move: Option<Move>,
    pub killers: [Option<Move>; 2],
}

/// Material outcome estimate of a capture: the victim, minus the attacker
/// when the destination is defended.
pub fn see_estimate(board: &Board, mv: &Move) -> i32 {
    let Some(victim) = mv.captured else {
        return 0;
    };
    let gain = exchange_value(victim.kind);
    if is_square_attacked(board, mv.to, mv.piece.side.opposite()) {
        gain - exchange_value(mv.piece.kind)
    } else {
        gain
    }
}

// Doubled so the row midpoint (4.5) stays integral.
#[inline]
fn center_distance2(sq: Square) -> i32 {
    (2 * sq.row as i32 - 9).abs() + 2 * (sq.col as i32 - CENTER_COL as i32).abs()
}

pub fn move_order_score(
    board: &Board,
    mv: &Move,
    hints: &OrderingHints,
    heuristics: &SearchHeuristics,
    jitter: &mut dyn TieBreakJitter,
) -> i32 {
    if hints.tt_move.is_some_and(|t| t.same_squares(mv)) {
        return TT_MOVE_SCORE;
    }

    let mut score = 0;
    if let Some(victim) = mv.captured {
        let victim_value = exchange_value(victim.kind);
        score += CAPTURE_BASE + victim_value * 10 - exchange_value(mv.piece.kind);
        if victim_value >= HIGH_VALUE_VICTIM {
            score += 5_000;
        }
        let see = see_estimate(board, mv);
        if see < -200 {
            score -= 3_000;
        } else if see > 100 {
            score += 2_000;
        }
    } else if let Some(slot) = hints
        .killers
        .iter()
        .position(|k| k.is_some_and(|k| k.same_squares(mv)))
    {
        score += KILLER_SCORES[slot];
    } else if mv.gives_check {
        score += QUIET_CHECK_SCORE;
    }

    score += (heuristics.history_score(mv) / 10).min(1_000);
    if center_distance2(mv.to) < center_distance2(mv.from) {
        score += 300;
    }
    score + jitter.jitter(MAX_JITTER)
}

/// Sort `moves` best-first.
pub fn order_moves(
    board: &Board,
    moves: &mut Vec<Move>,
    hints: &OrderingHints,
    heuristics: &SearchHeuristics,
    jitter: &mut dyn TieBreakJitter,
) {
    let mut scored: Vec<(i32, Move)> = moves
        .iter()
        .map(|mv| (move_order_score(board, mv, hints, heuristics, jitter), *mv))
        .collect();
    scored.sort_by_key(|(score, _)| -score);
    moves.clear();
    moves.extend(scored.into_iter().map(|(_, mv)| mv));
}

/// Capture ordering for quiescence: victim-weighted plus twice the exchange estimate.
pub fn order_captures(board: &Board, captures: &mut [Move]) {
    captures.sort_by_cached_key(|mv| {
        let victim = mv.captured.map_or(0, |p| exchange_value(p.kind));
        -(victim * 10 - exchange_value(mv.piece.kind) + 2 * see_estimate(board, mv))
    });
}
