//! Iterative deepening principal variation search.
//!
//! Per node, in order: transposition probe, null-move pruning, move ordering
//! (TT move, killers, captures, checks, history, centralization, jitter),
//! then PVS with late move reductions and selective extensions. Quiescence
//! searches captures with stand-pat and delta pruning below the depth floor.
//!
//! The board is mutated in place. Every `apply` is paired with a `revert`
//! before any result (including an abort or an error) is propagated, so the
//! caller's board is unchanged when `search` returns.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::errors::XiangqiResult;
use crate::game_state::board::Board;
use crate::game_state::xiangqi_types::*;
use crate::move_generation::legal_move_checks::is_in_check;
use crate::move_generation::legal_move_generator::{
    find_legal_move, has_legal_reply, legal_captures_in_place, legal_moves_in_place,
};
use crate::search::board_scoring::{BoardScorer, CachedEvaluator, XiangqiEvaluator, MATE_SCORE, MATE_THRESHOLD};
use crate::search::eval_cache::{BoundedEvalCache, EvalCache};
use crate::search::game_phase::GamePhase;
use crate::search::heuristics::SearchHeuristics;
use crate::search::jitter::{NoJitter, TieBreakJitter};
use crate::search::move_ordering::{order_captures, order_moves, see_estimate, OrderingHints};
use crate::search::piece_values::exchange_value;
use crate::search::transposition_table::{Bound, TTEntry, TTStats, TranspositionTable};
use crate::search::zobrist::position_key;

const INFINITY: i32 = MATE_SCORE + 1;
const QUIESCENCE_MAX_DEPTH: u8 = 6;
const ASPIRATION_MIN_DEPTH: u8 = 4;
const ASPIRATION_MAX_ATTEMPTS: u8 = 8;
const CLOCK_CHECK_INTERVAL: u64 = 256;
const EXTENSION_CAP: u8 = 2;
const HIGH_VALUE_CAPTURE: i32 = 500;
const TOP_MOVES_CANDIDATES: usize = 15;
pub const DEFAULT_TT_MB: usize = 16;

#[derive(Debug, Clone)]
pub struct SearchConfig {
    pub max_depth: u8,
    pub movetime_ms: Option<u64>,
    pub max_nodes: Option<u64>,
    pub stop_flag: Option<Arc<AtomicBool>>,

    pub use_null_move: bool,
    pub use_lmr: bool,
    pub use_pvs: bool,
    pub use_aspiration: bool,
    pub use_tt: bool,
    pub use_delta_pruning: bool,
    pub use_extensions: bool,

    pub null_move_reduction: u8,
    pub lmr_base_depth: u8,
    pub lmr_move_threshold: usize,
    pub lmr_log_base: f64,
    pub delta_margin: i32,
    /// Hard ceiling on ply distance from the root.
    pub max_ply: u8,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            max_depth: 4,
            movetime_ms: None,
            max_nodes: None,
            stop_flag: None,
            use_null_move: true,
            use_lmr: true,
            use_pvs: true,
            use_aspiration: true,
            use_tt: true,
            use_delta_pruning: true,
            use_extensions: true,
            null_move_reduction: 2,
            lmr_base_depth: 3,
            lmr_move_threshold: 4,
            lmr_log_base: 2.2,
            delta_margin: 900,
            max_ply: 60,
        }
    }
}

impl SearchConfig {
    /// Plain alpha-beta: every pruning, reduction and extension switched off.
    pub fn full_width(max_depth: u8) -> Self {
        Self {
            max_depth,
            use_null_move: false,
            use_lmr: false,
            use_pvs: false,
            use_aspiration: false,
            use_tt: false,
            use_delta_pruning: false,
            use_extensions: false,
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SearchStats {
    pub quiescence_nodes: u64,
    pub beta_cutoffs: u64,
    pub null_move_cutoffs: u64,
    pub lmr_reductions: u64,
    pub lmr_researches: u64,
    pub extensions: u64,
    pub delta_prunes: u64,
    pub selective_depth: u8,
    pub tt: TTStats,
    pub eval_cache_hit_rate: f64,
}

#[derive(Debug, Clone, Default)]
pub struct SearchResult {
    pub best_move: Option<Move>,
    pub best_score: i32,
    pub reached_depth: u8,
    pub nodes: u64,
    pub elapsed_ms: u64,
    pub nps: u64,
    /// True when the budget ran out before `max_depth` completed.
    pub timed_out: bool,
    pub principal_variation: Vec<Move>,
    pub stats: SearchStats,
}

/// Search state reused across moves of one game: transposition table,
/// killer/history tables, evaluation cache and jitter source.
pub struct Searcher<S: BoardScorer = XiangqiEvaluator> {
    evaluator: CachedEvaluator<S>,
    tt: TranspositionTable,
    heuristics: SearchHeuristics,
    jitter: Box<dyn TieBreakJitter>,
    phase: Option<GamePhase>,
    pinned_phase: Option<GamePhase>,
}

impl Default for Searcher<XiangqiEvaluator> {
    fn default() -> Self {
        Self::new(XiangqiEvaluator::default())
    }
}

impl<S: BoardScorer> Searcher<S> {
    pub fn new(scorer: S) -> Self {
        Self::with_parts(
            scorer,
            Box::new(BoundedEvalCache::default()),
            TranspositionTable::new_with_mb(DEFAULT_TT_MB),
            Box::new(NoJitter),
        )
    }

    pub fn with_parts(
        scorer: S,
        cache: Box<dyn EvalCache>,
        tt: TranspositionTable,
        jitter: Box<dyn TieBreakJitter>,
    ) -> Self {
        Self {
            evaluator: CachedEvaluator::new(scorer, cache),
            tt,
            heuristics: SearchHeuristics::default(),
            jitter,
            phase: None,
            pinned_phase: None,
        }
    }

    pub fn set_jitter(&mut self, jitter: Box<dyn TieBreakJitter>) {
        self.jitter = jitter;
    }

    /// Pin the phase for subsequent searches instead of classifying each
    /// root board. Cached scores from another phase are dropped.
    pub fn set_phase(&mut self, phase: GamePhase) {
        self.pinned_phase = Some(phase);
        self.switch_phase(phase);
    }

    /// Go back to classifying the phase from each searched board.
    pub fn unpin_phase(&mut self) {
        self.pinned_phase = None;
    }

    /// Phase used by the most recent search, or the pinned one.
    pub fn phase(&self) -> Option<GamePhase> {
        self.phase
    }

    /// Reset all tables and the phase; the next search starts cold.
    pub fn clear(&mut self) {
        self.tt.clear();
        self.heuristics.clear();
        self.evaluator.clear();
        self.phase = None;
        self.pinned_phase = None;
    }

    fn switch_phase(&mut self, phase: GamePhase) {
        self.evaluator.set_phase(phase, self.phase);
        self.phase = Some(phase);
    }

    /// Phase for a search rooted at `board`, computed once per invocation.
    fn refresh_phase(&mut self, board: &Board) -> GamePhase {
        let phase = self.pinned_phase.unwrap_or_else(|| GamePhase::from_board(board));
        if self.phase != Some(phase) {
            self.switch_phase(phase);
        }
        phase
    }

    pub fn scorer(&self) -> &S {
        self.evaluator.scorer()
    }

    /// Static evaluation from `side`'s point of view.
    pub fn evaluate(&mut self, board: &Board, side: Side) -> i32 {
        self.evaluator.evaluate(board, side)
    }

    pub fn search(&mut self, board: &mut Board, side: Side, config: &SearchConfig) -> XiangqiResult<SearchResult> {
        self.search_moves(board, side, None, config)
    }

    /// Search with the root restricted to `root_moves` (all legal moves when `None`).
    pub fn search_moves(
        &mut self,
        board: &mut Board,
        side: Side,
        root_moves: Option<&[Move]>,
        config: &SearchConfig,
    ) -> XiangqiResult<SearchResult> {
        let started_at = Instant::now();
        let phase = self.refresh_phase(board);
        self.heuristics.reset_killers();

        let mut moves = match root_moves {
            Some(list) => list.to_vec(),
            None => legal_moves_in_place(board, side)?,
        };

        let mut result = SearchResult::default();
        if moves.is_empty() {
            result.best_score = if is_in_check(board, side)? { -MATE_SCORE } else { 0 };
            return Ok(result);
        }

        let mut run = SearchRun {
            board: &mut *board,
            config,
            evaluator: &mut self.evaluator,
            tt: &mut self.tt,
            heuristics: &mut self.heuristics,
            jitter: &mut self.jitter,
            phase,
            stats: SearchStats::default(),
            nodes: 0,
            deadline: config
                .movetime_ms
                .map(|ms| started_at + Duration::from_millis(ms.max(1))),
            next_clock_check: CLOCK_CHECK_INTERVAL,
            extension_ply_limit: config.max_depth.saturating_mul(2),
            root_restricted: root_moves.is_some(),
            aborted: false,
        };

        let hints = OrderingHints {
            tt_move: run.probe_tt_move(position_key(run.board, side)),
            killers: [None, None],
        };
        order_moves(run.board, &mut moves, &hints, run.heuristics, &mut **run.jitter);

        result.best_move = moves.first().copied();
        if config.max_depth == 0 {
            result.best_score = run.evaluator.evaluate(run.board, side);
            result.nodes = 1;
        }

        let mut prev_score: Option<i32> = None;
        for depth in 1..=config.max_depth {
            if run.should_stop() {
                break;
            }
            if config.use_tt {
                run.tt.new_generation();
            }

            let Some((best_move, best_score)) = run.root_with_aspiration(&moves, side, depth, prev_score)? else {
                break;
            };

            result.best_move = Some(best_move);
            result.best_score = best_score;
            result.reached_depth = depth;
            prev_score = Some(best_score);
            log::debug!(
                "depth {depth} score {best_score} nodes {} best {:?}->{:?}",
                run.nodes,
                best_move.from,
                best_move.to
            );

            if let Some(idx) = moves.iter().position(|m| m.same_squares(&best_move)) {
                moves[..=idx].rotate_right(1);
            }
            if best_score.abs() >= MATE_THRESHOLD {
                break;
            }
        }

        result.timed_out = run.aborted;
        result.nodes = result.nodes.max(run.nodes);
        result.stats = run.stats;
        result.stats.tt = run.tt.stats();
        result.stats.eval_cache_hit_rate = run.evaluator.hit_rate();
        result.elapsed_ms = started_at.elapsed().as_millis() as u64;
        result.nps = if result.elapsed_ms == 0 {
            0
        } else {
            result.nodes.saturating_mul(1000) / result.elapsed_ms
        };
        if let Some(mv) = result.best_move {
            result.principal_variation = if config.use_tt {
                principal_variation(&mut self.tt, board, side, mv, result.reached_depth)?
            } else {
                vec![mv]
            };
        }
        Ok(result)
    }

    /// Shallow ranking of the first few ordered root moves, best first.
    pub fn top_moves(&mut self, board: &mut Board, side: Side, n: usize, depth: u8) -> XiangqiResult<Vec<(Move, i32)>> {
        let phase = self.refresh_phase(board);
        let config = SearchConfig {
            max_depth: depth.max(1),
            use_aspiration: false,
            ..SearchConfig::default()
        };
        let mut moves = legal_moves_in_place(board, side)?;

        let mut run = SearchRun {
            board,
            config: &config,
            evaluator: &mut self.evaluator,
            tt: &mut self.tt,
            heuristics: &mut self.heuristics,
            jitter: &mut self.jitter,
            phase,
            stats: SearchStats::default(),
            nodes: 0,
            deadline: None,
            next_clock_check: CLOCK_CHECK_INTERVAL,
            extension_ply_limit: config.max_depth.saturating_mul(2),
            root_restricted: false,
            aborted: false,
        };
        let hints = OrderingHints {
            tt_move: run.probe_tt_move(position_key(run.board, side)),
            killers: [None, None],
        };
        order_moves(run.board, &mut moves, &hints, run.heuristics, &mut **run.jitter);
        moves.truncate(TOP_MOVES_CANDIDATES);

        let mut scored = Vec::with_capacity(moves.len());
        for mv in moves {
            let undo = run.board.apply(&mv);
            let outcome = run.negamax(side.opposite(), config.max_depth - 1, -INFINITY, INFINITY, 1, true);
            run.board.revert(undo);
            if let Some(score) = outcome? {
                scored.push((mv, -score));
            }
        }
        scored.sort_by_key(|(_, score)| -score);
        scored.truncate(n);
        Ok(scored)
    }
}

/// `first` followed by the stored best moves, re-validating each one.
fn principal_variation(
    tt: &mut TranspositionTable,
    board: &Board,
    side: Side,
    first: Move,
    max_len: u8,
) -> XiangqiResult<Vec<Move>> {
    let mut scratch = board.clone();
    let mut pv = vec![first];
    scratch.apply(&first);
    let mut to_move = side.opposite();
    for _ in 1..max_len {
        let Some(candidate) = tt.probe(position_key(&scratch, to_move)).and_then(|e| e.best_move) else {
            break;
        };
        let Some(mv) = find_legal_move(&scratch, to_move, &candidate)? else {
            break;
        };
        scratch.apply(&mv);
        pv.push(mv);
        to_move = to_move.opposite();
    }
    Ok(pv)
}

#[inline]
pub(crate) fn tt_score_for_storage(score: i32, ply: u8) -> i32 {
    if score >= MATE_THRESHOLD {
        score + i32::from(ply)
    } else if score <= -MATE_THRESHOLD {
        score - i32::from(ply)
    } else {
        score
    }
}

#[inline]
pub(crate) fn tt_score_from_storage(score: i32, ply: u8) -> i32 {
    if score >= MATE_THRESHOLD {
        score - i32::from(ply)
    } else if score <= -MATE_THRESHOLD {
        score + i32::from(ply)
    } else {
        score
    }
}

/// One search episode: borrowed tables plus per-episode counters.
struct SearchRun<'a, S: BoardScorer> {
    board: &'a mut Board,
    config: &'a SearchConfig,
    evaluator: &'a mut CachedEvaluator<S>,
    tt: &'a mut TranspositionTable,
    heuristics: &'a mut SearchHeuristics,
    jitter: &'a mut Box<dyn TieBreakJitter>,
    phase: GamePhase,
    stats: SearchStats,
    nodes: u64,
    deadline: Option<Instant>,
    next_clock_check: u64,
    extension_ply_limit: u8,
    /// The root list is a caller-chosen subset; its score is not the position's.
    root_restricted: bool,
    aborted: bool,
}

impl<S: BoardScorer> SearchRun<'_, S> {
    /// Budget expiry, node cap and external stop are treated alike.
    fn should_stop(&mut self) -> bool {
        if self.aborted {
            return true;
        }
        if self.config.max_nodes.is_some_and(|cap| self.nodes >= cap) {
            self.aborted = true;
        } else if self.config.stop_flag.as_ref().is_some_and(|f| f.load(Ordering::Relaxed)) {
            self.aborted = true;
        } else if let Some(deadline) = self.deadline {
            if self.nodes >= self.next_clock_check {
                self.next_clock_check = self.nodes + CLOCK_CHECK_INTERVAL;
                if Instant::now() >= deadline {
                    self.aborted = true;
                }
            }
        }
        self.aborted
    }

    /// Stored best move, if the entry looks like it belongs to this board.
    fn probe_tt_move(&mut self, key: u64) -> Option<Move> {
        if !self.config.use_tt {
            return None;
        }
        self.tt
            .probe(key)
            .and_then(|e| e.best_move)
            .filter(|m| self.board.piece_at(m.from) == Some(m.piece))
    }

    fn root_with_aspiration(
        &mut self,
        moves: &[Move],
        side: Side,
        depth: u8,
        prev_score: Option<i32>,
    ) -> XiangqiResult<Option<(Move, i32)>> {
        let center = prev_score.filter(|s| {
            self.config.use_aspiration && depth >= ASPIRATION_MIN_DEPTH && s.abs() < MATE_THRESHOLD
        });
        let Some(center) = center else {
            return self.search_root(moves, side, depth, -INFINITY, INFINITY);
        };

        let mut window = 50 + 5 * i32::from(depth);
        let mut alpha = center - window;
        let mut beta = center + window;
        let mut attempts = 0u8;
        loop {
            attempts += 1;
            let Some((best_move, score)) = self.search_root(moves, side, depth, alpha, beta)? else {
                return Ok(None);
            };
            if alpha <= -INFINITY && beta >= INFINITY {
                return Ok(Some((best_move, score)));
            }
            if score > alpha && score < beta {
                return Ok(Some((best_move, score)));
            }

            window = window.saturating_mul(2);
            if score <= alpha {
                alpha = (score - window).max(-INFINITY);
            } else {
                beta = (score + window).min(INFINITY);
            }
            if attempts >= ASPIRATION_MAX_ATTEMPTS {
                alpha = -INFINITY;
                beta = INFINITY;
            }
            log::debug!("aspiration re-search at depth {depth}: window [{alpha}, {beta}]");
        }
    }

    fn search_root(
        &mut self,
        moves: &[Move],
        side: Side,
        depth: u8,
        mut alpha: i32,
        beta: i32,
    ) -> XiangqiResult<Option<(Move, i32)>> {
        let alpha_orig = alpha;
        let in_check = is_in_check(self.board, side)?;
        let mut best: Option<(Move, i32)> = None;

        for (index, mv) in moves.iter().enumerate() {
            if self.should_stop() {
                return Ok(None);
            }
            let undo = self.board.apply(mv);
            let outcome = self.search_child(mv, side, depth, index, alpha, beta, 0, in_check);
            self.board.revert(undo);
            let Some(score) = outcome? else {
                return Ok(None);
            };

            if best.is_none_or(|(_, b)| score > b) {
                best = Some((*mv, score));
            }
            if score > alpha {
                alpha = score;
            }
            if alpha >= beta {
                break;
            }
        }

        if let (true, false, Some((mv, score))) = (self.config.use_tt, self.root_restricted, best) {
            self.store(position_key(self.board, side), depth, score, alpha_orig, beta, 0, Some(mv));
        }
        Ok(best)
    }

    #[allow(clippy::too_many_arguments)]
    fn store(&mut self, key: u64, depth: u8, score: i32, alpha: i32, beta: i32, ply: u8, best_move: Option<Move>) {
        let bound = if score <= alpha {
            Bound::Upper
        } else if score >= beta {
            Bound::Lower
        } else {
            Bound::Exact
        };
        self.tt.store(TTEntry {
            key,
            depth,
            score: tt_score_for_storage(score, ply),
            bound,
            best_move,
        });
    }

    /// Score of `mv` (already applied) from the mover's point of view.
    #[allow(clippy::too_many_arguments)]
    fn search_child(
        &mut self,
        mv: &Move,
        side: Side,
        depth: u8,
        index: usize,
        alpha: i32,
        beta: i32,
        ply: u8,
        in_check: bool,
    ) -> XiangqiResult<Option<i32>> {
        let extension = if self.config.use_extensions && ply < self.extension_ply_limit {
            self.extension(mv, side)?
        } else {
            0
        };
        if extension > 0 {
            self.stats.extensions += 1;
        }
        let child = (depth - 1).saturating_add(extension);
        let opponent = side.opposite();
        let next_ply = ply + 1;

        let reduction = if self.config.use_lmr
            && index >= self.config.lmr_move_threshold
            && depth >= self.config.lmr_base_depth
            && !mv.is_capture()
            && !mv.gives_check
            && !in_check
            && extension == 0
        {
            let r = (((index + 1) as f64).ln() / self.config.lmr_log_base.ln()).floor() as u8;
            r.min(child.saturating_sub(1))
        } else {
            0
        };
        if reduction > 0 {
            self.stats.lmr_reductions += 1;
        }

        if index == 0 || !self.config.use_pvs {
            if reduction > 0 {
                let Some(probe) = self.negamax(opponent, child - reduction, -alpha - 1, -alpha, next_ply, true)? else {
                    return Ok(None);
                };
                if -probe <= alpha {
                    return Ok(Some(-probe));
                }
                self.stats.lmr_researches += 1;
            }
            return Ok(self.negamax(opponent, child, -beta, -alpha, next_ply, true)?.map(|s| -s));
        }

        let Some(probe) = self.negamax(opponent, child - reduction, -alpha - 1, -alpha, next_ply, true)? else {
            return Ok(None);
        };
        let probe = -probe;
        if probe > alpha && (reduction > 0 || probe < beta) {
            if reduction > 0 {
                self.stats.lmr_researches += 1;
            }
            return Ok(self.negamax(opponent, child, -beta, -alpha, next_ply, true)?.map(|s| -s));
        }
        Ok(Some(probe))
    }

    /// Extra plies for `mv`, which has just been applied by `side`.
    fn extension(&mut self, mv: &Move, side: Side) -> XiangqiResult<u8> {
        let mut extension = 0;
        if mv.gives_check {
            extension += 1;
            if !has_legal_reply(self.board, side.opposite())? {
                extension += 1;
            }
        }
        if mv.captured.is_some_and(|p| exchange_value(p.kind) >= HIGH_VALUE_CAPTURE) {
            extension += 1;
        }
        Ok(extension.min(EXTENSION_CAP))
    }

    fn negamax(
        &mut self,
        side: Side,
        depth: u8,
        mut alpha: i32,
        mut beta: i32,
        ply: u8,
        allow_null: bool,
    ) -> XiangqiResult<Option<i32>> {
        if self.should_stop() {
            return Ok(None);
        }
        if depth == 0 || ply >= self.config.max_ply {
            return self.quiescence(side, alpha, beta, ply, 0);
        }
        self.nodes += 1;
        self.stats.selective_depth = self.stats.selective_depth.max(ply);

        let key = position_key(self.board, side);
        let mut tt_move = None;
        if self.config.use_tt {
            if let Some(entry) = self.tt.probe(key) {
                // A stored move that does not fit this board means a key collision.
                let fits = entry.best_move.is_none_or(|m| self.board.piece_at(m.from) == Some(m.piece));
                if fits {
                    tt_move = entry.best_move;
                    if entry.depth >= depth {
                        let score = tt_score_from_storage(entry.score, ply);
                        match entry.bound {
                            Bound::Exact => return Ok(Some(score)),
                            Bound::Lower => alpha = alpha.max(score),
                            Bound::Upper => beta = beta.min(score),
                        }
                        if alpha >= beta {
                            return Ok(Some(score));
                        }
                    }
                }
            }
        }

        let in_check = is_in_check(self.board, side)?;
        if allow_null && self.null_move_allowed(side, depth, beta, in_check) {
            let reduction = self.config.null_move_reduction + u8::from(depth > 6);
            let null_depth = depth.saturating_sub(1 + reduction);
            let Some(score) = self.negamax(side.opposite(), null_depth, -beta, -beta + 1, ply + 1, false)? else {
                return Ok(None);
            };
            if -score >= beta {
                self.stats.null_move_cutoffs += 1;
                return Ok(Some(beta));
            }
        }

        let mut moves = legal_moves_in_place(self.board, side)?;
        if moves.is_empty() {
            return Ok(Some(if in_check { -MATE_SCORE + i32::from(ply) } else { 0 }));
        }
        let hints = OrderingHints {
            tt_move,
            killers: self.heuristics.killers_at(usize::from(ply)),
        };
        order_moves(self.board, &mut moves, &hints, self.heuristics, &mut **self.jitter);

        let alpha_window = alpha;
        let mut best = -INFINITY;
        let mut best_move = None;
        for (index, mv) in moves.iter().enumerate() {
            let undo = self.board.apply(mv);
            let outcome = self.search_child(mv, side, depth, index, alpha, beta, ply, in_check);
            self.board.revert(undo);
            let Some(score) = outcome? else {
                return Ok(None);
            };

            if score > best {
                best = score;
                best_move = Some(*mv);
            }
            if score > alpha {
                alpha = score;
            }
            if alpha >= beta {
                self.stats.beta_cutoffs += 1;
                if !mv.is_capture() {
                    self.heuristics.record_killer(usize::from(ply), *mv, score);
                    self.heuristics.record_history(mv, depth);
                }
                break;
            }
        }

        if self.config.use_tt {
            self.store(key, depth, best, alpha_window, beta, ply, best_move);
        }
        Ok(Some(best))
    }

    fn null_move_allowed(&self, side: Side, depth: u8, beta: i32, in_check: bool) -> bool {
        self.config.use_null_move
            && !in_check
            && depth >= 3
            && self.phase != GamePhase::Endgame
            && beta.abs() < MATE_THRESHOLD
            && self.board.pieces_of(side).any(|(_, p)| p.kind.is_strong())
    }

    fn quiescence(&mut self, side: Side, mut alpha: i32, beta: i32, ply: u8, qdepth: u8) -> XiangqiResult<Option<i32>> {
        if self.should_stop() {
            return Ok(None);
        }
        self.nodes += 1;
        self.stats.quiescence_nodes += 1;
        self.stats.selective_depth = self.stats.selective_depth.max(ply);

        if is_in_check(self.board, side)? {
            return self.quiescence_evasions(side, alpha, beta, ply, qdepth);
        }

        let stand_pat = self.evaluator.evaluate(self.board, side);
        if stand_pat >= beta {
            return Ok(Some(stand_pat));
        }
        if self.config.use_delta_pruning && stand_pat + self.config.delta_margin < alpha {
            self.stats.delta_prunes += 1;
            return Ok(Some(alpha));
        }
        if stand_pat > alpha {
            alpha = stand_pat;
        }
        if qdepth >= QUIESCENCE_MAX_DEPTH || ply >= self.config.max_ply {
            return Ok(Some(alpha));
        }

        let mut captures = legal_captures_in_place(self.board, side)?;
        order_captures(self.board, &mut captures);
        for mv in &captures {
            if self.config.use_delta_pruning {
                let see = see_estimate(self.board, mv);
                if see < -200 || stand_pat + see + 200 < alpha {
                    self.stats.delta_prunes += 1;
                    continue;
                }
            }
            let undo = self.board.apply(mv);
            let outcome = self.quiescence(side.opposite(), -beta, -alpha, ply + 1, qdepth + 1);
            self.board.revert(undo);
            let Some(score) = outcome? else {
                return Ok(None);
            };
            let score = -score;
            if score >= beta {
                return Ok(Some(score));
            }
            if score > alpha {
                alpha = score;
            }
        }
        Ok(Some(alpha))
    }

    /// In check there is no stand-pat: every evasion is searched.
    fn quiescence_evasions(
        &mut self,
        side: Side,
        mut alpha: i32,
        beta: i32,
        ply: u8,
        qdepth: u8,
    ) -> XiangqiResult<Option<i32>> {
        let moves = legal_moves_in_place(self.board, side)?;
        if moves.is_empty() {
            return Ok(Some(-MATE_SCORE + i32::from(ply)));
        }
        if qdepth >= QUIESCENCE_MAX_DEPTH || ply >= self.config.max_ply {
            return Ok(Some(self.evaluator.evaluate(self.board, side)));
        }

        let mut best = -INFINITY;
        for mv in &moves {
            let undo = self.board.apply(mv);
            let outcome = self.quiescence(side.opposite(), -beta, -alpha, ply + 1, qdepth + 1);
            self.board.revert(undo);
            let Some(score) = outcome? else {
                return Ok(None);
            };
            let score = -score;
            best = best.max(score);
            if score >= beta {
                return Ok(Some(score));
            }
            if score > alpha {
                alpha = score;
            }
        }
        Ok(Some(best))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::move_generation::legal_move_generator::legal_moves;
    use crate::search::board_scoring::MaterialScorer;
    use crate::search::eval_cache::NoEvalCache;
    use crate::utils::fen_parser::parse_fen;

    fn material_searcher() -> Searcher<MaterialScorer> {
        Searcher::with_parts(
            MaterialScorer,
            Box::new(NoEvalCache),
            TranspositionTable::new_with_mb(1),
            Box::new(NoJitter),
        )
    }

    const MATE_IN_ONE: &str = "4k4/R8/9/9/9/8R/9/9/9/3K5 w";
    const MATE_IN_TWO: &str = "4k4/9/9/9/9/R7R/9/9/9/3K5 w";

    #[test]
    fn search_depth_zero_returns_eval_only() {
        let mut board = Board::starting_position();
        let mut searcher = material_searcher();
        let result = searcher
            .search(&mut board, Side::Red, &SearchConfig { max_depth: 0, ..SearchConfig::default() })
            .expect("search should run");
        assert_eq!(result.best_score, 0);
        assert_eq!(result.reached_depth, 0);
        assert!(result.best_move.is_some());
    }

    #[test]
    fn search_finds_mate_in_one() {
        let (mut board, side) = parse_fen(MATE_IN_ONE).expect("valid fen");
        let mut searcher = material_searcher();
        let result = searcher
            .search(&mut board, side, &SearchConfig { max_depth: 3, ..SearchConfig::default() })
            .expect("search should run");

        let best = result.best_move.expect("a move");
        assert_eq!(best.to, Square::new(0, 8));
        assert_eq!(result.best_score, MATE_SCORE - 1);

        board.apply(&best);
        assert!(legal_moves(&board, side.opposite()).expect("kings present").is_empty());
    }

    #[test]
    fn mate_in_two_scores_below_mate_in_one() {
        let (mut near, side) = parse_fen(MATE_IN_ONE).expect("valid fen");
        let (mut far, _) = parse_fen(MATE_IN_TWO).expect("valid fen");
        for config in [SearchConfig::full_width(3), SearchConfig { max_depth: 3, ..SearchConfig::default() }] {
            let one = material_searcher().search(&mut near, side, &config).expect("search should run");
            let two = material_searcher().search(&mut far, side, &config).expect("search should run");
            assert_eq!(one.best_score, MATE_SCORE - 1);
            assert_eq!(two.best_score, MATE_SCORE - 3);
            assert!(one.best_score > two.best_score);
        }
    }

    #[test]
    fn search_is_deterministic_without_jitter() {
        let (board, side) =
            parse_fen("r1bakab1r/9/1cn3nc1/p1p1p1p1p/9/2P6/P3P1P1P/1C2C1N2/9/RNBAKAB1R b").expect("valid fen");
        let config = SearchConfig { max_depth: 3, ..SearchConfig::default() };
        let mut a = board.clone();
        let mut b = board.clone();
        let first = Searcher::default().search(&mut a, side, &config).expect("search should run");
        let second = Searcher::default().search(&mut b, side, &config).expect("search should run");
        assert_eq!(first.best_move, second.best_move);
        assert_eq!(first.best_score, second.best_score);
        assert_eq!(first.nodes, second.nodes);
    }

    #[test]
    fn pvs_matches_full_width_alpha_beta() {
        let positions = [
            "4k4/9/9/4r4/4p4/9/9/4R4/9/3K5 w",
            "2bak4/4a4/4b4/p3p3p/2n6/9/P3P1c1P/4B4/4A4/2RAK4 w",
            "r1bakab1r/9/1cn3nc1/p1p1p1p1p/9/2P6/P3P1P1P/1C2C1N2/9/RNBAKAB1R b",
            MATE_IN_TWO,
        ];
        for fen in positions {
            let (board, side) = parse_fen(fen).expect("valid fen");
            let pvs_config = SearchConfig {
                use_pvs: true,
                ..SearchConfig::full_width(3)
            };
            let mut a = board.clone();
            let mut b = board.clone();
            let pvs = material_searcher().search(&mut a, side, &pvs_config).expect("search should run");
            let plain = material_searcher()
                .search(&mut b, side, &SearchConfig::full_width(3))
                .expect("search should run");
            assert_eq!(pvs.best_score, plain.best_score, "score mismatch on {fen}");
            assert_eq!(pvs.best_move, plain.best_move, "best move mismatch on {fen}");
            let best = pvs.best_move.expect("a move");
            assert!(find_legal_move(&board, side, &best).expect("kings present").is_some());
        }
    }

    #[test]
    fn null_move_and_lmr_toggle_independently_on_mates() {
        let configs = [
            SearchConfig { max_depth: 3, ..SearchConfig::default() },
            SearchConfig { max_depth: 3, use_null_move: false, ..SearchConfig::default() },
            SearchConfig { max_depth: 3, use_lmr: false, ..SearchConfig::default() },
        ];
        for (fen, expected) in [(MATE_IN_ONE, MATE_SCORE - 1), (MATE_IN_TWO, MATE_SCORE - 3)] {
            let (board, side) = parse_fen(fen).expect("valid fen");
            for config in &configs {
                let mut scratch = board.clone();
                let result = material_searcher().search(&mut scratch, side, config).expect("search should run");
                assert_eq!(
                    result.best_score, expected,
                    "{fen} with null_move={} lmr={}",
                    config.use_null_move, config.use_lmr
                );
                let best = result.best_move.expect("a move");
                assert!(find_legal_move(&board, side, &best).expect("kings present").is_some());
            }
        }
    }

    #[test]
    fn restricted_root_leaves_no_root_entry() {
        let (board, side) = parse_fen("3k5/9/9/9/9/r8/9/9/9/R3K4 w").expect("valid fen");
        let king_step: Vec<Move> = legal_moves(&board, side)
            .expect("kings present")
            .into_iter()
            .filter(|m| m.piece.kind == PieceKind::King)
            .take(1)
            .collect();
        assert_eq!(king_step.len(), 1);

        let config = SearchConfig { max_depth: 4, use_aspiration: false, ..SearchConfig::default() };
        let mut reused = material_searcher();
        let mut scratch = board.clone();
        reused
            .search_moves(&mut scratch, side, Some(&king_step), &SearchConfig { max_depth: 2, ..config.clone() })
            .expect("search should run");
        assert!(reused.tt.probe(position_key(&board, side)).is_none());

        let mut a = board.clone();
        let mut b = board.clone();
        let after = reused.search(&mut a, side, &config).expect("search should run");
        let fresh = material_searcher().search(&mut b, side, &config).expect("search should run");
        assert_eq!(after.best_score, fresh.best_score);
    }

    #[test]
    fn phase_follows_each_root_unless_pinned() {
        let endgame = "3k5/9/9/9/9/9/9/9/4R4/4K4 w";
        let config = SearchConfig { max_depth: 2, ..SearchConfig::default() };
        let mut searcher = material_searcher();

        let mut start = Board::starting_position();
        searcher.search(&mut start, Side::Red, &config).expect("search should run");
        assert_eq!(searcher.phase(), Some(GamePhase::Opening));

        let (mut late, side) = parse_fen(endgame).expect("valid fen");
        searcher.search(&mut late, side, &config).expect("search should run");
        assert_eq!(searcher.phase(), Some(GamePhase::Endgame));

        searcher.set_phase(GamePhase::Midgame);
        searcher.search(&mut late, side, &config).expect("search should run");
        assert_eq!(searcher.phase(), Some(GamePhase::Midgame));
        searcher.top_moves(&mut late, side, 2, 1).expect("search should run");
        assert_eq!(searcher.phase(), Some(GamePhase::Midgame));

        searcher.clear();
        assert_eq!(searcher.phase(), None);
        searcher.top_moves(&mut late, side, 2, 1).expect("search should run");
        assert_eq!(searcher.phase(), Some(GamePhase::Endgame));
    }

    #[test]
    fn node_cap_aborts_and_leaves_board_untouched() {
        let mut board = Board::starting_position();
        let before = board.clone();
        let mut searcher = Searcher::default();
        let result = searcher
            .search(
                &mut board,
                Side::Red,
                &SearchConfig {
                    max_depth: 8,
                    max_nodes: Some(500),
                    ..SearchConfig::default()
                },
            )
            .expect("search should run");
        assert!(result.nodes <= 500, "nodes exceeded cap: {}", result.nodes);
        assert!(result.timed_out);
        assert!(result.best_move.is_some());
        assert_eq!(board, before);
    }

    #[test]
    fn stop_flag_behaves_like_budget_expiry() {
        let mut board = Board::starting_position();
        let flag = Arc::new(AtomicBool::new(true));
        let result = material_searcher()
            .search(
                &mut board,
                Side::Red,
                &SearchConfig {
                    max_depth: 5,
                    stop_flag: Some(flag),
                    ..SearchConfig::default()
                },
            )
            .expect("search should run");
        assert_eq!(result.reached_depth, 0);
        assert!(result.timed_out);
        assert!(result.best_move.is_some());
    }

    #[test]
    fn restricted_root_only_returns_allowed_moves() {
        let mut board = Board::starting_position();
        let moves = legal_moves(&board, Side::Red).expect("kings present");
        let allowed: Vec<Move> = moves.into_iter().filter(|m| m.piece.kind == PieceKind::Pawn).collect();
        let result = material_searcher()
            .search_moves(&mut board, Side::Red, Some(&allowed), &SearchConfig { max_depth: 2, ..SearchConfig::default() })
            .expect("search should run");
        let best = result.best_move.expect("a move");
        assert_eq!(best.piece.kind, PieceKind::Pawn);
    }

    #[test]
    fn top_moves_are_sorted_and_legal() {
        let mut board = Board::starting_position();
        let mut searcher = material_searcher();
        let top = searcher.top_moves(&mut board, Side::Red, 3, 2).expect("search should run");
        assert_eq!(top.len(), 3);
        assert!(top.windows(2).all(|w| w[0].1 >= w[1].1));
        for (mv, _) in &top {
            assert!(find_legal_move(&board, Side::Red, mv).expect("kings present").is_some());
        }
        assert_eq!(board, Board::starting_position());
    }

    #[test]
    fn checkmated_root_reports_mate_without_move() {
        let (mut board, _) = parse_fen(MATE_IN_ONE).expect("valid fen");
        board.apply(&Move {
            from: Square::new(5, 8),
            to: Square::new(0, 8),
            piece: Piece::new(PieceKind::Rook, Side::Red),
            captured: None,
            gives_check: true,
        });
        let result = material_searcher()
            .search(&mut board, Side::Black, &SearchConfig::default())
            .expect("search should run");
        assert!(result.best_move.is_none());
        assert_eq!(result.best_score, -MATE_SCORE);
    }

    #[test]
    fn mate_score_tt_roundtrip_is_consistent() {
        let ply = 7u8;
        let win = MATE_SCORE - 12;
        let loss = -MATE_SCORE + 9;
        assert_eq!(tt_score_from_storage(tt_score_for_storage(win, ply), ply), win);
        assert_eq!(tt_score_from_storage(tt_score_for_storage(loss, ply), ply), loss);
        assert_eq!(tt_score_for_storage(35, ply), 35);
    }
}
