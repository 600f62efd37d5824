//! Per-turn move selection: book, emergency reply, search, fallback.
//!
//! Sequence for one turn:
//! 1. validate the board and detect checkmate/stalemate,
//! 2. classify the phase and hand it to the searcher,
//! 3. drop checks that would repeat a position a third time,
//! 4. consult the book,
//! 5. when in check, answer with the strongest forcing escape,
//! 6. otherwise search under the time budget,
//! 7. re-validate the result and fall back to the best-ordered legal move.

use std::collections::HashMap;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::engines::difficulty::{DifficultyProfile, MAX_SEARCH_DEPTH};
use crate::engines::engine_trait::{
    Decision, Engine, EngineOutput, GameContext, GoParams, MoveChoice, MoveSource, TerminalResult,
};
use crate::engines::time_management::{plan_budget, TimeManagementStrategy};
use crate::errors::{XiangqiError, XiangqiResult};
use crate::game_state::board::Board;
use crate::game_state::position_history::PositionHistory;
use crate::game_state::xiangqi_types::*;
use crate::move_generation::legal_move_checks::is_in_check;
use crate::move_generation::legal_move_generator::{find_legal_move, legal_moves_in_place};
use crate::search::board_scoring::XiangqiEvaluator;
use crate::search::eval_cache::BoundedEvalCache;
use crate::search::game_phase::GamePhase;
use crate::search::iterative_deepening::{SearchResult, SearchStats, Searcher};
use crate::search::heuristics::SearchHeuristics;
use crate::search::jitter::{NoJitter, RandomJitter, TieBreakJitter};
use crate::search::move_ordering::{order_moves, OrderingHints};
use crate::search::piece_values::exchange_value;
use crate::search::transposition_table::TranspositionTable;
use crate::search::zobrist::position_key;
use crate::tables::book_data::BookData;
use crate::tables::book_matcher::BookMatcher;
use crate::utils::iccs::move_to_iccs;

/// A checking position may appear at most this many times before the next
/// repetition is refused.
const PERPETUAL_CHECK_LIMIT: usize = 2;
const EMERGENCY_CHECK_BONUS: i32 = 1_000;

#[derive(Debug, Clone, Default)]
pub struct OrchestratorStats {
    pub decisions: HashMap<MoveSource, u64>,
    pub terminal_results: u64,
    pub last_search: Option<SearchStats>,
    pub last_depth: u8,
    pub last_nodes: u64,
    pub last_decision_at: Option<DateTime<Utc>>,
}

pub struct MoveOrchestrator {
    profile: DifficultyProfile,
    searcher: Searcher,
    book: BookMatcher,
    time_strategy: TimeManagementStrategy,
    stop_flag: Option<Arc<AtomicBool>>,
    jitter_seed: Option<u64>,
    stats: OrchestratorStats,
}

impl MoveOrchestrator {
    pub fn new(profile: DifficultyProfile, book: BookData) -> XiangqiResult<Self> {
        profile.validate()?;
        let mut orchestrator = Self {
            searcher: Searcher::default(),
            book: BookMatcher::new(book),
            time_strategy: TimeManagementStrategy::default(),
            stop_flag: None,
            jitter_seed: None,
            stats: OrchestratorStats::default(),
            profile,
        };
        orchestrator.rebuild_searcher();
        Ok(orchestrator)
    }

    /// Built-in difficulty with the embedded book.
    pub fn with_level(level: &str) -> XiangqiResult<Self> {
        Self::new(DifficultyProfile::builtin(level)?, BookData::embedded()?)
    }

    pub fn profile(&self) -> &DifficultyProfile {
        &self.profile
    }

    pub fn set_profile(&mut self, profile: DifficultyProfile) -> XiangqiResult<()> {
        profile.validate()?;
        self.profile = profile;
        self.rebuild_searcher();
        Ok(())
    }

    pub fn stats(&self) -> &OrchestratorStats {
        &self.stats
    }

    pub fn book(&self) -> &BookMatcher {
        &self.book
    }

    /// Shared flag that stops a running search like an expired budget.
    pub fn set_stop_flag(&mut self, flag: Option<Arc<AtomicBool>>) {
        self.stop_flag = flag;
    }

    /// Reproducible tie-breaking; `None` draws from OS entropy.
    pub fn set_jitter_seed(&mut self, seed: Option<u64>) {
        self.jitter_seed = seed;
        self.searcher.set_jitter(self.make_jitter());
    }

    fn make_jitter(&self) -> Box<dyn TieBreakJitter> {
        match (self.profile.use_jitter, self.jitter_seed) {
            (false, _) => Box::new(NoJitter),
            (true, Some(seed)) => Box::new(RandomJitter::seeded(seed)),
            (true, None) => Box::new(RandomJitter::from_entropy()),
        }
    }

    fn rebuild_searcher(&mut self) {
        self.searcher = Searcher::with_parts(
            XiangqiEvaluator::new(self.profile.weights),
            Box::new(BoundedEvalCache::default()),
            TranspositionTable::new_with_mb(self.profile.tt_mb),
            self.make_jitter(),
        );
    }

    /// Pick a move for the position in `game`, or report the game over.
    pub fn decide(&mut self, game: &GameContext<'_>, params: &GoParams) -> XiangqiResult<(Decision, Option<SearchResult>)> {
        game.board.validate()?;
        let side = game.side;
        let mut board = game.board.clone();

        let legal = legal_moves_in_place(&mut board, side)?;
        if legal.is_empty() {
            let result = if is_in_check(&board, side)? {
                TerminalResult::Checkmate { loser: side }
            } else {
                TerminalResult::Stalemate { loser: side }
            };
            log::info!("{result}");
            self.stats.terminal_results += 1;
            self.stats.last_decision_at = Some(Utc::now());
            return Ok((Decision::Terminal(result), None));
        }

        let phase = GamePhase::from_board(&board);
        if self.searcher.phase() != Some(phase) {
            self.searcher.set_phase(phase);
        }
        let mut allowed = perpetual_check_filter(&mut board, side, &legal, game.positions)?;
        order_moves(
            &board,
            &mut allowed,
            &OrderingHints::default(),
            &SearchHeuristics::default(),
            &mut NoJitter,
        );

        let (choice, search) = self.select(&mut board, game, &allowed, phase, params)?;
        let choice = self.revalidate(&board, side, &allowed, choice)?;

        log::info!(
            "{side} plays {} ({:?}, depth {}, score {:?})",
            move_to_iccs(&choice.mv),
            choice.source,
            choice.depth,
            choice.score
        );
        *self.stats.decisions.entry(choice.source).or_default() += 1;
        self.stats.last_decision_at = Some(Utc::now());
        if let Some(result) = &search {
            self.stats.last_search = Some(result.stats);
            self.stats.last_depth = result.reached_depth;
            self.stats.last_nodes = result.nodes;
        }
        Ok((Decision::Move(choice), search))
    }

    fn select(
        &mut self,
        board: &mut Board,
        game: &GameContext<'_>,
        allowed: &[Move],
        phase: GamePhase,
        params: &GoParams,
    ) -> XiangqiResult<(MoveChoice, Option<SearchResult>)> {
        let side = game.side;
        if self.profile.use_book {
            let hit = self.book.lookup(board, side, game.history, phase, &mut self.searcher)?;
            if let Some(hit) = hit {
                if allowed.iter().any(|m| m.same_squares(&hit.mv)) {
                    let choice = MoveChoice {
                        mv: hit.mv,
                        source: MoveSource::Book(hit.source),
                        score: None,
                        depth: 0,
                    };
                    return Ok((choice, None));
                }
                log::warn!("book move from '{}' would repeat a perpetual check", hit.name);
            }
        }

        if is_in_check(board, side)? {
            if let Some(mv) = emergency_response(allowed) {
                let choice = MoveChoice {
                    mv,
                    source: MoveSource::Emergency,
                    score: None,
                    depth: 0,
                };
                return Ok((choice, None));
            }
        }

        let budget = plan_budget(side, game.history.len(), params, self.profile.time_limit_ms, self.time_strategy);
        let depth = params
            .depth
            .unwrap_or_else(|| self.profile.depth_for(phase, budget.under_pressure))
            .clamp(1, MAX_SEARCH_DEPTH);
        let mut config = self.profile.search_config(depth, budget.movetime_ms);
        config.max_nodes = params.max_nodes;
        config.stop_flag = self.stop_flag.clone();
        log::debug!(
            "searching {side} to depth {depth} within {} ms{}",
            budget.movetime_ms,
            if budget.under_pressure { " (clock pressure)" } else { "" }
        );

        let result = self.searcher.search_moves(board, side, Some(allowed), &config)?;
        let choice = match result.best_move {
            Some(mv) => MoveChoice {
                mv,
                source: MoveSource::Search,
                score: Some(result.best_score),
                depth: result.reached_depth,
            },
            None => fallback_choice(allowed)?,
        };
        Ok((choice, Some(result)))
    }

    fn revalidate(&self, board: &Board, side: Side, allowed: &[Move], choice: MoveChoice) -> XiangqiResult<MoveChoice> {
        let permitted = allowed.iter().any(|m| m.same_squares(&choice.mv));
        if permitted {
            if let Some(mv) = find_legal_move(board, side, &choice.mv)? {
                return Ok(MoveChoice { mv, ..choice });
            }
        }
        log::warn!(
            "{:?} move {} failed re-validation, falling back",
            choice.source,
            move_to_iccs(&choice.mv)
        );
        fallback_choice(allowed)
    }
}

fn fallback_choice(allowed: &[Move]) -> XiangqiResult<MoveChoice> {
    let mv = allowed
        .first()
        .copied()
        .ok_or_else(|| XiangqiError::IllegalMove("no legal move to fall back to".to_owned()))?;
    Ok(MoveChoice {
        mv,
        source: MoveSource::Fallback,
        score: None,
        depth: 0,
    })
}

/// Remove checks into a position already seen `PERPETUAL_CHECK_LIMIT`
/// times, unless that would leave nothing to play.
pub fn perpetual_check_filter(
    board: &mut Board,
    side: Side,
    moves: &[Move],
    positions: &PositionHistory,
) -> XiangqiResult<Vec<Move>> {
    if positions.is_empty() {
        return Ok(moves.to_vec());
    }
    let opponent = side.opposite();
    let mut kept = Vec::with_capacity(moves.len());
    for mv in moves {
        if !mv.gives_check {
            kept.push(*mv);
            continue;
        }
        let undo = board.apply(mv);
        let seen = positions.occurrences(position_key(board, opponent), opponent);
        board.revert(undo);
        if seen < PERPETUAL_CHECK_LIMIT {
            kept.push(*mv);
        }
    }
    if kept.is_empty() {
        return Ok(moves.to_vec());
    }
    if kept.len() < moves.len() {
        log::debug!("dropped {} perpetual-check moves", moves.len() - kept.len());
    }
    Ok(kept)
}

/// Forcing reply among check escapes: checks first, then the biggest capture.
pub fn emergency_response(escapes: &[Move]) -> Option<Move> {
    let urgency = |m: &Move| {
        let check = if m.gives_check { EMERGENCY_CHECK_BONUS } else { 0 };
        check + m.captured.map_or(0, |p| exchange_value(p.kind))
    };
    let mut best: Option<(i32, Move)> = None;
    for mv in escapes {
        let score = urgency(mv);
        if best.map_or(true, |(s, _)| score > s) {
            best = Some((score, *mv));
        }
    }
    best.map(|(_, m)| m)
}

fn info_lines(choice: &Decision, search: Option<&SearchResult>) -> Vec<String> {
    let mut lines = Vec::new();
    if let Some(result) = search {
        let pv: Vec<String> = result.principal_variation.iter().map(move_to_iccs).collect();
        lines.push(format!(
            "info depth {} seldepth {} score {} nodes {} nps {} time {} pv {}",
            result.reached_depth,
            result.stats.selective_depth,
            result.best_score,
            result.nodes,
            result.nps,
            result.elapsed_ms,
            pv.join(" ")
        ));
    }
    match choice {
        Decision::Move(choice) => lines.push(format!("info string source {:?}", choice.source)),
        Decision::Terminal(result) => lines.push(format!("info string {result}")),
    }
    lines
}

impl Engine for MoveOrchestrator {
    fn new_game(&mut self) {
        self.searcher.clear();
        self.book.clear_cache();
    }

    fn set_option(&mut self, name: &str, value: &str) -> XiangqiResult<()> {
        if name.eq_ignore_ascii_case("Difficulty") {
            return self.set_profile(DifficultyProfile::builtin(value)?);
        }
        if name.eq_ignore_ascii_case("Hash") {
            let parsed = value
                .trim()
                .parse::<usize>()
                .map_err(|_| XiangqiError::Config(format!("invalid Hash value '{value}'")))?;
            self.profile.tt_mb = parsed.max(1);
            self.rebuild_searcher();
            return Ok(());
        }
        if name.eq_ignore_ascii_case("OwnBook") {
            let v = value.trim().to_ascii_lowercase();
            self.profile.use_book = matches!(v.as_str(), "true" | "1" | "yes" | "on");
            return Ok(());
        }
        if name.eq_ignore_ascii_case("Seed") {
            let seed = value
                .trim()
                .parse::<u64>()
                .map_err(|_| XiangqiError::Config(format!("invalid Seed value '{value}'")))?;
            self.set_jitter_seed(Some(seed));
            return Ok(());
        }
        if name.eq_ignore_ascii_case("TimeStrategy") {
            let v = value.trim().to_ascii_lowercase();
            self.time_strategy = match v.as_str() {
                "adaptive" => TimeManagementStrategy::Adaptive,
                "fraction20" | "simple" => TimeManagementStrategy::Fraction20,
                _ => return Err(XiangqiError::Config(format!("invalid TimeStrategy value '{value}'"))),
            };
            return Ok(());
        }
        Err(XiangqiError::Config(format!("unknown option '{name}'")))
    }

    fn choose_move(&mut self, game: &GameContext<'_>, params: &GoParams) -> XiangqiResult<EngineOutput> {
        let (decision, search) = self.decide(game, params)?;
        let info_lines = info_lines(&decision, search.as_ref());
        Ok(EngineOutput { decision, info_lines })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::board_scoring::MATE_SCORE;
    use crate::utils::fen_parser::{parse_board, parse_fen};
    use crate::utils::iccs::iccs_to_move;

    fn orchestrator(level: &str) -> MoveOrchestrator {
        let mut o = MoveOrchestrator::with_level(level).expect("builtin level");
        o.set_jitter_seed(Some(7));
        o
    }

    fn quick() -> GoParams {
        GoParams {
            depth: Some(2),
            movetime_ms: Some(5_000),
            ..GoParams::default()
        }
    }

    fn decide(o: &mut MoveOrchestrator, fen: &str, history: &[Move], positions: &PositionHistory) -> Decision {
        let (board, side) = parse_fen(fen).expect("valid fen");
        let game = GameContext {
            board: &board,
            side,
            history,
            positions,
        };
        o.decide(&game, &quick()).expect("valid position").0
    }

    #[test]
    fn checkmated_side_gets_terminal_result() {
        let mut o = orchestrator("normal");
        // Black king on e9 faces two rooks covering the d and f files plus the e file.
        let decision = decide(&mut o, "4k4/3R1R3/4R4/9/9/9/9/9/9/3K5 b", &[], &PositionHistory::new());
        assert_eq!(decision, Decision::Terminal(TerminalResult::Checkmate { loser: Side::Black }));
        assert_eq!(o.stats().terminal_results, 1);
    }

    #[test]
    fn stalemate_is_reported_with_the_loser() {
        let mut o = orchestrator("normal");
        // Rooks hold the d and f files, the pawn covers e8 and blocks the kings.
        let decision = decide(&mut o, "4k4/9/3RPR3/9/9/9/9/9/9/4K4 b", &[], &PositionHistory::new());
        assert_eq!(decision, Decision::Terminal(TerminalResult::Stalemate { loser: Side::Black }));
    }

    #[test]
    fn missing_king_is_an_error() {
        let mut o = orchestrator("normal");
        let board = parse_board("9/9/9/9/9/9/9/9/9/4K4").expect("parses");
        let game = GameContext {
            board: &board,
            side: Side::Red,
            history: &[],
            positions: &PositionHistory::new(),
        };
        assert_eq!(o.decide(&game, &quick()).map(|d| d.0), Err(XiangqiError::NoKing(Side::Black)));
    }

    #[test]
    fn opening_uses_the_book() {
        let mut o = orchestrator("normal");
        let decision = decide(&mut o, crate::game_state::xiangqi_rules::STARTING_POSITION_FEN, &[], &PositionHistory::new());
        let Decision::Move(choice) = decision else {
            panic!("expected a move");
        };
        assert!(matches!(choice.source, MoveSource::Book(_)));
        assert!(o.stats().last_decision_at.is_some());
    }

    #[test]
    fn search_finds_mate_in_one() {
        let mut o = orchestrator("beginner");
        let decision = decide(&mut o, "4k4/R8/9/9/9/8R/9/9/9/3K5 w", &[], &PositionHistory::new());
        let Decision::Move(choice) = decision else {
            panic!("expected a move");
        };
        assert_eq!(choice.source, MoveSource::Search);
        assert_eq!(choice.mv.to, Square::new(0, 8));
        assert_eq!(choice.score, Some(MATE_SCORE - 1));
        assert_eq!(o.stats().decisions.get(&MoveSource::Search), Some(&1));
    }

    #[test]
    fn in_check_answers_with_an_emergency_escape() {
        let mut o = orchestrator("beginner");
        // The Black rook on the e file checks; block with the rook or step aside.
        let fen = "3k5/9/9/9/9/4r4/9/9/R8/4K4 w";
        let decision = decide(&mut o, fen, &[], &PositionHistory::new());
        let Decision::Move(choice) = decision else {
            panic!("expected a move");
        };
        assert_eq!(choice.source, MoveSource::Emergency);
        let (board, side) = parse_fen(fen).expect("valid fen");
        assert!(find_legal_move(&board, side, &choice.mv).expect("kings present").is_some());
    }

    #[test]
    fn emergency_prefers_check_then_capture() {
        let quiet = Move {
            from: Square::new(9, 4),
            to: Square::new(8, 4),
            piece: Piece::new(PieceKind::King, Side::Red),
            captured: None,
            gives_check: false,
        };
        let capture = Move {
            from: Square::new(8, 0),
            to: Square::new(8, 4),
            piece: Piece::new(PieceKind::Rook, Side::Red),
            captured: Some(Piece::new(PieceKind::Cannon, Side::Black)),
            gives_check: false,
        };
        let check = Move {
            gives_check: true,
            captured: None,
            ..capture
        };
        assert_eq!(emergency_response(&[quiet, capture]), Some(capture));
        assert_eq!(emergency_response(&[quiet, capture, check]), Some(check));
        assert_eq!(emergency_response(&[]), None);
    }

    #[test]
    fn third_repetition_of_a_check_is_filtered() {
        let (mut board, side) = parse_fen("4k4/R8/9/9/9/9/9/9/9/3K5 w").expect("valid fen");
        let repeat = iccs_to_move("a8a9", &board, side).expect("legal");
        assert!(repeat.gives_check);

        let mut checked = board.clone();
        checked.apply(&repeat);
        let mut positions = PositionHistory::new();
        positions.push(&checked, Side::Black).expect("kings present");
        let legal = legal_moves_in_place(&mut board, side).expect("kings present");

        let once = perpetual_check_filter(&mut board, side, &legal, &positions).expect("valid");
        assert_eq!(once.len(), legal.len());

        positions.push(&checked, Side::Black).expect("kings present");
        let filtered = perpetual_check_filter(&mut board, side, &legal, &positions).expect("valid");
        assert_eq!(filtered.len(), legal.len() - 1);
        assert!(!filtered.iter().any(|m| m.same_squares(&repeat)));
        assert!(filtered.iter().any(|m| m.gives_check));

        let mut o = orchestrator("beginner");
        let decision = decide(&mut o, "4k4/R8/9/9/9/9/9/9/9/3K5 w", &[], &positions);
        let chosen = decision.chosen_move().expect("a move");
        assert!(!chosen.same_squares(&repeat));
    }

    #[test]
    fn options_are_validated() {
        let mut o = orchestrator("normal");
        o.set_option("Difficulty", "hard").expect("valid level");
        assert_eq!(o.profile().name, "hard");
        o.set_option("OwnBook", "off").expect("valid");
        assert!(!o.profile().use_book);
        assert!(matches!(o.set_option("Hash", "lots"), Err(XiangqiError::Config(_))));
        assert!(matches!(o.set_option("Difficulty", "godlike"), Err(XiangqiError::Config(_))));
        assert!(matches!(o.set_option("Colour", "red"), Err(XiangqiError::Config(_))));
    }

    #[test]
    fn engine_trait_reports_info_lines() {
        let mut o = orchestrator("beginner");
        let board = Board::starting_position();
        let positions = PositionHistory::new();
        let game = GameContext {
            board: &board,
            side: Side::Red,
            history: &[],
            positions: &positions,
        };
        let out = o.choose_move(&game, &quick()).expect("valid");
        assert!(out.decision.chosen_move().is_some());
        assert!(out.info_lines.iter().any(|l| l.starts_with("info depth")));
    }
}
