//! Gatekeeping for book candidates.
//!
//! Every move the book proposes passes through [`validate_candidate`] before
//! it can be played: legality, no immediate mate allowed, trap risk and a
//! shallow engine cross-check.

use crate::errors::XiangqiResult;
use crate::game_state::board::Board;
use crate::game_state::xiangqi_types::*;
use crate::move_generation::legal_move_generator::{find_legal_move, legal_moves_in_place};
use crate::search::board_scoring::BoardScorer;
use crate::search::game_phase::GamePhase;
use crate::search::iterative_deepening::{SearchConfig, Searcher};
use crate::search::piece_values::material_value;
use crate::tables::book_data::{DangerLevel, TrapEntry};
use crate::tables::tactics::is_mate;

/// Largest score gap to the engine's best candidate a book move may show.
pub const ENGINE_TOLERANCE: i32 = 800;
/// Lowest material balance a trap refutation may leave the mover with.
pub const TRAP_MATERIAL_FLOOR: i32 = -800;
pub const CROSS_CHECK_DEPTH: u8 = 2;
pub const CROSS_CHECK_CANDIDATES: usize = 3;

/// Shallow engine opinion consulted by the book.
pub trait MoveAdvisor {
    /// Best `n` moves for `side`, scored from `side`'s point of view.
    fn top_moves(&mut self, board: &mut Board, side: Side, n: usize, depth: u8) -> XiangqiResult<Vec<(Move, i32)>>;

    /// Score of playing `mv`, from `side`'s point of view.
    fn score_move(&mut self, board: &mut Board, side: Side, mv: &Move, depth: u8) -> XiangqiResult<i32>;
}

impl<S: BoardScorer> MoveAdvisor for Searcher<S> {
    fn top_moves(&mut self, board: &mut Board, side: Side, n: usize, depth: u8) -> XiangqiResult<Vec<(Move, i32)>> {
        Searcher::top_moves(self, board, side, n, depth)
    }

    fn score_move(&mut self, board: &mut Board, side: Side, mv: &Move, depth: u8) -> XiangqiResult<i32> {
        let config = SearchConfig {
            max_depth: depth.max(1),
            use_aspiration: false,
            ..SearchConfig::default()
        };
        let result = self.search_moves(board, side, Some(std::slice::from_ref(mv)), &config)?;
        Ok(result.best_score)
    }
}

#[derive(Debug, Clone, Copy)]
pub enum TrapRisk<'a> {
    None,
    Medium { trap: &'a TrapEntry, has_counter: bool },
    High { trap: &'a TrapEntry },
}

/// Whether playing `mv` walks `side` into one of `traps`.
pub fn assess_trap_risk<'a>(traps: &'a [TrapEntry], side: Side, mv: &Move) -> TrapRisk<'a> {
    let mut risk = TrapRisk::None;
    for trap in traps.iter().filter(|t| t.triggered_by(mv)) {
        match trap.danger {
            DangerLevel::High => return TrapRisk::High { trap },
            DangerLevel::Medium => {
                let has_counter = trap.counters.iter().any(|c| c.side() == side);
                if matches!(risk, TrapRisk::None) {
                    risk = TrapRisk::Medium { trap, has_counter };
                }
            }
        }
    }
    risk
}

/// After `mv`, can the opponent mate in one?
pub fn allows_immediate_mate(board: &mut Board, side: Side, mv: &Move) -> XiangqiResult<bool> {
    let undo = board.apply(mv);
    let outcome = opponent_mates_in_one(board, side);
    board.revert(undo);
    outcome
}

fn opponent_mates_in_one(board: &mut Board, side: Side) -> XiangqiResult<bool> {
    let replies = legal_moves_in_place(board, side.opposite())?;
    for reply in replies.iter().filter(|m| m.gives_check) {
        let undo = board.apply(reply);
        let mate = is_mate(board, side);
        board.revert(undo);
        if mate? {
            return Ok(true);
        }
    }
    Ok(false)
}

/// Material of `side` minus material of the opponent, Kings excluded.
pub fn material_balance(board: &Board, side: Side) -> i32 {
    let phase = GamePhase::from_board(board);
    board
        .pieces()
        .filter(|(_, p)| p.kind != PieceKind::King)
        .map(|(sq, p)| {
            let value = material_value(p, sq, phase);
            if p.side == side {
                value
            } else {
                -value
            }
        })
        .sum()
}

/// A trap refutation is playable when it is legal, does not hand over a
/// mate in one and keeps material above the floor.
pub fn validate_trap_refutation(board: &mut Board, side: Side, mv: &Move) -> XiangqiResult<bool> {
    let Some(mv) = find_legal_move(board, side, mv)? else {
        return Ok(false);
    };
    if allows_immediate_mate(board, side, &mv)? {
        return Ok(false);
    }
    let undo = board.apply(&mv);
    let balance = material_balance(board, side);
    board.revert(undo);
    Ok(balance >= TRAP_MATERIAL_FLOOR)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// `bait` marks a medium-risk trap move with a prepared counter.
    Accepted { bait: bool },
    Rejected(&'static str),
}

impl Verdict {
    #[inline]
    pub fn is_accepted(&self) -> bool {
        matches!(self, Self::Accepted { .. })
    }
}

/// Full gate for a book candidate. `cross_check` is off for trap refutations
/// and solved tactics, which are trusted over the shallow engine opinion.
pub fn validate_candidate(
    board: &mut Board,
    side: Side,
    mv: &Move,
    traps: &[TrapEntry],
    advisor: &mut dyn MoveAdvisor,
    cross_check: bool,
) -> XiangqiResult<Verdict> {
    let Some(mv) = find_legal_move(board, side, mv)? else {
        return Ok(Verdict::Rejected("illegal"));
    };
    if allows_immediate_mate(board, side, &mv)? {
        return Ok(Verdict::Rejected("allows mate in one"));
    }
    let bait = match assess_trap_risk(traps, side, &mv) {
        TrapRisk::High { .. } => return Ok(Verdict::Rejected("walks into a high-danger trap")),
        TrapRisk::Medium { has_counter, .. } => has_counter,
        TrapRisk::None => false,
    };
    if !cross_check || bait {
        return Ok(Verdict::Accepted { bait });
    }

    let top = advisor.top_moves(board, side, CROSS_CHECK_CANDIDATES, CROSS_CHECK_DEPTH)?;
    let Some(&(_, best)) = top.first() else {
        return Ok(Verdict::Accepted { bait });
    };
    if top.iter().any(|(m, _)| m.same_squares(&mv)) {
        return Ok(Verdict::Accepted { bait });
    }
    let score = advisor.score_move(board, side, &mv, CROSS_CHECK_DEPTH)?;
    if best - score > ENGINE_TOLERANCE {
        log::debug!("book move scored {score} against engine best {best}");
        return Ok(Verdict::Rejected("engine disagrees"));
    }
    Ok(Verdict::Accepted { bait })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::jitter::NoJitter;
    use crate::tables::book_data::BookMove;
    use crate::utils::fen_parser::parse_fen;
    use crate::utils::iccs::iccs_to_move;

    fn searcher() -> Searcher {
        let mut s = Searcher::default();
        s.set_jitter(Box::new(NoJitter));
        s
    }

    fn trap(danger: DangerLevel, trap_move: &str, counters: &[&str]) -> TrapEntry {
        TrapEntry {
            name: trap_move.into(),
            danger,
            trap_move: Some(BookMove::parse(trap_move).expect("valid")),
            trigger: None,
            allow_any_piece: false,
            responses: vec![],
            counters: counters.iter().map(|c| BookMove::parse(c).expect("valid")).collect(),
        }
    }

    #[test]
    fn high_danger_trap_is_rejected() {
        let mut board = Board::starting_position();
        let mv = iccs_to_move("h0i2", &board, Side::Red).expect("legal");
        let traps = [trap(DangerLevel::High, "N h0i2", &[])];
        let verdict = validate_candidate(&mut board, Side::Red, &mv, &traps, &mut searcher(), true).expect("valid");
        assert_eq!(verdict, Verdict::Rejected("walks into a high-danger trap"));
    }

    #[test]
    fn medium_trap_with_counter_is_bait() {
        let mut board = Board::starting_position();
        let mv = iccs_to_move("h0i2", &board, Side::Red).expect("legal");
        let traps = [trap(DangerLevel::Medium, "N h0i2", &["N i2h4"])];
        let verdict = validate_candidate(&mut board, Side::Red, &mv, &traps, &mut searcher(), true).expect("valid");
        assert_eq!(verdict, Verdict::Accepted { bait: true });
    }

    #[test]
    fn illegal_candidate_is_rejected() {
        let mut board = Board::starting_position();
        let mv = Move {
            from: Square::new(9, 0),
            to: Square::new(5, 0),
            piece: Piece::new(PieceKind::Rook, Side::Red),
            captured: None,
            gives_check: false,
        };
        let verdict = validate_candidate(&mut board, Side::Red, &mv, &[], &mut searcher(), false).expect("valid");
        assert_eq!(verdict, Verdict::Rejected("illegal"));
    }

    #[test]
    fn opening_move_passes_cross_check() {
        let mut board = Board::starting_position();
        let before = board.clone();
        let mv = iccs_to_move("h2e2", &board, Side::Red).expect("legal");
        let verdict = validate_candidate(&mut board, Side::Red, &mv, &[], &mut searcher(), true).expect("valid");
        assert!(verdict.is_accepted());
        assert_eq!(board, before);
    }

    #[test]
    fn quiet_move_that_allows_back_rank_mate_is_caught() {
        // Black rooks cover the d and f files; only the e1 rook keeps an escape square shut.
        let (mut board, side) = parse_fen("3k5/3r1r3/9/8P/9/r8/9/9/4R4/4K4 w").expect("valid fen");
        let before = board.clone();
        let pawn_push = iccs_to_move("i6i7", &board, side).expect("legal");
        assert!(allows_immediate_mate(&mut board, side, &pawn_push).expect("valid"));
        let rook_lift = iccs_to_move("e1e2", &board, side).expect("legal");
        assert!(!allows_immediate_mate(&mut board, side, &rook_lift).expect("valid"));
        assert_eq!(board, before);
    }

    #[test]
    fn material_balance_is_antisymmetric() {
        let board = Board::starting_position();
        assert_eq!(material_balance(&board, Side::Red), 0);
        let (board, _) = parse_fen("4k4/9/9/9/9/9/9/9/4R4/4K4 w").expect("valid fen");
        assert!(material_balance(&board, Side::Red) > 0);
        assert_eq!(material_balance(&board, Side::Red), -material_balance(&board, Side::Black));
    }
}
