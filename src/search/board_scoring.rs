//! Pluggable board evaluation interfaces and the full positional evaluator.
//!
//! Search stays modular by delegating static scoring to [`BoardScorer`].
//! Every scorer reports a Red-relative value; the side-relative view is
//! derived by negation, so `score(b, Red) == -score(b, Black)` holds for any
//! implementation.

use serde::{Deserialize, Serialize};

use crate::game_state::board::Board;
use crate::game_state::xiangqi_rules::{has_crossed_river, CENTER_COL};
use crate::game_state::xiangqi_types::*;
use crate::move_generation::legal_move_checks::is_square_attacked;
use crate::move_generation::legal_move_generator::pseudo_moves;
use crate::moves::cannon_moves::platform_count;
use crate::moves::move_builder::ORTHOGONAL;
use crate::search::eval_cache::EvalCache;
use crate::search::game_phase::GamePhase;
use crate::search::piece_square_tables::placement_value;
use crate::search::piece_values::{base_value, material_value};

pub const MATE_SCORE: i32 = 1_000_000;

/// Scores at or beyond this magnitude encode a forced mate.
pub const MATE_THRESHOLD: i32 = MATE_SCORE - 1_000;

pub trait BoardScorer: Send + Sync {
    /// Score from Red's point of view.
    fn score_red(&self, board: &Board) -> i32;

    /// Score from `side`'s point of view.
    #[inline]
    fn score(&self, board: &Board, side: Side) -> i32 {
        let red = self.score_red(board);
        match side {
            Side::Red => red,
            Side::Black => -red,
        }
    }

    /// Inform the scorer of the phase for the upcoming search.
    fn set_phase(&mut self, _phase: GamePhase) {}
}

/// Material only, using base piece values. Cheap and predictable.
#[derive(Debug, Clone, Copy, Default)]
pub struct MaterialScorer;

impl BoardScorer for MaterialScorer {
    fn score_red(&self, board: &Board) -> i32 {
        board
            .pieces()
            .filter(|(_, p)| p.kind != PieceKind::King)
            .map(|(_, p)| match p.side {
                Side::Red => base_value(p.kind),
                Side::Black => -base_value(p.kind),
            })
            .sum()
    }
}

/// Per-term weights in percent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EvalWeights {
    pub material: i32,
    pub mobility: i32,
    pub position: i32,
    pub king_safety: i32,
    pub pawn_structure: i32,
    pub threat: i32,
    pub coordination: i32,
    pub control: i32,
    pub activity: i32,
    pub special: i32,
}

impl Default for EvalWeights {
    fn default() -> Self {
        Self {
            material: 100,
            mobility: 50,
            position: 150,
            king_safety: 200,
            pawn_structure: 80,
            threat: 120,
            coordination: 150,
            control: 100,
            activity: 80,
            special: 100,
        }
    }
}

/// Unweighted per-term values for one side.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EvalTerms {
    pub material: i32,
    pub mobility: i32,
    pub position: i32,
    pub king_safety: i32,
    pub pawn_structure: i32,
    pub threat: i32,
    pub coordination: i32,
    pub control: i32,
    pub activity: i32,
    pub special: i32,
}

impl EvalTerms {
    fn minus(self, other: EvalTerms) -> EvalTerms {
        EvalTerms {
            material: self.material - other.material,
            mobility: self.mobility - other.mobility,
            position: self.position - other.position,
            king_safety: self.king_safety - other.king_safety,
            pawn_structure: self.pawn_structure - other.pawn_structure,
            threat: self.threat - other.threat,
            coordination: self.coordination - other.coordination,
            control: self.control - other.control,
            activity: self.activity - other.activity,
            special: self.special - other.special,
        }
    }

    fn weighted(self, w: &EvalWeights) -> i32 {
        let sum = self.material * w.material
            + self.mobility * w.mobility
            + self.position * w.position
            + self.king_safety * w.king_safety
            + self.pawn_structure * w.pawn_structure
            + self.threat * w.threat
            + self.coordination * w.coordination
            + self.control * w.control
            + self.activity * w.activity
            + self.special * w.special;
        sum / 100
    }
}

/// Red-minus-Black terms plus the final Red-relative total.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EvalBreakdown {
    pub phase: GamePhase,
    pub red_minus_black: EvalTerms,
    pub total: i32,
}

const CENTER_SQUARES: [Square; 6] = [
    Square::new(4, 3),
    Square::new(4, 4),
    Square::new(4, 5),
    Square::new(5, 3),
    Square::new(5, 4),
    Square::new(5, 5),
];

#[inline]
const fn mobility_weight(kind: PieceKind) -> i32 {
    match kind {
        PieceKind::Rook => 3,
        PieceKind::Knight => 4,
        PieceKind::Cannon => 2,
        PieceKind::Pawn => 1,
        _ => 1,
    }
}

#[inline]
const fn activity_weight(kind: PieceKind) -> i32 {
    match kind {
        PieceKind::Rook => 2,
        PieceKind::Knight => 3,
        PieceKind::Cannon => 2,
        PieceKind::Pawn => 1,
        _ => 0,
    }
}

#[inline]
const fn proximity_penalty(kind: PieceKind) -> i32 {
    match kind {
        PieceKind::Rook => 30,
        PieceKind::Cannon => 25,
        PieceKind::Knight => 20,
        PieceKind::Pawn => 15,
        _ => 0,
    }
}

/// Weighted multi-term evaluator.
///
/// The phase is fixed for the duration of a search and refreshed by the
/// caller through [`BoardScorer::set_phase`].
#[derive(Debug, Clone, Copy)]
pub struct XiangqiEvaluator {
    weights: EvalWeights,
    phase: GamePhase,
}

impl Default for XiangqiEvaluator {
    fn default() -> Self {
        Self::new(EvalWeights::default())
    }
}

impl XiangqiEvaluator {
    pub fn new(weights: EvalWeights) -> Self {
        Self {
            weights,
            phase: GamePhase::Opening,
        }
    }

    pub fn with_phase(mut self, phase: GamePhase) -> Self {
        self.phase = phase;
        self
    }

    #[inline]
    pub fn phase(&self) -> GamePhase {
        self.phase
    }

    #[inline]
    pub fn weights(&self) -> &EvalWeights {
        &self.weights
    }

    pub fn breakdown(&self, board: &Board) -> EvalBreakdown {
        let red_moves = pseudo_moves(board, Side::Red);
        let black_moves = pseudo_moves(board, Side::Black);
        let red = self.side_terms(board, Side::Red, &red_moves, &black_moves);
        let black = self.side_terms(board, Side::Black, &black_moves, &red_moves);
        let diff = red.minus(black);
        let total = diff.weighted(&self.weights) * self.phase.scale_percent() / 100;
        EvalBreakdown {
            phase: self.phase,
            red_minus_black: diff,
            total,
        }
    }

    fn side_terms(&self, board: &Board, side: Side, own_moves: &[Move], enemy_moves: &[Move]) -> EvalTerms {
        let mut terms = EvalTerms::default();
        for (sq, piece) in board.pieces_of(side) {
            terms.material += material_value(piece, sq, self.phase);
            terms.position += placement_value(piece, sq);
        }

        let mut threatened: Vec<Square> = Vec::new();
        for mv in own_moves {
            terms.mobility += mobility_weight(mv.piece.kind);
            terms.activity += activity_weight(mv.piece.kind);
            if let Some(victim) = mv.captured {
                if victim.kind != PieceKind::King && !threatened.contains(&mv.to) {
                    threatened.push(mv.to);
                    let value = base_value(victim.kind);
                    terms.threat += value / 10 + if value >= 400 { 20 } else { 0 };
                }
            }
        }

        let own_center = own_moves.iter().filter(|m| CENTER_SQUARES.contains(&m.to)).count() as i32;
        let enemy_center = enemy_moves.iter().filter(|m| CENTER_SQUARES.contains(&m.to)).count() as i32;
        terms.control = (own_center - enemy_center) * 3;

        terms.king_safety = king_safety(board, side);
        terms.pawn_structure = pawn_structure(board, side);
        terms.coordination = coordination(board, side);
        terms.special = self.special_factors(board, side, own_moves);
        terms
    }

    fn special_factors(&self, board: &Board, side: Side, own_moves: &[Move]) -> i32 {
        let mut score = 0;
        let early = matches!(self.phase, GamePhase::Opening | GamePhase::Midgame);

        for (sq, piece) in board.pieces_of(side) {
            match piece.kind {
                PieceKind::Cannon => {
                    let platforms = platform_count(board, sq) as i32;
                    score += if early { platforms * 15 } else { (platforms - 2) * 10 };
                }
                PieceKind::Knight => {
                    let reach = own_moves.iter().filter(|m| m.from == sq).count() as i32;
                    let per_move = if self.phase == GamePhase::Endgame { 8 } else { 5 };
                    score += reach * per_move;
                    score += (4 - (sq.col as i32 - CENTER_COL as i32).abs()) * 5;
                    let rel = sq.relative_row(side);
                    if rel == 1 && (sq.col == 2 || sq.col == 6) {
                        score += 50;
                    } else if rel == 2 && (sq.col == 3 || sq.col == 5) {
                        score += 40;
                    }
                }
                PieceKind::Rook => {
                    for (dr, dc) in ORTHOGONAL {
                        let mut open = 0;
                        let mut cursor = sq;
                        while let Some(next) = cursor.offset(dr, dc) {
                            if !board.is_empty_at(next) {
                                break;
                            }
                            open += 1;
                            cursor = next;
                        }
                        if open >= 3 {
                            score += 10;
                        }
                    }
                    if sq.relative_row(side) <= 1 {
                        score += 30;
                    }
                }
                _ => {}
            }
        }

        if self.phase != GamePhase::Opening {
            let advisors = board.count(side, PieceKind::Advisor);
            let bishops = board.count(side, PieceKind::Bishop);
            if advisors == 2 {
                score += 30;
            }
            if bishops == 2 {
                score += 30;
            }
            if advisors == 2 && bishops == 2 {
                score += 40;
            }
        }
        score
    }
}

impl BoardScorer for XiangqiEvaluator {
    fn score_red(&self, board: &Board) -> i32 {
        self.breakdown(board).total
    }

    fn set_phase(&mut self, phase: GamePhase) {
        self.phase = phase;
    }
}

fn king_safety(board: &Board, side: Side) -> i32 {
    let Ok(king) = board.king_square(side) else {
        return -10_000;
    };
    let mut score = 100;
    if is_square_attacked(board, king, side.opposite()) {
        score -= 200;
    }
    let guards = board.count(side, PieceKind::Advisor) + board.count(side, PieceKind::Bishop);
    score += guards as i32 * 30;
    for (sq, piece) in board.pieces_of(side.opposite()) {
        if sq.manhattan(king) <= 3 {
            score -= proximity_penalty(piece.kind);
        }
    }
    score
}

fn pawn_structure(board: &Board, side: Side) -> i32 {
    let pawns: Vec<Square> = board
        .pieces_of(side)
        .filter(|(_, p)| p.kind == PieceKind::Pawn)
        .map(|(sq, _)| sq)
        .collect();
    let enemy_pawn = Some(Piece::new(PieceKind::Pawn, side.opposite()));

    let mut score = 0;
    for &sq in &pawns {
        let rel = sq.relative_row(side);
        if has_crossed_river(side, sq) {
            score += 30;
            score += match rel {
                1 if sq.col == CENTER_COL => 150,
                1 | 2 => 30,
                3 | 4 => 20,
                _ => 0,
            };
        }

        let mut ahead = sq.offset(side.forward(), 0);
        let mut passed = true;
        while let Some(next) = ahead {
            if board.piece_at(next) == enemy_pawn {
                passed = false;
                break;
            }
            ahead = next.offset(side.forward(), 0);
        }
        if passed {
            score += 50;
        }

        let connected = pawns.iter().any(|other| {
            (other.row as i32 - sq.row as i32).abs() <= 1 && (other.col as i32 - sq.col as i32).abs() == 1
        });
        if connected {
            score += 25;
        }

        score += match sq.col {
            4 => 15,
            2 | 6 => 10,
            _ => 0,
        };
    }
    score
}

fn coordination(board: &Board, side: Side) -> i32 {
    let strong: Vec<(Square, PieceKind)> = board
        .pieces_of(side)
        .filter(|(_, p)| p.kind.is_strong())
        .map(|(sq, p)| (sq, p.kind))
        .collect();

    let mut score = 0;
    for (i, &(a, ka)) in strong.iter().enumerate() {
        for &(b, kb) in &strong[i + 1..] {
            let same_line = a.row == b.row || a.col == b.col;
            let dist = a.manhattan(b);
            score += match (ka, kb) {
                (PieceKind::Rook, PieceKind::Rook) if same_line => 35,
                (PieceKind::Rook, PieceKind::Cannon) | (PieceKind::Cannon, PieceKind::Rook) if same_line => 25,
                (PieceKind::Rook, PieceKind::Knight) | (PieceKind::Knight, PieceKind::Rook) if dist <= 3 => 20,
                (PieceKind::Knight, PieceKind::Cannon) | (PieceKind::Cannon, PieceKind::Knight) if dist <= 4 => 15,
                (PieceKind::Knight, PieceKind::Knight) if (2..=4).contains(&dist) => 15,
                _ => 0,
            };
        }
    }
    score
}

/// Scorer paired with a memoization cache.
///
/// Cached values are Red-relative, so one entry serves both sides.
pub struct CachedEvaluator<S: BoardScorer> {
    scorer: S,
    cache: Box<dyn EvalCache>,
    hits: u64,
    misses: u64,
}

impl<S: BoardScorer> CachedEvaluator<S> {
    pub fn new(scorer: S, cache: Box<dyn EvalCache>) -> Self {
        Self {
            scorer,
            cache,
            hits: 0,
            misses: 0,
        }
    }

    pub fn evaluate(&mut self, board: &Board, side: Side) -> i32 {
        let key = board.hash();
        let red = match self.cache.get(key) {
            Some(score) => {
                self.hits += 1;
                score
            }
            None => {
                self.misses += 1;
                let score = self.scorer.score_red(board);
                self.cache.put(key, score);
                score
            }
        };
        match side {
            Side::Red => red,
            Side::Black => -red,
        }
    }

    /// Swap the phase, dropping cached scores computed under another one.
    pub fn set_phase(&mut self, phase: GamePhase, previous: Option<GamePhase>) {
        if previous != Some(phase) {
            self.cache.evict();
        }
        self.scorer.set_phase(phase);
    }

    pub fn clear(&mut self) {
        self.cache.evict();
    }

    #[inline]
    pub fn scorer(&self) -> &S {
        &self.scorer
    }

    pub fn cache_len(&self) -> usize {
        self.cache.len()
    }

    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}
