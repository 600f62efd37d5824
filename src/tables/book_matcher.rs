//! Staged book lookup: trap, opening, tactic, endgame, midgame.
//!
//! The first stage that yields a validated move wins. Every candidate goes
//! through [`validate_candidate`]; results (including "no match") are cached
//! by position, side and game length.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::errors::XiangqiResult;
use crate::game_state::board::Board;
use crate::game_state::xiangqi_rules::{has_crossed_river, on_own_half, CENTER_COL};
use crate::game_state::xiangqi_types::*;
use crate::move_generation::legal_move_generator::find_legal_move;
use crate::search::game_phase::GamePhase;
use crate::search::zobrist::position_key;
use crate::tables::adaptation::adapt_book_move;
use crate::tables::book_cache::{BookCache, BookKey, CachedLookup};
use crate::tables::book_data::{BookData, BookMove, EndgameFeature, MidgameFeature, Pattern, TrapEntry, TrapTrigger};
use crate::tables::book_validation::{validate_candidate, validate_trap_refutation, MoveAdvisor, Verdict};

const MATE_THREAT_RADIUS: i32 = 3;
const MATE_THREAT_PIECES: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BookSource {
    Trap,
    TrapPattern,
    Opening,
    OpeningVariation,
    Tactic,
    Endgame,
    Midgame,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BookHit {
    pub mv: Move,
    pub source: BookSource,
    /// Name of the line, trap or pattern that produced the move.
    pub name: String,
    /// Medium-risk trap move played deliberately with a counter prepared.
    pub bait: bool,
}

#[derive(Debug, Clone, Default)]
pub struct BookStats {
    pub lookups: u64,
    pub cache_hits: u64,
    pub hits: HashMap<BookSource, u64>,
    pub failed_validations: u64,
}

#[derive(Debug, Clone)]
pub struct BookMatcher {
    data: BookData,
    cache: BookCache,
    stats: BookStats,
    current_line: Option<String>,
}

impl BookMatcher {
    pub fn new(data: BookData) -> Self {
        Self {
            data,
            cache: BookCache::default(),
            stats: BookStats::default(),
            current_line: None,
        }
    }

    pub fn embedded() -> XiangqiResult<Self> {
        Ok(Self::new(BookData::embedded()?))
    }

    pub fn data(&self) -> &BookData {
        &self.data
    }

    pub fn stats(&self) -> &BookStats {
        &self.stats
    }

    /// The opening line the last opening hit came from.
    pub fn current_line(&self) -> Option<&str> {
        self.current_line.as_deref()
    }

    pub fn clear_cache(&mut self) {
        self.cache.clear();
        self.current_line = None;
    }

    /// Book move for `side`, or `None` when no stage yields a valid move.
    ///
    /// `history` is the game's move list from the start position. The board
    /// is mutated during validation and restored before returning.
    pub fn lookup(
        &mut self,
        board: &mut Board,
        side: Side,
        history: &[Move],
        phase: GamePhase,
        advisor: &mut dyn MoveAdvisor,
    ) -> XiangqiResult<Option<BookHit>> {
        self.stats.lookups += 1;
        let key = BookKey {
            position: position_key(board, side),
            side,
            ply: history.len(),
        };
        match self.cache.get(&key) {
            Some(CachedLookup::NoMatch) => {
                self.stats.cache_hits += 1;
                return Ok(None);
            }
            Some(CachedLookup::Hit(hit)) => {
                if let Some(mv) = find_legal_move(board, side, &hit.mv)? {
                    self.stats.cache_hits += 1;
                    return Ok(Some(BookHit { mv, ..hit.clone() }));
                }
            }
            None => {}
        }

        let mut lookup = Lookup {
            data: &self.data,
            stats: &mut self.stats,
            board,
            side,
            history,
        };
        let found = lookup.run(phase, advisor)?;

        match &found {
            Some(hit) => {
                *self.stats.hits.entry(hit.source).or_default() += 1;
                if matches!(hit.source, BookSource::Opening | BookSource::OpeningVariation) {
                    self.current_line = Some(hit.name.clone());
                }
                log::info!(
                    "book {:?} '{}' plays {:?}->{:?}{}",
                    hit.source,
                    hit.name,
                    hit.mv.from,
                    hit.mv.to,
                    if hit.bait { " (bait)" } else { "" }
                );
            }
            None => log::debug!("no book move for {side} at ply {}", history.len()),
        }
        let entry = found.clone().map_or(CachedLookup::NoMatch, CachedLookup::Hit);
        self.cache.insert(key, entry);
        Ok(found)
    }
}

/// One lookup: borrowed tables plus the position being answered.
struct Lookup<'a> {
    data: &'a BookData,
    stats: &'a mut BookStats,
    board: &'a mut Board,
    side: Side,
    history: &'a [Move],
}

impl Lookup<'_> {
    fn run(&mut self, phase: GamePhase, advisor: &mut dyn MoveAdvisor) -> XiangqiResult<Option<BookHit>> {
        if let Some(hit) = self.traps(advisor)? {
            return Ok(Some(hit));
        }
        if let Some(hit) = self.opening(advisor)? {
            return Ok(Some(hit));
        }
        if let Some(hit) = self.tactics(advisor)? {
            return Ok(Some(hit));
        }
        let data = self.data;
        match phase {
            GamePhase::Endgame => self.patterns(&data.endgames, endgame_feature_holds, BookSource::Endgame, advisor),
            GamePhase::Midgame | GamePhase::LateMidgame => {
                self.patterns(&data.midgames, midgame_feature_holds, BookSource::Midgame, advisor)
            }
            GamePhase::Opening => Ok(None),
        }
    }

    fn admit(&mut self, mv: &Move, cross_check: bool, advisor: &mut dyn MoveAdvisor, label: &str) -> XiangqiResult<Option<bool>> {
        match validate_candidate(self.board, self.side, mv, &self.data.traps, advisor, cross_check)? {
            Verdict::Accepted { bait } => Ok(Some(bait)),
            Verdict::Rejected(reason) => {
                self.stats.failed_validations += 1;
                log::warn!("book candidate from '{label}' rejected: {reason}");
                Ok(None)
            }
        }
    }

    fn traps(&mut self, advisor: &mut dyn MoveAdvisor) -> XiangqiResult<Option<BookHit>> {
        let Some(last) = self.history.last().copied() else {
            return Ok(None);
        };
        if last.piece.side != self.side.opposite() {
            return Ok(None);
        }
        let data = self.data;
        for trap in data.traps.iter().filter(|t| t.triggered_by(&last)) {
            if let Some(hit) = self.refute(trap, BookSource::Trap, advisor)? {
                return Ok(Some(hit));
            }
        }

        // Board-feature traps fire only on the move that arms them.
        let Some(before) = board_before(self.board, &last) else {
            return Ok(None);
        };
        for trap in &data.traps {
            let Some(trigger) = trap.trigger else {
                continue;
            };
            if trigger_holds(trigger, self.board, self.side) && !trigger_holds(trigger, &before, self.side) {
                if let Some(hit) = self.refute(trap, BookSource::TrapPattern, advisor)? {
                    return Ok(Some(hit));
                }
            }
        }
        Ok(None)
    }

    fn refute(&mut self, trap: &TrapEntry, source: BookSource, advisor: &mut dyn MoveAdvisor) -> XiangqiResult<Option<BookHit>> {
        let side = self.side;
        for response in trap.responses.iter().filter(|r| r.side() == side) {
            let Some(mv) = adapt_book_move(self.board, self.side, response)? else {
                continue;
            };
            if !validate_trap_refutation(self.board, self.side, &mv)? {
                self.stats.failed_validations += 1;
                log::warn!("refutation {response} of '{}' fails the material check", trap.name);
                continue;
            }
            if let Some(bait) = self.admit(&mv, false, advisor, &trap.name)? {
                return Ok(Some(BookHit {
                    mv,
                    source,
                    name: trap.name.clone(),
                    bait,
                }));
            }
        }
        Ok(None)
    }

    fn opening(&mut self, advisor: &mut dyn MoveAdvisor) -> XiangqiResult<Option<BookHit>> {
        let data = self.data;
        let ply = self.history.len();
        let mut candidates: Vec<(f64, &BookMove, &str, BookSource)> = Vec::new();
        for line in data.openings_for(self.side) {
            if follows(line.moves.iter(), self.history) {
                if let Some(next) = line.moves.get(ply) {
                    candidates.push((line.weight, next, line.name.as_str(), BookSource::Opening));
                }
            }
            let prefix = line.moves.len();
            if ply < prefix {
                continue;
            }
            for variation in &line.variations {
                if !follows(line.moves.iter().chain(&variation.moves), self.history) {
                    continue;
                }
                if let Some(next) = variation.moves.get(ply - prefix) {
                    candidates.push((
                        line.weight * variation.weight,
                        next,
                        variation.name.as_str(),
                        BookSource::OpeningVariation,
                    ));
                }
            }
        }
        if candidates.is_empty() || !self.reached_from_start()? {
            return Ok(None);
        }

        candidates.sort_by(|a, b| b.0.total_cmp(&a.0));
        for (_, next, name, source) in candidates {
            let Some(mv) = adapt_book_move(self.board, self.side, next)? else {
                log::debug!("book move {next} of '{name}' has no counterpart on this board");
                continue;
            };
            if let Some(bait) = self.admit(&mv, true, advisor, name)? {
                return Ok(Some(BookHit {
                    mv,
                    source,
                    name: name.to_string(),
                    bait,
                }));
            }
        }
        Ok(None)
    }

    /// Whether replaying the history from the start reaches this board.
    fn reached_from_start(&self) -> XiangqiResult<bool> {
        let mut replay = Board::starting_position();
        let mut to_move = Side::Red;
        for played in self.history {
            let Some(mv) = find_legal_move(&replay, to_move, played)? else {
                return Ok(false);
            };
            replay.apply(&mv);
            to_move = to_move.opposite();
        }
        Ok(to_move == self.side && replay == *self.board)
    }

    fn tactics(&mut self, advisor: &mut dyn MoveAdvisor) -> XiangqiResult<Option<BookHit>> {
        let data = self.data;
        for tactic in &data.tactics {
            let Some(mv) = tactic.intention.solve(self.board, self.side)? else {
                continue;
            };
            if let Some(bait) = self.admit(&mv, false, advisor, &tactic.name)? {
                return Ok(Some(BookHit {
                    mv,
                    source: BookSource::Tactic,
                    name: tactic.name.clone(),
                    bait,
                }));
            }
        }
        Ok(None)
    }

    fn patterns<F: Copy>(
        &mut self,
        patterns: &[Pattern<F>],
        holds: fn(F, &Board, Side) -> bool,
        source: BookSource,
        advisor: &mut dyn MoveAdvisor,
    ) -> XiangqiResult<Option<BookHit>> {
        for pattern in patterns {
            if pattern.features.is_empty() || !pattern.features.iter().all(|f| holds(*f, self.board, self.side)) {
                continue;
            }
            for suggested in &pattern.suggested {
                let oriented = suggested.oriented_for(self.side);
                let Some(mv) = adapt_book_move(self.board, self.side, &oriented)? else {
                    continue;
                };
                if let Some(bait) = self.admit(&mv, true, advisor, &pattern.name)? {
                    return Ok(Some(BookHit {
                        mv,
                        source,
                        name: pattern.name.clone(),
                        bait,
                    }));
                }
            }
        }
        Ok(None)
    }
}

/// `history` is a prefix of `line`.
fn follows<'a>(mut line: impl Iterator<Item = &'a BookMove>, history: &[Move]) -> bool {
    history.iter().all(|played| line.next().is_some_and(|b| b.matches(played)))
}

/// The board as it stood before `last` was played on it.
fn board_before(board: &Board, last: &Move) -> Option<Board> {
    if board.piece_at(last.to) != Some(last.piece) || !board.is_empty_at(last.from) {
        return None;
    }
    let mut before = board.clone();
    before.set_piece(last.to, last.captured);
    before.set_piece(last.from, Some(last.piece));
    Some(before)
}

/// Trap triggers are read from `side`'s point of view: the opponent's
/// pieces create the opportunity (or the threat) `side` responds to.
fn trigger_holds(trigger: TrapTrigger, board: &Board, side: Side) -> bool {
    let enemy = side.opposite();
    match trigger {
        TrapTrigger::CentralPawnAdvanced => board
            .pieces_of(enemy)
            .any(|(sq, p)| p.kind == PieceKind::Pawn && sq.col == CENTER_COL && matches!(sq.relative_row(enemy), 4 | 5)),
        TrapTrigger::EnemyChariotInOurHalf => board
            .pieces_of(enemy)
            .any(|(sq, p)| p.kind == PieceKind::Rook && on_own_half(side, sq)),
        TrapTrigger::CentralPawnsExchanged => {
            board.is_empty_at(Square::new(6, CENTER_COL)) && board.is_empty_at(Square::new(3, CENTER_COL))
        }
        TrapTrigger::ExposedKnight => board.pieces_of(enemy).any(|(sq, p)| {
            p.kind == PieceKind::Knight && has_crossed_river(enemy, sq) && !has_friendly_neighbour(board, sq, enemy)
        }),
        TrapTrigger::CannonForkSetup => board.pieces_of(enemy).any(|(sq, p)| {
            p.kind == PieceKind::Cannon
                && board
                    .pieces_of(side)
                    .filter(|(t, q)| t.col == sq.col && q.kind.is_strong())
                    .count()
                    >= 2
        }),
    }
}

fn has_friendly_neighbour(board: &Board, sq: Square, side: Side) -> bool {
    (-1..=1)
        .flat_map(|dr| (-1..=1).map(move |dc| (dr, dc)))
        .filter(|&(dr, dc)| (dr, dc) != (0, 0))
        .filter_map(|(dr, dc)| sq.offset(dr, dc))
        .any(|n| board.piece_at(n).is_some_and(|p| p.side == side))
}

fn endgame_feature_holds(feature: EndgameFeature, board: &Board, side: Side) -> bool {
    let enemy = side.opposite();
    let mine = |kind| board.count(side, kind);
    let theirs = |kind| board.count(enemy, kind);
    let my_strong = mine(PieceKind::Rook) + mine(PieceKind::Knight) + mine(PieceKind::Cannon);
    let their_strong = theirs(PieceKind::Rook) + theirs(PieceKind::Knight) + theirs(PieceKind::Cannon);
    match feature {
        EndgameFeature::ChariotVsAdvisor => {
            mine(PieceKind::Rook) == 1
                && my_strong == 1
                && mine(PieceKind::Pawn) == 0
                && their_strong == 0
                && theirs(PieceKind::Advisor) == 1
                && theirs(PieceKind::Bishop) == 0
        }
        EndgameFeature::ChariotVsBishop => {
            mine(PieceKind::Rook) == 1
                && my_strong == 1
                && their_strong == 0
                && theirs(PieceKind::Bishop) == 1
                && theirs(PieceKind::Advisor) == 0
        }
        EndgameFeature::ChariotVsTwoAdvisors => {
            mine(PieceKind::Rook) == 1 && my_strong == 1 && their_strong == 0 && theirs(PieceKind::Advisor) == 2
        }
        EndgameFeature::KnightPawnVsAdvisor => {
            mine(PieceKind::Knight) >= 1
                && mine(PieceKind::Pawn) >= 1
                && mine(PieceKind::Rook) == 0
                && mine(PieceKind::Cannon) == 0
                && their_strong == 0
                && theirs(PieceKind::Advisor) == 1
        }
        EndgameFeature::CannonPawnVsAdvisor => {
            mine(PieceKind::Cannon) >= 1
                && mine(PieceKind::Pawn) >= 1
                && mine(PieceKind::Rook) == 0
                && mine(PieceKind::Knight) == 0
                && their_strong == 0
                && theirs(PieceKind::Advisor) == 1
        }
        EndgameFeature::TwoPawnsVsAdvisor => {
            mine(PieceKind::Pawn) >= 2 && my_strong == 0 && their_strong == 0 && theirs(PieceKind::Advisor) == 1
        }
        EndgameFeature::Winning => {
            my_strong > their_strong || (mine(PieceKind::Pawn) >= 2 && board.pieces_of(enemy).count() <= 3)
        }
    }
}

fn midgame_feature_holds(feature: MidgameFeature, board: &Board, side: Side) -> bool {
    let Ok(king) = board.king_square(side.opposite()) else {
        return false;
    };
    let mut mine = board.pieces_of(side);
    match feature {
        MidgameFeature::DoubleRooks => {
            board.count(side, PieceKind::Rook) >= 2
                && mine.any(|(sq, p)| p.kind == PieceKind::Rook && pieces_between(board, sq, king) == Some(0))
        }
        MidgameFeature::KnightNearKing => mine.any(|(sq, p)| {
            p.kind == PieceKind::Knight && (sq.row as i8 - king.row as i8).abs() == 2 && (sq.col as i8 - king.col as i8).abs() == 1
        }),
        MidgameFeature::CentralCannon => mine.any(|(sq, p)| {
            p.kind == PieceKind::Cannon
                && sq.col == CENTER_COL
                && king.col == CENTER_COL
                && pieces_between(board, sq, king).is_some_and(|n| n >= 1)
        }),
        MidgameFeature::MateThreat => {
            mine.filter(|(sq, p)| p.kind != PieceKind::King && sq.manhattan(king) <= MATE_THREAT_RADIUS)
                .count()
                >= MATE_THREAT_PIECES
        }
        MidgameFeature::OpenFile => mine.any(|(sq, p)| {
            matches!(p.kind, PieceKind::Rook | PieceKind::Cannon)
                && sq.col == king.col
                && pieces_between(board, sq, king) == Some(0)
        }),
        MidgameFeature::DoubleCannons => {
            let cannons: Vec<Square> = mine.filter(|(_, p)| p.kind == PieceKind::Cannon).map(|(sq, _)| sq).collect();
            cannons
                .iter()
                .enumerate()
                .any(|(i, a)| cannons[i + 1..].iter().any(|b| a.col == b.col))
        }
    }
}

/// Occupied squares strictly between two squares on a shared rank or file.
fn pieces_between(board: &Board, a: Square, b: Square) -> Option<usize> {
    let count = if a.row == b.row {
        let (lo, hi) = (a.col.min(b.col), a.col.max(b.col));
        (lo + 1..hi).filter(|&c| !board.is_empty_at(Square::new(a.row, c))).count()
    } else if a.col == b.col {
        let (lo, hi) = (a.row.min(b.row), a.row.max(b.row));
        (lo + 1..hi).filter(|&r| !board.is_empty_at(Square::new(r, a.col))).count()
    } else {
        return None;
    };
    Some(count)
}
