//! Solvers that turn a tactical intention into a concrete move.
//!
//! Each solver is a pure function of `(board, side)`: it scans the legal
//! moves for one that realizes the pattern and never mutates the caller's
//! board.

use crate::errors::XiangqiResult;
use crate::game_state::board::Board;
use crate::game_state::xiangqi_rules::{has_crossed_river, in_palace};
use crate::game_state::xiangqi_types::*;
use crate::move_generation::legal_move_checks::{attackers_to_square, is_in_check, is_square_attacked};
use crate::move_generation::legal_move_generator::{legal_moves, legal_moves_in_place, pseudo_moves_from};
use crate::moves::knight_moves::knight_targets;
use crate::search::move_ordering::see_estimate;
use crate::search::piece_values::exchange_value;
use crate::tables::book_data::TacticIntention;

const CLEARANCE_GAIN: usize = 3;
const DEFLECTION_ATTACKERS: usize = 2;

impl TacticIntention {
    /// A legal move realizing this intention, if the board offers one.
    pub fn solve(&self, board: &Board, side: Side) -> XiangqiResult<Option<Move>> {
        let mut scratch = board.clone();
        let moves = legal_moves(board, side)?;
        let enemy_king = board.king_square(side.opposite())?;
        match self {
            Self::KnightFork { targets, min_value } => knight_fork(&mut scratch, &moves, targets, *min_value),
            Self::ChariotCheckCapture => Ok(moves
                .iter()
                .filter(|m| m.piece.kind == PieceKind::Rook && m.gives_check)
                .filter_map(|m| m.captured.map(|victim| (exchange_value(victim.kind), *m)))
                .max_by_key(|(value, _)| *value)
                .map(|(_, m)| m)),
            Self::KnightCannonMate => {
                if board.count(side, PieceKind::Knight) == 0 || board.count(side, PieceKind::Cannon) == 0 {
                    return Ok(None);
                }
                first_mate(&mut scratch, &moves, |_, m| {
                    matches!(m.piece.kind, PieceKind::Knight | PieceKind::Cannon)
                })
            }
            Self::DiscoveredCheck => {
                if is_in_check(board, side.opposite())? {
                    return Ok(None);
                }
                let mut best: Option<(i32, Move)> = None;
                for mv in moves.iter().filter(|m| m.gives_check) {
                    let undo = scratch.apply(mv);
                    let attackers = attackers_to_square(&scratch, enemy_king, side);
                    scratch.revert(undo);
                    if attackers.iter().any(|(sq, _)| *sq == mv.to) {
                        continue;
                    }
                    let gain = mv.captured.map_or(0, |p| exchange_value(p.kind));
                    if best.is_none_or(|(g, _)| gain > g) {
                        best = Some((gain, *mv));
                    }
                }
                Ok(best.map(|(_, m)| m))
            }
            Self::DoubleCheck => {
                for mv in moves.iter().filter(|m| m.gives_check) {
                    let undo = scratch.apply(mv);
                    let checkers = attackers_to_square(&scratch, enemy_king, side).len();
                    scratch.revert(undo);
                    if checkers >= 2 {
                        return Ok(Some(*mv));
                    }
                }
                Ok(None)
            }
            Self::ClearanceSacrifice => clearance_sacrifice(&mut scratch, side, &moves),
            Self::Deflection => {
                for mv in &moves {
                    let Some(victim) = mv.captured else {
                        continue;
                    };
                    if !matches!(victim.kind, PieceKind::Advisor | PieceKind::Bishop) {
                        continue;
                    }
                    if see_estimate(board, mv) < 0 && !mv.gives_check {
                        continue;
                    }
                    let undo = scratch.apply(mv);
                    let attackers = attackers_near(&scratch, side, enemy_king);
                    scratch.revert(undo);
                    if mv.gives_check || attackers >= DEFLECTION_ATTACKERS {
                        return Ok(Some(*mv));
                    }
                }
                Ok(None)
            }
            Self::SmotheredMate => first_mate(&mut scratch, &moves, |b, m| {
                m.piece.kind == PieceKind::Knight && king_is_smothered(b, enemy_king)
            }),
            Self::DoubleCannonMate => first_mate(&mut scratch, &moves, |b, m| {
                m.piece.kind == PieceKind::Cannon
                    && b
                        .pieces_of(side)
                        .filter(|(sq, p)| {
                            p.kind == PieceKind::Cannon && (sq.col == enemy_king.col || sq.row == enemy_king.row)
                        })
                        .count()
                        >= 2
            }),
        }
    }
}

/// First move that checkmates and satisfies `shape` on the resulting board.
fn first_mate<F>(scratch: &mut Board, moves: &[Move], shape: F) -> XiangqiResult<Option<Move>>
where
    F: Fn(&Board, &Move) -> bool,
{
    for mv in moves.iter().filter(|m| m.gives_check) {
        let defender = mv.piece.side.opposite();
        let undo = scratch.apply(mv);
        let mate = is_mate(scratch, defender);
        let matched = matches!(mate, Ok(true)) && shape(scratch, mv);
        scratch.revert(undo);
        mate?;
        if matched {
            return Ok(Some(*mv));
        }
    }
    Ok(None)
}

pub(crate) fn is_mate(board: &mut Board, defender: Side) -> XiangqiResult<bool> {
    Ok(is_in_check(board, defender)? && legal_moves_in_place(board, defender)?.is_empty())
}

fn knight_fork(scratch: &mut Board, moves: &[Move], targets: &[PieceKind], min_value: i32) -> XiangqiResult<Option<Move>> {
    let mut best: Option<(i32, Move)> = None;
    for mv in moves.iter().filter(|m| m.piece.kind == PieceKind::Knight) {
        let enemy = mv.piece.side.opposite();
        let undo = scratch.apply(mv);
        let view: &Board = scratch;
        let safe = !is_square_attacked(view, mv.to, enemy);
        let forked: Vec<i32> = knight_targets(view, mv.to)
            .filter_map(|sq| view.piece_at(sq))
            .filter(|p| p.side == enemy && p.kind != PieceKind::King)
            .filter(|p| targets.is_empty() || targets.contains(&p.kind))
            .map(|p| exchange_value(p.kind))
            .filter(|v| *v >= min_value)
            .collect();
        scratch.revert(undo);
        if safe && forked.len() >= 2 {
            let total = forked.iter().sum::<i32>();
            if best.is_none_or(|(t, _)| total > t) {
                best = Some((total, *mv));
            }
        }
    }
    Ok(best.map(|(_, m)| m))
}

/// A pawn steps onto an attacked square to open lines for Rooks and Cannons.
fn clearance_sacrifice(scratch: &mut Board, side: Side, moves: &[Move]) -> XiangqiResult<Option<Move>> {
    if scratch.count(side, PieceKind::Rook) == 0 && scratch.count(side, PieceKind::Cannon) == 0 {
        return Ok(None);
    }
    let before = line_piece_mobility(scratch, side);
    for mv in moves.iter().filter(|m| m.piece.kind == PieceKind::Pawn && !m.is_capture()) {
        let undo = scratch.apply(mv);
        let sacrificed = is_square_attacked(scratch, mv.to, side.opposite());
        let after = line_piece_mobility(scratch, side);
        scratch.revert(undo);
        if sacrificed && after >= before + CLEARANCE_GAIN {
            return Ok(Some(*mv));
        }
    }
    Ok(None)
}

fn line_piece_mobility(board: &Board, side: Side) -> usize {
    let mut out = Vec::with_capacity(34);
    for (sq, piece) in board.pieces_of(side) {
        if matches!(piece.kind, PieceKind::Rook | PieceKind::Cannon) {
            pseudo_moves_from(board, sq, piece, &mut out);
        }
    }
    out.len()
}

/// Strong pieces and crossed pawns of `side` within three steps of `king`.
fn attackers_near(board: &Board, side: Side, king: Square) -> usize {
    board
        .pieces_of(side)
        .filter(|(sq, p)| match p.kind {
            PieceKind::Rook | PieceKind::Knight | PieceKind::Cannon => true,
            PieceKind::Pawn => has_crossed_river(side, *sq),
            _ => false,
        })
        .filter(|(sq, _)| sq.manhattan(king) <= 3)
        .count()
}

/// Every orthogonal neighbour of `king` inside its palace is occupied.
fn king_is_smothered(board: &Board, king: Square) -> bool {
    let Some(owner) = board.piece_at(king).map(|p| p.side) else {
        return false;
    };
    [(-1, 0), (1, 0), (0, -1), (0, 1)]
        .into_iter()
        .filter_map(|(dr, dc)| king.offset(dr, dc))
        .filter(|sq| in_palace(owner, *sq))
        .all(|sq| !board.is_empty_at(sq))
}
