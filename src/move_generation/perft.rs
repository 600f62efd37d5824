//! Perft node counting over the legal move tree.
//!
//! Used as the move generator regression oracle and as a benchmark driver.

use crate::errors::XiangqiResult;
use crate::game_state::board::Board;
use crate::game_state::xiangqi_types::Side;
use crate::move_generation::legal_move_generator::legal_moves_in_place;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PerftCounts {
    pub nodes: usize,
    pub captures: usize,
    pub checks: usize,
}

impl PerftCounts {
    fn merge(&mut self, rhs: PerftCounts) {
        self.nodes += rhs.nodes;
        self.captures += rhs.captures;
        self.checks += rhs.checks;
    }
}

/// Count leaf nodes `depth` plies below `board` with `side` to move.
pub fn perft(board: &Board, side: Side, depth: u8) -> XiangqiResult<PerftCounts> {
    if depth == 0 {
        return Ok(PerftCounts {
            nodes: 1,
            ..PerftCounts::default()
        });
    }
    let mut scratch = board.clone();
    perft_recurse(&mut scratch, side, depth)
}

/// Per-root-move breakdown, handy when diffing against another generator.
pub fn perft_divide(board: &Board, side: Side, depth: u8) -> XiangqiResult<Vec<(String, usize)>> {
    let mut scratch = board.clone();
    let mut out = Vec::new();
    for mv in legal_moves_in_place(&mut scratch, side)? {
        let undo = scratch.apply(&mv);
        let counts = if depth <= 1 {
            Ok(PerftCounts {
                nodes: 1,
                ..PerftCounts::default()
            })
        } else {
            perft_recurse(&mut scratch, side.opposite(), depth - 1)
        };
        scratch.revert(undo);
        out.push((crate::utils::iccs::move_to_iccs(&mv), counts?.nodes));
    }
    Ok(out)
}

fn perft_recurse(board: &mut Board, side: Side, depth: u8) -> XiangqiResult<PerftCounts> {
    let moves = legal_moves_in_place(board, side)?;
    let mut total = PerftCounts::default();

    if depth == 1 {
        total.nodes = moves.len();
        total.captures = moves.iter().filter(|m| m.is_capture()).count();
        total.checks = moves.iter().filter(|m| m.gives_check).count();
        return Ok(total);
    }

    for mv in moves {
        let undo = board.apply(&mv);
        let child = perft_recurse(board, side.opposite(), depth - 1);
        board.revert(undo);
        total.merge(child?);
    }

    Ok(total)
}

#[cfg(test)]
mod tests {
    use super::{perft, perft_divide};
    use crate::game_state::board::Board;
    use crate::game_state::xiangqi_types::Side;

    #[test]
    fn starting_position_perft_matches_reference() {
        let board = Board::starting_position();
        let expected = [1usize, 44, 1_920, 79_666];
        for (depth, nodes) in expected.iter().enumerate() {
            let counts = perft(&board, Side::Red, depth as u8).expect("perft should run");
            assert_eq!(counts.nodes, *nodes, "depth {depth}");
        }
    }

    #[test]
    fn first_ply_counts_cannon_captures() {
        // Both cannons can take a knight over the opposing cannon.
        let counts = perft(&Board::starting_position(), Side::Red, 1).expect("perft should run");
        assert_eq!(counts.captures, 2);
        assert_eq!(counts.checks, 0);
    }

    #[test]
    fn divide_sums_to_total() {
        let board = Board::starting_position();
        let split = perft_divide(&board, Side::Red, 2).expect("perft should run");
        assert_eq!(split.len(), 44);
        assert_eq!(split.iter().map(|(_, n)| n).sum::<usize>(), 1_920);
    }
}
