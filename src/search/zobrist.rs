//! Zobrist hashing support for fast position identity and repetition tracking.
//!
//! The keys are generated from a fixed seed so hashes are deterministic across
//! runs, which is useful for testing and debugging. The board keeps a
//! placement-only hash incrementally; the side-to-move term is folded in by
//! [`position_key`] when a full position identity is needed.

use std::sync::OnceLock;

use crate::game_state::board::Board;
use crate::game_state::xiangqi_types::*;

#[derive(Debug)]
struct ZobristTables {
    piece_square: [[[u64; BOARD_SQUARES]; 7]; 2],
    side_to_move: u64,
}

static TABLES: OnceLock<ZobristTables> = OnceLock::new();

#[inline]
fn tables() -> &'static ZobristTables {
    TABLES.get_or_init(build_tables)
}

fn build_tables() -> ZobristTables {
    let mut seed: u64 = 0x5851_F42D_4C95_7F2D;

    let mut piece_square = [[[0u64; BOARD_SQUARES]; 7]; 2];
    for side in &mut piece_square {
        for kind in side {
            for sq in kind {
                *sq = next_random_u64(&mut seed);
            }
        }
    }

    let side_to_move = next_random_u64(&mut seed);

    ZobristTables {
        piece_square,
        side_to_move,
    }
}

#[inline]
fn next_random_u64(state: &mut u64) -> u64 {
    // splitmix64
    *state = state.wrapping_add(0x9E37_79B9_7F4A_7C15);
    let mut z = *state;
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

/// Return the Zobrist key for a `(piece, square)` occupancy term.
#[inline]
pub fn piece_square_key(piece: Piece, square: Square) -> u64 {
    tables().piece_square[piece.side.index()][piece.kind.index()][square.index()]
}

/// Return the side-to-move toggle key (xor in when Black is to move).
#[inline]
pub fn side_to_move_key() -> u64 {
    tables().side_to_move
}

/// Compute the placement-only hash from scratch.
pub fn compute_placement_hash(board: &Board) -> u64 {
    let mut key = 0u64;
    for (square, piece) in board.pieces() {
        key ^= piece_square_key(piece, square);
    }
    key
}

/// Full position identity: placement plus side to move.
#[inline]
pub fn position_key(board: &Board, side: Side) -> u64 {
    match side {
        Side::Red => board.hash(),
        Side::Black => board.hash() ^ side_to_move_key(),
    }
}

#[cfg(test)]
mod tests {
    use super::{compute_placement_hash, position_key};
    use crate::game_state::board::Board;
    use crate::game_state::xiangqi_types::Side;
    use crate::move_generation::legal_move_generator::legal_moves;

    #[test]
    fn starting_position_hash_is_deterministic() {
        let a = Board::starting_position();
        let b = Board::starting_position();
        assert_eq!(a.hash(), b.hash());
        assert_ne!(a.hash(), 0);
    }

    #[test]
    fn side_to_move_changes_position_key() {
        let board = Board::starting_position();
        assert_ne!(position_key(&board, Side::Red), position_key(&board, Side::Black));
    }

    #[test]
    fn incremental_hash_matches_recompute_after_moves() {
        let mut board = Board::starting_position();
        let mut side = Side::Red;
        for _ in 0..6 {
            let moves = legal_moves(&board, side).expect("kings present");
            let mv = *moves
                .iter()
                .find(|m| m.is_capture())
                .unwrap_or(&moves[0]);
            board.apply(&mv);
            assert_eq!(board.hash(), compute_placement_hash(&board));
            side = side.opposite();
        }
    }
}
