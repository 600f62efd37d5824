use crate::game_state::xiangqi_types::*;

/// Single undo record produced by `Board::apply` and consumed by `Board::revert`.
///
/// This is the only information needed to reverse a move; no move history is
/// consulted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UndoState {
    pub from: Square,
    pub to: Square,
    pub moved_piece: Piece,
    pub captured_piece: Option<Piece>,

    pub prev_hash: u64,
}
