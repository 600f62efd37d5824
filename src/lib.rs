//! Crate root module declarations for the Plum Xiangqi engine core.
//!
//! Exposes the board model, move generation, evaluation and search, the
//! opening/trap/pattern book and the per-move orchestrator, so binaries,
//! benches and tests can import stable module paths.

pub mod errors;

pub mod game_state {
    pub mod board;
    pub mod position_history;
    pub mod undo_state;
    pub mod xiangqi_rules;
    pub mod xiangqi_types;
}

pub mod moves {
    pub mod advisor_moves;
    pub mod bishop_moves;
    pub mod cannon_moves;
    pub mod king_moves;
    pub mod knight_moves;
    pub mod move_builder;
    pub mod pawn_moves;
    pub mod rook_moves;
}

pub mod move_generation {
    pub mod legal_move_checks;
    pub mod legal_move_generator;
    pub mod perft;
}

pub mod search {
    pub mod board_scoring;
    pub mod eval_cache;
    pub mod game_phase;
    pub mod heuristics;
    pub mod iterative_deepening;
    pub mod jitter;
    pub mod move_ordering;
    pub mod piece_square_tables;
    pub mod piece_values;
    pub mod transposition_table;
    pub mod zobrist;
}

pub mod tables {
    pub mod adaptation;
    pub mod book_cache;
    pub mod book_data;
    pub mod book_matcher;
    pub mod book_validation;
    pub mod tactics;
}

pub mod engines {
    pub mod difficulty;
    pub mod engine_trait;
    pub mod orchestrator;
    pub mod time_management;
}

pub mod utils {
    pub mod fen_generator;
    pub mod fen_parser;
    pub mod iccs;
}
