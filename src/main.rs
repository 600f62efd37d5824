//! Self-play driver.
//!
//! Run with:
//! `cargo run --release -- [difficulty] [plies]`
//! `RUST_LOG=plum_xiangqi=debug cargo run --release -- beginner 40`

use plum_xiangqi::engines::engine_trait::{Decision, Engine, GameContext, GoParams};
use plum_xiangqi::engines::orchestrator::MoveOrchestrator;
use plum_xiangqi::errors::XiangqiResult;
use plum_xiangqi::game_state::board::Board;
use plum_xiangqi::game_state::position_history::PositionHistory;
use plum_xiangqi::game_state::xiangqi_types::{Move, Side};
use plum_xiangqi::utils::fen_generator::generate_fen;
use plum_xiangqi::utils::iccs::move_to_iccs;

const DEFAULT_PLIES: usize = 60;

fn main() -> Result<(), String> {
    env_logger::init();

    let mut args = std::env::args().skip(1);
    let level = args.next().unwrap_or_else(|| "beginner".to_owned());
    let plies = match args.next() {
        Some(text) => text.parse::<usize>().map_err(|e| format!("invalid ply count '{text}': {e}"))?,
        None => DEFAULT_PLIES,
    };

    play(&level, plies).map_err(|e| e.to_string())
}

fn play(level: &str, plies: usize) -> XiangqiResult<()> {
    let mut engine = MoveOrchestrator::with_level(level)?;
    engine.new_game();

    let mut board = Board::starting_position();
    let mut side = Side::Red;
    let mut history: Vec<Move> = Vec::new();
    let mut positions = PositionHistory::new();
    positions.push(&board, side)?;

    for ply in 0..plies {
        let game = GameContext {
            board: &board,
            side,
            history: &history,
            positions: &positions,
        };
        let output = engine.choose_move(&game, &GoParams::default())?;
        match output.decision {
            Decision::Terminal(result) => {
                println!("{result} after {ply} plies");
                return Ok(());
            }
            Decision::Move(choice) => {
                println!(
                    "{:>3}. {side} {} ({:?}{})",
                    ply + 1,
                    move_to_iccs(&choice.mv),
                    choice.source,
                    choice.score.map(|s| format!(", {s}")).unwrap_or_default()
                );
                let _ = board.apply(&choice.mv);
                history.push(choice.mv);
                side = side.opposite();
                positions.push(&board, side)?;
            }
        }
    }

    println!("stopped after {plies} plies: {}", generate_fen(&board, side));
    Ok(())
}
