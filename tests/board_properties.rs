use plum_xiangqi::game_state::board::Board;
use plum_xiangqi::game_state::undo_state::UndoState;
use plum_xiangqi::game_state::xiangqi_types::Side;
use plum_xiangqi::move_generation::legal_move_generator::legal_moves_in_place;
use plum_xiangqi::search::board_scoring::{BoardScorer, XiangqiEvaluator};
use plum_xiangqi::search::game_phase::GamePhase;
use plum_xiangqi::search::zobrist::compute_placement_hash;
use proptest::prelude::*;

/// Play up to `picks.len()` legal plies from the start position, choosing
/// each move by index. Stops early at a terminal position.
fn random_walk(picks: &[u32]) -> (Board, Side, Vec<UndoState>) {
    let mut board = Board::starting_position();
    let mut side = Side::Red;
    let mut undos = Vec::new();
    for pick in picks {
        let moves = legal_moves_in_place(&mut board, side).expect("kings stay on the board");
        if moves.is_empty() {
            break;
        }
        let mv = moves[*pick as usize % moves.len()];
        undos.push(board.apply(&mv));
        side = side.opposite();
    }
    (board, side, undos)
}

proptest! {
    #![proptest_config(ProptestConfig { cases: 48, .. ProptestConfig::default() })]

    #[test]
    fn apply_then_revert_restores_the_start(picks in prop::collection::vec(any::<u32>(), 0..40)) {
        let start = Board::starting_position();
        let (mut board, _, undos) = random_walk(&picks);

        prop_assert_eq!(board.hash(), compute_placement_hash(&board));
        for undo in undos.into_iter().rev() {
            board.revert(undo);
            prop_assert_eq!(board.hash(), compute_placement_hash(&board));
        }
        prop_assert_eq!(board, start);
    }

    #[test]
    fn evaluation_is_side_symmetric(picks in prop::collection::vec(any::<u32>(), 0..60)) {
        let (board, _, _) = random_walk(&picks);
        for phase in [GamePhase::Opening, GamePhase::Midgame, GamePhase::LateMidgame, GamePhase::Endgame] {
            let evaluator = XiangqiEvaluator::default().with_phase(phase);
            prop_assert_eq!(evaluator.score(&board, Side::Red), -evaluator.score(&board, Side::Black));
        }
    }

    #[test]
    fn walks_keep_both_kings_legal(picks in prop::collection::vec(any::<u32>(), 0..60)) {
        let (board, _, _) = random_walk(&picks);
        prop_assert!(board.validate().is_ok());
    }
}
