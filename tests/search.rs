use arbor_chess::search::{iterative_deepening, MATE_SCORE};
use arbor_chess::{
    calculate_line, precompute, Board, CancelToken, Color, EngineConfig, GameSession, Move,
    MoveGenerator, SearchSession, Tree, TreeStatus,
};

/// White mates in two: Rb7 Kg8 Ra8#
const MATE_IN_TWO: &str = "7k/8/R7/8/8/8/8/1R4K1 w - - 0 1";

fn play_out_mate(config: EngineConfig) {
    let mut game = GameSession::new(MATE_IN_TWO, config).unwrap();
    let mut engine_moves = 0;

    while !game.is_in_checkmate(Color::Black) {
        assert!(engine_moves < 2, "no mate after {engine_moves} engine moves");
        game.play_engine_move().unwrap();
        engine_moves += 1;
        if game.is_in_checkmate(Color::Black) {
            break;
        }
        let reply = game.legal_moves_all()[0];
        game.make_move(reply).unwrap();
    }

    // The mated side gets nothing back
    assert!(game.best_move().is_null());
    assert!(game.play_engine_move().is_err());
}

#[test]
fn forced_mate_converges() {
    play_out_mate(EngineConfig::new(3).with_precompute(false));
}

#[test]
fn forced_mate_converges_with_precomputation() {
    play_out_mate(EngineConfig::new(3).with_threads(2));
}

#[test]
fn every_black_defence_is_mated() {
    let generator = MoveGenerator::new();
    let start = Board::from_fen(MATE_IN_TWO).unwrap();

    let mut root = Tree::new(start, 3);
    let mut session = SearchSession::new();
    let first = session.search(&mut root, &CancelToken::new());
    assert_eq!(root[root.root()].value, MATE_SCORE);

    let after_first = start.apply_move(&first);
    for reply in generator.generate_legal_moves(&after_first) {
        let mut session = SearchSession::new();
        let position = after_first.apply_move(&reply);
        let mut tree = Tree::after_move(position, 3, reply);
        let mate = session.search(&mut tree, &CancelToken::new());
        let final_position = position.apply_move(&mate);
        assert!(
            generator.is_in_checkmate(&final_position, Color::Black),
            "{first} {reply} {mate} does not mate"
        );
    }
}

#[test]
fn line_starts_with_best_move() {
    let board = Board::from_fen(MATE_IN_TWO).unwrap();
    let line = calculate_line(&board, 3, &CancelToken::new());
    assert_eq!(line.len(), 3);

    let generator = MoveGenerator::new();
    let mated = line.iter().fold(board, |b, mv| b.apply_move(mv));
    assert!(generator.is_in_checkmate(&mated, Color::Black));
}

#[test]
fn precomputed_reply_matches_direct_search() {
    let board = Board::new();
    let pre = precompute(&board, 2, Color::White, 2);
    let played = Move::from_algebraic("d2d4").unwrap();
    let precomputed = pre.take_reply(played).unwrap();
    assert_eq!(precomputed.status, TreeStatus::Complete);

    let mut direct = Tree::after_move(board.apply_move(&played), 2, played);
    let value = iterative_deepening(&mut direct, &CancelToken::new()).unwrap();
    assert_eq!(precomputed[precomputed.root()].value, value);
}

#[test]
fn deep_copy_preserves_searched_tree() {
    let mut tree = Tree::new(Board::new(), 2);
    iterative_deepening(&mut tree, &CancelToken::new()).unwrap();

    let copy = tree.deep_copy(tree.root());
    let original = tree.subtree(tree.root());
    let copied = copy.subtree(copy.root());
    assert_eq!(original.len(), copied.len());
    for (&a, &b) in original.iter().zip(&copied) {
        assert_eq!(tree[a].mv, copy[b].mv);
        assert_eq!(tree[a].value, copy[b].value);
        assert_eq!(tree[a].children.len(), copy[b].children.len());
    }
    assert_eq!(copy.best_line(copy.root()), tree.best_line(tree.root()));
}
