//! Arbor - Search Engine Module
//!
//! This module implements the chess search algorithm using:
//! - Minimax with alpha-beta pruning over a persistent search tree
//! - Iterative deepening that reuses and reorders the tree between passes
//! - Forced-mate playback once a mate has been proven
//! - Cooperative cancellation through a shared token

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::board::{Board, Move};
use crate::evaluation::evaluate;
use crate::move_generator::MoveGenerator;
use crate::tree::{NodeId, Tree};
use crate::types::*;

// Constants for search
pub const INFINITY: i32 = i32::MAX;
pub const MATE_SCORE: i32 = i32::MAX;

/// Sentinel for "the played reply was not among the precomputed ones"
const NO_REPLY: usize = usize::MAX;

// ============================================================================
// CANCELLATION
// ============================================================================

/// Flags written by the foreground and read by searching threads
#[derive(Debug)]
pub struct SearchSignals {
    abort: AtomicBool,
    opponent_moved: AtomicBool,
    played_reply: AtomicUsize,
}

impl Default for SearchSignals {
    fn default() -> Self {
        SearchSignals {
            abort: AtomicBool::new(false),
            opponent_moved: AtomicBool::new(false),
            played_reply: AtomicUsize::new(NO_REPLY),
        }
    }
}

/// Handle a search polls between sibling expansions
///
/// A token bound to a precomputed reply is also cancelled once the opponent
/// has played a different move.
#[derive(Clone, Debug, Default)]
pub struct CancelToken {
    signals: Arc<SearchSignals>,
    reply_index: Option<usize>,
}

impl CancelToken {
    pub fn new() -> Self {
        CancelToken::default()
    }

    /// Token sharing these signals, bound to the reply at `index`
    pub fn for_reply(&self, index: usize) -> Self {
        CancelToken {
            signals: Arc::clone(&self.signals),
            reply_index: Some(index),
        }
    }

    /// Stop every search holding these signals
    pub fn abort(&self) {
        self.signals.abort.store(true, Ordering::Release);
    }

    /// Record which reply the opponent actually played (`None` if it was
    /// not one being analysed)
    pub fn opponent_moved(&self, reply_index: Option<usize>) {
        self.signals
            .played_reply
            .store(reply_index.unwrap_or(NO_REPLY), Ordering::Release);
        self.signals.opponent_moved.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        if self.signals.abort.load(Ordering::Acquire) {
            return true;
        }
        match self.reply_index {
            Some(index) => {
                self.signals.opponent_moved.load(Ordering::Acquire)
                    && self.signals.played_reply.load(Ordering::Acquire) != index
            }
            None => false,
        }
    }
}

// ============================================================================
// ALPHA-BETA
// ============================================================================

/// Alpha-beta searcher writing its results into a `Tree`
pub struct SearchEngine {
    move_generator: MoveGenerator,
    cancel: CancelToken,
    pub nodes_searched: u64,
}

impl SearchEngine {
    pub fn new(cancel: CancelToken) -> Self {
        SearchEngine {
            move_generator: MoveGenerator::new(),
            cancel,
            nodes_searched: 0,
        }
    }

    /// Minimax value of `board` searched `depth` plies deep
    ///
    /// Children already present under `node` are searched first, best line
    /// leading; legal moves with no child yet are expanded after them. The
    /// node's value and best child are written on every completed call. A
    /// cancelled call returns early and leaves the node as it was.
    pub fn minimax(
        &mut self,
        board: &Board,
        depth: u32,
        mut alpha: i32,
        mut beta: i32,
        maximizing: bool,
        tree: &mut Tree,
        node: NodeId,
    ) -> i32 {
        self.nodes_searched += 1;
        let color = Color::from_white(maximizing);
        let moves = self.move_generator.legal_moves_all(board, Some(color), true);

        // Checkmate / Stalemate
        if moves.is_empty() {
            let value = if self.move_generator.is_in_check(board, color) {
                if maximizing { -MATE_SCORE } else { MATE_SCORE }
            } else {
                0
            };
            tree[node].value = value;
            return value;
        }

        if depth == 0 {
            let value = evaluate(board);
            tree[node].value = value;
            return value;
        }

        tree.order_children(node);
        let existing = tree[node].children.clone();
        let missing: Vec<Move> = moves
            .into_iter()
            .filter(|mv| !existing.iter().any(|&c| tree[c].mv == *mv))
            .collect();

        let mut best_value = if maximizing { -INFINITY } else { INFINITY };
        let mut best_index: Option<usize> = None;
        let trials = existing
            .iter()
            .map(|&child| Ok(child))
            .chain(missing.into_iter().map(Err));

        for trial in trials {
            if self.cancel.is_cancelled() {
                return best_value;
            }

            let child = match trial {
                Ok(child) => child,
                Err(mv) => tree.add_child(node, mv, !maximizing),
            };
            let index = tree[node].children.iter().position(|&c| c == child);

            let child_board = board.apply_move(&tree[child].mv);
            let value = self.minimax(&child_board, depth - 1, alpha, beta, !maximizing, tree, child);
            if self.cancel.is_cancelled() {
                return best_value;
            }

            let improved = if maximizing { value > best_value } else { value < best_value };
            if improved || best_index.is_none() {
                best_value = value;
                best_index = index;
            }

            if maximizing {
                alpha = alpha.max(value);
            } else {
                beta = beta.min(value);
            }
            if beta <= alpha {
                break;
            }
        }

        let node = &mut tree[node];
        node.value = best_value;
        node.best_child = best_index;
        best_value
    }
}

/// Deepen `tree` one ply at a time up to its configured depth
///
/// Returns the root value of the last pass, or `None` if cancelled before
/// the final pass finished.
pub fn iterative_deepening(tree: &mut Tree, cancel: &CancelToken) -> Option<i32> {
    let board = tree.board;
    let root = tree.root();
    let maximizing = board.white_to_move;
    let mut engine = SearchEngine::new(cancel.clone());
    let mut value = None;

    for depth in 1..=tree.depth.max(1) {
        let score = engine.minimax(&board, depth, -INFINITY, INFINITY, maximizing, tree, root);
        if cancel.is_cancelled() {
            debug!(depth, "search cancelled");
            return None;
        }
        debug!(
            depth,
            score,
            nodes = engine.nodes_searched,
            best = %tree.best_move(root),
            "iteration complete"
        );
        value = Some(score);
    }
    value
}

/// Is `value` a proven mate for the side to move
#[inline]
fn is_winning_mate(value: i32, white_to_move: bool) -> bool {
    if white_to_move {
        value == MATE_SCORE
    } else {
        value == -MATE_SCORE
    }
}

// ============================================================================
// SEARCH SESSION
// ============================================================================

/// State carried between successive searches of one game
///
/// Once a forced mate is proven the mating line is copied out of the live
/// tree and replayed move by move without searching again.
#[derive(Debug, Default)]
pub struct SearchSession {
    mate_line: Option<Tree>,
    cursor: NodeId,
}

impl SearchSession {
    pub fn new() -> Self {
        SearchSession::default()
    }

    /// True while replaying a proven mate
    pub fn in_forced_mate(&self) -> bool {
        self.mate_line.is_some()
    }

    /// Best move for the side to move at the root of `tree`
    ///
    /// Returns the null move when that side has no legal moves. The root's
    /// move is taken to be the opponent's last move when following a
    /// mating line.
    pub fn search(&mut self, tree: &mut Tree, cancel: &CancelToken) -> Move {
        let generator = MoveGenerator::new();
        let legal = generator.generate_legal_moves(&tree.board);
        if legal.is_empty() {
            self.mate_line = None;
            return Move::null();
        }

        if let Some(mv) = self.next_mate_move(tree) {
            if legal.contains(&mv) {
                return mv;
            }
            warn!(mv = %mv, "mating line diverged from the game, searching again");
            self.mate_line = None;
        }

        let root = tree.root();
        let Some(value) = iterative_deepening(tree, cancel) else {
            return tree.best_move(root);
        };

        let best = tree.best_move(root);
        if is_winning_mate(value, tree.board.white_to_move) {
            if let Some(child) = tree.best_child(root) {
                let line = tree.deep_copy(child);
                info!(line = %tree.format_best_line(), "forced mate found");
                self.cursor = line.root();
                self.mate_line = Some(line);
            }
        }
        best
    }

    /// Next move of the stored mating line, answering the root's move
    fn next_mate_move(&mut self, tree: &Tree) -> Option<Move> {
        let line = self.mate_line.as_ref()?;
        let played = tree[tree.root()].mv;
        let replies = &line[self.cursor].children;

        let reply = line
            .child_with_move(self.cursor, played)
            .or_else(|| {
                replies
                    .iter()
                    .copied()
                    .find(|&r| line.board_at(r).squares == tree.board.squares)
            })
            .or_else(|| match replies.as_slice() {
                [only] => Some(*only),
                _ => None,
            });

        let next = reply.and_then(|r| line.best_child(r));
        match next {
            Some(ours) => {
                let mv = line[ours].mv;
                self.cursor = ours;
                Some(mv)
            }
            None => {
                info!("mating line exhausted");
                self.mate_line = None;
                None
            }
        }
    }
}

/// Principal variation of `board` searched to `depth` plies
pub fn calculate_line(board: &Board, depth: u32, cancel: &CancelToken) -> Vec<Move> {
    let mut tree = Tree::new(*board, depth);
    iterative_deepening(&mut tree, cancel);
    tree.best_line(tree.root())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mate_in_one() -> Board {
        Board::from_fen("6k1/5ppp/8/8/8/8/8/R5K1 w - - 0 1").unwrap()
    }

    #[test]
    fn test_finds_back_rank_mate() {
        let mut tree = Tree::new(mate_in_one(), 2);
        let mut session = SearchSession::new();
        let mv = session.search(&mut tree, &CancelToken::new());

        assert_eq!(mv, Move::from_algebraic("a1a8").unwrap());
        assert_eq!(tree[tree.root()].value, MATE_SCORE);
        assert!(session.in_forced_mate());
    }

    #[test]
    fn test_terminal_scores() {
        let mut engine = SearchEngine::new(CancelToken::new());

        let mated = Board::from_fen("6k1/5ppp/8/8/8/8/5PPP/r5K1 w - - 0 1").unwrap();
        let mut tree = Tree::new(mated, 3);
        let root = tree.root();
        let value = engine.minimax(&mated, 3, -INFINITY, INFINITY, true, &mut tree, root);
        assert_eq!(value, -MATE_SCORE);
        assert!(tree[root].is_leaf());

        let stalemate = Board::from_fen("7k/5Q2/6K1/8/8/8/8/8 b - - 0 1").unwrap();
        let mut tree = Tree::new(stalemate, 3);
        let root = tree.root();
        assert_eq!(engine.minimax(&stalemate, 3, -INFINITY, INFINITY, false, &mut tree, root), 0);
    }

    #[test]
    fn test_depth_zero_is_static_evaluation() {
        let board = Board::from_fen("4k3/8/8/8/8/8/8/3QK3 w - - 0 1").unwrap();
        let mut tree = Tree::new(board, 0);
        let root = tree.root();
        let mut engine = SearchEngine::new(CancelToken::new());
        let value = engine.minimax(&board, 0, -INFINITY, INFINITY, true, &mut tree, root);
        assert_eq!(value, evaluate(&board));
        assert_eq!(tree[root].value, value);
    }

    #[test]
    fn test_reused_tree_matches_fresh_search() {
        let board = Board::from_fen(
            "r1bqkb1r/pppp1ppp/2n2n2/4p3/2B1P3/5N2/PPPP1PPP/RNBQK2R w KQkq - 4 4",
        )
        .unwrap();
        let generator = MoveGenerator::new();
        let legal = generator.generate_legal_moves(&board).len();

        let mut reused = Tree::new(board, 2);
        let root = reused.root();
        let mut engine = SearchEngine::new(CancelToken::new());
        engine.minimax(&board, 1, -INFINITY, INFINITY, true, &mut reused, root);
        assert_eq!(reused[root].children.len(), legal);
        let reused_value = engine.minimax(&board, 2, -INFINITY, INFINITY, true, &mut reused, root);
        assert_eq!(reused[root].children.len(), legal);

        let mut fresh = Tree::new(board, 2);
        let fresh_root = fresh.root();
        let fresh_value = engine.minimax(&board, 2, -INFINITY, INFINITY, true, &mut fresh, fresh_root);
        assert_eq!(reused_value, fresh_value);
    }

    #[test]
    fn test_cancelled_search_writes_nothing() {
        let cancel = CancelToken::new();
        cancel.abort();

        let board = Board::new();
        let mut tree = Tree::new(board, 3);
        let root = tree.root();
        let mut engine = SearchEngine::new(cancel.clone());
        engine.minimax(&board, 3, -INFINITY, INFINITY, true, &mut tree, root);
        assert!(tree[root].is_leaf());
        assert_eq!(tree[root].value, crate::tree::UNSCORED);
        assert_eq!(iterative_deepening(&mut tree, &cancel), None);
    }

    #[test]
    fn test_reply_token_cancellation() {
        let foreground = CancelToken::new();
        let first = foreground.for_reply(0);
        let second = foreground.for_reply(1);
        assert!(!first.is_cancelled());

        foreground.opponent_moved(Some(1));
        assert!(first.is_cancelled());
        assert!(!second.is_cancelled());
        assert!(!foreground.is_cancelled());

        foreground.abort();
        assert!(second.is_cancelled());
        assert!(foreground.is_cancelled());
    }

    #[test]
    fn test_search_without_moves_returns_null() {
        let stalemate = Board::from_fen("7k/5Q2/6K1/8/8/8/8/8 b - - 0 1").unwrap();
        let mut tree = Tree::new(stalemate, 2);
        let mut session = SearchSession::new();
        assert!(session.search(&mut tree, &CancelToken::new()).is_null());
    }

    #[test]
    fn test_calculate_line() {
        let line = calculate_line(&mate_in_one(), 1, &CancelToken::new());
        assert_eq!(line, vec![Move::from_algebraic("a1a8").unwrap()]);
    }
}
