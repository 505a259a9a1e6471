//! Arbor - Parallel Precomputation Module
//!
//! While the opponent thinks, every reply they could make is analysed in
//! advance. Each reply gets its own `Tree`, the trees are dealt round-robin
//! to a fixed set of worker threads, and each tree is only ever touched by
//! the worker that owns it. Workers hand their trees back when they finish.

use std::thread::{self, JoinHandle};
use std::time::Instant;

use tracing::{debug, error, info};

use crate::board::{Board, Move};
use crate::move_generator::MoveGenerator;
use crate::search::{iterative_deepening, CancelToken, SearchEngine, INFINITY};
use crate::tree::{Tree, TreeStatus};
use crate::types::*;

/// Trees a worker owned, tagged with their reply index
type WorkerResult = Vec<(usize, Tree)>;

/// Running analysis of every reply to a position
pub struct Precomputation {
    replies: Vec<Move>,
    cancel: CancelToken,
    workers: Vec<JoinHandle<WorkerResult>>,
}

/// Start analysing every reply `side` can make in `board`
///
/// Every legal reply is scored on its own at depth zero and the replies are
/// sorted so the likeliest are searched first. Each reply's tree is searched
/// `depth` plies deep from the position after that reply.
pub fn precompute(board: &Board, depth: u32, side: Color, thread_count: usize) -> Precomputation {
    let mut board = *board;
    board.white_to_move = side.is_white();

    // Expand every reply before scoring so none can be pruned away
    let mut ordering = Tree::new(board, 1);
    let root = ordering.root();
    let mut engine = SearchEngine::new(CancelToken::new());
    for reply in MoveGenerator::new().generate_legal_moves(&board) {
        let child = ordering.add_child(root, reply, !side.is_white());
        let after = board.apply_move(&reply);
        engine.minimax(&after, 0, -INFINITY, INFINITY, !side.is_white(), &mut ordering, child);
    }
    ordering.order_children(root);

    let replies: Vec<Move> = ordering[root]
        .children
        .iter()
        .map(|&child| ordering[child].mv)
        .collect();

    let thread_count = thread_count.clamp(1, replies.len().max(1));
    let mut buckets: Vec<WorkerResult> = (0..thread_count).map(|_| Vec::new()).collect();
    for (index, &reply) in replies.iter().enumerate() {
        let tree = Tree::after_move(board.apply_move(&reply), depth, reply);
        buckets[index % thread_count].push((index, tree));
    }

    info!(
        replies = replies.len(),
        workers = thread_count,
        depth,
        "precomputation started"
    );

    let cancel = CancelToken::new();
    let workers = buckets
        .into_iter()
        .enumerate()
        .map(|(worker_id, bucket)| {
            let cancel = cancel.clone();
            thread::spawn(move || run_worker(worker_id, bucket, &cancel))
        })
        .collect();

    Precomputation {
        replies,
        cancel,
        workers,
    }
}

/// Search each owned tree in turn, skipping those no longer relevant
fn run_worker(worker_id: usize, mut trees: WorkerResult, cancel: &CancelToken) -> WorkerResult {
    for (index, tree) in trees.iter_mut() {
        let token = cancel.for_reply(*index);
        if token.is_cancelled() {
            tree.status = TreeStatus::Cancelled;
            continue;
        }

        let started = Instant::now();
        tree.status = TreeStatus::InProgress;
        tree.status = match iterative_deepening(tree, &token) {
            Some(_) => TreeStatus::Complete,
            None => TreeStatus::Cancelled,
        };
        debug!(
            worker_id,
            reply = %tree[tree.root()].mv,
            status = ?tree.status,
            nodes = tree.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "reply analysed"
        );
    }
    trees
}

impl Precomputation {
    /// Replies being analysed, likeliest first
    pub fn replies(&self) -> &[Move] {
        &self.replies
    }

    /// Tell the workers which reply was played; they abandon the others
    pub fn opponent_moved(&self, mv: Move) {
        let index = self.replies.iter().position(|&reply| reply == mv);
        debug!(mv = %mv, index, "opponent moved");
        self.cancel.opponent_moved(index);
    }

    /// Stop all workers as soon as they next poll
    pub fn abort(&self) {
        self.cancel.abort();
    }

    /// Wait for every worker and collect the trees in reply order
    pub fn join(mut self) -> Vec<Tree> {
        let mut results: WorkerResult = Vec::with_capacity(self.replies.len());
        for handle in std::mem::take(&mut self.workers) {
            match handle.join() {
                Ok(trees) => results.extend(trees),
                Err(_) => error!("precomputation worker panicked"),
            }
        }
        results.sort_by_key(|(index, _)| *index);
        results.into_iter().map(|(_, tree)| tree).collect()
    }

    /// Report the played reply, wait for the workers and keep only its tree
    ///
    /// The tree is returned whatever its status; callers should check for
    /// `TreeStatus::Complete` before trusting its analysis.
    pub fn take_reply(self, mv: Move) -> Option<Tree> {
        self.opponent_moved(mv);
        self.join()
            .into_iter()
            .find(|tree| tree[tree.root()].mv == mv)
    }
}

impl Drop for Precomputation {
    fn drop(&mut self) {
        // Workers still running are told to stop; their trees are discarded
        self.cancel.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_one_tree_per_reply() {
        let board = Board::new();
        let pre = precompute(&board, 1, Color::White, 3);
        let mut replies = pre.replies().to_vec();
        let trees = pre.join();

        assert_eq!(trees.len(), 20);
        for (tree, reply) in trees.iter().zip(replies.iter()) {
            assert_eq!(tree[tree.root()].mv, *reply);
            assert_eq!(tree.status, TreeStatus::Complete);
            assert!(!tree.board.white_to_move);
            assert!(!tree.best_move(tree.root()).is_null());
        }

        let mut legal = MoveGenerator::new().generate_legal_moves(&board);
        let key = |mv: &Move| (mv.from_sq, mv.to_sq, mv.promotion);
        replies.sort_by_key(key);
        legal.sort_by_key(key);
        assert_eq!(replies, legal);
    }

    #[test]
    fn test_mating_reply_keeps_every_other_reply() {
        // Ra8 mates at once; the quieter rook and king moves still get trees
        let board = Board::from_fen("6k1/5ppp/8/8/8/8/8/R5K1 w - - 0 1").unwrap();
        let mut legal = MoveGenerator::new().generate_legal_moves(&board);
        let pre = precompute(&board, 1, Color::White, 2);
        let mut replies = pre.replies().to_vec();
        assert_eq!(replies[0], Move::from_algebraic("a1a8").unwrap());

        let trees = pre.join();
        assert_eq!(trees.len(), legal.len());
        assert!(trees.iter().all(|t| t.status == TreeStatus::Complete));

        let key = |mv: &Move| (mv.from_sq, mv.to_sq, mv.promotion);
        replies.sort_by_key(key);
        legal.sort_by_key(key);
        assert_eq!(replies, legal);
    }

    #[test]
    fn test_opponent_move_cancels_other_replies() {
        let board = Board::new();
        let pre = precompute(&board, 3, Color::White, 1);
        let replies = pre.replies().to_vec();
        let played = *replies.last().unwrap();
        pre.opponent_moved(played);
        let trees = pre.join();

        assert_eq!(trees.len(), replies.len());
        let (others, last) = trees.split_at(trees.len() - 1);
        assert_eq!(last[0][last[0].root()].mv, played);
        assert_eq!(last[0].status, TreeStatus::Complete);
        assert!(!last[0].best_move(last[0].root()).is_null());

        // One worker walks the replies in order, so the ones it had not
        // reached when the move arrived are never searched
        assert!(others
            .iter()
            .all(|t| matches!(t.status, TreeStatus::Complete | TreeStatus::Cancelled)));
        assert_eq!(others.last().map(|t| t.status), Some(TreeStatus::Cancelled));
        let untouched = others.last().unwrap();
        assert!(untouched[untouched.root()].is_leaf());
    }

    #[test]
    fn test_replies_are_ordered_for_the_mover() {
        // Black can take a free queen
        let board = Board::from_fen("4k3/8/8/3q4/8/8/3Q4/4K3 b - - 0 1").unwrap();
        let pre = precompute(&board, 1, Color::Black, 2);
        assert_eq!(pre.replies()[0], Move::from_algebraic("d5d2").unwrap());
        pre.abort();
        pre.join();
    }

    #[test]
    fn test_aborted_trees_are_not_complete() {
        let board = Board::new();
        let pre = precompute(&board, 3, Color::White, 2);
        pre.abort();
        let trees = pre.join();
        assert_eq!(trees.len(), 20);
        assert!(trees.iter().all(|t| t.status != TreeStatus::Pending));
        assert!(trees.iter().any(|t| t.status == TreeStatus::Cancelled));
    }

    #[test]
    fn test_take_reply_keeps_played_tree() {
        let board = Board::new();
        let pre = precompute(&board, 2, Color::White, 4);
        let played = Move::from_algebraic("e2e4").unwrap();
        let tree = pre.take_reply(played).unwrap();

        assert_eq!(tree[tree.root()].mv, played);
        assert_eq!(tree.status, TreeStatus::Complete);
        assert_eq!(tree.board, board.apply_move(&played));
        assert!(!tree.best_move(tree.root()).is_null());
    }

    #[test]
    fn test_unknown_reply_yields_nothing() {
        let board = Board::new();
        let pre = precompute(&board, 2, Color::White, 2);
        assert!(pre.take_reply(Move::from_algebraic("e2e5").unwrap()).is_none());
    }
}
