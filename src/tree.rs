//! Arbor - Search Tree Module
//!
//! A persistent tree of explored positions kept between searches. Nodes live
//! in an arena and refer to each other by index; a freed node's slot is put
//! on a free list and handed out again by the next allocation.

use crate::board::{Board, Move};
use std::cmp::Reverse;
use std::ops::{Index, IndexMut};

/// Stable index of a node inside its tree's arena
pub type NodeId = usize;

/// Value a node carries before any search has scored it. Lies outside the
/// score range, whose extremes are the mate scores `±i32::MAX`.
pub const UNSCORED: i32 = i32::MIN;

/// One explored position
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Node {
    /// Navigation only; freeing a node never touches its parent's subtree
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
    /// Index into `children` of the child currently considered best
    pub best_child: Option<usize>,
    /// Move that produced this position from the parent
    pub mv: Move,
    /// Evaluation from white's point of view
    pub value: i32,
    /// Side to move in this position
    pub white_to_move: bool,
}

impl Node {
    fn new(parent: Option<NodeId>, mv: Move, white_to_move: bool) -> Self {
        Node {
            parent,
            children: Vec::new(),
            best_child: None,
            mv,
            value: UNSCORED,
            white_to_move,
        }
    }

    #[inline]
    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }
}

/// Progress of a tree handed to a precomputation worker
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TreeStatus {
    Pending,
    InProgress,
    Complete,
    Cancelled,
}

/// A root position, the nodes explored below it and the depth to search
#[derive(Clone, Debug)]
pub struct Tree {
    nodes: Vec<Option<Node>>,
    free_slots: Vec<NodeId>,
    root: NodeId,
    /// Position at the root
    pub board: Board,
    /// Maximum search depth in plies
    pub depth: u32,
    pub status: TreeStatus,
}

impl Tree {
    /// Tree holding only a root for `board`
    pub fn new(board: Board, depth: u32) -> Self {
        Tree {
            nodes: vec![Some(Node::new(None, Move::null(), board.white_to_move))],
            free_slots: Vec::new(),
            root: 0,
            board,
            depth,
            status: TreeStatus::Pending,
        }
    }

    /// Tree whose root records the move that led to `board`
    pub fn after_move(board: Board, depth: u32, last_move: Move) -> Self {
        let mut tree = Tree::new(board, depth);
        let root = tree.root;
        tree[root].mv = last_move;
        tree
    }

    #[inline]
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Node by id, `None` once it has been freed
    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id).and_then(Option::as_ref)
    }

    /// Number of live nodes
    pub fn len(&self) -> usize {
        self.nodes.len() - self.free_slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Allocate a child of `parent` reached by `mv`
    ///
    /// The first child of a node becomes its best child until a search
    /// says otherwise.
    pub fn add_child(&mut self, parent: NodeId, mv: Move, white_to_move: bool) -> NodeId {
        let node = Node::new(Some(parent), mv, white_to_move);
        let id = match self.free_slots.pop() {
            Some(slot) => {
                self.nodes[slot] = Some(node);
                slot
            }
            None => {
                self.nodes.push(Some(node));
                self.nodes.len() - 1
            }
        };

        let parent_node = &mut self[parent];
        parent_node.children.push(id);
        if parent_node.best_child.is_none() {
            parent_node.best_child = Some(0);
        }
        id
    }

    /// Stable sort of a node's children by value in the direction the side
    /// to move optimizes, unscored children last; the best child keeps
    /// pointing at the same node
    pub fn order_children(&mut self, id: NodeId) {
        let best = self.best_child(id);
        let mut ranked: Vec<(NodeId, i32)> = self[id]
            .children
            .iter()
            .map(|&c| (c, self[c].value))
            .collect();

        if self[id].white_to_move {
            ranked.sort_by_key(|&(_, value)| (value == UNSCORED, Reverse(value)));
        } else {
            ranked.sort_by_key(|&(_, value)| (value == UNSCORED, value));
        }

        let children: Vec<NodeId> = ranked.into_iter().map(|(c, _)| c).collect();
        let node = &mut self[id];
        node.best_child = best.and_then(|b| children.iter().position(|&c| c == b));
        node.children = children;
    }

    /// Id of the best child, if the node has children
    pub fn best_child(&self, id: NodeId) -> Option<NodeId> {
        let node = &self[id];
        node.best_child.and_then(|i| node.children.get(i).copied())
    }

    /// Move of the best child, or the null move for a leaf
    pub fn best_move(&self, id: NodeId) -> Move {
        self.best_child(id).map_or_else(Move::null, |child| self[child].mv)
    }

    /// Child reached by `mv`
    pub fn child_with_move(&self, id: NodeId, mv: Move) -> Option<NodeId> {
        self[id].children.iter().copied().find(|&c| self[c].mv == mv)
    }

    /// Moves along the best-child chain starting below `id`
    pub fn best_line(&self, id: NodeId) -> Vec<Move> {
        let mut line = Vec::new();
        let mut current = id;
        while let Some(child) = self.best_child(current) {
            line.push(self[child].mv);
            current = child;
        }
        line
    }

    /// Distance from the root
    pub fn node_depth(&self, id: NodeId) -> usize {
        let mut depth = 0;
        let mut current = id;
        while let Some(parent) = self[current].parent {
            depth += 1;
            current = parent;
        }
        depth
    }

    /// Position at a node, replayed from the root board
    pub fn board_at(&self, id: NodeId) -> Board {
        let mut path = Vec::new();
        let mut current = id;
        while let Some(parent) = self[current].parent {
            path.push(self[current].mv);
            current = parent;
        }
        path.iter()
            .rev()
            .fold(self.board, |board, mv| board.apply_move(mv))
    }

    /// Every node under `id` (itself included) accepted by `predicate`,
    /// parents before children
    pub fn traverse<F>(&self, id: NodeId, predicate: &F) -> Vec<NodeId>
    where
        F: Fn(&Node) -> bool,
    {
        let mut found = Vec::new();
        if predicate(&self[id]) {
            found.push(id);
        }
        for &child in &self[id].children {
            found.extend(self.traverse(child, predicate));
        }
        found
    }

    pub fn leaves(&self, id: NodeId) -> Vec<NodeId> {
        self.traverse(id, &Node::is_leaf)
    }

    pub fn subtree(&self, id: NodeId) -> Vec<NodeId> {
        self.traverse(id, &|_: &Node| true)
    }

    /// Independent tree rooted at a copy of `id`, with no parent link
    ///
    /// The copy keeps the node's move, so a copied reply still records
    /// how its position was reached.
    pub fn deep_copy(&self, id: NodeId) -> Tree {
        let source = &self[id];
        let mut root = Node::new(None, source.mv, source.white_to_move);
        root.value = source.value;

        let mut copy = Tree {
            nodes: vec![Some(root)],
            free_slots: Vec::new(),
            root: 0,
            board: self.board_at(id),
            depth: self.depth,
            status: TreeStatus::Pending,
        };
        self.copy_children(id, &mut copy, 0);
        copy[0].best_child = source.best_child;
        copy
    }

    fn copy_children(&self, from: NodeId, dest: &mut Tree, dest_parent: NodeId) {
        for &child in &self[from].children {
            let source = &self[child];
            let copied = dest.add_child(dest_parent, source.mv, source.white_to_move);
            dest[copied].value = source.value;
            self.copy_children(child, dest, copied);
            dest[copied].best_child = source.best_child;
        }
    }

    /// Release `id` and everything below it, returning the number of nodes
    /// freed
    ///
    /// The parent loses exactly one child. Freeing the root keeps the root
    /// itself and releases only its children. Freeing an already free slot
    /// does nothing.
    pub fn free(&mut self, id: NodeId) -> usize {
        if self.get(id).is_none() {
            return 0;
        }

        if id == self.root {
            let children = std::mem::take(&mut self[id].children);
            self[id].best_child = None;
            return children.into_iter().map(|c| self.release(c)).sum();
        }

        let parent = self[id].parent;
        let freed = self.release(id);

        if let Some(parent) = parent {
            let node = &mut self[parent];
            if let Some(pos) = node.children.iter().position(|&c| c == id) {
                node.children.remove(pos);
                node.best_child = match node.best_child {
                    _ if node.children.is_empty() => None,
                    Some(best) if best == pos => Some(0),
                    Some(best) if best > pos => Some(best - 1),
                    other => other,
                };
            }
        }
        freed
    }

    /// Drop a subtree without touching its parent
    fn release(&mut self, id: NodeId) -> usize {
        let Some(node) = self.nodes.get_mut(id).and_then(Option::take) else {
            return 0;
        };
        self.free_slots.push(id);
        1 + node
            .children
            .into_iter()
            .map(|child| self.release(child))
            .sum::<usize>()
    }

    /// Best line from the root in coordinate notation
    pub fn format_best_line(&self) -> String {
        self.best_line(self.root)
            .iter()
            .map(Move::to_string)
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl Index<NodeId> for Tree {
    type Output = Node;

    fn index(&self, id: NodeId) -> &Node {
        match self.nodes.get(id) {
            Some(Some(node)) => node,
            _ => panic!("node {id} is not live in this tree"),
        }
    }
}

impl IndexMut<NodeId> for Tree {
    fn index_mut(&mut self, id: NodeId) -> &mut Node {
        match self.nodes.get_mut(id) {
            Some(Some(node)) => node,
            _ => panic!("node {id} is not live in this tree"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::move_generator::MoveGenerator;

    /// Root with every legal reply, and every legal answer below the first two
    fn sample_tree() -> Tree {
        let generator = MoveGenerator::new();
        let mut tree = Tree::new(Board::new(), 2);
        let root = tree.root();
        for mv in generator.generate_legal_moves(&tree.board) {
            let child = tree.add_child(root, mv, false);
            tree[child].value = (mv.to_sq as i32) - 40;
        }
        for &child in tree[root].children.clone().iter().take(2) {
            let board = tree.board_at(child);
            for mv in generator.generate_legal_moves(&board) {
                tree.add_child(child, mv, true);
            }
        }
        tree
    }

    #[test]
    fn test_first_child_seeds_best() {
        let mut tree = Tree::new(Board::new(), 1);
        let root = tree.root();
        assert_eq!(tree.best_move(root), Move::null());

        let first = tree.add_child(root, Move::new(52, 36), false);
        tree.add_child(root, Move::new(51, 35), false);
        assert_eq!(tree[root].best_child, Some(0));
        assert_eq!(tree.best_child(root), Some(first));
        assert_eq!(tree.best_move(root), Move::new(52, 36));
    }

    #[test]
    fn test_order_children_follows_side_to_move() {
        let mut tree = Tree::new(Board::new(), 1);
        let root = tree.root();
        let values = [5, -3, 12, 5];
        let ids: Vec<NodeId> = values
            .iter()
            .enumerate()
            .map(|(i, &v)| {
                let id = tree.add_child(root, Move::new(48 + i, 40 + i), false);
                tree[id].value = v;
                id
            })
            .collect();
        tree[root].best_child = Some(2);

        tree.order_children(root);
        assert_eq!(tree[root].children, vec![ids[2], ids[0], ids[3], ids[1]]);
        assert_eq!(tree.best_child(root), Some(ids[2]));

        tree[root].white_to_move = false;
        tree.order_children(root);
        assert_eq!(tree[root].children, vec![ids[1], ids[0], ids[3], ids[2]]);
        assert_eq!(tree[root].best_child, Some(3));
        assert_eq!(tree.best_child(root), Some(ids[2]));
    }

    #[test]
    fn test_unscored_children_sort_last() {
        let mut tree = Tree::new(Board::new(), 1);
        let root = tree.root();
        let unscored = tree.add_child(root, Move::new(48, 40), false);
        let mated = tree.add_child(root, Move::new(49, 41), false);
        let level = tree.add_child(root, Move::new(50, 42), false);
        tree[mated].value = -i32::MAX;
        tree[level].value = 0;
        assert_ne!(tree[unscored].value, tree[mated].value);

        tree.order_children(root);
        assert_eq!(tree[root].children, vec![level, mated, unscored]);

        tree[root].white_to_move = false;
        tree.order_children(root);
        assert_eq!(tree[root].children, vec![mated, level, unscored]);
    }

    #[test]
    fn test_free_detaches_exactly_one_child() {
        let mut tree = sample_tree();
        let root = tree.root();
        let before = tree.len();
        let root_children = tree[root].children.len();
        let first = tree[root].children[0];
        let subtree_size = tree.subtree(first).len();

        let freed = tree.free(first);
        assert_eq!(freed, subtree_size);
        assert_eq!(tree.len(), before - subtree_size);
        assert_eq!(tree[root].children.len(), root_children - 1);
        assert!(tree.get(first).is_none());
        assert_eq!(tree.free(first), 0);
    }

    #[test]
    fn test_free_adjusts_best_child() {
        let mut tree = sample_tree();
        let root = tree.root();
        let children = tree[root].children.clone();
        tree[root].best_child = Some(3);

        tree.free(children[1]);
        assert_eq!(tree.best_child(root), Some(children[3]));
        tree.free(children[3]);
        assert_eq!(tree[root].best_child, Some(0));
    }

    #[test]
    fn test_free_root_releases_only_children() {
        let mut tree = sample_tree();
        let root = tree.root();
        let total = tree.len();

        assert_eq!(tree.free(root), total - 1);
        assert_eq!(tree.len(), 1);
        assert!(tree[root].is_leaf());
        assert_eq!(tree.best_move(root), Move::null());
    }

    #[test]
    fn test_slots_are_reused() {
        let mut tree = sample_tree();
        let root = tree.root();
        let first = tree[root].children[0];
        tree.free(first);
        let reused = tree.add_child(root, Move::new(52, 44), false);
        assert!(reused < tree.nodes.len());
        assert_eq!(tree[reused].parent, Some(root));
        assert!(tree[reused].is_leaf());
    }

    #[test]
    fn test_deep_copy_is_structurally_identical() {
        let tree = sample_tree();
        let copy = tree.deep_copy(tree.root());
        assert_eq!(copy.len(), tree.len());

        let original = tree.subtree(tree.root());
        let copied = copy.subtree(copy.root());
        assert_eq!(original.len(), copied.len());
        for (&a, &b) in original.iter().zip(copied.iter()) {
            assert_eq!(tree[a].children.len(), copy[b].children.len());
            assert_eq!(tree[a].mv, copy[b].mv);
            assert_eq!(tree[a].value, copy[b].value);
            assert_eq!(tree[a].best_child, copy[b].best_child);
        }
        assert_eq!(copy[copy.root()].parent, None);
    }

    #[test]
    fn test_deep_copy_of_inner_node() {
        let tree = sample_tree();
        let child = tree[tree.root()].children[0];
        let copy = tree.deep_copy(child);

        assert_eq!(copy.board, tree.board_at(child));
        assert_eq!(copy[copy.root()].mv, tree[child].mv);
        assert_eq!(copy.len(), tree.subtree(child).len());
        assert_eq!(copy.node_depth(copy.root()), 0);
    }

    #[test]
    fn test_traverse_and_depth() {
        let tree = sample_tree();
        let root = tree.root();
        let leaves = tree.leaves(root);
        // 18 unexpanded replies plus 20 answers under each of two replies
        assert_eq!(leaves.len(), 18 + 40);
        assert!(leaves.iter().all(|&id| tree[id].is_leaf()));
        assert_eq!(tree.subtree(root).len(), tree.len());

        let deepest = tree.traverse(root, &|node: &Node| node.white_to_move && node.parent.is_some());
        assert_eq!(deepest.len(), 40);
        assert!(deepest.iter().all(|&id| tree.node_depth(id) == 2));
    }

    #[test]
    fn test_best_line() {
        let mut tree = sample_tree();
        let root = tree.root();
        let reply = tree[root].children[1];
        tree[root].best_child = Some(1);
        tree[reply].best_child = Some(4);

        let line = tree.best_line(root);
        assert_eq!(line.len(), 2);
        assert_eq!(line[0], tree[reply].mv);
        assert_eq!(line[1], tree[tree[reply].children[4]].mv);
        assert_eq!(tree.format_best_line().split(' ').count(), 2);
    }
}
