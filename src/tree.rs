//! Arena-backed search tree.
//!
//! Nodes live in a flat `Vec` and point at each other through [`NodeId`]
//! indices, so the parent/child graph has no ownership cycles and pruning is
//! a bulk copy of the surviving subtree rather than a reference-counted
//! teardown. The tree also carries a traversal cursor (node + depth) that the
//! search driver keeps in lockstep with its scratch board.

use std::collections::VecDeque;

use crate::{Move, Player};

/// Index of a node in the tree's arena.
///
/// Ids are only meaningful for the tree that issued them and are invalidated
/// wholesale by [`SearchTree::prune_and_reroot`], which compacts the arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(u32);

impl NodeId {
    fn index(self) -> usize {
        self.0 as usize
    }
}

/// One explored tree vertex: the position reached by playing `mv` from the
/// parent's position.
#[derive(Debug, Clone)]
struct Node {
    parent: Option<NodeId>,
    /// The move that produced this node. `None` only for the root.
    mv: Option<Move>,
    /// Child ids in insertion order; this order pins tie-breaking.
    children: Vec<NodeId>,
    visits: u32,
    reward_sum: f64,
    /// UCT score, valid only while the parent visit count that produced it
    /// is current. Meaningless while `visits == 0`.
    cached_uct: f64,
}

impl Node {
    fn new(parent: Option<NodeId>, mv: Option<Move>) -> Self {
        Node {
            parent,
            mv,
            children: Vec::new(),
            visits: 0,
            reward_sum: 0.0,
            cached_uct: 0.0,
        }
    }
}

/// UCT score of a visited child given the parent's current visit count.
fn uct_score(reward_sum: f64, visits: u32, parent_visits: u32, exploration: f64) -> f64 {
    let v = visits as f64;
    reward_sum / v + exploration * ((parent_visits as f64).ln() / v).sqrt()
}

/// The search tree over game continuations from one root position.
///
/// The root's own `visits`/`reward_sum` stay zero for its entire lifetime:
/// the root has no incoming move, so there is no mover to credit. The count
/// its children need as the UCT parent term is kept separately in
/// `root_rounds`, incremented once per completed backpropagation.
#[derive(Debug, Clone)]
pub struct SearchTree {
    nodes: Vec<Node>,
    root: NodeId,
    cursor: NodeId,
    /// Cursor distance from the root, in plies.
    depth: usize,
    /// The color to move in the root position.
    root_color: Player,
    /// Completed backpropagations; parent term for scoring root children.
    root_rounds: u32,
    exploration: f64,
}

impl SearchTree {
    /// Creates a tree holding only a root for the position where
    /// `root_color` is to move.
    pub fn new(root_color: Player, exploration: f64) -> Self {
        let root = NodeId(0);
        SearchTree {
            nodes: vec![Node::new(None, None)],
            root,
            cursor: root,
            depth: 0,
            root_color,
            root_rounds: 0,
            exploration,
        }
    }

    // --- Cursor traversal ---

    /// Moves the cursor back to the root, depth 0.
    pub fn reset_traversal(&mut self) {
        self.cursor = self.root;
        self.depth = 0;
    }

    /// Descends the cursor along the child keyed by `mv`.
    ///
    /// Returns false and leaves the cursor untouched if no such child exists.
    pub fn traverse(&mut self, mv: Move) -> bool {
        match self.child_by_move(self.cursor, mv) {
            Some(child) => {
                self.cursor = child;
                self.depth += 1;
                true
            }
            None => false,
        }
    }

    /// Descends along a whole move sequence, stopping at the first miss.
    ///
    /// Earlier successful steps persist; returns true only if every move
    /// matched a child.
    pub fn traverse_all(&mut self, moves: &[Move]) -> bool {
        for &mv in moves {
            if !self.traverse(mv) {
                return false;
            }
        }
        true
    }

    /// Moves the cursor up `n` edges toward the root.
    ///
    /// Fails as a no-op if that would pass above the root; on success the
    /// depth drops by exactly `n`.
    pub fn traverse_back(&mut self, n: usize) -> bool {
        if n > self.depth {
            return false;
        }
        for _ in 0..n {
            // Depth > 0 here, so a parent must exist.
            match self.nodes[self.cursor.index()].parent {
                Some(parent) => {
                    self.cursor = parent;
                    self.depth -= 1;
                }
                None => return false,
            }
        }
        true
    }

    // --- Growth ---

    /// Expands the frontier node under the cursor with one zero-statistics
    /// child per legal move.
    ///
    /// The cursor must sit on a node with no children; afterwards the child
    /// move set equals `moves` and every new child has `visits == 0`.
    pub fn expand_frontier(&mut self, moves: &[Move]) {
        debug_assert!(
            self.nodes[self.cursor.index()].children.is_empty(),
            "expansion requires a frontier node"
        );
        for &mv in moves {
            self.add_child(self.cursor, mv);
        }
    }

    fn add_child(&mut self, parent: NodeId, mv: Move) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(Node::new(Some(parent), Some(mv)));
        self.nodes[parent.index()].children.push(id);
        id
    }

    // --- Selection and statistics ---

    /// Picks the cursor node's child with the best UCT score and returns its
    /// move, or `None` on a childless node.
    ///
    /// A never-visited child always wins over any visited one; among those,
    /// and among equal numeric scores, the first in insertion order wins.
    pub fn uct_select_child(&self) -> Option<Move> {
        let node = &self.nodes[self.cursor.index()];
        let mut best: Option<(NodeId, f64)> = None;
        for &child_id in &node.children {
            let child = &self.nodes[child_id.index()];
            if child.visits == 0 {
                // Not-yet-visited sentinel, checked before any numeric
                // comparison so no finite score can overtake it.
                return child.mv;
            }
            match best {
                Some((_, score)) if child.cached_uct <= score => {}
                _ => best = Some((child_id, child.cached_uct)),
            }
        }
        best.and_then(|(id, _)| self.nodes[id.index()].mv)
    }

    /// Credits one rollout outcome to a single node: `visits += 1`,
    /// `reward_sum += value`, then refreshes the cached UCT score of every
    /// *child* (their scores use this node's visit count as the parent
    /// term). Siblings are untouched.
    ///
    /// `value` is 1 for a win by the node's mover, 0 for a loss, 0.5
    /// otherwise. The root is never credited (its statistics stay zero);
    /// [`Self::backpropagate`] stops short of it.
    pub fn record_outcome(&mut self, id: NodeId, value: f64) {
        debug_assert!(id != self.root, "the root's statistics stay zero");
        let parent_visits = {
            let node = &mut self.nodes[id.index()];
            node.visits += 1;
            node.reward_sum += value;
            node.visits
        };
        self.refresh_children(id, parent_visits);
    }

    fn refresh_children(&mut self, id: NodeId, parent_visits: u32) {
        let exploration = self.exploration;
        for i in 0..self.nodes[id.index()].children.len() {
            let child_id = self.nodes[id.index()].children[i];
            let child = &mut self.nodes[child_id.index()];
            if child.visits > 0 {
                child.cached_uct =
                    uct_score(child.reward_sum, child.visits, parent_visits, exploration);
            }
        }
    }

    /// Walks from the cursor up to, but not including, the root, crediting
    /// each node with the outcome from its mover's point of view: 1 if the
    /// mover is `winner`, 0 if it is `loser`, 0.5 otherwise (draw or
    /// third-party player).
    ///
    /// The cursor is left where it was. Afterwards the round counter is
    /// bumped and the root children's cached scores are refreshed against it.
    pub fn backpropagate(&mut self, winner: Option<Player>, loser: Option<Player>) {
        let mut id = self.cursor;
        let mut depth = self.depth;
        while let Some(parent) = self.nodes[id.index()].parent {
            // The node at depth d was produced by the player to move at
            // depth d - 1.
            let mover = self.root_color.advanced(depth - 1);
            let value = if winner == Some(mover) {
                1.0
            } else if loser == Some(mover) {
                0.0
            } else {
                0.5
            };
            self.record_outcome(id, value);
            id = parent;
            depth -= 1;
        }
        self.root_rounds += 1;
        let rounds = self.root_rounds;
        self.refresh_children(self.root, rounds);
    }

    // --- Tree reuse across turns ---

    /// Advances the root along the moves actually played since the tree was
    /// last used, oldest first, then discards everything off that path.
    ///
    /// Observed moves with no matching child get a fresh zero-statistics
    /// node, so a partially or fully unexplored path is fine. The node
    /// reached last is promoted to root: its incoming move is cleared, its
    /// visit count seeds the round counter, and its own statistics are
    /// zeroed. The arena is compacted to the surviving subtree, invalidating
    /// all previously issued [`NodeId`]s. The root color advances by one ply
    /// per observed move.
    pub fn prune_and_reroot(&mut self, observed: &[Move]) {
        let mut cur = self.root;
        for &mv in observed {
            cur = match self.child_by_move(cur, mv) {
                Some(child) => child,
                None => self.add_child(cur, mv),
            };
        }

        // Copy the surviving subtree into a fresh arena, breadth-first so
        // sibling order (and therefore tie-breaking) is preserved.
        let mut survivors: Vec<Node> = Vec::new();
        let mut queue: VecDeque<(NodeId, Option<NodeId>)> = VecDeque::new();
        queue.push_back((cur, None));
        while let Some((old_id, new_parent)) = queue.pop_front() {
            let old = &self.nodes[old_id.index()];
            let new_id = NodeId(survivors.len() as u32);
            let mut copied = Node::new(new_parent, old.mv);
            copied.visits = old.visits;
            copied.reward_sum = old.reward_sum;
            copied.cached_uct = old.cached_uct;
            for &child in &old.children {
                queue.push_back((child, Some(new_id)));
            }
            survivors.push(copied);
            if let Some(parent) = new_parent {
                // Breadth-first order: the parent was pushed before any of
                // its children.
                survivors[parent.index()].children.push(new_id);
            }
        }

        self.nodes = survivors;
        self.root = NodeId(0);
        let promoted = &mut self.nodes[0];
        self.root_rounds = promoted.visits;
        promoted.mv = None;
        promoted.visits = 0;
        promoted.reward_sum = 0.0;
        promoted.cached_uct = 0.0;
        self.root_color = self.root_color.advanced(observed.len());
        self.reset_traversal();
    }

    /// The final move recommendation: the root child with the most visits,
    /// ties to the first in insertion order. Visit count, not win rate,
    /// because it is far less noisy under an exploration policy that
    /// deliberately samples low-confidence branches.
    pub fn select_move(&self) -> Option<Move> {
        let root = &self.nodes[self.root.index()];
        let mut best: Option<(NodeId, u32)> = None;
        for &child_id in &root.children {
            let visits = self.nodes[child_id.index()].visits;
            match best {
                Some((_, most)) if visits <= most => {}
                _ => best = Some((child_id, visits)),
            }
        }
        best.and_then(|(id, _)| self.nodes[id.index()].mv)
    }

    // --- Inspection ---

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn cursor(&self) -> NodeId {
        self.cursor
    }

    /// Cursor depth in plies from the root.
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Number of live nodes in the arena.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// The color to move in the root position.
    pub fn root_color(&self) -> Player {
        self.root_color
    }

    /// Completed backpropagations since the current root was installed.
    pub fn root_rounds(&self) -> u32 {
        self.root_rounds
    }

    pub fn visits(&self, id: NodeId) -> u32 {
        self.nodes[id.index()].visits
    }

    pub fn reward_sum(&self, id: NodeId) -> f64 {
        self.nodes[id.index()].reward_sum
    }

    /// The move that produced this node; `None` for the root.
    pub fn node_move(&self, id: NodeId) -> Option<Move> {
        self.nodes[id.index()].mv
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.index()].parent
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id.index()].children
    }

    /// The child of `id` keyed by `mv`, compared by move value.
    pub fn child_by_move(&self, id: NodeId, mv: Move) -> Option<NodeId> {
        self.nodes[id.index()]
            .children
            .iter()
            .copied()
            .find(|&child| self.nodes[child.index()].mv == Some(mv))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Square;

    fn mv(from: u8, to: u8) -> Move {
        Move::new(Square(from), Square(to))
    }

    fn three_child_tree() -> SearchTree {
        let mut tree = SearchTree::new(Player::Blue, std::f64::consts::SQRT_2);
        tree.expand_frontier(&[mv(0, 1), mv(0, 2), mv(0, 3)]);
        tree
    }

    #[test]
    fn traverse_moves_cursor_only_on_existing_children() {
        let mut tree = three_child_tree();
        assert!(!tree.traverse(mv(9, 9)));
        assert_eq!(tree.depth(), 0);
        assert!(tree.traverse(mv(0, 2)));
        assert_eq!(tree.depth(), 1);
        assert_eq!(tree.node_move(tree.cursor()), Some(mv(0, 2)));
    }

    #[test]
    fn traverse_all_stops_at_first_miss_but_keeps_progress() {
        let mut tree = three_child_tree();
        assert!(tree.traverse(mv(0, 1)));
        tree.expand_frontier(&[mv(1, 4)]);
        tree.reset_traversal();
        assert!(!tree.traverse_all(&[mv(0, 1), mv(9, 9)]));
        // The first step succeeded and persists.
        assert_eq!(tree.depth(), 1);
        assert_eq!(tree.node_move(tree.cursor()), Some(mv(0, 1)));
        tree.reset_traversal();
        assert!(tree.traverse_all(&[mv(0, 1), mv(1, 4)]));
        assert_eq!(tree.depth(), 2);
    }

    #[test]
    fn traverse_back_underflow_is_an_atomic_no_op() {
        let mut tree = three_child_tree();
        tree.traverse(mv(0, 1));
        assert!(!tree.traverse_back(2));
        assert_eq!(tree.depth(), 1);
        assert!(tree.traverse_back(1));
        assert_eq!(tree.depth(), 0);
        assert_eq!(tree.cursor(), tree.root());
    }

    #[test]
    fn expansion_creates_one_zero_stat_child_per_move() {
        let tree = three_child_tree();
        let children = tree.children(tree.root());
        assert_eq!(children.len(), 3);
        let moves: Vec<Move> = children
            .iter()
            .filter_map(|&c| tree.node_move(c))
            .collect();
        assert_eq!(moves, vec![mv(0, 1), mv(0, 2), mv(0, 3)]);
        for &c in children {
            assert_eq!(tree.visits(c), 0);
            assert_eq!(tree.parent(c), Some(tree.root()));
        }
    }

    #[test]
    fn unvisited_children_are_selected_before_any_visited_one() {
        let mut tree = three_child_tree();
        // Visit the first child once via a full round.
        tree.traverse(mv(0, 1));
        tree.backpropagate(Some(Player::Blue), Some(Player::Green));
        tree.reset_traversal();
        // The first *unvisited* child must win regardless of the first
        // child's perfect score.
        assert_eq!(tree.uct_select_child(), Some(mv(0, 2)));
    }

    #[test]
    fn uct_ties_resolve_to_the_first_child_in_insertion_order() {
        let mut tree = three_child_tree();
        for m in [mv(0, 1), mv(0, 2), mv(0, 3)] {
            tree.reset_traversal();
            tree.traverse(m);
            tree.backpropagate(Some(Player::Blue), Some(Player::Green));
        }
        tree.reset_traversal();
        // Identical statistics everywhere, so scores tie exactly.
        assert_eq!(tree.uct_select_child(), Some(mv(0, 1)));
    }

    #[test]
    fn uct_select_child_on_a_frontier_returns_none() {
        let tree = SearchTree::new(Player::Red, std::f64::consts::SQRT_2);
        assert_eq!(tree.uct_select_child(), None);
    }

    #[test]
    fn exploitation_prefers_the_higher_reward_child_at_equal_visits() {
        let mut tree = three_child_tree();
        // First child: one loss. Second: one win. Third: one draw.
        for (m, outcome) in [
            (mv(0, 1), (Some(Player::Green), Some(Player::Blue))),
            (mv(0, 2), (Some(Player::Blue), Some(Player::Green))),
            (mv(0, 3), (None, None)),
        ] {
            tree.reset_traversal();
            tree.traverse(m);
            tree.backpropagate(outcome.0, outcome.1);
        }
        tree.reset_traversal();
        assert_eq!(tree.uct_select_child(), Some(mv(0, 2)));
    }

    #[test]
    fn backpropagation_stops_strictly_below_the_root() {
        let mut tree = three_child_tree();
        tree.traverse(mv(0, 1));
        tree.expand_frontier(&[mv(1, 5)]);
        tree.traverse(mv(1, 5));
        tree.backpropagate(Some(Player::Blue), Some(Player::Green));

        assert_eq!(tree.visits(tree.root()), 0);
        assert_eq!(tree.reward_sum(tree.root()), 0.0);
        assert_eq!(tree.root_rounds(), 1);

        let first = tree.child_by_move(tree.root(), mv(0, 1)).unwrap();
        let leaf = tree.child_by_move(first, mv(1, 5)).unwrap();
        // Depth 1 credits Blue (mover at depth 0), depth 2 credits Green.
        assert_eq!(tree.visits(first), 1);
        assert_eq!(tree.reward_sum(first), 1.0);
        assert_eq!(tree.visits(leaf), 1);
        assert_eq!(tree.reward_sum(leaf), 0.0);
        // Siblings off the path are untouched.
        let sibling = tree.child_by_move(tree.root(), mv(0, 2)).unwrap();
        assert_eq!(tree.visits(sibling), 0);
    }

    #[test]
    fn third_party_outcomes_credit_half_a_point() {
        let mut tree = three_child_tree();
        tree.traverse(mv(0, 1));
        // Blue moved at depth 0; Green beats Red, so Blue gets 0.5.
        tree.backpropagate(Some(Player::Green), Some(Player::Red));
        let first = tree.child_by_move(tree.root(), mv(0, 1)).unwrap();
        assert_eq!(tree.reward_sum(first), 0.5);
    }

    #[test]
    fn reroot_promotes_the_observed_child_and_drops_the_rest() {
        let mut tree = three_child_tree();
        // Give the second child a subtree with statistics.
        tree.traverse(mv(0, 2));
        tree.expand_frontier(&[mv(2, 6), mv(2, 7)]);
        tree.traverse(mv(2, 6));
        tree.backpropagate(Some(Player::Blue), Some(Player::Green));
        let nodes_before = tree.len();
        assert_eq!(nodes_before, 6);

        tree.prune_and_reroot(&[mv(0, 2)]);

        // Promoted root: move and statistics cleared, round counter seeded
        // from its old visit count.
        assert_eq!(tree.node_move(tree.root()), None);
        assert_eq!(tree.visits(tree.root()), 0);
        assert_eq!(tree.reward_sum(tree.root()), 0.0);
        assert_eq!(tree.root_rounds(), 1);
        assert_eq!(tree.root_color(), Player::Green);
        // Only the surviving subtree remains: root + 2 children.
        assert_eq!(tree.len(), 3);
        let kept = tree.child_by_move(tree.root(), mv(2, 6)).unwrap();
        assert_eq!(tree.visits(kept), 1);
        assert_eq!(tree.reward_sum(kept), 0.0);
        assert!(tree.child_by_move(tree.root(), mv(2, 7)).is_some());
        assert!(tree.child_by_move(tree.root(), mv(0, 1)).is_none());
    }

    #[test]
    fn reroot_creates_fresh_nodes_for_unexplored_observed_moves() {
        let mut tree = three_child_tree();
        tree.prune_and_reroot(&[mv(0, 1), mv(7, 8), mv(8, 9)]);
        assert_eq!(tree.len(), 1);
        assert_eq!(tree.visits(tree.root()), 0);
        assert_eq!(tree.root_rounds(), 0);
        // Three plies later the same color is back on the move.
        assert_eq!(tree.root_color(), Player::Blue);
        assert_eq!(tree.depth(), 0);
    }

    #[test]
    fn select_move_picks_the_most_visited_child() {
        let mut tree = three_child_tree();
        // Two rounds through the third child, one through the first.
        for m in [mv(0, 3), mv(0, 3), mv(0, 1)] {
            tree.reset_traversal();
            tree.traverse(m);
            tree.backpropagate(Some(Player::Green), Some(Player::Blue));
        }
        assert_eq!(tree.select_move(), Some(mv(0, 3)));
    }

    #[test]
    fn select_move_on_an_unexpanded_root_returns_none() {
        let tree = SearchTree::new(Player::Blue, std::f64::consts::SQRT_2);
        assert_eq!(tree.select_move(), None);
    }
}
