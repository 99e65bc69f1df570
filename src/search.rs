//! Round-by-round search driver.
//!
//! One round is selection, terminal check, expansion, rollout and
//! backpropagation against a scratch clone of the authoritative board. The
//! driver owns the tree, the configuration and an explicit seedable random
//! generator; a search runs rounds until its [`SearchBudget`] trips, checking
//! the budget only between rounds so a round always completes once started.

use std::time::{Duration, Instant};

use log::{debug, warn};
use rand::{Rng, SeedableRng};
use rand_xoshiro::Xoshiro256PlusPlus;
use thiserror::Error;

use crate::config::SearchConfig;
use crate::tree::SearchTree;
use crate::{Board, Move, Player};

/// Errors surfaced by the search layer.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SearchError {
    /// The tree named a move the board rejected: the cursor and the scratch
    /// position have drifted apart and the tree can no longer be trusted.
    #[error("tree and board desynchronized at ply {ply}: move {mv} rejected")]
    Desync { mv: Move, ply: usize },

    /// The search position admits no move at all.
    #[error("no legal move available in the search position")]
    NoMoves,

    /// The budget had neither a deadline nor a round cap.
    #[error("search budget has neither a deadline nor a round cap")]
    UnboundedBudget,

    /// The configuration failed validation.
    #[error("invalid search configuration: {0}")]
    Config(String),
}

/// Stop conditions for one search, checked between rounds only.
///
/// Either bound may be absent, but not both; whichever trips first ends the
/// search. The round cap substitutes for the wall clock in deterministic
/// tests.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SearchBudget {
    pub deadline: Option<Instant>,
    pub max_rounds: Option<u32>,
}

impl SearchBudget {
    /// Budget that expires `slice` from now.
    pub fn timed(slice: Duration) -> Self {
        SearchBudget {
            deadline: Some(Instant::now() + slice),
            max_rounds: None,
        }
    }

    /// Budget of exactly `n` rounds, independent of the clock.
    pub fn rounds(n: u32) -> Self {
        SearchBudget {
            deadline: None,
            max_rounds: Some(n),
        }
    }

    /// Adds a round cap to an existing budget.
    pub fn with_max_rounds(mut self, n: u32) -> Self {
        self.max_rounds = Some(n);
        self
    }

    fn is_unbounded(&self) -> bool {
        self.deadline.is_none() && self.max_rounds.is_none()
    }

    fn exhausted(&self, rounds_done: u32) -> bool {
        if let Some(cap) = self.max_rounds {
            if rounds_done >= cap {
                return true;
            }
        }
        if let Some(deadline) = self.deadline {
            if Instant::now() >= deadline {
                return true;
            }
        }
        false
    }
}

/// Summary of one completed search.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SearchStats {
    /// Rounds completed within the budget.
    pub rounds: u32,
    /// Live tree nodes after the search.
    pub nodes: usize,
    pub elapsed: Duration,
}

/// Runs search rounds against a rules collaborator.
///
/// The driver is single-threaded by design: it exclusively owns the tree and
/// a per-round scratch board, so rounds never observe partial updates and
/// stopping between rounds can never corrupt state.
pub struct SearchDriver {
    tree: SearchTree,
    rng: Xoshiro256PlusPlus,
    config: SearchConfig,
}

impl SearchDriver {
    /// Creates a driver with a fresh tree rooted at a position where
    /// `root_color` is to move.
    pub fn new(root_color: Player, config: SearchConfig) -> Result<Self, SearchError> {
        config.validate().map_err(SearchError::Config)?;
        let rng = match config.seed {
            Some(seed) => Xoshiro256PlusPlus::seed_from_u64(seed),
            None => Xoshiro256PlusPlus::from_entropy(),
        };
        let tree = SearchTree::new(root_color, config.exploration);
        Ok(SearchDriver { tree, rng, config })
    }

    pub fn tree(&self) -> &SearchTree {
        &self.tree
    }

    pub(crate) fn tree_mut(&mut self) -> &mut SearchTree {
        &mut self.tree
    }

    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    /// Runs rounds from `board` until the budget trips.
    ///
    /// The budget is consulted only between rounds: a deadline landing
    /// mid-round lets that round finish, trading a small overrun for never
    /// leaving a round half-applied.
    pub fn run_search<B: Board>(
        &mut self,
        board: &B,
        budget: SearchBudget,
    ) -> Result<SearchStats, SearchError> {
        if budget.is_unbounded() {
            return Err(SearchError::UnboundedBudget);
        }
        let start = Instant::now();
        let mut rounds = 0;
        while !budget.exhausted(rounds) {
            self.run_round(board)?;
            rounds += 1;
        }
        let stats = SearchStats {
            rounds,
            nodes: self.tree.len(),
            elapsed: start.elapsed(),
        };
        debug!(
            "search for {}: {} rounds, {} nodes, {:?}",
            self.tree.root_color(),
            stats.rounds,
            stats.nodes,
            stats.elapsed
        );
        Ok(stats)
    }

    /// One full selection / expansion / rollout / backpropagation round.
    pub fn run_round<B: Board>(&mut self, board: &B) -> Result<(), SearchError> {
        let mut scratch = board.clone();
        self.tree.reset_traversal();

        // --- Selection Phase ---
        // Descend by UCT until the cursor sits on a frontier node, mirroring
        // every chosen move onto the scratch board.
        while let Some(mv) = self.tree.uct_select_child() {
            let ply = self.tree.depth();
            if scratch.apply(mv).is_err() {
                return Err(SearchError::Desync { mv, ply });
            }
            if !self.tree.traverse(mv) {
                // The selector named this exact move a moment ago.
                return Err(SearchError::Desync { mv, ply });
            }
        }

        // --- Terminal Check / Expansion Phase ---
        let (winner, loser) = if scratch.is_over() {
            (scratch.winner(), scratch.loser())
        } else {
            let moves = scratch.legal_moves();
            if moves.is_empty() {
                // No continuation exists; take the collaborator's verdict
                // for the position as-is.
                (scratch.winner(), scratch.loser())
            } else {
                self.tree.expand_frontier(&moves);

                // --- Rollout Phase ---
                self.rollout(&mut scratch)?
            }
        };

        // --- Backpropagation Phase ---
        self.tree.backpropagate(winner, loser);
        Ok(())
    }

    /// Plays a random game from `scratch` to the end and reports
    /// (winner, loser).
    fn rollout<B: Board>(
        &mut self,
        scratch: &mut B,
    ) -> Result<(Option<Player>, Option<Player>), SearchError> {
        while !scratch.is_over() {
            let Some(mv) = self.sample_move(scratch) else {
                break;
            };
            if scratch.apply(mv).is_err() {
                return Err(SearchError::Desync {
                    mv,
                    ply: self.tree.depth(),
                });
            }
        }
        Ok((scratch.winner(), scratch.loser()))
    }

    /// One rollout draw: a uniformly random piece of the mover, a uniformly
    /// random movement template, a uniformly random repeat count, kept if
    /// the projected move is legal and resampled otherwise.
    ///
    /// This samples the legal-move set with a bias toward pieces with few
    /// moves; accepted behavior, not a defect. After `rollout_retry_limit`
    /// rejections it falls back to a uniform draw over the exact legal-move
    /// set; `None` means the position has no legal move at all.
    fn sample_move<B: Board>(&mut self, scratch: &B) -> Option<Move> {
        let mover = scratch.turn();
        let squares = scratch.piece_squares(mover);
        if !squares.is_empty() {
            for _ in 0..self.config.rollout_retry_limit {
                let from = squares[self.rng.gen_range(0..squares.len())];
                let templates = scratch.template_count(from);
                if templates == 0 {
                    continue;
                }
                let template = self.rng.gen_range(0..templates);
                let max_repeats = scratch.max_repeats(from, template);
                if max_repeats == 0 {
                    continue;
                }
                let repeats = self.rng.gen_range(1..=max_repeats);
                if let Some(to) = scratch.project(from, template, repeats) {
                    let mv = Move::new(from, to);
                    if scratch.is_legal(mv) {
                        return Some(mv);
                    }
                }
            }
        }
        let legal = scratch.legal_moves();
        if legal.is_empty() {
            return None;
        }
        warn!(
            "rollout sampling for {} fell back to the legal-move list ({} moves)",
            mover,
            legal.len()
        );
        Some(legal[self.rng.gen_range(0..legal.len())])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{IllegalMove, Square};

    /// Scripted collaborator: a fixed legal-move set, a ply cap that ends
    /// the game in a draw, and a switch that rejects everything to provoke
    /// desynchronization. No pieces, so rollouts use the uniform fallback.
    #[derive(Clone)]
    struct ScriptBoard {
        turn: Player,
        plies: u32,
        cap: u32,
        moves: Vec<Move>,
        reject: bool,
        history: Vec<Move>,
    }

    impl ScriptBoard {
        fn new(cap: u32, moves: Vec<Move>) -> Self {
            ScriptBoard {
                turn: Player::Blue,
                plies: 0,
                cap,
                moves,
                reject: false,
                history: Vec::new(),
            }
        }
    }

    impl Board for ScriptBoard {
        fn turn(&self) -> Player {
            self.turn
        }

        fn is_legal(&self, mv: Move) -> bool {
            !self.reject && self.moves.contains(&mv)
        }

        fn apply(&mut self, mv: Move) -> Result<(), IllegalMove> {
            if !self.is_legal(mv) {
                return Err(IllegalMove { mv });
            }
            self.plies += 1;
            self.turn = self.turn.next();
            self.history.push(mv);
            Ok(())
        }

        fn is_over(&self) -> bool {
            self.plies >= self.cap
        }

        fn winner(&self) -> Option<Player> {
            None
        }

        fn loser(&self) -> Option<Player> {
            None
        }

        fn legal_moves(&self) -> Vec<Move> {
            if self.is_over() {
                Vec::new()
            } else {
                self.moves.clone()
            }
        }

        fn piece_squares(&self, _player: Player) -> Vec<Square> {
            Vec::new()
        }

        fn template_count(&self, _square: Square) -> usize {
            0
        }

        fn max_repeats(&self, _square: Square, _template: usize) -> u32 {
            0
        }

        fn project(&self, _from: Square, _template: usize, _repeats: u32) -> Option<Square> {
            None
        }

        fn time_remaining(&self, _player: Player) -> Duration {
            Duration::from_secs(60)
        }

        fn history(&self) -> &[Move] {
            &self.history
        }
    }

    fn mv(from: u8, to: u8) -> Move {
        Move::new(Square(from), Square(to))
    }

    fn driver() -> SearchDriver {
        SearchDriver::new(Player::Blue, SearchConfig::default().with_seed(7)).unwrap()
    }

    #[test]
    fn first_round_expands_the_root_with_every_legal_move() {
        let board = ScriptBoard::new(6, vec![mv(0, 1), mv(0, 2)]);
        let mut driver = driver();
        driver.run_round(&board).unwrap();
        let tree = driver.tree();
        assert_eq!(tree.children(tree.root()).len(), 2);
        assert_eq!(tree.visits(tree.root()), 0);
        assert_eq!(tree.root_rounds(), 1);
    }

    #[test]
    fn round_cap_budget_runs_exactly_that_many_rounds() {
        let board = ScriptBoard::new(6, vec![mv(0, 1), mv(0, 2)]);
        let mut driver = driver();
        let stats = driver.run_search(&board, SearchBudget::rounds(5)).unwrap();
        assert_eq!(stats.rounds, 5);
        assert_eq!(stats.nodes, driver.tree().len());
        // Root statistics stay frozen no matter how many rounds ran.
        assert_eq!(driver.tree().visits(driver.tree().root()), 0);
        assert_eq!(driver.tree().reward_sum(driver.tree().root()), 0.0);
    }

    #[test]
    fn an_expired_deadline_runs_no_rounds() {
        let board = ScriptBoard::new(6, vec![mv(0, 1)]);
        let mut driver = driver();
        let budget = SearchBudget {
            deadline: Some(Instant::now() - Duration::from_millis(5)),
            max_rounds: None,
        };
        let stats = driver.run_search(&board, budget).unwrap();
        assert_eq!(stats.rounds, 0);
        assert_eq!(driver.tree().len(), 1);
    }

    #[test]
    fn an_unbounded_budget_is_rejected() {
        let board = ScriptBoard::new(6, vec![mv(0, 1)]);
        let mut driver = driver();
        let err = driver
            .run_search(&board, SearchBudget::default())
            .unwrap_err();
        assert_eq!(err, SearchError::UnboundedBudget);
    }

    #[test]
    fn a_board_rejecting_a_tree_move_is_a_fatal_desync() {
        let board = ScriptBoard::new(6, vec![mv(0, 1)]);
        let mut driver = driver();
        driver.run_round(&board).unwrap();

        let mut rigged = board.clone();
        rigged.reject = true;
        let err = driver.run_round(&rigged).unwrap_err();
        assert_eq!(
            err,
            SearchError::Desync {
                mv: mv(0, 1),
                ply: 0
            }
        );
    }

    #[test]
    fn a_terminal_start_backpropagates_without_expanding() {
        let board = ScriptBoard::new(0, vec![mv(0, 1)]);
        let mut driver = driver();
        driver.run_round(&board).unwrap();
        let tree = driver.tree();
        assert_eq!(tree.len(), 1);
        assert_eq!(tree.root_rounds(), 1);
    }

    #[test]
    fn seeded_drivers_grow_identical_trees() {
        let board = ScriptBoard::new(6, vec![mv(0, 1), mv(0, 2), mv(0, 3)]);
        let run = || {
            let mut driver =
                SearchDriver::new(Player::Blue, SearchConfig::default().with_seed(99)).unwrap();
            driver.run_search(&board, SearchBudget::rounds(40)).unwrap();
            let tree = driver.tree();
            let mut shape: Vec<(Option<Move>, u32, f64)> = Vec::new();
            let mut stack = vec![tree.root()];
            while let Some(id) = stack.pop() {
                shape.push((tree.node_move(id), tree.visits(id), tree.reward_sum(id)));
                stack.extend(tree.children(id).iter().copied());
            }
            (shape, tree.select_move())
        };
        assert_eq!(run(), run());
    }
}
