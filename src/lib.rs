//! Monte Carlo Tree Search move selection for a three-player chess variant.
//!
//! The crate is organized around three pieces: [`SearchTree`] owns an arena of
//! explored continuations from the current position, [`SearchDriver`] runs
//! timed rounds of selection, expansion, rollout and backpropagation against a
//! scratch copy of the board, and [`MctsAgent`] wraps both behind the
//! one-call-per-turn surface a game harness expects.
//!
//! The rules engine itself is not part of this crate. It is consumed through
//! the [`Board`] trait, which covers legality, move application, terminal
//! detection, clocks and the piece/template structure the rollout policy
//! samples from. `games::skirmish` ships a small built-in implementation used
//! by the tests and the benchmark binary.

use std::fmt;
use std::time::Duration;

use thiserror::Error;

pub mod agent;
pub mod config;
pub mod games;
pub mod logging;
pub mod search;
pub mod tree;

pub use agent::MctsAgent;
pub use config::SearchConfig;
pub use search::{SearchBudget, SearchDriver, SearchError, SearchStats};
pub use tree::{NodeId, SearchTree};

/// One of the three players, in turn order.
///
/// Turn order is fixed: Blue moves first, then Green, then Red, then Blue
/// again. A node at depth `d` of the search tree is the position where
/// `root_color.advanced(d)` is to move.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Player {
    Blue,
    Green,
    Red,
}

impl Player {
    /// All players, in turn order.
    pub const ALL: [Player; 3] = [Player::Blue, Player::Green, Player::Red];

    /// Index of this player in turn order (Blue = 0, Green = 1, Red = 2).
    pub fn index(self) -> usize {
        match self {
            Player::Blue => 0,
            Player::Green => 1,
            Player::Red => 2,
        }
    }

    /// The player who moves next.
    pub fn next(self) -> Player {
        self.advanced(1)
    }

    /// The player to move `plies` plies after this one.
    pub fn advanced(self, plies: usize) -> Player {
        Player::ALL[(self.index() + plies) % Player::ALL.len()]
    }
}

impl fmt::Display for Player {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Player::Blue => "Blue",
            Player::Green => "Green",
            Player::Red => "Red",
        };
        write!(f, "{}", name)
    }
}

/// A board square.
///
/// The numbering scheme belongs to the rules engine; the search only ever
/// compares squares and passes them back through [`Board`] methods.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Square(pub u8);

impl fmt::Display for Square {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A move from one square to another.
///
/// Equality is structural, by square values: two separately constructed moves
/// describing the same displacement always compare equal, which is what keyed
/// child lookup in the tree relies on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Move {
    pub from: Square,
    pub to: Square,
}

impl Move {
    pub fn new(from: Square, to: Square) -> Self {
        Move { from, to }
    }
}

impl fmt::Display for Move {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.from, self.to)
    }
}

/// Error returned by [`Board::apply`] when the board rejects a move.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("move {mv} is not legal in this position")]
pub struct IllegalMove {
    pub mv: Move,
}

/// The rules/board collaborator the search runs against.
///
/// Implementations must be cheap to clone: the driver clones the authoritative
/// position once per round to get a scratch board it can freely mutate.
///
/// The `piece_squares` / `template_count` / `max_repeats` / `project` quartet
/// exposes the movement structure the rollout policy samples from: a piece is
/// picked uniformly, then one of its movement templates, then a repeat count
/// in `1..=max_repeats`, and the projected move is kept only if `is_legal`
/// accepts it. A biased sample over the legal-move set, by construction.
pub trait Board: Clone {
    /// The player whose turn it is.
    fn turn(&self) -> Player;

    /// True if `mv` is legal for the current mover in this position.
    fn is_legal(&self, mv: Move) -> bool;

    /// Applies a move for the current mover, advancing the turn.
    fn apply(&mut self, mv: Move) -> Result<(), IllegalMove>;

    /// True if the game is over.
    fn is_over(&self) -> bool;

    /// The winner, once the game is over. `None` while in progress or drawn.
    fn winner(&self) -> Option<Player>;

    /// The loser, once the game is over. `None` while in progress or drawn.
    fn loser(&self) -> Option<Player>;

    /// Every legal move for the current mover.
    fn legal_moves(&self) -> Vec<Move>;

    /// Squares currently holding one of `player`'s pieces.
    fn piece_squares(&self, player: Player) -> Vec<Square>;

    /// Number of movement templates for the piece on `square`, 0 if empty.
    fn template_count(&self, square: Square) -> usize;

    /// Largest allowed repeat count for a template of the piece on `square`.
    fn max_repeats(&self, square: Square, template: usize) -> u32;

    /// Destination reached by applying a template `repeats` times from
    /// `from`, or `None` if the displacement leaves the board.
    fn project(&self, from: Square, template: usize, repeats: u32) -> Option<Square>;

    /// Clock time `player` has left for the whole game.
    fn time_remaining(&self, player: Player) -> Duration;

    /// Every move played so far, oldest first.
    fn history(&self) -> &[Move];
}
