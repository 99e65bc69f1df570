//! The per-turn agent wrapper around the search.
//!
//! A game harness holds one [`MctsAgent`] per seat and calls it once per
//! turn with the authoritative board. The agent keeps its tree alive between
//! turns: before each search it reroots along the moves played since its
//! previous decision (read off the board's history, or fed explicitly via
//! [`MctsAgent::observe_moves`]), so search effort spent on positions the
//! game actually reached is never thrown away.

use std::fmt;

use log::debug;

use crate::config::SearchConfig;
use crate::search::{SearchBudget, SearchDriver, SearchError, SearchStats};
use crate::tree::SearchTree;
use crate::{Board, Move};

const DEFAULT_NAME: &str = "carlo";

/// A move-choosing agent backed by one persistent search tree.
pub struct MctsAgent {
    config: SearchConfig,
    /// Created on the first decision, so the tree roots at the live
    /// position rather than an assumed starting one.
    driver: Option<SearchDriver>,
    /// How many plies of the board's history the tree has absorbed.
    seen_plies: usize,
    last_stats: SearchStats,
    name: String,
}

impl MctsAgent {
    pub fn new(config: SearchConfig) -> Self {
        MctsAgent {
            config,
            driver: None,
            seen_plies: 0,
            last_stats: SearchStats::default(),
            name: DEFAULT_NAME.to_string(),
        }
    }

    /// Sets the display name used in harness logs.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Statistics from the most recent search, zeroed before the first one.
    pub fn search_stats(&self) -> SearchStats {
        self.last_stats
    }

    /// The live search tree, if a decision has been made yet.
    pub fn tree(&self) -> Option<&SearchTree> {
        self.driver.as_ref().map(|driver| driver.tree())
    }

    /// Tells the tree which moves were actually played since the agent's
    /// previous decision, oldest first.
    ///
    /// Optional: `choose_move` recovers the same information from the
    /// board's history. Ignored before the first decision, because the
    /// first tree is rooted at the live position anyway.
    pub fn observe_moves(&mut self, moves: &[Move]) {
        if moves.is_empty() {
            return;
        }
        if let Some(driver) = &mut self.driver {
            driver.tree_mut().prune_and_reroot(moves);
            self.seen_plies += moves.len();
        }
    }

    /// Chooses a move for the current position within `budget`.
    pub fn choose_move<B: Board>(
        &mut self,
        board: &B,
        budget: SearchBudget,
    ) -> Result<Move, SearchError> {
        let driver = self.sync(board)?;
        let stats = driver.run_search(board, budget)?;
        let chosen = driver.tree().select_move().ok_or(SearchError::NoMoves)?;
        self.last_stats = stats;
        debug!(
            "{} plays {} after {} rounds over {} nodes",
            self.name, chosen, stats.rounds, stats.nodes
        );
        Ok(chosen)
    }

    /// Chooses a move on a deadline paced off the player clock: the
    /// remaining time divided by the configured moves-remaining estimate.
    pub fn choose_move_paced<B: Board>(&mut self, board: &B) -> Result<Move, SearchError> {
        let estimate = self.config.moves_remaining_estimate.max(1);
        let slice = board.time_remaining(board.turn()) / estimate;
        self.choose_move(board, SearchBudget::timed(slice))
    }

    /// Brings the tree in line with the board before searching: builds it on
    /// the first call, reroots along unseen history afterwards.
    fn sync<B: Board>(&mut self, board: &B) -> Result<&mut SearchDriver, SearchError> {
        let history = board.history();
        if self.seen_plies > history.len() {
            // The history got shorter: this is a different game. Start over.
            debug!("{} discards its tree: board history restarted", self.name);
            self.driver = None;
        }
        if self.driver.is_none() {
            let driver = SearchDriver::new(board.turn(), self.config.clone())?;
            self.seen_plies = history.len();
            return Ok(self.driver.insert(driver));
        }
        let driver = self.driver.as_mut().expect("driver just checked to exist");
        if self.seen_plies < history.len() {
            let unseen = &history[self.seen_plies..];
            driver.tree_mut().prune_and_reroot(unseen);
            self.seen_plies = history.len();
        }
        debug_assert_eq!(driver.tree().root_color(), board.turn());
        Ok(driver)
    }
}

impl Default for MctsAgent {
    fn default() -> Self {
        Self::new(SearchConfig::default())
    }
}

impl fmt::Display for MctsAgent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}
