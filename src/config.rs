//! Search configuration.
//!
//! Everything tunable about the search lives here so a harness can load a
//! configuration from disk, tweak it in code, or just take the defaults.

use serde::{Deserialize, Serialize};

/// Tunable search parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Exploration constant in the UCT formula.
    /// Default: sqrt(2), which gives the classic `sqrt(2 ln N / n)` bonus.
    pub exploration: f64,

    /// Estimated moves remaining in the game, used to slice the remaining
    /// clock into per-move deadlines. A heuristic, not a rule of the game.
    /// Default: 40
    pub moves_remaining_estimate: u32,

    /// How many rejected rollout draws to tolerate before falling back to a
    /// uniform draw over the exact legal-move set.
    /// Default: 128
    pub rollout_retry_limit: u32,

    /// Seed for the driver's random generator. `None` seeds from entropy;
    /// fix it for reproducible searches.
    /// Default: None
    pub seed: Option<u64>,
}

impl Default for SearchConfig {
    fn default() -> Self {
        SearchConfig {
            exploration: std::f64::consts::SQRT_2,
            moves_remaining_estimate: 40,
            rollout_retry_limit: 128,
            seed: None,
        }
    }
}

impl SearchConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_exploration(mut self, exploration: f64) -> Self {
        self.exploration = exploration;
        self
    }

    pub fn with_moves_remaining_estimate(mut self, estimate: u32) -> Self {
        self.moves_remaining_estimate = estimate;
        self
    }

    pub fn with_rollout_retry_limit(mut self, limit: u32) -> Self {
        self.rollout_retry_limit = limit;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Checks the parameters are usable before a driver is built around
    /// them.
    pub fn validate(&self) -> Result<(), String> {
        if !self.exploration.is_finite() || self.exploration <= 0.0 {
            return Err(format!(
                "exploration must be finite and positive, got {}",
                self.exploration
            ));
        }
        if self.moves_remaining_estimate == 0 {
            return Err("moves_remaining_estimate must be at least 1".to_string());
        }
        if self.rollout_retry_limit == 0 {
            return Err("rollout_retry_limit must be at least 1".to_string());
        }
        Ok(())
    }
}
