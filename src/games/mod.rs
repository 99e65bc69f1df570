//! # Built-in Games
//!
//! The real three-player chess rules engine lives outside this crate and is
//! consumed through the [`crate::Board`] trait. This module holds the small
//! built-in game the tests and the benchmark binary run against.
//!
//! ## Implementing a Game
//! A game needs:
//! 1. A position type implementing `Board` (legality, application, terminal
//!    detection, clocks, history)
//! 2. The piece/template/repeat structure the rollout policy samples from
//! 3. A `Display` implementation for debugging output

pub mod skirmish;
