//! # Ring Skirmish
//!
//! A deliberately small three-player capture game used to exercise the
//! search. Three seats, two piece kinds, a handful of movement templates:
//! just enough structure to drive every [`Board`] method without dragging a
//! chess rules engine into the crate.
//!
//! ## Rules
//! - Played on a ring of 24 cells; Blue, Green and Red move in that order.
//! - Each player starts with one flag and two raiders.
//! - A raider moves 1 to 3 cells in either direction, or jumps 6 cells
//!   forward. A flag creeps a single cell forward.
//! - Landing on an enemy piece captures it; landing on your own is illegal.
//! - Capturing a flag ends the game: the capturer wins, the flag's owner
//!   loses and the third player gets neither.
//! - If no flag has fallen after a fixed number of plies the game is a draw,
//!   which also guarantees random playouts terminate.

use std::fmt;
use std::time::Duration;

use crate::{Board, IllegalMove, Move, Player, Square};

/// Number of cells on the ring.
pub const CELLS: u8 = 24;

/// Plies after which the game is called a draw.
pub const PLY_CAP: u32 = 200;

const DEFAULT_CLOCK: Duration = Duration::from_secs(600);

/// Piece kinds, with very different mobility.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    /// Creeps one cell forward; losing it loses the game.
    Flag,
    /// Moves 1-3 cells either way or jumps 6 forward.
    Raider,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Piece {
    pub owner: Player,
    pub kind: Kind,
}

/// A ring skirmish position.
#[derive(Debug, Clone)]
pub struct Skirmish {
    cells: [Option<Piece>; CELLS as usize],
    turn: Player,
    plies: u32,
    clocks: [Duration; 3],
    history: Vec<Move>,
    /// Set once a flag is captured: (capturer, flag owner).
    outcome: Option<(Player, Player)>,
}

impl Skirmish {
    /// The standard starting position: each player's flag with two raiders
    /// behind it, a third of the ring apart.
    pub fn new() -> Self {
        let mut setup = Vec::new();
        for (i, player) in Player::ALL.iter().enumerate() {
            let base = (i as u8) * (CELLS / 3);
            setup.push((*player, Kind::Raider, base));
            setup.push((*player, Kind::Raider, base + 1));
            setup.push((*player, Kind::Flag, base + 2));
        }
        Self::from_setup(&setup, Player::Blue)
    }

    /// Builds a handcrafted position. Intended for tests and benchmarks.
    ///
    /// Panics if two pieces are placed on the same cell.
    pub fn from_setup(pieces: &[(Player, Kind, u8)], turn: Player) -> Self {
        let mut cells = [None; CELLS as usize];
        for &(owner, kind, cell) in pieces {
            let slot = &mut cells[cell as usize % CELLS as usize];
            assert!(slot.is_none(), "two pieces placed on cell {}", cell);
            *slot = Some(Piece { owner, kind });
        }
        Skirmish {
            cells,
            turn,
            plies: 0,
            clocks: [DEFAULT_CLOCK; 3],
            history: Vec::new(),
            outcome: None,
        }
    }

    /// Sets every player's clock, for pacing tests.
    pub fn with_clock(mut self, clock: Duration) -> Self {
        self.clocks = [clock; 3];
        self
    }

    pub fn piece_at(&self, square: Square) -> Option<Piece> {
        self.cells[square.0 as usize % CELLS as usize]
    }

    pub fn plies(&self) -> u32 {
        self.plies
    }

    /// Signed cell offset of one application of a movement template.
    fn template_delta(kind: Kind, template: usize) -> Option<i32> {
        match (kind, template) {
            (Kind::Flag, 0) => Some(1),
            (Kind::Raider, 0) => Some(1),
            (Kind::Raider, 1) => Some(-1),
            (Kind::Raider, 2) => Some(6),
            _ => None,
        }
    }

    fn wrap(cell: i32) -> Square {
        Square(cell.rem_euclid(CELLS as i32) as u8)
    }
}

impl Default for Skirmish {
    fn default() -> Self {
        Self::new()
    }
}

impl Board for Skirmish {
    fn turn(&self) -> Player {
        self.turn
    }

    fn is_legal(&self, mv: Move) -> bool {
        if self.is_over() {
            return false;
        }
        let Some(piece) = self.piece_at(mv.from) else {
            return false;
        };
        if piece.owner != self.turn {
            return false;
        }
        if let Some(target) = self.piece_at(mv.to) {
            if target.owner == self.turn {
                return false;
            }
        }
        for template in 0..self.template_count(mv.from) {
            for repeats in 1..=self.max_repeats(mv.from, template) {
                if self.project(mv.from, template, repeats) == Some(mv.to) {
                    return true;
                }
            }
        }
        false
    }

    fn apply(&mut self, mv: Move) -> Result<(), IllegalMove> {
        if !self.is_legal(mv) {
            return Err(IllegalMove { mv });
        }
        let from = mv.from.0 as usize % CELLS as usize;
        let to = mv.to.0 as usize % CELLS as usize;
        let piece = self.cells[from].take();
        if let Some(captured) = self.cells[to] {
            if captured.kind == Kind::Flag {
                self.outcome = Some((self.turn, captured.owner));
            }
        }
        self.cells[to] = piece;
        self.plies += 1;
        self.history.push(mv);
        self.turn = self.turn.next();
        Ok(())
    }

    fn is_over(&self) -> bool {
        self.outcome.is_some() || self.plies >= PLY_CAP
    }

    fn winner(&self) -> Option<Player> {
        self.outcome.map(|(winner, _)| winner)
    }

    fn loser(&self) -> Option<Player> {
        self.outcome.map(|(_, loser)| loser)
    }

    fn legal_moves(&self) -> Vec<Move> {
        let mut moves = Vec::new();
        if self.is_over() {
            return moves;
        }
        for from in self.piece_squares(self.turn) {
            for template in 0..self.template_count(from) {
                for repeats in 1..=self.max_repeats(from, template) {
                    if let Some(to) = self.project(from, template, repeats) {
                        let mv = Move::new(from, to);
                        if self.is_legal(mv) && !moves.contains(&mv) {
                            moves.push(mv);
                        }
                    }
                }
            }
        }
        moves
    }

    fn piece_squares(&self, player: Player) -> Vec<Square> {
        self.cells
            .iter()
            .enumerate()
            .filter(|(_, cell)| cell.map(|p| p.owner) == Some(player))
            .map(|(i, _)| Square(i as u8))
            .collect()
    }

    fn template_count(&self, square: Square) -> usize {
        match self.piece_at(square) {
            Some(piece) => match piece.kind {
                Kind::Flag => 1,
                Kind::Raider => 3,
            },
            None => 0,
        }
    }

    fn max_repeats(&self, square: Square, template: usize) -> u32 {
        let Some(piece) = self.piece_at(square) else {
            return 0;
        };
        match (piece.kind, template) {
            (Kind::Flag, 0) => 1,
            (Kind::Raider, 0) | (Kind::Raider, 1) => 3,
            (Kind::Raider, 2) => 1,
            _ => 0,
        }
    }

    fn project(&self, from: Square, template: usize, repeats: u32) -> Option<Square> {
        let piece = self.piece_at(from)?;
        if repeats == 0 || repeats > self.max_repeats(from, template) {
            return None;
        }
        let delta = Self::template_delta(piece.kind, template)?;
        Some(Self::wrap(from.0 as i32 + delta * repeats as i32))
    }

    fn time_remaining(&self, player: Player) -> Duration {
        self.clocks[player.index()]
    }

    fn history(&self) -> &[Move] {
        &self.history
    }
}

impl fmt::Display for Skirmish {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for cell in &self.cells {
            let symbol = match cell {
                Some(Piece { owner: Player::Blue, kind: Kind::Flag }) => 'B',
                Some(Piece { owner: Player::Blue, kind: Kind::Raider }) => 'b',
                Some(Piece { owner: Player::Green, kind: Kind::Flag }) => 'G',
                Some(Piece { owner: Player::Green, kind: Kind::Raider }) => 'g',
                Some(Piece { owner: Player::Red, kind: Kind::Flag }) => 'R',
                Some(Piece { owner: Player::Red, kind: Kind::Raider }) => 'r',
                None => '.',
            };
            write!(f, "{}", symbol)?;
        }
        write!(f, "  {} to move, ply {}", self.turn, self.plies)
    }
}
