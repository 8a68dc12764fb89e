//! Common value types shared by every layer: coordinates, identities and
//! shot outcomes.

use core::fmt;
use serde::{Deserialize, Serialize};

use crate::ship::ShipKind;

/// A cell on the board, addressed as (row, column) from the top-left corner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Coordinate {
    pub row: u8,
    pub col: u8,
}

impl Coordinate {
    pub const fn new(row: u8, col: u8) -> Self {
        Self { row, col }
    }

    /// Returns `true` when the coordinate lies on a `size`×`size` grid.
    pub fn within(&self, size: u8) -> bool {
        self.row < size && self.col < size
    }

    pub(crate) fn index(&self) -> (usize, usize) {
        (self.row as usize, self.col as usize)
    }
}

impl From<(u8, u8)> for Coordinate {
    fn from((row, col): (u8, u8)) -> Self {
        Self { row, col }
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.row, self.col)
    }
}

/// Opaque player identity supplied by the transport layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PlayerId(pub u64);

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "player-{}", self.0)
    }
}

/// Registry-assigned identity of a live session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SessionId(pub u64);

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "session-{}", self.0)
    }
}

/// Result of a single shot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Outcome {
    /// Shot landed on open water.
    Miss,
    /// Shot hit a ship that is still afloat.
    Hit,
    /// Shot sank a ship, carrying its kind.
    Sunk(ShipKind),
    /// Shot sank the last ship afloat; carries the kind of that ship.
    Win(ShipKind),
}

impl Outcome {
    pub fn is_hit(&self) -> bool {
        !matches!(self, Outcome::Miss)
    }
}

/// State of a single cell as seen by the board's owner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CellState {
    Empty,
    Ship,
    Hit,
    Miss,
}

/// Lifecycle phase of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Phase {
    WaitingForPlayers,
    Setup,
    Active,
    Finished,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::WaitingForPlayers => "waiting-for-players",
            Phase::Setup => "setup",
            Phase::Active => "active",
            Phase::Finished => "finished",
        };
        f.write_str(name)
    }
}
