//! Per-player board: ship placement, shot resolution and the two views of it
//! (the owner's full view and the opponent's tracking view).

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::bitboard::BitBoard;
use crate::common::{CellState, Coordinate, Outcome};
use crate::config::{Ruleset, MAX_BOARD_SIZE};
use crate::error::{GameError, PlacementError};
use crate::ship::{Orientation, Ship, ShipKind, ShipPlacement};

/// Bitboard type used for every per-cell mask on a board.
pub(crate) type Grid = BitBoard<u16, MAX_BOARD_SIZE>;

/// Attempts per ship before a random layout is restarted from scratch.
const PLACEMENT_ATTEMPTS: usize = 100;
const LAYOUT_ATTEMPTS: usize = 32;

/// A ship as its owner sees it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShipView {
    pub kind: ShipKind,
    pub cells: Vec<Coordinate>,
    pub hits: Vec<Coordinate>,
    pub sunk: bool,
}

/// Full view of a board, for its owner only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OwnBoardView {
    pub size: u8,
    pub ships: Vec<ShipView>,
    pub misses: Vec<Coordinate>,
}

/// A sunk ship, whose position is public once it is gone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SunkShip {
    pub kind: ShipKind,
    pub cells: Vec<Coordinate>,
}

/// What the opponent may know about a board: shot results and sunk ships.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetView {
    pub size: u8,
    pub hits: Vec<Coordinate>,
    pub misses: Vec<Coordinate>,
    pub sunk: Vec<SunkShip>,
    pub ships_afloat: usize,
}

/// Main board state: ship placements, hits, misses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Board {
    size: u8,
    fleet: Vec<ShipKind>,
    ships: Vec<Ship>,
    ship_map: Grid,
    hits: Grid,
    misses: Grid,
}

impl Board {
    /// Create an empty board (no ships placed) for `ruleset`.
    pub fn new(ruleset: &Ruleset) -> Self {
        let empty = Grid::new();
        Board {
            size: ruleset.board_size,
            fleet: ruleset.fleet.clone(),
            ships: Vec::with_capacity(ruleset.fleet.len()),
            ship_map: empty,
            hits: empty,
            misses: empty,
        }
    }

    /// Empty 10×10 board expecting the standard five-ship fleet.
    pub fn standard() -> Self {
        Self::new(&Ruleset::default())
    }

    pub fn size(&self) -> u8 {
        self.size
    }

    /// Ships placed so far, in placement order.
    pub fn ships(&self) -> &[Ship] {
        &self.ships
    }

    /// Place a single ship.
    pub fn place_ship(&mut self, placement: &ShipPlacement) -> Result<(), GameError> {
        let placed = self.ships.iter().filter(|s| s.kind() == placement.kind).count();
        let allowed = self.fleet.iter().filter(|&&k| k == placement.kind).count();
        if placed >= allowed {
            return Err(PlacementError::NotInFleet(placement.kind).into());
        }

        let ship = Ship::from_placement(placement, self.size)?;
        // ensure no overlap
        if let Some(&clash) = ship.cells().iter().find(|c| self.ship_at(**c).is_some()) {
            return Err(PlacementError::Overlaps(clash).into());
        }

        self.ship_map |= ship.mask();
        self.ships.push(ship);
        Ok(())
    }

    /// Place several ships at once. Either all of them land or the board is
    /// left untouched. Returns whether the fleet is now complete.
    pub fn place_fleet(&mut self, placements: &[ShipPlacement]) -> Result<bool, GameError> {
        let mut scratch = self.clone();
        for placement in placements {
            scratch.place_ship(placement)?;
        }
        *self = scratch;
        Ok(self.is_ready())
    }

    /// `true` iff exactly the configured fleet has been placed.
    pub fn is_ready(&self) -> bool {
        if self.ships.len() != self.fleet.len() {
            return false;
        }
        let mut placed: Vec<ShipKind> = self.ships.iter().map(|s| s.kind()).collect();
        let mut wanted = self.fleet.clone();
        placed.sort();
        wanted.sort();
        placed == wanted
    }

    /// Returns `true` when a fleet is present and every ship is sunk.
    pub fn all_sunk(&self) -> bool {
        !self.ships.is_empty() && self.ships.iter().all(|s| s.is_sunk())
    }

    /// Number of ships still afloat.
    pub fn ships_afloat(&self) -> usize {
        self.ships.iter().filter(|s| !s.is_sunk()).count()
    }

    /// Whether `target` has already been shot at.
    pub fn is_targeted(&self, target: Coordinate) -> bool {
        let (r, c) = target.index();
        self.hits.get(r, c).unwrap_or(false) || self.misses.get(r, c).unwrap_or(false)
    }

    /// Number of shots received.
    pub fn shots_received(&self) -> usize {
        self.hits.count_ones() + self.misses.count_ones()
    }

    /// State of a single cell.
    pub fn cell(&self, target: Coordinate) -> Result<CellState, GameError> {
        if !target.within(self.size) {
            return Err(GameError::OutOfBounds);
        }
        let (r, c) = target.index();
        let state = if self.hits.get(r, c).unwrap_or(false) {
            CellState::Hit
        } else if self.misses.get(r, c).unwrap_or(false) {
            CellState::Miss
        } else if self.ship_map.get(r, c).unwrap_or(false) {
            CellState::Ship
        } else {
            CellState::Empty
        };
        Ok(state)
    }

    /// Resolve what a shot at `target` would do, without changing the board.
    pub fn preview_shot(&self, target: Coordinate) -> Result<Outcome, GameError> {
        if !target.within(self.size) {
            return Err(GameError::OutOfBounds);
        }
        if self.is_targeted(target) {
            return Err(GameError::DuplicateShot);
        }
        let Some(idx) = self.ship_at(target) else {
            return Ok(Outcome::Miss);
        };
        let ship = &self.ships[idx];
        if ship.hit_cells().len() + 1 < ship.kind().length() {
            return Ok(Outcome::Hit);
        }
        let others_sunk = self
            .ships
            .iter()
            .enumerate()
            .all(|(i, s)| i == idx || s.is_sunk());
        if others_sunk {
            Ok(Outcome::Win(ship.kind()))
        } else {
            Ok(Outcome::Sunk(ship.kind()))
        }
    }

    /// Process a shot at `target`, marking the hit or miss and reporting the
    /// result. A rejected shot leaves the board unchanged.
    pub fn apply_shot(&mut self, target: Coordinate) -> Result<Outcome, GameError> {
        let outcome = self.preview_shot(target)?;
        let (r, c) = target.index();
        match self.ship_at(target) {
            Some(idx) => {
                self.hits
                    .set(r, c)
                    .map_err(|e| GameError::ContractViolation(e.to_string()))?;
                self.ships[idx].strike(target);
            }
            None => {
                self.misses
                    .set(r, c)
                    .map_err(|e| GameError::ContractViolation(e.to_string()))?;
            }
        }
        Ok(outcome)
    }

    /// Everything about this board. Only ever sent to its owner.
    pub fn own_view(&self) -> OwnBoardView {
        OwnBoardView {
            size: self.size,
            ships: self
                .ships
                .iter()
                .map(|s| ShipView {
                    kind: s.kind(),
                    cells: s.cells().to_vec(),
                    hits: s.hit_cells(),
                    sunk: s.is_sunk(),
                })
                .collect(),
            misses: self.misses.iter_set_bits().map(to_coordinate).collect(),
        }
    }

    /// The board as the opponent may see it.
    pub fn target_view(&self) -> TargetView {
        TargetView {
            size: self.size,
            hits: self.hits.iter_set_bits().map(to_coordinate).collect(),
            misses: self.misses.iter_set_bits().map(to_coordinate).collect(),
            sunk: self
                .ships
                .iter()
                .filter(|s| s.is_sunk())
                .map(|s| SunkShip {
                    kind: s.kind(),
                    cells: s.cells().to_vec(),
                })
                .collect(),
            ships_afloat: self.ships_afloat(),
        }
    }

    fn ship_at(&self, target: Coordinate) -> Option<usize> {
        let (r, c) = target.index();
        if !self.ship_map.get(r, c).unwrap_or(false) {
            return None;
        }
        self.ships.iter().position(|s| s.occupies(target))
    }
}

fn to_coordinate((row, col): (usize, usize)) -> Coordinate {
    Coordinate::new(row as u8, col as u8)
}

/// Returns a random non-overlapping placement for `kind` on `board`.
pub fn random_placement<R: Rng>(
    board: &Board,
    rng: &mut R,
    kind: ShipKind,
) -> Option<ShipPlacement> {
    let size = board.size() as usize;
    if kind.length() > size {
        return None;
    }
    for _ in 0..PLACEMENT_ATTEMPTS {
        let orient = if rng.random() {
            Orientation::Horizontal
        } else {
            Orientation::Vertical
        };
        let max_r = if orient == Orientation::Vertical {
            size - kind.length()
        } else {
            size - 1
        };
        let max_c = if orient == Orientation::Horizontal {
            size - kind.length()
        } else {
            size - 1
        };
        let r = rng.random_range(0..=max_r) as u8;
        let c = rng.random_range(0..=max_c) as u8;
        let placement = ShipPlacement::line(kind, Coordinate::new(r, c), orient);
        if placement.cells.iter().all(|cell| board.ship_at(*cell).is_none()) {
            return Some(placement);
        }
    }
    None
}

/// Random layout of the whole fleet of `ruleset`, longest ships first.
pub fn random_fleet<R: Rng>(ruleset: &Ruleset, rng: &mut R) -> Result<Vec<ShipPlacement>, GameError> {
    let mut kinds = ruleset.fleet.clone();
    kinds.sort_by_key(|k| core::cmp::Reverse(k.length()));

    'layout: for _ in 0..LAYOUT_ATTEMPTS {
        let mut board = Board::new(ruleset);
        let mut placements = Vec::with_capacity(kinds.len());
        for &kind in &kinds {
            let Some(placement) = random_placement(&board, rng, kind) else {
                continue 'layout;
            };
            board.place_ship(&placement)?;
            placements.push(placement);
        }
        return Ok(placements);
    }
    Err(GameError::ContractViolation(format!(
        "unable to lay out fleet on a {0}x{0} board",
        ruleset.board_size
    )))
}
