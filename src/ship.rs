//! Ship kinds, placement requests and placed ships tracked with a `BitBoard`.

use core::fmt;
use serde::{Deserialize, Serialize};

use crate::board::Grid;
use crate::common::Coordinate;
use crate::error::PlacementError;

/// Orientation of a ship on the board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Orientation {
    Horizontal,
    Vertical,
}

/// Kind of ship. Each kind has a fixed length.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ShipKind {
    Carrier,
    Battleship,
    Cruiser,
    Submarine,
    Destroyer,
}

impl ShipKind {
    /// Every kind, longest first.
    pub const ALL: [ShipKind; 5] = [
        ShipKind::Carrier,
        ShipKind::Battleship,
        ShipKind::Cruiser,
        ShipKind::Submarine,
        ShipKind::Destroyer,
    ];

    /// Number of cells the ship occupies.
    pub const fn length(self) -> usize {
        match self {
            ShipKind::Carrier => 5,
            ShipKind::Battleship => 4,
            ShipKind::Cruiser => 3,
            ShipKind::Submarine => 3,
            ShipKind::Destroyer => 2,
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            ShipKind::Carrier => "Carrier",
            ShipKind::Battleship => "Battleship",
            ShipKind::Cruiser => "Cruiser",
            ShipKind::Submarine => "Submarine",
            ShipKind::Destroyer => "Destroyer",
        }
    }
}

impl fmt::Display for ShipKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A request to put one ship on a board: its kind and the cells it covers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShipPlacement {
    pub kind: ShipKind,
    pub cells: Vec<Coordinate>,
}

impl ShipPlacement {
    /// Placement from an explicit, ordered list of cells.
    pub fn new(kind: ShipKind, cells: Vec<Coordinate>) -> Self {
        Self { kind, cells }
    }

    /// Placement of `kind` starting at `origin` and extending right
    /// (horizontal) or down (vertical).
    pub fn line(kind: ShipKind, origin: Coordinate, orientation: Orientation) -> Self {
        let cells = (0..kind.length() as u8)
            .map(|i| match orientation {
                Orientation::Horizontal => Coordinate::new(origin.row, origin.col.saturating_add(i)),
                Orientation::Vertical => Coordinate::new(origin.row.saturating_add(i), origin.col),
            })
            .collect();
        Self { kind, cells }
    }

    /// Check the placement's shape on a `size`×`size` board and return its
    /// cells sorted from the top-left end.
    pub(crate) fn normalized(&self, size: u8) -> Result<(Vec<Coordinate>, Orientation), PlacementError> {
        let expected = self.kind.length();
        if self.cells.len() != expected {
            return Err(PlacementError::WrongLength {
                kind: self.kind,
                expected,
                actual: self.cells.len(),
            });
        }
        if let Some(&cell) = self.cells.iter().find(|c| !c.within(size)) {
            return Err(PlacementError::OutOfBounds(cell));
        }

        let mut cells = self.cells.clone();
        cells.sort();
        let first = cells[0];
        let orientation = if cells.iter().all(|c| c.row == first.row) {
            Orientation::Horizontal
        } else if cells.iter().all(|c| c.col == first.col) {
            Orientation::Vertical
        } else {
            return Err(PlacementError::NotStraight);
        };

        let contiguous = cells.windows(2).all(|w| match orientation {
            Orientation::Horizontal => w[1].col == w[0].col + 1,
            Orientation::Vertical => w[1].row == w[0].row + 1,
        });
        if !contiguous {
            return Err(PlacementError::NotContiguous);
        }
        Ok((cells, orientation))
    }
}

/// A ship placed on a board, with hits tracked in a bitboard.
#[derive(Clone, PartialEq, Eq)]
pub struct Ship {
    kind: ShipKind,
    orientation: Orientation,
    cells: Vec<Coordinate>,
    mask: Grid,
    hits: Grid,
}

impl Ship {
    /// Build a ship from a placement validated against a `size`×`size` board.
    pub(crate) fn from_placement(placement: &ShipPlacement, size: u8) -> Result<Self, PlacementError> {
        let (cells, orientation) = placement.normalized(size)?;
        let mut mask = Grid::new();
        for c in &cells {
            let (r, col) = c.index();
            mask.set(r, col).map_err(|_| PlacementError::OutOfBounds(*c))?;
        }
        Ok(Ship {
            kind: placement.kind,
            orientation,
            cells,
            mask,
            hits: Grid::new(),
        })
    }

    /// Register a shot at `target`. Returns `true` if it struck this ship.
    pub(crate) fn strike(&mut self, target: Coordinate) -> bool {
        let (r, c) = target.index();
        if self.mask.get(r, c).unwrap_or(false) {
            let _ = self.hits.set(r, c);
            true
        } else {
            false
        }
    }

    /// Check if the ship is sunk (all segments hit).
    pub fn is_sunk(&self) -> bool {
        self.hits.count_ones() == self.kind.length()
    }

    /// Whether the ship covers `target`.
    pub fn occupies(&self, target: Coordinate) -> bool {
        let (r, c) = target.index();
        self.mask.get(r, c).unwrap_or(false)
    }

    /// Whether `target` is a hit segment of this ship.
    pub fn is_hit_at(&self, target: Coordinate) -> bool {
        let (r, c) = target.index();
        self.hits.get(r, c).unwrap_or(false)
    }

    pub fn kind(&self) -> ShipKind {
        self.kind
    }

    pub fn orientation(&self) -> Orientation {
        self.orientation
    }

    /// Occupied cells, top-left end first.
    pub fn cells(&self) -> &[Coordinate] {
        &self.cells
    }

    /// Cells of this ship that have been hit, in ship order.
    pub fn hit_cells(&self) -> Vec<Coordinate> {
        self.cells.iter().copied().filter(|c| self.is_hit_at(*c)).collect()
    }

    pub(crate) fn mask(&self) -> Grid {
        self.mask
    }
}

impl fmt::Debug for Ship {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Ship {{ kind: {}, cells: {:?}, orientation: {:?}, hits: {} }}",
            self.kind,
            self.cells,
            self.orientation,
            self.hits.count_ones(),
        )
    }
}
