//! Core domain types for the board engine.

use serde::{Deserialize, Serialize};

/// Board side length.
pub const SIZE: usize = 3;

/// One of the two marks placed on the board.
///
/// `A` is traditionally rendered "X" and always moves first in a fresh
/// game; `B` is rendered "O".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Mark {
    /// First mark ("X").
    A,
    /// Second mark ("O").
    B,
}

impl Mark {
    /// Returns the other mark.
    pub fn opponent(self) -> Self {
        match self {
            Mark::A => Mark::B,
            Mark::B => Mark::A,
        }
    }

    /// Conventional board symbol for this mark.
    pub fn symbol(self) -> char {
        match self {
            Mark::A => 'X',
            Mark::B => 'O',
        }
    }
}

/// A single cell on the board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Cell {
    /// Unoccupied cell.
    Empty,
    /// Cell occupied by a mark.
    Occupied(Mark),
}

/// Terminal result of a game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Outcome {
    /// The given mark completed a line.
    Winner(Mark),
    /// All cells occupied with no complete line.
    Draw,
}

/// Errors that can occur when placing a mark.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaceError {
    /// Row or column outside the 3x3 grid.
    OutOfBounds,
    /// Target cell is already occupied.
    Occupied,
}

impl std::fmt::Display for PlaceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PlaceError::OutOfBounds => write!(f, "coordinates out of bounds"),
            PlaceError::Occupied => write!(f, "cell is already occupied"),
        }
    }
}

impl std::error::Error for PlaceError {}

/// 3x3 game board, addressed by (row, col).
///
/// Once a cell is occupied it never reverts to empty within a single
/// game; the only way back to an empty cell is a fresh board.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Board {
    cells: [[Cell; SIZE]; SIZE],
}

impl Board {
    /// Creates a new empty board.
    pub fn new() -> Self {
        Self {
            cells: [[Cell::Empty; SIZE]; SIZE],
        }
    }

    /// Gets the cell at the given coordinates, if in range.
    pub fn get(&self, row: usize, col: usize) -> Option<Cell> {
        self.cells.get(row).and_then(|r| r.get(col)).copied()
    }

    /// Checks whether placing at (row, col) is legal: in range and empty.
    pub fn is_legal(&self, row: usize, col: usize) -> bool {
        matches!(self.get(row, col), Some(Cell::Empty))
    }

    /// Places a mark at (row, col).
    ///
    /// # Errors
    ///
    /// Returns [`PlaceError::OutOfBounds`] for coordinates outside the
    /// grid and [`PlaceError::Occupied`] for a non-empty target cell.
    pub fn place(&mut self, row: usize, col: usize, mark: Mark) -> Result<(), PlaceError> {
        match self.get(row, col) {
            None => Err(PlaceError::OutOfBounds),
            Some(Cell::Occupied(_)) => Err(PlaceError::Occupied),
            Some(Cell::Empty) => {
                self.cells[row][col] = Cell::Occupied(mark);
                Ok(())
            }
        }
    }

    /// Checks if every cell is occupied.
    pub fn is_full(&self) -> bool {
        self.cells
            .iter()
            .flatten()
            .all(|c| *c != Cell::Empty)
    }

    /// Returns the cells in row-major order.
    pub fn cells(&self) -> &[[Cell; SIZE]; SIZE] {
        &self.cells
    }

    /// Formats the board as a human-readable grid.
    pub fn display(&self) -> String {
        let mut result = String::new();
        for (row, cells) in self.cells.iter().enumerate() {
            for (col, cell) in cells.iter().enumerate() {
                let symbol = match cell {
                    Cell::Empty => '.',
                    Cell::Occupied(mark) => mark.symbol(),
                };
                result.push(symbol);
                if col < SIZE - 1 {
                    result.push('|');
                }
            }
            if row < SIZE - 1 {
                result.push_str("\n-+-+-\n");
            }
        }
        result
    }
}

impl Default for Board {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for Board {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display())
    }
}
