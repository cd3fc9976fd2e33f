//! Win and draw evaluation.

use crate::types::{Board, Cell, Mark, Outcome};

/// The eight winning lines as (row, col) triples: rows first, then
/// columns, then diagonals. At most one line can be complete in a legal
/// game, but the scan order is fixed so evaluation is deterministic.
const LINES: [[(usize, usize); 3]; 8] = [
    // Rows
    [(0, 0), (0, 1), (0, 2)],
    [(1, 0), (1, 1), (1, 2)],
    [(2, 0), (2, 1), (2, 2)],
    // Columns
    [(0, 0), (1, 0), (2, 0)],
    [(0, 1), (1, 1), (2, 1)],
    [(0, 2), (1, 2), (2, 2)],
    // Diagonals
    [(0, 0), (1, 1), (2, 2)],
    [(0, 2), (1, 1), (2, 0)],
];

impl Board {
    /// Evaluates the board for a terminal outcome.
    ///
    /// Returns `Some(Outcome::Winner(mark))` when three identical marks
    /// occupy a row, column, or diagonal, `Some(Outcome::Draw)` when all
    /// nine cells are occupied with no complete line, and `None` while
    /// the game continues. Pure and infallible.
    pub fn evaluate(&self) -> Option<Outcome> {
        if let Some(winner) = self.winner() {
            return Some(Outcome::Winner(winner));
        }
        if self.is_full() {
            return Some(Outcome::Draw);
        }
        None
    }

    /// Checks for a complete line and returns its mark.
    pub fn winner(&self) -> Option<Mark> {
        for [a, b, c] in LINES {
            let first = self.get(a.0, a.1);
            if let Some(Cell::Occupied(mark)) = first {
                if first == self.get(b.0, b.1) && first == self.get(c.0, c.1) {
                    return Some(mark);
                }
            }
        }
        None
    }
}
