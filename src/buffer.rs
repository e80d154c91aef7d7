//! The escape counts of one run.

use crate::config::GridSpec;

/// Value every cell holds until the kernel writes it. Escape counts are
/// never negative, so the sentinel cannot be confused with a result.
pub const UNWRITTEN: i32 = -1;

/// `nx * ny` escape counts, stored row-major by (column, row): cell
/// `(i, j)` lives at `i * ny + j`.
///
/// Only the dispatch engine (or a reader of an existing artifact) builds one,
/// and there is no way to mutate it afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultBuffer {
    grid: GridSpec,
    cells: Box<[i32]>,
}

impl ResultBuffer {
    /// Caller guarantees `cells.len() == grid.cells()`.
    pub(crate) fn from_cells(grid: GridSpec, cells: Vec<i32>) -> Self {
        debug_assert_eq!(cells.len(), grid.cells());
        Self {
            grid,
            cells: cells.into_boxed_slice(),
        }
    }

    pub fn grid(&self) -> GridSpec {
        self.grid
    }

    /// Escape count of column `column`, row `row`.
    ///
    /// # Panics
    /// Panics if the cell is outside the grid.
    pub fn get(&self, column: usize, row: usize) -> i32 {
        assert!(
            column < self.grid.nx && row < self.grid.ny,
            "cell ({}, {}) outside {}x{} grid",
            column,
            row,
            self.grid.nx,
            self.grid.ny
        );
        self.cells[self.grid.index(column, row)]
    }

    /// All cells in storage order.
    pub fn as_slice(&self) -> &[i32] {
        &self.cells
    }

    /// One column (fixed x), `ny` cells long.
    pub fn column(&self, column: usize) -> &[i32] {
        let start = self.grid.index(column, 0);
        &self.cells[start..start + self.grid.ny]
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}
