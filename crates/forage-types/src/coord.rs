//! Offset hex coordinates.
//!
//! The grid uses an "odd-row shifted right" offset layout: every odd row is
//! drawn half a cell to the right, so the column offsets of the diagonal
//! neighbours depend on the parity of the row.

use serde::{Deserialize, Serialize};

/// A cell address on the hex grid.
///
/// Ordering is row-major (`row` first, then `col`), which makes `Coord`
/// usable as a `BTreeMap` key with a stable iteration order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Coord {
    /// Zero-based row index.
    pub row: i32,
    /// Zero-based column index.
    pub col: i32,
}

impl Coord {
    /// Create a coordinate from a row and a column.
    pub const fn new(row: i32, col: i32) -> Self {
        Self { row, col }
    }

    /// Return this coordinate shifted by the given deltas.
    pub const fn offset(self, d_row: i32, d_col: i32) -> Self {
        Self {
            row: self.row.saturating_add(d_row),
            col: self.col.saturating_add(d_col),
        }
    }

    /// `1` for odd rows, `0` for even rows (negative rows included).
    pub const fn parity(self) -> i32 {
        self.row.rem_euclid(2)
    }
}

impl core::fmt::Display for Coord {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "({}, {})", self.row, self.col)
    }
}

/// Extent of a rectangular grid.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Dimensions {
    /// Number of rows (grid height).
    pub rows: i32,
    /// Number of columns (grid width).
    pub cols: i32,
}

impl Dimensions {
    /// Create dimensions from a row and column count.
    pub const fn new(rows: i32, cols: i32) -> Self {
        Self { rows, cols }
    }

    /// Whether `coord` lies inside the grid.
    pub const fn contains(self, coord: Coord) -> bool {
        coord.row >= 0 && coord.col >= 0 && coord.row < self.rows && coord.col < self.cols
    }

    /// Total number of cells.
    pub fn area(self) -> usize {
        let rows = usize::try_from(self.rows).unwrap_or(0);
        let cols = usize::try_from(self.cols).unwrap_or(0);
        rows.saturating_mul(cols)
    }
}

impl core::fmt::Display for Dimensions {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}x{}", self.rows, self.cols)
    }
}
