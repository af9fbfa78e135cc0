//! Error types for the `forage-world` crate.
//!
//! All fallible operations in this crate return [`WorldError`] through the
//! standard [`Result`] type.

use std::path::PathBuf;

use forage_types::{Coord, Dimensions};

/// Errors that can occur while loading or accessing the map.
#[derive(Debug, thiserror::Error)]
pub enum WorldError {
    /// A coordinate lies outside the grid.
    #[error("coordinate {coord} is outside the {dimensions} grid")]
    OutOfBounds {
        /// The offending coordinate.
        coord: Coord,
        /// Extent of the grid.
        dimensions: Dimensions,
    },

    /// The map source contains a character that is not a cell code.
    #[error("unrecognised cell code {found:?} at row {row}, column {col}")]
    MalformedSource {
        /// Zero-based source line.
        row: usize,
        /// Zero-based character position.
        col: usize,
        /// The character that was found.
        found: char,
    },

    /// A row of the map source has a different width than the first row.
    #[error("row {row} has {found} cells, expected {expected}")]
    RaggedRow {
        /// Zero-based source line.
        row: usize,
        /// Width of the first row.
        expected: usize,
        /// Width of this row.
        found: usize,
    },

    /// The map source has no cells.
    #[error("map source is empty")]
    EmptyMap,

    /// The grid is too large to address with `i32` coordinates.
    #[error("map of {rows}x{cols} cells exceeds the addressable grid size")]
    Oversized {
        /// Number of rows in the source.
        rows: usize,
        /// Number of columns in the source.
        cols: usize,
    },

    /// The map source has no `P` cell.
    #[error("map has no population (home) cell")]
    MissingHome,

    /// The map source has more than one `P` cell.
    #[error("map has a second population cell at {second} (first at {first})")]
    DuplicateHome {
        /// The first home found.
        first: Coord,
        /// The extra home.
        second: Coord,
    },

    /// An attempt to overwrite the home cell or to create a second one.
    #[error("the population cell cannot change kind (at {0})")]
    HomeImmutable(Coord),

    /// Reading a map file failed.
    #[error("failed to read map file {path}: {source}")]
    Io {
        /// The file that was being read.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },
}
