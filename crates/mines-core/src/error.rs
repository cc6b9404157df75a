//! Error types for the core minesweeper grid.
//!
//! Gameplay operations are infallible: out-of-bounds coordinates are
//! filtered out by the caller (see [`Grid::in_bounds`](crate::Grid::in_bounds))
//! before any mutation. Only *construction* of a grid can fail.

use thiserror::Error;

/// Reasons a [`Grid`](crate::Grid) cannot be constructed.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GridError {
    /// Width or height was zero.
    #[error("grid dimensions must be positive, got {width}x{height}")]
    ZeroDimension { width: usize, height: usize },

    /// More cells than a grid may hold (see [`MAX_CELLS`](crate::grid::MAX_CELLS)).
    #[error("grid of {width}x{height} cells is too large")]
    TooLarge { width: usize, height: usize },

    /// A bomb map with no rows (or an empty first row) was supplied.
    #[error("bomb map is empty")]
    EmptyBombMap,

    /// A bomb map row did not have the same length as the first row.
    #[error("bomb map row {row} has {found} cells, expected {expected}")]
    RaggedRow {
        row: usize,
        expected: usize,
        found: usize,
    },

    /// Mine probability outside `[0, 1]` (or NaN).
    #[error("mine probability must be within [0, 1], got {0}")]
    InvalidProbability(f64),
}
