//! Message types used by the core minesweeper engine.
//!
//! These are **transport-agnostic** logical messages:
//! - [`Command`]: what the engine consumes, one per client line.
//! - [`Reply`]: what the engine produces for that line.
//!
//! Note: the text encoding of both lives in the `mines-protocol` crate;
//! this module is purely logical.

/// A single client request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Show the current board.
    Look,

    /// Show the help text.
    Help,

    /// End the session.
    Bye,

    /// Dig (reveal) a cell.
    Dig(Coord),

    /// Flag an untouched cell.
    Flag(Coord),

    /// Remove a flag.
    Deflag(Coord),

    /// The line did not match any known command.
    Malformed,
}

/// Coordinates as typed by a client.
///
/// Signed and unchecked: anything may arrive on the wire, and whether the
/// position is on the board is decided against a concrete grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Coord {
    /// Column, counted from the left edge.
    pub x: i64,

    /// Row, counted from the top edge.
    pub y: i64,
}

impl Coord {
    pub fn new(x: i64, y: i64) -> Self {
        Coord { x, y }
    }
}

/// The engine's answer to one [`Command`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// Rendered board (see [`Grid::render`](crate::Grid::render)).
    Board(String),

    /// The fixed help text should be shown.
    Help,

    /// The dig hit a bomb.
    Boom,

    /// The client asked to leave; nothing is written back.
    Goodbye,
}
