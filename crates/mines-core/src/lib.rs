//! mines-core
//!
//! Pure minesweeper game logic:
//! - the grid (bomb layer, visible status, flood-fill reveal)
//! - messages (client commands / engine replies)
//! - the engine applying commands to the one shared grid

pub mod engine;
pub mod error;
pub mod grid;
pub mod messages;

pub use engine::MinesEngine;
pub use error::GridError;
pub use grid::{CellStatus, Grid, RevealOutcome};
pub use messages::{Command, Coord, Reply};
