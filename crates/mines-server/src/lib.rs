//! mines-server
//!
//! Multi-client async TCP server for the shared minesweeper board.

pub mod config;
pub mod server;
pub mod types;

// these are internal modules, not re-exported
mod dispatch;
mod session;
