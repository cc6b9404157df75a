//! Command processing on top of the [`Grid`].
//!
//! `MinesEngine` is the single owner of the board. Each call to
//! [`MinesEngine::process_command`] is one top-level operation: the caller
//! holds whatever lock guards the engine for the full call, so a cascade and
//! the render that follows it are observed atomically.
//!
//! Per-command behaviour:
//! - `look`                 => current board.
//! - `help`, malformed line => help text.
//! - `bye`                  => goodbye (no output).
//! - `dig/flag/deflag x y` off the board => current board, nothing mutated.
//! - `dig x y`    => reveal; `Boom` if a bomb was hit, else the board.
//! - `flag x y`   => mark (ignored if not untouched), then the board.
//! - `deflag x y` => unmark (ignored if not flagged), then the board.

use crate::grid::{Grid, RevealOutcome};
use crate::messages::{Command, Coord, Reply};

/// Owns the shared grid and applies client commands to it.
#[derive(Debug)]
pub struct MinesEngine {
    grid: Grid,
}

impl MinesEngine {
    pub fn new(grid: Grid) -> Self {
        MinesEngine { grid }
    }

    /// Read-only access to the board.
    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    /// Apply one command and return the reply for the issuing client.
    pub fn process_command(&mut self, cmd: Command) -> Reply {
        match cmd {
            Command::Look => Reply::Board(self.grid.render()),
            Command::Help | Command::Malformed => Reply::Help,
            Command::Bye => Reply::Goodbye,
            Command::Dig(at) => self.process_dig(at),
            Command::Flag(at) => self.with_cell(at, |grid, x, y| {
                grid.mark(x, y);
            }),
            Command::Deflag(at) => self.with_cell(at, |grid, x, y| {
                grid.unmark(x, y);
            }),
        }
    }

    // -------------------------------------------------------------------------
    // Internal handlers
    // -------------------------------------------------------------------------

    fn process_dig(&mut self, at: Coord) -> Reply {
        let Some((x, y)) = self.on_board(at) else {
            return Reply::Board(self.grid.render());
        };

        match self.grid.reveal(x, y) {
            RevealOutcome::TriggeredBomb => Reply::Boom,
            RevealOutcome::Safe | RevealOutcome::AlreadyRevealed => {
                Reply::Board(self.grid.render())
            }
        }
    }

    /// Run `op` on an on-board cell, then render. Off-board coordinates
    /// skip `op` entirely.
    fn with_cell<F>(&mut self, at: Coord, op: F) -> Reply
    where
        F: FnOnce(&mut Grid, usize, usize),
    {
        if let Some((x, y)) = self.on_board(at) {
            op(&mut self.grid, x, y);
        }
        Reply::Board(self.grid.render())
    }

    fn on_board(&self, at: Coord) -> Option<(usize, usize)> {
        if self.grid.in_bounds(at.x, at.y) {
            Some((at.x as usize, at.y as usize))
        } else {
            None
        }
    }
}
