//! The shared minesweeper grid.
//!
//! A `Grid` is two layers over the same `width x height` rectangle:
//! - the bomb layer (`true` = a bomb is currently present),
//! - the status layer ([`CellStatus`]) that players actually see.
//!
//! Cells are addressed as `(x, y)` with `(0, 0)` in the top-left corner,
//! `x` growing to the right (columns) and `y` growing downwards (rows).
//!
//! Invariants maintained by every public operation:
//! - every `Revealed(n)` cell has exactly `n` bomb-carrying neighbours
//!   (Moore neighbourhood, clipped at the edges);
//! - a cell that was dug while holding a bomb no longer holds one.
//!
//! The grid itself is not synchronised. The server wraps it in a single
//! lock so that each top-level operation, including a full cascade, is
//! atomic with respect to every other one.

use rand::Rng;

use crate::error::GridError;

/// What a player can see at a single cell.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum CellStatus {
    /// Neither dug nor flagged.
    Untouched,

    /// Flagged by a player as (probably) holding a bomb.
    Flagged,

    /// Dug; carries the number of neighbouring bombs (0..=8).
    Revealed(u8),
}

impl CellStatus {
    /// Single-character rendering used by the text protocol.
    pub fn as_char(self) -> char {
        match self {
            CellStatus::Untouched => '-',
            CellStatus::Flagged => 'F',
            CellStatus::Revealed(0) => ' ',
            CellStatus::Revealed(n) => char::from(b'0' + n),
        }
    }
}

/// Result of [`Grid::reveal`].
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum RevealOutcome {
    /// The cell was flagged or already dug; nothing changed.
    AlreadyRevealed,

    /// The cell held a bomb. The bomb has been removed and the cell revealed.
    TriggeredBomb,

    /// The cell was revealed without hitting a bomb.
    Safe,
}

/// Rectangular minesweeper board.
#[derive(Debug, Clone)]
pub struct Grid {
    width: usize,
    height: usize,

    /// Row-major bomb layer, index = `y * width + x`.
    bombs: Vec<bool>,

    /// Row-major status layer, same indexing as `bombs`.
    status: Vec<CellStatus>,
}

impl Grid {
    /// Build a grid from a bomb map given as rows: `rows[y][x]`.
    ///
    /// All rows must be non-empty and of equal length.
    pub fn from_rows<R: AsRef<[bool]>>(rows: &[R]) -> Result<Self, GridError> {
        let width = rows.first().map(|r| r.as_ref().len()).unwrap_or(0);
        if width == 0 {
            return Err(GridError::EmptyBombMap);
        }

        check_dimensions(width, rows.len())?;

        let mut bombs = Vec::with_capacity(width * rows.len());
        for (row, cells) in rows.iter().enumerate() {
            let cells = cells.as_ref();
            if cells.len() != width {
                return Err(GridError::RaggedRow {
                    row,
                    expected: width,
                    found: cells.len(),
                });
            }
            bombs.extend_from_slice(cells);
        }

        Ok(Self::with_bombs(width, rows.len(), bombs))
    }

    /// A grid of the given size without any bombs.
    pub fn empty(width: usize, height: usize) -> Result<Self, GridError> {
        check_dimensions(width, height)?;
        Ok(Self::with_bombs(width, height, vec![false; width * height]))
    }

    /// A grid where each cell independently holds a bomb with
    /// probability `mine_probability`, using the thread-local RNG.
    pub fn random(width: usize, height: usize, mine_probability: f64) -> Result<Self, GridError> {
        Self::random_with(width, height, mine_probability, &mut rand::thread_rng())
    }

    /// Same as [`Grid::random`] but with a caller-supplied RNG
    /// (handy for reproducible boards).
    pub fn random_with<G: Rng + ?Sized>(
        width: usize,
        height: usize,
        mine_probability: f64,
        rng: &mut G,
    ) -> Result<Self, GridError> {
        check_dimensions(width, height)?;
        if !(0.0..=1.0).contains(&mine_probability) {
            return Err(GridError::InvalidProbability(mine_probability));
        }

        let bombs = (0..width * height)
            .map(|_| rng.gen_bool(mine_probability))
            .collect();

        Ok(Self::with_bombs(width, height, bombs))
    }

    fn with_bombs(width: usize, height: usize, bombs: Vec<bool>) -> Self {
        Grid {
            width,
            height,
            bombs,
            status: vec![CellStatus::Untouched; width * height],
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// Whether `(x, y)` lies on the board. Accepts any signed coordinate.
    pub fn in_bounds(&self, x: i64, y: i64) -> bool {
        usize::try_from(x).map_or(false, |x| x < self.width)
            && usize::try_from(y).map_or(false, |y| y < self.height)
    }

    /// Current visible status of a cell.
    ///
    /// Panics if `(x, y)` is out of bounds.
    pub fn status(&self, x: usize, y: usize) -> CellStatus {
        self.status[self.index(x, y)]
    }

    /// Whether a bomb is currently present at `(x, y)`.
    ///
    /// Panics if `(x, y)` is out of bounds.
    pub fn has_bomb(&self, x: usize, y: usize) -> bool {
        self.bombs[self.index(x, y)]
    }

    /// Number of bombs still on the board.
    pub fn bomb_count(&self) -> usize {
        self.bombs.iter().filter(|&&b| b).count()
    }

    /// Dig at `(x, y)`.
    ///
    /// If the cell is not untouched this is a no-op. Otherwise a bomb at the
    /// cell is removed (adjusting the counts of already revealed neighbours),
    /// the cell is revealed with its neighbour-bomb count, and if that count
    /// is zero every untouched neighbour is revealed in turn, flooding out
    /// across the zero region.
    ///
    /// Panics if `(x, y)` is out of bounds.
    pub fn reveal(&mut self, x: usize, y: usize) -> RevealOutcome {
        if self.status(x, y) != CellStatus::Untouched {
            return RevealOutcome::AlreadyRevealed;
        }

        let outcome = if self.has_bomb(x, y) {
            self.remove_bomb(x, y);
            RevealOutcome::TriggeredBomb
        } else {
            RevealOutcome::Safe
        };

        // Iterative flood fill. Cells are revealed as they are discovered,
        // so each one enters `pending` at most once.
        let mut pending = Vec::new();
        if self.reveal_one(x, y) == 0 {
            pending.push((x, y));
        }
        while let Some((cx, cy)) = pending.pop() {
            for (nx, ny) in self.neighbors(cx, cy) {
                if self.status(nx, ny) == CellStatus::Untouched && self.reveal_one(nx, ny) == 0 {
                    pending.push((nx, ny));
                }
            }
        }

        self.check_rep();
        outcome
    }

    /// Flag an untouched cell. Returns whether the status changed.
    ///
    /// Panics if `(x, y)` is out of bounds.
    pub fn mark(&mut self, x: usize, y: usize) -> bool {
        let idx = self.index(x, y);
        if self.status[idx] != CellStatus::Untouched {
            return false;
        }
        self.status[idx] = CellStatus::Flagged;
        self.check_rep();
        true
    }

    /// Remove a flag. Returns whether the status changed.
    ///
    /// Panics if `(x, y)` is out of bounds.
    pub fn unmark(&mut self, x: usize, y: usize) -> bool {
        let idx = self.index(x, y);
        if self.status[idx] != CellStatus::Flagged {
            return false;
        }
        self.status[idx] = CellStatus::Untouched;
        self.check_rep();
        true
    }

    /// Text rendering: one line per row, cells separated by single spaces,
    /// every line newline-terminated.
    pub fn render(&self) -> String {
        let mut out = String::with_capacity(self.width * self.height * 2);
        for row in self.status.chunks(self.width) {
            for (x, cell) in row.iter().enumerate() {
                if x > 0 {
                    out.push(' ');
                }
                out.push(cell.as_char());
            }
            out.push('\n');
        }
        out
    }

    // -------------------------------------------------------------------------
    // Internal helpers
    // -------------------------------------------------------------------------

    fn index(&self, x: usize, y: usize) -> usize {
        assert!(
            x < self.width && y < self.height,
            "cell ({}, {}) outside {}x{} grid",
            x,
            y,
            self.width,
            self.height
        );
        y * self.width + x
    }

    /// Coordinates of the (up to 8) cells surrounding `(x, y)`.
    fn neighbors(&self, x: usize, y: usize) -> impl Iterator<Item = (usize, usize)> {
        let xs = x.saturating_sub(1)..=(x + 1).min(self.width - 1);
        let ys = y.saturating_sub(1)..=(y + 1).min(self.height - 1);
        ys.flat_map(move |ny| xs.clone().map(move |nx| (nx, ny)))
            .filter(move |&(nx, ny)| nx != x || ny != y)
    }

    /// Reveal a single untouched cell with its current count.
    fn reveal_one(&mut self, x: usize, y: usize) -> u8 {
        let count = self.count_adjacent_bombs(x, y);
        let idx = self.index(x, y);
        self.status[idx] = CellStatus::Revealed(count);
        count
    }

    fn count_adjacent_bombs(&self, x: usize, y: usize) -> u8 {
        self.neighbors(x, y)
            .filter(|&(nx, ny)| self.has_bomb(nx, ny))
            .count() as u8
    }

    /// Clear the bomb at `(x, y)` and keep revealed neighbour counts honest.
    fn remove_bomb(&mut self, x: usize, y: usize) {
        let idx = self.index(x, y);
        self.bombs[idx] = false;

        for (nx, ny) in self.neighbors(x, y) {
            let nidx = self.index(nx, ny);
            if let CellStatus::Revealed(n) = self.status[nidx] {
                debug_assert!(n > 0, "revealed neighbour of a bomb has count 0");
                self.status[nidx] = CellStatus::Revealed(n - 1);
            }
        }
    }

    /// Debug-build check that every revealed count matches the bomb layer
    /// and that no revealed cell still carries a bomb.
    fn check_rep(&self) {
        if !cfg!(debug_assertions) {
            return;
        }
        for y in 0..self.height {
            for x in 0..self.width {
                if let CellStatus::Revealed(n) = self.status(x, y) {
                    debug_assert!(!self.has_bomb(x, y), "revealed cell ({x}, {y}) holds a bomb");
                    debug_assert_eq!(
                        n,
                        self.count_adjacent_bombs(x, y),
                        "stale count at ({x}, {y})"
                    );
                }
            }
        }
    }
}

/// Largest number of cells a grid may hold.
pub const MAX_CELLS: usize = 1 << 24;

/// Check that a `width x height` grid can be built: both sides positive and
/// at most [`MAX_CELLS`] cells in total.
pub fn check_dimensions(width: usize, height: usize) -> Result<(), GridError> {
    if width == 0 || height == 0 {
        return Err(GridError::ZeroDimension { width, height });
    }
    match width.checked_mul(height) {
        Some(cells) if cells <= MAX_CELLS => Ok(()),
        _ => Err(GridError::TooLarge { width, height }),
    }
}
