//! Stored-board file format.
//!
//! ```text
//! WIDTH HEIGHT
//! c c c ... c     <- HEIGHT lines, WIDTH cells each, c ∈ {0, 1}
//! ```
//!
//! A `1` marks a bomb. Tokens are separated by exactly one space and
//! nothing may follow the last row. Any deviation is an error; the server
//! refuses to start on a bad file.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use mines_core::grid::check_dimensions;
use mines_core::{Grid, GridError};
use thiserror::Error;

/// Why a stored board could not be loaded.
#[derive(Debug, Error)]
pub enum BoardFileError {
    #[error("failed to read board file: {0}")]
    Io(#[from] std::io::Error),

    #[error("board file is empty")]
    MissingHeader,

    #[error("line 1: expected `WIDTH HEIGHT`, found {0:?}")]
    BadHeader(String),

    #[error("line {line}: expected {width} space-separated 0/1 cells")]
    BadRow { line: usize, width: usize },

    #[error("expected {expected} rows, found {found}")]
    MissingRows { expected: usize, found: usize },

    #[error("line {line}: unexpected content after the last row")]
    TrailingContent { line: usize },

    #[error(transparent)]
    Grid(#[from] GridError),
}

/// Open and parse a board file.
pub fn load_board(path: impl AsRef<Path>) -> Result<Grid, BoardFileError> {
    let file = File::open(path)?;
    parse_board(BufReader::new(file))
}

/// Parse a board from any buffered reader.
pub fn parse_board<R: BufRead>(reader: R) -> Result<Grid, BoardFileError> {
    let mut lines = reader.lines();

    let header = lines.next().ok_or(BoardFileError::MissingHeader)??;
    let (width, height) =
        parse_header(&header).ok_or_else(|| BoardFileError::BadHeader(header.clone()))?;
    check_dimensions(width, height)?;

    let mut rows = Vec::new();
    for row in 0..height {
        let line_no = row + 2;
        let line = match lines.next() {
            Some(line) => line?,
            None => {
                return Err(BoardFileError::MissingRows {
                    expected: height,
                    found: row,
                })
            }
        };
        let cells = parse_row(&line, width).ok_or(BoardFileError::BadRow {
            line: line_no,
            width,
        })?;
        rows.push(cells);
    }

    if lines.next().is_some() {
        return Err(BoardFileError::TrailingContent { line: height + 2 });
    }

    Ok(Grid::from_rows(&rows)?)
}

// -----------------------------------------------------------------------------
// Helpers
// -----------------------------------------------------------------------------

fn parse_header(line: &str) -> Option<(usize, usize)> {
    let (w, h) = line.split_once(' ')?;
    Some((parse_dimension(w)?, parse_dimension(h)?))
}

fn parse_dimension(token: &str) -> Option<usize> {
    if token.is_empty() || !token.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    token.parse().ok()
}

fn parse_row(line: &str, width: usize) -> Option<Vec<bool>> {
    let cells = line
        .split(' ')
        .map(|tok| match tok {
            "0" => Some(false),
            "1" => Some(true),
            _ => None,
        })
        .collect::<Option<Vec<bool>>>()?;

    (cells.len() == width).then_some(cells)
}
