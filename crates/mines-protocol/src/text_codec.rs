// crates/mines-protocol/src/text_codec.rs

//! Line-oriented text codec.
//!
//! Input format (one line → `Command`), tokens separated by a single space,
//! whole line must match:
//!
//! - `look`
//! - `help`
//! - `bye`
//! - `dig X Y`, `flag X Y`, `deflag X Y` where X / Y are decimal integers
//!   with an optional leading `-`
//!
//! Anything else is `Command::Malformed`.
//!
//! Output format (`Reply` → text, always newline-terminated):
//!
//! - Board:   the grid rendering, one line per row
//! - Help:    [`HELP_TEXT`]
//! - Boom:    [`BOOM_TEXT`]
//! - Goodbye: nothing
//!
//! Greeting on connect:
//!   `Welcome to Minesweeper. Players: N including you. Board: W columns by H rows. Type 'help' for help.`

use mines_core::{Command, Coord, Reply};

/// Sent in answer to `help` and to any line that does not parse.
pub const HELP_TEXT: &str = "Commands: look (show the board), \
dig X Y (dig at column X, row Y), \
flag X Y (flag the cell at X, Y), \
deflag X Y (remove the flag at X, Y), \
help (show this message), \
bye (leave the game).\n";

/// Sent when a dig hits a bomb.
pub const BOOM_TEXT: &str = "BOOM!\n";

/// Parse a single input line into a `Command`. Never fails.
///
/// The line is expected without its terminator.
pub fn parse_command_line(line: &str) -> Command {
    let tokens: Vec<&str> = line.split(' ').collect();

    match tokens.as_slice() {
        ["look"] => Command::Look,
        ["help"] => Command::Help,
        ["bye"] => Command::Bye,
        [verb, x, y] => parse_cell_command(verb, x, y).unwrap_or(Command::Malformed),
        _ => Command::Malformed,
    }
}

fn parse_cell_command(verb: &str, x: &str, y: &str) -> Option<Command> {
    let at = Coord::new(parse_coordinate(x)?, parse_coordinate(y)?);

    match verb {
        "dig" => Some(Command::Dig(at)),
        "flag" => Some(Command::Flag(at)),
        "deflag" => Some(Command::Deflag(at)),
        _ => None,
    }
}

/// `-?[0-9]+`. Values beyond `i64` saturate; they are off any board anyway.
fn parse_coordinate(token: &str) -> Option<i64> {
    let (negative, digits) = match token.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, token),
    };

    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }

    match token.parse::<i64>() {
        Ok(v) => Some(v),
        Err(_) if negative => Some(i64::MIN),
        Err(_) => Some(i64::MAX),
    }
}

/// Format a `Reply` as the text to write back to the client.
///
/// Returns `None` for `Reply::Goodbye`, which produces no output.
pub fn format_reply(reply: &Reply) -> Option<String> {
    match reply {
        Reply::Board(rendered) => Some(rendered.clone()),
        Reply::Help => Some(HELP_TEXT.to_string()),
        Reply::Boom => Some(BOOM_TEXT.to_string()),
        Reply::Goodbye => None,
    }
}

/// Greeting sent once when a session becomes active.
///
/// `players` counts every live session, including the new one.
pub fn format_greeting(players: usize, width: usize, height: usize) -> String {
    format!(
        "Welcome to Minesweeper. Players: {} including you. Board: {} columns by {} rows. Type 'help' for help.\n",
        players, width, height
    )
}
