//! mines-protocol
//!
//! Text encoding for the minesweeper server.
//!
//! - [`text_codec`] : client lines → `Command`, `Reply` → response text
//! - [`board_file`] : stored-board files → `Grid`

pub mod board_file;
pub mod text_codec;

pub use board_file::{load_board, parse_board, BoardFileError};
pub use text_codec::{
    format_greeting, format_reply, parse_command_line, BOOM_TEXT, HELP_TEXT,
};
