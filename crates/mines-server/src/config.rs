//! Configuration for the minesweeper TCP server.
//!
//! The game-facing knobs come from the command line:
//!
//! ```text
//! mines-server [--debug | --no-debug] [--port PORT]
//!              [--size WIDTH,HEIGHT [--mine-probability P] | --file FILE]
//! ```
//!
//! Deployment knobs are read from environment variables, falling back to
//! defaults:
//!
//! - `MINES_BIND_ADDR` (default: "0.0.0.0")
//! - `MINES_WORKERS`   (default: "10")

use std::env;
use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{bail, Context, Result};
use clap::Parser;
use mines_core::Grid;

pub const DEFAULT_PORT: u16 = 4444;
pub const DEFAULT_SIZE: usize = 10;
pub const DEFAULT_MINE_PROBABILITY: f64 = 0.25;
pub const DEFAULT_WORKERS: usize = 10;

/// Command-line arguments.
#[derive(Parser, Debug)]
#[clap(name = "mines-server")]
#[clap(about = "Multiplayer minesweeper over a line-oriented TCP protocol")]
pub struct Cli {
    /// Keep clients connected after they hit a bomb
    #[clap(long, overrides_with = "no_debug")]
    pub debug: bool,

    /// Disconnect clients that hit a bomb (default)
    #[clap(long = "no-debug", overrides_with = "debug")]
    pub no_debug: bool,

    /// TCP port to listen on
    #[clap(short, long, default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// Random board of WIDTH,HEIGHT cells
    #[clap(long, value_name = "WIDTH,HEIGHT", conflicts_with = "file")]
    pub size: Option<BoardSize>,

    /// Probability that a cell of a random board holds a bomb
    #[clap(long, default_value_t = DEFAULT_MINE_PROBABILITY, conflicts_with = "file")]
    pub mine_probability: f64,

    /// Load the board from FILE instead of generating one
    #[clap(long, value_name = "FILE")]
    pub file: Option<PathBuf>,
}

/// `WIDTH,HEIGHT` as given to `--size`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoardSize {
    pub width: usize,
    pub height: usize,
}

impl FromStr for BoardSize {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (w, h) = s
            .split_once(',')
            .ok_or_else(|| format!("expected WIDTH,HEIGHT, got {:?}", s))?;
        let width = w.trim().parse().map_err(|_| format!("bad width {:?}", w))?;
        let height = h.trim().parse().map_err(|_| format!("bad height {:?}", h))?;
        Ok(BoardSize { width, height })
    }
}

/// Where the one board of this server comes from.
#[derive(Debug, Clone, PartialEq)]
pub enum BoardSource {
    /// Generate a board; every cell is a bomb with `mine_probability`.
    Random {
        width: usize,
        height: usize,
        mine_probability: f64,
    },

    /// Load a stored board file.
    File(PathBuf),
}

impl BoardSource {
    /// Build the grid described by this source.
    pub fn load(&self) -> Result<Grid> {
        match self {
            BoardSource::Random {
                width,
                height,
                mine_probability,
            } => Grid::random(*width, *height, *mine_probability)
                .with_context(|| format!("cannot generate a {}x{} board", width, height)),
            BoardSource::File(path) => mines_protocol::load_board(path)
                .with_context(|| format!("cannot load board from {}", path.display())),
        }
    }
}

/// Server configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// IP address / interface to bind to (e.g. "0.0.0.0" or "127.0.0.1").
    pub bind_addr: String,

    /// TCP port to listen on.
    pub port: u16,

    /// When set, hitting a bomb does not disconnect the client.
    pub debug: bool,

    /// Number of dispatch workers applying commands to the board.
    pub workers: usize,

    /// Board to serve.
    pub board: BoardSource,
}

impl Config {
    /// Combine parsed command-line arguments with environment overrides.
    pub fn from_cli(cli: Cli) -> Result<Self> {
        let bind_addr = env::var("MINES_BIND_ADDR").unwrap_or_else(|_| "0.0.0.0".to_string());
        let workers = read_env_or_default("MINES_WORKERS", DEFAULT_WORKERS)?;
        if workers == 0 {
            bail!("MINES_WORKERS must be at least 1");
        }

        let board = match cli.file {
            Some(path) => {
                if !path.is_file() {
                    bail!("file not found: {:?}", path);
                }
                BoardSource::File(path)
            }
            None => {
                let size = cli.size.unwrap_or(BoardSize {
                    width: DEFAULT_SIZE,
                    height: DEFAULT_SIZE,
                });
                BoardSource::Random {
                    width: size.width,
                    height: size.height,
                    mine_probability: cli.mine_probability,
                }
            }
        };

        Ok(Config {
            bind_addr,
            port: cli.port,
            debug: cli.debug && !cli.no_debug,
            workers,
            board,
        })
    }

    /// Convenience: `addr:port` socket string.
    pub fn socket_addr_string(&self) -> String {
        format!("{}:{}", self.bind_addr, self.port)
    }
}

fn read_env_or_default<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(key) {
        Ok(val) => val
            .parse::<T>()
            .with_context(|| format!("invalid value {:?} for {}", val, key)),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<Cli, clap::Error> {
        Cli::try_parse_from(std::iter::once("mines-server").chain(args.iter().copied()))
    }

    #[test]
    fn defaults_to_random_ten_by_ten() {
        let config = Config::from_cli(parse(&[]).unwrap()).unwrap();

        assert_eq!(config.port, DEFAULT_PORT);
        assert!(!config.debug);
        assert_eq!(
            config.board,
            BoardSource::Random {
                width: 10,
                height: 10,
                mine_probability: DEFAULT_MINE_PROBABILITY
            }
        );
    }

    #[test]
    fn last_debug_flag_wins() {
        let on = Config::from_cli(parse(&["--no-debug", "--debug"]).unwrap()).unwrap();
        assert!(on.debug);

        let off = Config::from_cli(parse(&["--debug", "--no-debug"]).unwrap()).unwrap();
        assert!(!off.debug);
    }

    #[test]
    fn size_and_port() {
        let cli = parse(&["--size", "7,3", "--port", "0"]).unwrap();
        assert_eq!(cli.size, Some(BoardSize { width: 7, height: 3 }));
        assert_eq!(cli.port, 0);

        assert!(parse(&["--size", "7"]).is_err());
        assert!(parse(&["--size", "a,3"]).is_err());
        assert!(parse(&["--port", "65536"]).is_err());
    }

    #[test]
    fn size_and_file_are_exclusive() {
        assert!(parse(&["--size", "3,3", "--file", "board.txt"]).is_err());
    }

    #[test]
    fn missing_board_file_is_rejected() {
        let cli = parse(&["--file", "/definitely/not/here/board.txt"]).unwrap();
        assert!(Config::from_cli(cli).is_err());
    }

    #[test]
    fn bad_probability_fails_at_load() {
        let config = Config::from_cli(parse(&["--mine-probability", "2"]).unwrap()).unwrap();
        assert!(config.board.load().is_err());
    }
}
