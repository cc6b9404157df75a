//! Line-protocol TCP server for multiplayer minesweeper.

use anyhow::Result;
use clap::Parser;
use mines_server::config::{Cli, Config};
use mines_server::server;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let default_level = if cli.debug && !cli.no_debug { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .init();

    let config = Config::from_cli(cli)?;

    info!(
        "Starting mines-server on {} (debug = {}, workers = {}, board = {:?})",
        config.socket_addr_string(),
        config.debug,
        config.workers,
        config.board
    );

    server::run(config).await
}
