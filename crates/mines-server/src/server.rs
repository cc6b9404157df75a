//! TCP listener and top-level server wiring.
//!
//! This module:
//! - Builds the board and listens on the configured address/port.
//! - Spawns the fixed pool of dispatch workers that own all board access.
//! - Accepts new TCP connections, assigns each one a `SessionId`, and
//!   spawns a session task for it.
//!
//! The per-session logic and the worker loop live in the `session`
//! and `dispatch` modules respectively.

use std::collections::HashMap;
use std::io;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use mines_core::{Grid, MinesEngine};
use tokio::net::TcpListener;
use tokio::sync::{mpsc, Mutex};
use tracing::{error, info, warn};

use crate::config::Config;
use crate::dispatch::{self, Dispatcher};
use crate::session::{self, BoardDims};
use crate::types::{DispatchRx, DispatchTx, SessionId, SessionRegistry};

/// Global-ish counter for assigning unique `SessionId`s.
static NEXT_SESSION_ID: AtomicU64 = AtomicU64::new(1);

/// Pause before accepting again when the process is out of descriptors.
const ACCEPT_BACKOFF: Duration = Duration::from_millis(100);

fn next_session_id() -> SessionId {
    let id = NEXT_SESSION_ID.fetch_add(1, Ordering::Relaxed);
    SessionId(id)
}

/// How a bound server behaves, independent of where the board came from.
#[derive(Debug, Clone, Copy)]
pub struct ServeOptions {
    /// Keep clients connected after a bomb hit.
    pub debug: bool,

    /// Number of dispatch workers.
    pub workers: usize,
}

/// Run the TCP server with the given configuration.
///
/// Only returns on a fatal error: bad board, bind failure, or a broken
/// listening socket.
pub async fn run(config: Config) -> Result<()> {
    let grid = config.board.load()?;
    info!(
        width = grid.width(),
        height = grid.height(),
        bombs = grid.bomb_count(),
        "board ready"
    );

    let addr = config.socket_addr_string();
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("cannot listen on {}", addr))?;
    info!("Listening on {}", listener.local_addr()?);

    serve(
        listener,
        grid,
        ServeOptions {
            debug: config.debug,
            workers: config.workers,
        },
    )
    .await
}

/// Serve `grid` on an already bound listener until the listener breaks.
pub async fn serve(listener: TcpListener, grid: Grid, options: ServeOptions) -> Result<()> {
    let dims = BoardDims {
        width: grid.width(),
        height: grid.height(),
    };

    // Shared registry of live sessions → outbound channels.
    let sessions: SessionRegistry = Arc::new(Mutex::new(HashMap::new()));

    // Channel from sessions → dispatch workers.
    let (dispatch_tx, dispatch_rx): (DispatchTx, DispatchRx) = mpsc::unbounded_channel();

    dispatch::spawn_workers(
        Dispatcher {
            queue: Arc::new(Mutex::new(dispatch_rx)),
            engine: Arc::new(Mutex::new(MinesEngine::new(grid))),
            sessions: sessions.clone(),
            debug: options.debug,
        },
        options.workers.max(1),
    );

    loop {
        let (stream, peer_addr) = match listener.accept().await {
            Ok(accepted) => accepted,
            Err(e) if is_connection_error(&e) => {
                warn!(error = %e, "failed to accept connection");
                if is_descriptor_exhaustion(&e) {
                    tokio::time::sleep(ACCEPT_BACKOFF).await;
                }
                continue;
            }
            Err(e) => {
                error!(error = %e, "listening socket failed");
                return Err(e).context("accept failed");
            }
        };

        let session_id = next_session_id();
        info!("Accepted connection {} from {}", session_id.0, peer_addr);

        spawn_session(session_id, stream, peer_addr, dims, &dispatch_tx, &sessions);
    }
}

fn spawn_session(
    session_id: SessionId,
    stream: tokio::net::TcpStream,
    peer_addr: SocketAddr,
    dims: BoardDims,
    dispatch_tx: &DispatchTx,
    sessions: &SessionRegistry,
) {
    // Clone handles to move into the session task.
    let dispatch_tx = dispatch_tx.clone();
    let sessions = sessions.clone();

    tokio::spawn(async move {
        session::run_session(session_id, stream, dims, dispatch_tx, sessions).await;
        info!("Session {} ({}) finished", session_id.0, peer_addr);
    });
}

/// Errors that concern only the connection being accepted (or a transient
/// shortage), not the listening socket itself.
fn is_connection_error(e: &io::Error) -> bool {
    if matches!(
        e.kind(),
        io::ErrorKind::ConnectionRefused
            | io::ErrorKind::ConnectionAborted
            | io::ErrorKind::ConnectionReset
            | io::ErrorKind::Interrupted
            | io::ErrorKind::WouldBlock
    ) {
        return true;
    }

    is_descriptor_exhaustion(e)
}

/// EMFILE / ENFILE: retry once other connections have closed.
fn is_descriptor_exhaustion(e: &io::Error) -> bool {
    matches!(e.raw_os_error(), Some(23) | Some(24))
}
