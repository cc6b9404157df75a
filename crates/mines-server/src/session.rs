//! Per-connection session handling.
//!
//! Lifecycle: `Connecting → Active → Closed`.
//!
//! - Becoming active registers the session and queues the greeting while
//!   the registry lock is held, so the player count is exact.
//! - While active, every input line is parsed and handed to the dispatch
//!   workers; the session waits for that line to be handled before
//!   reading the next one. All output goes through the writer task.
//! - The session closes on EOF, on a close decision from dispatch, or on a
//!   transport error. Closing unregisters it and lets the writer drain.

use mines_protocol::{format_greeting, parse_command_line};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

use crate::types::{
    Disposition, DispatchRequest, DispatchTx, Outbound, OutboundRx, SessionId, SessionRegistry,
};

/// Why a session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CloseReason {
    /// The peer closed its side of the connection.
    Eof,

    /// Dispatch decided to close (`bye`, or a bomb hit outside debug mode).
    Dispatch,

    /// Reading from the socket failed.
    Transport,

    /// The dispatch queue is gone (server shutting down).
    ServerGone,
}

/// Board dimensions quoted in the greeting. They never change, so sessions
/// don't need the board lock to build it.
#[derive(Debug, Clone, Copy)]
pub struct BoardDims {
    pub width: usize,
    pub height: usize,
}

/// Run a session for one accepted connection until it closes.
pub async fn run_session(
    session_id: SessionId,
    stream: TcpStream,
    dims: BoardDims,
    dispatch_tx: DispatchTx,
    sessions: SessionRegistry,
) {
    let (read_stream, write_stream) = stream.into_split();
    let (out_tx, out_rx) = mpsc::unbounded_channel();

    // Register and greet atomically with respect to other joins / leaves.
    {
        let mut guard = sessions.lock().await;
        guard.insert(session_id, out_tx.clone());
        let greeting = format_greeting(guard.len(), dims.width, dims.height);
        let _ = out_tx.send(Outbound::Text(greeting));
    }
    // Only the registry keeps the sender alive from here on.
    drop(out_tx);

    let writer_handle = tokio::spawn(run_writer(session_id, write_stream, out_rx));

    let reason = run_reader(session_id, read_stream, &dispatch_tx).await;
    info!(session = session_id.0, ?reason, "session closed");

    // Idempotent: dispatch may already have removed us.
    {
        let mut guard = sessions.lock().await;
        guard.remove(&session_id);
    }

    // With the registry entry gone the writer drains and exits.
    if let Err(e) = writer_handle.await {
        warn!(session = session_id.0, error = %e, "writer task failed");
    }
}

/// Read lines and forward them to dispatch, one at a time.
async fn run_reader(
    session_id: SessionId,
    read_stream: OwnedReadHalf,
    dispatch_tx: &DispatchTx,
) -> CloseReason {
    let mut reader = BufReader::new(read_stream);
    let mut buffer = Vec::new();

    loop {
        buffer.clear();
        match reader.read_until(b'\n', &mut buffer).await {
            Ok(0) => return CloseReason::Eof,
            Ok(_) => {}
            Err(e) => {
                debug!(session = session_id.0, error = %e, "read error");
                return CloseReason::Transport;
            }
        }

        let line = String::from_utf8_lossy(&buffer);
        let line = line.trim_end_matches('\n').trim_end_matches('\r');
        let command = parse_command_line(line);
        debug!(session = session_id.0, line, ?command, "received");

        let (done_tx, done_rx) = oneshot::channel();
        let req = DispatchRequest {
            session_id,
            command,
            done: done_tx,
        };
        if dispatch_tx.send(req).is_err() {
            return CloseReason::ServerGone;
        }

        match done_rx.await {
            Ok(Disposition::KeepOpen) => {}
            Ok(Disposition::Close) => return CloseReason::Dispatch,
            Err(_) => return CloseReason::ServerGone,
        }
    }
}

/// Write queued output until told to close or the channel is dropped.
async fn run_writer(session_id: SessionId, mut write_stream: OwnedWriteHalf, mut out_rx: OutboundRx) {
    while let Some(msg) = out_rx.recv().await {
        match msg {
            Outbound::Text(text) => {
                let written = async {
                    write_stream.write_all(text.as_bytes()).await?;
                    write_stream.flush().await
                }
                .await;
                if let Err(e) = written {
                    debug!(session = session_id.0, error = %e, "write error");
                    return;
                }
            }
            Outbound::Close => break,
        }
    }

    let _ = write_stream.shutdown().await;
}
