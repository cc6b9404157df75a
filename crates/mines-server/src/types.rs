//! Shared types for the minesweeper TCP server.
//!
//! This module defines:
//! - `SessionId`: a lightweight handle for connected clients
//! - channel aliases between sessions and the dispatch workers
//! - `DispatchRequest`: messages flowing from sessions to the workers
//! - the two shared resources: the engine (board) and the session registry

use std::collections::HashMap;
use std::sync::Arc;

use mines_core::{Command, MinesEngine};
use tokio::sync::{mpsc, oneshot, Mutex};

/// Identifier for a connected client.
///
/// This is intentionally opaque; we just guarantee uniqueness
/// over the lifetime of the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionId(pub u64);

/// Something for a session's writer to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outbound {
    /// Write this text verbatim.
    Text(String),

    /// Shut the connection down after everything queued before it.
    Close,
}

/// Outbound messages from the dispatch workers to a given session.
pub type OutboundTx = mpsc::UnboundedSender<Outbound>;
pub type OutboundRx = mpsc::UnboundedReceiver<Outbound>;

/// Registry of live sessions and their outbound channels.
///
/// Membership is the liveness flag: a session is live exactly while it has
/// an entry here. The player count in greetings is the registry length.
pub type SessionRegistry = Arc<Mutex<HashMap<SessionId, OutboundTx>>>;

/// The one board, behind one lock. Each command holds the lock for its
/// whole effect, cascade and render included.
pub type SharedEngine = Arc<Mutex<MinesEngine>>;

/// What the session should do once its request has been handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// Read the next line.
    KeepOpen,

    /// Stop reading; the connection is being closed.
    Close,
}

/// Message flowing from a session task into the dispatch workers.
#[derive(Debug)]
pub struct DispatchRequest {
    pub session_id: SessionId,
    pub command: Command,

    /// Fired once the command has been applied and its reply queued.
    pub done: oneshot::Sender<Disposition>,
}

/// Channel from sessions → dispatch workers.
pub type DispatchTx = mpsc::UnboundedSender<DispatchRequest>;
pub type DispatchRx = mpsc::UnboundedReceiver<DispatchRequest>;

/// Receiving end shared by the worker pool; one worker dequeues at a time.
pub type SharedDispatchRx = Arc<Mutex<DispatchRx>>;
