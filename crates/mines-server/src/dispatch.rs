//! Dispatch workers.
//!
//! A fixed pool of tasks shares one unbounded queue of `DispatchRequest`s
//! coming from every session. Each worker:
//! 1. dequeues the next request (one worker at a time holds the receiver),
//! 2. drops it if its session is no longer live,
//! 3. applies the command to the shared `MinesEngine` under the board lock,
//! 4. queues the reply text on the session's outbound channel and, when the
//!    reply ends the session, unregisters it and queues `Outbound::Close`,
//! 5. reports the outcome back through the request's `done` channel.
//!
//! Board consistency comes from the engine lock alone; the pool only adds
//! parallelism around it. Sessions wait for `done` before sending their next
//! line, so commands from one session are applied in order.

use mines_core::{Command, Reply};
use mines_protocol::format_reply;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::types::{
    Disposition, DispatchRequest, Outbound, OutboundTx, SessionId, SessionRegistry, SharedDispatchRx,
    SharedEngine,
};

/// State shared by every worker of the pool.
#[derive(Clone)]
pub struct Dispatcher {
    pub queue: SharedDispatchRx,
    pub engine: SharedEngine,
    pub sessions: SessionRegistry,

    /// Keep clients connected after a bomb hit.
    pub debug: bool,
}

/// Spawn `workers` worker tasks.
pub fn spawn_workers(dispatcher: Dispatcher, workers: usize) -> Vec<JoinHandle<()>> {
    (0..workers)
        .map(|worker_id| {
            let dispatcher = dispatcher.clone();
            tokio::spawn(async move {
                run_worker_loop(worker_id, dispatcher).await;
            })
        })
        .collect()
}

/// Run one worker until the queue is closed.
pub async fn run_worker_loop(worker_id: usize, dispatcher: Dispatcher) {
    debug!(worker_id, "dispatch worker started");

    loop {
        // Hold the receiver only for the dequeue itself.
        let next = {
            let mut queue = dispatcher.queue.lock().await;
            queue.recv().await
        };

        let Some(DispatchRequest {
            session_id,
            command,
            done,
        }) = next
        else {
            break;
        };

        let disposition = dispatcher.handle(session_id, command).await;

        // The session may have gone away while we were working.
        let _ = done.send(disposition);
    }

    info!(worker_id, "dispatch worker shutting down (queue closed)");
}

impl Dispatcher {
    /// Apply one command on behalf of `session_id` and route its reply.
    async fn handle(&self, session_id: SessionId, command: Command) -> Disposition {
        let out_tx = {
            let sessions = self.sessions.lock().await;
            sessions.get(&session_id).cloned()
        };
        let Some(out_tx) = out_tx else {
            debug!(session = session_id.0, ?command, "dropping command from closed session");
            return Disposition::Close;
        };

        let reply = {
            let mut engine = self.engine.lock().await;
            engine.process_command(command)
        };
        debug!(session = session_id.0, ?command, ?reply, "command applied");

        self.route_reply(session_id, &out_tx, &reply).await
    }

    /// Deliver a reply to its session.
    ///
    /// Routing policy:
    /// - `Goodbye`           => close, nothing written.
    /// - `Boom`              => `BOOM!`, then close unless in debug mode.
    /// - `Board`, `Help`     => text only.
    ///
    /// A session whose writer is gone is closed as well.
    async fn route_reply(&self, session_id: SessionId, out_tx: &OutboundTx, reply: &Reply) -> Disposition {
        if let Some(text) = format_reply(reply) {
            if out_tx.send(Outbound::Text(text)).is_err() {
                debug!(session = session_id.0, "session writer gone");
                self.close_session(session_id, out_tx).await;
                return Disposition::Close;
            }
        }

        let closes = match reply {
            Reply::Goodbye => true,
            Reply::Boom => !self.debug,
            Reply::Board(_) | Reply::Help => false,
        };

        if closes {
            info!(session = session_id.0, reason = ?reply, "closing session");
            self.close_session(session_id, out_tx).await;
            Disposition::Close
        } else {
            Disposition::KeepOpen
        }
    }

    /// Remove the session from the live set and tell its writer to stop.
    async fn close_session(&self, session_id: SessionId, out_tx: &OutboundTx) {
        {
            let mut sessions = self.sessions.lock().await;
            sessions.remove(&session_id);
        }
        let _ = out_tx.send(Outbound::Close);
    }
}
