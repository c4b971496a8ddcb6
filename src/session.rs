//! Session types.
//!
//! A `Session` is the per-connection record the roster and the command
//! handlers see; it is deliberately decoupled from the TCP socket itself
//! (owned by the connection task in `server.rs`) so that other sessions'
//! handlers (`tell`, `yell`, ...) can address it without touching the
//! socket directly — outbound text goes through an mpsc channel that the
//! connection task drains onto the wire.

use std::{
    net::SocketAddr,
    sync::atomic::{AtomicU64, Ordering},
};
use tokio::sync::{mpsc, Mutex};

/// States, initial `NoName`; the session is removed on disconnect rather
/// than transitioning to an explicit terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
pub enum SessionState {
    NoName,
    AwaitingName,
    AwaitingPassword,
    Ready,
    Prompted,
    Executing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SessionId(u64);

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

impl SessionId {
    pub fn new() -> Self {
        SessionId(NEXT_ID.fetch_add(1, Ordering::SeqCst))
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

/// Something queued onto a session's outbox: either a complete line (the
/// writer appends the trailing newline) or a raw prompt fragment written
/// verbatim (the auth prompts, which share a line with the client's reply).
#[derive(Debug, Clone)]
pub enum OutboxMsg {
    Line(String),
    Raw(String),
}

/// A handle to a live connection. Cheaply cloned (`Arc`-wrapped by the
/// roster); mutable fields are behind async-aware locks since both the
/// owning connection task and handlers invoked from other connections'
/// tasks touch them.
pub struct Session {
    pub id: SessionId,
    pub peer_addr: SocketAddr,
    pub local_addr: SocketAddr,
    name: Mutex<String>,
    state: Mutex<SessionState>,
    outbox: mpsc::UnboundedSender<OutboxMsg>,
}

impl Session {
    pub fn new(
        peer_addr: SocketAddr,
        local_addr: SocketAddr,
        outbox: mpsc::UnboundedSender<OutboxMsg>,
    ) -> Self {
        Self {
            id: SessionId::new(),
            peer_addr,
            local_addr,
            name: Mutex::new(String::new()),
            state: Mutex::new(SessionState::NoName),
            outbox,
        }
    }

    pub async fn name(&self) -> String {
        self.name.lock().await.clone()
    }

    pub async fn set_name(&self, name: impl Into<String>) {
        *self.name.lock().await = name.into();
    }

    pub async fn state(&self) -> SessionState {
        *self.state.lock().await
    }

    pub async fn set_state(&self, state: SessionState) {
        *self.state.lock().await = state;
    }

    /// Queues a complete line to be written to this session's socket,
    /// terminated with a newline by the connection's writer task. Silently
    /// drops the write if the connection task has already gone away — the
    /// peer being gone is discovered on the next read, not surfaced here.
    pub fn send(&self, line: impl Into<String>) {
        let _ = self.outbox.send(OutboxMsg::Line(line.into()));
    }

    /// Queues a raw fragment (an auth prompt) written verbatim, without a
    /// trailing newline, since the client's reply shares that line.
    pub fn prompt(&self, text: impl Into<String>) {
        let _ = self.outbox.send(OutboxMsg::Raw(text.into()));
    }
}
