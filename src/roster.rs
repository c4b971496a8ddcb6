//! User roster.
//!
//! The live session collection is an insertion-ordered map keyed by
//! `SessionId` (stable identity) plus a cursor, so that a session can be
//! closed safely while iteration elsewhere is in progress without relying
//! on pointer identity or raw links.

use crate::session::{Session, SessionId};
use std::{collections::HashMap, sync::Arc};
use tokio::sync::RwLock;

#[derive(Default)]
struct RosterInner {
    order: Vec<SessionId>,
    sessions: HashMap<SessionId, Arc<Session>>,
    cursor: Option<SessionId>,
}

/// The live collection of authenticated and pending sessions.
#[derive(Default)]
pub struct Roster {
    inner: RwLock<RosterInner>,
}

impl Roster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts at the cursor (appends after the current cursor position;
    /// for a never-yet-populated roster this is simply the first entry).
    pub async fn add(&self, session: Arc<Session>) {
        let mut inner = self.inner.write().await;
        let id = session.id;
        inner.order.push(id);
        inner.sessions.insert(id, session);
        inner.cursor = Some(id);
    }

    /// Closes `id`: unlinks it and returns the previous node in insertion
    /// order, so a caller iterating the roster can continue safely after
    /// the deletion. When the roster becomes empty the cursor (and the
    /// return value) are `None`.
    pub async fn close(&self, id: SessionId) -> Option<Arc<Session>> {
        let mut inner = self.inner.write().await;
        let pos = inner.order.iter().position(|&s| s == id)?;
        inner.order.remove(pos);
        let removed = inner.sessions.remove(&id);
        if removed.is_none() {
            return None;
        }
        if inner.order.is_empty() {
            inner.cursor = None;
            return None;
        }
        let prev_pos = pos.checked_sub(1).unwrap_or(0);
        let prev_id = inner.order[prev_pos];
        if inner.cursor == Some(id) {
            inner.cursor = Some(prev_id);
        }
        inner.sessions.get(&prev_id).cloned()
    }

    /// Linear lookup by authenticated name.
    pub async fn find_by_name(&self, name: &str) -> Option<Arc<Session>> {
        let inner = self.inner.read().await;
        for id in &inner.order {
            if let Some(session) = inner.sessions.get(id) {
                if session.name().await == name {
                    return Some(Arc::clone(session));
                }
            }
        }
        None
    }

    /// All live sessions in insertion order; used by `who`/`yell`/`gyell`.
    pub async fn all(&self) -> Vec<Arc<Session>> {
        let inner = self.inner.read().await;
        inner
            .order
            .iter()
            .filter_map(|id| inner.sessions.get(id).cloned())
            .collect()
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.order.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}
