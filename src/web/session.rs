//! Cookie-identified sessions, each owning a pending-file queue.

use crate::batch::PendingFiles;
use axum::http::{HeaderMap, header};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use uuid::Uuid;

pub const SESSION_COOKIE: &str = "voicebatch_session";

/// Queue of one session. Holding its lock serializes that session's requests.
pub type SessionQueue = Arc<Mutex<PendingFiles>>;

#[derive(Clone, Default)]
pub struct SessionStore {
    sessions: Arc<Mutex<HashMap<Uuid, SessionQueue>>>,
}

impl SessionStore {
    /// Queue for `id` without registering anything.
    ///
    /// Absent or unknown ids get a detached empty queue. The returned flag
    /// is `true` when the client must be sent a new cookie.
    pub async fn resolve(&self, id: Option<Uuid>) -> (Uuid, SessionQueue, bool) {
        let sessions = self.sessions.lock().await;
        match id {
            Some(id) => {
                let queue = sessions.get(&id).cloned().unwrap_or_default();
                (id, queue, false)
            }
            None => (Uuid::new_v4(), SessionQueue::default(), true),
        }
    }

    /// Queue for `id`, registered so that files pushed to it survive the request.
    ///
    /// Unknown ids (e.g. after a restart) keep their cookie value.
    pub async fn checkout(&self, id: Option<Uuid>) -> (Uuid, SessionQueue, bool) {
        let (id, is_new) = match id {
            Some(id) => (id, false),
            None => (Uuid::new_v4(), true),
        };
        let mut sessions = self.sessions.lock().await;
        let queue = sessions.entry(id).or_default().clone();
        tracing::debug!("Session {} checked out ({} active)", id, sessions.len());
        (id, queue, is_new)
    }

    /// Forget `id` once its queue is empty.
    ///
    /// A queue locked by another request is left alone; that request
    /// releases it when it finishes.
    pub async fn release(&self, id: Uuid) {
        let mut sessions = self.sessions.lock().await;
        let idle = match sessions.get(&id) {
            Some(queue) => queue.try_lock().map(|q| q.is_empty()).unwrap_or(false),
            None => return,
        };
        if idle {
            sessions.remove(&id);
            tracing::debug!("Session {} released ({} active)", id, sessions.len());
        }
    }

    pub async fn len(&self) -> usize {
        self.sessions.lock().await.len()
    }
}

/// Session id from the request's `Cookie` headers, if present and valid.
pub fn session_id_from_headers(headers: &HeaderMap) -> Option<Uuid> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .and_then(|(_, value)| Uuid::parse_str(value.trim()).ok())
}
