//! Session store: in-memory map of live conversations.
//!
//! The map lock only guards handle lookup and insertion. Each session sits
//! behind its own mutex, so messages for different sessions never wait on
//! each other. Lock order is always session, then map.
//!
//! Lifecycle: an entry is created by the first message for its id and removed
//! when it expires. A concluded entry stays only so late messages can be
//! rejected, and is evicted once idle past the same timeout.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info};

use super::model::{Session, SessionState};

/// Shared handle to one session.
pub type SessionHandle = Arc<Mutex<Session>>;

/// In-memory session store.
pub struct SessionStore {
    sessions: RwLock<HashMap<String, SessionHandle>>,
}

impl SessionStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            sessions: RwLock::new(HashMap::new()),
        })
    }

    /// Handle for `session_id`, creating a fresh session when none exists.
    pub async fn get_or_create(&self, session_id: &str, now: DateTime<Utc>) -> SessionHandle {
        if let Some(handle) = self.sessions.read().await.get(session_id) {
            return Arc::clone(handle);
        }

        let mut sessions = self.sessions.write().await;
        let handle = sessions.entry(session_id.to_string()).or_insert_with(|| {
            debug!(session_id = %session_id, "Creating session");
            Arc::new(Mutex::new(Session::new(session_id, now)))
        });
        Arc::clone(handle)
    }

    pub async fn get(&self, session_id: &str) -> Option<SessionHandle> {
        self.sessions.read().await.get(session_id).cloned()
    }

    /// Remove `session_id` only if it still maps to `handle`.
    pub async fn remove_if_same(&self, session_id: &str, handle: &SessionHandle) -> bool {
        let mut sessions = self.sessions.write().await;
        match sessions.get(session_id) {
            Some(current) if Arc::ptr_eq(current, handle) => {
                sessions.remove(session_id);
                true
            }
            _ => false,
        }
    }

    /// Expire and remove every session idle longer than `timeout`, and evict
    /// concluded sessions idle that long. Returns only the newly expired
    /// sessions as they were when marked; evicted concluded sessions keep
    /// their state and are not returned.
    pub async fn expire_idle(&self, now: DateTime<Utc>, timeout: Duration) -> Vec<Session> {
        let handles: Vec<(String, SessionHandle)> = self
            .sessions
            .read()
            .await
            .iter()
            .map(|(id, h)| (id.clone(), Arc::clone(h)))
            .collect();

        let mut evict = Vec::new();
        let mut expired = Vec::new();
        for (id, handle) in handles {
            {
                let mut session = handle.lock().await;
                if !session.is_idle(now, timeout) {
                    continue;
                }
                match session.state {
                    SessionState::Concluded | SessionState::Expired => {}
                    SessionState::New | SessionState::Engaged => {
                        session.transition(SessionState::Expired);
                        expired.push(session.clone());
                    }
                }
            }
            evict.push((id, handle));
        }

        if evict.is_empty() {
            return Vec::new();
        }

        let mut sessions = self.sessions.write().await;
        for (id, handle) in &evict {
            if sessions.get(id).is_some_and(|h| Arc::ptr_eq(h, handle)) {
                sessions.remove(id);
            }
        }

        info!(
            expired = expired.len(),
            evicted = evict.len() - expired.len(),
            "Removed idle sessions"
        );
        expired
    }

    /// Number of sessions currently held.
    pub async fn count(&self) -> usize {
        self.sessions.read().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TIMEOUT: Duration = Duration::from_secs(30 * 60);

    #[tokio::test]
    async fn get_or_create_returns_same_handle() {
        let store = SessionStore::new();
        let now = Utc::now();
        let a = store.get_or_create("s1", now).await;
        let b = store.get_or_create("s1", now).await;
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(store.count().await, 1);
    }

    #[tokio::test]
    async fn unknown_session_is_absent() {
        let store = SessionStore::new();
        assert!(store.get("missing").await.is_none());
        assert_eq!(store.count().await, 0);
    }

    #[tokio::test]
    async fn expire_idle_removes_only_idle_sessions() {
        let store = SessionStore::new();
        let start = Utc::now();
        store.get_or_create("old", start).await;
        store
            .get_or_create("fresh", start + chrono::Duration::minutes(20))
            .await;

        let now = start + chrono::Duration::minutes(45);
        let expired = store.expire_idle(now, TIMEOUT).await;

        assert_eq!(expired.len(), 1);
        assert_eq!(expired[0].session_id, "old");
        assert_eq!(expired[0].state, SessionState::Expired);
        assert!(store.get("old").await.is_none());
        assert!(store.get("fresh").await.is_some());
    }

    #[tokio::test]
    async fn idle_concluded_sessions_are_evicted_without_expiring() {
        let store = SessionStore::new();
        let start = Utc::now();
        let handle = store.get_or_create("done", start).await;
        {
            let mut s = handle.lock().await;
            s.transition(SessionState::Engaged);
            s.transition(SessionState::Concluded);
        }

        // Still within the timeout: kept so late messages are rejected.
        let expired = store
            .expire_idle(start + chrono::Duration::minutes(10), TIMEOUT)
            .await;
        assert!(expired.is_empty());
        assert_eq!(store.count().await, 1);

        let expired = store
            .expire_idle(start + chrono::Duration::hours(2), TIMEOUT)
            .await;
        assert!(expired.is_empty());
        assert_eq!(store.count().await, 0);
        assert_eq!(handle.lock().await.state, SessionState::Concluded);
    }

    #[tokio::test]
    async fn remove_if_same_ignores_replaced_handle() {
        let store = SessionStore::new();
        let now = Utc::now();
        let first = store.get_or_create("s1", now).await;
        assert!(store.remove_if_same("s1", &first).await);

        let second = store.get_or_create("s1", now).await;
        assert!(!store.remove_if_same("s1", &first).await);
        assert!(store.get("s1").await.is_some_and(|h| Arc::ptr_eq(&h, &second)));
    }
}
