//! Session exclusivity manager.
//!
//! Sole owner of lock state. Requests go through [`try_acquire`] and hold a
//! [`SessionGuard`]; the sweeper goes through [`sweep`]. Nothing else touches
//! the store.
//!
//! [`try_acquire`]: SessionExclusivityManager::try_acquire
//! [`sweep`]: SessionExclusivityManager::sweep

use std::fmt;
use std::sync::Arc;

use tokio::time::{Duration, Instant};

use super::lock::{Acquisition, Lease, SessionLock};
use super::store::{InMemorySessionStore, SessionStore};
use crate::observability::metrics;

#[derive(Debug, Clone)]
pub struct SessionExclusivityManager {
    store: Arc<dyn SessionStore>,
    inactivity: Duration,
}

/// Outcome of [`SessionExclusivityManager::try_acquire`].
#[derive(Debug)]
pub enum SessionDecision {
    Granted(SessionGuard),
    Conflict { owner: String },
}

impl SessionExclusivityManager {
    pub fn new(inactivity: Duration) -> Self {
        Self::with_store(Arc::new(InMemorySessionStore::new()), inactivity)
    }

    pub fn with_store(store: Arc<dyn SessionStore>, inactivity: Duration) -> Self {
        Self { store, inactivity }
    }

    pub fn inactivity(&self) -> Duration {
        self.inactivity
    }

    pub fn try_acquire(
        &self,
        resource_id: &str,
        client_instance: &str,
        user_id: Option<&str>,
    ) -> SessionDecision {
        match self
            .store
            .try_acquire(resource_id, client_instance, user_id, Instant::now())
        {
            Acquisition::Granted(lease) => {
                tracing::debug!(
                    resource = %resource_id,
                    client = %client_instance,
                    generation = lease.generation(),
                    "Session lock granted"
                );
                SessionDecision::Granted(SessionGuard {
                    manager: Some(self.clone()),
                    lease,
                })
            }
            Acquisition::Conflict { owner } => {
                tracing::warn!(
                    resource = %resource_id,
                    requester = %client_instance,
                    owner = %owner,
                    "Session conflict: resource busy"
                );
                metrics::record_session_conflict();
                SessionDecision::Conflict { owner }
            }
        }
    }

    /// Returns false when the lease was superseded (swept, then re-acquired).
    pub fn release(&self, lease: &Lease) -> bool {
        let released = self.store.release(lease, Instant::now());
        if !released {
            tracing::debug!(
                resource = %lease.resource_id(),
                generation = lease.generation(),
                "Stale session lease ignored on release"
            );
        }
        released
    }

    pub fn sweep(&self) -> usize {
        let removed = self.store.sweep(Instant::now(), self.inactivity);
        let remaining = self.store.len();
        if removed > 0 {
            tracing::info!(removed, remaining, "Swept inactive session locks");
        }
        metrics::record_sessions_swept(removed);
        metrics::record_active_sessions(remaining);
        removed
    }

    pub fn get(&self, resource_id: &str) -> Option<SessionLock> {
        self.store.get(resource_id)
    }

    pub fn snapshot(&self) -> Vec<SessionLock> {
        self.store.snapshot()
    }

    pub fn len(&self) -> usize {
        self.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }
}

/// Held for the life of a guarded request. Releases its lease once.
#[must_use = "dropping the guard releases the lock immediately"]
pub struct SessionGuard {
    manager: Option<SessionExclusivityManager>,
    lease: Lease,
}

impl SessionGuard {
    pub fn lease(&self) -> &Lease {
        &self.lease
    }

    pub fn release(mut self) {
        self.release_once();
    }

    fn release_once(&mut self) {
        if let Some(manager) = self.manager.take() {
            manager.release(&self.lease);
        }
    }
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        self.release_once();
    }
}

impl fmt::Debug for SessionGuard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionGuard")
            .field("lease", &self.lease)
            .field("released", &self.manager.is_none())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manager() -> SessionExclusivityManager {
        SessionExclusivityManager::new(Duration::from_secs(30 * 60))
    }

    #[tokio::test]
    async fn conflict_then_success_after_release() {
        let manager = manager();

        let guard = match manager.try_acquire("chat-1", "client-a", Some("u1")) {
            SessionDecision::Granted(g) => g,
            other => panic!("expected grant, got {other:?}"),
        };

        match manager.try_acquire("chat-1", "client-b", Some("u2")) {
            SessionDecision::Conflict { owner } => assert_eq!(owner, "client-a"),
            other => panic!("expected conflict, got {other:?}"),
        }

        drop(guard);
        assert!(!manager.get("chat-1").unwrap().is_processing);
        assert!(matches!(
            manager.try_acquire("chat-1", "client-b", Some("u2")),
            SessionDecision::Granted(_)
        ));
    }

    #[tokio::test]
    async fn distinct_resources_do_not_interfere() {
        let manager = manager();
        let _a = manager.try_acquire("chat-1", "client-a", None);
        assert!(matches!(
            manager.try_acquire("chat-2", "client-b", None),
            SessionDecision::Granted(_)
        ));
        assert_eq!(manager.len(), 2);
    }

    #[tokio::test]
    async fn explicit_release_runs_once() {
        let manager = manager();
        let SessionDecision::Granted(first) = manager.try_acquire("chat-1", "a", None) else {
            panic!("expected grant");
        };
        let SessionDecision::Granted(second) = manager.try_acquire("chat-1", "a", None) else {
            panic!("expected re-entrant grant");
        };

        // The earlier lease was superseded by the re-entrant grant.
        first.release();
        assert!(manager.get("chat-1").unwrap().is_processing);

        second.release();
        assert!(!manager.get("chat-1").unwrap().is_processing);
    }

    #[tokio::test(start_paused = true)]
    async fn sweep_honours_inactivity_window() {
        let manager = manager();
        let guard = manager.try_acquire("chat-2", "a", None);

        tokio::time::advance(Duration::from_secs(30 * 60)).await;
        assert_eq!(manager.sweep(), 0);

        tokio::time::advance(Duration::from_secs(60)).await;
        assert_eq!(manager.sweep(), 1);
        assert!(manager.is_empty());

        drop(guard);
        assert!(manager.get("chat-2").is_none());
    }
}
