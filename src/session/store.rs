//! Lock storage.
//!
//! # Design Decisions
//! - Every decision for a resource runs inside one map-entry critical section
//! - Callers pass `now`, so a store is a pure function of its inputs
//! - The trait is the seam for a shared store across gateway instances

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tokio::time::{Duration, Instant};

use super::lock::{Acquisition, Lease, SessionLock};

pub trait SessionStore: Send + Sync + fmt::Debug {
    fn try_acquire(
        &self,
        resource_id: &str,
        client_instance: &str,
        user_id: Option<&str>,
        now: Instant,
    ) -> Acquisition;

    /// Clear `is_processing` if `lease` still names the current grant.
    /// Returns whether anything changed.
    fn release(&self, lease: &Lease, now: Instant) -> bool;

    /// Remove locks idle for longer than `inactivity`, busy or not.
    fn sweep(&self, now: Instant, inactivity: Duration) -> usize;

    fn get(&self, resource_id: &str) -> Option<SessionLock>;

    fn snapshot(&self) -> Vec<SessionLock>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Default)]
pub struct InMemorySessionStore {
    locks: DashMap<String, SessionLock>,
    generation: AtomicU64,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn next_generation(&self) -> u64 {
        self.generation.fetch_add(1, Ordering::Relaxed) + 1
    }
}

impl SessionStore for InMemorySessionStore {
    fn try_acquire(
        &self,
        resource_id: &str,
        client_instance: &str,
        user_id: Option<&str>,
        now: Instant,
    ) -> Acquisition {
        match self.locks.entry(resource_id.to_string()) {
            Entry::Vacant(entry) => {
                let lock = SessionLock::new(
                    resource_id,
                    client_instance,
                    user_id,
                    now,
                    self.next_generation(),
                );
                let lease = lock.lease();
                entry.insert(lock);
                Acquisition::Granted(lease)
            }
            Entry::Occupied(mut entry) => {
                let lock = entry.get_mut();
                if !lock.admits(client_instance) {
                    return Acquisition::Conflict {
                        owner: lock.owner.clone(),
                    };
                }
                lock.grant(client_instance, user_id, now, self.next_generation());
                Acquisition::Granted(lock.lease())
            }
        }
    }

    fn release(&self, lease: &Lease, now: Instant) -> bool {
        match self.locks.get_mut(lease.resource_id()) {
            Some(mut lock) if lock.generation == lease.generation() => {
                lock.is_processing = false;
                lock.touch(now);
                true
            }
            _ => false,
        }
    }

    fn sweep(&self, now: Instant, inactivity: Duration) -> usize {
        let mut removed = 0;
        self.locks.retain(|_, lock| {
            let keep = !lock.is_expired(now, inactivity);
            if !keep {
                removed += 1;
            }
            keep
        });
        removed
    }

    fn get(&self, resource_id: &str) -> Option<SessionLock> {
        self.locks.get(resource_id).map(|l| l.clone())
    }

    fn snapshot(&self) -> Vec<SessionLock> {
        self.locks.iter().map(|l| l.value().clone()).collect()
    }

    fn len(&self) -> usize {
        self.locks.len()
    }
}
