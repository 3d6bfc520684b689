//! Per-client concurrency admission.
//!
//! Tracks in-flight requests per client identity and refuses new ones above
//! the configured ceiling. Every admitted request holds an [`AdmissionPermit`]
//! that gives its slot back exactly once when dropped.

use std::fmt;
use std::sync::Arc;

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::Request,
    middleware::Next,
    response::{IntoResponse, Response},
};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::net::SocketAddr;

use crate::http::response::{hold_until_complete, GatewayError};
use crate::observability::metrics;

/// Storage for in-flight counters. The in-process map is the default; a
/// shared store can stand behind the same calls for multi-instance setups.
pub trait AdmissionStore: Send + Sync + fmt::Debug {
    /// Increment the count for `identity` unless it is already at `max`.
    /// Returns the new count, or the unchanged current count on rejection.
    fn try_admit(&self, identity: &str, max: usize) -> Result<usize, usize>;

    /// Decrement the count for `identity`, dropping the entry at zero.
    fn release(&self, identity: &str);

    fn in_flight(&self, identity: &str) -> usize;

    /// Current (identity, count) pairs.
    fn snapshot(&self) -> Vec<(String, usize)>;
}

/// DashMap-backed counters. The entry guard makes read-and-increment atomic
/// per identity.
#[derive(Debug, Default)]
pub struct InMemoryAdmissionStore {
    counts: DashMap<String, usize>,
}

impl InMemoryAdmissionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl AdmissionStore for InMemoryAdmissionStore {
    fn try_admit(&self, identity: &str, max: usize) -> Result<usize, usize> {
        match self.counts.entry(identity.to_string()) {
            Entry::Occupied(mut entry) => {
                let count = entry.get_mut();
                if *count >= max {
                    return Err(*count);
                }
                *count += 1;
                Ok(*count)
            }
            Entry::Vacant(entry) => {
                if max == 0 {
                    return Err(0);
                }
                entry.insert(1);
                Ok(1)
            }
        }
    }

    fn release(&self, identity: &str) {
        if let Entry::Occupied(mut entry) = self.counts.entry(identity.to_string()) {
            if *entry.get() <= 1 {
                entry.remove();
            } else {
                *entry.get_mut() -= 1;
            }
        }
    }

    fn in_flight(&self, identity: &str) -> usize {
        self.counts.get(identity).map(|c| *c).unwrap_or(0)
    }

    fn snapshot(&self) -> Vec<(String, usize)> {
        self.counts
            .iter()
            .map(|r| (r.key().clone(), *r.value()))
            .collect()
    }
}

/// Reserves and returns concurrency capacity per client.
#[derive(Debug, Clone)]
pub struct AdmissionController {
    store: Arc<dyn AdmissionStore>,
    max_concurrent: usize,
}

impl AdmissionController {
    pub fn new(max_concurrent: usize) -> Self {
        Self::with_store(Arc::new(InMemoryAdmissionStore::new()), max_concurrent)
    }

    pub fn with_store(store: Arc<dyn AdmissionStore>, max_concurrent: usize) -> Self {
        Self {
            store,
            max_concurrent,
        }
    }

    pub fn max_concurrent(&self) -> usize {
        self.max_concurrent
    }

    /// Reserve a slot for `identity`.
    pub fn admit(&self, identity: &str) -> Result<AdmissionPermit, GatewayError> {
        match self.store.try_admit(identity, self.max_concurrent) {
            Ok(_) => Ok(AdmissionPermit {
                store: Some(self.store.clone()),
                identity: identity.to_string(),
            }),
            Err(current) => {
                tracing::warn!(
                    client = %identity,
                    in_flight = current,
                    limit = self.max_concurrent,
                    "Concurrent request limit reached"
                );
                metrics::record_admission_rejected();
                Err(GatewayError::AdmissionRejected(identity.to_string()))
            }
        }
    }

    pub fn in_flight(&self, identity: &str) -> usize {
        self.store.in_flight(identity)
    }

    pub fn snapshot(&self) -> Vec<(String, usize)> {
        self.store.snapshot()
    }
}

/// A reserved slot. Released exactly once, on drop or via [`release`](Self::release).
#[must_use = "dropping the permit releases the slot immediately"]
pub struct AdmissionPermit {
    store: Option<Arc<dyn AdmissionStore>>,
    identity: String,
}

impl AdmissionPermit {
    pub fn identity(&self) -> &str {
        &self.identity
    }

    pub fn release(mut self) {
        self.release_once();
    }

    fn release_once(&mut self) {
        if let Some(store) = self.store.take() {
            store.release(&self.identity);
        }
    }
}

impl Drop for AdmissionPermit {
    fn drop(&mut self) {
        self.release_once();
    }
}

impl fmt::Debug for AdmissionPermit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AdmissionPermit")
            .field("identity", &self.identity)
            .field("released", &self.store.is_none())
            .finish()
    }
}

/// Middleware admitting every request by peer IP. The permit rides along
/// with the response body so the slot stays taken until the response is sent.
pub async fn admission_middleware(
    State(admission): State<Arc<AdmissionController>>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let identity = addr.ip().to_string();
    let permit = match admission.admit(&identity) {
        Ok(permit) => permit,
        Err(e) => return e.into_response(),
    };

    let response = next.run(request).await;
    hold_until_complete(response, permit)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn rejects_above_ceiling_and_leaves_counter_unchanged() {
        let controller = AdmissionController::new(100);
        let ip = "10.0.0.5";

        let permits: Vec<_> = (0..100).map(|_| controller.admit(ip).unwrap()).collect();
        assert_eq!(controller.in_flight(ip), 100);

        let rejected = controller.admit(ip);
        assert!(matches!(rejected, Err(GatewayError::AdmissionRejected(_))));
        assert_eq!(controller.in_flight(ip), 100);

        let mut permits = permits;
        drop(permits.pop());
        assert_eq!(controller.in_flight(ip), 99);

        let again = controller.admit(ip).unwrap();
        assert_eq!(controller.in_flight(ip), 100);
        drop(again);
        drop(permits);
        assert_eq!(controller.in_flight(ip), 0);
    }

    #[test]
    fn entry_removed_at_zero() {
        let store = Arc::new(InMemoryAdmissionStore::new());
        let controller = AdmissionController::with_store(store.clone(), 5);

        let a = controller.admit("1.1.1.1").unwrap();
        let b = controller.admit("2.2.2.2").unwrap();
        assert_eq!(store.snapshot().len(), 2);

        drop(a);
        drop(b);
        assert!(store.snapshot().is_empty());
    }

    #[test]
    fn explicit_release_is_not_repeated_on_drop() {
        let controller = AdmissionController::new(5);
        let first = controller.admit("ip").unwrap();
        let _second = controller.admit("ip").unwrap();

        first.release();
        assert_eq!(controller.in_flight("ip"), 1);
    }

    #[test]
    fn stray_release_never_goes_negative() {
        let store = InMemoryAdmissionStore::new();
        store.release("nobody");
        assert_eq!(store.in_flight("nobody"), 0);
        assert!(store.snapshot().is_empty());
    }

    #[test]
    fn concurrent_admit_release_nets_to_zero() {
        let controller = Arc::new(AdmissionController::new(1_000));
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let c = controller.clone();
                thread::spawn(move || {
                    for _ in 0..500 {
                        let permit = c.admit("shared").unwrap();
                        drop(permit);
                    }
                })
            })
            .collect();

        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(controller.in_flight("shared"), 0);
    }

    #[test]
    fn concurrent_admits_never_exceed_ceiling() {
        let controller = Arc::new(AdmissionController::new(10));
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let c = controller.clone();
                thread::spawn(move || {
                    (0..10).filter_map(|_| c.admit("burst").ok()).collect::<Vec<_>>()
                })
            })
            .collect();

        let held: Vec<AdmissionPermit> = handles
            .into_iter()
            .flat_map(|h| h.join().unwrap())
            .collect();
        assert_eq!(held.len(), 10);
        assert_eq!(controller.in_flight("burst"), 10);
    }
}
