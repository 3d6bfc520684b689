//! Exclusivity lock records.

use tokio::time::{Duration, Instant};

/// Processing rights for one resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionLock {
    pub resource_id: String,
    pub owner: String,
    pub user_id: Option<String>,
    pub last_activity_at: Instant,
    pub is_processing: bool,
    /// Bumped on every grant; a [`Lease`] only acts on the generation it was issued for.
    pub generation: u64,
}

impl SessionLock {
    pub(crate) fn new(
        resource_id: &str,
        owner: &str,
        user_id: Option<&str>,
        now: Instant,
        generation: u64,
    ) -> Self {
        Self {
            resource_id: resource_id.to_string(),
            owner: owner.to_string(),
            user_id: user_id.map(str::to_string),
            last_activity_at: now,
            is_processing: true,
            generation,
        }
    }

    /// Whether `client_instance` may take the lock right now.
    pub fn admits(&self, client_instance: &str) -> bool {
        !self.is_processing || self.owner == client_instance
    }

    pub(crate) fn grant(&mut self, owner: &str, user_id: Option<&str>, now: Instant, generation: u64) {
        if self.owner != owner {
            self.owner = owner.to_string();
        }
        if user_id.is_some() {
            self.user_id = user_id.map(str::to_string);
        }
        self.is_processing = true;
        self.generation = generation;
        self.touch(now);
    }

    /// Refresh activity; never moves backwards.
    pub(crate) fn touch(&mut self, now: Instant) {
        if now > self.last_activity_at {
            self.last_activity_at = now;
        }
    }

    pub fn idle_for(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.last_activity_at)
    }

    /// Strictly older than `inactivity`.
    pub fn is_expired(&self, now: Instant, inactivity: Duration) -> bool {
        self.idle_for(now) > inactivity
    }

    pub fn lease(&self) -> Lease {
        Lease {
            resource_id: self.resource_id.clone(),
            owner: self.owner.clone(),
            generation: self.generation,
        }
    }
}

/// Proof of one grant, handed back on release.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lease {
    resource_id: String,
    owner: String,
    generation: u64,
}

impl Lease {
    pub fn resource_id(&self) -> &str {
        &self.resource_id
    }

    pub fn owner(&self) -> &str {
        &self.owner
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Acquisition {
    Granted(Lease),
    Conflict { owner: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn touch_never_moves_backwards() {
        let t0 = Instant::now();
        let later = t0 + Duration::from_secs(10);
        let mut lock = SessionLock::new("chat-1", "a", None, later, 1);

        lock.touch(t0);
        assert_eq!(lock.last_activity_at, later);

        lock.touch(later + Duration::from_secs(1));
        assert_eq!(lock.last_activity_at, later + Duration::from_secs(1));
    }

    #[test]
    fn expiry_is_strict() {
        let t0 = Instant::now();
        let lock = SessionLock::new("chat-1", "a", None, t0, 1);
        let window = Duration::from_secs(1800);

        assert!(!lock.is_expired(t0 + window, window));
        assert!(lock.is_expired(t0 + window + Duration::from_millis(1), window));
    }

    #[test]
    fn idle_lock_admits_anyone_busy_lock_only_owner() {
        let mut lock = SessionLock::new("chat-1", "a", Some("u1"), Instant::now(), 1);
        assert!(lock.admits("a"));
        assert!(!lock.admits("b"));

        lock.is_processing = false;
        assert!(lock.admits("b"));
    }

    #[test]
    fn grant_keeps_user_when_none_given() {
        let now = Instant::now();
        let mut lock = SessionLock::new("chat-1", "a", Some("u1"), now, 1);
        lock.is_processing = false;
        lock.grant("b", None, now, 2);

        assert_eq!(lock.owner, "b");
        assert_eq!(lock.user_id.as_deref(), Some("u1"));
        assert_eq!(lock.lease().generation(), 2);
        assert!(lock.is_processing);
    }
}
