//! CSRF state nonces for the OAuth login flow.
//!
//! A nonce is issued on `/login`, carried through the provider redirect as
//! the `state` query parameter, and consumed exactly once on `/callback`.
//! Entries expire after a TTL so abandoned logins cannot accumulate
//! unboundedly; stale entries are purged on issue and rejected on consume.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use rand::distributions::Alphanumeric;
use rand::Rng;

/// How long an issued nonce stays valid.
pub const STATE_TTL: Duration = Duration::from_secs(600);

/// Length of the random nonce string.
const NONCE_LEN: usize = 32;

/// In-memory single-use nonce store.
#[derive(Debug)]
pub struct StateStore {
    entries: Mutex<HashMap<String, Instant>>,
    ttl: Duration,
}

impl StateStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            ttl,
        }
    }

    /// Generates, records and returns a fresh nonce.
    ///
    /// Stale entries are swept here, bounding the store by login rate
    /// within one TTL window.
    pub fn issue(&self) -> String {
        let nonce: String = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(NONCE_LEN)
            .map(char::from)
            .collect();

        let now = Instant::now();
        let mut entries = self.entries.lock().expect("state store lock poisoned");
        let ttl = self.ttl;
        entries.retain(|_, created| now.duration_since(*created) < ttl);
        entries.insert(nonce.clone(), now);

        nonce
    }

    /// Consumes a nonce: returns true exactly once per issued, unexpired
    /// nonce. Unknown, already-consumed and stale nonces return false.
    pub fn consume(&self, nonce: &str) -> bool {
        let mut entries = self.entries.lock().expect("state store lock poisoned");
        match entries.remove(nonce) {
            Some(created) => created.elapsed() < self.ttl,
            None => false,
        }
    }

    /// Number of outstanding nonces (stale ones included until the next
    /// sweep).
    pub fn len(&self) -> usize {
        self.entries.lock().expect("state store lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for StateStore {
    fn default() -> Self {
        Self::new(STATE_TTL)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn issued_nonce_is_consumable_once() {
        let store = StateStore::default();
        let nonce = store.issue();

        assert!(store.consume(&nonce));
        // Second use of the same nonce fails.
        assert!(!store.consume(&nonce));
    }

    #[test]
    fn unknown_nonce_is_rejected() {
        let store = StateStore::default();
        assert!(!store.consume("bogus"));
    }

    #[test]
    fn nonces_are_unique_and_random_looking() {
        let store = StateStore::default();
        let a = store.issue();
        let b = store.issue();

        assert_eq!(a.len(), NONCE_LEN);
        assert_ne!(a, b);
        assert!(a.chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn stale_nonce_is_rejected() {
        let store = StateStore::new(Duration::ZERO);
        let nonce = store.issue();
        assert!(!store.consume(&nonce));
    }

    #[test]
    fn stale_entries_are_swept_on_issue() {
        let store = StateStore::new(Duration::ZERO);
        store.issue();
        store.issue();
        store.issue();

        // Each issue() sweeps everything older than the (zero) TTL, so only
        // the newest entry survives.
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn live_entries_survive_the_sweep() {
        let store = StateStore::default();
        let first = store.issue();
        let _second = store.issue();

        assert_eq!(store.len(), 2);
        assert!(store.consume(&first));
    }
}
