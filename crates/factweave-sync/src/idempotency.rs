//! Idempotency-key tracking for event processing.
//!
//! The store is the only mutable shared state in the sync service, and
//! events arrive from concurrent request handlers, so the check-and-record
//! step must be a single atomic insert-if-absent.

use std::collections::HashSet;
use std::sync::Mutex;

/// Tracks idempotency keys already accepted for processing.
pub trait IdempotencyStore: Send + Sync {
    /// Record a key if unseen. Returns true when the key is new and the
    /// caller owns processing; false when it was already recorded.
    fn insert_if_absent(&self, key: &str) -> bool;
}

/// Process-local idempotency set. Keys survive for the lifetime of the
/// process only; a restart forgets them.
#[derive(Debug, Default)]
pub struct InMemoryIdempotencyStore {
    seen: Mutex<HashSet<String>>,
}

impl InMemoryIdempotencyStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.seen.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl IdempotencyStore for InMemoryIdempotencyStore {
    fn insert_if_absent(&self, key: &str) -> bool {
        self.seen.lock().unwrap().insert(key.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_first_insert_wins() {
        let store = InMemoryIdempotencyStore::new();
        assert!(store.insert_if_absent("evt-1"));
        assert!(!store.insert_if_absent("evt-1"));
        assert!(store.insert_if_absent("evt-2"));
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_concurrent_insert_admits_exactly_one() {
        let store = Arc::new(InMemoryIdempotencyStore::new());
        let handles: Vec<_> = (0..16)
            .map(|_| {
                let store = Arc::clone(&store);
                std::thread::spawn(move || store.insert_if_absent("contested"))
            })
            .collect();

        let admitted = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|&won| won)
            .count();
        assert_eq!(admitted, 1);
        assert_eq!(store.len(), 1);
    }
}
