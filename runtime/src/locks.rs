//! Keyed exclusive locks.
//!
//! One async mutex per key, created on demand. Holding the guard for an
//! event id serializes every read-decide-append sequence on that event
//! within this process; different keys never contend.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

/// Guard returned by [`KeyedLocks::lock`]. The key is released on drop.
pub type KeyGuard = OwnedMutexGuard<()>;

/// A set of async mutexes addressed by key.
///
/// # Example
///
/// ```
/// use signup_ledger_runtime::locks::KeyedLocks;
///
/// # tokio_test::block_on(async {
/// let locks = KeyedLocks::new();
/// let guard = locks.lock(&"event-73").await;
/// assert!(locks.try_lock(&"event-73").is_none());
/// assert!(locks.try_lock(&"event-74").is_some());
/// drop(guard);
/// assert!(locks.try_lock(&"event-73").is_some());
/// # });
/// ```
#[derive(Debug)]
pub struct KeyedLocks<K> {
    slots: Mutex<HashMap<K, Arc<AsyncMutex<()>>>>,
}

impl<K> Default for KeyedLocks<K> {
    fn default() -> Self {
        Self {
            slots: Mutex::new(HashMap::new()),
        }
    }
}

impl<K> KeyedLocks<K>
where
    K: Eq + Hash + Clone,
{
    /// Create an empty lock set
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to `key`.
    pub async fn lock(&self, key: &K) -> KeyGuard {
        self.slot(key).lock_owned().await
    }

    /// Take `key` if nobody holds it.
    #[must_use]
    pub fn try_lock(&self, key: &K) -> Option<KeyGuard> {
        self.slot(key).try_lock_owned().ok()
    }

    /// Number of keys currently tracked.
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Whether no key is tracked.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn slot(&self, key: &K) -> Arc<AsyncMutex<()>> {
        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);

        // Slots nobody holds or waits on only cost memory
        slots.retain(|k, slot| k == key || Arc::strong_count(slot) > 1);

        Arc::clone(slots.entry(key.clone()).or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn same_key_is_exclusive() {
        let locks = Arc::new(KeyedLocks::new());
        let guard = locks.lock(&"e1").await;

        let contender = {
            let locks = Arc::clone(&locks);
            tokio::spawn(async move {
                let _guard = locks.lock(&"e1").await;
            })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!contender.is_finished());

        drop(guard);
        assert!(contender.await.is_ok());
    }

    #[tokio::test]
    async fn released_keys_are_pruned() {
        let locks = KeyedLocks::new();
        for key in ["a", "b", "c"] {
            let _guard = locks.lock(&key).await;
        }
        let _held = locks.lock(&"d").await;

        assert_eq!(locks.len(), 1);
    }
}
