use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

type Key = (String, String);

/// Async mutexes keyed by `(name, host_type)`.
///
/// Field saves hold one across the name-taken check and the write, so two
/// saves racing for the same name cannot both pass the check. A slot lives
/// only while some save holds or waits on it.
#[derive(Debug, Default)]
pub(crate) struct NameLocks {
    slots: Mutex<HashMap<Key, Arc<AsyncMutex<()>>>>,
}

/// Held name lock. Dropping it releases the slot and removes it from the
/// map when nobody else is waiting.
#[derive(Debug)]
pub(crate) struct NameGuard<'a> {
    locks: &'a NameLocks,
    key: Key,
    guard: Option<OwnedMutexGuard<()>>,
}

impl NameLocks {
    pub(crate) async fn acquire(&self, name: &str, host_type: &str) -> NameGuard<'_> {
        let key = (name.to_string(), host_type.to_string());
        let slot = Arc::clone(self.table().entry(key.clone()).or_default());
        let guard = slot.lock_owned().await;
        NameGuard {
            locks: self,
            key,
            guard: Some(guard),
        }
    }

    fn table(&self) -> std::sync::MutexGuard<'_, HashMap<Key, Arc<AsyncMutex<()>>>> {
        self.slots.lock().unwrap_or_else(PoisonError::into_inner)
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.table().len()
    }
}

impl Drop for NameGuard<'_> {
    fn drop(&mut self) {
        drop(self.guard.take());
        let mut slots = self.locks.table();
        // The map's own reference is the only one left.
        if slots
            .get(&self.key)
            .is_some_and(|slot| Arc::strong_count(slot) == 1)
        {
            slots.remove(&self.key);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn same_key_is_exclusive() {
        let locks = Arc::new(NameLocks::default());
        let guard = locks.acquire("age", "Author").await;

        let other = Arc::clone(&locks);
        let waiter = tokio::spawn(async move {
            let _g = other.acquire("age", "Author").await;
        });
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!waiter.is_finished());

        // a different key does not wait
        let _free = locks.acquire("age", "Post").await;

        drop(guard);
        waiter.await.unwrap();
    }

    #[tokio::test]
    async fn released_slots_are_removed() {
        let locks = Arc::new(NameLocks::default());
        for name in ["age", "rank", "bio"] {
            let _g = locks.acquire(name, "Author").await;
            assert_eq!(locks.len(), 1);
        }
        assert_eq!(locks.len(), 0);

        let guard = locks.acquire("age", "Author").await;
        let other = Arc::clone(&locks);
        let waiter = tokio::spawn(async move {
            let _g = other.acquire("age", "Author").await;
        });
        tokio::time::sleep(Duration::from_millis(20)).await;
        drop(guard);
        // the waiter still holds the slot
        waiter.await.unwrap();
        assert_eq!(locks.len(), 0);
    }
}
