//! TTL-capable key-value backend

use std::time::{Duration, Instant};

use async_trait::async_trait;
use dashmap::DashMap;

use crate::error::StoreError;

/// Key-value backend with per-entry TTLs
///
/// Per-key operations are atomic. `compare_and_delete` must check and remove
/// in one step so a caller can use it as a one-shot claim on a key.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn put(&self, key: &str, value: &str, ttl: Duration) -> Result<(), StoreError>;

    /// Returns the live value; expired entries read as absent.
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    async fn delete(&self, key: &str) -> Result<(), StoreError>;

    /// Deletes `key` only if it currently holds `expected`. Returns whether
    /// this call removed the entry.
    async fn compare_and_delete(&self, key: &str, expected: &str) -> Result<bool, StoreError>;
}

struct Entry {
    value: String,
    deadline: Instant,
}

impl Entry {
    fn live(&self) -> bool {
        Instant::now() < self.deadline
    }
}

/// In-memory backend
///
/// Expired entries are dropped when observed; there is no background sweeper.
pub struct MemoryStore {
    entries: DashMap<String, Entry>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn put(&self, key: &str, value: &str, ttl: Duration) -> Result<(), StoreError> {
        self.entries.insert(
            key.to_string(),
            Entry {
                value: value.to_string(),
                deadline: Instant::now() + ttl,
            },
        );
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let value = match self.entries.get(key) {
            Some(entry) if entry.live() => Some(entry.value.clone()),
            Some(_) => None,
            None => return Ok(None),
        };
        if value.is_none() {
            self.entries.remove_if(key, |_, entry| !entry.live());
        }
        Ok(value)
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        self.entries.remove(key);
        Ok(())
    }

    async fn compare_and_delete(&self, key: &str, expected: &str) -> Result<bool, StoreError> {
        Ok(self
            .entries
            .remove_if(key, |_, entry| entry.live() && entry.value == expected)
            .is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test]
    async fn put_get_delete() {
        let store = MemoryStore::new();
        store.put("k", "v", Duration::from_secs(60)).await.unwrap();
        assert_eq!(store.get("k").await.unwrap().as_deref(), Some("v"));

        store.delete("k").await.unwrap();
        assert_eq!(store.get("k").await.unwrap(), None);
    }

    #[tokio::test]
    async fn entries_expire() {
        let store = MemoryStore::new();
        store.put("k", "v", Duration::from_millis(30)).await.unwrap();
        assert!(store.get("k").await.unwrap().is_some());

        tokio::time::sleep(Duration::from_millis(60)).await;
        assert_eq!(store.get("k").await.unwrap(), None);
    }

    #[tokio::test]
    async fn overwrite_replaces_value_and_ttl() {
        let store = MemoryStore::new();
        store.put("k", "old", Duration::from_millis(10)).await.unwrap();
        store.put("k", "new", Duration::from_secs(60)).await.unwrap();

        tokio::time::sleep(Duration::from_millis(30)).await;
        assert_eq!(store.get("k").await.unwrap().as_deref(), Some("new"));
    }

    #[tokio::test]
    async fn compare_and_delete_checks_value() {
        let store = MemoryStore::new();
        store.put("k", "v", Duration::from_secs(60)).await.unwrap();

        assert!(!store.compare_and_delete("k", "other").await.unwrap());
        assert!(store.get("k").await.unwrap().is_some());

        assert!(store.compare_and_delete("k", "v").await.unwrap());
        assert_eq!(store.get("k").await.unwrap(), None);

        // A second attempt finds nothing to claim.
        assert!(!store.compare_and_delete("k", "v").await.unwrap());
    }

    #[tokio::test]
    async fn compare_and_delete_ignores_expired_entries() {
        let store = MemoryStore::new();
        store.put("k", "v", Duration::from_millis(20)).await.unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!store.compare_and_delete("k", "v").await.unwrap());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn compare_and_delete_has_one_winner() {
        let store = Arc::new(MemoryStore::new());
        store.put("k", "v", Duration::from_secs(60)).await.unwrap();

        let barrier = Arc::new(tokio::sync::Barrier::new(8));
        let mut tasks = Vec::new();
        for _ in 0..8 {
            let store = store.clone();
            let barrier = barrier.clone();
            tasks.push(tokio::spawn(async move {
                barrier.wait().await;
                store.compare_and_delete("k", "v").await.unwrap()
            }));
        }

        let mut winners = 0;
        for task in tasks {
            if task.await.unwrap() {
                winners += 1;
            }
        }
        assert_eq!(winners, 1);
    }
}
