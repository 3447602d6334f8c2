// # Memory Key-Value Store
//
// In-memory implementation of KeyValueStore.
//
// ## Purpose
//
// Provides a simple, fast store that doesn't persist across restarts.
// Useful for testing and for devices that are re-provisioned on every boot.
//
// ## Crash Behavior
//
// - All values are lost on restart/crash
// - The station boots unprovisioned and stays idle until provisioned again

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::Error;
use crate::config::StoreConfig;
use crate::traits::kv_store::{KeyValueStore, KeyValueStoreFactory};

/// In-memory key-value store
///
/// Values live in a HashMap protected by a RwLock. Clones share the same map.
///
/// # Example
///
/// ```rust,no_run
/// use stalink_core::state::MemoryKvStore;
/// use stalink_core::traits::KeyValueStore;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let store = MemoryKvStore::new();
///
///     store.put("wifi-station-provision", b"...").await?;
///     let value = store.get("wifi-station-provision").await?;
///     assert!(value.is_some());
///
///     Ok(())
/// }
/// ```
#[derive(Debug, Clone, Default)]
pub struct MemoryKvStore {
    inner: Arc<RwLock<HashMap<String, Vec<u8>>>>,
}

impl MemoryKvStore {
    /// Create a new empty memory store
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the number of keys in the store
    pub async fn len(&self) -> usize {
        self.inner.read().await.len()
    }

    /// Check if the store is empty
    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.is_empty()
    }
}

#[async_trait]
impl KeyValueStore for MemoryKvStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, Error> {
        let guard = self.inner.read().await;
        Ok(guard.get(key).cloned())
    }

    async fn put(&self, key: &str, value: &[u8]) -> Result<(), Error> {
        let mut guard = self.inner.write().await;
        guard.insert(key.to_string(), value.to_vec());
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), Error> {
        let mut guard = self.inner.write().await;
        guard.remove(key);
        Ok(())
    }

    async fn flush(&self) -> Result<(), Error> {
        // Nothing buffered
        Ok(())
    }
}

/// Factory for [`MemoryKvStore`]
pub struct MemoryKvStoreFactory;

#[async_trait]
impl KeyValueStoreFactory for MemoryKvStoreFactory {
    async fn create(&self, config: &StoreConfig) -> Result<Box<dyn KeyValueStore>, Error> {
        match config {
            StoreConfig::Memory => Ok(Box::new(MemoryKvStore::new())),
            _ => Err(Error::config("Invalid config for memory store")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_store_basic() {
        let store = MemoryKvStore::new();

        assert!(store.is_empty().await);

        store.put("a", b"one").await.unwrap();
        assert_eq!(store.len().await, 1);
        assert_eq!(store.get("a").await.unwrap(), Some(b"one".to_vec()));

        store.put("a", b"two").await.unwrap();
        assert_eq!(store.get("a").await.unwrap(), Some(b"two".to_vec()));

        store.delete("a").await.unwrap();
        assert_eq!(store.get("a").await.unwrap(), None);

        // Deleting a missing key is fine
        store.delete("a").await.unwrap();
    }

    #[tokio::test]
    async fn test_clones_share_state() {
        let store = MemoryKvStore::new();
        let other = store.clone();

        store.put("k", b"v").await.unwrap();
        assert_eq!(other.get("k").await.unwrap(), Some(b"v".to_vec()));
    }

    #[tokio::test]
    async fn test_factory_rejects_file_config() {
        let config = StoreConfig::File {
            path: "/tmp/x.json".to_string(),
        };
        assert!(MemoryKvStoreFactory.create(&config).await.is_err());
        assert!(MemoryKvStoreFactory.create(&StoreConfig::Memory).await.is_ok());
    }
}
