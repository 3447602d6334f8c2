// # Key-Value Store Trait
//
// Defines the interface of the persistent key-value store that holds the
// provisioned station credentials.
//
// ## Implementations
//
// - In-memory: `MemoryKvStore`
// - JSON file with crash recovery: `FileKvStore`
//
// ## Usage
//
// ```rust,ignore
// use stalink_core::KeyValueStore;
//
// store.put("wifi-station-provision", &blob).await?;
// let blob = store.get("wifi-station-provision").await?; // Option<Vec<u8>>
// ```

use async_trait::async_trait;

/// Trait for key-value store implementations
///
/// Absent keys are not errors: `get` returns `Ok(None)`.
///
/// # Trust Level: Trusted (Core Component)
///
/// ## Allowed Capabilities
/// - ✅ Perform I/O for persistent storage
/// - ✅ Cache values in memory (with explicit flush)
///
/// ## Forbidden Capabilities
/// - ❌ Interpret stored values (owned by `CredentialStore`)
/// - ❌ Talk to the radio driver
/// - ❌ Spawn background tasks
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Read the value stored under `key`
    ///
    /// # Returns
    ///
    /// - `Ok(Some(bytes))`: Value found
    /// - `Ok(None)`: No value stored
    /// - `Err(Error)`: Storage error
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, crate::Error>;

    /// Create or replace the value stored under `key`
    async fn put(&self, key: &str, value: &[u8]) -> Result<(), crate::Error>;

    /// Remove `key` (succeeds if it did not exist)
    async fn delete(&self, key: &str) -> Result<(), crate::Error>;

    /// Persist any pending changes
    async fn flush(&self) -> Result<(), crate::Error>;
}

/// Helper trait for constructing key-value stores from configuration
#[async_trait]
pub trait KeyValueStoreFactory: Send + Sync {
    /// Create a store instance from configuration
    async fn create(
        &self,
        config: &crate::config::StoreConfig,
    ) -> Result<Box<dyn KeyValueStore>, crate::Error>;
}
