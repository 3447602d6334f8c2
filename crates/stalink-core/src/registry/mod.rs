//! Plugin-based key-value store registry
//!
//! The registry maps backend names to [`KeyValueStoreFactory`] objects so the
//! credential store backend is picked from configuration instead of a
//! hardcoded match.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use stalink_core::config::StoreConfig;
//! use stalink_core::registry::BackendRegistry;
//!
//! # async fn try_main() -> stalink_core::Result<()> {
//! let registry = BackendRegistry::with_builtin();
//! let store = registry
//!     .create_store(&StoreConfig::File {
//!         path: "/var/lib/stalink/store.json".to_string(),
//!     })
//!     .await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Registration
//!
//! Platform crates register their own flash/NVS backends under a name and
//! select them with `StoreConfig::Custom { factory: "<name>", .. }`.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use crate::config::StoreConfig;
use crate::error::{Error, Result};
use crate::state::{FileKvStoreFactory, MemoryKvStoreFactory};
use crate::traits::{KeyValueStore, KeyValueStoreFactory};

/// Registry of key-value store backends
///
/// ## Thread Safety
///
/// The registry uses interior mutability with RwLock, allowing concurrent
/// reads and exclusive writes.
#[derive(Default)]
pub struct BackendRegistry {
    stores: RwLock<HashMap<String, Arc<dyn KeyValueStoreFactory>>>,
}

impl BackendRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the `memory` and `file` backends
    pub fn with_builtin() -> Self {
        let registry = Self::new();
        registry.register_store("memory", Box::new(MemoryKvStoreFactory));
        registry.register_store("file", Box::new(FileKvStoreFactory));
        registry
    }

    /// Register a store factory, replacing any previous one with that name
    pub fn register_store(&self, name: impl Into<String>, factory: Box<dyn KeyValueStoreFactory>) {
        let mut stores = self.stores.write().unwrap_or_else(PoisonError::into_inner);
        stores.insert(name.into(), Arc::from(factory));
    }

    /// Create a store from configuration
    ///
    /// # Returns
    ///
    /// - `Ok(Box<dyn KeyValueStore>)`: Created store instance
    /// - `Err(Error)`: If the backend is not registered or creation fails
    pub async fn create_store(&self, config: &StoreConfig) -> Result<Box<dyn KeyValueStore>> {
        config.validate()?;

        let factory = {
            let stores = self.stores.read().unwrap_or_else(PoisonError::into_inner);
            stores
                .get(config.type_name())
                .cloned()
                .ok_or_else(|| {
                    Error::config(format!("Unknown store backend: {}", config.type_name()))
                })?
        };

        // Lock is released before the async create
        factory.create(config).await
    }

    /// List all registered backend names
    pub fn list_stores(&self) -> Vec<String> {
        let stores = self.stores.read().unwrap_or_else(PoisonError::into_inner);
        stores.keys().cloned().collect()
    }

    pub fn has_store(&self, name: &str) -> bool {
        let stores = self.stores.read().unwrap_or_else(PoisonError::into_inner);
        stores.contains_key(name)
    }
}
