// # File Key-Value Store
//
// File-based implementation of KeyValueStore with crash recovery.
//
// ## Purpose
//
// Keeps provisioned credentials across restarts on hosts where the store is
// a plain file (bench rigs, Linux gateways).
//
// ## Crash Recovery
//
// - Atomic writes: Uses write-then-rename for atomicity
// - Corruption detection: Validates JSON on load
// - Automatic backup: Keeps .backup of last known good state
// - Recovery: Falls back to backup if corruption detected
//
// ## File Format
//
// ```json
// {
//   "version": "1.0",
//   "entries": {
//     "wifi-station-provision": {
//       "value": [104, 111, 109, 101, 0, 0],
//       "updated_at": "2025-01-09T12:00:00Z"
//     }
//   }
// }
// ```

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::RwLock;

use crate::Error;
use crate::config::StoreConfig;
use crate::traits::kv_store::{KeyValueStore, KeyValueStoreFactory};

/// Store file format version
const STORE_FILE_VERSION: &str = "1.0";

/// A single stored value
#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredValue {
    value: Vec<u8>,
    updated_at: chrono::DateTime<chrono::Utc>,
}

/// File-based key-value store with crash recovery
///
/// Every mutation is written through immediately. `flush` only writes when a
/// previous write-through failed and left the store dirty.
///
/// # Example
///
/// ```rust,no_run
/// use stalink_core::state::FileKvStore;
/// use stalink_core::traits::KeyValueStore;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let store = FileKvStore::new("/var/lib/stalink/store.json").await?;
///     store.put("wifi-station-provision", b"...").await?;
///     Ok(())
/// }
/// ```
#[derive(Debug)]
pub struct FileKvStore {
    path: PathBuf,
    state: Arc<RwLock<FileState>>,
}

#[derive(Debug)]
struct FileState {
    entries: HashMap<String, StoredValue>,
    dirty: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoreFileFormat {
    version: String,
    entries: HashMap<String, StoredValue>,
}

impl FileKvStore {
    /// Create or load a file store
    ///
    /// This will:
    /// 1. Create parent directories if needed
    /// 2. Load the existing file
    /// 3. If it is corrupt, load the backup instead
    /// 4. If both fail, start empty
    pub async fn new<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            fs::create_dir_all(parent).await.map_err(|e| {
                Error::config(format!(
                    "Failed to create store directory {}: {}",
                    parent.display(),
                    e
                ))
            })?;
        }

        let entries = Self::load_with_recovery(&path).await?;

        Ok(Self {
            path,
            state: Arc::new(RwLock::new(FileState {
                entries,
                dirty: false,
            })),
        })
    }

    async fn load_with_recovery(path: &Path) -> Result<HashMap<String, StoredValue>, Error> {
        match Self::load(path).await {
            Ok(entries) => {
                tracing::debug!("Loaded store file: {} entries", entries.len());
                Ok(entries)
            }
            Err(Error::Json(e)) => {
                tracing::warn!(
                    "Store file {} appears corrupted: {}. Attempting recovery from backup.",
                    path.display(),
                    e
                );

                let backup_path = Self::backup_path(path);
                if !backup_path.exists() {
                    tracing::warn!("No backup file found. Starting with empty store.");
                    return Ok(HashMap::new());
                }

                match Self::load(&backup_path).await {
                    Ok(entries) => {
                        tracing::info!("Recovered store from backup: {} entries", entries.len());
                        if let Err(restore_err) = fs::copy(&backup_path, path).await {
                            tracing::error!(
                                "Failed to restore store file from backup: {}",
                                restore_err
                            );
                        }
                        Ok(entries)
                    }
                    Err(backup_err) => {
                        tracing::error!(
                            "Backup also unreadable: {}. Starting with empty store.",
                            backup_err
                        );
                        Ok(HashMap::new())
                    }
                }
            }
            Err(e) => Err(e),
        }
    }

    async fn load(path: &Path) -> Result<HashMap<String, StoredValue>, Error> {
        if !path.exists() {
            tracing::debug!("Store file does not exist: {}", path.display());
            return Ok(HashMap::new());
        }

        let content = fs::read_to_string(path).await.map_err(|e| {
            Error::state_store(format!(
                "Failed to read store file {}: {}",
                path.display(),
                e
            ))
        })?;

        let file: StoreFileFormat = serde_json::from_str(&content)?;

        if file.version != STORE_FILE_VERSION {
            tracing::warn!(
                "Store file version mismatch: expected {}, got {}. Loading anyway.",
                STORE_FILE_VERSION,
                file.version
            );
        }

        Ok(file.entries)
    }

    /// Write the whole store atomically
    async fn write(&self) -> Result<(), Error> {
        let json = {
            let guard = self.state.read().await;
            let file = StoreFileFormat {
                version: STORE_FILE_VERSION.to_string(),
                entries: guard.entries.clone(),
            };
            serde_json::to_string_pretty(&file)?
        };

        let temp_path = self.temp_path();
        {
            let mut file = fs::File::create(&temp_path).await.map_err(|e| {
                Error::state_store(format!(
                    "Failed to create temp file {}: {}",
                    temp_path.display(),
                    e
                ))
            })?;
            file.write_all(json.as_bytes()).await.map_err(|e| {
                Error::state_store(format!(
                    "Failed to write temp file {}: {}",
                    temp_path.display(),
                    e
                ))
            })?;
            file.flush().await.map_err(|e| {
                Error::state_store(format!(
                    "Failed to flush temp file {}: {}",
                    temp_path.display(),
                    e
                ))
            })?;
        }

        if self.path.exists()
            && let Err(e) = fs::copy(&self.path, Self::backup_path(&self.path)).await
        {
            tracing::warn!("Failed to create backup: {}", e);
        }

        fs::rename(&temp_path, &self.path).await.map_err(|e| {
            Error::state_store(format!(
                "Failed to rename {} to {}: {}",
                temp_path.display(),
                self.path.display(),
                e
            ))
        })?;

        self.state.write().await.dirty = false;
        tracing::trace!("Store written to file: {}", self.path.display());
        Ok(())
    }

    fn temp_path(&self) -> PathBuf {
        let mut temp = self.path.clone();
        temp.set_extension("tmp");
        temp
    }

    fn backup_path(path: &Path) -> PathBuf {
        let mut backup = path.to_path_buf();
        backup.set_extension("backup");
        backup
    }
}

#[async_trait]
impl KeyValueStore for FileKvStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, Error> {
        let guard = self.state.read().await;
        Ok(guard.entries.get(key).map(|v| v.value.clone()))
    }

    async fn put(&self, key: &str, value: &[u8]) -> Result<(), Error> {
        {
            let mut guard = self.state.write().await;
            guard.entries.insert(
                key.to_string(),
                StoredValue {
                    value: value.to_vec(),
                    updated_at: chrono::Utc::now(),
                },
            );
            guard.dirty = true;
        }
        self.write().await
    }

    async fn delete(&self, key: &str) -> Result<(), Error> {
        {
            let mut guard = self.state.write().await;
            if guard.entries.remove(key).is_none() {
                return Ok(());
            }
            guard.dirty = true;
        }
        self.write().await
    }

    async fn flush(&self) -> Result<(), Error> {
        if self.state.read().await.dirty {
            self.write().await
        } else {
            Ok(())
        }
    }
}

/// Factory for [`FileKvStore`]
pub struct FileKvStoreFactory;

#[async_trait]
impl KeyValueStoreFactory for FileKvStoreFactory {
    async fn create(&self, config: &StoreConfig) -> Result<Box<dyn KeyValueStore>, Error> {
        match config {
            StoreConfig::File { path } => Ok(Box::new(FileKvStore::new(path).await?)),
            _ => Err(Error::config("Invalid config for file store")),
        }
    }
}
