//! Provisioned station credentials
//!
//! [`CredentialStore`] is the only code that knows how credentials are laid
//! out in the key-value store. The record lives under [`PROVISION_KEY`] as a
//! fixed 96-byte blob, no version header:
//!
//! ```text
//! +----------------------+----------------------------------------+
//! | ssid (32, NUL-padded)| key (64, NUL-padded)                   |
//! +----------------------+----------------------------------------+
//! ```

use std::fmt;

use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::traits::KeyValueStore;

/// Key of the provisioning record in the key-value store
pub const PROVISION_KEY: &str = "wifi-station-provision";

/// Maximum SSID length in bytes
pub const MAX_SSID_LEN: usize = 32;

/// Maximum passphrase/key length in bytes
pub const MAX_KEY_LEN: usize = 64;

const RECORD_LEN: usize = MAX_SSID_LEN + MAX_KEY_LEN;

/// Station credentials
#[derive(Clone, PartialEq, Eq)]
pub struct ProvisioningRecord {
    ssid: Vec<u8>,
    key: Vec<u8>,
}

impl ProvisioningRecord {
    /// Build a record, checking field lengths
    ///
    /// Neither field may contain NUL bytes, since NUL is the padding byte.
    pub fn new(ssid: impl Into<Vec<u8>>, key: impl Into<Vec<u8>>) -> Result<Self> {
        let ssid = ssid.into();
        let key = key.into();

        if ssid.len() > MAX_SSID_LEN {
            return Err(Error::invalid_input(format!(
                "SSID is {} bytes (max {})",
                ssid.len(),
                MAX_SSID_LEN
            )));
        }
        if key.len() > MAX_KEY_LEN {
            return Err(Error::invalid_input(format!(
                "key is {} bytes (max {})",
                key.len(),
                MAX_KEY_LEN
            )));
        }
        if ssid.contains(&0) || key.contains(&0) {
            return Err(Error::invalid_input("credentials must not contain NUL bytes"));
        }

        Ok(Self { ssid, key })
    }

    pub fn ssid(&self) -> &[u8] {
        &self.ssid
    }

    pub fn key(&self) -> &[u8] {
        &self.key
    }

    /// SSID for display, lossy for non-UTF-8 names
    pub fn ssid_lossy(&self) -> String {
        String::from_utf8_lossy(&self.ssid).into_owned()
    }

    /// A non-empty SSID is the provisioning predicate
    pub fn is_provisioned(&self) -> bool {
        !self.ssid.is_empty()
    }

    fn encode(&self) -> [u8; RECORD_LEN] {
        let mut blob = [0u8; RECORD_LEN];
        blob[..self.ssid.len()].copy_from_slice(&self.ssid);
        blob[MAX_SSID_LEN..MAX_SSID_LEN + self.key.len()].copy_from_slice(&self.key);
        blob
    }

    fn decode(blob: &[u8]) -> Result<Self> {
        if blob.len() != RECORD_LEN {
            return Err(Error::state_store(format!(
                "provisioning record is {} bytes, expected {}",
                blob.len(),
                RECORD_LEN
            )));
        }

        let (ssid, key) = blob.split_at(MAX_SSID_LEN);
        Ok(Self {
            ssid: until_nul(ssid).to_vec(),
            key: until_nul(key).to_vec(),
        })
    }
}

fn until_nul(field: &[u8]) -> &[u8] {
    let end = field.iter().position(|b| *b == 0).unwrap_or(field.len());
    &field[..end]
}

impl fmt::Debug for ProvisioningRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProvisioningRecord")
            .field("ssid", &self.ssid_lossy())
            .field("key", &"<redacted>")
            .finish()
    }
}

/// Reads and writes the provisioning record through a [`KeyValueStore`]
pub struct CredentialStore {
    store: Box<dyn KeyValueStore>,
}

impl CredentialStore {
    pub fn new(store: Box<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// Whether a record with a non-empty SSID is stored
    ///
    /// Read-only. Store failures and corrupt records are logged and count as
    /// "not provisioned".
    pub async fn is_provisioned(&self) -> bool {
        self.check_provisioned().await.unwrap_or(false)
    }

    /// Like [`is_provisioned`](Self::is_provisioned), but reports whether
    /// the answer came from a successful load
    ///
    /// Failures are logged here; callers only decide whether to retry.
    pub async fn check_provisioned(&self) -> Result<bool> {
        match self.load().await {
            Ok(record) => Ok(record.is_some_and(|r| r.is_provisioned())),
            Err(e) => {
                warn!("Failed to read provisioning record: {}", e);
                Err(e)
            }
        }
    }

    /// Read the stored record
    ///
    /// # Returns
    ///
    /// - `Ok(Some(record))`: A record is stored
    /// - `Ok(None)`: Nothing stored (unprovisioned, not an error)
    /// - `Err(Error)`: Store failure or corrupt record
    pub async fn load(&self) -> Result<Option<ProvisioningRecord>> {
        match self.store.get(PROVISION_KEY).await? {
            Some(blob) => ProvisioningRecord::decode(&blob).map(Some),
            None => Ok(None),
        }
    }

    /// Persist `record`, replacing any previous one
    pub async fn save(&self, record: &ProvisioningRecord) -> Result<()> {
        debug!("Saving provisioning record for SSID {}", record.ssid_lossy());
        self.store.put(PROVISION_KEY, &record.encode()).await?;
        self.store.flush().await
    }

    /// Remove the stored record
    pub async fn clear(&self) -> Result<()> {
        debug!("Clearing provisioning record");
        self.store.delete(PROVISION_KEY).await?;
        self.store.flush().await
    }

    /// Flush the underlying store
    pub async fn flush(&self) -> Result<()> {
        self.store.flush().await
    }
}
