//! Configuration types for the station link engine

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::policy::StationMode;

/// Main configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LinkConfig {
    /// Engine settings
    #[serde(default)]
    pub engine: EngineConfig,

    /// Credential store backend
    #[serde(default)]
    pub store: StoreConfig,

    /// Mode applied right after boot
    #[serde(default)]
    pub initial_mode: StationMode,
}

impl LinkConfig {
    /// Create a new configuration with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.initial_mode == StationMode::NotSupported {
            return Err(crate::Error::config(
                "Initial station mode cannot be NotSupported",
            ));
        }

        self.engine.validate()?;
        self.store.validate()?;

        Ok(())
    }
}

/// Credential store configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StoreConfig {
    /// File-based store
    File {
        /// Path to the store file
        path: String,
    },

    /// In-memory store (not persistent)
    #[default]
    Memory,

    /// Store created by a registered custom factory
    Custom {
        /// Factory name to use
        factory: String,
        /// Custom configuration data
        config: serde_json::Value,
    },
}

impl StoreConfig {
    /// Validate the store configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        match self {
            StoreConfig::File { path } => {
                if path.is_empty() {
                    return Err(crate::Error::config("File store path cannot be empty"));
                }
                Ok(())
            }
            StoreConfig::Custom { factory, config } => {
                if factory.is_empty() {
                    return Err(crate::Error::config("Custom store factory cannot be empty"));
                }
                if config.is_null() {
                    return Err(crate::Error::config("Custom store config cannot be null"));
                }
                Ok(())
            }
            StoreConfig::Memory => Ok(()),
        }
    }

    /// Registry name of the backend
    pub fn type_name(&self) -> &str {
        match self {
            StoreConfig::File { .. } => "file",
            StoreConfig::Memory => "memory",
            StoreConfig::Custom { factory, .. } => factory,
        }
    }
}

/// Engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Fixed wait after a failed connection attempt (in milliseconds)
    ///
    /// Every failure waits exactly this long, measured from the failure,
    /// before the next attempt.
    #[serde(default = "default_reconnect_interval_ms")]
    pub reconnect_interval_ms: u64,

    /// Capacity of the outbound device-event channel
    ///
    /// When full, new events are dropped (with a warning log).
    #[serde(default = "default_event_channel_capacity")]
    pub event_channel_capacity: usize,
}

impl EngineConfig {
    pub fn reconnect_interval(&self) -> Duration {
        Duration::from_millis(self.reconnect_interval_ms)
    }

    /// Validate the engine configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.reconnect_interval_ms == 0 {
            return Err(crate::Error::config("Reconnect interval must be > 0"));
        }
        if self.event_channel_capacity == 0 {
            return Err(crate::Error::config("Event channel capacity must be > 0"));
        }
        Ok(())
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            reconnect_interval_ms: default_reconnect_interval_ms(),
            event_channel_capacity: default_event_channel_capacity(),
        }
    }
}

fn default_reconnect_interval_ms() -> u64 {
    5_000
}

fn default_event_channel_capacity() -> usize {
    64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = LinkConfig::new();
        assert!(config.validate().is_ok());
        assert_eq!(config.initial_mode, StationMode::Disabled);
        assert_eq!(config.engine.reconnect_interval(), Duration::from_secs(5));
    }

    #[test]
    fn zero_interval_is_rejected() {
        let mut config = LinkConfig::new();
        config.engine.reconnect_interval_ms = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn not_supported_initial_mode_is_rejected() {
        let config = LinkConfig {
            initial_mode: StationMode::NotSupported,
            ..LinkConfig::new()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn deserializes_tagged_store_config() {
        let config: LinkConfig = serde_json::from_str(
            r#"{
                "initial_mode": "enabled",
                "store": { "type": "file", "path": "/var/lib/stalink/store.json" },
                "engine": { "reconnect_interval_ms": 250 }
            }"#,
        )
        .unwrap();

        assert_eq!(config.initial_mode, StationMode::Enabled);
        assert_eq!(config.store.type_name(), "file");
        assert_eq!(config.engine.reconnect_interval_ms, 250);
        assert_eq!(config.engine.event_channel_capacity, 64);
    }

    #[test]
    fn empty_file_path_is_rejected() {
        let store = StoreConfig::File {
            path: String::new(),
        };
        assert!(store.validate().is_err());
    }
}
