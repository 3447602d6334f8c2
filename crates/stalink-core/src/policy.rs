//! Desired station policy and observed reconciliation state
//!
//! [`PolicyState`] is plain data. It is mutated only by the
//! [`ConnectivityManager`](crate::engine::ConnectivityManager) running on the
//! single event-processing task; nothing in here performs I/O.

use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::time::{Duration, Instant};

use crate::error::{Error, Result};

/// Desired policy for the station interface
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum StationMode {
    /// Station is not managed; reconciliation is a no-op
    #[default]
    Disabled,
    /// Keep the station connected whenever it is provisioned
    Enabled,
    /// The application owns the link; never torn down by reconciliation
    ApplicationControlled,
    /// Sentinel reported by platforms without station support; never accepted as input
    NotSupported,
}

impl StationMode {
    /// Stable name used in log output
    pub fn as_str(&self) -> &'static str {
        match self {
            StationMode::Disabled => "Disabled",
            StationMode::Enabled => "Enabled",
            StationMode::ApplicationControlled => "ApplicationControlled",
            StationMode::NotSupported => "NotSupported",
        }
    }
}

impl fmt::Display for StationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Observed reconciliation state of the station
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum StationState {
    #[default]
    NotConnected,
    Connecting,
    ConnectingSucceeded,
    ConnectingFailed,
    Connected,
    Disconnecting,
}

impl StationState {
    /// Stable name used in log output
    pub fn as_str(&self) -> &'static str {
        match self {
            StationState::NotConnected => "NotConnected",
            StationState::Connecting => "Connecting",
            StationState::ConnectingSucceeded => "Connecting_Succeeded",
            StationState::ConnectingFailed => "Connecting_Failed",
            StationState::Connected => "Connected",
            StationState::Disconnecting => "Disconnecting",
        }
    }
}

impl fmt::Display for StationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Backoff bookkeeping for reconnection attempts
///
/// The interval is fixed and always measured from the most recent failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectBookkeeping {
    last_failure: Option<Instant>,
    reconnect_interval: Duration,
}

impl ReconnectBookkeeping {
    pub fn new(reconnect_interval: Duration) -> Self {
        Self {
            last_failure: None,
            reconnect_interval,
        }
    }

    pub fn reconnect_interval(&self) -> Duration {
        self.reconnect_interval
    }

    pub fn last_failure(&self) -> Option<Instant> {
        self.last_failure
    }

    /// Enter backoff, starting from `now`
    pub fn record_failure(&mut self, now: Instant) {
        self.last_failure = Some(now);
    }

    pub fn clear(&mut self) {
        self.last_failure = None;
    }

    /// Time left before a reconnect is permitted, or `None` if one is permitted now
    pub fn remaining(&self, now: Instant) -> Option<Duration> {
        let failed_at = self.last_failure?;
        let ready_at = failed_at + self.reconnect_interval;
        if now >= ready_at {
            None
        } else {
            Some(ready_at - now)
        }
    }
}

/// Desired mode, observed state and backoff bookkeeping
#[derive(Debug, Clone)]
pub struct PolicyState {
    mode: StationMode,
    state: StationState,
    reconnect: ReconnectBookkeeping,
}

impl PolicyState {
    /// Boot-time policy: `Disabled`, `NotConnected`, no backoff pending
    pub fn new(reconnect_interval: Duration) -> Self {
        Self {
            mode: StationMode::Disabled,
            state: StationState::NotConnected,
            reconnect: ReconnectBookkeeping::new(reconnect_interval),
        }
    }

    pub fn mode(&self) -> StationMode {
        self.mode
    }

    pub fn state(&self) -> StationState {
        self.state
    }

    pub fn reconnect(&self) -> &ReconnectBookkeeping {
        &self.reconnect
    }

    pub(crate) fn reconnect_mut(&mut self) -> &mut ReconnectBookkeeping {
        &mut self.reconnect
    }

    /// Apply a new desired mode
    ///
    /// Returns `Ok(true)` when the stored mode changed. `NotSupported` is
    /// rejected and leaves the policy untouched.
    pub fn set_mode(&mut self, mode: StationMode) -> Result<bool> {
        if mode == StationMode::NotSupported {
            return Err(Error::UnsupportedMode(mode));
        }

        if self.mode == mode {
            return Ok(false);
        }

        tracing::info!("station mode change: {} -> {}", self.mode, mode);
        self.mode = mode;
        Ok(true)
    }

    /// Record a new observed state. Returns the previous state.
    pub(crate) fn set_state(&mut self, state: StationState) -> StationState {
        let previous = self.state;
        if previous != state {
            tracing::info!("station state change: {} -> {}", previous, state);
            self.state = state;
        }
        previous
    }
}
