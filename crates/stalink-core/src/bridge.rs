//! Producer side of the engine queue
//!
//! Everything that runs outside the event-processing task talks to the engine
//! through here:
//!
//! ```text
//!  driver callback ──► EventBridge ──┐
//!                                    ├──► EventPoster ──► [queue] ──► ConnectivityManager
//!  application     ──► LinkHandle  ──┘                                      │
//!                        ▲                                                  │
//!                        └──────────── watch<StationStatus> ◄───────────────┘
//! ```
//!
//! The queue is unbounded: a driver callback must never block or lose a
//! status report.

use tokio::sync::{mpsc, watch};
use tracing::{debug, warn};

use crate::credentials::ProvisioningRecord;
use crate::engine::StationStatus;
use crate::error::{Error, Result};
use crate::events::{DriverReport, DriverStatus, LinkEvent};
use crate::policy::{StationMode, StationState};

/// Cloneable sender for the engine queue
#[derive(Debug, Clone)]
pub struct EventPoster {
    tx: mpsc::UnboundedSender<LinkEvent>,
}

impl EventPoster {
    pub(crate) fn new(tx: mpsc::UnboundedSender<LinkEvent>) -> Self {
        Self { tx }
    }

    /// Append `event` to the queue without blocking
    ///
    /// Fails only when the engine has been dropped.
    pub fn post(&self, event: LinkEvent) -> Result<()> {
        self.tx
            .send(event)
            .map_err(|e| Error::Other(format!("engine queue closed, dropped {:?}", e.0)))
    }
}

/// Driver-facing half of the event bridge
///
/// Safe to call from the driver's own callback context: it only translates the
/// status and appends it to the queue.
#[derive(Debug, Clone)]
pub struct EventBridge {
    poster: EventPoster,
}

impl EventBridge {
    pub fn new(poster: EventPoster) -> Self {
        Self { poster }
    }

    /// Forward a driver status report
    pub fn on_driver_event(&self, status: DriverStatus) {
        debug!("driver status {:?}", status);
        if let Err(e) = self.poster.post(LinkEvent::Driver(DriverReport::from(status))) {
            warn!("Failed to post driver status: {}", e);
        }
    }

    /// Forward a numeric vendor status code; unknown codes are dropped
    pub fn on_raw_status(&self, code: u32) {
        match DriverStatus::from_code(code) {
            Some(status) => self.on_driver_event(status),
            None => warn!("unsupported wifi status: {}", code),
        }
    }
}

/// Application-facing handle to a running engine
///
/// Every mutation is marshaled onto the engine queue; reads come from the
/// status the engine publishes after each pass.
#[derive(Debug, Clone)]
pub struct LinkHandle {
    poster: EventPoster,
    status: watch::Receiver<StationStatus>,
}

impl LinkHandle {
    pub(crate) fn new(poster: EventPoster, status: watch::Receiver<StationStatus>) -> Self {
        Self { poster, status }
    }

    /// Bridge to hand to the driver's status callback
    pub fn bridge(&self) -> EventBridge {
        EventBridge::new(self.poster.clone())
    }

    /// Raw queue sender
    pub fn poster(&self) -> EventPoster {
        self.poster.clone()
    }

    /// Request a new station mode
    ///
    /// `NotSupported` is rejected here, before anything is queued.
    pub fn set_mode(&self, mode: StationMode) -> Result<()> {
        if mode == StationMode::NotSupported {
            return Err(Error::UnsupportedMode(mode));
        }
        self.poster.post(LinkEvent::SetMode(mode))
    }

    /// Replace the station credentials and (re)enable the station
    pub fn provision(&self, record: ProvisioningRecord) -> Result<()> {
        self.poster.post(LinkEvent::Provision(record))
    }

    /// Revoke the stored station credentials
    pub fn clear_provision(&self) -> Result<()> {
        self.poster.post(LinkEvent::ClearProvision)
    }

    /// Report that a scan finished
    pub fn scan_completed(&self) -> Result<()> {
        self.poster.post(LinkEvent::ScanCompleted)
    }

    /// Ask for an extra reconciliation pass
    pub fn request_reconcile(&self) -> Result<()> {
        self.poster.post(LinkEvent::Reconcile)
    }

    /// Last published status
    pub fn status(&self) -> StationStatus {
        *self.status.borrow()
    }

    pub fn mode(&self) -> StationMode {
        self.status().mode
    }

    pub fn state(&self) -> StationState {
        self.status().state
    }

    /// Receiver that observes every published status
    pub fn subscribe(&self) -> watch::Receiver<StationStatus> {
        self.status.clone()
    }
}
