//! Event types crossing the engine boundary
//!
//! - [`DriverStatus`] / [`DriverReport`]: what the radio driver reported
//! - [`LinkEvent`]: tags on the single-consumer queue feeding the engine
//! - [`DeviceEvent`]: notifications the engine publishes to the rest of the device

use crate::credentials::ProvisioningRecord;
use crate::policy::StationMode;

/// Station status delivered by the Wi-Fi driver's callback
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DriverStatus {
    Idle,
    Connecting,
    BeaconLost,
    PasswordWrong,
    NoApFound,
    AssociationFull,
    Disconnected,
    ConnectFailed,
    /// Associated and authenticated, no address yet
    Connected,
    GotIp,
}

impl DriverStatus {
    /// Translate a numeric vendor status code
    pub fn from_code(code: u32) -> Option<Self> {
        let status = match code {
            0 => DriverStatus::Idle,
            1 => DriverStatus::Connecting,
            2 => DriverStatus::BeaconLost,
            3 => DriverStatus::PasswordWrong,
            4 => DriverStatus::NoApFound,
            5 => DriverStatus::AssociationFull,
            6 => DriverStatus::Disconnected,
            7 => DriverStatus::ConnectFailed,
            8 => DriverStatus::Connected,
            9 => DriverStatus::GotIp,
            _ => return None,
        };
        Some(status)
    }

    /// Whether the radio link is up after this status
    pub fn link_connected(&self) -> bool {
        matches!(self, DriverStatus::Connected | DriverStatus::GotIp)
    }

    /// Whether this status ends a connection attempt unsuccessfully
    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            DriverStatus::BeaconLost
                | DriverStatus::PasswordWrong
                | DriverStatus::NoApFound
                | DriverStatus::AssociationFull
                | DriverStatus::ConnectFailed
        )
    }
}

/// A driver status together with the link state it implies
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DriverReport {
    pub status: DriverStatus,
    pub link_connected: bool,
}

impl From<DriverStatus> for DriverReport {
    fn from(status: DriverStatus) -> Self {
        Self {
            status,
            link_connected: status.link_connected(),
        }
    }
}

/// Work items processed by the engine, in posting order
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkEvent {
    /// Status reported by the driver callback
    Driver(DriverReport),
    /// Deferred reconciliation request
    Reconcile,
    /// A backoff timer expired
    ReconnectTimerFired,
    /// A scan finished
    ScanCompleted,
    /// Application changed the desired mode
    SetMode(StationMode),
    /// Application supplied new credentials
    Provision(ProvisioningRecord),
    /// Application revoked stored credentials
    ClearProvision,
}

/// Direction of a connectivity transition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConnectivityChange {
    Established,
    Lost,
    NoChange,
}

impl ConnectivityChange {
    /// Classify the transition from `had` to `have`
    pub fn between(had: bool, have: bool) -> Self {
        match (had, have) {
            (false, true) => ConnectivityChange::Established,
            (true, false) => ConnectivityChange::Lost,
            _ => ConnectivityChange::NoChange,
        }
    }
}

/// Address assignment change on the station interface
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InterfaceIpChange {
    Ipv4Assigned,
    Ipv4Lost,
    Ipv6Assigned,
    Ipv6Lost,
}

/// Notifications published by the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceEvent {
    /// Station link came up or went down
    WiFiConnectivityChange(ConnectivityChange),

    /// Inferred internet reachability changed
    InternetConnectivityChange {
        ipv4: ConnectivityChange,
        ipv6: ConnectivityChange,
    },

    /// An address was assigned to or removed from the interface
    InterfaceIpAddressChanged(InterfaceIpChange),
}
