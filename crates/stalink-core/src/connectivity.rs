//! Internet connectivity inference
//!
//! Reachability is inferred from local interface configuration, never by
//! probing the network. [`evaluate`] is the pure decision;
//! [`ConnectivityDetector`] keeps the previous result so that only edges
//! produce notifications.

use crate::events::{ConnectivityChange, DeviceEvent, InterfaceIpChange};
use crate::policy::StationState;

/// Point-in-time view of the station interface in the IP stack
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IpSnapshot {
    pub interface_up: bool,
    pub link_up: bool,
    pub dns_configured: bool,
    pub ipv4_address: bool,
    pub ipv4_gateway: bool,
    /// Number of valid global IPv6 addresses
    pub valid_global_ipv6: u8,
    /// A default IPv6 route through this interface is reachable
    pub ipv6_default_route: bool,
}

impl IpSnapshot {
    fn base_ready(&self) -> bool {
        self.interface_up && self.link_up && self.dns_configured
    }
}

/// Single connectivity flag
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectivityFlag {
    HaveIpv4Internet,
    HaveIpv6Internet,
}

impl ConnectivityFlag {
    fn bit(self) -> u8 {
        match self {
            ConnectivityFlag::HaveIpv4Internet => 0b01,
            ConnectivityFlag::HaveIpv6Internet => 0b10,
        }
    }
}

/// Bitset of [`ConnectivityFlag`]s
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct ConnectivityFlags(u8);

impl ConnectivityFlags {
    pub const fn empty() -> Self {
        Self(0)
    }

    pub fn has(&self, flag: ConnectivityFlag) -> bool {
        self.0 & flag.bit() != 0
    }

    pub fn set(&mut self, flag: ConnectivityFlag, value: bool) -> &mut Self {
        if value {
            self.0 |= flag.bit();
        } else {
            self.0 &= !flag.bit();
        }
        self
    }

    pub fn ipv4(&self) -> bool {
        self.has(ConnectivityFlag::HaveIpv4Internet)
    }

    pub fn ipv6(&self) -> bool {
        self.has(ConnectivityFlag::HaveIpv6Internet)
    }
}

/// Compute the connectivity flags implied by `snapshot`
///
/// Both flags are false unless the station is `Connected`.
pub fn evaluate(snapshot: &IpSnapshot, state: StationState) -> ConnectivityFlags {
    let mut flags = ConnectivityFlags::empty();
    if state != StationState::Connected || !snapshot.base_ready() {
        return flags;
    }

    flags
        .set(
            ConnectivityFlag::HaveIpv4Internet,
            snapshot.ipv4_address && snapshot.ipv4_gateway,
        )
        .set(
            ConnectivityFlag::HaveIpv6Internet,
            snapshot.valid_global_ipv6 > 0 && snapshot.ipv6_default_route,
        );
    flags
}

/// Edge detector over successive [`evaluate`] results
#[derive(Debug, Clone, Default)]
pub struct ConnectivityDetector {
    flags: ConnectivityFlags,
    ipv6_count: u8,
}

impl ConnectivityDetector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn flags(&self) -> ConnectivityFlags {
        self.flags
    }

    /// Re-evaluate and return the notifications for whatever changed
    pub fn update(&mut self, snapshot: &IpSnapshot, state: StationState) -> Vec<DeviceEvent> {
        let mut events = Vec::new();

        let had = self.flags;
        let have = evaluate(snapshot, state);
        let ipv6_count = if state == StationState::Connected && snapshot.base_ready() {
            snapshot.valid_global_ipv6
        } else {
            0
        };

        if have != had {
            self.flags = have;
            events.push(DeviceEvent::InternetConnectivityChange {
                ipv4: ConnectivityChange::between(had.ipv4(), have.ipv4()),
                ipv6: ConnectivityChange::between(had.ipv6(), have.ipv6()),
            });
        }

        if have.ipv4() != had.ipv4() {
            tracing::info!(
                "IPv4 Internet connectivity {}",
                if have.ipv4() { "ESTABLISHED" } else { "LOST" }
            );
            events.push(DeviceEvent::InterfaceIpAddressChanged(if have.ipv4() {
                InterfaceIpChange::Ipv4Assigned
            } else {
                InterfaceIpChange::Ipv4Lost
            }));
        }

        if ipv6_count != self.ipv6_count {
            let gained = ipv6_count > self.ipv6_count;
            tracing::info!(
                "IPv6 global addresses {} -> {} ({})",
                self.ipv6_count,
                ipv6_count,
                if gained { "ESTABLISHED" } else { "LOST" }
            );
            events.push(DeviceEvent::InterfaceIpAddressChanged(if gained {
                InterfaceIpChange::Ipv6Assigned
            } else {
                InterfaceIpChange::Ipv6Lost
            }));
            self.ipv6_count = ipv6_count;
        }

        events
    }
}
