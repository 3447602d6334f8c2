//! Contract Test: Edge-Triggered Notifications
//!
//! This test verifies that connectivity notifications are published once per
//! transition and never on repeated passes.
//!
//! Constraints verified:
//! - At most one `Established` per entry into `Connected`
//! - At most one `Lost` per exit from `Connected`
//! - `Established` and `Lost` strictly alternate
//! - Internet flags are recomputed on every pass and reported only on change
//!
//! If this test fails, someone has made a notification level-triggered or
//! tied it to pass count instead of state transitions.

mod common;

use common::*;
use stalink_core::{
    ConnectivityChange, DeviceEvent, DriverStatus, InterfaceIpChange, IpSnapshot, StationMode,
    StationState,
};

#[tokio::test]
async fn established_once_per_entry_into_connected() {
    let mut h = Harness::new(StationMode::Enabled, true).await;
    h.boot().await;
    h.driver_reports(&[DriverStatus::Connected, DriverStatus::GotIp])
        .await;

    for _ in 0..5 {
        h.handle.request_reconcile().unwrap();
    }
    h.handle.scan_completed().unwrap();
    h.engine.run_until_idle().await;
    h.driver_reports(&[DriverStatus::GotIp]).await;

    assert_eq!(h.engine.state(), StationState::Connected);
    assert_eq!(
        wifi_changes(&h.drain_events()),
        vec![ConnectivityChange::Established]
    );
}

#[tokio::test]
async fn unexpected_disconnect_emits_lost_and_clears_flags() {
    let mut h = Harness::new(StationMode::Enabled, true).await;
    h.boot().await;
    h.driver_reports(&[DriverStatus::GotIp]).await;
    assert!(h.handle.status().flags.ipv4());
    h.drain_events();

    h.driver_reports(&[DriverStatus::Disconnected]).await;

    let events = h.drain_events();
    assert_eq!(wifi_changes(&events), vec![ConnectivityChange::Lost]);
    assert!(events.contains(&DeviceEvent::InternetConnectivityChange {
        ipv4: ConnectivityChange::Lost,
        ipv6: ConnectivityChange::Lost,
    }));
    assert!(events.contains(&DeviceEvent::InterfaceIpAddressChanged(
        InterfaceIpChange::Ipv4Lost
    )));

    let status = h.handle.status();
    assert!(!status.flags.ipv4() && !status.flags.ipv6());
    // Prior state was Connected, so no backoff: a reconnect goes out at once
    assert_eq!(h.engine.policy().reconnect().last_failure(), None);
    assert_eq!(h.driver.connect_call_count(), 2);
    assert_eq!(h.engine.state(), StationState::Connecting);

    h.handle.request_reconcile().unwrap();
    h.engine.run_until_idle().await;
    assert!(wifi_changes(&h.drain_events()).is_empty());
}

#[tokio::test]
async fn failure_while_connected_emits_one_lost_then_backs_off() {
    let mut h = Harness::new(StationMode::Enabled, true).await;
    h.boot().await;
    h.driver_reports(&[DriverStatus::GotIp]).await;

    h.driver_reports(&[DriverStatus::BeaconLost]).await;
    h.handle.request_reconcile().unwrap();
    h.engine.run_until_idle().await;

    assert_eq!(
        wifi_changes(&h.drain_events()),
        vec![ConnectivityChange::Established, ConnectivityChange::Lost]
    );
    assert!(h.engine.policy().reconnect().last_failure().is_some());
    assert_eq!(h.driver.connect_call_count(), 1);
    assert!(!h.scheduler.timers().is_empty());
}

#[tokio::test]
async fn established_and_lost_alternate_across_cycles() {
    let mut h = Harness::new(StationMode::Enabled, true).await;
    h.boot().await;

    for _ in 0..3 {
        h.driver_reports(&[
            DriverStatus::Connecting,
            DriverStatus::Connected,
            DriverStatus::GotIp,
        ])
        .await;
        h.driver_reports(&[DriverStatus::Disconnected]).await;
        h.handle.request_reconcile().unwrap();
        h.engine.run_until_idle().await;
    }

    use ConnectivityChange::{Established, Lost};
    assert_eq!(
        wifi_changes(&h.drain_events()),
        vec![Established, Lost, Established, Lost, Established, Lost]
    );
}

#[tokio::test]
async fn connectivity_is_recomputed_every_pass() {
    let mut h = Harness::new(StationMode::Enabled, true).await;
    h.ip_stack.set(ipv4_only());
    h.boot().await;
    h.driver_reports(&[DriverStatus::GotIp]).await;
    h.drain_events();

    // IPv6 comes up without any driver event; a plain pass notices
    h.ip_stack.set(dual_stack());
    h.handle.request_reconcile().unwrap();
    h.engine.run_until_idle().await;

    assert_eq!(
        h.drain_events(),
        vec![
            DeviceEvent::InternetConnectivityChange {
                ipv4: ConnectivityChange::NoChange,
                ipv6: ConnectivityChange::Established,
            },
            DeviceEvent::InterfaceIpAddressChanged(InterfaceIpChange::Ipv6Assigned),
        ]
    );

    // Same snapshot again: nothing to report
    h.handle.request_reconcile().unwrap();
    h.engine.run_until_idle().await;
    assert!(h.drain_events().is_empty());
}

#[tokio::test]
async fn dns_loss_drops_both_families() {
    let mut h = Harness::new(StationMode::Enabled, true).await;
    h.boot().await;
    h.driver_reports(&[DriverStatus::GotIp]).await;
    h.drain_events();

    h.ip_stack.set(IpSnapshot {
        dns_configured: false,
        ..dual_stack()
    });
    h.handle.scan_completed().unwrap();
    h.engine.run_until_idle().await;

    let events = h.drain_events();
    assert!(events.contains(&DeviceEvent::InternetConnectivityChange {
        ipv4: ConnectivityChange::Lost,
        ipv6: ConnectivityChange::Lost,
    }));
    // The link itself is still up
    assert!(wifi_changes(&events).is_empty());
    assert_eq!(h.engine.state(), StationState::Connected);
}
