//! Test doubles and common utilities for contract tests
//!
//! The doubles record what the engine asked of them. Driver statuses are
//! injected by the tests through the engine's [`EventBridge`], the same way a
//! real driver callback would.

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use stalink_core::error::{Error, Result};
use stalink_core::traits::{IpStack, KeyValueStore, Scheduler, WifiDriver};
use stalink_core::{
    ConnectivityManager, CredentialStore, DeviceEvent, EventPoster, IpSnapshot, LinkConfig,
    LinkEvent, LinkHandle, MemoryKvStore, ProvisioningRecord, StationMode,
};
use tokio::sync::mpsc;

/// A WifiDriver that counts requests and remembers the credentials used
#[derive(Default)]
pub struct RecordingDriver {
    connect_call_count: Arc<AtomicUsize>,
    disconnect_call_count: Arc<AtomicUsize>,
    connected_ssids: Arc<Mutex<Vec<Vec<u8>>>>,
    reject_requests: Arc<AtomicBool>,
}

impl RecordingDriver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the number of times connect() was called
    pub fn connect_call_count(&self) -> usize {
        self.connect_call_count.load(Ordering::SeqCst)
    }

    /// Get the number of times disconnect() was called
    pub fn disconnect_call_count(&self) -> usize {
        self.disconnect_call_count.load(Ordering::SeqCst)
    }

    /// Total number of driver requests
    pub fn call_count(&self) -> usize {
        self.connect_call_count() + self.disconnect_call_count()
    }

    /// SSIDs passed to connect(), in order
    pub fn connected_ssids(&self) -> Vec<Vec<u8>> {
        self.connected_ssids.lock().unwrap().clone()
    }

    /// Make every subsequent request fail (the call is still counted)
    pub fn reject_requests(&self, reject: bool) {
        self.reject_requests.store(reject, Ordering::SeqCst);
    }

    /// Create a new RecordingDriver that shares counters with an existing one
    pub fn sharing_counters_with(other: &Self) -> Self {
        Self {
            connect_call_count: Arc::clone(&other.connect_call_count),
            disconnect_call_count: Arc::clone(&other.disconnect_call_count),
            connected_ssids: Arc::clone(&other.connected_ssids),
            reject_requests: Arc::clone(&other.reject_requests),
        }
    }
}

#[async_trait::async_trait]
impl WifiDriver for RecordingDriver {
    async fn connect(&self, record: &ProvisioningRecord) -> Result<()> {
        self.connect_call_count.fetch_add(1, Ordering::SeqCst);
        if self.reject_requests.load(Ordering::SeqCst) {
            return Err(Error::driver("radio busy"));
        }
        self.connected_ssids
            .lock()
            .unwrap()
            .push(record.ssid().to_vec());
        Ok(())
    }

    async fn disconnect(&self) -> Result<()> {
        self.disconnect_call_count.fetch_add(1, Ordering::SeqCst);
        if self.reject_requests.load(Ordering::SeqCst) {
            return Err(Error::driver("radio busy"));
        }
        Ok(())
    }

    fn driver_name(&self) -> &'static str {
        "recording"
    }
}

/// A Scheduler that counts work items and records timers without arming them
#[derive(Default)]
pub struct RecordingScheduler {
    work_count: Arc<AtomicUsize>,
    timers: Arc<Mutex<Vec<Duration>>>,
    fail_timers: Arc<AtomicBool>,
}

impl RecordingScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the number of times schedule_work() was called
    pub fn work_count(&self) -> usize {
        self.work_count.load(Ordering::SeqCst)
    }

    /// Delays passed to start_timer(), in order
    pub fn timers(&self) -> Vec<Duration> {
        self.timers.lock().unwrap().clone()
    }

    /// Make start_timer() fail
    pub fn fail_timers(&self, fail: bool) {
        self.fail_timers.store(fail, Ordering::SeqCst);
    }

    pub fn sharing_counters_with(other: &Self) -> Self {
        Self {
            work_count: Arc::clone(&other.work_count),
            timers: Arc::clone(&other.timers),
            fail_timers: Arc::clone(&other.fail_timers),
        }
    }
}

impl Scheduler for RecordingScheduler {
    fn schedule_work(&self, poster: &EventPoster, event: LinkEvent) -> Result<()> {
        self.work_count.fetch_add(1, Ordering::SeqCst);
        poster.post(event)
    }

    fn start_timer(&self, delay: Duration, _poster: &EventPoster, _event: LinkEvent) -> Result<()> {
        if self.fail_timers.load(Ordering::SeqCst) {
            return Err(Error::timer("no timer slots"));
        }
        self.timers.lock().unwrap().push(delay);
        Ok(())
    }
}

/// An IpStack whose snapshot is set by the test
#[derive(Clone, Default)]
pub struct ScriptedIpStack {
    snapshot: Arc<Mutex<IpSnapshot>>,
}

impl ScriptedIpStack {
    pub fn new(snapshot: IpSnapshot) -> Self {
        Self {
            snapshot: Arc::new(Mutex::new(snapshot)),
        }
    }

    pub fn set(&self, snapshot: IpSnapshot) {
        *self.snapshot.lock().unwrap() = snapshot;
    }
}

impl IpStack for ScriptedIpStack {
    fn snapshot(&self) -> IpSnapshot {
        *self.snapshot.lock().unwrap()
    }
}

/// Interface with IPv4 and one global IPv6 address, both routed
pub fn dual_stack() -> IpSnapshot {
    IpSnapshot {
        interface_up: true,
        link_up: true,
        dns_configured: true,
        ipv4_address: true,
        ipv4_gateway: true,
        valid_global_ipv6: 1,
        ipv6_default_route: true,
    }
}

/// Interface with only an IPv4 lease
pub fn ipv4_only() -> IpSnapshot {
    IpSnapshot {
        valid_global_ipv6: 0,
        ipv6_default_route: false,
        ..dual_stack()
    }
}

/// A KeyValueStore that counts calls and can be told to fail
#[derive(Clone, Default)]
pub struct CountingKvStore {
    inner: MemoryKvStore,
    put_call_count: Arc<AtomicUsize>,
    flush_call_count: Arc<AtomicUsize>,
    fail_puts: Arc<AtomicBool>,
    fail_gets: Arc<AtomicBool>,
}

impl CountingKvStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put_call_count(&self) -> usize {
        self.put_call_count.load(Ordering::SeqCst)
    }

    pub fn flush_call_count(&self) -> usize {
        self.flush_call_count.load(Ordering::SeqCst)
    }

    pub fn fail_puts(&self, fail: bool) {
        self.fail_puts.store(fail, Ordering::SeqCst);
    }

    pub fn fail_gets(&self, fail: bool) {
        self.fail_gets.store(fail, Ordering::SeqCst);
    }

    /// Credential view over the same data
    pub fn credentials(&self) -> CredentialStore {
        CredentialStore::new(Box::new(self.inner.clone()))
    }
}

#[async_trait::async_trait]
impl KeyValueStore for CountingKvStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        if self.fail_gets.load(Ordering::SeqCst) {
            return Err(Error::state_store("flash read error"));
        }
        self.inner.get(key).await
    }

    async fn put(&self, key: &str, value: &[u8]) -> Result<()> {
        self.put_call_count.fetch_add(1, Ordering::SeqCst);
        if self.fail_puts.load(Ordering::SeqCst) {
            return Err(Error::state_store("flash write error"));
        }
        self.inner.put(key, value).await
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.inner.delete(key).await
    }

    async fn flush(&self) -> Result<()> {
        self.flush_call_count.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Credentials used throughout the tests
pub fn home_network() -> ProvisioningRecord {
    ProvisioningRecord::new("home-net", "correct horse battery").unwrap()
}

/// Helper to create a LinkConfig for testing
pub fn test_config(initial_mode: StationMode, reconnect_interval_ms: u64) -> LinkConfig {
    let mut config = LinkConfig::new();
    config.initial_mode = initial_mode;
    config.engine.reconnect_interval_ms = reconnect_interval_ms;
    config.engine.event_channel_capacity = 100;
    config
}

/// An engine wired to recording doubles
pub struct Harness {
    pub engine: ConnectivityManager,
    pub handle: LinkHandle,
    pub events: mpsc::Receiver<DeviceEvent>,
    pub driver: RecordingDriver,
    pub scheduler: RecordingScheduler,
    pub ip_stack: ScriptedIpStack,
    pub store: CountingKvStore,
}

impl Harness {
    /// Engine with a recording scheduler (timers are recorded, never fire)
    pub async fn new(initial_mode: StationMode, provisioned: bool) -> Self {
        let store = CountingKvStore::new();
        if provisioned {
            store.credentials().save(&home_network()).await.unwrap();
        }
        let driver = RecordingDriver::new();
        let scheduler = RecordingScheduler::new();
        let ip_stack = ScriptedIpStack::new(dual_stack());

        let (engine, handle, events) = ConnectivityManager::with_scheduler(
            Box::new(RecordingDriver::sharing_counters_with(&driver)),
            Box::new(store.clone()),
            Box::new(ip_stack.clone()),
            Box::new(RecordingScheduler::sharing_counters_with(&scheduler)),
            test_config(initial_mode, 5_000),
        )
        .expect("engine construction succeeds");

        Self {
            engine,
            handle,
            events,
            driver,
            scheduler,
            ip_stack,
            store,
        }
    }

    /// Boot and process everything that boot queued
    pub async fn boot(&mut self) {
        self.engine.boot().await;
        self.engine.run_until_idle().await;
    }

    /// Post driver statuses through the bridge and process them
    pub async fn driver_reports(&mut self, statuses: &[stalink_core::DriverStatus]) {
        let bridge = self.handle.bridge();
        for status in statuses {
            bridge.on_driver_event(*status);
        }
        self.engine.run_until_idle().await;
    }

    /// Device events published so far
    pub fn drain_events(&mut self) -> Vec<DeviceEvent> {
        drain(&mut self.events)
    }
}

pub fn drain(events: &mut mpsc::Receiver<DeviceEvent>) -> Vec<DeviceEvent> {
    let mut out = Vec::new();
    while let Ok(event) = events.try_recv() {
        out.push(event);
    }
    out
}

/// WiFi connectivity events only
pub fn wifi_changes(events: &[DeviceEvent]) -> Vec<stalink_core::ConnectivityChange> {
    events
        .iter()
        .filter_map(|e| match e {
            DeviceEvent::WiFiConnectivityChange(change) => Some(*change),
            _ => None,
        })
        .collect()
}
