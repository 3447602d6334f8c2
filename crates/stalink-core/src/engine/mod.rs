//! Station link reconciliation engine
//!
//! The ConnectivityManager is responsible for:
//! - Applying driver status reports to the observed station state
//! - Reconciling the desired mode against the observed link
//! - Enforcing the fixed reconnect backoff
//! - Publishing connectivity notifications
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐   LinkEvent    ┌──────────────────────┐   DeviceEvent
//! │ EventBridge │──────────────► │ ConnectivityManager  │ ─────────────►
//! │ LinkHandle  │   (unbounded)  │  drive_station_state │   (bounded)
//! │ timers      │                └──────────────────────┘
//! └─────────────┘                           │
//!         ┌───────────────────┬─────────────┼─────────────────┐
//!         ▼                   ▼             ▼                 ▼
//! ┌─────────────┐   ┌─────────────────┐ ┌─────────┐   ┌─────────────┐
//! │ WifiDriver  │   │ CredentialStore │ │ IpStack │   │  Scheduler  │
//! │ (connect)   │   │ (provisioned?)  │ │ (flags) │   │ (backoff)   │
//! └─────────────┘   └─────────────────┘ └─────────┘   └─────────────┘
//! ```
//!
//! ## Event Flow
//!
//! 1. A driver status is dequeued and mapped onto the station state
//! 2. One reconciliation pass runs
//! 3. The pass connects, disconnects, arms a backoff timer or does nothing
//! 4. Connectivity flags are recomputed and edges are published
//! 5. The new status snapshot is published to every [`LinkHandle`]

use std::time::Duration;

use tokio::sync::{mpsc, oneshot, watch};
use tokio::time::Instant;
use tokio_stream::StreamExt;
use tokio_stream::wrappers::UnboundedReceiverStream;
use tracing::{debug, error, info, trace, warn};

use crate::bridge::{EventPoster, LinkHandle};
use crate::config::LinkConfig;
use crate::connectivity::{ConnectivityDetector, ConnectivityFlags};
use crate::credentials::{CredentialStore, ProvisioningRecord};
use crate::error::{Error, Result};
use crate::events::{ConnectivityChange, DeviceEvent, DriverReport, DriverStatus, LinkEvent};
use crate::policy::{PolicyState, StationMode, StationState};
use crate::timer::TokioScheduler;
use crate::traits::{IpStack, KeyValueStore, Scheduler, WifiDriver};

/// Snapshot published after every processed event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StationStatus {
    pub mode: StationMode,
    pub state: StationState,
    pub flags: ConnectivityFlags,
}

/// Wi-Fi station reconciliation engine
///
/// One instance exists per station interface. It owns the policy state and
/// is the only code that mutates it.
///
/// ## Lifecycle
///
/// 1. Create with [`ConnectivityManager::new()`]
/// 2. Hand [`LinkHandle::bridge()`] to the driver's status callback
/// 3. Start with [`ConnectivityManager::run()`]
/// 4. Engine runs until shutdown signal received
/// 5. Drop to cancel outstanding timers
///
/// ## Threading
///
/// All state changes happen on the task running the engine. Other tasks only
/// post [`LinkEvent`]s and read the published [`StationStatus`].
pub struct ConnectivityManager {
    driver: Box<dyn WifiDriver>,
    credentials: CredentialStore,
    ip_stack: Box<dyn IpStack>,
    scheduler: Box<dyn Scheduler>,

    policy: PolicyState,
    detector: ConnectivityDetector,
    initial_mode: StationMode,
    booted: bool,

    /// Link state carried by the most recent driver report
    link_connected: bool,

    /// Whether `Established` was published without a matching `Lost`
    announced: bool,

    /// Credentials staged by `provision`, saved on the next `GotIp`
    ///
    /// A record whose save failed stays here as the connect source.
    pending: Option<ProvisioningRecord>,

    /// The pending record already had its one save attempt
    pending_saved: bool,

    /// Failure instant the outstanding backoff timer was armed for
    backoff_armed_for: Option<Instant>,

    /// Result of the last successful credential load
    provisioned_hint: Option<bool>,

    poster: EventPoster,
    link_rx: Option<mpsc::UnboundedReceiver<LinkEvent>>,
    event_tx: mpsc::Sender<DeviceEvent>,
    status_tx: watch::Sender<StationStatus>,
}

impl ConnectivityManager {
    /// Create an engine that arms its timers on the tokio runtime
    ///
    /// # Returns
    ///
    /// A tuple of (engine, handle, device_event_receiver)
    pub fn new(
        driver: Box<dyn WifiDriver>,
        store: Box<dyn KeyValueStore>,
        ip_stack: Box<dyn IpStack>,
        config: LinkConfig,
    ) -> Result<(Self, LinkHandle, mpsc::Receiver<DeviceEvent>)> {
        Self::with_scheduler(
            driver,
            store,
            ip_stack,
            Box::new(TokioScheduler::new()),
            config,
        )
    }

    /// Create an engine with a custom work/timer scheduler
    pub fn with_scheduler(
        driver: Box<dyn WifiDriver>,
        store: Box<dyn KeyValueStore>,
        ip_stack: Box<dyn IpStack>,
        scheduler: Box<dyn Scheduler>,
        config: LinkConfig,
    ) -> Result<(Self, LinkHandle, mpsc::Receiver<DeviceEvent>)> {
        config.validate()?;

        let (link_tx, link_rx) = mpsc::unbounded_channel();
        let (event_tx, event_rx) = mpsc::channel(config.engine.event_channel_capacity);
        let (status_tx, status_rx) = watch::channel(StationStatus::default());
        let poster = EventPoster::new(link_tx);

        let handle = LinkHandle::new(poster.clone(), status_rx);
        let engine = Self {
            driver,
            credentials: CredentialStore::new(store),
            ip_stack,
            scheduler,
            policy: PolicyState::new(config.engine.reconnect_interval()),
            detector: ConnectivityDetector::new(),
            initial_mode: config.initial_mode,
            booted: false,
            link_connected: false,
            announced: false,
            pending: None,
            pending_saved: false,
            backoff_armed_for: None,
            provisioned_hint: None,
            poster,
            link_rx: Some(link_rx),
            event_tx,
            status_tx,
        };

        Ok((engine, handle, event_rx))
    }

    /// Another handle sharing this engine's queue and status
    pub fn handle(&self) -> LinkHandle {
        LinkHandle::new(self.poster.clone(), self.status_tx.subscribe())
    }

    pub fn mode(&self) -> StationMode {
        self.policy.mode()
    }

    pub fn state(&self) -> StationState {
        self.policy.state()
    }

    pub fn policy(&self) -> &PolicyState {
        &self.policy
    }

    pub fn status(&self) -> StationStatus {
        StationStatus {
            mode: self.policy.mode(),
            state: self.policy.state(),
            flags: self.detector.flags(),
        }
    }

    /// Apply the configured initial mode and run the first pass
    pub async fn boot(&mut self) {
        self.booted = true;
        info!(
            "Station link engine starting (driver: {}, initial mode: {})",
            self.driver.driver_name(),
            self.initial_mode
        );

        if let Err(e) = self.policy.set_mode(self.initial_mode) {
            warn!("Ignoring initial mode: {}", e);
        }

        self.drive_station_state().await;
    }

    /// Change the desired mode
    ///
    /// An accepted change schedules exactly one reconciliation pass; an
    /// unchanged value schedules nothing. Switching to `Disabled` while the
    /// link is up or a connection is in flight also asks the driver to
    /// disconnect.
    pub async fn set_mode(&mut self, mode: StationMode) -> Result<()> {
        if !self.policy.set_mode(mode)? {
            return Ok(());
        }

        if mode == StationMode::Disabled {
            self.tear_down().await;
        }

        if let Err(e) = self.scheduler.schedule_work(&self.poster, LinkEvent::Reconcile) {
            warn!("Failed to schedule reconciliation after mode change: {}", e);
        }
        self.publish_status();
        Ok(())
    }

    /// Stage new credentials and restart the station with them
    pub async fn provision(&mut self, record: ProvisioningRecord) {
        info!("Provisioning station for SSID {}", record.ssid_lossy());
        if let Err(e) = self.set_mode(StationMode::Disabled).await {
            warn!("Failed to disable station before provisioning: {}", e);
        }
        self.pending = Some(record);
        self.pending_saved = false;
        self.provisioned_hint = None;
        if let Err(e) = self.set_mode(StationMode::Enabled).await {
            warn!("Failed to enable station after provisioning: {}", e);
        }
    }

    /// Remove stored credentials and reconcile
    pub async fn clear_provision(&mut self) {
        info!("Clearing station provisioning");
        if let Err(e) = self.credentials.clear().await {
            error!("Failed to clear provisioning record: {}", e);
        }
        self.pending = None;
        self.pending_saved = false;
        self.provisioned_hint = None;
        self.drive_station_state().await;
    }

    /// Process one dequeued event
    pub async fn handle_event(&mut self, event: LinkEvent) {
        trace!("Handling {:?}", event);

        match event {
            LinkEvent::Driver(report) => {
                self.apply_driver_report(report).await;
                self.drive_station_state().await;
            }
            LinkEvent::ReconnectTimerFired => {
                self.backoff_armed_for = None;
                self.drive_station_state().await;
            }
            LinkEvent::Reconcile | LinkEvent::ScanCompleted => {
                self.drive_station_state().await;
            }
            LinkEvent::SetMode(mode) => {
                if let Err(e) = self.set_mode(mode).await {
                    warn!("Rejected mode change: {}", e);
                }
            }
            LinkEvent::Provision(record) => self.provision(record).await,
            LinkEvent::ClearProvision => self.clear_provision().await,
        }

        self.publish_status();
    }

    /// Process queued events until the queue is empty
    ///
    /// Returns the number of events handled. Events posted while draining
    /// (scheduled work, bridge posts) are handled too.
    pub async fn run_until_idle(&mut self) -> usize {
        let mut handled = 0;
        while let Some(event) = self.link_rx.as_mut().and_then(|rx| rx.try_recv().ok()) {
            self.handle_event(event).await;
            handled += 1;
        }
        handled
    }

    /// Run the engine until SIGINT
    ///
    /// Boots first if [`boot`](Self::boot) has not been called.
    pub async fn run(&mut self) -> Result<()> {
        self.run_internal(None).await
    }

    /// Run the engine until `shutdown_rx` fires (or SIGINT when `None`)
    pub async fn run_with_shutdown(
        &mut self,
        shutdown_rx: Option<oneshot::Receiver<()>>,
    ) -> Result<()> {
        self.run_internal(shutdown_rx).await
    }

    async fn run_internal(&mut self, shutdown_rx: Option<oneshot::Receiver<()>>) -> Result<()> {
        let rx = self
            .link_rx
            .take()
            .ok_or_else(|| Error::Other("engine is already running".to_string()))?;

        if !self.booted {
            self.boot().await;
        }

        let mut events = UnboundedReceiverStream::new(rx);
        let shutdown = async move {
            match shutdown_rx {
                Some(rx) => {
                    let _ = rx.await;
                }
                None => {
                    if let Err(e) = tokio::signal::ctrl_c().await {
                        error!("Failed to listen for CTRL-C: {}", e);
                        std::future::pending::<()>().await;
                    }
                }
            }
        };
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                Some(event) = events.next() => {
                    self.handle_event(event).await;
                }

                _ = &mut shutdown => {
                    info!("Shutdown signal received");
                    break;
                }
            }
        }

        self.link_rx = Some(events.into_inner());

        self.credentials.flush().await?;
        info!("Credential store flushed, engine stopped");

        Ok(())
    }

    /// One reconciliation pass
    ///
    /// Idempotent: repeated passes with nothing changed issue no driver
    /// requests and publish nothing.
    pub async fn drive_station_state(&mut self) {
        let mode = self.policy.mode();
        trace!(
            "Reconciling: mode={} state={} link_connected={}",
            mode,
            self.policy.state(),
            self.link_connected
        );

        if mode == StationMode::Disabled {
            self.publish_status();
            return;
        }

        let now = Instant::now();

        if self.link_connected {
            if matches!(
                self.policy.state(),
                StationState::NotConnected | StationState::ConnectingSucceeded
            ) {
                self.policy.set_state(StationState::Connected);
                self.policy.reconnect_mut().clear();
                self.on_station_connected();
            }

            self.refresh_connectivity();

            if mode != StationMode::ApplicationControlled
                && self.policy.state() != StationState::Disconnecting
                && (mode != StationMode::Enabled || !self.is_provisioned().await)
            {
                info!("Station link is up but not wanted, disconnecting");
                match self.driver.disconnect().await {
                    Ok(()) => {
                        self.policy.set_state(StationState::Disconnecting);
                        self.refresh_connectivity();
                    }
                    Err(e) => warn!(
                        "Driver {} rejected disconnect: {}",
                        self.driver.driver_name(),
                        e
                    ),
                }
            }
        } else {
            let prior = self.policy.state();
            if matches!(
                prior,
                StationState::Connected | StationState::Disconnecting | StationState::ConnectingFailed
            ) {
                self.policy.set_state(StationState::NotConnected);
                if prior == StationState::ConnectingFailed {
                    self.policy.reconnect_mut().record_failure(now);
                } else {
                    self.policy.reconnect_mut().clear();
                }
                self.on_station_disconnected();
            }

            self.refresh_connectivity();

            if mode == StationMode::Enabled
                && self.policy.state() != StationState::Connecting
                && self.is_provisioned().await
            {
                match self.policy.reconnect().remaining(now) {
                    None => self.connect().await,
                    Some(wait) => self.arm_backoff_timer(wait),
                }
            }
        }

        self.publish_status();
    }

    /// Map a driver status onto the station state
    async fn apply_driver_report(&mut self, report: DriverReport) {
        self.link_connected = report.link_connected;
        let state = self.policy.state();

        match report.status {
            DriverStatus::Connecting => {
                self.policy.set_state(StationState::Connecting);
            }
            status if status.is_failure() => {
                warn!("Station connection failed: {:?}", report.status);
                self.policy.set_state(StationState::ConnectingFailed);
            }
            DriverStatus::Disconnected => match state {
                StationState::Connected => {
                    self.policy.set_state(StationState::Disconnecting);
                }
                StationState::Connecting => {
                    self.policy.set_state(StationState::ConnectingFailed);
                }
                _ => {}
            },
            DriverStatus::Connected => {
                if state == StationState::Connecting {
                    self.policy.set_state(StationState::ConnectingSucceeded);
                }
            }
            DriverStatus::GotIp => {
                if state == StationState::Connecting {
                    self.policy.set_state(StationState::ConnectingSucceeded);
                }
                self.save_pending().await;
            }
            // Idle
            _ => {}
        }
    }

    /// Persist staged credentials once an address was obtained with them
    ///
    /// Each staged record gets one save attempt. When it fails the link is
    /// kept and the record stays pending, so later reconnects still have
    /// credentials to use.
    async fn save_pending(&mut self) {
        if self.pending_saved {
            return;
        }
        let Some(record) = self.pending.take() else {
            return;
        };

        match self.credentials.save(&record).await {
            Ok(()) => {
                info!("Persisted credentials for SSID {}", record.ssid_lossy());
                self.provisioned_hint = Some(record.is_provisioned());
            }
            Err(e) => {
                error!(
                    "Failed to persist credentials for SSID {}: {}",
                    record.ssid_lossy(),
                    e
                );
                self.pending = Some(record);
                self.pending_saved = true;
                self.provisioned_hint = None;
            }
        }
    }

    /// Arm one timer per failure; later passes in the same window reuse it
    fn arm_backoff_timer(&mut self, wait: Duration) {
        let failure = self.policy.reconnect().last_failure();
        if failure.is_some() && self.backoff_armed_for == failure {
            trace!("Reconnect timer already armed, {:?} remaining", wait);
            return;
        }

        debug!("Reconnect backoff: {:?} remaining", wait);
        match self
            .scheduler
            .start_timer(wait, &self.poster, LinkEvent::ReconnectTimerFired)
        {
            Ok(()) => self.backoff_armed_for = failure,
            Err(e) => error!("Failed to arm reconnect timer: {}", e),
        }
    }

    /// Explicit disable path
    async fn tear_down(&mut self) {
        if !self.link_connected && self.policy.state() != StationState::Connecting {
            return;
        }

        info!("Station disabled, disconnecting");
        match self.driver.disconnect().await {
            Ok(()) => {
                self.policy.set_state(StationState::Disconnecting);
                self.on_station_disconnected();
                self.refresh_connectivity();
            }
            Err(e) => warn!(
                "Driver {} rejected disconnect: {}",
                self.driver.driver_name(),
                e
            ),
        }
    }

    async fn connect(&mut self) {
        let record = match self.pending.clone() {
            Some(record) => record,
            None => match self.credentials.load().await {
                Ok(Some(record)) => record,
                Ok(None) => {
                    warn!("No provisioning record to connect with");
                    return;
                }
                Err(e) => {
                    warn!("Failed to load provisioning record: {}", e);
                    return;
                }
            },
        };

        info!("Connecting to SSID {}", record.ssid_lossy());
        match self.driver.connect(&record).await {
            Ok(()) => {
                self.policy.set_state(StationState::Connecting);
            }
            Err(e) => warn!(
                "Driver {} rejected connect: {}",
                self.driver.driver_name(),
                e
            ),
        }
    }

    /// Staged credentials count as provisioned; otherwise consult the store
    async fn is_provisioned(&mut self) -> bool {
        if let Some(record) = &self.pending {
            return record.is_provisioned();
        }
        if let Some(hint) = self.provisioned_hint {
            return hint;
        }

        match self.credentials.check_provisioned().await {
            Ok(provisioned) => {
                self.provisioned_hint = Some(provisioned);
                provisioned
            }
            // Not cached, the next pass reads again
            Err(_) => false,
        }
    }

    fn on_station_connected(&mut self) {
        if self.announced {
            return;
        }
        self.announced = true;
        info!("Station connectivity ESTABLISHED");
        self.emit_event(DeviceEvent::WiFiConnectivityChange(
            ConnectivityChange::Established,
        ));
    }

    fn on_station_disconnected(&mut self) {
        if !self.announced {
            return;
        }
        self.announced = false;
        info!("Station connectivity LOST");
        self.emit_event(DeviceEvent::WiFiConnectivityChange(ConnectivityChange::Lost));
    }

    fn refresh_connectivity(&mut self) {
        let snapshot = self.ip_stack.snapshot();
        for event in self.detector.update(&snapshot, self.policy.state()) {
            self.emit_event(event);
        }
    }

    fn publish_status(&self) {
        let status = self.status();
        self.status_tx.send_if_modified(|current| {
            if *current == status {
                false
            } else {
                *current = status;
                true
            }
        });
    }

    /// Emit a device event
    fn emit_event(&self, event: DeviceEvent) {
        match self.event_tx.try_send(event) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(event)) => {
                warn!(
                    "Device event channel full, dropping {:?}. Consider increasing event_channel_capacity.",
                    event
                );
            }
            Err(mpsc::error::TrySendError::Closed(event)) => {
                debug!("No device event listener, dropping {:?}", event);
            }
        }
    }
}
