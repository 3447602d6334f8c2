// # stalinkd - Station Link Bench Daemon
//
// The stalinkd daemon is responsible for:
// 1. Reading configuration from environment variables
// 2. Initializing logging and the runtime
// 3. Creating the credential store from the backend registry
// 4. Wiring the engine to a loopback radio and IP stack
// 5. Running the engine until SIGTERM/SIGINT
//
// No reconciliation logic lives here; it is all in stalink-core.
//
// ## Configuration
//
// ### Station
// - `STALINK_MODE`: Initial mode (disabled, enabled, application_controlled)
// - `STALINK_RECONNECT_INTERVAL_MS`: Backoff after a failed attempt
// - `STALINK_SSID` / `STALINK_KEY`: Credentials provisioned at startup
//
// ### Credential Store
// - `STALINK_STORE_TYPE`: Store backend (memory, file)
// - `STALINK_STORE_PATH`: Path to the store file (for file store)
//
// ### Simulation
// - `STALINK_SIM_FAILURES`: Connection attempts the loopback radio fails first
//
// ### Logging
// - `STALINK_LOG_LEVEL`: trace, debug, info, warn, error
//
// ## Example
//
// ```bash
// export STALINK_MODE=enabled
// export STALINK_SSID=home-net
// export STALINK_KEY=secret
// export STALINK_SIM_FAILURES=2
// export STALINK_STORE_TYPE=file
// export STALINK_STORE_PATH=/var/lib/stalink/store.json
//
// stalinkd
// ```

mod sim;

use anyhow::Result;
use stalink_core::{
    BackendRegistry, ConnectivityManager, DeviceEvent, LinkConfig, ProvisioningRecord,
    StationMode, StoreConfig,
};
use std::env;
use std::process::ExitCode;
use std::time::Duration;
use tracing::{Level, error, info, warn};
use tracing_subscriber::FmtSubscriber;

#[cfg(unix)]
use tokio::signal::unix::{SignalKind, signal};

/// How long the engine gets to flush and stop after a signal
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

/// Exit codes for different termination scenarios
///
/// These codes follow systemd conventions:
/// - 0: Clean shutdown
/// - 1: Configuration or startup error
/// - 2: Runtime error (unexpected)
#[derive(Debug, Clone, Copy)]
enum StalinkExitCode {
    /// Clean shutdown (normal exit)
    CleanShutdown = 0,
    /// Configuration error or startup failure
    ConfigError = 1,
    /// Runtime error (unexpected failure)
    RuntimeError = 2,
}

impl From<StalinkExitCode> for ExitCode {
    fn from(code: StalinkExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

/// Application configuration
struct Config {
    mode: String,
    reconnect_interval_ms: Option<u64>,
    store_type: String,
    store_path: Option<String>,
    ssid: Option<String>,
    key: Option<String>,
    sim_failures: u32,
    log_level: String,
}

impl Config {
    /// Load configuration from environment variables
    fn from_env() -> Result<Self> {
        Ok(Self {
            mode: env::var("STALINK_MODE").unwrap_or_else(|_| "enabled".to_string()),
            reconnect_interval_ms: env::var("STALINK_RECONNECT_INTERVAL_MS")
                .ok()
                .map(|s| s.parse())
                .transpose()
                .map_err(|e| anyhow::anyhow!("STALINK_RECONNECT_INTERVAL_MS: {}", e))?,
            store_type: env::var("STALINK_STORE_TYPE").unwrap_or_else(|_| "memory".to_string()),
            store_path: env::var("STALINK_STORE_PATH").ok(),
            ssid: env::var("STALINK_SSID").ok().filter(|s| !s.is_empty()),
            key: env::var("STALINK_KEY").ok(),
            sim_failures: env::var("STALINK_SIM_FAILURES")
                .ok()
                .map(|s| s.parse())
                .transpose()
                .map_err(|e| anyhow::anyhow!("STALINK_SIM_FAILURES: {}", e))?
                .unwrap_or(0),
            log_level: env::var("STALINK_LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
        })
    }

    /// Validate the configuration
    fn validate(&self) -> Result<()> {
        self.station_mode()?;

        match self.store_type.as_str() {
            "file" | "memory" => {}
            _ => anyhow::bail!(
                "STALINK_STORE_TYPE '{}' is not supported. \
                Supported types: file, memory",
                self.store_type
            ),
        }

        if self.store_type == "file" {
            match self.store_path.as_deref() {
                None | Some("") => anyhow::bail!(
                    "STALINK_STORE_PATH is required when STALINK_STORE_TYPE=file. \
                    Set it via: export STALINK_STORE_PATH=/var/lib/stalink/store.json"
                ),
                Some(path) => {
                    if let Some(parent) = std::path::Path::new(path).parent()
                        && !parent.as_os_str().is_empty()
                        && !parent.exists()
                    {
                        anyhow::bail!(
                            "STALINK_STORE_PATH parent directory does not exist: {}. \
                                Create it first: sudo mkdir -p {}",
                            parent.display(),
                            parent.display()
                        );
                    }
                }
            }
        }

        if let Some(interval) = self.reconnect_interval_ms
            && !(100..=600_000).contains(&interval)
        {
            anyhow::bail!(
                "STALINK_RECONNECT_INTERVAL_MS must be between 100 and 600000. Got: {}",
                interval
            );
        }

        if self.sim_failures > 100 {
            anyhow::bail!(
                "STALINK_SIM_FAILURES must be at most 100. Got: {}",
                self.sim_failures
            );
        }

        if self.key.is_some() && self.ssid.is_none() {
            anyhow::bail!("STALINK_KEY is set but STALINK_SSID is not");
        }
        self.provisioning_record()?;

        match self.log_level.to_lowercase().as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            _ => anyhow::bail!(
                "STALINK_LOG_LEVEL '{}' is not valid. \
                Valid levels: trace, debug, info, warn, error",
                self.log_level
            ),
        }

        Ok(())
    }

    fn station_mode(&self) -> Result<StationMode> {
        match self.mode.to_lowercase().as_str() {
            "disabled" => Ok(StationMode::Disabled),
            "enabled" => Ok(StationMode::Enabled),
            "application_controlled" => Ok(StationMode::ApplicationControlled),
            _ => anyhow::bail!(
                "STALINK_MODE '{}' is not valid. \
                Valid modes: disabled, enabled, application_controlled",
                self.mode
            ),
        }
    }

    fn provisioning_record(&self) -> Result<Option<ProvisioningRecord>> {
        match &self.ssid {
            Some(ssid) => {
                let key = self.key.clone().unwrap_or_default();
                Ok(Some(ProvisioningRecord::new(ssid.as_str(), key)?))
            }
            None => Ok(None),
        }
    }

    fn link_config(&self) -> Result<LinkConfig> {
        let mut config = LinkConfig::new();
        config.initial_mode = self.station_mode()?;
        if let Some(interval) = self.reconnect_interval_ms {
            config.engine.reconnect_interval_ms = interval;
        }
        config.store = match self.store_type.as_str() {
            "file" => StoreConfig::File {
                path: self.store_path.clone().unwrap_or_default(),
            },
            _ => StoreConfig::Memory,
        };
        config.validate()?;
        Ok(config)
    }
}

fn main() -> ExitCode {
    let config = match Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            return StalinkExitCode::ConfigError.into();
        }
    };

    if let Err(e) = config.validate() {
        eprintln!("Configuration validation error: {}", e);
        return StalinkExitCode::ConfigError.into();
    }

    let log_level = match config.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder().with_max_level(log_level).finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
        return StalinkExitCode::ConfigError.into();
    }

    info!("Starting stalinkd daemon");

    let rt = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to create tokio runtime: {}", e);
            return StalinkExitCode::RuntimeError.into();
        }
    };

    let result = rt.block_on(async {
        if let Err(e) = run_daemon(config).await {
            error!("Daemon error: {}", e);
            StalinkExitCode::RuntimeError
        } else {
            StalinkExitCode::CleanShutdown
        }
    });

    result.into()
}

/// Run the daemon
async fn run_daemon(config: Config) -> Result<()> {
    let link_config = config.link_config()?;
    info!(
        "Station mode: {}, store: {}, reconnect interval: {:?}",
        link_config.initial_mode,
        link_config.store.type_name(),
        link_config.engine.reconnect_interval()
    );

    let registry = BackendRegistry::with_builtin();
    let store = registry.create_store(&link_config.store).await?;

    let (driver, radio, ip_stack) = sim::loopback(config.sim_failures);
    let (mut engine, handle, mut device_events) = ConnectivityManager::new(
        Box::new(driver),
        store,
        Box::new(ip_stack),
        link_config,
    )?;

    let radio_task = tokio::spawn(radio.run(handle.bridge()));
    let monitor_task = tokio::spawn(async move {
        while let Some(event) = device_events.recv().await {
            log_device_event(event);
        }
    });

    if let Some(record) = config.provisioning_record()? {
        info!("Provisioning SSID {} from environment", record.ssid_lossy());
        handle.provision(record)?;
    }

    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel();
    let mut engine_task =
        tokio::spawn(async move { engine.run_with_shutdown(Some(shutdown_rx)).await });

    info!("Daemon initialized successfully");

    tokio::select! {
        signal = wait_for_shutdown() => {
            let signal = signal?;
            info!("Received shutdown signal: {}", signal);
        }
        result = &mut engine_task => {
            // The engine only returns on its own if something went wrong
            radio_task.abort();
            monitor_task.abort();
            result??;
            anyhow::bail!("engine stopped unexpectedly");
        }
    }

    info!("Shutting down daemon");
    let _ = shutdown_tx.send(());

    let stopped = tokio::time::timeout(SHUTDOWN_TIMEOUT, engine_task).await;
    radio_task.abort();
    monitor_task.abort();

    match stopped {
        Ok(result) => result??,
        Err(_) => {
            warn!("Engine did not stop within {:?}", SHUTDOWN_TIMEOUT);
            anyhow::bail!("shutdown timed out");
        }
    }

    info!("Status at exit: {:?}", handle.status());
    Ok(())
}

fn log_device_event(event: DeviceEvent) {
    match event {
        DeviceEvent::WiFiConnectivityChange(change) => {
            info!("WiFi connectivity: {:?}", change);
        }
        DeviceEvent::InternetConnectivityChange { ipv4, ipv6 } => {
            info!("Internet connectivity: IPv4 {:?}, IPv6 {:?}", ipv4, ipv6);
        }
        DeviceEvent::InterfaceIpAddressChanged(change) => {
            info!("Interface address: {:?}", change);
        }
    }
}

/// Wait for shutdown signals (SIGTERM, SIGINT)
///
/// # Returns
///
/// Returns the name of the signal received.
#[cfg(unix)]
async fn wait_for_shutdown() -> Result<&'static str> {
    let mut sigterm = signal(SignalKind::terminate())
        .map_err(|e| anyhow::anyhow!("Failed to setup SIGTERM handler: {}", e))?;
    let mut sigint = signal(SignalKind::interrupt())
        .map_err(|e| anyhow::anyhow!("Failed to setup SIGINT handler: {}", e))?;

    let signal = tokio::select! {
        _ = sigterm.recv() => "SIGTERM",
        _ = sigint.recv() => "SIGINT",
    };
    Ok(signal)
}

/// Wait for shutdown signals (SIGINT only)
///
/// Fallback implementation for non-Unix platforms.
#[cfg(not(unix))]
async fn wait_for_shutdown() -> Result<&'static str> {
    tokio::signal::ctrl_c()
        .await
        .map_err(|e| anyhow::anyhow!("Failed to wait for CTRL-C: {}", e))?;
    Ok("SIGINT")
}
