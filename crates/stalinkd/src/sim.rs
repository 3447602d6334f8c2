// # Loopback radio
//
// A simulated Wi-Fi radio and IP stack so the engine can run on a host.
//
// `SimDriver` is handed to the engine. Each request is forwarded to a
// `SimRadio` task which plays back the status sequence a real radio would
// report through the engine's event bridge:
//
// ```text
// connect    -> Connecting, (NoApFound while failures remain | Connected, GotIp)
// disconnect -> Disconnected
// ```

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use stalink_core::error::{Error, Result};
use stalink_core::traits::{IpStack, WifiDriver};
use stalink_core::{DriverStatus, EventBridge, IpSnapshot, ProvisioningRecord};
use tokio::sync::mpsc;
use tracing::{debug, info};

/// Delay between two simulated radio statuses
const STEP_DELAY: Duration = Duration::from_millis(300);

#[derive(Debug)]
enum RadioCommand {
    Connect { ssid: String },
    Disconnect,
}

/// Interface configuration shared by the radio task and the IP stack
#[derive(Debug, Clone, Default)]
pub struct SimIpStack {
    snapshot: Arc<Mutex<IpSnapshot>>,
}

impl SimIpStack {
    fn set(&self, snapshot: IpSnapshot) {
        *self.snapshot.lock().unwrap_or_else(PoisonError::into_inner) = snapshot;
    }
}

impl IpStack for SimIpStack {
    fn snapshot(&self) -> IpSnapshot {
        *self.snapshot.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Driver half: forwards requests to the radio task
pub struct SimDriver {
    commands: mpsc::UnboundedSender<RadioCommand>,
}

#[async_trait::async_trait]
impl WifiDriver for SimDriver {
    async fn connect(&self, record: &ProvisioningRecord) -> Result<()> {
        self.commands
            .send(RadioCommand::Connect {
                ssid: record.ssid_lossy(),
            })
            .map_err(|_| Error::driver("simulated radio is gone"))
    }

    async fn disconnect(&self) -> Result<()> {
        self.commands
            .send(RadioCommand::Disconnect)
            .map_err(|_| Error::driver("simulated radio is gone"))
    }

    fn driver_name(&self) -> &'static str {
        "sim"
    }
}

/// Radio half: reports statuses for the requests it receives
pub struct SimRadio {
    commands: mpsc::UnboundedReceiver<RadioCommand>,
    ip_stack: SimIpStack,
    failures_remaining: u32,
}

/// Build a connected (driver, radio, ip stack) triple
///
/// The first `failures` connection attempts end in `NoApFound`.
pub fn loopback(failures: u32) -> (SimDriver, SimRadio, SimIpStack) {
    let (tx, rx) = mpsc::unbounded_channel();
    let ip_stack = SimIpStack::default();
    (
        SimDriver { commands: tx },
        SimRadio {
            commands: rx,
            ip_stack: ip_stack.clone(),
            failures_remaining: failures,
        },
        ip_stack,
    )
}

impl SimRadio {
    /// Serve requests until the driver half is dropped
    pub async fn run(mut self, bridge: EventBridge) {
        while let Some(command) = self.commands.recv().await {
            self.execute(command, &bridge).await;
        }
        debug!("Simulated radio stopped");
    }

    async fn execute(&mut self, command: RadioCommand, bridge: &EventBridge) {
        match command {
            RadioCommand::Connect { ssid } => {
                info!("sim radio: joining {}", ssid);
                bridge.on_driver_event(DriverStatus::Connecting);
                tokio::time::sleep(STEP_DELAY).await;

                if self.failures_remaining > 0 {
                    self.failures_remaining -= 1;
                    info!(
                        "sim radio: {} not found ({} failure(s) left)",
                        ssid, self.failures_remaining
                    );
                    bridge.on_driver_event(DriverStatus::NoApFound);
                    return;
                }

                bridge.on_driver_event(DriverStatus::Connected);
                tokio::time::sleep(STEP_DELAY).await;
                self.ip_stack.set(IpSnapshot {
                    interface_up: true,
                    link_up: true,
                    dns_configured: true,
                    ipv4_address: true,
                    ipv4_gateway: true,
                    valid_global_ipv6: 1,
                    ipv6_default_route: true,
                });
                bridge.on_driver_event(DriverStatus::GotIp);
            }
            RadioCommand::Disconnect => {
                info!("sim radio: leaving network");
                self.ip_stack.set(IpSnapshot::default());
                bridge.on_driver_event(DriverStatus::Disconnected);
            }
        }
    }
}
