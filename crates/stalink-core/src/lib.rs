// # stalink-core
//
// Core library for the Wi-Fi station link reconciliation engine.
//
// ## Architecture Overview
//
// This library keeps a single station interface converged on its desired
// policy:
// - **WifiDriver**: Trait for issuing connect/disconnect requests to the radio
// - **KeyValueStore**: Trait for the persistent store holding credentials
// - **IpStack**: Trait for querying the interface's IP configuration
// - **Scheduler**: Trait for deferred work and one-shot backoff timers
// - **ConnectivityManager**: Engine that reconciles mode against link state
// - **EventBridge / LinkHandle**: Producer side of the engine queue
// - **BackendRegistry**: Plugin-based registry for key-value store backends
//
// ## Design Principles
//
// 1. **Single consumer**: Policy state is only touched by the engine task
// 2. **Event-Driven**: Driver callbacks and timers post events, never mutate
// 3. **Edge-triggered**: Notifications are published only on change
// 4. **Library-First**: The daemon is a thin host for this crate

pub mod bridge;
pub mod config;
pub mod connectivity;
pub mod credentials;
pub mod engine;
pub mod error;
pub mod events;
pub mod policy;
pub mod registry;
pub mod state;
pub mod timer;
pub mod traits;

// Re-export core types for convenience
pub use bridge::{EventBridge, EventPoster, LinkHandle};
pub use config::{EngineConfig, LinkConfig, StoreConfig};
pub use connectivity::{ConnectivityDetector, ConnectivityFlags, IpSnapshot};
pub use credentials::{CredentialStore, ProvisioningRecord};
pub use engine::{ConnectivityManager, StationStatus};
pub use error::{Error, Result};
pub use events::{
    ConnectivityChange, DeviceEvent, DriverReport, DriverStatus, InterfaceIpChange, LinkEvent,
};
pub use policy::{PolicyState, ReconnectBookkeeping, StationMode, StationState};
pub use registry::BackendRegistry;
pub use state::{FileKvStore, MemoryKvStore};
pub use timer::TokioScheduler;
pub use traits::{IpStack, KeyValueStore, Scheduler, WifiDriver};
