//! Interfaces to the collaborators the engine drives and observes
//!
//! - [`WifiDriver`]: Connect/disconnect requests to the radio
//! - [`KeyValueStore`]: Persistent storage for provisioned credentials
//! - [`IpStack`]: Read-only interface configuration snapshots
//! - [`Scheduler`]: Deferred work and one-shot timers

pub mod wifi_driver;
pub mod kv_store;
pub mod ip_stack;
pub mod scheduler;

pub use wifi_driver::WifiDriver;
pub use kv_store::{KeyValueStore, KeyValueStoreFactory};
pub use ip_stack::IpStack;
pub use scheduler::Scheduler;
