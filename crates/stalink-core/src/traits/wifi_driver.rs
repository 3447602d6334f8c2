// # Wi-Fi Driver Trait
//
// Defines the request surface of the station radio driver.
//
// ## Implementations
//
// - Loopback radio: `stalinkd` (bench testing)
// - Vendor SDK bindings live outside this workspace
//
// ## Usage
//
// ```rust,ignore
// use stalink_core::WifiDriver;
//
// driver.connect(&record).await?;   // outcome arrives later as a DriverStatus
// driver.disconnect().await?;
// ```

use async_trait::async_trait;

use crate::credentials::ProvisioningRecord;

/// Trait for station radio drivers
///
/// Requests are fire-and-forget. `Ok(())` means the driver accepted the
/// request; the outcome (associated, address acquired, failure) is reported
/// later through the driver's status callback, which must be wired to an
/// [`EventBridge`](crate::bridge::EventBridge).
///
/// # Trust Level: Untrusted
///
/// ## Allowed Capabilities
/// - ✅ Submit connect/disconnect requests to the radio
/// - ✅ Report status through the event bridge from any thread
///
/// ## Forbidden Capabilities
/// - ❌ Wait for the link to come up before returning
/// - ❌ Retry or back off on its own (owned by `ConnectivityManager`)
/// - ❌ Read or write the credential store
/// - ❌ Call back into the engine directly instead of posting events
#[async_trait]
pub trait WifiDriver: Send + Sync {
    /// Ask the radio to join the network described by `record`
    ///
    /// # Returns
    ///
    /// - `Ok(())`: Request accepted
    /// - `Err(Error::Driver)`: Request rejected; station state is left unchanged
    async fn connect(&self, record: &ProvisioningRecord) -> Result<(), crate::Error>;

    /// Ask the radio to leave the current network
    async fn disconnect(&self) -> Result<(), crate::Error>;

    /// Driver name (for logging)
    fn driver_name(&self) -> &'static str;
}
