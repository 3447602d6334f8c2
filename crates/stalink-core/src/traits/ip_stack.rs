// # IP Stack Trait
//
// Read-only view of the station interface in the IP stack, used to infer
// internet connectivity. The engine never configures addresses or routes.

use crate::connectivity::IpSnapshot;

/// Trait for IP stack query surfaces
///
/// # Trust Level: Semi-Trusted
///
/// ## Allowed Capabilities
/// - ✅ Read interface, address, route and DNS configuration
///
/// ## Forbidden Capabilities
/// - ❌ Block (the snapshot is taken on the event-processing task)
/// - ❌ Probe the network
/// - ❌ Modify interface configuration
pub trait IpStack: Send + Sync {
    /// Current configuration of the station interface
    fn snapshot(&self) -> IpSnapshot;
}
