// # Scheduler Trait
//
// Work and timer substrate used by the engine to re-invoke itself.
// Both primitives deliver their result as a `LinkEvent` posted to the engine
// queue, so re-invocation always happens on the event-processing task.

use std::time::Duration;

use crate::bridge::EventPoster;
use crate::events::LinkEvent;

/// Trait for deferred-work and one-shot timer primitives
///
/// # Trust Level: Trusted (Core Component)
///
/// ## Forbidden Capabilities
/// - ❌ Invoke engine code directly (post events instead)
/// - ❌ Block the caller
pub trait Scheduler: Send + Sync {
    /// Post `event` for processing after the current pass
    fn schedule_work(&self, poster: &EventPoster, event: LinkEvent) -> Result<(), crate::Error> {
        poster.post(event)
    }

    /// Post `event` once `delay` has elapsed
    ///
    /// A timer is never cancelled by the engine; one that fires late simply
    /// triggers another full reconciliation pass.
    fn start_timer(
        &self,
        delay: Duration,
        poster: &EventPoster,
        event: LinkEvent,
    ) -> Result<(), crate::Error>;
}
