//! Tokio-backed [`Scheduler`]
//!
//! Timers are tasks in a [`JoinSet`] owned by the scheduler, so dropping the
//! scheduler (engine shutdown) aborts every outstanding timer.

use std::sync::Mutex;
use std::time::Duration;

use tokio::task::JoinSet;
use tracing::{debug, trace};

use crate::bridge::EventPoster;
use crate::error::{Error, Result};
use crate::events::LinkEvent;
use crate::traits::Scheduler;

/// Scheduler running one-shot timers on the current tokio runtime
#[derive(Debug, Default)]
pub struct TokioScheduler {
    timers: Mutex<JoinSet<()>>,
}

impl TokioScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of timers that have not fired yet
    pub fn pending(&self) -> usize {
        self.timers.lock().map(|t| t.len()).unwrap_or(0)
    }
}

impl Scheduler for TokioScheduler {
    fn start_timer(&self, delay: Duration, poster: &EventPoster, event: LinkEvent) -> Result<()> {
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| Error::timer(format!("no tokio runtime: {}", e)))?;
        let mut timers = self
            .timers
            .lock()
            .map_err(|_| Error::timer("timer set lock poisoned"))?;

        // Reap timers that already fired
        while timers.try_join_next().is_some() {}

        trace!("arming timer for {:?} -> {:?}", delay, event);
        let poster = poster.clone();
        timers.spawn_on(
            async move {
                tokio::time::sleep(delay).await;
                if let Err(e) = poster.post(event) {
                    debug!("timer fired after engine stopped: {}", e);
                }
            },
            &runtime,
        );
        Ok(())
    }
}
