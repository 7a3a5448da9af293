//! Periodic refresh and stale-response guarding
//!
//! [`Poller`] owns a recurring tokio task with an explicit `start`/`stop`
//! lifecycle; dropping it stops the task so a torn-down view never leaks a timer.
//! [`ResponseSequencer`] lets the owner of a list discard responses that
//! arrive after a newer request was issued.

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::debug;

/// Cancellable fixed-period task. The first run happens immediately.
#[derive(Debug)]
pub struct Poller {
    period: Duration,
    handle: Option<JoinHandle<()>>,
}

impl Poller {
    /// Spawn `task` every `period` on the current tokio runtime
    pub fn start<F, Fut>(period: Duration, mut task: F) -> Self
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        debug!(period_secs = period.as_secs(), "poller started");
        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                task().await;
            }
        });

        Self {
            period,
            handle: Some(handle),
        }
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    pub fn is_running(&self) -> bool {
        self.handle.as_ref().map_or(false, |handle| !handle.is_finished())
    }

    /// Cancel the task, including a run that is in flight. Idempotent.
    pub fn stop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
            debug!("poller stopped");
        }
    }
}

impl Drop for Poller {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Issuance-order ticket for one outstanding request
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct Ticket(u64);

/// Last-issued-wins ordering for overlapping fetches
#[derive(Debug, Default)]
pub struct ResponseSequencer {
    issued: AtomicU64,
    applied: AtomicU64,
}

impl ResponseSequencer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take a ticket before issuing a request
    pub fn issue(&self) -> Ticket {
        Ticket(self.issued.fetch_add(1, Ordering::SeqCst) + 1)
    }

    /// Whether a response for `ticket` may be applied. Returns false when a
    /// response for a later-issued ticket has already been applied.
    pub fn accept(&self, ticket: Ticket) -> bool {
        self.applied
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |applied| {
                (ticket.0 > applied).then_some(ticket.0)
            })
            .is_ok()
    }
}
