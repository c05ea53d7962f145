//! Bounded waiting for objects created through fire-and-forget calls.

use deckflow_config::WaiterConfig;
use log::debug;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::{Instant, MissedTickBehavior};

/// How a wait for a created object ended. Neither outcome is an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreationOutcome {
    /// The observed count rose above the starting count.
    Created,
    /// The budget elapsed first.
    TimedOut,
}

impl CreationOutcome {
    /// Whether the object appeared in time.
    pub fn is_created(self) -> bool {
        matches!(self, CreationOutcome::Created)
    }
}

/// Poll cadence and overall budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollOptions {
    pub interval: Duration,
    pub timeout: Duration,
}

impl PollOptions {
    pub fn new(interval: Duration, timeout: Duration) -> Self {
        Self { interval, timeout }
    }
}

impl Default for PollOptions {
    fn default() -> Self {
        Self::from(&WaiterConfig::default())
    }
}

impl From<&WaiterConfig> for PollOptions {
    fn from(config: &WaiterConfig) -> Self {
        Self::new(config.poll_interval(), config.timeout())
    }
}

/// Poll `observe` until it reports more than `before_count` objects.
///
/// `before_count` must be captured before the creation request is issued.
/// The first poll happens one interval after the call. Once the wait
/// resolves, by success or by deadline, `observe` is never invoked again.
pub async fn await_creation<F>(
    before_count: usize,
    mut observe: F,
    options: PollOptions,
) -> CreationOutcome
where
    F: FnMut() -> usize,
{
    let interval = options.interval.max(Duration::from_millis(1));
    let poll = async {
        let mut ticker = tokio::time::interval_at(Instant::now() + interval, interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut polls = 0u32;
        loop {
            ticker.tick().await;
            polls += 1;
            let count = observe();
            if count > before_count {
                debug!("created object observed (polls={polls}, count={count})");
                return;
            }
        }
    };

    match tokio::time::timeout(options.timeout, poll).await {
        Ok(()) => CreationOutcome::Created,
        Err(_) => {
            debug!(
                "creation wait timed out (before_count={before_count}, timeout_ms={})",
                options.timeout.as_millis()
            );
            CreationOutcome::TimedOut
        }
    }
}

/// Wait for a published object count to exceed `before_count`.
///
/// Used when the creation collaborator can signal its count directly instead
/// of being polled. A closed channel can never report a new object, so it ends
/// the wait immediately as `TimedOut`.
pub async fn await_count_change(
    before_count: usize,
    mut counts: watch::Receiver<usize>,
    timeout: Duration,
) -> CreationOutcome {
    let wait = counts.wait_for(|count| *count > before_count);
    match tokio::time::timeout(timeout, wait).await {
        Ok(Ok(_)) => CreationOutcome::Created,
        Ok(Err(_)) => {
            debug!("count channel closed before the object appeared");
            CreationOutcome::TimedOut
        }
        Err(_) => CreationOutcome::TimedOut,
    }
}
