//! Recurring ingestion cycles.
//!
//! [`run_scheduled`] runs one cycle immediately and then one per interval
//! until a [`SchedulerHandle`] is stopped or the process receives Ctrl-C.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::time::{self, MissedTickBehavior};
use tracing::{error, info};

use crate::orchestrator::IngestionOrchestrator;

/// How often a waiting scheduler checks its stop signal.
const STOP_POLL_INTERVAL: Duration = Duration::from_millis(200);

/// A cloneable stop signal for a running scheduler.
#[derive(Debug, Clone, Default)]
pub struct SchedulerHandle {
    stop_signal: Arc<AtomicBool>,
}

impl SchedulerHandle {
    /// Create a new handle.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Signal the scheduler to stop after the current cycle.
    pub fn stop(&self) {
        self.stop_signal.store(true, Ordering::SeqCst);
    }

    /// Check if the stop signal has been sent.
    #[must_use]
    pub fn should_stop(&self) -> bool {
        self.stop_signal.load(Ordering::SeqCst)
    }

    /// Reset the stop signal.
    pub fn reset(&self) {
        self.stop_signal.store(false, Ordering::SeqCst);
    }

    async fn stopped(&self) {
        while !self.should_stop() {
            time::sleep(STOP_POLL_INTERVAL).await;
        }
    }
}

/// Run cycles every `interval` until stopped.
///
/// A failing cycle is logged and the loop continues. Ctrl-C interrupts a
/// cycle in progress. Returns the number of cycles that completed.
pub async fn run_scheduled(
    orchestrator: &IngestionOrchestrator,
    interval: Duration,
    handle: SchedulerHandle,
) -> u64 {
    let mut ticker = time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut completed = 0;

    info!("Scheduler started, running every {}s", interval.as_secs());
    while !handle.should_stop() {
        tokio::select! {
            _ = ticker.tick() => {}
            () = handle.stopped() => break,
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted, stopping scheduler");
                break;
            }
        }

        tokio::select! {
            result = orchestrator.run_once() => match result {
                Ok(_) => completed += 1,
                Err(err) => error!("Ingestion cycle failed: {err}"),
            },
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted during a cycle, stopping scheduler");
                break;
            }
        }
    }

    info!("Scheduler stopped after {completed} cycle(s)");
    completed
}
