//! Sweep — the unattended reminder pass over every expiring policy.
//!
//! A tick keeps no cursor between runs. It re-evaluates from scratch over a
//! window of `max(thresholds)` days, so a late or skipped tick simply finds
//! more pending thresholds and catches up. A failed send is logged and left
//! pending for the next tick; only a policy-source or ledger failure fails
//! the tick as a whole.
//!
//! Overlapping ticks and concurrent manual triggers are tolerated: the
//! ledger's insert-if-absent contract keeps the record count at one.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::{sync::watch, task::JoinHandle, time::MissedTickBehavior};

use crate::{
    engine::RenewalEngine,
    error::{RenewalError, RenewalResult},
};

pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(5 * 60);

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SweepSummary {
    /// Pending (policy, threshold) pairs attempted this tick.
    pub processed: u32,
    /// Pairs whose dispatch succeeded.
    pub sent: u32,
}

impl RenewalEngine {
    /// Run one sweep tick synchronously.
    pub fn run_sweep(&self) -> RenewalResult<SweepSummary> {
        let window = self.reminders.max_threshold();
        let views = self.list_expiring(window)?;

        let mut summary = SweepSummary::default();
        for view in &views {
            for &threshold in &view.pending_thresholds {
                summary.processed += 1;
                match self.dispatch_and_record(&view.policy, view.expiry(), threshold) {
                    Ok(_) => summary.sent += 1,
                    Err(err @ RenewalError::Dispatch { .. }) => {
                        log::warn!("sweep: {err}; left pending for the next tick");
                    }
                    Err(err) => return Err(err),
                }
            }
        }

        log::info!(
            "sweep: {} expiring policies, {} reminders processed, {} sent",
            views.len(),
            summary.processed,
            summary.sent
        );
        Ok(summary)
    }
}

/// Drives `RenewalEngine::run_sweep` on a fixed interval.
pub struct SweepScheduler {
    engine:   Arc<RenewalEngine>,
    interval: Duration,
}

impl SweepScheduler {
    pub fn new(engine: Arc<RenewalEngine>, interval: Duration) -> Self {
        Self { engine, interval }
    }

    /// Run one tick now, without waiting on the timer.
    pub fn run_once(&self) -> RenewalResult<SweepSummary> {
        self.engine.run_sweep()
    }

    /// Spawn the periodic task on the current tokio runtime. The first tick
    /// fires immediately; a tick that overruns delays the next one rather
    /// than bursting to catch up.
    pub fn start(&self) -> SweepHandle {
        let (stop_tx, mut stop_rx) = watch::channel(false);
        let engine = self.engine.clone();
        let period = self.interval;

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            log::info!("sweep scheduler started (interval {period:?})");
            loop {
                tokio::select! {
                    _ = ticker.tick() => {}
                    _ = stop_rx.changed() => break,
                }
                let engine = engine.clone();
                match tokio::task::spawn_blocking(move || engine.run_sweep()).await {
                    Ok(Ok(_)) => {}
                    Ok(Err(err)) => log::error!("sweep tick failed: {err}"),
                    Err(err) => log::error!("sweep tick aborted: {err}"),
                }
            }
            log::info!("sweep scheduler stopped");
        });

        SweepHandle { stop: stop_tx, task }
    }
}

/// Owns a running scheduler task.
pub struct SweepHandle {
    stop: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl SweepHandle {
    /// Signal the task and wait for any in-flight tick to finish.
    pub async fn stop(self) {
        let _ = self.stop.send(true);
        if let Err(err) = self.task.await {
            log::error!("sweep scheduler task ended abnormally: {err}");
        }
    }
}
