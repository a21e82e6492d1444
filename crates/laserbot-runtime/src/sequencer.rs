//! [`Sequencer`] – fixed-rate scheduling of the pipeline stages and the
//! health supervisor.
//!
//! Each stage gets its own Tokio task driven by a [`tokio::time::interval`].
//! The stage body runs on the blocking pool, so a slow camera read or a busy
//! detector never stalls the supervisor or the other stages.  Missed periods
//! are skipped, not replayed.
//!
//! The supervisor task calls [`HealthSupervisor::tick`] once per period.
//! The sequencer returns when the caller signals shutdown or when the
//! watchdog device reports that its countdown elapsed (only observable with
//! a simulated device; real hardware resets the machine first).
//!
//! # Example
//!
//! ```rust,no_run
//! # async fn demo(sequencer: laserbot_runtime::Sequencer) {
//! let (stop_tx, stop_rx) = tokio::sync::watch::channel(false);
//! let outcome = sequencer.run(stop_rx).await;
//! # drop(stop_tx);
//! # let _ = outcome;
//! # }
//! ```

use std::time::Duration;

use laserbot_kernel::{HealthSupervisor, TickOutcome};
use tokio::sync::watch;
use tokio::task::JoinSet;
use tokio::time::{Instant, MissedTickBehavior, interval, interval_at};
use tracing::{debug, error, info, warn};

use crate::stage::Stage;

// ────────────────────────────────────────────────────────────────────────────
// Periods
// ────────────────────────────────────────────────────────────────────────────

/// Invocation period of each task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StagePeriods {
    pub sensing: Duration,
    pub decision: Duration,
    pub actuation: Duration,
    pub config_refresh: Duration,
    pub supervisor: Duration,
}

impl Default for StagePeriods {
    fn default() -> Self {
        Self {
            sensing: Duration::from_millis(50),
            decision: Duration::from_millis(50),
            actuation: Duration::from_millis(50),
            config_refresh: Duration::from_millis(100),
            supervisor: Duration::from_millis(100),
        }
    }
}

impl StagePeriods {
    /// Stages that cannot report at least once per supervisory period.
    /// Those stages will cause withheld kicks even when healthy.
    pub fn slower_than_supervisor(&self) -> Vec<(&'static str, Duration)> {
        [
            (crate::stages::SENSING, self.sensing),
            (crate::stages::DECISION, self.decision),
            (crate::stages::ACTUATION, self.actuation),
            (crate::stages::CONFIG_REFRESH, self.config_refresh),
        ]
        .into_iter()
        .filter(|(_, period)| *period > self.supervisor)
        .collect()
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Sequencer
// ────────────────────────────────────────────────────────────────────────────

/// Why [`Sequencer::run`] returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// The shutdown signal fired.
    Shutdown,
    /// The watchdog countdown elapsed without a kick.
    WatchdogExpired,
}

struct ScheduledStage {
    stage: Box<dyn Stage>,
    period: Duration,
}

/// Owns the stages and the supervisor until [`run`][Self::run] is called.
pub struct Sequencer {
    stages: Vec<ScheduledStage>,
    supervisor: HealthSupervisor,
    supervisor_period: Duration,
}

impl Sequencer {
    pub fn new(supervisor: HealthSupervisor, supervisor_period: Duration) -> Self {
        Self {
            stages: Vec::new(),
            supervisor,
            supervisor_period,
        }
    }

    /// Schedule `stage` every `period`.
    pub fn add_stage(&mut self, stage: Box<dyn Stage>, period: Duration) {
        self.stages.push(ScheduledStage { stage, period });
    }

    /// Number of scheduled stages.
    pub fn stage_count(&self) -> usize {
        self.stages.len()
    }

    /// Run every stage and the supervisor until `shutdown` becomes `true`
    /// (or its sender is dropped) or the watchdog expires.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) -> RunOutcome {
        let Sequencer {
            stages,
            mut supervisor,
            supervisor_period,
        } = self;

        let (stop_tx, stop_rx) = watch::channel(false);
        let mut tasks = JoinSet::new();
        for scheduled in stages {
            tasks.spawn(run_stage(scheduled, stop_rx.clone()));
        }

        info!(
            stages = tasks.len(),
            supervisor_period_ms = supervisor_period.as_millis() as u64,
            "sequencer started"
        );

        // The first check waits one period so every stage gets a chance to run.
        let mut ticker = interval_at(Instant::now() + supervisor_period, supervisor_period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        let outcome = loop {
            tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        info!("shutdown requested");
                        break RunOutcome::Shutdown;
                    }
                }
                _ = ticker.tick() => {
                    if supervisor.device_expired() {
                        error!(
                            timeout_ms = supervisor.timeout().as_millis() as u64,
                            missed_ticks = supervisor.missed_ticks(),
                            "watchdog expired; device reset"
                        );
                        break RunOutcome::WatchdogExpired;
                    }
                    if let TickOutcome::Kicked = supervisor.tick() {
                        debug!(kicks = supervisor.kicks(), "watchdog kicked");
                    }
                }
            }
        };

        let _ = stop_tx.send(true);
        while let Some(joined) = tasks.join_next().await {
            if let Err(e) = joined {
                error!(error = %e, "stage task failed");
            }
        }
        info!(?outcome, kicks = supervisor.kicks(), "sequencer stopped");
        outcome
    }
}

async fn run_stage(scheduled: ScheduledStage, mut stop: watch::Receiver<bool>) {
    let ScheduledStage { mut stage, period } = scheduled;
    let name = stage.name().to_string();
    let mut ticker = interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    debug!(stage = %name, period_ms = period.as_millis() as u64, "stage scheduled");

    loop {
        tokio::select! {
            _ = stop.changed() => break,
            _ = ticker.tick() => {
                let handle = tokio::task::spawn_blocking(move || {
                    stage.run_once();
                    stage
                });
                match handle.await {
                    Ok(returned) => stage = returned,
                    Err(e) => {
                        // The stage is gone; it will never report again.
                        error!(stage = %name, error = %e, "stage panicked");
                        return;
                    }
                }
            }
        }
    }

    let handle = tokio::task::spawn_blocking(move || {
        stage.shutdown();
    });
    if let Err(e) = handle.await {
        warn!(stage = %name, error = %e, "stage shutdown panicked");
    }
    debug!(stage = %name, "stage stopped");
}
