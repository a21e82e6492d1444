//! [`HealthSupervisor`] – dead-man switch over the pipeline stages.
//!
//! Every stage registers once and receives a [`HealthReporter`].  Each time
//! the stage completes a period it calls [`HealthReporter::report`], moving
//! its entry from [`StageHealth::Pending`] to [`StageHealth::Reported`].
//!
//! A fixed-rate supervisory task calls [`HealthSupervisor::tick`]:
//!
//! - every stage `Reported` → kick the [`WatchdogDevice`] and reset all
//!   entries to `Pending` as one unit;
//! - any stage still `Pending` → no kick, nothing reset.  The hardware
//!   countdown keeps running and eventually resets the device.
//!
//! A stage that stops running (for example because its hardware failed to
//! initialise) therefore guarantees a reset.  That is the intended failure
//! path, not something to recover from here.
//!
//! # Example
//!
//! ```
//! use std::time::Duration;
//! use laserbot_kernel::{HealthSupervisor, SimWatchdog, TickOutcome};
//!
//! let mut supervisor = HealthSupervisor::new(Box::new(SimWatchdog::new()), Duration::from_secs(5));
//! let sensing = supervisor.register("sensing");
//! let decision = supervisor.register("decision");
//!
//! sensing.report();
//! assert!(matches!(supervisor.tick(), TickOutcome::Withheld { .. }));
//!
//! decision.report();
//! assert_eq!(supervisor.tick(), TickOutcome::Kicked);
//! ```

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use laserbot_types::BotError;
use tracing::{debug, error, info, warn};

use crate::device::WatchdogDevice;

// ────────────────────────────────────────────────────────────────────────────
// Public types
// ────────────────────────────────────────────────────────────────────────────

/// Liveness state of one stage within the current supervisory cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageHealth {
    /// No report yet this cycle.
    Pending,
    /// The stage has completed at least one period this cycle.
    Reported,
}

/// Result of one [`HealthSupervisor::tick`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickOutcome {
    /// All stages reported; the watchdog was kicked and every entry reset.
    Kicked,
    /// At least one stage did not report; no kick was sent.
    Withheld { pending: Vec<String> },
    /// The watchdog device could not be armed or kicked.
    DeviceFault,
}

// ────────────────────────────────────────────────────────────────────────────
// HealthRecord
// ────────────────────────────────────────────────────────────────────────────

struct StageEntry {
    name: String,
    health: StageHealth,
}

/// Named per-stage liveness flags.
///
/// Only reachable through [`HealthReporter::report`] (set one entry) and the
/// supervisor's collective check (read and reset all entries together).
#[derive(Default)]
pub struct HealthRecord {
    entries: Mutex<Vec<StageEntry>>,
}

impl HealthRecord {
    fn lock(&self) -> MutexGuard<'_, Vec<StageEntry>> {
        // Entries are plain enums; a panic mid-update cannot corrupt them.
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn register(&self, name: &str) -> usize {
        let mut entries = self.lock();
        if let Some(idx) = entries.iter().position(|e| e.name == name) {
            return idx;
        }
        entries.push(StageEntry {
            name: name.to_string(),
            health: StageHealth::Pending,
        });
        entries.len() - 1
    }

    fn mark_reported(&self, idx: usize) {
        if let Some(entry) = self.lock().get_mut(idx) {
            entry.health = StageHealth::Reported;
        }
    }

    /// Names of the stages that have not reported this cycle.
    fn pending(&self) -> Vec<String> {
        self.lock()
            .iter()
            .filter(|e| e.health == StageHealth::Pending)
            .map(|e| e.name.clone())
            .collect()
    }

    fn reset(&self) {
        for entry in self.lock().iter_mut() {
            entry.health = StageHealth::Pending;
        }
    }

    /// Current state of `name`, or `None` if it was never registered.
    pub fn health(&self, name: &str) -> Option<StageHealth> {
        self.lock().iter().find(|e| e.name == name).map(|e| e.health)
    }

    /// Names of all registered stages, in registration order.
    pub fn stages(&self) -> Vec<String> {
        self.lock().iter().map(|e| e.name.clone()).collect()
    }
}

// ────────────────────────────────────────────────────────────────────────────
// HealthReporter
// ────────────────────────────────────────────────────────────────────────────

/// Handle a stage uses to prove it completed a period.  Cheap to clone.
#[derive(Clone)]
pub struct HealthReporter {
    record: Arc<HealthRecord>,
    idx: usize,
    name: Arc<str>,
}

impl HealthReporter {
    /// Mark this stage [`StageHealth::Reported`] for the current cycle.
    pub fn report(&self) {
        self.record.mark_reported(self.idx);
    }

    /// Stage name this reporter was registered under.
    pub fn stage(&self) -> &str {
        &self.name
    }
}

impl std::fmt::Debug for HealthReporter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HealthReporter").field("stage", &self.name).finish()
    }
}

// ────────────────────────────────────────────────────────────────────────────
// HealthSupervisor
// ────────────────────────────────────────────────────────────────────────────

/// Ties per-stage liveness to a hardware watchdog timeout.
pub struct HealthSupervisor {
    record: Arc<HealthRecord>,
    device: Box<dyn WatchdogDevice>,
    timeout: Duration,
    armed: bool,
    kicks: u64,
    missed_ticks: u64,
    arm_failures: u64,
}

impl HealthSupervisor {
    /// Create a supervisor owning `device`.  The device is armed with
    /// `timeout` on the first [`tick`][Self::tick] (or an explicit
    /// [`arm`][Self::arm]).
    pub fn new(device: Box<dyn WatchdogDevice>, timeout: Duration) -> Self {
        Self {
            record: Arc::new(HealthRecord::default()),
            device,
            timeout,
            armed: false,
            kicks: 0,
            missed_ticks: 0,
            arm_failures: 0,
        }
    }

    /// Register `stage` and return its reporter.  Registering the same name
    /// twice returns a reporter for the existing entry.
    pub fn register(&mut self, stage: &str) -> HealthReporter {
        let idx = self.record.register(stage);
        debug!(stage, "stage registered with health supervisor");
        HealthReporter {
            record: Arc::clone(&self.record),
            idx,
            name: Arc::from(stage),
        }
    }

    /// Arm the watchdog device.  No-op if already armed.
    pub fn arm(&mut self) -> Result<(), BotError> {
        if self.armed {
            return Ok(());
        }
        self.device.arm(self.timeout)?;
        self.armed = true;
        info!(timeout_ms = self.timeout.as_millis() as u64, "watchdog armed");
        Ok(())
    }

    /// Run one supervisory cycle: collective check, then kick or withhold.
    ///
    /// With no registered stages the check passes trivially and the
    /// watchdog is kicked.
    pub fn tick(&mut self) -> TickOutcome {
        if let Err(e) = self.arm() {
            self.arm_failures += 1;
            if self.arm_failures == 1 {
                error!(error = %e, "failed to arm watchdog");
            } else {
                debug!(error = %e, attempts = self.arm_failures, "watchdog still not armed");
            }
            return TickOutcome::DeviceFault;
        }
        self.arm_failures = 0;

        let pending = self.record.pending();
        if !pending.is_empty() {
            self.missed_ticks += 1;
            if self.missed_ticks == 1 {
                warn!(?pending, "stages failed to report; watchdog not kicked");
            } else {
                debug!(?pending, missed_ticks = self.missed_ticks, "watchdog still withheld");
            }
            return TickOutcome::Withheld { pending };
        }

        // Reports are only consumed by a successful kick.
        if let Err(e) = self.device.kick() {
            error!(error = %e, "failed to kick watchdog");
            return TickOutcome::DeviceFault;
        }
        self.record.reset();
        if self.missed_ticks > 0 {
            info!(missed_ticks = self.missed_ticks, "all stages reporting again");
        }
        self.missed_ticks = 0;
        self.kicks += 1;
        TickOutcome::Kicked
    }

    /// State of a registered stage.
    pub fn health(&self, stage: &str) -> Option<StageHealth> {
        self.record.health(stage)
    }

    /// Shared view of the liveness flags.
    pub fn record(&self) -> Arc<HealthRecord> {
        Arc::clone(&self.record)
    }

    /// Number of successful kicks so far.
    pub fn kicks(&self) -> u64 {
        self.kicks
    }

    /// Consecutive ticks without a kick.
    pub fn missed_ticks(&self) -> u64 {
        self.missed_ticks
    }

    /// Consecutive ticks on which the device could not be armed.
    pub fn arm_failures(&self) -> u64 {
        self.arm_failures
    }

    /// Configured watchdog timeout.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// `true` once the device reports its countdown elapsed.
    pub fn device_expired(&self) -> bool {
        self.device.has_expired()
    }
}
