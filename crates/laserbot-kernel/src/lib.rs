//! `laserbot-kernel` – Safety & Supervision
//!
//! Enforces that the whole pipeline keeps making progress.  It does not
//! think; it only decides whether the hardware watchdog gets kicked.
//!
//! # Modules
//!
//! - [`health`] – [`HealthSupervisor`][health::HealthSupervisor]:
//!   a dead-man switch.  Every registered stage must call
//!   [`HealthReporter::report`][health::HealthReporter::report] once per
//!   supervisory cycle; the watchdog is kicked only when all of them did.
//! - [`device`] – [`WatchdogDevice`][device::WatchdogDevice] trait with an
//!   in-process [`SimWatchdog`][device::SimWatchdog] and, on Linux, the
//!   `/dev/watchdog` backed [`LinuxWatchdog`][device::LinuxWatchdog].

pub mod device;
pub mod health;

#[cfg(target_os = "linux")]
pub use device::LinuxWatchdog;
pub use device::{SimWatchdog, WatchdogDevice};
pub use health::{HealthRecord, HealthReporter, HealthSupervisor, StageHealth, TickOutcome};
