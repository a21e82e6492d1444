//! [`WatchdogDevice`] – the hardware timer behind the dead-man switch.
//!
//! Once armed, the device resets the machine unless [`WatchdogDevice::kick`]
//! is called again before the timeout elapses.  Arming cannot be undone from
//! software.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use laserbot_types::BotError;

/// A countdown timer that forces a device reset when it runs out.
pub trait WatchdogDevice: Send {
    /// Start (or restart) the countdown with `timeout`.
    fn arm(&mut self, timeout: Duration) -> Result<(), BotError>;

    /// Push the deadline back by one full timeout.
    fn kick(&mut self) -> Result<(), BotError>;

    /// `true` once the countdown has elapsed.  Real hardware never gets to
    /// answer `true`: the machine is already resetting.
    fn has_expired(&self) -> bool {
        false
    }
}

// ────────────────────────────────────────────────────────────────────────────
// SimWatchdog
// ────────────────────────────────────────────────────────────────────────────

/// In-process watchdog that tracks its own deadline instead of resetting
/// anything.  The sequencer treats [`WatchdogDevice::has_expired`] as a
/// simulated reset.
#[derive(Debug, Default)]
pub struct SimWatchdog {
    timeout: Duration,
    deadline: Option<Instant>,
    kicks: Arc<AtomicU64>,
}

impl SimWatchdog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Shared kick counter; stays readable after the device is moved into a
    /// supervisor.
    pub fn kick_counter(&self) -> Arc<AtomicU64> {
        Arc::clone(&self.kicks)
    }

    /// `true` once [`arm`][WatchdogDevice::arm] has been called.
    pub fn is_armed(&self) -> bool {
        self.deadline.is_some()
    }
}

impl WatchdogDevice for SimWatchdog {
    fn arm(&mut self, timeout: Duration) -> Result<(), BotError> {
        self.timeout = timeout;
        self.deadline = Some(Instant::now() + timeout);
        Ok(())
    }

    fn kick(&mut self) -> Result<(), BotError> {
        if self.deadline.is_none() {
            return Err(BotError::hardware("sim_watchdog", "kick before arm"));
        }
        self.deadline = Some(Instant::now() + self.timeout);
        self.kicks.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    fn has_expired(&self) -> bool {
        self.deadline.is_some_and(|d| Instant::now() >= d)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// LinuxWatchdog
// ────────────────────────────────────────────────────────────────────────────

#[cfg(target_os = "linux")]
mod linux {
    use std::fs::{File, OpenOptions};
    use std::io::Write;
    use std::os::fd::AsRawFd;
    use std::os::raw::c_int;
    use std::path::{Path, PathBuf};
    use std::time::Duration;

    use laserbot_types::BotError;
    use tracing::{info, warn};

    use super::WatchdogDevice;

    // WDIOC_SETTIMEOUT = _IOWR('W', 6, int) from <linux/watchdog.h>.
    nix::ioctl_readwrite!(wdioc_settimeout, b'W', 6, c_int);

    /// The kernel watchdog character device, usually `/dev/watchdog`.
    ///
    /// The device is opened lazily by [`arm`][WatchdogDevice::arm]; opening
    /// it starts the hardware countdown.
    pub struct LinuxWatchdog {
        path: PathBuf,
        file: Option<File>,
    }

    impl LinuxWatchdog {
        pub fn new(path: impl AsRef<Path>) -> Self {
            Self {
                path: path.as_ref().to_path_buf(),
                file: None,
            }
        }

        fn component(&self) -> String {
            self.path.display().to_string()
        }
    }

    impl WatchdogDevice for LinuxWatchdog {
        fn arm(&mut self, timeout: Duration) -> Result<(), BotError> {
            if self.file.is_none() {
                let file = OpenOptions::new()
                    .write(true)
                    .open(&self.path)
                    .map_err(|e| BotError::hardware(self.component(), e))?;
                self.file = Some(file);
            }
            let Some(file) = self.file.as_ref() else {
                return Err(BotError::hardware(self.component(), "device not open"));
            };

            // The countdown runs from open; a rejected timeout leaves the
            // driver default in place.
            let requested = c_int::try_from(timeout.as_secs().max(1)).unwrap_or(c_int::MAX);
            let mut secs = requested;
            // SAFETY: `file` is an open watchdog descriptor and `secs` is a
            // valid, exclusively borrowed c_int for the duration of the call.
            match unsafe { wdioc_settimeout(file.as_raw_fd(), &mut secs) } {
                Ok(_) => {
                    info!(device = %self.path.display(), timeout_secs = secs, "watchdog armed");
                }
                Err(e) => {
                    warn!(
                        device = %self.path.display(),
                        timeout_secs = requested,
                        error = %e,
                        "could not set watchdog timeout; driver default applies"
                    );
                }
            }
            Ok(())
        }

        fn kick(&mut self) -> Result<(), BotError> {
            let component = self.component();
            let file = self
                .file
                .as_mut()
                .ok_or_else(|| BotError::hardware(&component, "kick before arm"))?;
            file.write_all(b"\0")
                .map_err(|e| BotError::hardware(&component, e))
        }
    }

    impl Drop for LinuxWatchdog {
        /// Magic close: writing `V` before the descriptor closes disarms the
        /// timer on drivers built without `nowayout`.
        fn drop(&mut self) {
            if let Some(mut file) = self.file.take() {
                if file.write_all(b"V").is_ok() {
                    info!(device = %self.path.display(), "watchdog released");
                }
            }
        }
    }
}

#[cfg(target_os = "linux")]
pub use linux::LinuxWatchdog;

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn sim_watchdog_unarmed_never_expires() {
        let wd = SimWatchdog::new();
        assert!(!wd.is_armed());
        assert!(!wd.has_expired());
    }

    #[test]
    fn sim_watchdog_kick_before_arm_fails() {
        let mut wd = SimWatchdog::new();
        assert!(wd.kick().is_err());
    }

    #[test]
    fn sim_watchdog_expires_without_kicks() {
        let mut wd = SimWatchdog::new();
        wd.arm(Duration::from_millis(20)).unwrap();
        thread::sleep(Duration::from_millis(30));
        assert!(wd.has_expired());
    }

    #[test]
    fn sim_watchdog_kick_extends_deadline() {
        let mut wd = SimWatchdog::new();
        let kicks = wd.kick_counter();
        wd.arm(Duration::from_millis(200)).unwrap();
        thread::sleep(Duration::from_millis(20));
        wd.kick().unwrap();
        assert!(!wd.has_expired());
        assert_eq!(kicks.load(Ordering::Relaxed), 1);
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn linux_watchdog_kick_before_arm_fails() {
        let mut wd = LinuxWatchdog::new("/nonexistent/watchdog");
        assert!(wd.kick().is_err());
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn linux_watchdog_missing_device_fails_to_arm() {
        let mut wd = LinuxWatchdog::new("/nonexistent/watchdog");
        let err = wd.arm(Duration::from_secs(5)).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/watchdog"));
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn linux_watchdog_rejected_timeout_still_kicks() {
        use crate::health::{HealthSupervisor, TickOutcome};

        // A regular file accepts writes but rejects the timeout ioctl.
        let file = tempfile::NamedTempFile::new().unwrap();
        let mut sup = HealthSupervisor::new(
            Box::new(LinuxWatchdog::new(file.path())),
            Duration::from_secs(60),
        );
        let stage = sup.register("sensing");

        for _ in 0..3 {
            stage.report();
            assert_eq!(sup.tick(), TickOutcome::Kicked);
        }
        drop(sup);

        // Three kicks followed by the magic close.
        let written = std::fs::read(file.path()).unwrap();
        assert_eq!(written, b"\0\0\0V");
    }
}
