//! Process settings – reads `laserbot.toml`.
//!
//! The detection thresholds live in a separate JSON file that is hot
//! reloaded while the pipeline runs; this file only covers what is fixed for
//! the lifetime of the process (device paths, periods, timeouts).

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use laserbot_runtime::StagePeriods;

/// Persisted process settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    /// JSON detection configuration polled by the config refresh stage.
    #[serde(default = "default_detection_config")]
    pub detection_config: PathBuf,

    /// Watchdog character device.
    #[serde(default = "default_watchdog_device")]
    pub watchdog_device: String,

    /// Hardware watchdog timeout, in seconds.
    #[serde(default = "default_watchdog_timeout_secs")]
    pub watchdog_timeout_secs: u64,

    /// Use simulated camera, motors and watchdog.
    #[serde(default)]
    pub simulate: bool,

    /// V4L2 device node.
    #[serde(default = "default_camera_device")]
    pub camera_device: String,

    #[serde(default = "default_camera_width")]
    pub camera_width: u32,

    #[serde(default = "default_camera_height")]
    pub camera_height: u32,

    #[serde(default = "default_camera_fps")]
    pub camera_fps: u32,

    #[serde(default = "default_stage_period_ms")]
    pub sensing_period_ms: u64,

    #[serde(default = "default_stage_period_ms")]
    pub decision_period_ms: u64,

    #[serde(default = "default_stage_period_ms")]
    pub actuation_period_ms: u64,

    #[serde(default = "default_supervisor_period_ms")]
    pub config_refresh_period_ms: u64,

    #[serde(default = "default_supervisor_period_ms")]
    pub supervisor_period_ms: u64,
}

fn default_detection_config() -> PathBuf {
    PathBuf::from("config.json")
}
fn default_watchdog_device() -> String {
    "/dev/watchdog".to_string()
}
fn default_watchdog_timeout_secs() -> u64 {
    5
}
fn default_camera_device() -> String {
    "/dev/video0".to_string()
}
fn default_camera_width() -> u32 {
    640
}
fn default_camera_height() -> u32 {
    480
}
fn default_camera_fps() -> u32 {
    30
}
fn default_stage_period_ms() -> u64 {
    50
}
fn default_supervisor_period_ms() -> u64 {
    100
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            detection_config: default_detection_config(),
            watchdog_device: default_watchdog_device(),
            watchdog_timeout_secs: default_watchdog_timeout_secs(),
            simulate: false,
            camera_device: default_camera_device(),
            camera_width: default_camera_width(),
            camera_height: default_camera_height(),
            camera_fps: default_camera_fps(),
            sensing_period_ms: default_stage_period_ms(),
            decision_period_ms: default_stage_period_ms(),
            actuation_period_ms: default_stage_period_ms(),
            config_refresh_period_ms: default_supervisor_period_ms(),
            supervisor_period_ms: default_supervisor_period_ms(),
        }
    }
}

impl Settings {
    pub fn watchdog_timeout(&self) -> Duration {
        Duration::from_secs(self.watchdog_timeout_secs.max(1))
    }

    /// Stage and supervisor periods.  Zero is raised to 1 ms.
    pub fn periods(&self) -> StagePeriods {
        let ms = |v: u64| Duration::from_millis(v.max(1));
        StagePeriods {
            sensing: ms(self.sensing_period_ms),
            decision: ms(self.decision_period_ms),
            actuation: ms(self.actuation_period_ms),
            config_refresh: ms(self.config_refresh_period_ms),
            supervisor: ms(self.supervisor_period_ms),
        }
    }
}

/// Path of the settings file: `$LASERBOT_SETTINGS`, else `./laserbot.toml`.
pub fn settings_path() -> PathBuf {
    std::env::var("LASERBOT_SETTINGS")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("laserbot.toml"))
}

/// Load settings from [`settings_path`].  A missing file yields the
/// defaults; environment overrides apply either way.
pub fn load() -> Result<Settings, String> {
    let mut settings = load_from(&settings_path())?.unwrap_or_default();
    apply_env_overrides(&mut settings);
    Ok(settings)
}

/// Load settings from a specific path.  Returns `None` if the file does not
/// exist.
pub(crate) fn load_from(path: &Path) -> Result<Option<Settings>, String> {
    if !path.exists() {
        return Ok(None);
    }
    let raw = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read settings at {}: {}", path.display(), e))?;
    let settings: Settings =
        toml::from_str(&raw).map_err(|e| format!("Failed to parse settings: {}", e))?;
    Ok(Some(settings))
}

/// Apply `LASERBOT_*` environment variable overrides to `settings`.
///
/// | Variable | Field |
/// |---|---|
/// | `LASERBOT_DETECTION_CONFIG` | `detection_config` |
/// | `LASERBOT_WATCHDOG_DEVICE` | `watchdog_device` |
/// | `LASERBOT_WATCHDOG_TIMEOUT_SECS` | `watchdog_timeout_secs` |
/// | `LASERBOT_SIMULATE` | `simulate` (`1`/`true`/`yes`) |
pub fn apply_env_overrides(settings: &mut Settings) {
    if let Ok(v) = std::env::var("LASERBOT_DETECTION_CONFIG") {
        settings.detection_config = PathBuf::from(v);
    }
    if let Ok(v) = std::env::var("LASERBOT_WATCHDOG_DEVICE") {
        settings.watchdog_device = v;
    }
    if let Ok(v) = std::env::var("LASERBOT_WATCHDOG_TIMEOUT_SECS")
        && let Ok(secs) = v.parse::<u64>()
    {
        settings.watchdog_timeout_secs = secs;
    }
    if let Ok(v) = std::env::var("LASERBOT_SIMULATE") {
        settings.simulate = matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let s = Settings::default();
        assert_eq!(s.watchdog_timeout(), Duration::from_secs(5));
        assert_eq!(s.periods(), StagePeriods::default());
        assert_eq!(s.watchdog_device, "/dev/watchdog");
        assert!(!s.simulate);
    }

    #[test]
    fn load_from_returns_none_when_missing() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let result = load_from(&dir.path().join("laserbot.toml")).expect("no error");
        assert!(result.is_none());
    }

    #[test]
    fn partial_file_fills_in_defaults() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = dir.path().join("laserbot.toml");
        fs::write(&path, "simulate = true\nsensing_period_ms = 20\n").expect("write");

        let s = load_from(&path).expect("load ok").expect("some");
        assert!(s.simulate);
        assert_eq!(s.periods().sensing, Duration::from_millis(20));
        assert_eq!(s.periods().decision, Duration::from_millis(50));
        assert_eq!(s.camera_width, 640);
    }

    #[test]
    fn roundtrip_default_settings() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = dir.path().join("laserbot.toml");
        let raw = toml::to_string_pretty(&Settings::default()).expect("serialize");
        fs::write(&path, raw).expect("write");

        let loaded = load_from(&path).expect("load ok").expect("some");
        assert_eq!(loaded, Settings::default());
    }

    #[test]
    fn malformed_file_is_an_error() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = dir.path().join("laserbot.toml");
        fs::write(&path, "watchdog_timeout_secs = \"soon\"").expect("write");
        let err = load_from(&path).unwrap_err();
        assert!(err.contains("Failed to parse settings"));
    }

    #[test]
    fn zero_periods_are_clamped() {
        let s = Settings {
            supervisor_period_ms: 0,
            watchdog_timeout_secs: 0,
            ..Settings::default()
        };
        assert_eq!(s.periods().supervisor, Duration::from_millis(1));
        assert_eq!(s.watchdog_timeout(), Duration::from_secs(1));
    }

    // All env-var cases live in one test so they cannot race each other.
    #[test]
    fn apply_env_overrides_updates_fields() {
        // SAFETY: no other test in this crate touches these variables.
        unsafe {
            std::env::set_var("LASERBOT_DETECTION_CONFIG", "/etc/laserbot/config.json");
            std::env::set_var("LASERBOT_WATCHDOG_DEVICE", "/dev/watchdog1");
            std::env::set_var("LASERBOT_WATCHDOG_TIMEOUT_SECS", "not-a-number");
            std::env::set_var("LASERBOT_SIMULATE", "TRUE");
        }
        let mut s = Settings::default();
        apply_env_overrides(&mut s);
        assert_eq!(s.detection_config, PathBuf::from("/etc/laserbot/config.json"));
        assert_eq!(s.watchdog_device, "/dev/watchdog1");
        assert_eq!(s.watchdog_timeout_secs, 5);
        assert!(s.simulate);

        unsafe { std::env::set_var("LASERBOT_WATCHDOG_TIMEOUT_SECS", "12") };
        apply_env_overrides(&mut s);
        assert_eq!(s.watchdog_timeout_secs, 12);

        unsafe {
            std::env::remove_var("LASERBOT_DETECTION_CONFIG");
            std::env::remove_var("LASERBOT_WATCHDOG_DEVICE");
            std::env::remove_var("LASERBOT_WATCHDOG_TIMEOUT_SECS");
            std::env::remove_var("LASERBOT_SIMULATE");
        }
    }
}
