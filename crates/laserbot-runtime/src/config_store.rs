//! [`ConfigStore`] – hot-reloadable detection configuration.
//!
//! The store hands out full copies of the active [`DetectionConfig`] so a
//! reader is never affected by a later swap.  [`ConfigStore::reload_if_changed`]
//! polls a [`ConfigSource`] for a newer modification timestamp and, only
//! when the source parses completely, swaps the new configuration in.
//!
//! Parsing happens outside the reader lock; the lock only guards the final
//! handle replacement.
//!
//! # File format
//!
//! ```json
//! {
//!   "colour": {
//!     "lower": [20, 100, 200],
//!     "upper": [160, 255, 255],
//!     "behaviour": 1
//!   }
//! }
//! ```
//!
//! `lower`/`upper` are the hue, saturation and value bounds.  Inverted bounds
//! are accepted unchanged.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::SystemTime;

use laserbot_types::{Behavior, ChannelRange, DetectionConfig};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

// ────────────────────────────────────────────────────────────────────────────
// Errors
// ────────────────────────────────────────────────────────────────────────────

/// Non-fatal failure to refresh the configuration.  The previously active
/// configuration stays in place.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read configuration source {origin}: {error}")]
    Io {
        origin: String,
        #[source]
        error: std::io::Error,
    },

    #[error("malformed configuration: {0}")]
    Parse(#[from] serde_json::Error),
}

// ────────────────────────────────────────────────────────────────────────────
// Wire format
// ────────────────────────────────────────────────────────────────────────────

#[derive(Serialize, Deserialize)]
struct ConfigFile {
    colour: ColourSection,
}

#[derive(Serialize, Deserialize)]
struct ColourSection {
    lower: [i32; 3],
    upper: [i32; 3],
    behaviour: i32,
}

/// Parse the JSON form of a [`DetectionConfig`].
pub fn parse_config(raw: &str) -> Result<DetectionConfig, ConfigError> {
    let file: ConfigFile = serde_json::from_str(raw)?;
    let ColourSection {
        lower,
        upper,
        behaviour,
    } = file.colour;
    Ok(DetectionConfig {
        hue: ChannelRange::new(lower[0], upper[0]),
        saturation: ChannelRange::new(lower[1], upper[1]),
        value: ChannelRange::new(lower[2], upper[2]),
        behavior: Behavior(behaviour),
    })
}

/// Render `config` in the JSON form understood by [`parse_config`].
pub fn render_config(config: &DetectionConfig) -> Result<String, ConfigError> {
    let file = ConfigFile {
        colour: ColourSection {
            lower: [config.hue.min, config.saturation.min, config.value.min],
            upper: [config.hue.max, config.saturation.max, config.value.max],
            behaviour: config.behavior.0,
        },
    };
    Ok(serde_json::to_string_pretty(&file)?)
}

// ────────────────────────────────────────────────────────────────────────────
// ConfigSource
// ────────────────────────────────────────────────────────────────────────────

/// Where configuration comes from: a timestamp to poll and a body to parse.
pub trait ConfigSource: Send + Sync {
    /// Human-readable origin, used in log and error messages.
    fn origin(&self) -> String;

    /// Last modification time of the source.
    fn modified(&self) -> Result<SystemTime, ConfigError>;

    /// Read and fully parse the source.
    fn load(&self) -> Result<DetectionConfig, ConfigError>;
}

/// A JSON configuration file on disk.
#[derive(Debug, Clone)]
pub struct FileConfigSource {
    path: PathBuf,
}

impl FileConfigSource {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_error(&self, error: std::io::Error) -> ConfigError {
        ConfigError::Io {
            origin: self.origin(),
            error,
        }
    }
}

impl ConfigSource for FileConfigSource {
    fn origin(&self) -> String {
        self.path.display().to_string()
    }

    fn modified(&self) -> Result<SystemTime, ConfigError> {
        std::fs::metadata(&self.path)
            .and_then(|m| m.modified())
            .map_err(|e| self.io_error(e))
    }

    fn load(&self) -> Result<DetectionConfig, ConfigError> {
        let raw = std::fs::read_to_string(&self.path).map_err(|e| self.io_error(e))?;
        parse_config(&raw)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// ConfigStore
// ────────────────────────────────────────────────────────────────────────────

/// Outcome of a successful [`ConfigStore::reload_if_changed`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReloadOutcome {
    /// Timestamp matched the last successful load; nothing was read.
    Unchanged,
    /// The source changed and the contained configuration is now active.
    Reloaded(DetectionConfig),
}

/// Holds the active configuration and swaps it atomically on reload.
#[derive(Debug)]
pub struct ConfigStore {
    active: Mutex<Arc<DetectionConfig>>,
    /// Timestamp of the last successful load.  Also serialises reloads so the
    /// reader lock above is never held across I/O.
    loaded_at: Mutex<Option<SystemTime>>,
}

impl Default for ConfigStore {
    fn default() -> Self {
        Self::new(DetectionConfig::default())
    }
}

impl ConfigStore {
    /// Create a store starting from `initial`.  The first
    /// [`reload_if_changed`][Self::reload_if_changed] always reads the source.
    pub fn new(initial: DetectionConfig) -> Self {
        Self {
            active: Mutex::new(Arc::new(initial)),
            loaded_at: Mutex::new(None),
        }
    }

    fn active(&self) -> MutexGuard<'_, Arc<DetectionConfig>> {
        self.active.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Copy of the active configuration.
    pub fn current(&self) -> DetectionConfig {
        **self.active()
    }

    /// Replace the active configuration wholesale.
    pub fn replace(&self, config: DetectionConfig) {
        let next = Arc::new(config);
        *self.active() = next;
    }

    /// Reload from `source` if its modification time differs from the one
    /// recorded at the last successful load.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the timestamp or body cannot be read or
    /// the body does not parse.  The active configuration and the recorded
    /// timestamp are left untouched, so the next call retries.
    pub fn reload_if_changed(&self, source: &dyn ConfigSource) -> Result<ReloadOutcome, ConfigError> {
        let mut loaded_at = self.loaded_at.lock().unwrap_or_else(PoisonError::into_inner);

        let modified = source.modified()?;
        if *loaded_at == Some(modified) {
            return Ok(ReloadOutcome::Unchanged);
        }

        let config = source.load()?;
        self.replace(config);
        *loaded_at = Some(modified);

        info!(
            origin = %source.origin(),
            hue = ?(config.hue.min, config.hue.max),
            saturation = ?(config.saturation.min, config.saturation.max),
            value = ?(config.value.min, config.value.max),
            behavior = config.behavior.0,
            "loaded new configuration"
        );
        Ok(ReloadOutcome::Reloaded(config))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// In-memory source with a controllable timestamp and a load counter.
    struct MemorySource {
        modified: Mutex<SystemTime>,
        body: Mutex<String>,
        loads: AtomicUsize,
    }

    impl MemorySource {
        fn new(body: &str) -> Self {
            Self {
                modified: Mutex::new(SystemTime::UNIX_EPOCH + Duration::from_secs(1_000)),
                body: Mutex::new(body.to_string()),
                loads: AtomicUsize::new(0),
            }
        }

        fn rewrite(&self, body: &str) {
            *self.body.lock().unwrap() = body.to_string();
            let mut m = self.modified.lock().unwrap();
            *m += Duration::from_secs(1);
        }
    }

    impl ConfigSource for MemorySource {
        fn origin(&self) -> String {
            "memory".to_string()
        }

        fn modified(&self) -> Result<SystemTime, ConfigError> {
            Ok(*self.modified.lock().unwrap())
        }

        fn load(&self) -> Result<DetectionConfig, ConfigError> {
            self.loads.fetch_add(1, Ordering::SeqCst);
            parse_config(&self.body.lock().unwrap())
        }
    }

    const GOOD: &str = r#"{"colour": {"lower": [10, 90, 180], "upper": [170, 250, 255], "behaviour": 0}}"#;

    fn good_config() -> DetectionConfig {
        DetectionConfig {
            hue: ChannelRange::new(10, 170),
            saturation: ChannelRange::new(90, 250),
            value: ChannelRange::new(180, 255),
            behavior: Behavior(0),
        }
    }

    #[test]
    fn parse_maps_triples_to_channels() {
        assert_eq!(parse_config(GOOD).unwrap(), good_config());
    }

    #[test]
    fn parse_accepts_inverted_bounds() {
        let raw = r#"{"colour": {"lower": [160, 255, 255], "upper": [20, 100, 200], "behaviour": 1}}"#;
        let cfg = parse_config(raw).unwrap();
        assert_eq!(cfg.hue, ChannelRange::new(160, 20));
        assert_eq!(cfg.value, ChannelRange::new(255, 200));
    }

    #[test]
    fn parse_rejects_partial_documents() {
        assert!(parse_config(r#"{"colour": {"lower": [1, 2, 3]}}"#).is_err());
        assert!(parse_config(r#"{"colour": {"lower": [1, 2], "upper": [1, 2, 3], "behaviour": 1}}"#).is_err());
        assert!(parse_config("not json").is_err());
    }

    #[test]
    fn render_then_parse_preserves_config() {
        let raw = render_config(&good_config()).unwrap();
        assert_eq!(parse_config(&raw).unwrap(), good_config());
    }

    #[test]
    fn first_reload_always_loads() {
        let store = ConfigStore::default();
        let source = MemorySource::new(GOOD);
        assert_eq!(
            store.reload_if_changed(&source).unwrap(),
            ReloadOutcome::Reloaded(good_config())
        );
        assert_eq!(store.current(), good_config());
    }

    #[test]
    fn unchanged_timestamp_skips_reparse() {
        let store = ConfigStore::default();
        let source = MemorySource::new(GOOD);
        store.reload_if_changed(&source).unwrap();
        let before = store.current();

        assert_eq!(store.reload_if_changed(&source).unwrap(), ReloadOutcome::Unchanged);
        assert_eq!(store.reload_if_changed(&source).unwrap(), ReloadOutcome::Unchanged);
        assert_eq!(source.loads.load(Ordering::SeqCst), 1);
        assert_eq!(store.current(), before);
    }

    #[test]
    fn malformed_source_keeps_previous_config() {
        let store = ConfigStore::default();
        let source = MemorySource::new(GOOD);
        store.reload_if_changed(&source).unwrap();
        let before = store.current();

        source.rewrite(r#"{"colour": {"lower": [1, 2, 3], "upper": "oops", "behaviour": 1}}"#);
        assert!(matches!(store.reload_if_changed(&source), Err(ConfigError::Parse(_))));
        assert_eq!(store.current(), before);

        // Timestamp was not recorded, so the next poll retries.
        let _ = store.reload_if_changed(&source);
        assert_eq!(source.loads.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn changed_timestamp_swaps_config() {
        let store = ConfigStore::default();
        let source = MemorySource::new(GOOD);
        store.reload_if_changed(&source).unwrap();

        source.rewrite(r#"{"colour": {"lower": [0, 0, 0], "upper": [1, 1, 1], "behaviour": 5}}"#);
        let outcome = store.reload_if_changed(&source).unwrap();
        assert!(matches!(outcome, ReloadOutcome::Reloaded(cfg) if cfg.behavior == Behavior(5)));
        assert_eq!(store.current().behavior, Behavior(5));
    }

    #[test]
    fn snapshot_is_unaffected_by_later_swap() {
        let store = ConfigStore::default();
        let snapshot = store.current();
        store.replace(good_config());
        assert_eq!(snapshot, DetectionConfig::default());
        assert_eq!(store.current(), good_config());
    }

    #[test]
    fn file_source_reads_and_detects_changes() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = dir.path().join("config.json");
        std::fs::write(&path, GOOD).expect("write config");

        let source = FileConfigSource::new(&path);
        let store = ConfigStore::default();
        assert!(matches!(
            store.reload_if_changed(&source).unwrap(),
            ReloadOutcome::Reloaded(_)
        ));
        assert_eq!(store.reload_if_changed(&source).unwrap(), ReloadOutcome::Unchanged);

        // Rewrite with an explicitly later mtime so coarse filesystem clocks
        // cannot hide the change.
        let later = source.modified().unwrap() + Duration::from_secs(10);
        let mut file = std::fs::File::create(&path).expect("reopen config");
        file.write_all(br#"{"colour": {"lower": [1, 1, 1], "upper": [2, 2, 2], "behaviour": 0}}"#)
            .expect("rewrite config");
        file.set_modified(later).expect("set mtime");
        drop(file);

        let outcome = store.reload_if_changed(&source).unwrap();
        assert!(matches!(outcome, ReloadOutcome::Reloaded(cfg) if cfg.hue == ChannelRange::new(1, 2)));
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let source = FileConfigSource::new(dir.path().join("absent.json"));
        let store = ConfigStore::default();
        let err = store.reload_if_changed(&source).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
        assert!(err.to_string().contains("absent.json"));
        assert_eq!(store.current(), DetectionConfig::default());
    }
}
