//! Polls the configuration source and swaps in changes.

use std::sync::Arc;

use laserbot_kernel::HealthReporter;
use tracing::warn;

use crate::config_store::{ConfigSource, ConfigStore};
use crate::stage::Stage;

/// Reloads the [`ConfigStore`] whenever the source's timestamp changes.
///
/// A malformed or unreadable source is logged and the previous
/// configuration stays active; the stage still reports.
pub struct ConfigRefreshStage {
    store: Arc<ConfigStore>,
    source: Box<dyn ConfigSource>,
    health: HealthReporter,
}

impl ConfigRefreshStage {
    pub fn new(store: Arc<ConfigStore>, source: Box<dyn ConfigSource>, health: HealthReporter) -> Self {
        Self {
            store,
            source,
            health,
        }
    }
}

impl Stage for ConfigRefreshStage {
    fn name(&self) -> &str {
        self.health.stage()
    }

    fn run_once(&mut self) {
        if let Err(e) = self.store.reload_if_changed(self.source.as_ref()) {
            warn!(error = %e, "configuration reload failed; keeping previous configuration");
        }
        self.health.report();
    }
}
