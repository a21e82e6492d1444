//! The four periodic stages wired together by [`Pipeline`][crate::pipeline::Pipeline].
//!
//! Every stage follows the same contract: do one period of work, then call
//! [`HealthReporter::report`][laserbot_kernel::HealthReporter::report].
//! "Nothing to do" still counts as a completed period.  A stage whose
//! hardware failed to initialise returns before reporting, forever.

pub mod actuation;
pub mod config_refresh;
pub mod decision;
pub mod sensing;

pub use actuation::ActuationStage;
pub use config_refresh::ConfigRefreshStage;
pub use decision::DecisionStage;
pub use sensing::SensingStage;

pub const SENSING: &str = "sensing";
pub const DECISION: &str = "decision";
pub const ACTUATION: &str = "actuation";
pub const CONFIG_REFRESH: &str = "config_refresh";
