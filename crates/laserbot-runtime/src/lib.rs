//! `laserbot-runtime` – the coordination layer.
//!
//! Wires the camera, detector and motor driver into a set of independently
//! scheduled stages and keeps the hardware watchdog fed while they all make
//! progress.
//!
//! # Modules
//!
//! - [`config_store`] – [`ConfigStore`][config_store::ConfigStore]: the
//!   active [`DetectionConfig`][laserbot_types::DetectionConfig], swapped
//!   wholesale when its [`ConfigSource`][config_store::ConfigSource]
//!   changes on disk.  A malformed source never replaces a good
//!   configuration.
//! - [`decision`] – [`decide`][decision::decide]: pure mapping from a
//!   detected point to a [`MovementCommand`][laserbot_types::MovementCommand].
//! - [`stage`] – the [`Stage`][stage::Stage] contract and
//!   [`Subsystem`][stage::Subsystem], a lazily opened hardware handle whose
//!   failure permanently silences its stage.
//! - [`stages`] – sensing, decision, actuation and config refresh.
//! - [`pipeline`] – [`Pipeline`][pipeline::Pipeline]: builds the mailboxes,
//!   the configuration store and the health supervisor, and hands each
//!   stage its handles.
//! - [`sequencer`] – [`Sequencer`][sequencer::Sequencer]: one Tokio task per
//!   stage plus the supervisory tick.
//! - [`telemetry`] – [`init_tracing`][telemetry::init_tracing]: console
//!   logging with optional OTLP span export.

pub mod config_store;
pub mod decision;
pub mod pipeline;
pub mod sequencer;
pub mod stage;
pub mod stages;
pub mod telemetry;

pub use config_store::{ConfigError, ConfigSource, ConfigStore, FileConfigSource, ReloadOutcome};
pub use decision::decide;
pub use pipeline::{Pipeline, PipelineParts};
pub use sequencer::{RunOutcome, Sequencer, StagePeriods};
pub use stage::{Stage, Subsystem};
pub use telemetry::{LogFormat, TelemetryGuard, init_tracing};
