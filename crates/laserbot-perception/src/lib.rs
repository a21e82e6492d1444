//! `laserbot-perception` – target detection.
//!
//! Turns raw camera frames into at most one target point per frame.
//!
//! # Modules
//!
//! - [`hsv`] – 8-bit RGB → HSV conversion (hue in `0..=180`).
//! - [`detector`] – [`Detector`][detector::Detector] trait and
//!   [`HsvThresholdDetector`][detector::HsvThresholdDetector], which masks
//!   each frame with the thresholds of the current
//!   [`DetectionConfig`][laserbot_types::DetectionConfig] and returns the
//!   centroid of the matching pixels.

pub mod detector;
pub mod hsv;

pub use detector::{Detector, HsvThresholdDetector, PixelPoint};
