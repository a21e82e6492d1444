//! In-process simulated drivers for CI and headless runs.
//!
//! [`SimCamera`] renders a synthetic frame with an optional red dot whose
//! position can be moved at runtime through a [`DotHandle`].
//! [`SimMotorDriver`] records every [`DriveSignal`] it is given so tests can
//! assert on what the actuation stage commanded.
//!
//! # Example
//!
//! ```rust
//! use laserbot_hal::sim::{SimCamera, SimMotorDriver};
//! use laserbot_hal::{Camera, DriveSignal, MotorDriver};
//!
//! let mut camera = SimCamera::new("front_rgb", 640, 480);
//! camera.dot().place(100, 100);
//! let frame = camera.capture().expect("sim capture must succeed");
//! assert_eq!(frame.rgb(100, 100), Some([255, 0, 0]));
//!
//! let mut motors = SimMotorDriver::new("drive_base");
//! let log = motors.log();
//! motors.apply(&DriveSignal::stop()).expect("sim drive must succeed");
//! assert_eq!(log.last(), Some(DriveSignal::stop()));
//! ```

use std::sync::{Arc, Mutex, PoisonError};

use laserbot_types::BotError;

use crate::camera::{Camera, CameraFrame};
use crate::drive::DriveSignal;
use crate::motor::MotorDriver;

/// Half-width of the rendered dot; the dot is a `(2r+1)²` square.
const DOT_RADIUS: u32 = 2;

// ────────────────────────────────────────────────────────────────────────────
// Simulated camera
// ────────────────────────────────────────────────────────────────────────────

/// Shared handle moving (or hiding) the dot drawn by a [`SimCamera`].
#[derive(Debug, Clone, Default)]
pub struct DotHandle(Arc<Mutex<Option<(u32, u32)>>>);

impl DotHandle {
    /// Draw the dot centred on (`x`, `y`) from the next capture on.
    pub fn place(&self, x: u32, y: u32) {
        *self.0.lock().unwrap_or_else(PoisonError::into_inner) = Some((x, y));
    }

    /// Stop drawing the dot.
    pub fn hide(&self) {
        *self.0.lock().unwrap_or_else(PoisonError::into_inner) = None;
    }

    /// Current dot centre, if shown.
    pub fn position(&self) -> Option<(u32, u32)> {
        *self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// A simulated camera producing a black frame with an optional pure red dot.
/// Always succeeds.
pub struct SimCamera {
    id: String,
    width: u32,
    height: u32,
    dot: DotHandle,
}

impl SimCamera {
    /// Create a simulated camera with the given identifier and resolution.
    pub fn new(id: impl Into<String>, width: u32, height: u32) -> Self {
        Self {
            id: id.into(),
            width,
            height,
            dot: DotHandle::default(),
        }
    }

    /// Handle controlling the rendered dot; clones share the same state.
    pub fn dot(&self) -> DotHandle {
        self.dot.clone()
    }
}

impl Camera for SimCamera {
    fn id(&self) -> &str {
        &self.id
    }

    fn capture(&mut self) -> Result<CameraFrame, BotError> {
        let mut frame = CameraFrame::black(self.width, self.height);
        if let Some((cx, cy)) = self.dot.position() {
            for y in cy.saturating_sub(DOT_RADIUS)..=cy + DOT_RADIUS {
                for x in cx.saturating_sub(DOT_RADIUS)..=cx + DOT_RADIUS {
                    frame.set_rgb(x, y, [255, 0, 0]);
                }
            }
        }
        Ok(frame)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Simulated motor driver
// ────────────────────────────────────────────────────────────────────────────

/// Shared, append-only record of the signals applied to a [`SimMotorDriver`].
#[derive(Debug, Clone, Default)]
pub struct DriveLog(Arc<Mutex<Vec<DriveSignal>>>);

impl DriveLog {
    /// Every signal applied so far, oldest first.
    pub fn signals(&self) -> Vec<DriveSignal> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// The most recently applied signal.
    pub fn last(&self) -> Option<DriveSignal> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner).last().copied()
    }

    /// Number of signals applied so far.
    pub fn len(&self) -> usize {
        self.0.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// `true` when nothing has been applied yet.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn push(&self, signal: DriveSignal) {
        self.0.lock().unwrap_or_else(PoisonError::into_inner).push(signal);
    }
}

/// A simulated drive base that records every applied signal.  Always
/// succeeds.
pub struct SimMotorDriver {
    id: String,
    log: DriveLog,
}

impl SimMotorDriver {
    /// Create a new simulated driver with the given identifier.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            log: DriveLog::default(),
        }
    }

    /// Handle on the signal history; clones share the same log.
    pub fn log(&self) -> DriveLog {
        self.log.clone()
    }
}

impl MotorDriver for SimMotorDriver {
    fn id(&self) -> &str {
        &self.id
    }

    fn apply(&mut self, signal: &DriveSignal) -> Result<(), BotError> {
        self.log.push(*signal);
        Ok(())
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sim_camera_returns_black_frame_without_dot() {
        let mut cam = SimCamera::new("front", 8, 6);
        let frame = cam.capture().unwrap();
        assert_eq!(frame.width, 8);
        assert_eq!(frame.height, 6);
        assert_eq!(frame.data.len(), 8 * 6 * 3);
        assert!(frame.data.iter().all(|&b| b == 0));
    }

    #[test]
    fn sim_camera_draws_square_dot() {
        let mut cam = SimCamera::new("front", 32, 32);
        cam.dot().place(10, 10);
        let frame = cam.capture().unwrap();

        let red = frame
            .data
            .chunks_exact(3)
            .filter(|p| *p == [255, 0, 0])
            .count();
        assert_eq!(red, 25);
        assert_eq!(frame.rgb(8, 8), Some([255, 0, 0]));
        assert_eq!(frame.rgb(13, 10), Some([0, 0, 0]));
    }

    #[test]
    fn dot_is_clipped_at_frame_edge() {
        let mut cam = SimCamera::new("front", 16, 16);
        cam.dot().place(0, 15);
        let frame = cam.capture().unwrap();
        let red = frame
            .data
            .chunks_exact(3)
            .filter(|p| *p == [255, 0, 0])
            .count();
        assert_eq!(red, 9);
    }

    #[test]
    fn hidden_dot_is_not_drawn() {
        let mut cam = SimCamera::new("front", 16, 16);
        let dot = cam.dot();
        dot.place(5, 5);
        dot.hide();
        assert_eq!(dot.position(), None);
        let frame = cam.capture().unwrap();
        assert!(frame.data.iter().all(|&b| b == 0));
    }

    #[test]
    fn sim_motor_driver_records_signals() {
        let mut motors = SimMotorDriver::new("drive_base");
        let log = motors.log();
        assert!(log.is_empty());

        let go = DriveSignal {
            motor_a_forward: true,
            motor_b_forward: true,
            duty_percent: 80,
            ..DriveSignal::stop()
        };
        motors.apply(&go).unwrap();
        motors.stop().unwrap();

        assert_eq!(log.signals(), vec![go, DriveSignal::stop()]);
        assert_eq!(log.last(), Some(DriveSignal::stop()));
        assert_eq!(motors.id(), "drive_base");
    }
}
