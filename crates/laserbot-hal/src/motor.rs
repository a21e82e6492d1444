//! Generic `MotorDriver` trait for the two-motor drive base.
//!
//! The actuation stage only ever talks to this trait, so the GPIO driver
//! and the simulated driver are interchangeable.

use laserbot_types::BotError;

use crate::drive::DriveSignal;

/// An H-bridge style driver for two DC motors ("A" and "B").
pub trait MotorDriver: Send {
    /// Stable identifier for this driver, e.g. `"drive_base"`.
    fn id(&self) -> &str;

    /// Apply `signal` to the direction lines and PWM outputs.
    ///
    /// # Errors
    ///
    /// Returns [`BotError::HardwareFault`] if the line levels or duty cycle
    /// cannot be written.
    fn apply(&mut self, signal: &DriveSignal) -> Result<(), BotError>;

    /// Drive every line low and the duty cycle to zero.
    fn stop(&mut self) -> Result<(), BotError> {
        self.apply(&DriveSignal::stop())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Minimal in-process driver used only for tests.
    struct MockMotors {
        id: String,
        last: Option<DriveSignal>,
    }

    impl MotorDriver for MockMotors {
        fn id(&self) -> &str {
            &self.id
        }

        fn apply(&mut self, signal: &DriveSignal) -> Result<(), BotError> {
            self.last = Some(*signal);
            Ok(())
        }
    }

    #[test]
    fn default_stop_applies_stop_signal() {
        let mut motors = MockMotors {
            id: "drive_base".to_string(),
            last: None,
        };
        motors.stop().unwrap();
        assert_eq!(motors.last, Some(DriveSignal::stop()));
        assert_eq!(motors.id(), "drive_base");
    }
}
