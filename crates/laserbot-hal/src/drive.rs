//! [`DriveSignal`] – movement command to H-bridge line levels.
//!
//! The drive base has two motors, each with a forward and a backward
//! direction line, and a shared PWM duty cycle derived from the speed level.
//! Two wiring conventions exist for the same [`Direction`]; the
//! [`Behavior`][laserbot_types::Behavior] carried by the command picks one.
//!
//! # Wiring tables
//!
//! | Direction | Primary (behavior != 0) | Alternate (behavior == 0) |
//! |---|---|---|
//! | `Forward` | A fwd, B fwd | A back, B back |
//! | `Left` | B fwd | A back |
//! | `Right` | A fwd | B back |
//! | `Stop` | all low, duty 0 | all low, duty 0 |
//!
//! `Stop` zeroes the duty cycle whatever speed level the command carries.

use laserbot_types::{Direction, MovementCommand};

/// Line levels and duty cycle for one actuation period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DriveSignal {
    pub motor_a_forward: bool,
    pub motor_a_backward: bool,
    pub motor_b_forward: bool,
    pub motor_b_backward: bool,
    /// PWM duty cycle in percent, `0..=100`.
    pub duty_percent: u8,
}

impl DriveSignal {
    /// Every line low, duty cycle zero.
    pub const fn stop() -> Self {
        Self {
            motor_a_forward: false,
            motor_a_backward: false,
            motor_b_forward: false,
            motor_b_backward: false,
            duty_percent: 0,
        }
    }

    /// Translate `cmd` through the wiring table selected by its behavior.
    pub fn from_command(cmd: &MovementCommand) -> Self {
        let mut signal = Self::stop();
        let alternate = cmd.behavior.is_alternate();

        match (cmd.direction, alternate) {
            (Direction::Stop, _) => return signal,
            (Direction::Forward, false) => {
                signal.motor_a_forward = true;
                signal.motor_b_forward = true;
            }
            (Direction::Left, false) => signal.motor_b_forward = true,
            (Direction::Right, false) => signal.motor_a_forward = true,
            (Direction::Forward, true) => {
                signal.motor_a_backward = true;
                signal.motor_b_backward = true;
            }
            (Direction::Left, true) => signal.motor_a_backward = true,
            (Direction::Right, true) => signal.motor_b_backward = true,
        }

        signal.duty_percent = duty_for_speed(cmd.speed_level);
        signal
    }

    /// `true` when no motor line is driven.
    pub fn is_idle(&self) -> bool {
        !(self.motor_a_forward
            || self.motor_a_backward
            || self.motor_b_forward
            || self.motor_b_backward)
    }
}

/// PWM duty cycle (percent) for a speed level.
pub fn duty_for_speed(speed_level: u8) -> u8 {
    match speed_level {
        3 => 100,
        2 => 80,
        1 => 70,
        _ => 0,
    }
}
