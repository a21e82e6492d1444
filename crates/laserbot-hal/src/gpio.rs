//! Raspberry Pi motor driver (L298N-style H-bridge) built on `rppal`.
//!
//! Pin mapping (BCM numbering):
//!
//! | Signal | Pin |
//! |---|---|
//! | IN1 (motor A forward) | 17 |
//! | IN2 (motor A backward) | 27 |
//! | IN3 (motor B forward) | 22 |
//! | IN4 (motor B backward) | 23 |
//! | ENA (motor A PWM) | 18 |
//! | ENB (motor B PWM) | 19 |

use rppal::gpio::{Gpio, Level, OutputPin};
use tracing::{debug, info};

use laserbot_types::BotError;

use crate::drive::DriveSignal;
use crate::motor::MotorDriver;

/// BCM pin numbers used by [`GpioMotorDriver`].
#[derive(Debug, Clone, Copy)]
pub struct MotorPins {
    pub in1: u8,
    pub in2: u8,
    pub in3: u8,
    pub in4: u8,
    pub ena: u8,
    pub enb: u8,
}

impl Default for MotorPins {
    fn default() -> Self {
        Self {
            in1: 17,
            in2: 27,
            in3: 22,
            in4: 23,
            ena: 18,
            enb: 19,
        }
    }
}

/// Software PWM frequency on the enable pins.
const PWM_FREQUENCY_HZ: f64 = 1_000.0;

/// Drives the two motors through GPIO direction lines and software PWM.
pub struct GpioMotorDriver {
    id: String,
    in1: OutputPin,
    in2: OutputPin,
    in3: OutputPin,
    in4: OutputPin,
    ena: OutputPin,
    enb: OutputPin,
}

impl GpioMotorDriver {
    /// Claim every pin in `pins` as an output.
    ///
    /// # Errors
    ///
    /// Returns [`BotError::HardwareFault`] if the GPIO peripheral cannot be
    /// opened or any pin is already in use.
    pub fn open(id: impl Into<String>, pins: MotorPins) -> Result<Self, BotError> {
        let id = id.into();
        let gpio = Gpio::new().map_err(|e| BotError::hardware(&id, e))?;
        let output = |pin: u8| -> Result<OutputPin, BotError> {
            let mut out = gpio
                .get(pin)
                .map_err(|e| BotError::hardware(&id, format!("pin {pin}: {e}")))?
                .into_output();
            out.set_low();
            Ok(out)
        };

        let driver = Self {
            in1: output(pins.in1)?,
            in2: output(pins.in2)?,
            in3: output(pins.in3)?,
            in4: output(pins.in4)?,
            ena: output(pins.ena)?,
            enb: output(pins.enb)?,
            id,
        };
        info!(driver = %driver.id, ?pins, "GPIO motor driver ready");
        Ok(driver)
    }

    fn set_duty(pin: &mut OutputPin, duty_percent: u8, id: &str) -> Result<(), BotError> {
        if duty_percent == 0 {
            pin.clear_pwm().map_err(|e| BotError::hardware(id, e))?;
            pin.set_low();
            return Ok(());
        }
        let duty = f64::from(duty_percent.min(100)) / 100.0;
        pin.set_pwm_frequency(PWM_FREQUENCY_HZ, duty)
            .map_err(|e| BotError::hardware(id, e))
    }
}

fn level(high: bool) -> Level {
    if high { Level::High } else { Level::Low }
}

impl MotorDriver for GpioMotorDriver {
    fn id(&self) -> &str {
        &self.id
    }

    fn apply(&mut self, signal: &DriveSignal) -> Result<(), BotError> {
        Self::set_duty(&mut self.ena, signal.duty_percent, &self.id)?;
        Self::set_duty(&mut self.enb, signal.duty_percent, &self.id)?;

        self.in1.write(level(signal.motor_a_forward));
        self.in2.write(level(signal.motor_a_backward));
        self.in3.write(level(signal.motor_b_forward));
        self.in4.write(level(signal.motor_b_backward));

        if signal.duty_percent > 0 {
            debug!(driver = %self.id, duty = signal.duty_percent, "motor lines updated");
        }
        Ok(())
    }
}
