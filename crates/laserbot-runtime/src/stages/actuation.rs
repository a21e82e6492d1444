//! Movement command → motor lines.

use std::sync::Arc;

use laserbot_hal::{DriveSignal, MotorDriver};
use laserbot_kernel::HealthReporter;
use laserbot_middleware::Mailbox;
use laserbot_types::MovementCommand;
use tracing::{debug, info, warn};

use crate::stage::{Stage, Subsystem};

/// Applies the latest command to the drive base, or a full stop when no
/// command is pending.
pub struct ActuationStage {
    motors: Subsystem<Box<dyn MotorDriver>>,
    commands: Arc<Mailbox<MovementCommand>>,
    health: HealthReporter,
}

impl ActuationStage {
    pub fn new(
        motors: Subsystem<Box<dyn MotorDriver>>,
        commands: Arc<Mailbox<MovementCommand>>,
        health: HealthReporter,
    ) -> Self {
        Self {
            motors,
            commands,
            health,
        }
    }
}

impl Stage for ActuationStage {
    fn name(&self) -> &str {
        self.health.stage()
    }

    fn run_once(&mut self) {
        let Some(motors) = self.motors.get() else {
            return;
        };

        let signal = match self.commands.take() {
            Some(cmd) => {
                debug!(direction = %cmd.direction, speed_level = cmd.speed_level, behavior = cmd.behavior.0, "applying command");
                DriveSignal::from_command(&cmd)
            }
            None => DriveSignal::stop(),
        };

        if let Err(e) = motors.apply(&signal) {
            warn!(driver = %motors.id(), error = %e, "failed to drive motors");
            return;
        }

        self.health.report();
    }

    fn shutdown(&mut self) {
        if let Some(motors) = self.motors.ready_mut() {
            match motors.stop() {
                Ok(()) => info!(driver = %motors.id(), "motors stopped"),
                Err(e) => warn!(driver = %motors.id(), error = %e, "failed to stop motors"),
            }
        }
    }
}
