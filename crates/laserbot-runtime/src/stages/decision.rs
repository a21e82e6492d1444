//! Detected point → movement command.

use std::sync::Arc;

use laserbot_kernel::HealthReporter;
use laserbot_middleware::Mailbox;
use laserbot_types::{DetectedPoint, MovementCommand};
use tracing::info;

use crate::decision::decide;
use crate::stage::Stage;

/// Consumes the latest point, if any, and publishes the resulting command.
///
/// The behavior selector comes from the point, never from the live
/// configuration.
pub struct DecisionStage {
    points: Arc<Mailbox<DetectedPoint>>,
    commands: Arc<Mailbox<MovementCommand>>,
    health: HealthReporter,
}

impl DecisionStage {
    pub fn new(
        points: Arc<Mailbox<DetectedPoint>>,
        commands: Arc<Mailbox<MovementCommand>>,
        health: HealthReporter,
    ) -> Self {
        Self {
            points,
            commands,
            health,
        }
    }
}

impl Stage for DecisionStage {
    fn name(&self) -> &str {
        self.health.stage()
    }

    fn run_once(&mut self) {
        if let Some(point) = self.points.take() {
            let cmd = decide(point);
            self.commands.publish(cmd);
            info!(
                direction = %cmd.direction,
                speed_level = cmd.speed_level,
                x = point.x,
                y = point.y,
                "movement decided"
            );
        }
        self.health.report();
    }
}
