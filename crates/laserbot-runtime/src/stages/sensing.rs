//! Camera frame → detected point.

use std::sync::Arc;

use laserbot_hal::Camera;
use laserbot_kernel::HealthReporter;
use laserbot_middleware::Mailbox;
use laserbot_perception::Detector;
use laserbot_types::DetectedPoint;
use tracing::{debug, warn};

use crate::config_store::ConfigStore;
use crate::stage::{Stage, Subsystem};

/// Captures one frame per period and publishes the target, if any.
///
/// The published point is tagged with the behavior selector of the
/// configuration snapshot used for detection.  A configuration swap that
/// lands after this point does not change its tag.
pub struct SensingStage {
    camera: Subsystem<Box<dyn Camera>>,
    detector: Box<dyn Detector>,
    config: Arc<ConfigStore>,
    points: Arc<Mailbox<DetectedPoint>>,
    health: HealthReporter,
}

impl SensingStage {
    pub fn new(
        camera: Subsystem<Box<dyn Camera>>,
        detector: Box<dyn Detector>,
        config: Arc<ConfigStore>,
        points: Arc<Mailbox<DetectedPoint>>,
        health: HealthReporter,
    ) -> Self {
        Self {
            camera,
            detector,
            config,
            points,
            health,
        }
    }
}

impl Stage for SensingStage {
    fn name(&self) -> &str {
        self.health.stage()
    }

    fn run_once(&mut self) {
        let Some(camera) = self.camera.get() else {
            return;
        };

        let frame = match camera.capture() {
            Ok(frame) => frame,
            Err(e) => {
                warn!(camera = %camera.id(), error = %e, "frame capture failed");
                return;
            }
        };

        let config = self.config.current();
        if let Some(pixel) = self.detector.detect(&frame, &config) {
            debug!(x = pixel.x, y = pixel.y, "target detected");
            self.points.publish(DetectedPoint {
                x: pixel.x,
                y: pixel.y,
                behavior: config.behavior,
            });
        }

        self.health.report();
    }
}
