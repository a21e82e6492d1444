//! [`Pipeline`] – wiring of the stages, the two mailboxes, the
//! configuration store and the health supervisor.
//!
//! ```text
//!  camera ─► sensing ─► Mailbox<DetectedPoint> ─► decision ─► Mailbox<MovementCommand> ─► actuation ─► motors
//!              ▲
//!              └──── ConfigStore ◄── config_refresh ◄── config source
//! ```
//!
//! Every stage receives explicit handles to the containers it touches at
//! construction.  Each mailbox has exactly one writer stage and one reader
//! stage.

use std::sync::Arc;
use std::time::Duration;

use laserbot_hal::{Camera, MotorDriver};
use laserbot_kernel::{HealthRecord, HealthSupervisor, TickOutcome, WatchdogDevice};
use laserbot_middleware::Mailbox;
use laserbot_perception::Detector;
use laserbot_types::{DetectedPoint, DetectionConfig, MovementCommand};

use crate::config_store::{ConfigSource, ConfigStore};
use crate::sequencer::{Sequencer, StagePeriods};
use crate::stage::{Stage, Subsystem};
use crate::stages::{
    ACTUATION, ActuationStage, CONFIG_REFRESH, ConfigRefreshStage, DECISION, DecisionStage, SENSING,
    SensingStage,
};

/// Everything the pipeline needs from the outside world.
pub struct PipelineParts {
    pub camera: Subsystem<Box<dyn Camera>>,
    pub detector: Box<dyn Detector>,
    pub motors: Subsystem<Box<dyn MotorDriver>>,
    pub config_source: Box<dyn ConfigSource>,
    pub watchdog: Box<dyn WatchdogDevice>,
    pub watchdog_timeout: Duration,
    pub initial_config: DetectionConfig,
}

/// The assembled pipeline.
pub struct Pipeline {
    pub sensing: SensingStage,
    pub decision: DecisionStage,
    pub actuation: ActuationStage,
    pub config_refresh: ConfigRefreshStage,
    pub supervisor: HealthSupervisor,
    config: Arc<ConfigStore>,
    points: Arc<Mailbox<DetectedPoint>>,
    commands: Arc<Mailbox<MovementCommand>>,
}

impl Pipeline {
    /// Create the shared containers, register every stage with a fresh
    /// supervisor and hand each stage its handles.
    pub fn build(parts: PipelineParts) -> Self {
        let PipelineParts {
            camera,
            detector,
            motors,
            config_source,
            watchdog,
            watchdog_timeout,
            initial_config,
        } = parts;

        let config = Arc::new(ConfigStore::new(initial_config));
        let points = Arc::new(Mailbox::new("detected_point"));
        let commands = Arc::new(Mailbox::new("movement_command"));

        let mut supervisor = HealthSupervisor::new(watchdog, watchdog_timeout);

        let sensing = SensingStage::new(
            camera,
            detector,
            Arc::clone(&config),
            Arc::clone(&points),
            supervisor.register(SENSING),
        );
        let decision = DecisionStage::new(
            Arc::clone(&points),
            Arc::clone(&commands),
            supervisor.register(DECISION),
        );
        let actuation = ActuationStage::new(motors, Arc::clone(&commands), supervisor.register(ACTUATION));
        let config_refresh = ConfigRefreshStage::new(
            Arc::clone(&config),
            config_source,
            supervisor.register(CONFIG_REFRESH),
        );

        Self {
            sensing,
            decision,
            actuation,
            config_refresh,
            supervisor,
            config,
            points,
            commands,
        }
    }

    pub fn config(&self) -> Arc<ConfigStore> {
        Arc::clone(&self.config)
    }

    /// Sensing → decision handoff.
    pub fn points(&self) -> Arc<Mailbox<DetectedPoint>> {
        Arc::clone(&self.points)
    }

    /// Decision → actuation handoff.
    pub fn commands(&self) -> Arc<Mailbox<MovementCommand>> {
        Arc::clone(&self.commands)
    }

    pub fn health(&self) -> Arc<HealthRecord> {
        self.supervisor.record()
    }

    /// Run every stage once in data-flow order, then one supervisory tick.
    /// Deterministic single-threaded stepping for tests and dry runs.
    pub fn run_cycle(&mut self) -> TickOutcome {
        self.config_refresh.run_once();
        self.sensing.run_once();
        self.decision.run_once();
        self.actuation.run_once();
        self.supervisor.tick()
    }

    /// Hand the stages and supervisor to a [`Sequencer`] with `periods`.
    pub fn into_sequencer(self, periods: StagePeriods) -> Sequencer {
        let mut sequencer = Sequencer::new(self.supervisor, periods.supervisor);
        sequencer.add_stage(Box::new(self.config_refresh), periods.config_refresh);
        sequencer.add_stage(Box::new(self.sensing), periods.sensing);
        sequencer.add_stage(Box::new(self.decision), periods.decision);
        sequencer.add_stage(Box::new(self.actuation), periods.actuation);
        sequencer
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::SystemTime;

    use laserbot_hal::sim::{DotHandle, DriveLog};
    use laserbot_hal::{DriveSignal, SimCamera, SimMotorDriver};
    use laserbot_kernel::{SimWatchdog, StageHealth};
    use laserbot_perception::HsvThresholdDetector;
    use laserbot_types::{Behavior, BotError, Direction};
    use tokio::sync::watch;

    use crate::config_store::ConfigError;
    use crate::sequencer::RunOutcome;

    /// A source that never changes and always yields the defaults.
    struct FixedSource;

    impl ConfigSource for FixedSource {
        fn origin(&self) -> String {
            "fixed".to_string()
        }

        fn modified(&self) -> Result<SystemTime, ConfigError> {
            Ok(SystemTime::UNIX_EPOCH)
        }

        fn load(&self) -> Result<DetectionConfig, ConfigError> {
            Ok(DetectionConfig::default())
        }
    }

    struct Harness {
        pipeline: Pipeline,
        dot: DotHandle,
        drive: DriveLog,
    }

    fn harness(camera_ok: bool) -> Harness {
        let cam = SimCamera::new("front", 640, 480);
        let dot = cam.dot();
        let motors = SimMotorDriver::new("drive_base");
        let drive = motors.log();

        let camera: Subsystem<Box<dyn Camera>> = if camera_ok {
            Subsystem::new("camera", move || Ok(Box::new(cam) as Box<dyn Camera>))
        } else {
            Subsystem::new("camera", || Err(BotError::hardware("camera", "not connected")))
        };

        let pipeline = Pipeline::build(PipelineParts {
            camera,
            detector: Box::new(HsvThresholdDetector::new()),
            motors: Subsystem::ready("motors", Box::new(motors) as Box<dyn MotorDriver>),
            config_source: Box::new(FixedSource),
            watchdog: Box::new(SimWatchdog::new()),
            watchdog_timeout: Duration::from_secs(5),
            initial_config: DetectionConfig::default(),
        });

        Harness { pipeline, dot, drive }
    }

    #[test]
    fn point_flows_to_exactly_one_command() {
        let h = harness(true);
        let mut p = h.pipeline;

        p.points().publish(DetectedPoint {
            x: 50,
            y: 50,
            behavior: Behavior(1),
        });
        p.decision.run_once();

        let commands = p.commands();
        assert_eq!(
            commands.take(),
            Some(MovementCommand {
                direction: Direction::Left,
                speed_level: 3,
                behavior: Behavior(1),
            })
        );
        assert!(commands.take().is_none());
    }

    #[test]
    fn full_cycle_drives_toward_the_dot_and_kicks() {
        let mut h = harness(true);
        h.dot.place(50, 50);

        // Sensing publishes in the same cycle that decision consumes, and
        // actuation applies the command produced earlier in that cycle.
        assert_eq!(h.pipeline.run_cycle(), TickOutcome::Kicked);

        let signal = h.drive.last().unwrap();
        assert!(signal.motor_b_forward);
        assert!(!signal.motor_a_forward);
        assert_eq!(signal.duty_percent, 100);
        assert_eq!(h.pipeline.supervisor.kicks(), 1);
    }

    #[test]
    fn no_target_stops_motors_and_still_kicks() {
        let mut h = harness(true);
        h.dot.hide();
        assert_eq!(h.pipeline.run_cycle(), TickOutcome::Kicked);
        assert_eq!(h.drive.last(), Some(DriveSignal::stop()));
    }

    #[test]
    fn failed_camera_withholds_every_kick() {
        let mut h = harness(false);
        for _ in 0..3 {
            match h.pipeline.run_cycle() {
                TickOutcome::Withheld { pending } => assert_eq!(pending, vec![SENSING.to_string()]),
                other => panic!("expected withheld tick, got {other:?}"),
            }
        }
        assert_eq!(h.pipeline.health().health(SENSING), Some(StageHealth::Pending));
        assert_eq!(h.pipeline.supervisor.kicks(), 0);
    }

    #[test]
    fn behavior_is_captured_at_detection_time() {
        let mut h = harness(true);
        h.dot.place(300, 200);
        h.pipeline.sensing.run_once();

        h.pipeline.config().replace(DetectionConfig {
            behavior: Behavior(0),
            ..DetectionConfig::default()
        });
        h.pipeline.decision.run_once();

        let cmd = h.pipeline.commands().take().unwrap();
        assert_eq!(cmd.direction, Direction::Forward);
        assert_eq!(cmd.behavior, Behavior(1));
    }

    #[tokio::test]
    async fn sequencer_runs_the_wired_pipeline() {
        let h = harness(true);
        h.dot.place(600, 100);
        let sequencer = h.pipeline.into_sequencer(StagePeriods::default());
        assert_eq!(sequencer.stage_count(), 4);

        let (stop_tx, stop_rx) = watch::channel(false);
        let run = tokio::spawn(sequencer.run(stop_rx));
        tokio::time::sleep(Duration::from_millis(300)).await;
        stop_tx.send(true).unwrap();
        assert_eq!(run.await.unwrap(), RunOutcome::Shutdown);

        assert!(h.drive.signals().iter().any(|s| s.motor_a_forward && !s.motor_b_forward));
        // Actuation stops the motors on shutdown.
        assert_eq!(h.drive.last(), Some(DriveSignal::stop()));
    }
}
