//! `laserbot` – runs the laser-following pipeline.
//!
//! 1. Initialises logging (see [`laserbot_runtime::telemetry`]).
//! 2. Loads `laserbot.toml` plus `LASERBOT_*` overrides.
//! 3. Writes a default detection configuration on first run.
//! 4. Builds real or simulated hardware and wires the pipeline.
//! 5. Runs the stages and the watchdog supervisor until Ctrl-C.
//!
//! Exits non-zero when a simulated watchdog expires.

mod settings;

use std::f32::consts::TAU;
use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use colored::Colorize;
use tokio::sync::watch;
use tracing::{error, info, warn};

use laserbot_hal::sim::DotHandle;
use laserbot_hal::{Camera, MotorDriver, SimCamera, SimMotorDriver};
use laserbot_kernel::{SimWatchdog, WatchdogDevice};
use laserbot_perception::HsvThresholdDetector;
use laserbot_runtime::config_store::render_config;
use laserbot_runtime::{
    FileConfigSource, Pipeline, PipelineParts, RunOutcome, Subsystem, init_tracing,
};
use laserbot_types::DetectionConfig;

use settings::Settings;

fn main() -> ExitCode {
    let _telemetry = init_tracing("laserbot");

    print_banner();

    let settings = match settings::load() {
        Ok(s) => s,
        Err(e) => {
            println!("{}: {}", "Settings error".red(), e);
            println!("  Using default settings.");
            let mut s = Settings::default();
            settings::apply_env_overrides(&mut s);
            s
        }
    };
    info!(?settings, "settings loaded");

    let periods = settings.periods();
    for (stage, period) in periods.slower_than_supervisor() {
        warn!(
            stage,
            period_ms = period.as_millis() as u64,
            supervisor_period_ms = periods.supervisor.as_millis() as u64,
            "stage runs less often than the supervisor; kicks will be withheld"
        );
    }

    ensure_detection_config(&settings.detection_config);

    // ── Shutdown signal ───────────────────────────────────────────────────
    // The sender is shared with the Ctrl-C handler and kept alive here so a
    // failed handler install does not look like a shutdown request.
    let (stop_tx, stop_rx) = watch::channel(false);
    let stop_tx = Arc::new(stop_tx);
    let stop_ctrlc = Arc::clone(&stop_tx);

    if let Err(e) = ctrlc::set_handler(move || {
        println!();
        println!("{}", "⚠  Ctrl-C received – stopping pipeline …".yellow().bold());
        let _ = stop_ctrlc.send(true);
    }) {
        warn!(error = %e, "Failed to install Ctrl-C handler; graceful shutdown on Ctrl-C will not be available");
    }

    // ── Hardware ──────────────────────────────────────────────────────────
    let (parts, sim_dot) = build_parts(&settings);
    let pipeline = Pipeline::build(parts);
    let sequencer = pipeline.into_sequencer(periods);

    let runtime = match tokio::runtime::Builder::new_multi_thread().enable_all().build() {
        Ok(rt) => rt,
        Err(e) => {
            error!(error = %e, "failed to start Tokio runtime");
            return ExitCode::FAILURE;
        }
    };

    if let Some(dot) = sim_dot {
        runtime.spawn(orbit_dot(dot, settings.camera_width, settings.camera_height, stop_rx.clone()));
    }

    println!(
        "  Pipeline running{}. Press {} to stop.\n",
        if settings.simulate { " (simulated)".dimmed().to_string() } else { String::new() },
        "Ctrl-C".bold()
    );

    let outcome = runtime.block_on(sequencer.run(stop_rx));
    drop(stop_tx);

    match outcome {
        RunOutcome::Shutdown => {
            println!("{}", "  ✓ Pipeline stopped.".green());
            ExitCode::SUCCESS
        }
        RunOutcome::WatchdogExpired => {
            println!("{}", "  ✗ Watchdog expired – device reset.".red().bold());
            ExitCode::FAILURE
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Hardware selection
// ─────────────────────────────────────────────────────────────────────────────

/// Build the pipeline inputs.  Returns the simulated dot handle when the
/// simulated camera is in use.
fn build_parts(settings: &Settings) -> (PipelineParts, Option<DotHandle>) {
    let (camera, dot) = build_camera(settings);
    let parts = PipelineParts {
        camera,
        detector: Box::new(HsvThresholdDetector::new()),
        motors: build_motors(settings),
        config_source: Box::new(FileConfigSource::new(&settings.detection_config)),
        watchdog: build_watchdog(settings),
        watchdog_timeout: settings.watchdog_timeout(),
        initial_config: DetectionConfig::default(),
    };
    (parts, dot)
}

fn sim_camera(settings: &Settings) -> (Subsystem<Box<dyn Camera>>, Option<DotHandle>) {
    let cam = SimCamera::new("sim_camera", settings.camera_width, settings.camera_height);
    let dot = cam.dot();
    (Subsystem::ready("camera", Box::new(cam) as Box<dyn Camera>), Some(dot))
}

#[cfg(feature = "v4l2")]
fn build_camera(settings: &Settings) -> (Subsystem<Box<dyn Camera>>, Option<DotHandle>) {
    use laserbot_hal::v4l2::{V4l2Camera, V4l2Settings};

    if settings.simulate {
        return sim_camera(settings);
    }
    let v4l2 = V4l2Settings {
        device: settings.camera_device.clone(),
        width: settings.camera_width,
        height: settings.camera_height,
        fps: settings.camera_fps,
    };
    let camera = Subsystem::new("camera", move || {
        V4l2Camera::open("front_camera", &v4l2).map(|c| Box::new(c) as Box<dyn Camera>)
    });
    (camera, None)
}

#[cfg(not(feature = "v4l2"))]
fn build_camera(settings: &Settings) -> (Subsystem<Box<dyn Camera>>, Option<DotHandle>) {
    if !settings.simulate {
        warn!(device = %settings.camera_device, "built without the `v4l2` feature; using the simulated camera");
    }
    sim_camera(settings)
}

#[cfg(feature = "rpi")]
fn build_motors(settings: &Settings) -> Subsystem<Box<dyn MotorDriver>> {
    use laserbot_hal::gpio::{GpioMotorDriver, MotorPins};

    if settings.simulate {
        return Subsystem::ready("motors", Box::new(SimMotorDriver::new("sim_drive")) as Box<dyn MotorDriver>);
    }
    Subsystem::new("motors", || {
        GpioMotorDriver::open("drive_base", MotorPins::default()).map(|m| Box::new(m) as Box<dyn MotorDriver>)
    })
}

#[cfg(not(feature = "rpi"))]
fn build_motors(settings: &Settings) -> Subsystem<Box<dyn MotorDriver>> {
    if !settings.simulate {
        warn!("built without the `rpi` feature; using the simulated motor driver");
    }
    Subsystem::ready("motors", Box::new(SimMotorDriver::new("sim_drive")) as Box<dyn MotorDriver>)
}

#[cfg(target_os = "linux")]
fn build_watchdog(settings: &Settings) -> Box<dyn WatchdogDevice> {
    if settings.simulate {
        return Box::new(SimWatchdog::new());
    }
    Box::new(laserbot_kernel::LinuxWatchdog::new(&settings.watchdog_device))
}

#[cfg(not(target_os = "linux"))]
fn build_watchdog(settings: &Settings) -> Box<dyn WatchdogDevice> {
    if !settings.simulate {
        warn!(device = %settings.watchdog_device, "hardware watchdog needs Linux; using the simulated watchdog");
    }
    Box::new(SimWatchdog::new())
}

/// Write the default detection configuration if `path` does not exist yet.
fn ensure_detection_config(path: &Path) {
    if path.exists() {
        return;
    }
    let result = render_config(&DetectionConfig::default())
        .map_err(|e| e.to_string())
        .and_then(|raw| std::fs::write(path, raw).map_err(|e| e.to_string()));
    match result {
        Ok(()) => info!(path = %path.display(), "wrote default detection configuration"),
        Err(e) => warn!(path = %path.display(), error = %e, "could not write default detection configuration"),
    }
}

/// Move the simulated dot around an ellipse so the simulated pipeline
/// exercises every direction.
async fn orbit_dot(dot: DotHandle, width: u32, height: u32, mut stop: watch::Receiver<bool>) {
    let (cx, cy) = (width as f32 / 2.0, height as f32 / 2.0);
    let (rx, ry) = (cx * 0.8, cy * 0.8);
    let mut ticker = tokio::time::interval(Duration::from_millis(50));
    let mut angle: f32 = 0.0;

    loop {
        tokio::select! {
            _ = stop.changed() => break,
            _ = ticker.tick() => {
                let x = (cx + rx * angle.cos()).max(0.0) as u32;
                let y = (cy + ry * angle.sin()).max(0.0) as u32;
                dot.place(x, y);
                angle = (angle + 0.05) % TAU;
            }
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Banner
// ─────────────────────────────────────────────────────────────────────────────

fn print_banner() {
    println!();
    println!("{}", r#"   __                    __          __ "#.bold().red());
    println!("{}", r#"  / /  ___ ____ ___ ____/ /  ___  __/ /_"#.bold().red());
    println!("{}", r#" / /__/ _ `(_-</ -_) __/ _ \/ _ \/_  __/"#.bold().red());
    println!("{}", r#"/____/\_,_/___/\__/_/ /_.__/\___/ /_/   "#.bold().red());
    println!();
    println!("  {} {}",
        "laserbot".bold(),
        format!("v{}", env!("CARGO_PKG_VERSION")).dimmed()
    );
    println!("  Vision-guided laser follower");
    println!();
}
