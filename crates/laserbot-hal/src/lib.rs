//! `laserbot-hal` – Hardware Abstraction Layer.
//!
//! The rest of the workspace only ever talks to the traits defined here, so
//! drivers can be swapped (real hardware, simulation) without touching the
//! pipeline.
//!
//! # Modules
//!
//! - [`camera`] – [`Camera`][camera::Camera] trait and
//!   [`CameraFrame`][camera::CameraFrame].
//! - [`motor`] – [`MotorDriver`][motor::MotorDriver] trait for the two-motor
//!   drive base.
//! - [`drive`] – [`DriveSignal`][drive::DriveSignal]: translation of a
//!   [`MovementCommand`][laserbot_types::MovementCommand] into H-bridge line
//!   levels and a PWM duty cycle, using one of two wiring tables.
//! - [`sim`] – in-process drivers for tests and headless runs.
//! - `gpio` (feature `rpi`) – Raspberry Pi motor driver built on `rppal`.
//! - `v4l2` (feature `v4l2`) – V4L2 camera built on `rscam`.

pub mod camera;
pub mod drive;
pub mod motor;
pub mod sim;

#[cfg(feature = "rpi")]
pub mod gpio;
#[cfg(feature = "v4l2")]
pub mod v4l2;

pub use camera::{Camera, CameraFrame};
pub use drive::DriveSignal;
pub use motor::MotorDriver;
pub use sim::{SimCamera, SimMotorDriver};
