//! V4L2 camera driver built on `rscam`.
//!
//! Frames are requested as MJPG (supported by virtually every USB webcam)
//! and decoded to RGB24 with the `image` crate.

use image::ImageFormat;
use tracing::info;

use laserbot_types::BotError;

use crate::camera::{Camera, CameraFrame};

/// Capture settings for [`V4l2Camera`].
#[derive(Debug, Clone)]
pub struct V4l2Settings {
    /// Device node, e.g. `/dev/video0`.
    pub device: String,
    pub width: u32,
    pub height: u32,
    pub fps: u32,
}

impl Default for V4l2Settings {
    fn default() -> Self {
        Self {
            device: "/dev/video0".to_string(),
            width: 640,
            height: 480,
            fps: 30,
        }
    }
}

/// A V4L2 capture device streaming MJPG.
pub struct V4l2Camera {
    id: String,
    inner: rscam::Camera,
}

impl V4l2Camera {
    /// Open the device and start streaming.
    ///
    /// # Errors
    ///
    /// Returns [`BotError::HardwareFault`] if the device cannot be opened or
    /// refuses the requested format.
    pub fn open(id: impl Into<String>, settings: &V4l2Settings) -> Result<Self, BotError> {
        let id = id.into();
        let mut inner = rscam::new(&settings.device)
            .map_err(|e| BotError::hardware(&id, format!("{}: {e}", settings.device)))?;
        inner
            .start(&rscam::Config {
                interval: (1, settings.fps),
                resolution: (settings.width, settings.height),
                format: b"MJPG",
                ..Default::default()
            })
            .map_err(|e| BotError::hardware(&id, e))?;
        info!(camera = %id, device = %settings.device, "V4L2 capture started");
        Ok(Self { id, inner })
    }
}

// SAFETY: `rscam::Camera` owns its descriptor and mmap'd buffers outright and
// is only touched through `&mut self`; moving it to another thread is sound.
// It is not `Send` only because the buffers are stored as raw pointers.
unsafe impl Send for V4l2Camera {}

impl Camera for V4l2Camera {
    fn id(&self) -> &str {
        &self.id
    }

    fn capture(&mut self) -> Result<CameraFrame, BotError> {
        let raw = self
            .inner
            .capture()
            .map_err(|e| BotError::hardware(&self.id, e))?;
        let rgb = image::load_from_memory_with_format(&raw, ImageFormat::Jpeg)
            .map_err(|e| BotError::hardware(&self.id, format!("MJPG decode: {e}")))?
            .to_rgb8();
        Ok(CameraFrame {
            width: rgb.width(),
            height: rgb.height(),
            data: rgb.into_raw(),
        })
    }
}
