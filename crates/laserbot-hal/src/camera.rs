//! Generic `Camera` trait and the RGB frame type it produces.

use laserbot_types::BotError;

/// A packed RGB24 image frame returned by a camera driver.
#[derive(Debug, Clone)]
pub struct CameraFrame {
    /// Frame width in pixels.
    pub width: u32,
    /// Frame height in pixels.
    pub height: u32,
    /// Row-major RGB24 pixel data, `width * height * 3` bytes.
    pub data: Vec<u8>,
}

impl CameraFrame {
    /// An all-black frame of the given size.
    pub fn black(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            data: vec![0u8; width as usize * height as usize * 3],
        }
    }

    /// The `[r, g, b]` triple at (`x`, `y`), or `None` outside the frame or
    /// when the buffer is shorter than the declared size.
    pub fn rgb(&self, x: u32, y: u32) -> Option<[u8; 3]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let i = (y as usize * self.width as usize + x as usize) * 3;
        self.data.get(i..i + 3).map(|p| [p[0], p[1], p[2]])
    }

    /// Overwrite the pixel at (`x`, `y`).  Out-of-range writes are ignored.
    pub fn set_rgb(&mut self, x: u32, y: u32, rgb: [u8; 3]) {
        if x >= self.width || y >= self.height {
            return;
        }
        let i = (y as usize * self.width as usize + x as usize) * 3;
        if let Some(p) = self.data.get_mut(i..i + 3) {
            p.copy_from_slice(&rgb);
        }
    }
}

/// A camera or image-capture device.
pub trait Camera: Send {
    /// Stable identifier for this camera, e.g. `"front_rgb"`.
    fn id(&self) -> &str;

    /// Capture and return the next available frame.
    ///
    /// # Errors
    ///
    /// Returns [`BotError::HardwareFault`] if the frame cannot be captured
    /// (e.g. the device is disconnected or the buffer is unavailable).
    fn capture(&mut self) -> Result<CameraFrame, BotError>;
}
