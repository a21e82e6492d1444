//! [`Detector`] – finds the target in a camera frame.
//!
//! [`HsvThresholdDetector`] builds a binary mask from three per-channel
//! threshold tests and returns the centroid of the mask:
//!
//! ```text
//! mask = !band(h, hue) & band(s, saturation) & band(v, value)
//! band(c, r) = r.min < c <= r.max
//! ```
//!
//! The hue test is inverted because red sits at both ends of the hue
//! circle: the configured hue range describes the colours to *reject*.
//! Ranges with `min > max` are used as-is; such a band matches nothing.

use laserbot_hal::CameraFrame;
use laserbot_types::{ChannelRange, DetectionConfig};
use tracing::trace;

use crate::hsv::rgb_to_hsv;

/// Fewer matching pixels than this is treated as noise.
pub const MIN_BLOB_AREA: usize = 5;

/// Target location in pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelPoint {
    pub x: i32,
    pub y: i32,
}

/// Locates at most one target per frame.
pub trait Detector: Send {
    /// Analyse `frame` using the thresholds in `config`.
    fn detect(&mut self, frame: &CameraFrame, config: &DetectionConfig) -> Option<PixelPoint>;
}

/// Colour-threshold detector for a bright red laser dot.
#[derive(Debug, Default, Clone)]
pub struct HsvThresholdDetector {
    min_area: usize,
}

impl HsvThresholdDetector {
    pub fn new() -> Self {
        Self {
            min_area: MIN_BLOB_AREA,
        }
    }

    /// Override the minimum number of matching pixels.
    pub fn with_min_area(mut self, min_area: usize) -> Self {
        self.min_area = min_area;
        self
    }
}

fn band(c: u8, range: ChannelRange) -> bool {
    let c = i32::from(c);
    range.min < c && c <= range.max
}

impl Detector for HsvThresholdDetector {
    fn detect(&mut self, frame: &CameraFrame, config: &DetectionConfig) -> Option<PixelPoint> {
        let mut count: u64 = 0;
        let mut sum_x: u64 = 0;
        let mut sum_y: u64 = 0;

        for y in 0..frame.height {
            for x in 0..frame.width {
                let Some(rgb) = frame.rgb(x, y) else { continue };
                let hsv = rgb_to_hsv(rgb);
                if !band(hsv.h, config.hue)
                    && band(hsv.s, config.saturation)
                    && band(hsv.v, config.value)
                {
                    count += 1;
                    sum_x += u64::from(x);
                    sum_y += u64::from(y);
                }
            }
        }

        if count == 0 || (count as usize) < self.min_area.max(1) {
            trace!(matched = count, "no target in frame");
            return None;
        }

        Some(PixelPoint {
            x: (sum_x / count) as i32,
            y: (sum_y / count) as i32,
        })
    }
}
