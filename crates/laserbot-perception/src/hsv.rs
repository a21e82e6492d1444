//! 8-bit RGB → HSV conversion.
//!
//! Follows the usual 8-bit image convention: hue is halved to fit a byte
//! (`0..=180`), saturation and value span `0..=255`.

/// A pixel in 8-bit HSV space.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Hsv {
    /// Hue in half-degrees, `0..=180`.
    pub h: u8,
    pub s: u8,
    pub v: u8,
}

/// Convert one RGB pixel to [`Hsv`].
pub fn rgb_to_hsv([r, g, b]: [u8; 3]) -> Hsv {
    let (rf, gf, bf) = (f32::from(r), f32::from(g), f32::from(b));
    let max = rf.max(gf).max(bf);
    let min = rf.min(gf).min(bf);
    let diff = max - min;

    let s = if max == 0.0 { 0.0 } else { 255.0 * diff / max };

    let h_deg = if diff == 0.0 {
        0.0
    } else if max == rf {
        60.0 * (gf - bf) / diff
    } else if max == gf {
        120.0 + 60.0 * (bf - rf) / diff
    } else {
        240.0 + 60.0 * (rf - gf) / diff
    };
    let h_deg = if h_deg < 0.0 { h_deg + 360.0 } else { h_deg };

    Hsv {
        h: (h_deg / 2.0).round().min(180.0) as u8,
        s: s.round() as u8,
        v: max as u8,
    }
}
