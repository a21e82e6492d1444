use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Inclusive bounds applied to a single colour channel by the detector.
///
/// `min <= max` is expected but not enforced: an inverted range is carried
/// through unchanged and simply matches nothing downstream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelRange {
    pub min: i32,
    pub max: i32,
}

impl ChannelRange {
    pub const fn new(min: i32, max: i32) -> Self {
        Self { min, max }
    }
}

/// Integer flag choosing between the two motor wiring conventions.
///
/// Any non-zero value selects the primary table; zero selects the
/// alternate (reversed polarity) table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Behavior(pub i32);

impl Behavior {
    pub const PRIMARY: Behavior = Behavior(1);
    pub const ALTERNATE: Behavior = Behavior(0);

    /// `true` when this selector picks the alternate wiring table.
    pub fn is_alternate(self) -> bool {
        self.0 == 0
    }
}

impl Default for Behavior {
    fn default() -> Self {
        Self::PRIMARY
    }
}

/// Tunable detection parameters: HSV thresholds plus the behavior selector.
///
/// Always replaced wholesale by the config store, never edited in place.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetectionConfig {
    pub hue: ChannelRange,
    pub saturation: ChannelRange,
    pub value: ChannelRange,
    pub behavior: Behavior,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            hue: ChannelRange::new(20, 160),
            saturation: ChannelRange::new(100, 255),
            value: ChannelRange::new(200, 255),
            behavior: Behavior::default(),
        }
    }
}

/// A target located in a camera frame.
///
/// `behavior` is captured from the configuration snapshot taken when the
/// frame was analysed, not when the point is later consumed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetectedPoint {
    pub x: i32,
    pub y: i32,
    pub behavior: Behavior,
}

/// Direction requested from the drive base.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    Forward,
    Left,
    Right,
    Stop,
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Direction::Forward => write!(f, "FORWARD"),
            Direction::Left => write!(f, "LEFT"),
            Direction::Right => write!(f, "RIGHT"),
            Direction::Stop => write!(f, "STOP"),
        }
    }
}

/// Drive command produced by the decision stage.
///
/// `speed_level` is in `0..=3`. It is not forced to zero for
/// [`Direction::Stop`]; the actuation side is responsible for that.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MovementCommand {
    pub direction: Direction,
    pub speed_level: u8,
    pub behavior: Behavior,
}

/// Error type shared by hardware drivers and pipeline stages.
#[derive(Error, Debug, Serialize, Deserialize)]
pub enum BotError {
    #[error("Hardware Fault on {component}: {details}")]
    HardwareFault { component: String, details: String },

    #[error("Configuration Error: {0}")]
    Config(String),

    #[error("Serialization Error: {0}")]
    Serialization(String),
}

impl BotError {
    /// Shorthand for a [`BotError::HardwareFault`].
    pub fn hardware(component: impl Into<String>, details: impl std::fmt::Display) -> Self {
        BotError::HardwareFault {
            component: component.into(),
            details: details.to_string(),
        }
    }
}
