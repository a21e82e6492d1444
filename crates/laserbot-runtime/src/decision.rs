//! Pure mapping from a target position to a drive command.
//!
//! The frame is split into screen regions:
//!
//! ```text
//!        x < 200     200..=450     x > 450
//!      ┌──────────┬─────────────┬──────────┐
//!      │          │  forward    │          │  y <= 480
//!      │   left   │  (center)   │  right   │
//!      │          │             │          │
//!      └──────────┴─────────────┴──────────┘
//! ```
//!
//! The side regions only steer when the point is strictly above or below the
//! `y == 400` line.  Left wins over right, right over forward, and anything
//! else stops.  The speed level only depends on the vertical position and is
//! computed for every direction, including [`Direction::Stop`].

use laserbot_types::{DetectedPoint, Direction, MovementCommand};

// ────────────────────────────────────────────────────────────────────────────
// Region boundaries
// ────────────────────────────────────────────────────────────────────────────

const LEFT_EDGE: i32 = 200;
const RIGHT_EDGE: i32 = 450;
const CENTER_MAX_Y: i32 = 480;
const FAST_BELOW_Y: i32 = 160;
const MEDIUM_MAX_Y: i32 = 320;
const TOP_BOTTOM_SPLIT_Y: i32 = 400;

/// Screen-region classification of a point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Regions {
    pub left: bool,
    pub right: bool,
    pub center: bool,
    pub top: bool,
    pub bottom: bool,
}

impl Regions {
    pub fn classify(x: i32, y: i32) -> Self {
        Self {
            left: x < LEFT_EDGE,
            right: x > RIGHT_EDGE,
            center: (LEFT_EDGE..=RIGHT_EDGE).contains(&x) && y <= CENTER_MAX_Y,
            top: y < TOP_BOTTOM_SPLIT_Y,
            bottom: y > TOP_BOTTOM_SPLIT_Y,
        }
    }
}

/// Speed level for a vertical position: 3 near the top of the frame,
/// 1 near the bottom.
pub fn speed_level(y: i32) -> u8 {
    if y < FAST_BELOW_Y {
        3
    } else if y <= MEDIUM_MAX_Y {
        2
    } else {
        1
    }
}

/// Turn a detected point into a [`MovementCommand`], carrying the point's
/// behavior selector through unchanged.
pub fn decide(point: DetectedPoint) -> MovementCommand {
    let regions = Regions::classify(point.x, point.y);

    let off_midline = regions.top || regions.bottom;

    let direction = if regions.left && off_midline {
        Direction::Left
    } else if regions.right && off_midline {
        Direction::Right
    } else if regions.center {
        Direction::Forward
    } else {
        Direction::Stop
    };

    MovementCommand {
        direction,
        speed_level: speed_level(point.y),
        behavior: point.behavior,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use laserbot_types::Behavior;

    fn at(x: i32, y: i32) -> MovementCommand {
        decide(DetectedPoint {
            x,
            y,
            behavior: Behavior(1),
        })
    }

    fn cmd(direction: Direction, speed_level: u8) -> MovementCommand {
        MovementCommand {
            direction,
            speed_level,
            behavior: Behavior(1),
        }
    }

    #[test]
    fn left_region() {
        assert_eq!(at(100, 100), cmd(Direction::Left, 3));
        assert_eq!(at(199, 300), cmd(Direction::Left, 2));
    }

    #[test]
    fn right_region() {
        assert_eq!(at(500, 300), cmd(Direction::Right, 2));
        assert_eq!(at(451, 10), cmd(Direction::Right, 3));
    }

    #[test]
    fn center_region_moves_forward() {
        assert_eq!(at(300, 450), cmd(Direction::Forward, 1));
        assert_eq!(at(300, 480), cmd(Direction::Forward, 1));
    }

    #[test]
    fn center_boundaries_are_inclusive() {
        assert_eq!(at(200, 400).direction, Direction::Forward);
        assert_eq!(at(450, 0).direction, Direction::Forward);
    }

    #[test]
    fn below_center_stops_but_keeps_speed() {
        assert_eq!(at(300, 500), cmd(Direction::Stop, 1));
        assert_eq!(at(300, 481), cmd(Direction::Stop, 1));
    }

    #[test]
    fn side_regions_ignore_vertical_limit() {
        assert_eq!(at(10, 900).direction, Direction::Left);
        assert_eq!(at(900, 900).direction, Direction::Right);
    }

    #[test]
    fn speed_thresholds() {
        assert_eq!(speed_level(0), 3);
        assert_eq!(speed_level(159), 3);
        assert_eq!(speed_level(160), 2);
        assert_eq!(speed_level(320), 2);
        assert_eq!(speed_level(321), 1);
    }

    #[test]
    fn side_regions_on_midline_stop() {
        assert_eq!(at(100, 400), cmd(Direction::Stop, 1));
        assert_eq!(at(500, 400), cmd(Direction::Stop, 1));
    }

    #[test]
    fn literal_boundary_cases() {
        assert_eq!(at(100, 100), cmd(Direction::Left, 3));
        assert_eq!(at(300, 200), cmd(Direction::Forward, 2));
        assert_eq!(at(500, 500), cmd(Direction::Right, 1));
        assert_eq!(at(300, 490), cmd(Direction::Stop, 1));
        assert_eq!(at(200, 400), cmd(Direction::Forward, 1));
    }

    #[test]
    fn behavior_passes_through() {
        let out = decide(DetectedPoint {
            x: 300,
            y: 100,
            behavior: Behavior(0),
        });
        assert_eq!(out.behavior, Behavior(0));
    }

    #[test]
    fn regions_split_top_and_bottom_at_400() {
        let r = Regions::classify(300, 400);
        assert!(!r.top && !r.bottom);
        assert!(Regions::classify(0, 399).top);
        assert!(Regions::classify(0, 401).bottom);
    }
}
