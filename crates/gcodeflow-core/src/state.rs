//! Modal machine state
//!
//! Tracks the persistent configuration that G-code commands implicitly depend
//! on and update:
//! - Motion group (G0, G1, G2, G3)
//! - Plane selection group (G17, G18, G19)
//! - Distance mode group (G90, G91) and arc distance mode (G90.1, G91.1)
//! - Units group (G20, G21)
//! - Feed rate (F) and spindle (M3, M4, M5, S)
//! - Current position

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::units::Units;

/// Linear axis identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Axis {
    X,
    Y,
    Z,
}

impl Axis {
    /// All linear axes in word order
    pub const ALL: [Axis; 3] = [Axis::X, Axis::Y, Axis::Z];

    /// The G-code letter addressing this axis
    pub fn letter(&self) -> char {
        match self {
            Axis::X => 'X',
            Axis::Y => 'Y',
            Axis::Z => 'Z',
        }
    }

    /// The arc center offset letter paired with this axis (I, J, K)
    pub fn offset_letter(&self) -> char {
        match self {
            Axis::X => 'I',
            Axis::Y => 'J',
            Axis::Z => 'K',
        }
    }

    /// Axis addressed by a letter, case-insensitive
    pub fn from_letter(letter: char) -> Option<Axis> {
        match letter.to_ascii_uppercase() {
            'X' => Some(Axis::X),
            'Y' => Some(Axis::Y),
            'Z' => Some(Axis::Z),
            _ => None,
        }
    }
}

/// Machine position (X, Y, Z)
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Position {
    /// Create a new position
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Read one axis
    pub fn get(&self, axis: Axis) -> f64 {
        match axis {
            Axis::X => self.x,
            Axis::Y => self.y,
            Axis::Z => self.z,
        }
    }

    /// Write one axis
    pub fn set(&mut self, axis: Axis, value: f64) {
        match axis {
            Axis::X => self.x = value,
            Axis::Y => self.y = value,
            Axis::Z => self.z = value,
        }
    }

    /// Euclidean distance to another position
    pub fn distance_to(&self, other: &Position) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        let dz = self.z - other.z;
        (dx * dx + dy * dy + dz * dz).sqrt()
    }

    /// Convert every axis between unit systems
    pub fn convert(&self, from: Units, to: Units) -> Position {
        Position::new(
            Units::convert(self.x, from, to),
            Units::convert(self.y, from, to),
            Units::convert(self.z, from, to),
        )
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.4}, {:.4}, {:.4})", self.x, self.y, self.z)
    }
}

/// Motion mode - Group 1
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum MotionMode {
    /// No motion mode active (e.g. after G80)
    #[default]
    None,
    /// G0 rapid positioning
    Rapid,
    /// G1 linear interpolation
    Linear,
    /// G2 clockwise arc
    ArcCw,
    /// G3 counter-clockwise arc
    ArcCcw,
}

impl MotionMode {
    /// Motion mode selected by a G-code number
    pub fn from_gcode(code: f64) -> Option<MotionMode> {
        match code {
            c if c == 0.0 => Some(MotionMode::Rapid),
            c if c == 1.0 => Some(MotionMode::Linear),
            c if c == 2.0 => Some(MotionMode::ArcCw),
            c if c == 3.0 => Some(MotionMode::ArcCcw),
            c if c == 80.0 => Some(MotionMode::None),
            _ => None,
        }
    }

    /// True for G2 and G3
    pub fn is_arc(&self) -> bool {
        matches!(self, MotionMode::ArcCw | MotionMode::ArcCcw)
    }

    /// True for G0 and G1
    pub fn is_straight(&self) -> bool {
        matches!(self, MotionMode::Rapid | MotionMode::Linear)
    }

    /// The G-code word for this mode, if any
    pub fn gcode(&self) -> Option<&'static str> {
        match self {
            MotionMode::None => None,
            MotionMode::Rapid => Some("G0"),
            MotionMode::Linear => Some("G1"),
            MotionMode::ArcCw => Some("G2"),
            MotionMode::ArcCcw => Some("G3"),
        }
    }
}

/// Plane selection - Group 2
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Plane {
    /// G17
    #[default]
    XY,
    /// G18
    ZX,
    /// G19
    YZ,
}

impl Plane {
    /// Plane selected by a G-code number
    pub fn from_gcode(code: f64) -> Option<Plane> {
        match code {
            c if c == 17.0 => Some(Plane::XY),
            c if c == 18.0 => Some(Plane::ZX),
            c if c == 19.0 => Some(Plane::YZ),
            _ => None,
        }
    }

    /// The in-plane axes (first, second) and the linear axis normal to the plane
    ///
    /// The order of the in-plane pair makes counter-clockwise positive when
    /// viewed from the positive end of the normal axis.
    pub fn axes(&self) -> (Axis, Axis, Axis) {
        match self {
            Plane::XY => (Axis::X, Axis::Y, Axis::Z),
            Plane::ZX => (Axis::Z, Axis::X, Axis::Y),
            Plane::YZ => (Axis::Y, Axis::Z, Axis::X),
        }
    }
}

/// Distance mode for axis words (G90/G91) or arc centers (G90.1/G91.1)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DistanceMode {
    Absolute,
    Incremental,
}

/// Spindle rotation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SpindleDirection {
    /// M5
    #[default]
    Off,
    /// M3
    Cw,
    /// M4
    Ccw,
}

/// Spindle state
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Spindle {
    pub direction: SpindleDirection,
    pub speed: f64,
}

/// Modal state snapshot handed to every stage
///
/// Reflects the cumulative effect of every input line already committed.
/// Stages only ever see it through a shared reference.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ModalState {
    /// Current position, in `units`
    pub position: Position,
    /// Units group (G20, G21)
    pub units: Units,
    /// Plane selection (G17, G18, G19)
    pub plane: Plane,
    /// Motion mode (G0, G1, G2, G3, G80)
    pub motion_mode: MotionMode,
    /// Axis word distance mode (G90, G91)
    pub distance_mode: DistanceMode,
    /// Arc center distance mode (G90.1, G91.1)
    pub arc_distance_mode: DistanceMode,
    /// Current feed rate (F value)
    pub feed_rate: f64,
    /// Spindle direction and speed
    pub spindle: Spindle,
}

impl Default for ModalState {
    fn default() -> Self {
        Self {
            position: Position::default(),
            units: Units::Millimeters,
            plane: Plane::XY,
            motion_mode: MotionMode::None,
            distance_mode: DistanceMode::Absolute,
            arc_distance_mode: DistanceMode::Incremental,
            feed_rate: 0.0,
            spindle: Spindle::default(),
        }
    }
}

impl ModalState {
    /// Create a new modal state with power-on defaults
    pub fn new() -> Self {
        Self::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let state = ModalState::new();
        assert_eq!(state.units, Units::Millimeters);
        assert_eq!(state.plane, Plane::XY);
        assert_eq!(state.distance_mode, DistanceMode::Absolute);
        assert_eq!(state.arc_distance_mode, DistanceMode::Incremental);
        assert_eq!(state.spindle.direction, SpindleDirection::Off);
    }

    #[test]
    fn test_motion_mode_from_gcode() {
        assert_eq!(MotionMode::from_gcode(2.0), Some(MotionMode::ArcCw));
        assert_eq!(MotionMode::from_gcode(80.0), Some(MotionMode::None));
        assert_eq!(MotionMode::from_gcode(4.0), None);
        assert!(MotionMode::ArcCcw.is_arc());
        assert!(MotionMode::Rapid.is_straight());
    }

    #[test]
    fn test_plane_axes() {
        assert_eq!(Plane::XY.axes(), (Axis::X, Axis::Y, Axis::Z));
        assert_eq!(Plane::ZX.axes(), (Axis::Z, Axis::X, Axis::Y));
        assert_eq!(Plane::from_gcode(19.0), Some(Plane::YZ));
    }

    #[test]
    fn test_position_helpers() {
        let mut p = Position::new(1.0, 2.0, 3.0);
        p.set(Axis::Y, 5.0);
        assert_eq!(p.get(Axis::Y), 5.0);
        assert_eq!(Position::new(3.0, 4.0, 0.0).distance_to(&Position::default()), 5.0);
        let inches = Position::new(25.4, 50.8, 0.0).convert(Units::Millimeters, Units::Inches);
        assert_eq!(inches, Position::new(1.0, 2.0, 0.0));
    }
}
