//! Move resolution
//!
//! Combines a scanned line with the modal state in effect when it executes to
//! answer "which modes apply to this line" and "where does this move start and
//! end". Words on the line override the modal state; the state itself is never
//! modified here.

use gcodeflow_core::{Axis, DistanceMode, ModalState, MotionMode, Plane, Position, Units};

use super::scanner::ScannedLine;

/// Non-modal G-codes whose axis words are not a move to a new position
const NON_MOTION_GCODES: [f64; 7] = [4.0, 10.0, 28.0, 30.0, 53.0, 92.0, 92.1];

/// Modes in effect for one line
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LineModes {
    pub motion: MotionMode,
    pub plane: Plane,
    pub units: Units,
    pub distance: DistanceMode,
    pub arc_distance: DistanceMode,
    /// The line carries a G-code such as G4 or G92 that consumes axis words
    pub non_motion: bool,
}

impl LineModes {
    /// Modal state overridden by the G-codes present on `line`
    pub fn resolve(line: &ScannedLine<'_>, state: &ModalState) -> Self {
        let mut modes = LineModes {
            motion: state.motion_mode,
            plane: state.plane,
            units: state.units,
            distance: state.distance_mode,
            arc_distance: state.arc_distance_mode,
            non_motion: false,
        };

        for word in line.words().filter(|w| w.letter == 'G') {
            let code = word.value;
            if let Some(mode) = MotionMode::from_gcode(code) {
                modes.motion = mode;
            } else if let Some(plane) = Plane::from_gcode(code) {
                modes.plane = plane;
            } else if code == 20.0 {
                modes.units = Units::Inches;
            } else if code == 21.0 {
                modes.units = Units::Millimeters;
            } else if code == 90.0 {
                modes.distance = DistanceMode::Absolute;
            } else if code == 91.0 {
                modes.distance = DistanceMode::Incremental;
            } else if code == 90.1 {
                modes.arc_distance = DistanceMode::Absolute;
            } else if code == 91.1 {
                modes.arc_distance = DistanceMode::Incremental;
            } else if NON_MOTION_GCODES.contains(&code) {
                modes.non_motion = true;
            }
        }

        modes
    }
}

/// A resolved move: where it starts, where it ends, and under which modes
#[derive(Debug, Clone, PartialEq)]
pub struct Move {
    pub modes: LineModes,
    /// Start point, in the line's units
    pub start: Position,
    /// End point, in the line's units
    pub end: Position,
    /// Axes that have a word on the line
    pub axes: Vec<Axis>,
}

impl Move {
    /// Resolve the move a line performs, if any
    ///
    /// Returns `None` when the line has no axis words, no active motion mode,
    /// or its axis words belong to a non-motion command.
    pub fn resolve(line: &ScannedLine<'_>, state: &ModalState) -> Option<Self> {
        let modes = LineModes::resolve(line, state);
        if modes.non_motion || modes.motion == MotionMode::None {
            return None;
        }

        let axes: Vec<Axis> = Axis::ALL
            .into_iter()
            .filter(|axis| line.word(axis.letter()).is_some())
            .collect();
        if axes.is_empty() {
            return None;
        }

        let start = state.position.convert(state.units, modes.units);
        let mut end = start;
        for &axis in &axes {
            let value = line.value(axis.letter()).unwrap_or_default();
            let target = match modes.distance {
                DistanceMode::Absolute => value,
                DistanceMode::Incremental => start.get(axis) + value,
            };
            end.set(axis, target);
        }

        Some(Self {
            modes,
            start,
            end,
            axes,
        })
    }

    /// Straight-line length of the move
    pub fn length(&self) -> f64 {
        self.start.distance_to(&self.end)
    }

    /// True when the end point equals the start point
    pub fn is_zero_length(&self) -> bool {
        self.length() <= f64::EPSILON * self.start.distance_to(&Position::default()).max(1.0)
    }
}

/// True when the letter addresses a linear axis or an arc parameter
pub fn is_geometry_letter(letter: char) -> bool {
    matches!(letter, 'X' | 'Y' | 'Z' | 'I' | 'J' | 'K' | 'R')
}

/// True for G0, G1, G2 and G3, the words the geometric stages re-emit themselves
pub fn is_motion_gcode(letter: char, value: f64) -> bool {
    letter == 'G' && MotionMode::from_gcode(value).is_some_and(|m| m != MotionMode::None)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolve(line: &str, state: &ModalState) -> Option<Move> {
        Move::resolve(&ScannedLine::scan(line), state)
    }

    #[test]
    fn test_line_overrides_state() {
        let state = ModalState::new();
        let modes = LineModes::resolve(&ScannedLine::scan("G91 G18 G20 G2"), &state);
        assert_eq!(modes.distance, DistanceMode::Incremental);
        assert_eq!(modes.plane, Plane::ZX);
        assert_eq!(modes.units, Units::Inches);
        assert_eq!(modes.motion, MotionMode::ArcCw);
    }

    #[test]
    fn test_absolute_move() {
        let mut state = ModalState::new();
        state.position = Position::new(1.0, 2.0, 3.0);
        let mv = resolve("G1 X10", &state).unwrap();
        assert_eq!(mv.start, Position::new(1.0, 2.0, 3.0));
        assert_eq!(mv.end, Position::new(10.0, 2.0, 3.0));
        assert_eq!(mv.axes, vec![Axis::X]);
    }

    #[test]
    fn test_incremental_move() {
        let mut state = ModalState::new();
        state.position = Position::new(1.0, 1.0, 0.0);
        state.distance_mode = DistanceMode::Incremental;
        let mv = resolve("G1 X2 Y-1", &state).unwrap();
        assert_eq!(mv.end, Position::new(3.0, 0.0, 0.0));
    }

    #[test]
    fn test_modal_motion_without_g_word() {
        let mut state = ModalState::new();
        state.motion_mode = MotionMode::Linear;
        assert!(resolve("X5", &state).is_some());
        assert!(resolve("X5", &ModalState::new()).is_none());
    }

    #[test]
    fn test_non_motion_commands() {
        let mut state = ModalState::new();
        state.motion_mode = MotionMode::Linear;
        assert!(resolve("G92 X0 Y0", &state).is_none());
        assert!(resolve("G4 P1", &state).is_none());
        assert!(resolve("M3 S1000", &state).is_none());
    }

    #[test]
    fn test_unit_switch_converts_start() {
        let mut state = ModalState::new();
        state.motion_mode = MotionMode::Linear;
        state.position = Position::new(25.4, 0.0, 0.0);
        let mv = resolve("G20 Y1", &state).unwrap();
        assert!((mv.start.x - 1.0).abs() < 1e-12);
        assert!((mv.end.y - 1.0).abs() < 1e-12);
    }
}
