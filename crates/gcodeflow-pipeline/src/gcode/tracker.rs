//! Modal state tracking
//!
//! The [`StateTracker`] owns the session's [`ModalState`] and commits each
//! original input line exactly once, after every stage has seen it. How a
//! line changes the state is decided by a [`StateInterpreter`], the upstream
//! collaborator; [`BasicInterpreter`] covers the modal groups the stages rely
//! on.

use gcodeflow_core::{ModalState, Position, SpindleDirection, Units};

use super::motion::{LineModes, Move};
use super::scanner::ScannedLine;

/// Computes the modal state after a line executes
pub trait StateInterpreter: Send + Sync {
    /// Return the state that results from executing `line` in `state`
    fn apply(&self, state: &ModalState, line: &str) -> ModalState;
}

/// Interpreter for motion, plane, units, distance, feed and spindle words
///
/// Handles G0-G3, G80, G17-G19, G20/G21, G90/G91, G90.1/G91.1, X/Y/Z, F, S
/// and M3/M4/M5. Anything else leaves the state untouched.
#[derive(Debug, Clone, Copy, Default)]
pub struct BasicInterpreter;

impl StateInterpreter for BasicInterpreter {
    fn apply(&self, state: &ModalState, line: &str) -> ModalState {
        let scanned = ScannedLine::scan(line);
        let modes = LineModes::resolve(&scanned, state);
        let mut next = *state;

        // The end point is computed before the modal fields change so it is
        // expressed in the units the line itself uses.
        let end = Move::resolve(&scanned, state).map(|mv| mv.end);

        if modes.units != state.units {
            next.position = state.position.convert(state.units, modes.units);
        }
        next.units = modes.units;
        next.plane = modes.plane;
        next.motion_mode = modes.motion;
        next.distance_mode = modes.distance;
        next.arc_distance_mode = modes.arc_distance;

        if let Some(end) = end {
            next.position = end;
        }

        if let Some(feed) = scanned.value('F') {
            if feed >= 0.0 {
                next.feed_rate = feed;
            }
        }

        if let Some(speed) = scanned.value('S') {
            if speed >= 0.0 {
                next.spindle.speed = speed;
            }
        }

        for word in scanned.words().filter(|w| w.letter == 'M') {
            if word.value == 3.0 {
                next.spindle.direction = SpindleDirection::Cw;
            } else if word.value == 4.0 {
                next.spindle.direction = SpindleDirection::Ccw;
            } else if word.value == 5.0 {
                next.spindle.direction = SpindleDirection::Off;
            }
        }

        next
    }
}

/// Owner of a session's modal state
pub struct StateTracker {
    state: ModalState,
    interpreter: Box<dyn StateInterpreter>,
    committed: usize,
}

impl StateTracker {
    /// Create a tracker with power-on defaults and the basic interpreter
    pub fn new() -> Self {
        Self::with_interpreter(ModalState::default(), Box::new(BasicInterpreter))
    }

    /// Create a tracker from an explicit initial state and interpreter
    pub fn with_interpreter(state: ModalState, interpreter: Box<dyn StateInterpreter>) -> Self {
        Self {
            state,
            interpreter,
            committed: 0,
        }
    }

    /// The state the next line will execute in
    pub fn state(&self) -> &ModalState {
        &self.state
    }

    pub fn interpreter(&self) -> &dyn StateInterpreter {
        self.interpreter.as_ref()
    }

    /// Number of lines committed so far
    pub fn committed_lines(&self) -> usize {
        self.committed
    }

    /// Commit the effect of one original input line
    pub fn commit(&mut self, line: &str) {
        self.state = self.interpreter.apply(&self.state, line);
        self.committed += 1;
    }

    /// Current position converted to the requested units
    pub fn position_in(&self, units: Units) -> Position {
        self.state.position.convert(self.state.units, units)
    }
}

impl Default for StateTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for StateTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StateTracker")
            .field("state", &self.state)
            .field("committed", &self.committed)
            .finish()
    }
}
