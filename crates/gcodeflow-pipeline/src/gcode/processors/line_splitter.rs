//! Length-bounded splitting of straight moves
//!
//! Some controllers accept only short lines. A G0/G1 move whose text is too
//! long is replaced by several moves along the same straight path, each short
//! enough to send.

use gcodeflow_core::{ConfigurationError, ModalState, ProcessError};

use super::segments::{assemble, carried_words, SegmentWriter};
use crate::gcode::motion::{is_motion_gcode, Move};
use crate::gcode::processor::{
    ArgumentKind, ArgumentSpec, CommandBatch, CommandProcessor, ProcessorArguments,
};
use crate::gcode::scanner::ScannedLine;

/// Splits long linear moves into shorter lines
///
/// Segment count is the smallest `n >= 2` for which every generated line fits
/// in `max_length` characters. Words that are not part of the motion (feed,
/// spindle, other codes, comments) are written once, on the first segment.
/// The last segment carries the programmed end point as written, so a move
/// whose coordinates alone are too long cannot be split.
#[derive(Debug, Clone)]
pub struct LineSplitter {
    max_length: usize,
    precision: usize,
    max_segments: usize,
}

impl LineSplitter {
    pub const NAME: &'static str = "line_splitter";
    pub const DESCRIPTION: &'static str = "Splits long linear moves into shorter segments";
    pub const MIN_LENGTH: usize = 8;
    pub const DEFAULT_PRECISION: usize = 4;
    pub const MAX_PRECISION: usize = 8;
    pub const DEFAULT_MAX_SEGMENTS: usize = 64;
    pub const ARGUMENTS: &'static [ArgumentSpec] = &[
        ArgumentSpec::required(
            "max_length",
            ArgumentKind::Integer,
            "Maximum line length in characters (at least 8)",
        ),
        ArgumentSpec::optional(
            "precision",
            ArgumentKind::Integer,
            "4",
            "Decimal places written for generated coordinates (0 to 8)",
        ),
        ArgumentSpec::optional(
            "max_segments",
            ArgumentKind::Integer,
            "64",
            "Largest number of segments tried before giving up (at least 2)",
        ),
    ];

    pub fn new(max_length: usize, precision: usize, max_segments: usize) -> Self {
        Self {
            max_length,
            precision,
            max_segments,
        }
    }

    pub fn from_arguments(args: &ProcessorArguments<'_>) -> Result<Self, ConfigurationError> {
        let max_length = args.required_integer("max_length")?;
        if max_length < Self::MIN_LENGTH as u64 {
            return Err(args.invalid(
                "max_length",
                format!("must be at least {}", Self::MIN_LENGTH),
            ));
        }

        let precision = args
            .integer("precision")?
            .unwrap_or(Self::DEFAULT_PRECISION as u64);
        if precision > Self::MAX_PRECISION as u64 {
            return Err(args.invalid(
                "precision",
                format!("must be between 0 and {}", Self::MAX_PRECISION),
            ));
        }

        let max_segments = args
            .integer("max_segments")?
            .unwrap_or(Self::DEFAULT_MAX_SEGMENTS as u64);
        if max_segments < 2 {
            return Err(args.invalid("max_segments", "must be at least 2"));
        }

        let max_length = usize::try_from(max_length)
            .map_err(|_| args.invalid("max_length", "value is too large"))?;
        let max_segments = usize::try_from(max_segments)
            .map_err(|_| args.invalid("max_segments", "value is too large"))?;

        Ok(Self::new(max_length, precision as usize, max_segments))
    }

    pub fn max_length(&self) -> usize {
        self.max_length
    }

    fn fits(&self, line: &str) -> bool {
        line.chars().count() <= self.max_length
    }

    /// Split into exactly `count` segments
    ///
    /// Returns `None` when some segment rounds to no motion, in which case a
    /// finer split can only be worse.
    fn split(&self, line: &ScannedLine<'_>, mv: &Move, count: usize) -> Option<CommandBatch> {
        let motion = mv.modes.motion.gcode().unwrap_or("G1");
        let (numbers, others) = carried_words(line, |letter, value| {
            matches!(letter, 'X' | 'Y' | 'Z') || is_motion_gcode(letter, value)
        });

        let mut writer = SegmentWriter::new(mv.start, mv.modes.distance, self.precision);
        let mut segments = Vec::with_capacity(count);
        for step in 1..=count {
            let t = step as f64 / count as f64;
            let mut target = mv.start;
            for &axis in &mv.axes {
                let from = mv.start.get(axis);
                target.set(axis, from + (mv.end.get(axis) - from) * t);
            }

            let words = if step == count {
                match writer.finish(line, &mv.end, &mv.axes) {
                    Some(words) => words,
                    None => break,
                }
            } else {
                writer.words(&target, &mv.axes)?
            };
            let segment = if step == 1 {
                assemble(&numbers, motion, &words, &others)
            } else {
                assemble(&[], motion, &words, &[])
            };
            segments.push(segment);
        }
        Some(segments)
    }
}

impl CommandProcessor for LineSplitter {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn describe(&self) -> &str {
        Self::DESCRIPTION
    }

    fn process(&self, command: &str, state: &ModalState) -> Result<CommandBatch, ProcessError> {
        if self.fits(command) {
            return Ok(vec![command.to_string()]);
        }

        let scanned = ScannedLine::scan(command);
        let mv = match Move::resolve(&scanned, state) {
            Some(mv) if mv.modes.motion.is_straight() && !mv.is_zero_length() => mv,
            _ => return Ok(vec![command.to_string()]),
        };

        for count in 2..=self.max_segments {
            match self.split(&scanned, &mv, count) {
                None => return Ok(vec![command.to_string()]),
                Some(segments) if segments.iter().all(|s| self.fits(s)) => return Ok(segments),
                Some(_) => {}
            }
        }

        Err(ProcessError::new(
            command,
            format!(
                "cannot split into lines of at most {} characters with up to {} segments",
                self.max_length, self.max_segments
            ),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gcodeflow_core::{Axis, DistanceMode, MotionMode, Position};

    fn linear_state() -> ModalState {
        let mut state = ModalState::default();
        state.motion_mode = MotionMode::Linear;
        state
    }

    fn end_point(lines: &[String], start: Position, incremental: bool) -> Position {
        let mut current = start;
        for line in lines {
            let scanned = ScannedLine::scan(line);
            for axis in Axis::ALL {
                if let Some(v) = scanned.value(axis.letter()) {
                    let next = if incremental { current.get(axis) + v } else { v };
                    current.set(axis, next);
                }
            }
        }
        current
    }

    #[test]
    fn test_short_line_unchanged() {
        let splitter = LineSplitter::new(20, 4, 64);
        let line = "G1 X10 Y10";
        assert_eq!(splitter.process(line, &linear_state()).unwrap(), vec![line]);
    }

    #[test]
    fn test_last_segment_keeps_programmed_end_point() {
        let splitter = LineSplitter::new(28, 4, 64);
        let line = "G1 X100.12346 Y200.98762 F1500";
        let lines = splitter.process(line, &linear_state()).unwrap();

        assert_eq!(
            lines,
            vec!["G1 X50.0617 Y100.4938 F1500", "G1 X100.12346 Y200.98762"]
        );
        let end = end_point(&lines, Position::default(), false);
        assert_eq!(end, Position::new(100.12346, 200.98762, 0.0));
    }

    #[test]
    fn test_splits_into_smallest_fitting_count() {
        let splitter = LineSplitter::new(25, 2, 64);
        let line = "G1 X100.125 Y200.5 F1500 M8";
        let lines = splitter.process(line, &linear_state()).unwrap();

        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("G1 X33.3"));
        assert!(lines[0].ends_with(" Y66.83 F1500 M8"));
        assert_eq!(lines[1], "G1 X66.75 Y133.67");
        assert_eq!(lines[2], "G1 X100.125 Y200.5");
        assert!(lines.iter().all(|l| l.len() <= 25));
    }

    #[test]
    fn test_end_point_too_long_to_write_is_error() {
        let splitter = LineSplitter::new(30, 4, 64);
        let err = splitter
            .process("G1 X100.123456789 Y200.987654321 F1500", &linear_state())
            .unwrap_err();
        assert!(err.cause.contains("30 characters"));
    }

    #[test]
    fn test_non_motion_words_on_first_segment_only() {
        let splitter = LineSplitter::new(24, 3, 64);
        let line = "N10 G1 X40.5 Y40.5 F900 M8";
        let lines = splitter.process(line, &linear_state()).unwrap();
        assert!(lines.len() >= 2);
        assert!(lines[0].starts_with("N10 G1 "));
        assert!(lines[0].contains("F900"));
        for l in &lines[1..] {
            assert!(!l.contains('F') && !l.contains('M') && !l.contains('N'));
        }
    }

    #[test]
    fn test_displacement_preserved_incremental() {
        let splitter = LineSplitter::new(14, 4, 64);
        let mut state = linear_state();
        state.distance_mode = DistanceMode::Incremental;
        state.position = Position::new(5.0, 5.0, 0.0);
        let lines = splitter.process("G1 X10 Y-3.3333", &state).unwrap();
        assert_eq!(lines.len(), 2);
        assert!(lines.iter().all(|l| l.len() <= 14));
        let end = end_point(&lines, state.position, true);
        assert!((end.x - 15.0).abs() < 1e-9);
        assert!((end.y - 1.6667).abs() < 1e-9);
    }

    #[test]
    fn test_zero_length_move_unchanged() {
        let splitter = LineSplitter::new(10, 4, 64);
        let mut state = linear_state();
        state.position = Position::new(12.5, 7.25, 0.0);
        let line = "G1 X12.5 Y7.25 F100";
        assert_eq!(splitter.process(line, &state).unwrap(), vec![line]);
    }

    #[test]
    fn test_rounding_to_zero_returns_original() {
        let splitter = LineSplitter::new(10, 0, 64);
        let line = "G1 X0.2 (tiny move)";
        assert_eq!(splitter.process(line, &linear_state()).unwrap(), vec![line]);
    }

    #[test]
    fn test_non_move_lines_unchanged() {
        let splitter = LineSplitter::new(8, 4, 64);
        let state = linear_state();
        for line in ["(a long comment line)", "G92 X100 Y100 Z100", "G2 X10 Y10 I5 J5"] {
            assert_eq!(splitter.process(line, &state).unwrap(), vec![line]);
        }
    }

    #[test]
    fn test_unsplittable_is_error() {
        let splitter = LineSplitter::new(10, 4, 8);
        let err = splitter
            .process("G1 X10 (comment that never fits)", &linear_state())
            .unwrap_err();
        assert!(err.cause.contains("10 characters"));
    }
}
