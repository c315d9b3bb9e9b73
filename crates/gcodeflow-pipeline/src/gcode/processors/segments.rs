//! Serialization of generated motion segments
//!
//! Shared by the arc expander and the line splitter. Intermediate coordinates
//! are written with a fixed maximum precision; the writer remembers what it
//! has already emitted so rounding never accumulates and a segment that
//! rounds to no motion at all is reported instead of written. The final
//! segment lands on the programmed end point exactly.

use gcodeflow_core::{format_coordinate, Axis, DistanceMode, Position};

use crate::gcode::scanner::{ScannedLine, TokenKind};

pub(crate) struct SegmentWriter {
    distance: DistanceMode,
    precision: usize,
    origin: Position,
    /// Absolute mode: last emitted position as the controller will see it.
    /// Incremental mode: sum of emitted deltas.
    emitted: Position,
    /// Axes that at least one emitted segment has addressed
    touched: Vec<Axis>,
}

impl SegmentWriter {
    pub(crate) fn new(origin: Position, distance: DistanceMode, precision: usize) -> Self {
        let emitted = match distance {
            DistanceMode::Absolute => {
                let mut rounded = origin;
                for axis in Axis::ALL {
                    rounded.set(axis, round_to(origin.get(axis), precision));
                }
                rounded
            }
            DistanceMode::Incremental => Position::default(),
        };
        Self {
            distance,
            precision,
            origin,
            emitted,
            touched: Vec::with_capacity(3),
        }
    }

    /// Axis words moving to `target`, or `None` when the move rounds to nothing
    pub(crate) fn words(&mut self, target: &Position, axes: &[Axis]) -> Option<Vec<String>> {
        let mut words = Vec::with_capacity(axes.len());
        let mut next = self.emitted;

        for &axis in axes {
            let already = self.emitted.get(axis);
            let value = match self.distance {
                DistanceMode::Absolute => target.get(axis),
                DistanceMode::Incremental => target.get(axis) - self.origin.get(axis) - already,
            };
            let text = format_coordinate(value, self.precision);
            let rounded: f64 = text.parse().unwrap_or(value);

            let changed = match self.distance {
                DistanceMode::Absolute => rounded != already,
                DistanceMode::Incremental => rounded != 0.0,
            };
            if !changed {
                continue;
            }

            match self.distance {
                DistanceMode::Absolute => next.set(axis, rounded),
                DistanceMode::Incremental => next.set(axis, already + rounded),
            }
            words.push(format!("{}{}", axis.letter(), text));
        }

        self.commit(next, words, axes)
    }

    /// Axis words of the last segment, landing exactly on `end`
    ///
    /// In absolute mode an axis programmed on `line` keeps its literal text and
    /// any other axis is written at full precision. In incremental mode the
    /// remaining delta is written with at least as many decimals as the
    /// program used, so the deltas add up to the programmed displacement.
    pub(crate) fn finish(
        &mut self,
        line: &ScannedLine<'_>,
        end: &Position,
        axes: &[Axis],
    ) -> Option<Vec<String>> {
        let mut words = Vec::with_capacity(axes.len());
        let mut next = self.emitted;

        for &axis in axes {
            let literal = line.word(axis.letter()).map(|w| line.slice(&w.value_span));
            let value = end.get(axis);
            match self.distance {
                DistanceMode::Absolute => {
                    let current = if self.touched.contains(&axis) {
                        self.emitted.get(axis)
                    } else {
                        self.origin.get(axis)
                    };
                    if value == current {
                        continue;
                    }
                    let text = literal.map_or_else(|| exact_text(value), str::to_string);
                    next.set(axis, value);
                    words.push(format!("{}{}", axis.letter(), text));
                }
                DistanceMode::Incremental => {
                    let already = self.emitted.get(axis);
                    let places = literal.map_or(0, decimals).max(self.precision);
                    let text = format_coordinate(value - self.origin.get(axis) - already, places);
                    let delta: f64 = text.parse().unwrap_or(0.0);
                    if delta == 0.0 {
                        continue;
                    }
                    next.set(axis, already + delta);
                    words.push(format!("{}{}", axis.letter(), text));
                }
            }
        }

        self.commit(next, words, axes)
    }

    fn commit(&mut self, next: Position, words: Vec<String>, axes: &[Axis]) -> Option<Vec<String>> {
        if words.is_empty() {
            return None;
        }
        for &axis in axes {
            if next.get(axis) != self.emitted.get(axis) && !self.touched.contains(&axis) {
                self.touched.push(axis);
            }
        }
        self.emitted = next;
        Some(words)
    }
}

/// Shortest decimal text that parses back to `value`
fn exact_text(value: f64) -> String {
    let text = value.to_string();
    if text == "-0" {
        "0".to_string()
    } else {
        text
    }
}

/// Digits after the decimal point of a numeric literal
fn decimals(literal: &str) -> usize {
    literal.split_once('.').map_or(0, |(_, fraction)| fraction.len())
}

fn round_to(value: f64, precision: usize) -> f64 {
    format_coordinate(value, precision)
        .parse()
        .unwrap_or(value)
}

/// Words of a motion line that the generated segments do not re-create
///
/// Returns `(line_numbers, others)`: `N` words, which lead the first segment,
/// and every other word, comment or stray text in line order. Axis words,
/// arc parameters and G0-G3 are left out.
pub(crate) fn carried_words<'a>(
    line: &ScannedLine<'a>,
    is_generated: impl Fn(char, f64) -> bool,
) -> (Vec<&'a str>, Vec<&'a str>) {
    let mut numbers = Vec::new();
    let mut others = Vec::new();

    for token in line.tokens() {
        let text = line.slice(&token.span);
        match &token.kind {
            TokenKind::Whitespace => {}
            TokenKind::Word(word) if is_generated(word.letter, word.value) => {}
            TokenKind::Word(word) if word.letter == 'N' => numbers.push(text),
            _ => others.push(text.trim()),
        }
    }

    (numbers, others)
}

/// Join the parts of one segment with single spaces
pub(crate) fn assemble(numbers: &[&str], motion: &str, axes: &[String], others: &[&str]) -> String {
    let mut parts: Vec<&str> = Vec::with_capacity(numbers.len() + axes.len() + others.len() + 1);
    parts.extend_from_slice(numbers);
    parts.push(motion);
    parts.extend(axes.iter().map(String::as_str));
    parts.extend_from_slice(others);
    parts.join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_absolute_skips_unchanged_axes() {
        let mut writer =
            SegmentWriter::new(Position::new(0.0, 5.0, 0.0), DistanceMode::Absolute, 3);
        let words = writer
            .words(&Position::new(1.0, 5.0, 0.0), &[Axis::X, Axis::Y])
            .unwrap();
        assert_eq!(words, vec!["X1".to_string()]);
        assert!(writer
            .words(&Position::new(1.0001, 5.0, 0.0), &[Axis::X, Axis::Y])
            .is_none());
    }

    #[test]
    fn test_incremental_rounding_does_not_drift() {
        let mut writer = SegmentWriter::new(Position::default(), DistanceMode::Incremental, 1);
        let mut total = 0.0;
        for i in 1..=3 {
            let target = Position::new(i as f64 / 3.0, 0.0, 0.0);
            let words = writer.words(&target, &[Axis::X]).unwrap();
            total += words[0][1..].parse::<f64>().unwrap();
        }
        assert!((total - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_finish_keeps_programmed_literals() {
        let line = ScannedLine::scan("G1 X100.123456789 Y2 F900");
        let end = Position::new(100.123456789, 2.0, 0.0);
        let mut writer = SegmentWriter::new(Position::default(), DistanceMode::Absolute, 2);
        let words = writer.words(&Position::new(50.0617, 1.0, 0.0), &[Axis::X, Axis::Y]).unwrap();
        assert_eq!(words, vec!["X50.06".to_string(), "Y1".to_string()]);

        let words = writer.finish(&line, &end, &[Axis::X, Axis::Y, Axis::Z]).unwrap();
        assert_eq!(words, vec!["X100.123456789".to_string(), "Y2".to_string()]);
    }

    #[test]
    fn test_finish_returns_unprogrammed_axis_exactly() {
        // Full circle with no axis words: Y leaves 0.125 and must come back to it
        let line = ScannedLine::scan("G2 I-1");
        let start = Position::new(1.0, 0.125, 0.0);
        let mut writer = SegmentWriter::new(start, DistanceMode::Absolute, 1);
        writer.words(&Position::new(0.0, -0.875, 0.0), &[Axis::X, Axis::Y]).unwrap();

        let words = writer.finish(&line, &start, &[Axis::X, Axis::Y, Axis::Z]).unwrap();
        assert_eq!(words, vec!["X1".to_string(), "Y0.125".to_string()]);
    }

    #[test]
    fn test_finish_incremental_remainder_is_exact() {
        let line = ScannedLine::scan("G91 G1 X1.23456 Y-3");
        let end = Position::new(1.23456, -3.0, 0.0);
        let mut writer = SegmentWriter::new(Position::default(), DistanceMode::Incremental, 2);
        let first = writer.words(&Position::new(0.61728, -1.5, 0.0), &[Axis::X, Axis::Y]).unwrap();
        assert_eq!(first, vec!["X0.62".to_string(), "Y-1.5".to_string()]);

        let last = writer.finish(&line, &end, &[Axis::X, Axis::Y]).unwrap();
        assert_eq!(last, vec!["X0.61456".to_string(), "Y-1.5".to_string()]);
    }

    #[test]
    fn test_carried_words() {
        let line = ScannedLine::scan("N5 G1 X1 Y2 F300 M8 (note)");
        let (numbers, others) = carried_words(&line, |l, v| {
            matches!(l, 'X' | 'Y') || (l == 'G' && v == 1.0)
        });
        assert_eq!(numbers, vec!["N5"]);
        assert_eq!(others, vec!["F300", "M8", "(note)"]);
    }

    #[test]
    fn test_assemble() {
        let line = assemble(&["N5"], "G1", &["X1".to_string()], &["F300"]);
        assert_eq!(line, "N5 G1 X1 F300");
    }
}
