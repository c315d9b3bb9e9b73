//! Arc expansion
//!
//! Converts G2/G3 moves into G1 segments for controllers without circular
//! interpolation, or to get a uniform toolpath for other stages.
//!
//! The segment count is chosen from the maximum chord deviation: a chord that
//! spans an angle `a` of a circle of radius `r` deviates from the arc by
//! `r·(1 − cos(a/2))`, so every segment may span at most `2·acos(1 − tol/r)`.

use std::f64::consts::TAU;

use gcodeflow_core::{
    Axis, ConfigurationError, DistanceMode, ModalState, MotionMode, Position, ProcessError,
};

use super::segments::{assemble, carried_words, SegmentWriter};
use crate::gcode::motion::{is_geometry_letter, is_motion_gcode, LineModes, Move};
use crate::gcode::processor::{
    ArgumentKind, ArgumentSpec, CommandBatch, CommandProcessor, ProcessorArguments,
};
use crate::gcode::scanner::ScannedLine;

/// Upper bound on generated segments for one arc
pub const MAX_ARC_SEGMENTS: usize = 100_000;

/// Lengths below this are treated as zero
const GEOMETRY_EPSILON: f64 = 1e-9;

/// Relative slack allowed when an R word is a hair short of half the chord
const RADIUS_SLACK: f64 = 1e-6;

/// Below this ratio `acos(1 - x)` is replaced by its series `sqrt(2x)`, which
/// does not lose the small angle to rounding in `1 - x`
const SMALL_RATIO: f64 = 1e-6;

/// Number of chords needed to follow an arc within `tolerance`
///
/// `sweep` is the swept angle in radians. Non-positive or non-finite inputs
/// give a single segment; the result never exceeds [`MAX_ARC_SEGMENTS`] and
/// never decreases as `tolerance` shrinks.
pub fn segment_count(sweep: f64, radius: f64, tolerance: f64) -> usize {
    if !(sweep > 0.0 && radius > 0.0 && tolerance > 0.0) {
        return 1;
    }

    let ratio = tolerance / radius;
    let half_angle = if ratio < SMALL_RATIO {
        (2.0 * ratio).sqrt()
    } else {
        (1.0 - ratio).clamp(-1.0, 1.0).acos()
    };

    let count = (sweep / (2.0 * half_angle)).ceil();
    if count.is_finite() && count < MAX_ARC_SEGMENTS as f64 {
        (count as usize).max(1)
    } else {
        MAX_ARC_SEGMENTS
    }
}

/// Expands G2/G3 arcs into linear G1 segments
///
/// Works in the plane selected by G17/G18/G19 and interpolates the third
/// axis for helical moves. Feed rate and every other non-motion word stay on
/// the first segment.
#[derive(Debug, Clone)]
pub struct ArcExpander {
    tolerance: f64,
    precision: usize,
}

impl ArcExpander {
    pub const NAME: &'static str = "arc_expander";
    pub const DESCRIPTION: &'static str = "Expands arc commands (G2/G3) into line segments";
    pub const DEFAULT_TOLERANCE: f64 = 0.01;
    pub const DEFAULT_PRECISION: usize = 4;
    pub const MAX_PRECISION: usize = 8;
    pub const ARGUMENTS: &'static [ArgumentSpec] = &[
        ArgumentSpec::optional(
            "tolerance",
            ArgumentKind::Number,
            "0.01",
            "Maximum chord deviation from the true arc, in program units",
        ),
        ArgumentSpec::optional(
            "precision",
            ArgumentKind::Integer,
            "4",
            "Decimal places written for generated coordinates (0 to 8)",
        ),
    ];

    pub fn new(tolerance: f64, precision: usize) -> Self {
        Self {
            tolerance,
            precision,
        }
    }

    pub fn from_arguments(args: &ProcessorArguments<'_>) -> Result<Self, ConfigurationError> {
        let tolerance = args
            .number("tolerance")?
            .unwrap_or(Self::DEFAULT_TOLERANCE);
        if tolerance <= 0.0 {
            return Err(args.invalid("tolerance", "must be greater than 0"));
        }

        let precision = match args.integer("precision")? {
            None => Self::DEFAULT_PRECISION,
            Some(p) if p <= Self::MAX_PRECISION as u64 => p as usize,
            Some(_) => {
                return Err(args.invalid(
                    "precision",
                    format!("must be between 0 and {}", Self::MAX_PRECISION),
                ))
            }
        };

        Ok(Self::new(tolerance, precision))
    }

    pub fn tolerance(&self) -> f64 {
        self.tolerance
    }

    /// Arc center in plane coordinates, `None` for a degenerate R arc
    fn center(
        &self,
        line: &ScannedLine<'_>,
        mv: &Move,
        plane: (Axis, Axis),
    ) -> Result<Option<(f64, f64)>, ProcessError> {
        let (a0, a1) = plane;
        let start = (mv.start.get(a0), mv.start.get(a1));
        let end = (mv.end.get(a0), mv.end.get(a1));

        if let Some(radius) = line.value('R') {
            let x = end.0 - start.0;
            let y = end.1 - start.1;
            let chord = x.hypot(y);
            if radius.abs() <= GEOMETRY_EPSILON || chord <= GEOMETRY_EPSILON {
                return Ok(None);
            }

            let diameter_sq = 4.0 * radius * radius;
            let mut h = diameter_sq - chord * chord;
            if h < 0.0 {
                if h < -RADIUS_SLACK * diameter_sq {
                    return Err(ProcessError::new(
                        line.text(),
                        format!(
                            "arc radius {} is smaller than half the distance between its end points ({})",
                            radius.abs(),
                            chord / 2.0
                        ),
                    ));
                }
                h = 0.0;
            }

            // Offset of the center from the chord midpoint, perpendicular to
            // the chord. Positive R takes the shorter arc.
            let mut offset = -h.sqrt() / chord;
            if mv.modes.motion == MotionMode::ArcCcw {
                offset = -offset;
            }
            if radius < 0.0 {
                offset = -offset;
            }

            return Ok(Some((
                start.0 + 0.5 * (x - y * offset),
                start.1 + 0.5 * (y + x * offset),
            )));
        }

        let i = line.value(a0.offset_letter());
        let j = line.value(a1.offset_letter());
        if i.is_none() && j.is_none() {
            return Err(ProcessError::new(
                line.text(),
                format!(
                    "arc has no center: expected {}/{} offsets or an R word",
                    a0.offset_letter(),
                    a1.offset_letter()
                ),
            ));
        }

        match mv.modes.arc_distance {
            DistanceMode::Incremental => Ok(Some((
                start.0 + i.unwrap_or(0.0),
                start.1 + j.unwrap_or(0.0),
            ))),
            DistanceMode::Absolute => match (i, j) {
                (Some(c0), Some(c1)) => Ok(Some((c0, c1))),
                _ => Err(ProcessError::new(
                    line.text(),
                    "absolute arc centers (G90.1) need both center coordinates",
                )),
            },
        }
    }

    /// Segment lines for one arc, `None` when the arc is degenerate
    fn expand(
        &self,
        line: &ScannedLine<'_>,
        mv: &Move,
    ) -> Result<Option<CommandBatch>, ProcessError> {
        if line.value('P').is_some_and(|turns| turns != 1.0) {
            return Err(ProcessError::new(
                line.text(),
                "arcs with more than one turn (P word) cannot be expanded",
            ));
        }

        let (a0, a1, linear) = mv.modes.plane.axes();
        let center = match self.center(line, mv, (a0, a1))? {
            Some(center) => center,
            None => return Ok(None),
        };

        let from = (mv.start.get(a0) - center.0, mv.start.get(a1) - center.1);
        let to = (mv.end.get(a0) - center.0, mv.end.get(a1) - center.1);
        let start_radius = from.0.hypot(from.1);
        let end_radius = to.0.hypot(to.1);
        if start_radius <= GEOMETRY_EPSILON || end_radius <= GEOMETRY_EPSILON {
            return Ok(None);
        }

        let clockwise = mv.modes.motion == MotionMode::ArcCw;
        let chord = (to.0 - from.0).hypot(to.1 - from.1);
        let sweep = if chord <= GEOMETRY_EPSILON {
            TAU
        } else {
            // Counter-clockwise angle from the start vector to the end vector
            let angle = (from.0 * to.1 - from.1 * to.0).atan2(from.0 * to.0 + from.1 * to.1);
            if angle.abs() <= GEOMETRY_EPSILON {
                return Ok(None);
            }
            let sweep = if clockwise { -angle } else { angle };
            if sweep <= 0.0 {
                sweep + TAU
            } else {
                sweep
            }
        };

        let count = segment_count(sweep, start_radius.max(end_radius), self.tolerance);
        let start_angle = from.1.atan2(from.0);
        let direction = if clockwise { -1.0 } else { 1.0 };
        let rise = mv.end.get(linear) - mv.start.get(linear);
        let axes = [a0, a1, linear];

        let mut writer = SegmentWriter::new(mv.start, mv.modes.distance, self.precision);
        let mut segments = Vec::with_capacity(count);
        for step in 1..count {
            let t = step as f64 / count as f64;
            let angle = start_angle + direction * sweep * t;
            let radius = start_radius + (end_radius - start_radius) * t;
            let mut point = mv.start;
            point.set(a0, center.0 + radius * angle.cos());
            point.set(a1, center.1 + radius * angle.sin());
            point.set(linear, mv.start.get(linear) + rise * t);
            if let Some(words) = writer.words(&point, &axes) {
                segments.push(words);
            }
        }
        if let Some(words) = writer.finish(line, &mv.end, &axes) {
            segments.push(words);
        }

        if segments.is_empty() {
            return Ok(None);
        }

        let (numbers, others) = carried_words(line, |letter, value| {
            is_geometry_letter(letter) || letter == 'P' || is_motion_gcode(letter, value)
        });
        let lines = segments
            .iter()
            .enumerate()
            .map(|(i, words)| {
                if i == 0 {
                    assemble(&numbers, "G1", words, &others)
                } else {
                    assemble(&[], "G1", words, &[])
                }
            })
            .collect();

        Ok(Some(lines))
    }
}

impl Default for ArcExpander {
    fn default() -> Self {
        Self::new(Self::DEFAULT_TOLERANCE, Self::DEFAULT_PRECISION)
    }
}

/// Resolve an arc move, including full circles written without axis words
fn resolve_arc(line: &ScannedLine<'_>, state: &ModalState) -> Option<Move> {
    let modes = LineModes::resolve(line, state);
    if modes.non_motion || !modes.motion.is_arc() {
        return None;
    }
    if let Some(mv) = Move::resolve(line, state) {
        return Some(mv);
    }

    let (a0, a1, _) = modes.plane.axes();
    let has_center = line.word('R').is_some()
        || line.word(a0.offset_letter()).is_some()
        || line.word(a1.offset_letter()).is_some();
    if !has_center {
        return None;
    }

    let start: Position = state.position.convert(state.units, modes.units);
    Some(Move {
        modes,
        start,
        end: start,
        axes: Vec::new(),
    })
}

impl CommandProcessor for ArcExpander {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn describe(&self) -> &str {
        Self::DESCRIPTION
    }

    fn process(&self, command: &str, state: &ModalState) -> Result<CommandBatch, ProcessError> {
        let scanned = ScannedLine::scan(command);
        let mv = match resolve_arc(&scanned, state) {
            Some(mv) => mv,
            None => return Ok(vec![command.to_string()]),
        };

        match self.expand(&scanned, &mv)? {
            Some(lines) => Ok(lines),
            None => Ok(vec![with_motion_code(&scanned, &mv)]),
        }
    }
}

/// The line as written, with its arc code restored when it relied on modal state
///
/// Expanded arcs leave the controller in G1, so a later arc that is passed
/// through unchanged must name its own motion.
fn with_motion_code(line: &ScannedLine<'_>, mv: &Move) -> String {
    let text = line.text();
    let code = match mv.modes.motion.gcode() {
        Some(code) if !line.words().any(|w| is_motion_gcode(w.letter, w.value)) => code,
        _ => return text.to_string(),
    };

    match line.words().next() {
        Some(first) if first.letter == 'N' => {
            let (number, rest) = text.split_at(first.span.end);
            format!("{} {} {}", number, code, rest.trim_start())
        }
        _ => format!("{} {}", code, text),
    }
}
