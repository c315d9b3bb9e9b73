//! Dwell insertion after spindle starts

use gcodeflow_core::{format_coordinate, ConfigurationError, ModalState, ProcessError};

use crate::gcode::processor::{
    ArgumentKind, ArgumentSpec, CommandBatch, CommandProcessor, ProcessorArguments,
};
use crate::gcode::scanner::ScannedLine;

/// Inserts a dwell after every spindle start
///
/// A line with an M3 or M4 word is followed by `G4 P<delay>` so the spindle
/// reaches speed before the next move. Matching uses the line scanner, so
/// `M30`, `M300` and M3 inside a comment do not trigger it.
#[derive(Debug, Clone)]
pub struct SpindleDelayProcessor {
    dwell: String,
}

impl SpindleDelayProcessor {
    pub const NAME: &'static str = "spindle_delay";
    pub const DESCRIPTION: &'static str = "Adds a dwell after spindle start commands";
    pub const ARGUMENTS: &'static [ArgumentSpec] = &[ArgumentSpec::required(
        "delay",
        ArgumentKind::Number,
        "Dwell after a spindle start, in seconds",
    )];

    /// Dwell is written in whole milliseconds
    pub const DWELL_PRECISION: usize = 3;

    /// Create a processor dwelling `delay` seconds; `delay` must be at least 1 ms
    pub fn new(delay: f64) -> Self {
        Self {
            dwell: format!("G4 P{}", format_coordinate(delay, Self::DWELL_PRECISION)),
        }
    }

    pub fn from_arguments(args: &ProcessorArguments<'_>) -> Result<Self, ConfigurationError> {
        let delay = args.required_number("delay")?;
        let written: f64 = format_coordinate(delay, Self::DWELL_PRECISION)
            .parse()
            .unwrap_or(0.0);
        if delay <= 0.0 || written <= 0.0 {
            return Err(args.invalid("delay", "must be at least 0.001 seconds"));
        }
        Ok(Self::new(delay))
    }

    /// The command inserted after a spindle start
    pub fn dwell(&self) -> &str {
        &self.dwell
    }
}

impl CommandProcessor for SpindleDelayProcessor {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn describe(&self) -> &str {
        Self::DESCRIPTION
    }

    fn process(&self, command: &str, _state: &ModalState) -> Result<CommandBatch, ProcessError> {
        let scanned = ScannedLine::scan(command);
        if scanned.has_code('M', 3.0) || scanned.has_code('M', 4.0) {
            Ok(vec![command.to_string(), self.dwell.clone()])
        } else {
            Ok(vec![command.to_string()])
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};
    use std::collections::BTreeMap;

    fn from_json(value: Value) -> Result<SpindleDelayProcessor, ConfigurationError> {
        let values: BTreeMap<String, Value> = serde_json::from_value(value).unwrap();
        let args = ProcessorArguments::new(
            SpindleDelayProcessor::NAME,
            &values,
            SpindleDelayProcessor::ARGUMENTS,
        )?;
        SpindleDelayProcessor::from_arguments(&args)
    }

    #[test]
    fn test_spindle_start_matching() {
        let p = SpindleDelayProcessor::new(2.0);
        let state = ModalState::default();
        for line in ["M3", "m3", "M3 S1000", "m3 S1000", "(ignored) M3 S1000", "M04 S200"] {
            assert_eq!(
                p.process(line, &state).unwrap(),
                vec![line.to_string(), "G4 P2".to_string()],
                "{line}"
            );
        }
        for line in ["M30", "M300", "anything else", "G0 X0 Y0 (comment mentioning M3)"] {
            assert_eq!(p.process(line, &state).unwrap(), vec![line.to_string()], "{line}");
        }
    }

    #[test]
    fn test_fractional_delay() {
        assert_eq!(SpindleDelayProcessor::new(0.25).dwell(), "G4 P0.25");
    }

    #[test]
    fn test_delay_that_writes_as_zero_rejected() {
        let err = from_json(json!({"delay": 0.0004})).unwrap_err();
        assert!(matches!(
            err,
            ConfigurationError::InvalidArgument { ref argument, .. } if argument == "delay"
        ));
        assert!(from_json(json!({"delay": -1.0})).is_err());
        assert_eq!(from_json(json!({"delay": 0.001})).unwrap().dwell(), "G4 P0.001");
    }
}
