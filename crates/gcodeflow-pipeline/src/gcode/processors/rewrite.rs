//! In-place rewriters for numeric words

use gcodeflow_core::{format_coordinate, ConfigurationError, ModalState, ProcessError};

use crate::gcode::processor::{
    ArgumentKind, ArgumentSpec, CommandBatch, CommandProcessor, ProcessorArguments,
};
use crate::gcode::scanner::{ScannedLine, Word};

/// Letters whose value is a code or an identifier rather than a quantity
const CODE_LETTERS: [char; 5] = ['G', 'M', 'N', 'O', 'T'];

/// Truncates decimal places in numeric words
///
/// Limits decimal precision to reduce line length. Works on the text of each
/// literal, so values are truncated (never rounded) and nothing else on the
/// line moves: comments, spacing and word order are kept. G, M, N, O and T
/// words are codes and are left alone (`G90.1` stays `G90.1`).
#[derive(Debug, Clone)]
pub struct DecimalProcessor {
    precision: usize,
}

impl DecimalProcessor {
    pub const NAME: &'static str = "decimal";
    pub const DESCRIPTION: &'static str = "Truncates decimal places in numeric values";
    pub const MAX_PRECISION: usize = 10;
    pub const ARGUMENTS: &'static [ArgumentSpec] = &[ArgumentSpec::required(
        "precision",
        ArgumentKind::Integer,
        "Number of decimal places to keep (0 to 10)",
    )];

    pub fn new(precision: usize) -> Self {
        Self { precision }
    }

    pub fn from_arguments(args: &ProcessorArguments<'_>) -> Result<Self, ConfigurationError> {
        let precision = args.required_integer("precision")?;
        if precision > Self::MAX_PRECISION as u64 {
            return Err(args.invalid(
                "precision",
                format!("must be between 0 and {}", Self::MAX_PRECISION),
            ));
        }
        Ok(Self::new(precision as usize))
    }

    /// Truncated literal, or `None` when it already fits
    fn truncate(&self, literal: &str) -> Option<String> {
        let dot = literal.find('.')?;
        let decimals = literal.len() - dot - 1;
        if decimals <= self.precision {
            return None;
        }

        let cut = if self.precision == 0 {
            dot
        } else {
            dot + 1 + self.precision
        };
        let kept = &literal[..cut];
        if kept.bytes().any(|b| b.is_ascii_digit()) {
            Some(kept.to_string())
        } else {
            // "X.5" at precision 0, or "X-.5"
            Some("0".to_string())
        }
    }

    fn rewrite(&self, word: &Word, original: &str) -> Option<String> {
        if CODE_LETTERS.contains(&word.letter) {
            return None;
        }
        let split = word.value_span.start - word.span.start;
        let (letter, literal) = original.split_at(split);
        self.truncate(literal)
            .map(|literal| format!("{}{}", letter, literal))
    }
}

impl CommandProcessor for DecimalProcessor {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn describe(&self) -> &str {
        Self::DESCRIPTION
    }

    fn process(&self, command: &str, _state: &ModalState) -> Result<CommandBatch, ProcessError> {
        let scanned = ScannedLine::scan(command);
        Ok(vec![scanned.rewrite_words(|w, original| self.rewrite(w, original))])
    }
}

/// Replacement rule for F words
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FeedOverride {
    /// Every F word becomes this feed rate
    Fixed(f64),
    /// Every F word is multiplied by this factor
    Scale(f64),
}

/// Rewrites feed rates (F words) in place
///
/// Lines without an F word pass through untouched, so the override applies
/// to every feed the program sets explicitly.
#[derive(Debug, Clone)]
pub struct FeedOverrideProcessor {
    rule: FeedOverride,
}

impl FeedOverrideProcessor {
    pub const NAME: &'static str = "feed_override";
    pub const DESCRIPTION: &'static str = "Overrides feed rates in F commands";
    const PRECISION: usize = 3;
    pub const ARGUMENTS: &'static [ArgumentSpec] = &[
        ArgumentSpec {
            name: "speed",
            kind: ArgumentKind::Number,
            required: false,
            default: None,
            help: "Fixed feed rate replacing every F word (exclusive with scale)",
        },
        ArgumentSpec {
            name: "scale",
            kind: ArgumentKind::Number,
            required: false,
            default: None,
            help: "Factor applied to every F word (exclusive with speed)",
        },
    ];

    pub fn new(rule: FeedOverride) -> Self {
        Self { rule }
    }

    pub fn from_arguments(args: &ProcessorArguments<'_>) -> Result<Self, ConfigurationError> {
        let rule = match (args.number("speed")?, args.number("scale")?) {
            (Some(speed), None) if speed > 0.0 => FeedOverride::Fixed(speed),
            (Some(_), None) => return Err(args.invalid("speed", "must be greater than 0")),
            (None, Some(scale)) if scale > 0.0 => FeedOverride::Scale(scale),
            (None, Some(_)) => return Err(args.invalid("scale", "must be greater than 0")),
            (Some(_), Some(_)) => {
                return Err(args.invalid("scale", "give either speed or scale, not both"))
            }
            (None, None) => {
                return Err(ConfigurationError::MissingArgument {
                    stage: args.stage().to_string(),
                    argument: "speed or scale".to_string(),
                })
            }
        };
        Ok(Self::new(rule))
    }

    pub fn rule(&self) -> FeedOverride {
        self.rule
    }
}

impl CommandProcessor for FeedOverrideProcessor {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn describe(&self) -> &str {
        Self::DESCRIPTION
    }

    fn process(&self, command: &str, _state: &ModalState) -> Result<CommandBatch, ProcessError> {
        let scanned = ScannedLine::scan(command);
        if scanned.word('F').is_none() {
            return Ok(vec![command.to_string()]);
        }

        let rewritten = scanned.rewrite_words(|word, original| {
            if word.letter != 'F' {
                return None;
            }
            let feed = match self.rule {
                FeedOverride::Fixed(speed) => speed,
                FeedOverride::Scale(scale) => word.value * scale,
            };
            let letter = &original[..word.value_span.start - word.span.start];
            Some(format!("{}{}", letter, format_coordinate(feed, Self::PRECISION)))
        });
        Ok(vec![rewritten])
    }
}
