//! Textual filters and validators

use gcodeflow_core::{ConfigurationError, ModalState, ProcessError};
use regex::Regex;

use super::keep_unless_blank;
use crate::gcode::processor::{
    ArgumentKind, ArgumentSpec, CommandBatch, CommandProcessor, ProcessorArguments,
};
use crate::gcode::scanner::{ScannedLine, TokenKind};

// ============================================================================
// Whitespace
// ============================================================================

/// How the whitespace stage treats a line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WhitespaceMode {
    /// Remove every whitespace run outside comments
    #[default]
    All,
    /// Only trim both ends
    Trim,
}

/// Removes whitespace from G-code commands
///
/// Whitespace inside comments is never touched. A line that ends up empty is
/// dropped.
#[derive(Debug, Clone, Default)]
pub struct WhitespaceProcessor {
    mode: WhitespaceMode,
}

impl WhitespaceProcessor {
    pub const NAME: &'static str = "whitespace";
    pub const DESCRIPTION: &'static str = "Removes whitespace from G-code commands";
    pub const ARGUMENTS: &'static [ArgumentSpec] = &[ArgumentSpec::optional(
        "mode",
        ArgumentKind::Text,
        "all",
        "\"all\" removes whitespace outside comments, \"trim\" trims both ends",
    )];

    /// Create a whitespace processor
    pub fn new(mode: WhitespaceMode) -> Self {
        Self { mode }
    }

    pub fn from_arguments(args: &ProcessorArguments<'_>) -> Result<Self, ConfigurationError> {
        let mode = match args.text("mode")? {
            None | Some("all") => WhitespaceMode::All,
            Some("trim") => WhitespaceMode::Trim,
            Some(other) => {
                return Err(args.invalid(
                    "mode",
                    format!("expected \"all\" or \"trim\", got \"{other}\""),
                ))
            }
        };
        Ok(Self::new(mode))
    }
}

impl CommandProcessor for WhitespaceProcessor {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn describe(&self) -> &str {
        Self::DESCRIPTION
    }

    fn process(&self, command: &str, _state: &ModalState) -> Result<CommandBatch, ProcessError> {
        let processed = match self.mode {
            WhitespaceMode::All => {
                ScannedLine::scan(command).rebuild(|t| t.kind != TokenKind::Whitespace)
            }
            WhitespaceMode::Trim => command.trim().to_string(),
        };
        Ok(keep_unless_blank(processed))
    }
}

// ============================================================================
// Comments
// ============================================================================

/// Removes G-code comments from commands
///
/// Comments in G-code can be:
/// - Parentheses: (this is a comment)
/// - Semicolon: G01 X10 ; move to X10
///
/// An unclosed parenthesis runs to the end of the line.
#[derive(Debug, Clone, Default)]
pub struct CommentProcessor;

impl CommentProcessor {
    pub const NAME: &'static str = "comment";
    pub const DESCRIPTION: &'static str = "Removes G-code comments (parentheses and semicolon style)";

    pub fn new() -> Self {
        Self
    }
}

impl CommandProcessor for CommentProcessor {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn describe(&self) -> &str {
        Self::DESCRIPTION
    }

    fn process(&self, command: &str, _state: &ModalState) -> Result<CommandBatch, ProcessError> {
        let scanned = ScannedLine::scan(command);
        if !scanned.has_comment() {
            return Ok(vec![command.to_string()]);
        }
        let stripped = scanned.rebuild(|t| t.kind != TokenKind::Comment);
        Ok(keep_unless_blank(stripped.trim().to_string()))
    }
}

// ============================================================================
// Empty lines
// ============================================================================

/// Removes empty lines from G-code
///
/// After comment removal and whitespace stripping, some lines may be empty.
/// This processor removes them from the command stream.
#[derive(Debug, Clone, Default)]
pub struct EmptyLineRemoverProcessor;

impl EmptyLineRemoverProcessor {
    pub const NAME: &'static str = "empty_line_remover";
    pub const DESCRIPTION: &'static str = "Removes empty lines from G-code";

    pub fn new() -> Self {
        Self
    }
}

impl CommandProcessor for EmptyLineRemoverProcessor {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn describe(&self) -> &str {
        Self::DESCRIPTION
    }

    fn process(&self, command: &str, _state: &ModalState) -> Result<CommandBatch, ProcessError> {
        Ok(keep_unless_blank(command.to_string()))
    }
}

// ============================================================================
// Pattern removal
// ============================================================================

/// Removes text matching a regular expression
///
/// Matches are removed repeatedly until the line stops changing, so the
/// stage is idempotent even for patterns whose removal exposes new matches.
/// A line left blank is dropped.
#[derive(Debug, Clone)]
pub struct PatternRemover {
    pattern: Regex,
}

impl PatternRemover {
    pub const NAME: &'static str = "pattern_remover";
    pub const DESCRIPTION: &'static str = "Removes text matching a regular expression";
    pub const ARGUMENTS: &'static [ArgumentSpec] = &[ArgumentSpec::required(
        "pattern",
        ArgumentKind::Text,
        "Regular expression whose matches are removed",
    )];

    /// Create a pattern remover from a compiled expression
    pub fn new(pattern: Regex) -> Self {
        Self { pattern }
    }

    pub fn from_arguments(args: &ProcessorArguments<'_>) -> Result<Self, ConfigurationError> {
        let source = args.required_text("pattern")?;
        if source.is_empty() {
            return Err(args.invalid("pattern", "pattern must not be empty"));
        }
        let pattern = Regex::new(source).map_err(|e| args.invalid("pattern", e.to_string()))?;
        Ok(Self::new(pattern))
    }

    /// The expression being removed
    pub fn pattern(&self) -> &str {
        self.pattern.as_str()
    }
}

impl CommandProcessor for PatternRemover {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn describe(&self) -> &str {
        Self::DESCRIPTION
    }

    fn process(&self, command: &str, _state: &ModalState) -> Result<CommandBatch, ProcessError> {
        if !self.pattern.is_match(command) {
            return Ok(vec![command.to_string()]);
        }

        let mut current = command.to_string();
        loop {
            let next = self.pattern.replace_all(&current, "").into_owned();
            // Every pass that changes the line makes it strictly shorter
            if next == current {
                break;
            }
            current = next;
        }

        Ok(keep_unless_blank(current))
    }
}

// ============================================================================
// Length guard
// ============================================================================

/// Rejects commands longer than a maximum character count
///
/// Controllers with small line buffers silently truncate long lines; this
/// stage turns that into an error before the line is sent.
#[derive(Debug, Clone)]
pub struct CommandLengthProcessor {
    max_length: usize,
}

impl CommandLengthProcessor {
    pub const NAME: &'static str = "command_length";
    pub const DESCRIPTION: &'static str = "Rejects commands exceeding the maximum length";
    pub const ARGUMENTS: &'static [ArgumentSpec] = &[ArgumentSpec::required(
        "max_length",
        ArgumentKind::Integer,
        "Maximum command length in characters (at least 1)",
    )];

    /// Create a length guard
    pub fn new(max_length: usize) -> Self {
        Self { max_length }
    }

    pub fn from_arguments(args: &ProcessorArguments<'_>) -> Result<Self, ConfigurationError> {
        let max_length = args.required_integer("max_length")?;
        if max_length < 1 {
            return Err(args.invalid("max_length", "must be at least 1"));
        }
        let max_length = usize::try_from(max_length)
            .map_err(|_| args.invalid("max_length", "value is too large"))?;
        Ok(Self::new(max_length))
    }

    pub fn max_length(&self) -> usize {
        self.max_length
    }
}

impl CommandProcessor for CommandLengthProcessor {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn describe(&self) -> &str {
        Self::DESCRIPTION
    }

    fn process(&self, command: &str, _state: &ModalState) -> Result<CommandBatch, ProcessError> {
        let length = command.chars().count();
        if length > self.max_length {
            return Err(ProcessError::new(
                command,
                format!(
                    "command is {} characters long, maximum is {}",
                    length, self.max_length
                ),
            ));
        }
        Ok(vec![command.to_string()])
    }
}

// ============================================================================
// Program end
// ============================================================================

/// Removes program-end commands (M30 and M2)
///
/// Useful when streaming several programs back to back. The whole line is
/// dropped; matching is on the parsed word, so `M300` and comments mentioning
/// M30 never match.
#[derive(Debug, Clone, Default)]
pub struct M30Processor;

impl M30Processor {
    pub const NAME: &'static str = "m30_remover";
    pub const DESCRIPTION: &'static str = "Removes program end commands (M30, M2)";

    pub fn new() -> Self {
        Self
    }
}

impl CommandProcessor for M30Processor {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn describe(&self) -> &str {
        Self::DESCRIPTION
    }

    fn process(&self, command: &str, _state: &ModalState) -> Result<CommandBatch, ProcessError> {
        let scanned = ScannedLine::scan(command);
        if scanned.has_code('M', 30.0) || scanned.has_code('M', 2.0) {
            return Ok(vec![]);
        }
        Ok(vec![command.to_string()])
    }
}
