//! Error handling for gcodeflow
//!
//! Provides the error types shared by every layer of the pipeline:
//! - Configuration errors (stage names and arguments at load time)
//! - Process errors (command content at run time)
//! - Transport errors (reported by the downstream sink)
//!
//! All error types use `thiserror` for ergonomic error handling.

use thiserror::Error;

/// Configuration error type
///
/// Raised while a stage chain is being built. Configuration errors are
/// terminal: the chain is not built and any previously active chain stays in
/// place.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigurationError {
    /// No stage is registered under this name
    #[error("Unknown stage '{name}'")]
    UnknownStage {
        /// The unresolved registry key.
        name: String,
    },

    /// A required argument was not supplied
    #[error("Stage '{stage}' requires argument '{argument}'")]
    MissingArgument {
        /// The stage being constructed.
        stage: String,
        /// The missing argument name.
        argument: String,
    },

    /// An argument was supplied with an unusable value
    #[error("Invalid argument '{argument}' for stage '{stage}': {reason}")]
    InvalidArgument {
        /// The stage being constructed.
        stage: String,
        /// The offending argument name.
        argument: String,
        /// Why the value was rejected.
        reason: String,
    },

    /// An argument the stage does not understand
    #[error("Stage '{stage}' does not accept argument '{argument}'")]
    UnexpectedArgument {
        /// The stage being constructed.
        stage: String,
        /// The unknown argument name.
        argument: String,
    },

    /// The configuration document targets another schema version
    #[error("Configuration version {found} does not match expected version {expected}")]
    VersionMismatch {
        /// The version found in the document.
        found: u32,
        /// The version this build understands.
        expected: u32,
    },

    /// Any other structural problem with the configuration
    #[error("Invalid configuration: {reason}")]
    Invalid {
        /// The reason the configuration was rejected.
        reason: String,
    },
}

impl ConfigurationError {
    /// Shorthand for [`ConfigurationError::InvalidArgument`]
    pub fn invalid_argument(
        stage: impl Into<String>,
        argument: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::InvalidArgument {
            stage: stage.into(),
            argument: argument.into(),
            reason: reason.into(),
        }
    }
}

/// Process error type
///
/// Raised by a stage that cannot transform a command. Carries the offending
/// line and a human-readable cause; the driver fills in the stage name and the
/// input line number.
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessError {
    /// 1-based input line number, when known
    pub line_number: Option<usize>,
    /// The command text the stage rejected
    pub line: String,
    /// Registry name of the failing stage, when known
    pub stage: Option<String>,
    /// Human-readable cause
    pub cause: String,
}

impl ProcessError {
    /// Create an error for `line` with the given cause
    pub fn new(line: impl Into<String>, cause: impl Into<String>) -> Self {
        Self {
            line_number: None,
            line: line.into(),
            stage: None,
            cause: cause.into(),
        }
    }

    /// Attach the name of the stage that produced this error
    pub fn in_stage(mut self, stage: impl Into<String>) -> Self {
        self.stage = Some(stage.into());
        self
    }

    /// Attach the 1-based input line number
    pub fn at_line(mut self, line_number: usize) -> Self {
        self.line_number = Some(line_number);
        self
    }
}

impl std::error::Error for ProcessError {}

impl std::fmt::Display for ProcessError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(n) = self.line_number {
            write!(f, "line {}: ", n)?;
        }
        if let Some(stage) = &self.stage {
            write!(f, "[{}] ", stage)?;
        }
        write!(f, "{} (command: '{}')", self.cause, self.line)
    }
}

/// Transport error type
///
/// Reported by the downstream collaborator that receives command batches.
#[derive(Error, Debug)]
pub enum TransportError {
    /// The sink is closed or disconnected
    #[error("Transport closed")]
    Closed,

    /// Standard I/O error while writing
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Main error type for gcodeflow
///
/// A unified error type that can represent any error from all layers.
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration error
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    /// Process error
    #[error(transparent)]
    Process(#[from] ProcessError),

    /// Transport error
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// Standard I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Check if this is a configuration error
    pub fn is_configuration_error(&self) -> bool {
        matches!(self, Error::Configuration(_))
    }

    /// Check if this is a process error
    pub fn is_process_error(&self) -> bool {
        matches!(self, Error::Process(_))
    }
}

/// Result type using Error
pub type Result<T> = std::result::Result<T, Error>;
