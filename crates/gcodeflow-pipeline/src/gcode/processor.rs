//! Command processor contract and argument handling

use gcodeflow_core::{ConfigurationError, ModalState, ProcessError};
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;

/// Output of one processor for one command
///
/// Empty drops the command, one element passes it through or modifies it,
/// several elements insert or split.
pub type CommandBatch = Vec<String>;

/// Trait for G-code command processors (pipeline stages)
///
/// Processors implement transformations, validations, and modifications
/// to G-code commands. They are applied in chain order to every line before
/// it reaches the controller.
///
/// # Examples
/// - Comment removal
/// - Whitespace normalization
/// - Arc expansion to line segments
/// - Feed rate overrides
pub trait CommandProcessor: Send + Sync {
    /// Registry name of this processor
    fn name(&self) -> &str;

    /// Stable identifying text for presentation layers
    fn describe(&self) -> &str;

    /// Process a single G-code command
    ///
    /// # Arguments
    /// * `command` - One raw line, possibly with a trailing comment
    /// * `state` - Modal state in effect when this line executes
    ///
    /// # Returns
    /// The batch substituted positionally for `command`, or an error naming
    /// the line and the cause.
    fn process(&self, command: &str, state: &ModalState) -> Result<CommandBatch, ProcessError>;
}

/// Boxed processor as stored in a chain
pub type ProcessorHandle = Box<dyn CommandProcessor>;

/// Value type expected for an argument
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ArgumentKind {
    /// Any finite number
    Number,
    /// Non-negative integer
    Integer,
    /// String
    Text,
    /// true / false
    Boolean,
}

/// Declared argument of a processor, for validation and for settings UIs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ArgumentSpec {
    pub name: &'static str,
    pub kind: ArgumentKind,
    pub required: bool,
    /// Default applied only when the key is absent
    pub default: Option<&'static str>,
    pub help: &'static str,
}

impl ArgumentSpec {
    /// A required argument
    pub const fn required(name: &'static str, kind: ArgumentKind, help: &'static str) -> Self {
        Self {
            name,
            kind,
            required: true,
            default: None,
            help,
        }
    }

    /// An optional argument with a documented default
    pub const fn optional(
        name: &'static str,
        kind: ArgumentKind,
        default: &'static str,
        help: &'static str,
    ) -> Self {
        Self {
            name,
            kind,
            required: false,
            default: Some(default),
            help,
        }
    }
}

/// Construction arguments of one processor, checked against its specs
///
/// Unknown keys are rejected up front; each getter rejects values of the
/// wrong type instead of falling back to a default.
#[derive(Debug, Clone)]
pub struct ProcessorArguments<'a> {
    stage: &'a str,
    values: &'a BTreeMap<String, Value>,
}

impl<'a> ProcessorArguments<'a> {
    /// Wrap the raw arguments of `stage`, rejecting keys not in `specs`
    pub fn new(
        stage: &'a str,
        values: &'a BTreeMap<String, Value>,
        specs: &[ArgumentSpec],
    ) -> Result<Self, ConfigurationError> {
        let mut keys = values.keys();
        if let Some(unknown) = keys.find(|k| !specs.iter().any(|s| s.name == k.as_str())) {
            return Err(ConfigurationError::UnexpectedArgument {
                stage: stage.to_string(),
                argument: unknown.clone(),
            });
        }
        for spec in specs.iter().filter(|s| s.required) {
            if !values.contains_key(spec.name) {
                return Err(ConfigurationError::MissingArgument {
                    stage: stage.to_string(),
                    argument: spec.name.to_string(),
                });
            }
        }
        Ok(Self { stage, values })
    }

    /// Name of the stage being configured
    pub fn stage(&self) -> &str {
        self.stage
    }

    /// True when the key was supplied
    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    /// Build an [`ConfigurationError::InvalidArgument`] for this stage
    pub fn invalid(&self, key: &str, reason: impl Into<String>) -> ConfigurationError {
        ConfigurationError::invalid_argument(self.stage, key, reason)
    }

    fn missing(&self, key: &str) -> ConfigurationError {
        ConfigurationError::MissingArgument {
            stage: self.stage.to_string(),
            argument: key.to_string(),
        }
    }

    /// Number argument, if present
    pub fn number(&self, key: &str) -> Result<Option<f64>, ConfigurationError> {
        match self.values.get(key) {
            None => Ok(None),
            Some(value) => match value.as_f64() {
                Some(n) if n.is_finite() => Ok(Some(n)),
                _ => Err(self.invalid(key, format!("expected a number, got {}", value))),
            },
        }
    }

    /// Required number argument
    pub fn required_number(&self, key: &str) -> Result<f64, ConfigurationError> {
        self.number(key)?.ok_or_else(|| self.missing(key))
    }

    /// Integer argument, if present
    pub fn integer(&self, key: &str) -> Result<Option<u64>, ConfigurationError> {
        match self.values.get(key) {
            None => Ok(None),
            Some(value) => match value.as_u64() {
                Some(n) => Ok(Some(n)),
                None => Err(self.invalid(
                    key,
                    format!("expected a non-negative integer, got {}", value),
                )),
            },
        }
    }

    /// Required integer argument
    pub fn required_integer(&self, key: &str) -> Result<u64, ConfigurationError> {
        self.integer(key)?.ok_or_else(|| self.missing(key))
    }

    /// String argument, if present
    pub fn text(&self, key: &str) -> Result<Option<&'a str>, ConfigurationError> {
        match self.values.get(key) {
            None => Ok(None),
            Some(Value::String(s)) => Ok(Some(s.as_str())),
            Some(value) => Err(self.invalid(key, format!("expected a string, got {}", value))),
        }
    }

    /// Required string argument
    pub fn required_text(&self, key: &str) -> Result<&'a str, ConfigurationError> {
        self.text(key)?.ok_or_else(|| self.missing(key))
    }

    /// Boolean argument, if present
    pub fn boolean(&self, key: &str) -> Result<Option<bool>, ConfigurationError> {
        match self.values.get(key) {
            None => Ok(None),
            Some(Value::Bool(b)) => Ok(Some(*b)),
            Some(value) => Err(self.invalid(key, format!("expected true or false, got {}", value))),
        }
    }
}
