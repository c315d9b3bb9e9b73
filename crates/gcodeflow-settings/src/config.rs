//! Pipeline configuration
//!
//! A pipeline configuration is a versioned, ordered list of stage descriptors.
//! Files are JSON or TOML, selected by extension:
//!
//! ```json
//! {
//!   "Version": 1,
//!   "stages": [
//!     { "name": "comment", "enabled": true, "optional": false, "arguments": {} },
//!     { "name": "command_length", "arguments": { "max_length": 50 } }
//!   ]
//! }
//! ```
//!
//! A document whose `Version` differs from [`PipelineSettings::CURRENT_VERSION`]
//! is never loaded with guessed defaults: it is either rejected or handed to a
//! [`SettingsMigrator`].

use crate::error::{SettingsError, SettingsResult};
use gcodeflow_core::ConfigurationError;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Key of the top-level schema version field
pub const VERSION_KEY: &str = "Version";

fn default_enabled() -> bool {
    true
}

/// One configured pipeline stage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageDescriptor {
    /// Registry key of the stage
    pub name: String,
    /// Disabled descriptors are skipped when the chain is built
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// An optional descriptor whose name cannot be resolved is skipped instead
    /// of failing the load
    #[serde(default)]
    pub optional: bool,
    /// Construction arguments, validated by the stage
    #[serde(default, alias = "args")]
    pub arguments: BTreeMap<String, Value>,
}

impl StageDescriptor {
    /// Create an enabled, required descriptor without arguments
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            enabled: true,
            optional: false,
            arguments: BTreeMap::new(),
        }
    }

    /// Set a construction argument
    pub fn with_argument(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.arguments.insert(key.into(), value.into());
        self
    }

    /// Set the enabled flag
    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Set the optional flag
    pub fn optional(mut self, optional: bool) -> Self {
        self.optional = optional;
        self
    }
}

/// Versioned, ordered pipeline configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineSettings {
    /// Schema version of this document
    #[serde(rename = "Version")]
    pub version: u32,
    /// Stage descriptors in execution order
    #[serde(default)]
    pub stages: Vec<StageDescriptor>,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            version: Self::CURRENT_VERSION,
            stages: Vec::new(),
        }
    }
}

/// Settings-migration collaborator
///
/// Receives a raw document whose version does not match and returns a document
/// in the current schema. The result is re-checked before use.
pub trait SettingsMigrator {
    fn migrate(&self, from_version: u32, document: Value) -> Result<Value, ConfigurationError>;
}

/// File formats understood by the loader
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Format {
    Json,
    Toml,
}

impl Format {
    fn from_path(path: &Path) -> SettingsResult<Self> {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => Ok(Format::Json),
            Some("toml") => Ok(Format::Toml),
            other => Err(SettingsError::UnsupportedFormat(
                other.unwrap_or("<none>").to_string(),
            )),
        }
    }
}

impl PipelineSettings {
    /// The schema version this build reads and writes
    pub const CURRENT_VERSION: u32 = 1;

    /// Create an empty configuration at the current version
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a stage descriptor
    pub fn with_stage(mut self, descriptor: StageDescriptor) -> Self {
        self.stages.push(descriptor);
        self
    }

    /// Load config from file (JSON or TOML)
    ///
    /// A version mismatch is reported as
    /// [`ConfigurationError::VersionMismatch`].
    pub fn load_from_file(path: &Path) -> SettingsResult<Self> {
        let document = Self::read_document(path)?;
        Self::from_document(document, None)
    }

    /// Load config from file, routing a version mismatch through `migrator`
    pub fn load_with_migrator(path: &Path, migrator: &dyn SettingsMigrator) -> SettingsResult<Self> {
        let document = Self::read_document(path)?;
        Self::from_document(document, Some(migrator))
    }

    /// Parse a JSON document held in memory
    pub fn from_json_str(text: &str) -> SettingsResult<Self> {
        let document: Value = serde_json::from_str(text)?;
        Self::from_document(document, None)
    }

    /// Parse a TOML document held in memory
    pub fn from_toml_str(text: &str) -> SettingsResult<Self> {
        let document: Value = toml::from_str(text)?;
        Self::from_document(document, None)
    }

    /// Save config to file (JSON or TOML)
    pub fn save_to_file(&self, path: &Path) -> SettingsResult<()> {
        self.validate()?;

        let content = match Format::from_path(path)? {
            Format::Json => serde_json::to_string_pretty(self)?,
            Format::Toml => toml::to_string_pretty(self)?,
        };

        std::fs::write(path, content).map_err(|e| SettingsError::io(path, e))?;
        tracing::debug!("Saved pipeline settings to {}", path.display());
        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        check_version(self.version)?;

        if let Some(index) = self.stages.iter().position(|s| s.name.trim().is_empty()) {
            return Err(ConfigurationError::Invalid {
                reason: format!("stage #{} has an empty name", index + 1),
            });
        }

        Ok(())
    }

    /// Descriptors that will take part in chain construction
    pub fn enabled_stages(&self) -> impl Iterator<Item = &StageDescriptor> {
        self.stages.iter().filter(|s| s.enabled)
    }

    fn read_document(path: &Path) -> SettingsResult<Value> {
        let content = std::fs::read_to_string(path).map_err(|e| SettingsError::io(path, e))?;
        let document = match Format::from_path(path)? {
            Format::Json => serde_json::from_str(&content)?,
            Format::Toml => toml::from_str(&content)?,
        };
        tracing::debug!("Read pipeline settings from {}", path.display());
        Ok(document)
    }

    fn from_document(
        document: Value,
        migrator: Option<&dyn SettingsMigrator>,
    ) -> SettingsResult<Self> {
        let found = document_version(&document)?;

        let document = match (check_version(found), migrator) {
            (Ok(()), _) => document,
            (Err(err), None) => return Err(err.into()),
            (Err(_), Some(migrator)) => {
                tracing::info!(
                    "Migrating pipeline settings from version {} to {}",
                    found,
                    Self::CURRENT_VERSION
                );
                let migrated = migrator.migrate(found, document)?;
                check_version(document_version(&migrated)?)?;
                migrated
            }
        };

        let settings: Self = serde_json::from_value(document)?;
        settings.validate()?;
        Ok(settings)
    }
}

fn check_version(found: u32) -> Result<(), ConfigurationError> {
    if found == PipelineSettings::CURRENT_VERSION {
        Ok(())
    } else {
        Err(ConfigurationError::VersionMismatch {
            found,
            expected: PipelineSettings::CURRENT_VERSION,
        })
    }
}

fn document_version(document: &Value) -> Result<u32, ConfigurationError> {
    let object = document.as_object().ok_or_else(|| ConfigurationError::Invalid {
        reason: "top level must be a table of settings".to_string(),
    })?;

    match object.get(VERSION_KEY) {
        // Documents written before versioning was introduced
        None => Ok(0),
        Some(value) => value
            .as_u64()
            .and_then(|v| u32::try_from(v).ok())
            .ok_or_else(|| ConfigurationError::Invalid {
                reason: format!("'{}' must be a non-negative integer, got {}", VERSION_KEY, value),
            }),
    }
}

/// Default location of the pipeline configuration file
pub fn default_settings_path() -> SettingsResult<PathBuf> {
    let base = dirs::config_dir().ok_or_else(|| {
        SettingsError::ConfigDirectory("no configuration directory on this platform".to_string())
    })?;
    Ok(base.join("gcodeflow").join("pipeline.json"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_descriptor_defaults() {
        let settings = PipelineSettings::from_json_str(
            r#"{"Version": 1, "stages": [{"name": "comment"}]}"#,
        )
        .unwrap();
        let stage = &settings.stages[0];
        assert!(stage.enabled);
        assert!(!stage.optional);
        assert!(stage.arguments.is_empty());
    }

    #[test]
    fn test_args_alias() {
        let settings = PipelineSettings::from_json_str(
            r#"{"Version": 1, "stages": [{"name": "decimal", "args": {"precision": 3}}]}"#,
        )
        .unwrap();
        assert_eq!(settings.stages[0].arguments["precision"], Value::from(3));
    }

    #[test]
    fn test_version_mismatch_is_rejected() {
        let err = PipelineSettings::from_json_str(r#"{"Version": 7, "stages": []}"#).unwrap_err();
        assert!(err.is_version_mismatch());

        let err = PipelineSettings::from_json_str(r#"{"stages": []}"#).unwrap_err();
        assert!(matches!(
            err,
            SettingsError::Configuration(ConfigurationError::VersionMismatch { found: 0, .. })
        ));
    }

    #[test]
    fn test_bad_version_type() {
        let err = PipelineSettings::from_json_str(r#"{"Version": "one"}"#).unwrap_err();
        assert!(matches!(
            err,
            SettingsError::Configuration(ConfigurationError::Invalid { .. })
        ));
    }

    #[test]
    fn test_toml_document() {
        let text = r#"
Version = 1

[[stages]]
name = "command_length"
[stages.arguments]
max_length = 40

[[stages]]
name = "comment"
enabled = false
"#;
        let settings = PipelineSettings::from_toml_str(text).unwrap();
        assert_eq!(settings.stages.len(), 2);
        assert_eq!(settings.stages[0].arguments["max_length"], Value::from(40));
        assert_eq!(settings.enabled_stages().count(), 1);
    }

    #[test]
    fn test_empty_name_is_invalid() {
        let settings = PipelineSettings::new().with_stage(StageDescriptor::new("  "));
        assert!(settings.validate().is_err());
    }
}
