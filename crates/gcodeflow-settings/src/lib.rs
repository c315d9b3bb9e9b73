//! gcodeflow Settings Crate
//!
//! Loads, validates and saves the versioned pipeline configuration that
//! describes which stages run, in which order, with which arguments.

pub mod config;
pub mod error;

pub use config::{
    default_settings_path, PipelineSettings, SettingsMigrator, StageDescriptor, VERSION_KEY,
};
pub use error::{SettingsError, SettingsResult};
