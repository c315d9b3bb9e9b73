//! # gcodeflow
//!
//! A configurable G-code stage pipeline. Every line of a program passes
//! through an ordered chain of stages before it reaches the controller:
//! - Comment, whitespace and pattern filters
//! - Length guards and decimal truncation
//! - Feed overrides and spindle start dwells
//! - Arc expansion and long-line splitting
//!
//! ## Architecture
//!
//! gcodeflow is organized as a workspace with multiple crates:
//!
//! 1. **gcodeflow-core** - Errors, units and the modal machine state
//! 2. **gcodeflow-settings** - Versioned pipeline configuration files
//! 3. **gcodeflow-pipeline** - Processors, registry, stage chains and the driver
//! 4. **gcodeflow** - Command-line binary that integrates all crates

use std::fs;
use std::io::{self, Read};
use std::path::Path;

use anyhow::Context;

pub use gcodeflow_core::{
    format_coordinate, Axis, ConfigurationError, DistanceMode, Error, ModalState, MotionMode,
    Plane, Position, ProcessError, Result, TransportError, Units,
};

pub use gcodeflow_settings::{
    default_settings_path, PipelineSettings, SettingsError, SettingsMigrator, StageDescriptor,
};

pub use gcodeflow_pipeline::{
    ArgumentKind, ArgumentSpec, CancelToken, ChainDiagnostic, ChainManager, CommandBatch,
    CommandProcessor, PipelineDriver, ProcessorHandle, ProcessorRegistry, StageChain, StageInfo,
    StreamError, StreamSummary, Transport, ValidationReport, WriterTransport,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Build date (set at compile time)
pub const BUILD_DATE: &str = env!("BUILD_DATE");

/// Initialize logging with the default configuration
///
/// Log records go to stderr so that processed G-code can own stdout. The
/// level comes from `RUST_LOG` and defaults to warnings.
pub fn init_logging() -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::prelude::*;
    use tracing_subscriber::EnvFilter;

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    let fmt_layer = fmt::layer()
        .with_writer(io::stderr)
        .with_target(true)
        .with_level(true)
        .with_line_number(true);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .try_init()?;

    Ok(())
}

/// Load the pipeline configuration, falling back to the user's default file
pub fn load_settings(path: Option<&Path>) -> anyhow::Result<PipelineSettings> {
    let path = match path {
        Some(path) => path.to_path_buf(),
        None => default_settings_path()?,
    };
    PipelineSettings::load_from_file(&path)
        .with_context(|| format!("Failed to load pipeline configuration {}", path.display()))
}

/// Read a G-code program as lines; `-` reads standard input
pub fn read_program(path: &Path) -> anyhow::Result<Vec<String>> {
    let content = if path == Path::new("-") {
        let mut content = String::new();
        io::stdin()
            .read_to_string(&mut content)
            .context("Failed to read program from standard input")?;
        content
    } else {
        fs::read_to_string(path)
            .with_context(|| format!("Failed to read program {}", path.display()))?
    };

    Ok(content
        .lines()
        .map(|line| line.trim_end_matches('\r').to_string())
        .collect())
}
