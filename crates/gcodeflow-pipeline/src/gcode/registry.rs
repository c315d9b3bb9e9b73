//! Processor registry
//!
//! Maps stage names to factories. A factory validates the descriptor's
//! arguments and builds a live processor; nothing is constructed lazily or
//! with substituted defaults.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use gcodeflow_core::ConfigurationError;
use gcodeflow_settings::StageDescriptor;
use serde::Serialize;
use serde_json::Value;

use super::processor::{ArgumentSpec, ProcessorArguments, ProcessorHandle};
use super::processors::{
    ArcExpander, CommandLengthProcessor, CommentProcessor, DecimalProcessor,
    EmptyLineRemoverProcessor, FeedOverrideProcessor, LineSplitter, M30Processor, PatternRemover,
    SpindleDelayProcessor, WhitespaceProcessor,
};

/// Builds a processor from checked arguments
pub type ProcessorFactory = Arc<
    dyn Fn(&ProcessorArguments<'_>) -> Result<ProcessorHandle, ConfigurationError> + Send + Sync,
>;

/// Catalog entry describing one registered stage
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StageInfo {
    pub name: String,
    pub description: &'static str,
    pub arguments: &'static [ArgumentSpec],
}

#[derive(Clone)]
struct Registration {
    description: &'static str,
    arguments: &'static [ArgumentSpec],
    factory: ProcessorFactory,
}

/// Processor registry for managing available processors
///
/// Maintains the factories of all available command processors and builds
/// processors from configuration descriptors.
#[derive(Clone, Default)]
pub struct ProcessorRegistry {
    factories: HashMap<String, Registration>,
}

impl ProcessorRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding every processor shipped with this crate
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        registry
            .register(
                WhitespaceProcessor::NAME,
                WhitespaceProcessor::DESCRIPTION,
                WhitespaceProcessor::ARGUMENTS,
                |args| Ok(Box::new(WhitespaceProcessor::from_arguments(args)?)),
            )
            .register(
                CommentProcessor::NAME,
                CommentProcessor::DESCRIPTION,
                &[],
                |_| Ok(Box::new(CommentProcessor::new())),
            )
            .register(
                EmptyLineRemoverProcessor::NAME,
                EmptyLineRemoverProcessor::DESCRIPTION,
                &[],
                |_| Ok(Box::new(EmptyLineRemoverProcessor::new())),
            )
            .register(
                PatternRemover::NAME,
                PatternRemover::DESCRIPTION,
                PatternRemover::ARGUMENTS,
                |args| Ok(Box::new(PatternRemover::from_arguments(args)?)),
            )
            .register(
                CommandLengthProcessor::NAME,
                CommandLengthProcessor::DESCRIPTION,
                CommandLengthProcessor::ARGUMENTS,
                |args| Ok(Box::new(CommandLengthProcessor::from_arguments(args)?)),
            )
            .register(
                DecimalProcessor::NAME,
                DecimalProcessor::DESCRIPTION,
                DecimalProcessor::ARGUMENTS,
                |args| Ok(Box::new(DecimalProcessor::from_arguments(args)?)),
            )
            .register(
                FeedOverrideProcessor::NAME,
                FeedOverrideProcessor::DESCRIPTION,
                FeedOverrideProcessor::ARGUMENTS,
                |args| Ok(Box::new(FeedOverrideProcessor::from_arguments(args)?)),
            )
            .register(
                M30Processor::NAME,
                M30Processor::DESCRIPTION,
                &[],
                |_| Ok(Box::new(M30Processor::new())),
            )
            .register(
                SpindleDelayProcessor::NAME,
                SpindleDelayProcessor::DESCRIPTION,
                SpindleDelayProcessor::ARGUMENTS,
                |args| Ok(Box::new(SpindleDelayProcessor::from_arguments(args)?)),
            )
            .register(
                ArcExpander::NAME,
                ArcExpander::DESCRIPTION,
                ArcExpander::ARGUMENTS,
                |args| Ok(Box::new(ArcExpander::from_arguments(args)?)),
            )
            .register(
                LineSplitter::NAME,
                LineSplitter::DESCRIPTION,
                LineSplitter::ARGUMENTS,
                |args| Ok(Box::new(LineSplitter::from_arguments(args)?)),
            );
        registry
    }

    /// Register a processor factory, replacing any factory of the same name
    pub fn register<F>(
        &mut self,
        name: impl Into<String>,
        description: &'static str,
        arguments: &'static [ArgumentSpec],
        factory: F,
    ) -> &mut Self
    where
        F: Fn(&ProcessorArguments<'_>) -> Result<ProcessorHandle, ConfigurationError>
            + Send
            + Sync
            + 'static,
    {
        self.factories.insert(
            name.into(),
            Registration {
                description,
                arguments,
                factory: Arc::new(factory),
            },
        );
        self
    }

    /// True when a factory is registered under `name`
    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    /// Build the processor a descriptor names
    pub fn create(&self, descriptor: &StageDescriptor) -> Result<ProcessorHandle, ConfigurationError> {
        self.create_with(&descriptor.name, &descriptor.arguments)
    }

    /// Build a processor by name from raw arguments
    pub fn create_with(
        &self,
        name: &str,
        arguments: &BTreeMap<String, Value>,
    ) -> Result<ProcessorHandle, ConfigurationError> {
        let registration =
            self.factories
                .get(name)
                .ok_or_else(|| ConfigurationError::UnknownStage {
                    name: name.to_string(),
                })?;
        let args = ProcessorArguments::new(name, arguments, registration.arguments)?;
        (registration.factory)(&args)
    }

    /// List all registered processor names, sorted
    pub fn list_registered(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.factories.keys().map(|s| s.as_str()).collect();
        names.sort_unstable();
        names
    }

    /// Name, description and arguments of every registered stage, sorted by name
    pub fn catalog(&self) -> Vec<StageInfo> {
        let mut catalog: Vec<StageInfo> = self
            .factories
            .iter()
            .map(|(name, registration)| StageInfo {
                name: name.clone(),
                description: registration.description,
                arguments: registration.arguments,
            })
            .collect();
        catalog.sort_by(|a, b| a.name.cmp(&b.name));
        catalog
    }
}

impl std::fmt::Debug for ProcessorRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProcessorRegistry")
            .field("factories", &self.list_registered())
            .finish()
    }
}
