//! Stage chains
//!
//! A [`StageChain`] is the ordered, immutable list of live processors built
//! from a [`PipelineSettings`] document. The [`ChainManager`] owns the chain
//! currently in effect and swaps in a new one on reload.

use std::fmt;
use std::sync::Arc;

use gcodeflow_core::{ConfigurationError, ModalState, ProcessError};
use gcodeflow_settings::PipelineSettings;
use parking_lot::RwLock;

use super::driver::PipelineDriver;
use super::processor::{CommandBatch, ProcessorHandle};
use super::registry::ProcessorRegistry;
use super::tracker::{BasicInterpreter, StateInterpreter};

/// Non-fatal finding recorded while building a chain
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChainDiagnostic {
    /// An optional descriptor named a stage the registry does not know
    SkippedOptional {
        /// 1-based position of the descriptor in the configuration
        position: usize,
        /// The unresolved stage name
        name: String,
    },
}

impl fmt::Display for ChainDiagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChainDiagnostic::SkippedOptional { position, name } => write!(
                f,
                "optional stage '{}' (#{}) is not available and was skipped",
                name, position
            ),
        }
    }
}

/// G-code stage chain
///
/// Applies its processors in order to every command. Each processor can
/// transform the command, drop it, or expand it into several commands.
/// Cloning is cheap; the processors are shared.
#[derive(Clone)]
pub struct StageChain {
    stages: Arc<[ProcessorHandle]>,
    diagnostics: Arc<[ChainDiagnostic]>,
}

impl StageChain {
    /// Chain without stages; every command passes through unchanged
    pub fn empty() -> Self {
        Self::from_processors(Vec::new())
    }

    /// Chain from already constructed processors, in order
    pub fn from_processors(processors: Vec<ProcessorHandle>) -> Self {
        Self {
            stages: processors.into(),
            diagnostics: Arc::from(Vec::new()),
        }
    }

    /// Build a chain from a configuration document
    ///
    /// Disabled descriptors are skipped. An unknown stage name fails the
    /// build unless its descriptor is optional, in which case it is skipped
    /// and recorded as a [`ChainDiagnostic`]. Argument errors always fail,
    /// optional or not.
    pub fn build(
        settings: &PipelineSettings,
        registry: &ProcessorRegistry,
    ) -> Result<Self, ConfigurationError> {
        settings.validate()?;

        let mut stages = Vec::with_capacity(settings.stages.len());
        let mut diagnostics = Vec::new();

        for (index, descriptor) in settings.stages.iter().enumerate() {
            if !descriptor.enabled {
                tracing::debug!("Stage '{}' is disabled", descriptor.name);
                continue;
            }

            if !registry.contains(&descriptor.name) && descriptor.optional {
                let diagnostic = ChainDiagnostic::SkippedOptional {
                    position: index + 1,
                    name: descriptor.name.clone(),
                };
                tracing::warn!("{}", diagnostic);
                diagnostics.push(diagnostic);
                continue;
            }

            stages.push(registry.create(descriptor)?);
        }

        let chain = Self {
            stages: stages.into(),
            diagnostics: diagnostics.into(),
        };
        tracing::info!("Built stage chain: [{}]", chain.names().join(", "));
        Ok(chain)
    }

    /// Number of live stages
    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Stage names in execution order
    pub fn names(&self) -> Vec<&str> {
        self.stages.iter().map(|s| s.name()).collect()
    }

    pub fn stages(&self) -> &[ProcessorHandle] {
        &self.stages
    }

    /// Findings recorded while building this chain
    pub fn diagnostics(&self) -> &[ChainDiagnostic] {
        &self.diagnostics
    }

    /// Process a single command through the entire chain
    ///
    /// Each stage's outputs are concatenated in order and fed to the next
    /// stage. Once nothing is left the remaining stages are skipped. The
    /// error names the failing stage.
    pub fn process(&self, command: &str, state: &ModalState) -> Result<CommandBatch, ProcessError> {
        self.process_with(command, state, &BasicInterpreter)
    }

    /// Like [`process`](Self::process), with the interpreter that tracks
    /// state between the commands a stage receives
    ///
    /// Within one stage, command `k` sees `state` advanced over commands
    /// `0..k`, so a stage after an expanding stage starts each command where
    /// the previous one ended. Nothing is committed to any tracker.
    pub fn process_with(
        &self,
        command: &str,
        state: &ModalState,
        interpreter: &dyn StateInterpreter,
    ) -> Result<CommandBatch, ProcessError> {
        let mut current = vec![command.to_string()];

        for stage in self.stages.iter() {
            let mut next = Vec::with_capacity(current.len());
            let mut local = *state;
            for (index, cmd) in current.iter().enumerate() {
                match stage.process(cmd, &local) {
                    Ok(processed) => next.extend(processed),
                    Err(e) => {
                        tracing::debug!("Stage '{}' failed on '{}': {}", stage.name(), cmd, e);
                        return Err(e.in_stage(stage.name()));
                    }
                }
                if index + 1 < current.len() {
                    local = interpreter.apply(&local, cmd);
                }
            }

            current = next;
            if current.is_empty() {
                break;
            }
        }

        Ok(current)
    }
}

impl Default for StageChain {
    fn default() -> Self {
        Self::empty()
    }
}

impl fmt::Debug for StageChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StageChain")
            .field("stages", &self.names())
            .field("diagnostics", &self.diagnostics)
            .finish()
    }
}

/// Owner of the chain in effect
///
/// Sessions take a snapshot when they start, so a reload never changes the
/// chain under a job that is already running. A failed reload leaves the
/// current chain in place.
#[derive(Debug)]
pub struct ChainManager {
    registry: ProcessorRegistry,
    current: RwLock<Arc<StageChain>>,
}

impl ChainManager {
    /// Manager with an empty chain
    pub fn new(registry: ProcessorRegistry) -> Self {
        Self {
            registry,
            current: RwLock::new(Arc::new(StageChain::empty())),
        }
    }

    /// Manager whose initial chain is built from `settings`
    pub fn with_settings(
        registry: ProcessorRegistry,
        settings: &PipelineSettings,
    ) -> Result<Self, ConfigurationError> {
        let chain = StageChain::build(settings, &registry)?;
        Ok(Self {
            registry,
            current: RwLock::new(Arc::new(chain)),
        })
    }

    pub fn registry(&self) -> &ProcessorRegistry {
        &self.registry
    }

    /// The chain new sessions will use
    pub fn current(&self) -> Arc<StageChain> {
        Arc::clone(&self.current.read())
    }

    /// Build a chain from `settings` and make it current
    ///
    /// On error nothing changes.
    pub fn reload(&self, settings: &PipelineSettings) -> Result<Arc<StageChain>, ConfigurationError> {
        let chain = match StageChain::build(settings, &self.registry) {
            Ok(chain) => Arc::new(chain),
            Err(e) => {
                tracing::warn!("Pipeline reload rejected, keeping current chain: {}", e);
                return Err(e);
            }
        };
        *self.current.write() = Arc::clone(&chain);
        tracing::info!("Pipeline reloaded with {} stages", chain.len());
        Ok(chain)
    }

    /// Start a session on a snapshot of the current chain
    pub fn start_session(&self) -> PipelineDriver {
        PipelineDriver::new(self.current())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gcode::processor::CommandProcessor;
    use crate::gcode::processors::{ArcExpander, LineSplitter};
    use crate::gcode::scanner::ScannedLine;
    use gcodeflow_core::Position;
    use gcodeflow_settings::StageDescriptor;

    fn settings(stages: Vec<StageDescriptor>) -> PipelineSettings {
        stages
            .into_iter()
            .fold(PipelineSettings::new(), |s, d| s.with_stage(d))
    }

    #[test]
    fn test_disabled_stages_excluded() {
        let registry = ProcessorRegistry::builtin();
        let chain = StageChain::build(
            &settings(vec![
                StageDescriptor::new("comment"),
                StageDescriptor::new("whitespace").enabled(false),
                StageDescriptor::new("m30_remover"),
            ]),
            &registry,
        )
        .unwrap();
        assert_eq!(chain.names(), vec!["comment", "m30_remover"]);
    }

    #[test]
    fn test_optional_unknown_stage_skipped() {
        let registry = ProcessorRegistry::builtin();
        let chain = StageChain::build(
            &settings(vec![
                StageDescriptor::new("laser_mode").optional(true),
                StageDescriptor::new("comment"),
            ]),
            &registry,
        )
        .unwrap();
        assert_eq!(chain.len(), 1);
        assert_eq!(
            chain.diagnostics(),
            &[ChainDiagnostic::SkippedOptional {
                position: 1,
                name: "laser_mode".to_string()
            }]
        );
    }

    #[test]
    fn test_optional_does_not_hide_bad_arguments() {
        let registry = ProcessorRegistry::builtin();
        let result = StageChain::build(
            &settings(vec![StageDescriptor::new("decimal").optional(true)]),
            &registry,
        );
        assert!(matches!(
            result,
            Err(ConfigurationError::MissingArgument { .. })
        ));
    }

    #[test]
    fn test_unknown_required_stage_fails() {
        let registry = ProcessorRegistry::builtin();
        let result = StageChain::build(&settings(vec![StageDescriptor::new("nope")]), &registry);
        assert!(matches!(result, Err(ConfigurationError::UnknownStage { .. })));
    }

    #[test]
    fn test_process_short_circuits_on_drop() {
        let registry = ProcessorRegistry::builtin();
        let chain = StageChain::build(
            &settings(vec![
                StageDescriptor::new("comment"),
                StageDescriptor::new("command_length").with_argument("max_length", 1),
            ]),
            &registry,
        )
        .unwrap();
        // The length guard would reject the comment if it ever saw it
        assert!(chain
            .process("(a long comment)", &ModalState::default())
            .unwrap()
            .is_empty());
        let err = chain.process("G0 X1", &ModalState::default()).unwrap_err();
        assert_eq!(err.stage.as_deref(), Some("command_length"));
    }

    /// Appends a comment to every command it sees
    struct Annotate;

    impl CommandProcessor for Annotate {
        fn name(&self) -> &str {
            "annotate"
        }

        fn describe(&self) -> &str {
            "Appends a comment"
        }

        fn process(&self, command: &str, _state: &ModalState) -> Result<CommandBatch, ProcessError> {
            Ok(vec![format!("{} (arc)", command)])
        }
    }

    #[test]
    fn test_each_command_sees_state_after_the_previous_ones() {
        let stages: Vec<ProcessorHandle> = vec![
            Box::new(ArcExpander::new(0.1, 4)),
            Box::new(Annotate),
            Box::new(LineSplitter::new(20, 2, 64)),
        ];
        let chain = StageChain::from_processors(stages);
        let mut state = ModalState::default();
        state.position = Position::new(10.0, 0.0, 0.0);

        let lines = chain.process("G3 X0 Y10 I-10 J0", &state).unwrap();
        assert!(lines.len() > 6);
        assert!(lines.iter().all(|l| l.len() <= 20));

        let mut previous = (10.0_f64, 0.0_f64);
        for line in &lines {
            let scanned = ScannedLine::scan(line);
            let x = scanned.value('X').unwrap_or(previous.0);
            let y = scanned.value('Y').unwrap_or(previous.1);
            // Within the chord tolerance plus output rounding
            assert!((x.hypot(y) - 10.0).abs() < 0.11, "{} left the arc", line);
            // Counter-clockwise from +X: the angle never goes backwards
            assert!(y.atan2(x) >= previous.1.atan2(previous.0) - 1e-9, "{} went back", line);
            previous = (x, y);
        }
        assert_eq!(lines.last().map(String::as_str), Some("G1 X0 Y10 (arc)"));
    }

    #[test]
    fn test_reload_keeps_chain_on_error() {
        let manager = ChainManager::new(ProcessorRegistry::builtin());
        manager
            .reload(&settings(vec![StageDescriptor::new("comment")]))
            .unwrap();
        let bad = settings(vec![StageDescriptor::new("decimal")
            .with_argument("precision", 99)]);
        assert!(manager.reload(&bad).is_err());
        assert_eq!(manager.current().names(), vec!["comment"]);
    }

    #[test]
    fn test_session_snapshot_survives_reload() {
        let manager = ChainManager::with_settings(
            ProcessorRegistry::builtin(),
            &settings(vec![StageDescriptor::new("comment")]),
        )
        .unwrap();
        let session = manager.start_session();
        manager
            .reload(&settings(vec![StageDescriptor::new("m30_remover")]))
            .unwrap();
        assert_eq!(session.chain().names(), vec!["comment"]);
        assert_eq!(manager.current().names(), vec!["m30_remover"]);
    }
}
