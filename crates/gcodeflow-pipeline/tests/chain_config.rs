//! Stage chains built from configuration documents

use gcodeflow_core::{ConfigurationError, ModalState};
use gcodeflow_pipeline::{
    ChainDiagnostic, CommandProcessor, CommentProcessor, ProcessorRegistry,
    SpindleDelayProcessor, StageChain,
};
use gcodeflow_settings::{PipelineSettings, StageDescriptor};

fn build(settings: &PipelineSettings) -> Result<StageChain, ConfigurationError> {
    StageChain::build(settings, &ProcessorRegistry::builtin())
}

fn run(chain: &StageChain, line: &str) -> Vec<String> {
    chain.process(line, &ModalState::default()).unwrap()
}

#[test]
fn test_chain_from_json_document() {
    let settings = PipelineSettings::from_json_str(
        r#"{
            "Version": 1,
            "stages": [
                {"name": "comment"},
                {"name": "whitespace", "enabled": false},
                {"name": "spindle_delay", "arguments": {"delay": 2}},
                {"name": "laser_mode", "optional": true}
            ]
        }"#,
    )
    .unwrap();

    let chain = build(&settings).unwrap();
    assert_eq!(chain.names(), vec!["comment", "spindle_delay"]);
    assert_eq!(
        chain.diagnostics(),
        &[ChainDiagnostic::SkippedOptional {
            position: 4,
            name: "laser_mode".to_string()
        }]
    );
    assert_eq!(run(&chain, "M3 S1000 (spindle on)"), vec!["M3 S1000", "G4 P2"]);
}

#[test]
fn test_chain_from_toml_document() {
    let settings = PipelineSettings::from_toml_str(
        r#"
Version = 1

[[stages]]
name = "decimal"
arguments = { precision = 2 }

[[stages]]
name = "command_length"
arguments = { max_length = 12 }
"#,
    )
    .unwrap();

    let chain = build(&settings).unwrap();
    assert_eq!(chain.len(), 2);
    assert_eq!(run(&chain, "G1 X1.23456"), vec!["G1 X1.23"]);
}

#[test]
fn test_chain_length_counts_enabled_resolvable_stages() {
    let settings = PipelineSettings::new()
        .with_stage(StageDescriptor::new("comment"))
        .with_stage(StageDescriptor::new("whitespace").enabled(false))
        .with_stage(StageDescriptor::new("empty_line_remover"))
        .with_stage(StageDescriptor::new("probe_compensation").optional(true))
        .with_stage(StageDescriptor::new("teleport").optional(true).enabled(false));

    let chain = build(&settings).unwrap();
    assert_eq!(chain.len(), 2);
    // A disabled descriptor is never looked up
    assert_eq!(chain.diagnostics().len(), 1);
}

#[test]
fn test_version_mismatch_rejected() {
    let err = PipelineSettings::from_json_str(r#"{"Version": 7, "stages": []}"#).unwrap_err();
    assert!(err.to_string().contains('7'));
}

#[test]
fn test_argument_errors_name_the_stage() {
    let settings = PipelineSettings::new().with_stage(
        StageDescriptor::new("line_splitter").with_argument("max_length", "forty"),
    );
    match build(&settings) {
        Err(ConfigurationError::InvalidArgument {
            stage, argument, ..
        }) => {
            assert_eq!(stage, "line_splitter");
            assert_eq!(argument, "max_length");
        }
        other => panic!("expected an invalid argument error, got {:?}", other),
    }
}

#[test]
fn test_stage_order_matters() {
    let decimal_first = PipelineSettings::new()
        .with_stage(StageDescriptor::new("decimal").with_argument("precision", 0))
        .with_stage(StageDescriptor::new("command_length").with_argument("max_length", 8));
    let guard_first = PipelineSettings::new()
        .with_stage(StageDescriptor::new("command_length").with_argument("max_length", 8))
        .with_stage(StageDescriptor::new("decimal").with_argument("precision", 0));

    let line = "G1 X10.12345";
    assert_eq!(run(&build(&decimal_first).unwrap(), line), vec!["G1 X10"]);

    let err = build(&guard_first)
        .unwrap()
        .process(line, &ModalState::default())
        .unwrap_err();
    assert_eq!(err.stage.as_deref(), Some("command_length"));
}

#[test]
fn test_comment_stripping_is_idempotent() {
    let processor = CommentProcessor::new();
    let state = ModalState::default();
    for line in [
        "G0 X1 (rapid) Y2",
        "G1 X5 ; trailing",
        "(only a comment)",
        "G2 X1 (unclosed",
        "  M3 S1000  ",
        "",
    ] {
        let once = processor.process(line, &state).unwrap();
        let twice: Vec<String> = once
            .iter()
            .flat_map(|l| processor.process(l, &state).unwrap())
            .collect();
        assert_eq!(once, twice, "line {:?}", line);
    }
}

#[test]
fn test_spindle_delay_matching() {
    let processor = SpindleDelayProcessor::new(1.0);
    let state = ModalState::default();

    for line in [
        "M3",
        "m3",
        "M3 S1000",
        "m3 S1000",
        "(ignored) M3 S1000",
    ] {
        assert_eq!(
            processor.process(line, &state).unwrap(),
            vec![line.to_string(), "G4 P1".to_string()],
            "line {:?}",
            line
        );
    }

    for line in ["M30", "anything else", "G0 X0 Y0 (comment mentioning M3)"] {
        assert_eq!(
            processor.process(line, &state).unwrap(),
            vec![line.to_string()],
            "line {:?}",
            line
        );
    }
}

#[test]
fn test_length_guard_boundary() {
    let settings = PipelineSettings::new()
        .with_stage(StageDescriptor::new("command_length").with_argument("max_length", 5));
    let chain = build(&settings).unwrap();

    assert_eq!(run(&chain, "G0 X1"), vec!["G0 X1"]);
    let err = chain
        .process("G0 X12", &ModalState::default())
        .unwrap_err();
    assert_eq!(err.line, "G0 X12");
}
