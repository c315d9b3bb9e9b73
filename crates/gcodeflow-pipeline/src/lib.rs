//! # gcodeflow pipeline
//!
//! Configurable G-code stage pipeline: the built-in processors, the registry
//! that builds them from configuration, stage chains and the session driver.

pub mod gcode;

pub use gcode::{
    segment_count, ArcExpander, ArgumentKind, ArgumentSpec, BasicInterpreter, CancelToken,
    ChainDiagnostic, ChainManager, CommandBatch, CommandLengthProcessor, CommandProcessor,
    CommentProcessor, DecimalProcessor, EmptyLineRemoverProcessor, FeedOverride,
    FeedOverrideProcessor, LineSplitter, M30Processor, PatternRemover, PipelineDriver,
    ProcessorArguments, ProcessorFactory, ProcessorHandle, ProcessorRegistry, ScannedLine,
    SpindleDelayProcessor, StageChain, StageInfo, StateInterpreter, StateTracker, StreamError,
    StreamSummary, Transport, ValidationReport, WhitespaceMode, WhitespaceProcessor,
    WriterTransport, MAX_ARC_SEGMENTS,
};
