//! G-Code stage pipeline
//!
//! This module provides:
//! - Line scanning and word rewriting
//! - Modal state tracking
//! - The processor trait and the built-in processors
//! - Processor registry and stage chains
//! - The driver that feeds a chain and its transport

pub mod driver;
pub mod motion;
pub mod pipeline;
pub mod processor;
pub mod processors;
pub mod registry;
pub mod scanner;
pub mod tracker;
pub mod transport;

pub use driver::{CancelToken, PipelineDriver, StreamError, StreamSummary, ValidationReport};
pub use motion::{LineModes, Move};
pub use pipeline::{ChainDiagnostic, ChainManager, StageChain};
pub use processor::{
    ArgumentKind, ArgumentSpec, CommandBatch, CommandProcessor, ProcessorArguments,
    ProcessorHandle,
};
pub use processors::*;
pub use registry::{ProcessorFactory, ProcessorRegistry, StageInfo};
pub use scanner::{ScannedLine, Token, TokenKind, Word};
pub use tracker::{BasicInterpreter, StateInterpreter, StateTracker};
pub use transport::{Transport, WriterTransport};
