//! Pipeline driver
//!
//! Runs one session: every input line goes through the stage chain with the
//! modal state in effect for it, the original line is committed to the state
//! tracker, and the resulting batch goes to the transport.
//!
//! Two modes:
//! - live ([`PipelineDriver::stream`]): the job stops at the first error
//! - offline ([`PipelineDriver::validate`]): every line is processed and the
//!   errors are collected in a [`ValidationReport`]

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use gcodeflow_core::{ModalState, ProcessError, TransportError};
use thiserror::Error;

use super::pipeline::StageChain;
use super::processor::CommandBatch;
use super::tracker::StateTracker;
use super::transport::Transport;

/// Cooperative cancellation flag, checked between lines
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request that the job stop before its next line
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Why a live job stopped early
#[derive(Error, Debug)]
pub enum StreamError {
    /// A stage rejected a line
    #[error("{0}")]
    Process(#[from] ProcessError),

    /// The downstream transport failed
    #[error(transparent)]
    Transport(#[from] TransportError),
}

/// Counters for a finished live job
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StreamSummary {
    /// Input lines consumed
    pub lines_read: usize,
    /// Commands handed to the transport
    pub commands_sent: usize,
    /// Input lines that produced no command
    pub lines_dropped: usize,
    /// The job was cancelled before the input ended
    pub cancelled: bool,
}

/// Result of an offline run
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValidationReport {
    /// Input lines processed
    pub lines_checked: usize,
    /// Commands the chain produced for the lines that succeeded
    pub commands_emitted: usize,
    /// Every failure, in input order
    pub errors: Vec<ProcessError>,
}

impl ValidationReport {
    /// True when no line failed
    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Drives input lines through a stage chain
#[derive(Debug)]
pub struct PipelineDriver {
    chain: Arc<StageChain>,
    tracker: StateTracker,
    line_number: usize,
}

impl PipelineDriver {
    /// Driver starting from power-on modal state
    pub fn new(chain: Arc<StageChain>) -> Self {
        Self::with_tracker(chain, StateTracker::new())
    }

    /// Driver with an explicit tracker (initial state and interpreter)
    pub fn with_tracker(chain: Arc<StageChain>, tracker: StateTracker) -> Self {
        Self {
            chain,
            tracker,
            line_number: 0,
        }
    }

    /// Modal state the next line will execute in
    pub fn state(&self) -> &ModalState {
        self.tracker.state()
    }

    /// The chain this session runs
    pub fn chain(&self) -> &StageChain {
        &self.chain
    }

    /// Number of input lines processed so far
    pub fn lines_processed(&self) -> usize {
        self.line_number
    }

    /// Run one input line through the chain
    ///
    /// The state tracker commits the original line afterwards whether or not
    /// a stage failed; the modal state follows the program as written.
    pub fn process_line(&mut self, line: &str) -> Result<CommandBatch, ProcessError> {
        self.line_number += 1;
        let result = self
            .chain
            .process_with(line, self.tracker.state(), self.tracker.interpreter())
            .map_err(|e| e.at_line(self.line_number));
        self.tracker.commit(line);
        result
    }

    /// Live mode: send every batch to `transport`, stopping at the first error
    ///
    /// `cancel` is checked before each line; a batch already started is always
    /// delivered whole.
    pub fn stream<I, S, T>(
        &mut self,
        lines: I,
        transport: &mut T,
        cancel: &CancelToken,
    ) -> Result<StreamSummary, StreamError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
        T: Transport + ?Sized,
    {
        let mut summary = StreamSummary::default();

        for line in lines {
            if cancel.is_cancelled() {
                tracing::info!("Job cancelled after {} lines", summary.lines_read);
                summary.cancelled = true;
                break;
            }

            let batch = match self.process_line(line.as_ref()) {
                Ok(batch) => batch,
                Err(e) => {
                    tracing::warn!("Job aborted: {}", e);
                    return Err(e.into());
                }
            };
            summary.lines_read += 1;

            if batch.is_empty() {
                summary.lines_dropped += 1;
                continue;
            }
            transport.send_batch(&batch)?;
            summary.commands_sent += batch.len();
        }

        tracing::debug!(
            "Streamed {} lines as {} commands",
            summary.lines_read,
            summary.commands_sent
        );
        Ok(summary)
    }

    /// Offline mode: process every line and report all failures
    pub fn validate<I, S>(&mut self, lines: I) -> ValidationReport
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut report = ValidationReport::default();

        for line in lines {
            report.lines_checked += 1;
            match self.process_line(line.as_ref()) {
                Ok(batch) => report.commands_emitted += batch.len(),
                Err(e) => report.errors.push(e),
            }
        }

        if !report.is_ok() {
            tracing::info!(
                "Validation found {} failing lines out of {}",
                report.errors.len(),
                report.lines_checked
            );
        }
        report
    }
}
