//! G-Code command processor implementations
//!
//! - Text filters: whitespace, comments, empty lines, regex removal
//! - Validators: command length guard
//! - Rewriters: decimal truncation, feed override
//! - Inserters: spindle delay; removers: program end
//! - Geometric transformers: arc expansion, line splitting

mod arc_expander;
mod line_splitter;
mod rewrite;
mod segments;
mod spindle_delay;
mod text;

pub use arc_expander::{segment_count, ArcExpander, MAX_ARC_SEGMENTS};
pub use line_splitter::LineSplitter;
pub use rewrite::{DecimalProcessor, FeedOverride, FeedOverrideProcessor};
pub use spindle_delay::SpindleDelayProcessor;
pub use text::{
    CommandLengthProcessor, CommentProcessor, EmptyLineRemoverProcessor, M30Processor,
    PatternRemover, WhitespaceMode, WhitespaceProcessor,
};

use super::processor::CommandBatch;

/// Drop the command when nothing but whitespace is left
fn keep_unless_blank(text: String) -> CommandBatch {
    if text.trim().is_empty() {
        vec![]
    } else {
        vec![text]
    }
}
