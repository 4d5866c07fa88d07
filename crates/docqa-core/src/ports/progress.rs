//! Batch progress notifications.

use crate::domain::AnalysisResult;
use crate::pipeline::BatchFailure;

/// Events emitted during batch analysis.
#[derive(Debug, Clone)]
pub enum ProgressEvent {
    /// Analysis started for an image.
    Started {
        /// Source identifier.
        source_id: String,
        /// Index in the batch (0-based).
        index: usize,
        /// Total images in batch, if known.
        total: Option<usize>,
    },
    /// Analysis completed for an image.
    Completed {
        /// The analysis result.
        result: Box<AnalysisResult>,
    },
    /// An image could not be loaded or analyzed.
    Failed {
        /// What went wrong.
        failure: BatchFailure,
    },
    /// All images have been processed.
    Finished {
        /// Images analyzed successfully.
        processed: usize,
        /// Images that failed.
        failed: usize,
    },
}

/// Receives batch events, possibly from several worker threads at once.
pub trait ProgressSink: Send + Sync {
    /// Handles one event. Must not block for long; workers wait on it.
    fn on_event(&self, event: ProgressEvent);
}
