//! Batch processing over an image source.
//!
//! Images are analyzed on a dedicated, bounded rayon pool. One image failing
//! to load, panicking or running past its timeout never stops the batch.
//!
//! Timeouts are cooperative. An image past its deadline starts no further
//! computers and its result is discarded, but a computer already running
//! finishes first. Nothing outlives the pool.

#![allow(clippy::cast_precision_loss)]

use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use rayon::iter::{ParallelBridge, ParallelIterator};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use super::aggregator::iso_timestamp;
use super::sla::batch_summary;
use super::Analyzer;
use crate::domain::{AnalysisResult, Image, LoadError, SlaBatchSummary};
use crate::ports::{ImageSource, ProgressEvent, ProgressSink, ResultOutput};

/// Bytes per decoded pixel times the working copies held during analysis.
pub const DECODED_BYTES_PER_PIXEL: u64 = 4 * 3;

/// Pipeline stage an image failed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureStage {
    /// Reading or decoding the file.
    Load,
    /// Running the analysis.
    Analysis,
}

/// Kind of batch failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// The file could not be read.
    Io,
    /// The container is not supported.
    UnsupportedFormat,
    /// The file is damaged.
    Decode,
    /// Analysis exceeded the per-image timeout.
    Timeout,
    /// Analysis panicked.
    Panic,
}

/// One image that produced no result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchFailure {
    /// Path or identifier of the image.
    pub filename: String,
    /// Stage the failure happened in.
    pub stage: FailureStage,
    /// Kind of failure.
    pub error_type: FailureKind,
    /// Human-readable reason.
    pub error_reason: String,
    /// When the failure was recorded (RFC 3339, UTC).
    pub timestamp: String,
}

impl BatchFailure {
    fn analysis(filename: &str, error_type: FailureKind, reason: impl Into<String>) -> Self {
        Self {
            filename: filename.to_string(),
            stage: FailureStage::Analysis,
            error_type,
            error_reason: reason.into(),
            timestamp: iso_timestamp(),
        }
    }
}

impl From<&LoadError> for BatchFailure {
    fn from(err: &LoadError) -> Self {
        let error_type = match err {
            LoadError::Io { .. } => FailureKind::Io,
            LoadError::UnsupportedFormat { .. } => FailureKind::UnsupportedFormat,
            LoadError::Decode { .. } => FailureKind::Decode,
        };
        Self {
            filename: err.path().to_string(),
            stage: FailureStage::Load,
            error_type,
            error_reason: err.to_string(),
            timestamp: iso_timestamp(),
        }
    }
}

/// Outcome of a batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchReport {
    /// Results in source order.
    pub results: Vec<AnalysisResult>,
    /// Images without a result, in source order.
    pub failures: Vec<BatchFailure>,
    /// Percentage of images that produced a result, one decimal.
    pub success_rate: f64,
    /// SLA statistics over the results, when any carried a verdict.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sla_summary: Option<SlaBatchSummary>,
    /// Whether the batch stopped early.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub cancelled: bool,
}

impl BatchReport {
    /// Writes every result in source order, then flushes once.
    ///
    /// # Errors
    ///
    /// Returns the first write or flush error.
    pub fn write_to(&self, output: &dyn ResultOutput) -> anyhow::Result<()> {
        for result in &self.results {
            output.write(result)?;
        }
        output.flush()
    }
}

/// Batch settings.
#[derive(Debug, Clone)]
pub struct BatchOptions {
    /// Upper bound on concurrent images.
    pub max_workers: usize,
    /// Memory available for decoded images, in bytes.
    pub memory_budget_bytes: Option<u64>,
    /// Per-image analysis timeout.
    pub timeout: Option<Duration>,
    /// Set to stop before the next image starts.
    pub cancel: Arc<AtomicBool>,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            max_workers: std::thread::available_parallelism().map_or(1, usize::from),
            memory_budget_bytes: None,
            timeout: None,
            cancel: Arc::new(AtomicBool::new(false)),
        }
    }
}

/// Number of images analyzed concurrently.
///
/// Bounded by `max_workers` and by how many of the largest decoded images
/// fit in the memory budget. Never below 1.
#[must_use]
pub fn worker_count(max_workers: usize, budget: Option<u64>, largest_image: Option<u64>) -> usize {
    let by_memory = match (budget, largest_image) {
        (Some(budget), Some(largest)) if largest > 0 => {
            usize::try_from(budget / largest).unwrap_or(usize::MAX)
        }
        _ => usize::MAX,
    };
    max_workers.min(by_memory).max(1)
}

/// `succeeded / (succeeded + failed)` as a percentage rounded to one
/// decimal. An empty batch has a rate of 0.
#[must_use]
pub fn success_rate(succeeded: usize, failed: usize) -> f64 {
    let total = succeeded + failed;
    if total == 0 {
        return 0.0;
    }
    (succeeded as f64 / total as f64 * 1000.0).round() / 10.0
}

enum Outcome {
    Analyzed(Box<AnalysisResult>),
    Failed(BatchFailure),
}

/// Runs an [`Analyzer`] over every image of a source.
pub struct BatchProcessor {
    analyzer: Analyzer,
    options: BatchOptions,
}

impl BatchProcessor {
    /// Creates a processor.
    #[must_use]
    pub fn new(analyzer: Analyzer, options: BatchOptions) -> Self {
        Self { analyzer, options }
    }

    /// Analyzer used for every image.
    #[must_use]
    pub fn analyzer(&self) -> &Analyzer {
        &self.analyzer
    }

    /// Processes every image of `source`, reporting progress as it goes.
    ///
    /// Results and failures are returned in source order regardless of the
    /// order in which workers finished.
    #[instrument(skip_all, fields(total = ?source.count_hint()))]
    pub fn run(&self, source: &dyn ImageSource, progress: &dyn ProgressSink) -> BatchReport {
        let workers = worker_count(
            self.options.max_workers,
            self.options.memory_budget_bytes,
            source.largest_image_bytes(),
        );
        info!(workers, "starting batch");
        let total = source.count_hint();

        let mut outcomes = match rayon::ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|i| format!("docqa-worker-{i}"))
            .build()
        {
            Ok(pool) => pool.install(|| {
                source
                    .images()
                    .enumerate()
                    .par_bridge()
                    .filter_map(|(index, item)| self.process(index, total, item, progress))
                    .collect::<Vec<_>>()
            }),
            Err(e) => {
                warn!("worker pool unavailable, running sequentially: {e}");
                source
                    .images()
                    .enumerate()
                    .filter_map(|(index, item)| self.process(index, total, item, progress))
                    .collect()
            }
        };
        outcomes.sort_by_key(|(index, _)| *index);

        let mut results = Vec::new();
        let mut failures = Vec::new();
        for (_, outcome) in outcomes {
            match outcome {
                Outcome::Analyzed(result) => results.push(*result),
                Outcome::Failed(failure) => failures.push(failure),
            }
        }

        progress.on_event(ProgressEvent::Finished {
            processed: results.len(),
            failed: failures.len(),
        });
        let sla = self.analyzer.sla();
        let sla_summary = if sla.enabled() {
            batch_summary(&sla.requirement().name, &results)
        } else {
            None
        };
        let cancelled = self.options.cancel.load(Ordering::Relaxed);
        info!(
            processed = results.len(),
            failed = failures.len(),
            cancelled,
            "batch finished"
        );

        BatchReport {
            success_rate: success_rate(results.len(), failures.len()),
            results,
            failures,
            sla_summary,
            cancelled,
        }
    }

    fn process(
        &self,
        index: usize,
        total: Option<usize>,
        item: Result<Image, LoadError>,
        progress: &dyn ProgressSink,
    ) -> Option<(usize, Outcome)> {
        if self.options.cancel.load(Ordering::Relaxed) {
            debug!(index, "cancelled, skipping");
            return None;
        }
        let image = match item {
            Ok(image) => image,
            Err(err) => {
                warn!(path = err.path(), "failed to load: {err}");
                let failure = BatchFailure::from(&err);
                progress.on_event(ProgressEvent::Failed {
                    failure: failure.clone(),
                });
                return Some((index, Outcome::Failed(failure)));
            }
        };

        progress.on_event(ProgressEvent::Started {
            source_id: image.source_id.clone(),
            index,
            total,
        });
        let outcome = match self.analyze(&image) {
            Ok(result) => {
                progress.on_event(ProgressEvent::Completed {
                    result: Box::new(result.clone()),
                });
                Outcome::Analyzed(Box::new(result))
            }
            Err(failure) => {
                warn!(
                    file = %failure.filename,
                    kind = ?failure.error_type,
                    "analysis failed: {}",
                    failure.error_reason
                );
                progress.on_event(ProgressEvent::Failed {
                    failure: failure.clone(),
                });
                Outcome::Failed(failure)
            }
        };
        Some((index, outcome))
    }

    fn analyze(&self, image: &Image) -> Result<AnalysisResult, BatchFailure> {
        let timeout = self.options.timeout;
        let deadline = timeout.and_then(|t| Instant::now().checked_add(t));
        let outcome = catch_unwind(AssertUnwindSafe(|| match deadline {
            Some(deadline) => self.analyzer.analyze_until(image, deadline),
            None => Some(self.analyzer.analyze(image)),
        }));
        match outcome {
            Ok(Some(result)) => Ok(result),
            Ok(None) => Err(BatchFailure::analysis(
                &image.source_id,
                FailureKind::Timeout,
                format!(
                    "analysis exceeded {} ms",
                    timeout.map_or(0, |t| t.as_millis())
                ),
            )),
            Err(payload) => Err(BatchFailure::analysis(
                &image.source_id,
                FailureKind::Panic,
                panic_message(&*payload),
            )),
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| (*s).to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "analysis panicked".to_string())
}
