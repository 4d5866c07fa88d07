//! Analysis pipeline: locator, scoring, SLA, aggregation and batches.

mod aggregator;
mod batch;
mod locator;
pub mod scoring;
pub mod sla;

pub use aggregator::Analyzer;
pub use batch::{
    success_rate, worker_count, BatchFailure, BatchOptions, BatchProcessor, BatchReport,
    FailureKind, FailureStage, DECODED_BYTES_PER_PIXEL,
};
pub use locator::DocumentLocator;
pub use scoring::ScoringEngine;
pub use sla::SlaEvaluator;
