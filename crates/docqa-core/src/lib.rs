//! docqa core - domain logic, metric computers and scoring
//!
//! This crate contains the domain types, the metric computer trait with its
//! twelve category implementations, the document locator, the scoring and
//! SLA engines and the batch processor. It performs no filesystem access.

pub mod domain;
pub mod modules;
pub mod pipeline;
pub mod ports;

pub use domain::{
    AnalysisResult, Category, CategoryConfig, ComplianceLevel, ComplianceResult, ConfigError,
    ConfigurationProfile, ContainerFormat, DocumentMask, GlobalVerdict, Image, ImageMetadata,
    LoadError, MetricComputer, MetricResult, Polarity, SlaRequirement, Status,
};
pub use modules::MetricRegistry;
pub use pipeline::{
    Analyzer, BatchFailure, BatchOptions, BatchProcessor, BatchReport, DocumentLocator,
    FailureKind, FailureStage, ScoringEngine, SlaEvaluator,
};
pub use ports::{ImageSource, ProgressEvent, ProgressSink, ResultOutput};
