//! Core domain types for document quality analysis.

mod capture;
mod category;
mod error;
mod mask;
mod metric;
mod profile;
mod result;
mod sla;

pub use capture::{bits_per_channel, ContainerFormat, Image, ImageMetadata};
pub use category::{Category, Polarity, Status};
pub use error::{ConfigError, LoadError};
pub use mask::{BoundingBox, DocumentMask, DOCUMENT};
pub use metric::{MetricComputer, MetricInput, MetricResult, ThresholdDescription};
pub use profile::{
    BorderParams, CategoryConfig, CategoryTable, ColorParams, CompletenessParams,
    ConfigurationProfile, ContrastParams, ExposureParams, ForeignObjectParams, FormatParams,
    GeometryParams, LocatorConfig, MetricParams, NoiseParams, ResolutionParams, ScoringConfig,
    ShadowParams, SharpnessParams, ThresholdMethod,
};
pub use result::{AnalysisResult, GlobalVerdict, ResultMetadata};
pub use sla::{
    ComplianceLevel, ComplianceResult, FailureBudget, PerformanceTargets, RequiredCategories,
    RequirementsMet, ScoreRequirement, SlaBatchSummary, SlaRequirement, SlaSection, Violation,
};
