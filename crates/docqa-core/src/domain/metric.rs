//! Per-category measurement results and the metric computer trait.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::{Category, CategoryConfig, DocumentMask, Image, Polarity, Status};

/// Outcome of one category for one image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricResult {
    /// Category measured.
    pub category: Category,
    /// Normalized score derived from the status.
    pub score: f64,
    /// Tri-state outcome.
    pub status: Status,
    /// Name of the measurement the status was derived from.
    pub primary_measurement: String,
    /// Named measurements, ordered by name.
    pub measurements: BTreeMap<String, f64>,
    /// Category-specific remediation hints.
    pub recommendations: Vec<String>,
    /// Why the category could not be measured normally.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diagnostic: Option<String>,
    /// Whether the failure lies in the extreme band.
    pub beyond_fail_threshold: bool,
}

impl MetricResult {
    /// Classifies `value` against `config` and records it as the primary
    /// measurement.
    #[must_use]
    pub fn measured(
        category: Category,
        config: &CategoryConfig,
        primary: &str,
        value: f64,
    ) -> Self {
        let status = config.classify(value);
        let mut measurements = BTreeMap::new();
        measurements.insert(primary.to_string(), value);
        Self {
            category,
            score: status.score(),
            status,
            primary_measurement: primary.to_string(),
            measurements,
            recommendations: Vec::new(),
            diagnostic: None,
            beyond_fail_threshold: status == Status::Fail && config.is_extreme(value),
        }
    }

    /// A FAIL in the extreme band for a category that could not be measured.
    #[must_use]
    pub fn unmeasurable(category: Category, primary: &str, diagnostic: impl Into<String>) -> Self {
        Self {
            category,
            score: Status::Fail.score(),
            status: Status::Fail,
            primary_measurement: primary.to_string(),
            measurements: BTreeMap::new(),
            recommendations: Vec::new(),
            diagnostic: Some(diagnostic.into()),
            beyond_fail_threshold: true,
        }
    }

    /// Adds a secondary measurement.
    #[must_use]
    pub fn with(mut self, name: &str, value: f64) -> Self {
        self.measurements.insert(name.to_string(), value);
        self
    }

    /// Lowers the status to `status` if that is worse.
    #[must_use]
    pub fn degrade(mut self, status: Status) -> Self {
        self.status = self.status.worst(status);
        self.score = self.status.score();
        self
    }

    /// Forces a FAIL in the extreme band.
    #[must_use]
    pub fn fail_extreme(mut self) -> Self {
        self.status = Status::Fail;
        self.score = Status::Fail.score();
        self.beyond_fail_threshold = true;
        self
    }

    /// Attaches a diagnostic.
    #[must_use]
    pub fn with_diagnostic(mut self, diagnostic: impl Into<String>) -> Self {
        self.diagnostic = Some(diagnostic.into());
        self
    }

    /// Appends a recommendation.
    #[must_use]
    pub fn recommend(mut self, text: impl Into<String>) -> Self {
        self.recommendations.push(text.into());
        self
    }

    /// Value of the primary measurement, if one was produced.
    #[must_use]
    pub fn primary_value(&self) -> Option<f64> {
        self.measurements.get(&self.primary_measurement).copied()
    }

    /// Named measurement.
    #[must_use]
    pub fn measurement(&self, name: &str) -> Option<f64> {
        self.measurements.get(name).copied()
    }
}

/// Threshold summary of a computer's primary measurement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThresholdDescription {
    /// Category described.
    pub category: Category,
    /// Primary measurement name.
    pub measurement: String,
    /// Direction of improvement.
    pub polarity: Polarity,
    /// Pass threshold.
    pub pass: f64,
    /// Warn threshold.
    pub warn: f64,
    /// Extreme-band bound.
    pub fail: f64,
}

/// Read-only view handed to every computer.
#[derive(Debug, Clone, Copy)]
pub struct MetricInput<'a> {
    /// Decoded capture.
    pub image: &'a Image,
    /// Located document region.
    pub mask: &'a DocumentMask,
}

/// Trait implemented by all twelve category computers.
///
/// Computers are built from a profile and keep only their own category's
/// configuration. `analyze` never fails: a computer that cannot measure
/// returns FAIL with a diagnostic.
pub trait MetricComputer: Send + Sync {
    /// Category this computer measures.
    fn category(&self) -> Category;

    /// Name of the measurement the status is derived from.
    fn primary_measurement(&self) -> &'static str;

    /// Thresholds this computer classifies against.
    fn config(&self) -> &CategoryConfig;

    /// Measures the image.
    fn analyze(&self, input: &MetricInput<'_>) -> MetricResult;

    /// Describes the primary measurement's thresholds.
    fn describe_thresholds(&self) -> ThresholdDescription {
        let config = self.config();
        ThresholdDescription {
            category: self.category(),
            measurement: self.primary_measurement().to_string(),
            polarity: config.polarity,
            pass: config.pass_threshold,
            warn: config.warn_threshold,
            fail: config.fail_threshold(),
        }
    }

    /// Primary-measurement result for `value`.
    fn classify(&self, value: f64) -> MetricResult {
        MetricResult::measured(
            self.category(),
            self.config(),
            self.primary_measurement(),
            value,
        )
    }

    /// FAIL result for a computer that could not measure.
    fn unmeasurable(&self, diagnostic: &str) -> MetricResult {
        MetricResult::unmeasurable(self.category(), self.primary_measurement(), diagnostic)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_measured_classifies_and_flags_extreme() {
        let config = CategoryConfig::lower(1.0, 3.0).with_fail(3.0);
        let result = MetricResult::measured(Category::Geometry, &config, "skew_angle", 5.0);
        assert_eq!(result.status, Status::Fail);
        assert!(result.beyond_fail_threshold);
        assert_eq!(result.primary_value(), Some(5.0));

        let result = MetricResult::measured(Category::Geometry, &config, "skew_angle", 2.0);
        assert_eq!(result.status, Status::Warn);
        assert!(!result.beyond_fail_threshold);
        assert!((result.score - 0.75).abs() < f64::EPSILON);
    }

    #[test]
    fn test_degrade_only_lowers() {
        let config = CategoryConfig::higher(0.5, 0.2);
        let result = MetricResult::measured(Category::Contrast, &config, "c", 0.3)
            .degrade(Status::Pass);
        assert_eq!(result.status, Status::Warn);
        let result = result.degrade(Status::Fail);
        assert_eq!(result.status, Status::Fail);
        assert!(result.score.abs() < f64::EPSILON);
    }

    #[test]
    fn test_unmeasurable_is_extreme_fail() {
        let result = MetricResult::unmeasurable(Category::Noise, "noise_std", "no document");
        assert_eq!(result.status, Status::Fail);
        assert!(result.beyond_fail_threshold);
        assert_eq!(result.primary_value(), None);
        assert_eq!(result.diagnostic.as_deref(), Some("no document"));
    }
}
