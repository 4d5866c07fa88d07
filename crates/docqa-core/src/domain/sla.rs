//! SLA requirement and compliance record types.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::{Category, Polarity};

/// A named set of minimum quality requirements.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SlaRequirement {
    /// Whether results are checked at all.
    pub enabled: bool,
    /// Display name.
    pub name: String,
    /// Free-form description.
    pub description: String,
    /// Minimum global score.
    pub min_overall_score: f64,
    /// Maximum number of FAIL categories.
    pub max_fail_categories: usize,
    /// Categories that must individually PASS.
    pub required_pass_categories: Vec<Category>,
    /// Categories whose primary measurement must meet the profile's pass
    /// threshold. Thresholds always come from the profile.
    pub performance_targets: Vec<Category>,
    /// Score at or above which a fully compliant result is excellent.
    pub excellent_min_score: f64,
    /// Score at or above which a non-compliant result is only a warning.
    pub warning_min_score: f64,
}

impl Default for SlaRequirement {
    fn default() -> Self {
        Self {
            enabled: true,
            name: "Custom Quality Standards".into(),
            description: "Quality evaluation based on profile thresholds".into(),
            min_overall_score: 0.75,
            max_fail_categories: 1,
            required_pass_categories: vec![
                Category::Completeness,
                Category::Sharpness,
                Category::Resolution,
            ],
            performance_targets: vec![
                Category::Sharpness,
                Category::Contrast,
                Category::Resolution,
                Category::Noise,
                Category::Geometry,
                Category::Exposure,
            ],
            excellent_min_score: 0.90,
            warning_min_score: 0.60,
        }
    }
}

/// Outcome classification of an SLA check, worst to best.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComplianceLevel {
    /// Below the warning floor with unmet requirements.
    NonCompliant,
    /// Some requirement unmet, score above the warning floor.
    Warning,
    /// All requirements met.
    Compliant,
    /// All requirements met with an excellent score.
    Excellent,
}

impl ComplianceLevel {
    /// Every level, best first.
    pub const ALL: [Self; 4] = [
        Self::Excellent,
        Self::Compliant,
        Self::Warning,
        Self::NonCompliant,
    ];

    /// snake_case name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::NonCompliant => "non_compliant",
            Self::Warning => "warning",
            Self::Compliant => "compliant",
            Self::Excellent => "excellent",
        }
    }

    /// Human description of the level.
    #[must_use]
    pub const fn description(self) -> &'static str {
        match self {
            Self::Excellent => "Exceeds all quality requirements",
            Self::Compliant => "Meets all quality requirements",
            Self::Warning => "Some quality requirements are not met",
            Self::NonCompliant => "Does not meet quality requirements",
        }
    }

    /// Whether the level counts towards a batch compliance rate.
    #[must_use]
    pub const fn is_compliant(self) -> bool {
        matches!(self, Self::Compliant | Self::Excellent)
    }
}

impl fmt::Display for ComplianceLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Minimum-score check.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreRequirement {
    /// Required score.
    pub required: f64,
    /// Actual global score.
    pub actual: f64,
    /// Whether `actual >= required`.
    pub compliant: bool,
}

/// Failing-category budget check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureBudget {
    /// Allowed FAIL categories.
    pub max_allowed: usize,
    /// Observed FAIL categories.
    pub actual: usize,
    /// Whether `actual <= max_allowed`.
    pub compliant: bool,
}

/// Required-pass category check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequiredCategories {
    /// Categories that must pass.
    pub required: Vec<Category>,
    /// Required categories that did not pass.
    pub violations: Vec<Category>,
    /// Whether there are no violations.
    pub compliant: bool,
}

/// Performance-target check.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceTargets {
    /// Violations inside targeted categories.
    pub violations: Vec<Violation>,
    /// Whether no targeted category missed its threshold.
    pub compliant: bool,
}

/// Per-requirement outcomes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequirementsMet {
    /// Minimum global score.
    pub minimum_score: ScoreRequirement,
    /// Maximum failing categories.
    pub category_failures: FailureBudget,
    /// Categories that must pass.
    pub required_categories: RequiredCategories,
    /// Per-measurement thresholds.
    pub performance_targets: PerformanceTargets,
}

impl RequirementsMet {
    /// Whether every requirement is satisfied.
    #[must_use]
    pub const fn all(&self) -> bool {
        self.minimum_score.compliant
            && self.category_failures.compliant
            && self.required_categories.compliant
            && self.performance_targets.compliant
    }
}

/// A category measurement that missed the profile threshold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Violation {
    /// Offending category.
    pub category: Category,
    /// Name of the primary measurement.
    pub measurement: String,
    /// Profile pass threshold.
    pub required: f64,
    /// Measured value, if one was produced.
    pub actual: Option<f64>,
    /// Direction of the comparison.
    pub polarity: Polarity,
    /// Human-readable summary.
    pub description: String,
}

/// SLA verdict for one analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComplianceResult {
    /// Compliance classification.
    pub level: ComplianceLevel,
    /// Description of the level.
    pub description: String,
    /// Whether every requirement is met.
    pub overall_compliant: bool,
    /// Score the verdict was computed from.
    pub score: f64,
    /// Per-requirement outcomes.
    pub requirements_met: RequirementsMet,
    /// Every FAIL category with its required vs. actual values.
    pub violations: Vec<Violation>,
}

/// SLA block of an analysis result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlaSection {
    /// Whether the SLA was evaluated.
    pub enabled: bool,
    /// Name of the SLA.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sla_name: Option<String>,
    /// Compliance verdict when enabled.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub compliance: Option<ComplianceResult>,
    /// SLA-specific recommendations.
    pub recommendations: Vec<String>,
}

impl SlaSection {
    /// Section for an analysis that skipped SLA evaluation.
    #[must_use]
    pub const fn disabled() -> Self {
        Self {
            enabled: false,
            sla_name: None,
            compliance: None,
            recommendations: Vec::new(),
        }
    }
}

/// SLA statistics across a batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlaBatchSummary {
    /// Name of the SLA.
    pub sla_name: String,
    /// Results that carried an SLA verdict.
    pub total_analyzed: usize,
    /// Percentage of compliant or excellent results.
    pub overall_compliance_rate: f64,
    /// Count per level.
    pub compliance_breakdown: BTreeMap<ComplianceLevel, usize>,
    /// Percentage per level.
    pub compliance_percentages: BTreeMap<ComplianceLevel, f64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_levels_order_worst_to_best() {
        assert!(ComplianceLevel::NonCompliant < ComplianceLevel::Warning);
        assert!(ComplianceLevel::Warning < ComplianceLevel::Compliant);
        assert!(ComplianceLevel::Compliant < ComplianceLevel::Excellent);
    }

    #[test]
    fn test_default_requirement() {
        let sla = SlaRequirement::default();
        assert!((sla.min_overall_score - 0.75).abs() < f64::EPSILON);
        assert_eq!(sla.max_fail_categories, 1);
        assert!(sla.required_pass_categories.contains(&Category::Completeness));
        assert!(sla.warning_min_score <= sla.min_overall_score);
    }

    #[test]
    fn test_disabled_section() {
        let section = SlaSection::disabled();
        assert!(!section.enabled);
        assert!(section.compliance.is_none());
    }
}
