//! SLA compliance evaluation.
//!
//! Requirements are checked against the profile's own category thresholds.

#![allow(clippy::cast_precision_loss)]

use std::collections::BTreeMap;

use crate::domain::{
    AnalysisResult, Category, CategoryTable, ComplianceLevel, ComplianceResult,
    ConfigurationProfile, FailureBudget, GlobalVerdict, MetricResult, PerformanceTargets,
    Polarity, RequiredCategories, RequirementsMet, ScoreRequirement, SlaBatchSummary,
    SlaRequirement, SlaSection, Status, Violation,
};

/// Violations listed individually in SLA recommendations.
const MAX_LISTED_VIOLATIONS: usize = 3;

/// Checks analysis results against an SLA requirement.
#[derive(Debug, Clone)]
pub struct SlaEvaluator {
    requirement: SlaRequirement,
    categories: CategoryTable,
}

impl SlaEvaluator {
    /// Evaluator for the profile's SLA.
    #[must_use]
    pub fn new(profile: &ConfigurationProfile) -> Self {
        Self::with_requirement(profile.sla.clone(), profile)
    }

    /// Evaluator for an explicit requirement, reading thresholds from
    /// `profile`.
    #[must_use]
    pub fn with_requirement(requirement: SlaRequirement, profile: &ConfigurationProfile) -> Self {
        Self {
            requirement,
            categories: profile.categories.clone(),
        }
    }

    /// Whether results are checked at all.
    #[must_use]
    pub const fn enabled(&self) -> bool {
        self.requirement.enabled
    }

    /// The requirement being checked.
    #[must_use]
    pub const fn requirement(&self) -> &SlaRequirement {
        &self.requirement
    }

    /// Evaluates a finished analysis.
    #[must_use]
    pub fn evaluate_result(&self, result: &AnalysisResult) -> ComplianceResult {
        self.evaluate(&result.global, &result.metrics)
    }

    /// Evaluates a verdict and its category results.
    #[must_use]
    pub fn evaluate(
        &self,
        global: &GlobalVerdict,
        metrics: &BTreeMap<Category, MetricResult>,
    ) -> ComplianceResult {
        let req = &self.requirement;
        let score = global.score;

        let minimum_score = ScoreRequirement {
            required: req.min_overall_score,
            actual: score,
            compliant: score >= req.min_overall_score,
        };

        let fails = metrics
            .values()
            .filter(|m| m.status == Status::Fail)
            .count();
        let category_failures = FailureBudget {
            max_allowed: req.max_fail_categories,
            actual: fails,
            compliant: fails <= req.max_fail_categories,
        };

        let missing: Vec<Category> = req
            .required_pass_categories
            .iter()
            .copied()
            .filter(|c| metrics.get(c).map(|m| m.status) != Some(Status::Pass))
            .collect();
        let required_categories = RequiredCategories {
            required: req.required_pass_categories.clone(),
            compliant: missing.is_empty(),
            violations: missing,
        };

        let violations: Vec<Violation> = metrics
            .values()
            .filter(|m| m.status == Status::Fail)
            .map(|m| self.violation(m))
            .collect();
        let targeted: Vec<Violation> = violations
            .iter()
            .filter(|v| req.performance_targets.contains(&v.category))
            .cloned()
            .collect();
        let targeted_warn = req
            .performance_targets
            .iter()
            .any(|c| metrics.get(c).is_some_and(|m| m.status == Status::Warn));
        let performance_targets = PerformanceTargets {
            compliant: targeted.is_empty() && !targeted_warn,
            violations: targeted,
        };

        let requirements_met = RequirementsMet {
            minimum_score,
            category_failures,
            required_categories,
            performance_targets,
        };
        let overall_compliant = requirements_met.all();
        let level = self.level(overall_compliant, score);

        ComplianceResult {
            level,
            description: level.description().to_string(),
            overall_compliant,
            score,
            requirements_met,
            violations,
        }
    }

    fn level(&self, all_met: bool, score: f64) -> ComplianceLevel {
        if all_met && score >= self.requirement.excellent_min_score {
            ComplianceLevel::Excellent
        } else if all_met {
            ComplianceLevel::Compliant
        } else if score >= self.requirement.warning_min_score {
            ComplianceLevel::Warning
        } else {
            ComplianceLevel::NonCompliant
        }
    }

    fn violation(&self, metric: &MetricResult) -> Violation {
        let config = self.categories.get(metric.category);
        let actual = metric.primary_value();
        let required = config.pass_threshold;
        let (op, cmp) = match config.polarity {
            Polarity::HigherIsBetter => (">=", "<"),
            Polarity::LowerIsBetter => ("<=", ">"),
        };
        let description = match (actual, metric.diagnostic.as_deref()) {
            (Some(v), _) if config.classify(v) != Status::Fail => format!(
                "{}: {} failed a structural check ({})",
                metric.category,
                metric.primary_measurement,
                metric.diagnostic.as_deref().unwrap_or("see diagnostics"),
            ),
            (Some(v), _) => format!(
                "{}: {} {v:.3} {cmp} {required} (required {op} {required})",
                metric.category, metric.primary_measurement
            ),
            (None, Some(diagnostic)) => format!(
                "{}: {} not measured ({diagnostic})",
                metric.category, metric.primary_measurement
            ),
            (None, None) => format!(
                "{}: {} not measured",
                metric.category, metric.primary_measurement
            ),
        };
        Violation {
            category: metric.category,
            measurement: metric.primary_measurement.clone(),
            required,
            actual,
            polarity: config.polarity,
            description,
        }
    }

    /// Remediation text naming each unmet requirement.
    #[must_use]
    pub fn recommendations(&self, compliance: &ComplianceResult) -> Vec<String> {
        let met = &compliance.requirements_met;
        if met.all() {
            return vec!["All SLA requirements met".to_string()];
        }
        let mut out = Vec::new();
        if !met.minimum_score.compliant {
            out.push(format!(
                "SLA requirement: reach an overall score of at least {:.0}%",
                met.minimum_score.required * 100.0
            ));
        }
        if !met.category_failures.compliant {
            out.push(format!(
                "SLA requirement: reduce failing categories to {} or fewer",
                met.category_failures.max_allowed
            ));
        }
        if !met.required_categories.compliant {
            let names: Vec<&str> = met
                .required_categories
                .violations
                .iter()
                .map(|c| c.as_str())
                .collect();
            out.push(format!(
                "SLA requirement: these categories must pass: {}",
                names.join(", ")
            ));
        }
        if !met.performance_targets.compliant {
            out.extend(
                met.performance_targets
                    .violations
                    .iter()
                    .take(MAX_LISTED_VIOLATIONS)
                    .map(|v| format!("SLA target: {}", v.description)),
            );
        }
        out
    }

    /// SLA block for a verdict, or a disabled block when the SLA is off.
    #[must_use]
    pub fn section(
        &self,
        global: &GlobalVerdict,
        metrics: &BTreeMap<Category, MetricResult>,
    ) -> SlaSection {
        if !self.enabled() {
            return SlaSection::disabled();
        }
        let compliance = self.evaluate(global, metrics);
        SlaSection {
            enabled: true,
            sla_name: Some(self.requirement.name.clone()),
            recommendations: self.recommendations(&compliance),
            compliance: Some(compliance),
        }
    }
}

/// Compliance statistics over results that carry an SLA verdict.
///
/// Returns `None` when no result was evaluated.
#[must_use]
pub fn batch_summary<'a>(
    sla_name: &str,
    results: impl IntoIterator<Item = &'a AnalysisResult>,
) -> Option<SlaBatchSummary> {
    let levels: Vec<ComplianceLevel> = results
        .into_iter()
        .filter_map(|r| r.sla.compliance.as_ref().map(|c| c.level))
        .collect();
    if levels.is_empty() {
        return None;
    }
    let total = levels.len();
    let mut breakdown: BTreeMap<ComplianceLevel, usize> =
        ComplianceLevel::ALL.into_iter().map(|l| (l, 0)).collect();
    for level in &levels {
        *breakdown.entry(*level).or_default() += 1;
    }
    let percentages = breakdown
        .iter()
        .map(|(level, count)| (*level, *count as f64 / total as f64 * 100.0))
        .collect();
    let compliant = levels.iter().filter(|l| l.is_compliant()).count();

    Some(SlaBatchSummary {
        sla_name: sla_name.to_string(),
        total_analyzed: total,
        overall_compliance_rate: compliant as f64 / total as f64 * 100.0,
        compliance_breakdown: breakdown,
        compliance_percentages: percentages,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::CategoryConfig;

    fn verdict(score: f64) -> GlobalVerdict {
        GlobalVerdict {
            score,
            stars: crate::pipeline::scoring::stars(score),
            status: Status::Pass,
            score_status: Status::Pass,
        }
    }

    fn metric(category: Category, status: Status) -> MetricResult {
        let config = ConfigurationProfile::strict().category(category).clone();
        let value = match (status, config.polarity) {
            (Status::Pass, _) => config.pass_threshold,
            (Status::Warn, _) => config.warn_threshold,
            (Status::Fail, Polarity::HigherIsBetter) => config.warn_threshold * 0.5,
            (Status::Fail, Polarity::LowerIsBetter) => config.warn_threshold * 2.0,
        };
        let result = MetricResult::measured(category, &config, "primary", value);
        result.degrade(status)
    }

    fn all_pass() -> BTreeMap<Category, MetricResult> {
        Category::ALL
            .into_iter()
            .map(|c| (c, metric(c, Status::Pass)))
            .collect()
    }

    #[test]
    fn test_clean_result_is_excellent() {
        let evaluator = SlaEvaluator::new(&ConfigurationProfile::strict());
        let compliance = evaluator.evaluate(&verdict(1.0), &all_pass());
        assert_eq!(compliance.level, ComplianceLevel::Excellent);
        assert!(compliance.overall_compliant);
        assert!(compliance.violations.is_empty());
        assert_eq!(
            evaluator.recommendations(&compliance),
            vec!["All SLA requirements met".to_string()]
        );
    }

    #[test]
    fn test_compliant_below_excellent_score() {
        let evaluator = SlaEvaluator::new(&ConfigurationProfile::strict());
        let compliance = evaluator.evaluate(&verdict(0.85), &all_pass());
        assert_eq!(compliance.level, ComplianceLevel::Compliant);
    }

    #[test]
    fn test_required_category_fail_is_a_violation() {
        let evaluator = SlaEvaluator::new(&ConfigurationProfile::strict());
        let mut metrics = all_pass();
        metrics.insert(Category::Sharpness, metric(Category::Sharpness, Status::Fail));
        let compliance = evaluator.evaluate(&verdict(0.92), &metrics);

        let met = &compliance.requirements_met;
        assert!(met.minimum_score.compliant);
        assert!(met.category_failures.compliant);
        assert_eq!(met.required_categories.violations, vec![Category::Sharpness]);
        assert!(!met.performance_targets.compliant);
        assert_eq!(compliance.level, ComplianceLevel::Warning);

        let violation = &compliance.violations[0];
        assert_eq!(violation.category, Category::Sharpness);
        assert!((violation.required - 150.0).abs() < f64::EPSILON);
        assert_eq!(violation.actual, Some(60.0));

        let recs = evaluator.recommendations(&compliance);
        assert!(recs.iter().any(|r| r.contains("sharpness")));
    }

    #[test]
    fn test_missing_required_category_counts_as_not_passing() {
        let evaluator = SlaEvaluator::new(&ConfigurationProfile::strict());
        let mut metrics = all_pass();
        metrics.remove(&Category::Resolution);
        let compliance = evaluator.evaluate(&verdict(0.95), &metrics);
        assert_eq!(
            compliance.requirements_met.required_categories.violations,
            vec![Category::Resolution]
        );
        assert!(!compliance.overall_compliant);
    }

    #[test]
    fn test_warn_in_targeted_category_misses_targets() {
        let evaluator = SlaEvaluator::new(&ConfigurationProfile::strict());
        let mut metrics = all_pass();
        metrics.insert(Category::Contrast, metric(Category::Contrast, Status::Warn));
        let compliance = evaluator.evaluate(&verdict(0.98), &metrics);
        assert!(!compliance.requirements_met.performance_targets.compliant);
        assert!(compliance.violations.is_empty());
    }

    #[test]
    fn test_low_score_is_non_compliant() {
        let evaluator = SlaEvaluator::new(&ConfigurationProfile::strict());
        let metrics: BTreeMap<Category, MetricResult> = Category::ALL
            .into_iter()
            .map(|c| (c, metric(c, Status::Fail)))
            .collect();
        let compliance = evaluator.evaluate(&verdict(0.0), &metrics);
        assert_eq!(compliance.level, ComplianceLevel::NonCompliant);
        assert_eq!(compliance.requirements_met.category_failures.actual, 12);
        assert_eq!(compliance.violations.len(), 12);
        let recs = evaluator.recommendations(&compliance);
        let targets = recs.iter().filter(|r| r.starts_with("SLA target")).count();
        assert_eq!(targets, MAX_LISTED_VIOLATIONS);
    }

    #[test]
    fn test_higher_score_never_lowers_level() {
        let evaluator = SlaEvaluator::new(&ConfigurationProfile::strict());
        let mut metrics = all_pass();
        metrics.insert(Category::Noise, metric(Category::Noise, Status::Fail));
        let mut previous = ComplianceLevel::NonCompliant;
        for step in 0..=20 {
            let score = f64::from(step) / 20.0;
            let level = evaluator.evaluate(&verdict(score), &metrics).level;
            assert!(level >= previous, "level dropped at {score}");
            previous = level;
        }
    }

    #[test]
    fn test_disabled_sla_section() {
        let mut profile = ConfigurationProfile::strict();
        profile.sla.enabled = false;
        let section = SlaEvaluator::new(&profile).section(&verdict(1.0), &all_pass());
        assert!(!section.enabled);
        assert!(section.compliance.is_none());
    }

    #[test]
    fn test_structural_fail_has_descriptive_violation() {
        let evaluator = SlaEvaluator::new(&ConfigurationProfile::strict());
        let config = CategoryConfig::higher(0.90, 0.80);
        let mut metrics = all_pass();
        metrics.insert(
            Category::Completeness,
            MetricResult::measured(Category::Completeness, &config, "bbox_coverage", 0.95)
                .fail_extreme()
                .with_diagnostic("document touches the left edge"),
        );
        let compliance = evaluator.evaluate(&verdict(0.9), &metrics);
        assert!(compliance.violations[0].description.contains("left edge"));
    }
}
