//! Weighted global score, star rating and critical overrides.

use std::collections::{BTreeMap, HashSet};

use tracing::debug;

use crate::domain::{
    Category, CategoryTable, ConfigurationProfile, GlobalVerdict, MetricResult, ScoringConfig,
    Status,
};

/// Reduces per-category results to one verdict.
#[derive(Debug, Clone)]
pub struct ScoringEngine {
    categories: CategoryTable,
    scoring: ScoringConfig,
}

impl ScoringEngine {
    /// Engine using the profile's weights and thresholds.
    #[must_use]
    pub fn new(profile: &ConfigurationProfile) -> Self {
        Self {
            categories: profile.categories.clone(),
            scoring: profile.scoring.clone(),
        }
    }

    /// Weighted mean of the normalized category scores, clamped to [0, 1].
    ///
    /// Categories with zero weight are skipped. With no weight at all the
    /// score is 0.
    #[must_use]
    pub fn global_score(&self, metrics: &BTreeMap<Category, MetricResult>) -> f64 {
        let (weighted, total) = metrics
            .values()
            .map(|m| (m.score, self.categories.get(m.category).weight))
            .filter(|(_, weight)| *weight > 0.0)
            .fold((0.0, 0.0), |(sum, total), (score, weight)| {
                (sum + score * weight, total + weight)
            });
        if total <= 0.0 {
            return 0.0;
        }
        (weighted / total).clamp(0.0, 1.0)
    }

    /// Status from the score thresholds alone.
    #[must_use]
    pub fn score_status(&self, score: f64) -> Status {
        if score >= self.scoring.pass_score_threshold {
            Status::Pass
        } else if score >= self.scoring.warn_score_threshold {
            Status::Warn
        } else {
            Status::Fail
        }
    }

    /// Critical categories whose FAIL forces the global verdict.
    ///
    /// Geometry only counts in its extreme band; every other critical
    /// category counts on any FAIL, whatever its `fail_threshold`.
    pub fn critical_failures<'a>(
        &'a self,
        metrics: &'a BTreeMap<Category, MetricResult>,
    ) -> impl Iterator<Item = Category> + 'a {
        metrics
            .values()
            .filter(|m| {
                m.status == Status::Fail
                    && self.categories.get(m.category).critical
                    && (m.beyond_fail_threshold || !m.category.overrides_only_when_extreme())
            })
            .map(|m| m.category)
    }

    /// Score, stars and status for a full set of results.
    #[must_use]
    pub fn score(&self, metrics: &BTreeMap<Category, MetricResult>) -> GlobalVerdict {
        let score = self.global_score(metrics);
        let score_status = self.score_status(score);
        let critical: Vec<Category> = self.critical_failures(metrics).collect();
        let status = if critical.is_empty() {
            score_status
        } else {
            debug!(?critical, "critical override");
            Status::Fail
        };
        GlobalVerdict {
            score,
            stars: stars(score),
            status,
            score_status,
        }
    }
}

/// Star rating for a global score. Boundaries are inclusive.
#[must_use]
pub fn stars(score: f64) -> u8 {
    if score >= 0.90 {
        4
    } else if score >= 0.80 {
        3
    } else if score >= 0.65 {
        2
    } else {
        1
    }
}

/// Operator actions for every WARN or FAIL category, followed by each
/// category's own hints. Duplicates are dropped, first occurrence wins.
#[must_use]
pub fn recommendations(metrics: &BTreeMap<Category, MetricResult>) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    let mut push = |text: String| {
        if seen.insert(text.clone()) {
            out.push(text);
        }
    };
    for metric in metrics.values() {
        match metric.status {
            Status::Fail => push(format!("Required: {}", metric.category.action())),
            Status::Warn => push(format!("Suggested: {}", metric.category.action())),
            Status::Pass => {}
        }
    }
    for metric in metrics.values() {
        for text in &metric.recommendations {
            push(text.clone());
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::CategoryConfig;

    fn result(category: Category, status: Status) -> MetricResult {
        let config = CategoryConfig::higher(1.0, 0.5);
        let value = match status {
            Status::Pass => 1.0,
            Status::Warn => 0.75,
            Status::Fail => 0.25,
        };
        MetricResult::measured(category, &config, "v", value)
    }

    fn all_with(status: Status) -> BTreeMap<Category, MetricResult> {
        Category::ALL
            .into_iter()
            .map(|c| (c, result(c, status)))
            .collect()
    }

    #[test]
    fn test_star_boundaries_are_inclusive() {
        assert_eq!(stars(0.90), 4);
        assert_eq!(stars(0.8999), 3);
        assert_eq!(stars(0.80), 3);
        assert_eq!(stars(0.65), 2);
        assert_eq!(stars(0.6499), 1);
        assert_eq!(stars(0.0), 1);
        assert_eq!(stars(1.0), 4);
    }

    #[test]
    fn test_all_pass_scores_one() {
        let engine = ScoringEngine::new(&ConfigurationProfile::strict());
        let verdict = engine.score(&all_with(Status::Pass));
        assert!((verdict.score - 1.0).abs() < 1e-9);
        assert_eq!(verdict.stars, 4);
        assert_eq!(verdict.status, Status::Pass);
    }

    #[test]
    fn test_all_warn_scores_three_quarters() {
        let engine = ScoringEngine::new(&ConfigurationProfile::strict());
        let verdict = engine.score(&all_with(Status::Warn));
        assert!((verdict.score - 0.75).abs() < 1e-9);
        assert_eq!(verdict.status, Status::Warn);
        assert_eq!(verdict.stars, 2);
    }

    #[test]
    fn test_empty_results_score_zero() {
        let engine = ScoringEngine::new(&ConfigurationProfile::strict());
        let verdict = engine.score(&BTreeMap::new());
        assert!(verdict.score.abs() < f64::EPSILON);
        assert_eq!(verdict.status, Status::Fail);
    }

    #[test]
    fn test_zero_weight_category_is_ignored() {
        let mut profile = ConfigurationProfile::strict();
        profile.categories.get_mut(Category::Color).weight = 0.0;
        let engine = ScoringEngine::new(&profile);
        let mut metrics = all_with(Status::Pass);
        metrics.insert(Category::Color, result(Category::Color, Status::Fail));
        assert!((engine.global_score(&metrics) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_extreme_critical_fail_overrides_high_score() {
        let engine = ScoringEngine::new(&ConfigurationProfile::strict());
        let mut metrics = all_with(Status::Pass);
        metrics.insert(
            Category::Completeness,
            result(Category::Completeness, Status::Pass).fail_extreme(),
        );
        let verdict = engine.score(&metrics);
        assert!(verdict.score > 0.80);
        assert_eq!(verdict.score_status, Status::Pass);
        assert_eq!(verdict.status, Status::Fail);
    }

    #[test]
    fn test_non_extreme_geometry_fail_does_not_override() {
        let engine = ScoringEngine::new(&ConfigurationProfile::strict());
        let mut metrics = all_with(Status::Pass);
        let mut fail = result(Category::Geometry, Status::Fail);
        fail.beyond_fail_threshold = false;
        metrics.insert(Category::Geometry, fail);
        let verdict = engine.score(&metrics);
        assert_eq!(verdict.status, verdict.score_status);
    }

    #[test]
    fn test_completeness_fail_overrides_with_lowered_fail_threshold() {
        let mut profile = ConfigurationProfile::strict();
        profile.categories.get_mut(Category::Completeness).fail_threshold = Some(0.5);
        let engine = ScoringEngine::new(&profile);

        let config = profile.categories.get(Category::Completeness);
        let fail = MetricResult::measured(Category::Completeness, config, "coverage", 0.7);
        assert_eq!(fail.status, Status::Fail);
        assert!(!fail.beyond_fail_threshold);

        let mut metrics = all_with(Status::Pass);
        metrics.insert(Category::Completeness, fail);
        let verdict = engine.score(&metrics);
        assert_eq!(verdict.score_status, Status::Pass);
        assert_eq!(verdict.status, Status::Fail);
        assert_eq!(
            engine.critical_failures(&metrics).collect::<Vec<_>>(),
            vec![Category::Completeness]
        );
    }

    #[test]
    fn test_non_extreme_fail_in_each_structural_category_overrides() {
        let engine = ScoringEngine::new(&ConfigurationProfile::strict());
        for category in [
            Category::Completeness,
            Category::BorderBackground,
            Category::Resolution,
        ] {
            let mut metrics = all_with(Status::Pass);
            let mut fail = result(category, Status::Fail);
            fail.beyond_fail_threshold = false;
            metrics.insert(category, fail);
            assert_eq!(engine.score(&metrics).status, Status::Fail, "{category}");
        }
    }

    #[test]
    fn test_extreme_fail_in_non_critical_category_does_not_override() {
        let engine = ScoringEngine::new(&ConfigurationProfile::strict());
        let mut metrics = all_with(Status::Pass);
        metrics.insert(
            Category::Color,
            result(Category::Color, Status::Pass).fail_extreme(),
        );
        let verdict = engine.score(&metrics);
        assert_eq!(verdict.status, Status::Pass);
    }

    #[test]
    fn test_recommendations_are_prefixed_and_deduplicated() {
        let mut metrics = all_with(Status::Pass);
        metrics.insert(
            Category::Sharpness,
            result(Category::Sharpness, Status::Fail).recommend("Hold still"),
        );
        metrics.insert(
            Category::Noise,
            result(Category::Noise, Status::Warn).recommend("Hold still"),
        );
        let recs = recommendations(&metrics);
        assert_eq!(
            recs,
            vec![
                format!("Required: {}", Category::Sharpness.action()),
                format!("Suggested: {}", Category::Noise.action()),
                "Hold still".to_string(),
            ]
        );
    }
}
