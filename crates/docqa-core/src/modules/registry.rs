//! Set of computers built from a profile.

use std::collections::BTreeMap;
use std::time::Instant;

use rayon::prelude::*;
use tracing::debug;

use super::{
    BorderComputer, ColorComputer, CompletenessComputer, ContrastComputer, ExposureComputer,
    ForeignObjectComputer, FormatComputer, GeometryComputer, NoiseComputer, ResolutionComputer,
    ShadowComputer, SharpnessComputer,
};
use crate::domain::{
    Category, ConfigurationProfile, MetricComputer, MetricInput, MetricResult,
    ThresholdDescription,
};

/// Computers for the enabled categories of one profile.
///
/// Disabled categories have no computer, so they produce no result and
/// carry no weight.
pub struct MetricRegistry {
    computers: Vec<Box<dyn MetricComputer>>,
}

impl MetricRegistry {
    /// Builds one computer per enabled category.
    #[must_use]
    pub fn from_profile(profile: &ConfigurationProfile) -> Self {
        let computers = profile
            .categories
            .enabled()
            .map(|category| {
                debug!(%category, "enabled computer");
                computer_for(category, profile)
            })
            .collect();
        Self { computers }
    }

    /// Registry over an explicit set of computers.
    #[must_use]
    pub fn with_computers(computers: Vec<Box<dyn MetricComputer>>) -> Self {
        Self { computers }
    }

    /// Adds a computer, replacing any registered for the same category.
    pub fn register(&mut self, computer: Box<dyn MetricComputer>) {
        let category = computer.category();
        match self.computers.iter_mut().find(|c| c.category() == category) {
            Some(slot) => *slot = computer,
            None => self.computers.push(computer),
        }
    }

    /// Runs every computer in parallel and returns once all have finished.
    #[must_use]
    pub fn run(&self, input: &MetricInput<'_>) -> BTreeMap<Category, MetricResult> {
        self.computers
            .par_iter()
            .map(|computer| (computer.category(), computer.analyze(input)))
            .collect()
    }

    /// Like [`run`](Self::run), but computers not yet started when
    /// `deadline` passes are skipped and the run yields `None`.
    ///
    /// A computer already running is not interrupted.
    #[must_use]
    pub fn run_until(
        &self,
        input: &MetricInput<'_>,
        deadline: Instant,
    ) -> Option<BTreeMap<Category, MetricResult>> {
        let metrics: Option<BTreeMap<_, _>> = self
            .computers
            .par_iter()
            .map(|computer| {
                (Instant::now() < deadline).then(|| (computer.category(), computer.analyze(input)))
            })
            .collect();
        metrics.filter(|_| Instant::now() < deadline)
    }

    /// Threshold summaries of every registered computer.
    #[must_use]
    pub fn describe(&self) -> Vec<ThresholdDescription> {
        self.computers
            .iter()
            .map(|c| c.describe_thresholds())
            .collect()
    }

    /// Registered categories.
    pub fn categories(&self) -> impl Iterator<Item = Category> + '_ {
        self.computers.iter().map(|c| c.category())
    }

    /// Number of computers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.computers.len()
    }

    /// Whether no category is enabled.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.computers.is_empty()
    }
}

fn computer_for(category: Category, profile: &ConfigurationProfile) -> Box<dyn MetricComputer> {
    match category {
        Category::Sharpness => Box::new(SharpnessComputer::from_profile(profile)),
        Category::Exposure => Box::new(ExposureComputer::from_profile(profile)),
        Category::Contrast => Box::new(ContrastComputer::from_profile(profile)),
        Category::Geometry => Box::new(GeometryComputer::from_profile(profile)),
        Category::Noise => Box::new(NoiseComputer::from_profile(profile)),
        Category::Color => Box::new(ColorComputer::from_profile(profile)),
        Category::BorderBackground => Box::new(BorderComputer::from_profile(profile)),
        Category::Completeness => Box::new(CompletenessComputer::from_profile(profile)),
        Category::ForeignObjects => Box::new(ForeignObjectComputer::from_profile(profile)),
        Category::FormatIntegrity => Box::new(FormatComputer::from_profile(profile)),
        Category::Resolution => Box::new(ResolutionComputer::from_profile(profile)),
        Category::DocumentShadow => Box::new(ShadowComputer::from_profile(profile)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::fixtures;

    #[test]
    fn test_registry_covers_every_enabled_category() {
        let registry = MetricRegistry::from_profile(&ConfigurationProfile::strict());
        assert_eq!(registry.len(), Category::ALL.len());
        let categories: Vec<Category> = registry.categories().collect();
        assert_eq!(categories, Category::ALL.to_vec());
    }

    #[test]
    fn test_disabled_category_is_absent() {
        let mut profile = ConfigurationProfile::strict();
        profile.categories.get_mut(Category::Color).enabled = false;
        let registry = MetricRegistry::from_profile(&profile);
        assert_eq!(registry.len(), Category::ALL.len() - 1);

        let (image, mask) = fixtures::document(200, 160, 10);
        let results = registry.run(&MetricInput {
            image: &image,
            mask: &mask,
        });
        assert!(!results.contains_key(&Category::Color));
        assert_eq!(results.len(), registry.len());
    }

    #[test]
    fn test_run_until_past_deadline_yields_nothing() {
        let registry = MetricRegistry::from_profile(&ConfigurationProfile::strict());
        let (image, mask) = fixtures::document(200, 160, 10);
        let input = MetricInput {
            image: &image,
            mask: &mask,
        };
        assert!(registry.run_until(&input, Instant::now()).is_none());

        let generous = Instant::now() + std::time::Duration::from_secs(600);
        let results = registry.run_until(&input, generous).expect("within deadline");
        assert_eq!(results.len(), registry.len());
    }

    #[test]
    fn test_describe_reports_profile_thresholds() {
        let registry = MetricRegistry::from_profile(&ConfigurationProfile::strict());
        let geometry = registry
            .describe()
            .into_iter()
            .find(|d| d.category == Category::Geometry);
        assert!(geometry.is_some_and(|d| d.measurement == "skew_angle" && (d.fail - 3.0).abs() < f64::EPSILON));
    }
}
