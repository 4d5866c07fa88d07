//! Global and local luminance contrast over the document.

use super::imaging::{mask_coverage, tiles, Histogram, RunningStats};
use super::{MIN_TILE_COVERAGE, NO_DOCUMENT};
use crate::domain::{
    Category, CategoryConfig, ConfigurationProfile, ContrastParams, MetricComputer, MetricInput,
    MetricResult, Status,
};

/// Contrast computer.
#[derive(Debug, Clone)]
pub struct ContrastComputer {
    config: CategoryConfig,
    params: ContrastParams,
}

impl ContrastComputer {
    /// Creates the computer.
    #[must_use]
    pub const fn new(config: CategoryConfig, params: ContrastParams) -> Self {
        Self { config, params }
    }

    /// Builds the computer from a profile.
    #[must_use]
    pub fn from_profile(profile: &ConfigurationProfile) -> Self {
        Self::new(
            profile.categories.contrast.clone(),
            profile.params.contrast.clone(),
        )
    }
}

impl MetricComputer for ContrastComputer {
    fn category(&self) -> Category {
        Category::Contrast
    }

    fn primary_measurement(&self) -> &'static str {
        "global_contrast"
    }

    fn config(&self) -> &CategoryConfig {
        &self.config
    }

    fn analyze(&self, input: &MetricInput<'_>) -> MetricResult {
        if input.mask.is_empty() {
            return self.unmeasurable(NO_DOCUMENT);
        }
        let gray = input.image.to_luma8();
        let mask = input.mask.as_image();
        let histogram = Histogram::from_masked(&gray, mask);

        let spread =
            f64::from(histogram.percentile(0.95)) - f64::from(histogram.percentile(0.05));
        let global = spread / 255.0;

        let (width, height) = gray.dimensions();
        let local: RunningStats = tiles(width, height, self.params.tile_size)
            .filter(|t| mask_coverage(mask, *t) >= MIN_TILE_COVERAGE)
            .map(|t| {
                let stats: RunningStats = t
                    .pixels()
                    .filter(|&(x, y)| mask.get_pixel(x, y).0[0] != 0)
                    .map(|(x, y)| f64::from(gray.get_pixel(x, y).0[0]) / 255.0)
                    .collect();
                stats.std_dev()
            })
            .collect();

        let result = self
            .classify(global)
            .with("rms_contrast", histogram.std_dev() / 255.0)
            .with("local_contrast_mean", local.mean())
            .with("local_contrast_variance", local.variance());

        if result.status == Status::Pass {
            result
        } else {
            result.recommend(format!(
                "Luminance spread is {:.0}% of the range; aim for at least {:.0}%",
                global * 100.0,
                self.config.pass_threshold * 100.0
            ))
        }
    }
}
