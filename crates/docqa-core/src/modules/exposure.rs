//! Exposure analysis.
//!
//! Clipping is measured on the document histogram. Illumination uniformity
//! compares the paper brightness of each tile, estimated by its 90th
//! percentile so that ink does not pull it down.

use super::imaging::{mask_coverage, tiles, Histogram, RunningStats};
use super::{MIN_TILE_COVERAGE, NO_DOCUMENT};
use crate::domain::{
    Category, CategoryConfig, ConfigurationProfile, ExposureParams, MetricComputer, MetricInput,
    MetricResult, Status,
};

/// Exposure computer.
#[derive(Debug, Clone)]
pub struct ExposureComputer {
    config: CategoryConfig,
    params: ExposureParams,
}

impl ExposureComputer {
    /// Creates the computer.
    #[must_use]
    pub const fn new(config: CategoryConfig, params: ExposureParams) -> Self {
        Self { config, params }
    }

    /// Builds the computer from a profile.
    #[must_use]
    pub fn from_profile(profile: &ConfigurationProfile) -> Self {
        Self::new(
            profile.categories.exposure.clone(),
            profile.params.exposure.clone(),
        )
    }

    fn uniformity_status(&self, uniformity: f64) -> Status {
        if uniformity > self.params.uniformity_fail {
            Status::Fail
        } else if uniformity > self.params.uniformity_warn {
            Status::Warn
        } else {
            Status::Pass
        }
    }
}

impl MetricComputer for ExposureComputer {
    fn category(&self) -> Category {
        Category::Exposure
    }

    fn primary_measurement(&self) -> &'static str {
        "clipping_pct"
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

        let shadow_pct = histogram.fraction_below(self.params.shadow_clip_level) * 100.0;
        let highlight_pct = histogram.fraction_above(self.params.highlight_clip_level) * 100.0;
        let clipping = shadow_pct.max(highlight_pct);

        let (width, height) = gray.dimensions();
        let paper_levels: RunningStats = tiles(width, height, self.params.tile_size)
            .filter(|t| mask_coverage(mask, *t) >= MIN_TILE_COVERAGE)
            .map(|t| {
                let mut tile_hist = Histogram::default();
                for (x, y) in t.pixels() {
                    if mask.get_pixel(x, y).0[0] != 0 {
                        tile_hist.add(gray.get_pixel(x, y).0[0]);
                    }
                }
                f64::from(tile_hist.percentile(0.9))
            })
            .collect();
        let uniformity = if paper_levels.count() < 2 || paper_levels.mean() <= 0.0 {
            0.0
        } else {
            paper_levels.std_dev() / paper_levels.mean()
        };

        let mut result = self
            .classify(clipping)
            .with("shadow_clip_pct", shadow_pct)
            .with("highlight_clip_pct", highlight_pct)
            .with("mean_brightness", histogram.mean())
            .with("brightness_std", histogram.std_dev())
            .with(
                "dynamic_range",
                f64::from(histogram.percentile(0.995)) - f64::from(histogram.percentile(0.005)),
            )
            .with("illumination_uniformity", uniformity)
            .degrade(self.uniformity_status(uniformity));

        if highlight_pct > self.config.pass_threshold {
            result = result.recommend("Highlights are clipped: reduce exposure or glare");
        }
        if shadow_pct > self.config.pass_threshold {
            result = result.recommend("Shadows are clipped: increase exposure");
        }
        if uniformity > self.params.uniformity_warn {
            result = result.recommend("Lighting is uneven across the page: diffuse the light");
        }
        result
    }
}
