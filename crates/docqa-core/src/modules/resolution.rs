//! Pixel density of the capture.
//!
//! Declared DPI wins. Without it the density is estimated by assuming the
//! document's long side spans a known paper length.

#![allow(clippy::cast_precision_loss)]

use crate::domain::{
    Category, CategoryConfig, ConfigurationProfile, MetricComputer, MetricInput, MetricResult,
    ResolutionParams, Status,
};

/// Resolution computer.
#[derive(Debug, Clone)]
pub struct ResolutionComputer {
    config: CategoryConfig,
    params: ResolutionParams,
}

impl ResolutionComputer {
    /// Creates the computer.
    #[must_use]
    pub const fn new(config: CategoryConfig, params: ResolutionParams) -> Self {
        Self { config, params }
    }

    /// Builds the computer from a profile.
    #[must_use]
    pub fn from_profile(profile: &ConfigurationProfile) -> Self {
        Self::new(
            profile.categories.resolution.clone(),
            profile.params.resolution.clone(),
        )
    }
}

impl MetricComputer for ResolutionComputer {
    fn category(&self) -> Category {
        Category::Resolution
    }

    fn primary_measurement(&self) -> &'static str {
        "effective_dpi"
    }

    fn config(&self) -> &CategoryConfig {
        &self.config
    }

    fn analyze(&self, input: &MetricInput<'_>) -> MetricResult {
        let image = input.image;
        let declared = image
            .metadata
            .dpi
            .filter(|(x, y)| x.is_finite() && y.is_finite() && *x > 0.0 && *y > 0.0);

        let ((dpi_x, dpi_y), estimated, diagnostic) = match (declared, input.mask.bbox()) {
            (Some(dpi), _) => (dpi, false, None),
            (None, Some(bbox)) => {
                let long_side = f64::from(bbox.width.max(bbox.height));
                let dpi = long_side / self.params.assumed_paper_long_side_in;
                ((dpi, dpi), true, Some("DPI estimated from document size"))
            }
            (None, None) => (
                (self.params.default_dpi, self.params.default_dpi),
                true,
                Some("no DPI declared and no document located; default assumed"),
            ),
        };
        let effective = dpi_x.min(dpi_y);

        let mut result = self
            .classify(effective)
            .with("dpi_x", dpi_x)
            .with("dpi_y", dpi_y)
            .with("width_px", f64::from(image.width))
            .with("height_px", f64::from(image.height))
            .with("megapixels", image.area() as f64 / 1_000_000.0)
            .with("dpi_estimated", if estimated { 1.0 } else { 0.0 });
        if let Some(diagnostic) = diagnostic {
            result = result.with_diagnostic(diagnostic);
        }
        if result.status != Status::Pass {
            result = result.recommend(format!(
                "Resolution is {effective:.0} DPI: capture at {:.0} DPI or higher",
                self.config.pass_threshold
            ));
        }
        result
    }
}
