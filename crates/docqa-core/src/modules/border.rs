//! Margins around the document and darkness of the background.

use image::Luma;

use super::imaging::Histogram;
use super::NO_DOCUMENT;
use crate::domain::{
    BorderParams, Category, CategoryConfig, ConfigurationProfile, MetricComputer, MetricInput,
    MetricResult, Status,
};

/// Border and background computer.
#[derive(Debug, Clone)]
pub struct BorderComputer {
    config: CategoryConfig,
    params: BorderParams,
}

impl BorderComputer {
    /// Creates the computer.
    #[must_use]
    pub const fn new(config: CategoryConfig, params: BorderParams) -> Self {
        Self { config, params }
    }

    /// Builds the computer from a profile.
    #[must_use]
    pub fn from_profile(profile: &ConfigurationProfile) -> Self {
        Self::new(
            profile.categories.border_background.clone(),
            profile.params.border_background.clone(),
        )
    }
}

impl MetricComputer for BorderComputer {
    fn category(&self) -> Category {
        Category::BorderBackground
    }

    fn primary_measurement(&self) -> &'static str {
        "max_margin_ratio"
    }

    fn config(&self) -> &CategoryConfig {
        &self.config
    }

    fn analyze(&self, input: &MetricInput<'_>) -> MetricResult {
        let Some(bbox) = input.mask.bbox() else {
            return self.unmeasurable(NO_DOCUMENT);
        };
        let (width, height) = input.mask.dimensions();
        let doc_w = f64::from(bbox.width);
        let doc_h = f64::from(bbox.height);
        let left = f64::from(bbox.x) / doc_w;
        let right = f64::from(width - bbox.right()) / doc_w;
        let top = f64::from(bbox.y) / doc_h;
        let bottom = f64::from(height - bbox.bottom()) / doc_h;
        let max_margin = left.max(right).max(top).max(bottom);

        let gray = input.image.to_luma8();
        let mut outside = input.mask.as_image().clone();
        for p in outside.pixels_mut() {
            *p = Luma([if p.0[0] == 0 { 255 } else { 0 }]);
        }
        let background = Histogram::from_masked(&gray, &outside);
        let bg_median = if background.total() == 0 {
            0.0
        } else {
            f64::from(background.median()) / 255.0
        };

        let mut result = self
            .classify(max_margin)
            .with("margin_left", left)
            .with("margin_right", right)
            .with("margin_top", top)
            .with("margin_bottom", bottom)
            .with("bg_median_luminance", bg_median);

        if result.status != Status::Pass {
            result = result.recommend(format!(
                "Margins are too wide ({:.0}% of the document): move closer or crop",
                max_margin * 100.0
            ));
        }
        if self.params.require_black_background
            && bg_median > self.params.max_bg_median_luminance
        {
            result = result
                .fail_extreme()
                .with_diagnostic("background is not dark enough")
                .recommend("Place the document on a matte black background");
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{DocumentMask, Image};
    use crate::modules::fixtures;

    fn run(image: &Image, mask: &DocumentMask) -> MetricResult {
        BorderComputer::from_profile(&ConfigurationProfile::strict())
            .analyze(&MetricInput { image, mask })
    }

    #[test]
    fn test_tight_margins_on_black_pass() {
        let (image, mask) = fixtures::document(400, 300, 15);
        let result = run(&image, &mask);
        assert_eq!(result.status, Status::Pass, "{result:?}");
        assert!(result.measurement("bg_median_luminance").unwrap_or(1.0) < 0.1);
    }

    #[test]
    fn test_wide_margins_fail() {
        let (image, mask) = fixtures::document(400, 300, 60);
        let result = run(&image, &mask);
        assert_eq!(result.status, Status::Fail);
        assert!(result.primary_value().unwrap_or(0.0) > 0.3);
        assert!(result.recommendations[0].contains("Margins"));
    }

    #[test]
    fn test_bright_background_is_extreme_fail() {
        let (image, mask) = fixtures::document(400, 300, 15);
        let grey_bg =
            fixtures::map_gray(&image, |x, y, v| if mask.contains(x, y) { v } else { 120 });
        let result = run(&grey_bg, &mask);
        assert_eq!(result.status, Status::Fail);
        assert!(result.beyond_fail_threshold);
        assert!(result.diagnostic.is_some());
    }
}
