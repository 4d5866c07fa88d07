//! Whether the whole document is inside the frame.

#![allow(clippy::cast_precision_loss)]

use super::NO_DOCUMENT;
use crate::domain::{
    Category, CategoryConfig, CompletenessParams, ConfigurationProfile, MetricComputer,
    MetricInput, MetricResult, Status,
};

/// Completeness computer.
#[derive(Debug, Clone)]
pub struct CompletenessComputer {
    config: CategoryConfig,
    params: CompletenessParams,
}

impl CompletenessComputer {
    /// Creates the computer.
    #[must_use]
    pub const fn new(config: CategoryConfig, params: CompletenessParams) -> Self {
        Self { config, params }
    }

    /// Builds the computer from a profile.
    #[must_use]
    pub fn from_profile(profile: &ConfigurationProfile) -> Self {
        Self::new(
            profile.categories.completeness.clone(),
            profile.params.completeness.clone(),
        )
    }
}

impl MetricComputer for CompletenessComputer {
    fn category(&self) -> Category {
        Category::Completeness
    }

    fn primary_measurement(&self) -> &'static str {
        "bbox_coverage"
    }

    fn config(&self) -> &CategoryConfig {
        &self.config
    }

    fn analyze(&self, input: &MetricInput<'_>) -> MetricResult {
        let Some(bbox) = input.mask.bbox() else {
            return self.unmeasurable(NO_DOCUMENT);
        };
        let (width, height) = input.mask.dimensions();
        let coverage = bbox.area() as f64 / (u64::from(width) * u64::from(height)) as f64;

        let m = self.params.min_margin_px;
        let mut touch = [0u64; 4];
        let mut total = 0u64;
        for (x, y, p) in input.mask.as_image().enumerate_pixels() {
            if p.0[0] == 0 {
                continue;
            }
            let sides = [
                x < m,
                x.saturating_add(m) >= width,
                y < m,
                y.saturating_add(m) >= height,
            ];
            if sides.iter().any(|&s| s) {
                total += 1;
            }
            for (count, hit) in touch.iter_mut().zip(sides) {
                *count += u64::from(hit);
            }
        }
        let sides_touched = touch.iter().filter(|&&c| c > 0).count();

        let mut result = self
            .classify(coverage)
            .with("edge_touch_pixels", total as f64)
            .with("edge_touch_sides", sides_touched as f64)
            .with("touch_left", touch[0] as f64)
            .with("touch_right", touch[1] as f64)
            .with("touch_top", touch[2] as f64)
            .with("touch_bottom", touch[3] as f64);

        if total > 0 {
            let names: Vec<&str> = ["left", "right", "top", "bottom"]
                .into_iter()
                .zip(touch)
                .filter(|(_, c)| *c > 0)
                .map(|(n, _)| n)
                .collect();
            result = result
                .fail_extreme()
                .with_diagnostic(format!("document touches the {} edge", names.join(", ")))
                .recommend("Leave a visible margin on every side of the document");
        } else if result.status != Status::Pass {
            result = result.recommend("Fill more of the frame with the document");
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
        CompletenessComputer::from_profile(&ConfigurationProfile::strict())
            .analyze(&MetricInput { image, mask })
    }

    #[test]
    fn test_framed_document_passes() {
        let (image, mask) = fixtures::document(800, 600, 10);
        let result = run(&image, &mask);
        assert_eq!(result.status, Status::Pass, "{result:?}");
        assert!(result.measurement("edge_touch_pixels").unwrap_or(1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_edge_touch_is_extreme_fail() {
        let (image, _) = fixtures::document(400, 300, 10);
        let mask = fixtures::rect_mask(400, 300, 0, 10, 390, 290);
        let result = run(&image, &mask);
        assert_eq!(result.status, Status::Fail);
        assert!(result.beyond_fail_threshold);
        assert!(result.measurement("touch_left").unwrap_or(0.0) > 0.0);
        assert!(result.measurement("touch_right").unwrap_or(1.0).abs() < f64::EPSILON);
        assert_eq!(
            result.diagnostic.as_deref(),
            Some("document touches the left edge")
        );
    }

    #[test]
    fn test_small_document_fails() {
        let (image, mask) = fixtures::document(400, 300, 30);
        let result = run(&image, &mask);
        assert!(result.primary_value().unwrap_or(1.0) < 0.80);
        assert_eq!(result.status, Status::Fail);
    }
}
