//! Cast shadow along the document edge.
//!
//! Compares the background just outside the document with the background
//! further away. A shadow shows as a near ring darker than the far ring.

use imageproc::distance_transform::{distance_transform, Norm};

use super::imaging::RunningStats;
use super::NO_DOCUMENT;
use crate::domain::{
    Category, CategoryConfig, ConfigurationProfile, MetricComputer, MetricInput, MetricResult,
    ShadowParams, Status,
};

/// Document-shadow computer.
#[derive(Debug, Clone)]
pub struct ShadowComputer {
    config: CategoryConfig,
    params: ShadowParams,
}

impl ShadowComputer {
    /// Creates the computer.
    #[must_use]
    pub const fn new(config: CategoryConfig, params: ShadowParams) -> Self {
        Self { config, params }
    }

    /// Builds the computer from a profile.
    #[must_use]
    pub fn from_profile(profile: &ConfigurationProfile) -> Self {
        Self::new(
            profile.categories.document_shadow.clone(),
            profile.params.document_shadow.clone(),
        )
    }
}

impl MetricComputer for ShadowComputer {
    fn category(&self) -> Category {
        Category::DocumentShadow
    }

    fn primary_measurement(&self) -> &'static str {
        "shadow_intensity"
    }

    fn config(&self) -> &CategoryConfig {
        &self.config
    }

    fn analyze(&self, input: &MetricInput<'_>) -> MetricResult {
        if input.mask.bbox().is_none() {
            return self.unmeasurable(NO_DOCUMENT);
        }
        let band = self.params.band_px.max(3);
        let near_max = band / 3;
        let far_min = band - band / 3;

        let gray = input.image.to_luma8();
        let distances = distance_transform(input.mask.as_image(), Norm::LInf);
        let mut near = RunningStats::default();
        let mut far = RunningStats::default();
        for (x, y, d) in distances.enumerate_pixels() {
            let d = d.0[0];
            if d == 0 || d > band {
                continue;
            }
            let value = f64::from(gray.get_pixel(x, y).0[0]);
            if d <= near_max {
                near.add(value);
            } else if d >= far_min {
                far.add(value);
            }
        }

        if near.count() == 0 || far.count() == 0 {
            return self
                .classify(0.0)
                .with("shadow_present", 0.0)
                .with("quality_score", 1.0)
                .with_diagnostic("no background around the document");
        }

        let intensity = (far.mean() - near.mean()).max(0.0);
        let present = intensity > self.params.shadow_threshold;
        let mut result = self
            .classify(intensity)
            .with("shadow_present", if present { 1.0 } else { 0.0 })
            .with("quality_score", (1.0 - intensity / 100.0).clamp(0.0, 1.0))
            .with("near_mean", near.mean())
            .with("far_mean", far.mean());
        if result.status != Status::Pass {
            result = result.recommend("A shadow falls along the document edge: use diffuse light");
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
        ShadowComputer::from_profile(&ConfigurationProfile::strict())
            .analyze(&MetricInput { image, mask })
    }

    #[test]
    fn test_flat_background_passes() {
        let (image, mask) = fixtures::document(400, 300, 60);
        let result = run(&image, &mask);
        assert_eq!(result.status, Status::Pass, "{result:?}");
        assert!(result.primary_value().unwrap_or(1.0).abs() < f64::EPSILON);
        assert_eq!(result.measurement("shadow_present"), Some(0.0));
    }

    #[test]
    fn test_dark_halo_is_a_shadow() {
        let (image, mask) = fixtures::document(400, 300, 60);
        let shadowed = fixtures::map_gray(&image, |x, y, v| {
            if mask.contains(x, y) {
                return v;
            }
            let dx = 60u32.saturating_sub(x).max(x.saturating_sub(339));
            let dy = 60u32.saturating_sub(y).max(y.saturating_sub(239));
            if dx.max(dy) <= 16 { 40 } else { 150 }
        });
        let result = run(&shadowed, &mask);
        assert_eq!(result.status, Status::Fail);
        assert!(result.primary_value().unwrap_or(0.0) > 100.0);
        assert_eq!(result.measurement("shadow_present"), Some(1.0));
        assert!(!result.recommendations.is_empty());
    }

    #[test]
    fn test_frame_filling_document_has_no_ring() {
        let (image, _) = fixtures::document(100, 100, 0);
        let mask = fixtures::rect_mask(100, 100, 0, 0, 100, 100);
        let result = run(&image, &mask);
        assert_eq!(result.status, Status::Pass);
        assert!(result.diagnostic.is_some());
    }

    #[test]
    fn test_no_document_is_unmeasurable() {
        let (image, _) = fixtures::document(100, 100, 10);
        let result = run(&image, &DocumentMask::empty(100, 100));
        assert!(result.beyond_fail_threshold);
    }
}
