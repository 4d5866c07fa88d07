//! Skew and warp estimation from the document outline.
//!
//! The outline of the located mask is fed to a Hough transform. Text, rules
//! and pictures inside the page never vote. Every line's normal angle is
//! folded into (-45, 45], so horizontal and vertical edges of a document
//! rotated by θ both report θ regardless of angle convention.

#![allow(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss
)]

use image::GrayImage;
use imageproc::hough::{detect_lines, LineDetectionOptions};
use tracing::trace;

use super::imaging::{mask_outline, median, RunningStats};
use super::NO_DOCUMENT;
use crate::domain::{
    Category, CategoryConfig, ConfigurationProfile, GeometryParams, MetricComputer, MetricInput,
    MetricResult, Status,
};

/// Geometry computer.
#[derive(Debug, Clone)]
pub struct GeometryComputer {
    config: CategoryConfig,
    params: GeometryParams,
}

impl GeometryComputer {
    /// Creates the computer.
    #[must_use]
    pub const fn new(config: CategoryConfig, params: GeometryParams) -> Self {
        Self { config, params }
    }

    /// Builds the computer from a profile.
    #[must_use]
    pub fn from_profile(profile: &ConfigurationProfile) -> Self {
        Self::new(
            profile.categories.geometry.clone(),
            profile.params.geometry.clone(),
        )
    }

    fn folded_angles(&self, edges: &GrayImage, vote_threshold: u32) -> Vec<f64> {
        let options = LineDetectionOptions {
            vote_threshold,
            suppression_radius: self.params.suppression_radius,
        };
        detect_lines(edges, options)
            .into_iter()
            .map(|line| fold_angle(f64::from(line.angle_in_degrees)))
            .collect()
    }
}

/// Folds a line angle in degrees into (-45, 45].
#[must_use]
pub(crate) fn fold_angle(degrees: f64) -> f64 {
    let folded = degrees.rem_euclid(90.0);
    if folded > 45.0 {
        folded - 90.0
    } else {
        folded
    }
}

impl MetricComputer for GeometryComputer {
    fn category(&self) -> Category {
        Category::Geometry
    }

    fn primary_measurement(&self) -> &'static str {
        "skew_angle"
    }

    fn config(&self) -> &CategoryConfig {
        &self.config
    }

    fn analyze(&self, input: &MetricInput<'_>) -> MetricResult {
        let Some(bbox) = input.mask.bbox() else {
            return self.unmeasurable(NO_DOCUMENT);
        };
        let edges = mask_outline(input.mask.as_image(), false);

        let short_side = f64::from(bbox.width.min(bbox.height));
        let vote_threshold =
            (self.params.vote_fraction * short_side).max(f64::from(self.params.min_votes)) as u32;
        let angles = self.folded_angles(&edges, vote_threshold);
        trace!(lines = angles.len(), vote_threshold, "hough lines");

        let aspect_ratio = f64::from(bbox.width.max(bbox.height))
            / f64::from(bbox.width.min(bbox.height).max(1));
        let orientation = if bbox.width > bbox.height { 1.0 } else { 0.0 };

        let Some(median_angle) = median(&angles) else {
            return self
                .classify(0.0)
                .with("line_count", 0.0)
                .with("aspect_ratio", aspect_ratio)
                .with("orientation", orientation)
                .with_diagnostic("no straight edges");
        };
        let skew = median_angle.abs();
        let spread: RunningStats = angles.iter().copied().collect();
        let (min, max) = angles
            .iter()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &a| {
                (lo.min(a), hi.max(a))
            });

        let center = bbox.x + bbox.width / 2;
        let half_threshold = (vote_threshold / 2).max(1);
        let half = |keep_left: bool| {
            let mut part = edges.clone();
            for (x, _, p) in part.enumerate_pixels_mut() {
                if (x < center) != keep_left {
                    p.0[0] = 0;
                }
            }
            median(&self.folded_angles(&part, half_threshold))
        };
        let warp_index = match (half(true), half(false)) {
            (Some(left), Some(right)) => (left - right).abs(),
            _ => 0.0,
        };

        let result = self
            .classify(skew)
            .with("line_angle_std", spread.std_dev())
            .with("line_angle_range", max - min)
            .with("warp_index", warp_index)
            .with("line_count", angles.len() as f64)
            .with("aspect_ratio", aspect_ratio)
            .with("orientation", orientation);

        if result.status == Status::Pass {
            result
        } else {
            result.recommend(format!(
                "Document is skewed by {skew:.1} degrees: align it with the frame"
            ))
        }
    }
}

#[cfg(test)]
#[allow(clippy::expect_used)]
mod tests {
    use super::*;
    use crate::domain::Image;
    use crate::modules::fixtures;
    use image::{DynamicImage, Luma};
    use imageproc::geometric_transformations::{rotate_about_center, Interpolation};

    use crate::domain::DocumentMask;
    use crate::pipeline::DocumentLocator;

    fn run(image: &Image, mask: &DocumentMask) -> MetricResult {
        GeometryComputer::from_profile(&ConfigurationProfile::strict())
            .analyze(&MetricInput { image, mask })
    }

    #[test]
    fn test_fold_angle() {
        assert!((fold_angle(0.0)).abs() < f64::EPSILON);
        assert!((fold_angle(90.0)).abs() < f64::EPSILON);
        assert!((fold_angle(95.0) - 5.0).abs() < f64::EPSILON);
        assert!((fold_angle(175.0) + 5.0).abs() < f64::EPSILON);
        assert!((fold_angle(45.0) - 45.0).abs() < f64::EPSILON);
        assert!((fold_angle(135.0) - 45.0).abs() < f64::EPSILON);
        assert!((fold_angle(-5.0) + 5.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_straight_document_has_no_skew() {
        let (image, mask) = fixtures::document(400, 300, 30);
        let result = run(&image, &mask);
        assert_eq!(result.status, Status::Pass, "{result:?}");
        assert!(result.primary_value().expect("measured") <= 1.0);
        assert!(result.measurement("line_count").unwrap_or(0.0) >= 2.0);
    }

    #[test]
    fn test_ruled_text_does_not_vote() {
        // long ink rules across the page stay out of the measurement
        let (image, mask) = fixtures::document(400, 300, 30);
        let ruled = fixtures::map_gray(&image, |x, y, v| {
            let diagonal = (x + 2 * y) % 40 < 3 && (60..340).contains(&x) && (60..240).contains(&y);
            if diagonal { 40 } else { v }
        });
        let result = run(&ruled, &mask);
        assert_eq!(result.status, Status::Pass, "{result:?}");
        assert!(result.primary_value().expect("measured") <= 1.0);
    }

    #[test]
    fn test_rotated_document_reports_skew() {
        let (image, _) = fixtures::document(400, 300, 60);
        let rotated = rotate_about_center(
            &image.to_luma8(),
            5f32.to_radians(),
            Interpolation::Bilinear,
            Luma([12]),
        );
        let rotated = Image::new("rotated.png", DynamicImage::ImageLuma8(rotated));
        let mask = DocumentLocator::default().locate(&rotated);
        let result = run(&rotated, &mask);
        let skew = result.primary_value().expect("measured");
        assert!((4.0..=6.0).contains(&skew), "skew = {skew}");
        assert_eq!(result.status, Status::Fail);
        assert!(result.beyond_fail_threshold);
    }

    #[test]
    fn test_slight_rotation_stays_below_fail() {
        let (image, _) = fixtures::document(400, 300, 60);
        let rotated = rotate_about_center(
            &image.to_luma8(),
            2f32.to_radians(),
            Interpolation::Bilinear,
            Luma([12]),
        );
        let rotated = Image::new("rotated.png", DynamicImage::ImageLuma8(rotated));
        let mask = DocumentLocator::default().locate(&rotated);
        let skew = run(&rotated, &mask).primary_value().expect("measured");
        assert!((1.0..=3.0).contains(&skew), "skew = {skew}");
    }

    #[test]
    fn test_frame_filling_document_passes_with_diagnostic() {
        // the page runs off every edge, so no outline is left to measure
        let mask = fixtures::rect_mask(200, 200, 0, 0, 200, 200);
        let flat = Image::new(
            "flat.png",
            DynamicImage::ImageLuma8(GrayImage::from_pixel(200, 200, Luma([200]))),
        );
        let result = run(&flat, &mask);
        assert_eq!(result.status, Status::Pass);
        assert_eq!(result.diagnostic.as_deref(), Some("no straight edges"));
    }
}
