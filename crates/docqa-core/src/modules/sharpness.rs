//! Focus measurement.
//!
//! The primary signal is the variance of the 4-neighbour Laplacian over the
//! document. Tile sharpness, edge density and band energies only shape the
//! recommendation.

#![allow(clippy::cast_precision_loss)]

use image::GrayImage;
use imageproc::edges::canny;
use imageproc::filter::gaussian_blur_f32;

use super::imaging::{gradient_magnitudes, mask_coverage, tiles, RunningStats};
use super::{MIN_TILE_COVERAGE, NO_DOCUMENT};
use crate::domain::{
    Category, CategoryConfig, ConfigurationProfile, MetricComputer, MetricInput, MetricResult,
    SharpnessParams, Status,
};

/// Fewer masked pixels than this cannot give a stable variance.
const MIN_PIXELS: u64 = 64;

/// Sharpness computer.
#[derive(Debug, Clone)]
pub struct SharpnessComputer {
    config: CategoryConfig,
    params: SharpnessParams,
}

impl SharpnessComputer {
    /// Creates the computer.
    #[must_use]
    pub const fn new(config: CategoryConfig, params: SharpnessParams) -> Self {
        Self { config, params }
    }

    /// Builds the computer from a profile.
    #[must_use]
    pub fn from_profile(profile: &ConfigurationProfile) -> Self {
        Self::new(
            profile.categories.sharpness.clone(),
            profile.params.sharpness.clone(),
        )
    }
}

impl MetricComputer for SharpnessComputer {
    fn category(&self) -> Category {
        Category::Sharpness
    }

    fn primary_measurement(&self) -> &'static str {
        "laplacian_var"
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
        let (width, height) = gray.dimensions();

        let laplacian = laplacian_map(&gray, mask);
        let overall: RunningStats = laplacian.iter().flatten().copied().collect();
        if overall.count() < MIN_PIXELS {
            return self.unmeasurable("too few document pixels for a Laplacian estimate");
        }
        let laplacian_var = overall.variance();

        let magnitudes = gradient_magnitudes(&gray);
        let masked: Vec<usize> = mask
            .pixels()
            .enumerate()
            .filter(|(_, p)| p.0[0] != 0)
            .map(|(i, _)| i)
            .collect();
        let gradient_mean: RunningStats = masked.iter().map(|&i| magnitudes[i]).collect();

        let edges = canny(&gray, self.params.canny_low, self.params.canny_high);
        let edge_pixels = edges
            .pixels()
            .zip(mask.pixels())
            .filter(|(e, m)| e.0[0] != 0 && m.0[0] != 0)
            .count();
        let edge_density = edge_pixels as f64 / masked.len() as f64;

        let tile_values: Vec<f64> = tiles(width, height, self.params.tile_size)
            .filter(|t| mask_coverage(mask, *t) >= MIN_TILE_COVERAGE)
            .filter_map(|t| {
                let stats: RunningStats = t
                    .pixels()
                    .filter_map(|(x, y)| laplacian[(y * width + x) as usize])
                    .collect();
                (stats.count() > 1).then(|| stats.variance())
            })
            .collect();
        let tile_min = tile_values.iter().copied().fold(f64::INFINITY, f64::min);
        let tile_mean: RunningStats = tile_values.iter().copied().collect();

        let [low, mid, high] = band_energies(&gray, mask);

        let mut result = self
            .classify(laplacian_var)
            .with("gradient_mean", gradient_mean.mean())
            .with("edge_density", edge_density)
            .with("tile_sharpness_min", if tile_values.is_empty() { 0.0 } else { tile_min })
            .with("tile_sharpness_mean", tile_mean.mean())
            .with("band_energy_low", low)
            .with("band_energy_mid", mid)
            .with("band_energy_high", high);

        if result.status != Status::Pass {
            if high < 0.2 {
                result = result.recommend("Defocus detected: refocus on the document plane");
            } else if edge_density < 0.02 && gradient_mean.mean() > 20.0 {
                result = result.recommend("Motion blur detected: stabilize the camera");
            }
        }
        result
    }
}

/// Laplacian at every interior masked pixel, `None` elsewhere.
fn laplacian_map(gray: &GrayImage, mask: &GrayImage) -> Vec<Option<f64>> {
    let (width, height) = gray.dimensions();
    let at = |x: u32, y: u32| i32::from(gray.get_pixel(x, y).0[0]);
    let mut out = vec![None; (width as usize) * (height as usize)];
    if width < 3 || height < 3 {
        return out;
    }
    for y in 1..height - 1 {
        for x in 1..width - 1 {
            if mask.get_pixel(x, y).0[0] == 0 {
                continue;
            }
            let value = at(x - 1, y) + at(x + 1, y) + at(x, y - 1) + at(x, y + 1) - 4 * at(x, y);
            out[(y * width + x) as usize] = Some(f64::from(value));
        }
    }
    out
}

/// Difference-of-Gaussian band energies over the mask, normalized to sum 1.
fn band_energies(gray: &GrayImage, mask: &GrayImage) -> [f64; 3] {
    let g1 = gaussian_blur_f32(gray, 1.0);
    let g2 = gaussian_blur_f32(gray, 2.0);
    let g4 = gaussian_blur_f32(gray, 4.0);

    let mut energy = [0.0f64; 3];
    for (i, m) in mask.pixels().enumerate() {
        if m.0[0] == 0 {
            continue;
        }
        let base = f64::from(gray.as_raw()[i]);
        let s1 = f64::from(g1.as_raw()[i]);
        let s2 = f64::from(g2.as_raw()[i]);
        let s4 = f64::from(g4.as_raw()[i]);
        energy[0] += (s2 - s4).powi(2);
        energy[1] += (s1 - s2).powi(2);
        energy[2] += (base - s1).powi(2);
    }
    let total: f64 = energy.iter().sum();
    if total <= 0.0 {
        return [0.0; 3];
    }
    energy.map(|e| e / total)
}

#[cfg(test)]
#[allow(clippy::expect_used)]
mod tests {
    use super::*;
    use crate::domain::{DocumentMask, Image};
    use crate::modules::fixtures;
    use image::DynamicImage;

    fn run(image: &Image, mask: &DocumentMask) -> MetricResult {
        SharpnessComputer::from_profile(&ConfigurationProfile::strict())
            .analyze(&MetricInput { image, mask })
    }

    #[test]
    fn test_sharp_document_passes() {
        let (image, mask) = fixtures::document(320, 240, 20);
        let result = run(&image, &mask);
        assert_eq!(result.status, Status::Pass, "{result:?}");
        assert!(result.primary_value().expect("measured") > 150.0);
    }

    #[test]
    fn test_blur_lowers_variance_monotonically() {
        let (image, mask) = fixtures::document(320, 240, 20);
        let gray = image.to_luma8();
        let mut previous = run(&image, &mask).primary_value().expect("measured");
        for sigma in [1.0f32, 2.0, 4.0] {
            let blurred = Image::new(
                "blurred.png",
                DynamicImage::ImageLuma8(gaussian_blur_f32(&gray, sigma)),
            );
            let value = run(&blurred, &mask).primary_value().expect("measured");
            assert!(value < previous, "sigma {sigma}: {value} >= {previous}");
            previous = value;
        }
    }

    #[test]
    fn test_heavy_blur_fails_with_defocus_hint() {
        let (image, mask) = fixtures::document(320, 240, 20);
        let blurred = Image::new(
            "blurred.png",
            DynamicImage::ImageLuma8(gaussian_blur_f32(&image.to_luma8(), 5.0)),
        );
        let result = run(&blurred, &mask);
        assert_eq!(result.status, Status::Fail);
        assert!(result.recommendations.iter().any(|r| r.contains("Defocus")));
    }

    #[test]
    fn test_empty_mask_is_unmeasurable() {
        let (image, _) = fixtures::document(64, 64, 8);
        let result = run(&image, &DocumentMask::empty(64, 64));
        assert_eq!(result.status, Status::Fail);
        assert!(result.beyond_fail_threshold);
        assert!(result.diagnostic.is_some());
    }

    #[test]
    fn test_band_energies_sum_to_one() {
        let (image, mask) = fixtures::document(160, 120, 10);
        let bands = band_energies(&image.to_luma8(), mask.as_image());
        assert!((bands.iter().sum::<f64>() - 1.0).abs() < 1e-9);
    }
}
