//! Sensor noise on flat paper and JPEG blockiness.

#![allow(clippy::cast_precision_loss, clippy::cast_possible_truncation, clippy::cast_sign_loss)]

use image::GrayImage;
use imageproc::filter::gaussian_blur_f32;

use super::imaging::{erode_mask, tiles, RunningStats, Tile};
use super::NO_DOCUMENT;
use crate::domain::{
    Category, CategoryConfig, ConfigurationProfile, MetricComputer, MetricInput, MetricResult,
    NoiseParams, Status,
};

/// JPEG block size.
const BLOCK: u32 = 8;

/// Noise computer.
#[derive(Debug, Clone)]
pub struct NoiseComputer {
    config: CategoryConfig,
    params: NoiseParams,
}

impl NoiseComputer {
    /// Creates the computer.
    #[must_use]
    pub const fn new(config: CategoryConfig, params: NoiseParams) -> Self {
        Self { config, params }
    }

    /// Builds the computer from a profile.
    #[must_use]
    pub fn from_profile(profile: &ConfigurationProfile) -> Self {
        Self::new(profile.categories.noise.clone(), profile.params.noise.clone())
    }

    /// Patches fully inside the eroded mask, flattest first, truncated to
    /// the configured fraction.
    ///
    /// Patches much rougher than the flattest one hold print, not paper, and
    /// are dropped even when the fraction would keep them.
    fn flat_patches(&self, gray: &GrayImage, eroded: &GrayImage) -> Vec<Tile> {
        let size = self.params.patch_size;
        let mut scored: Vec<(f64, Tile)> = tiles(gray.width(), gray.height(), size)
            .filter(|t| t.width == size && t.height == size)
            .filter(|t| t.pixels().all(|(x, y)| eroded.get_pixel(x, y).0[0] != 0))
            .map(|t| {
                let stats: RunningStats = t
                    .pixels()
                    .map(|(x, y)| f64::from(gray.get_pixel(x, y).0[0]))
                    .collect();
                (stats.std_dev(), t)
            })
            .collect();
        scored.sort_by(|a, b| a.0.total_cmp(&b.0));
        let keep = ((scored.len() as f64 * self.params.flat_fraction).ceil() as usize).max(1);
        let Some(&(flattest, _)) = scored.first() else {
            return Vec::new();
        };
        let limit = (flattest * self.params.flat_std_ratio).max(self.params.min_flat_std);
        scored
            .into_iter()
            .take(keep)
            .take_while(|&(std, _)| std <= limit)
            .map(|(_, t)| t)
            .collect()
    }
}

impl MetricComputer for NoiseComputer {
    fn category(&self) -> Category {
        Category::Noise
    }

    fn primary_measurement(&self) -> &'static str {
        "noise_std"
    }

    fn config(&self) -> &CategoryConfig {
        &self.config
    }

    fn analyze(&self, input: &MetricInput<'_>) -> MetricResult {
        if input.mask.is_empty() {
            return self.unmeasurable(NO_DOCUMENT);
        }
        let gray = input.image.to_luma8();
        let eroded = erode_mask(input.mask.as_image(), self.params.erosion_px);
        let patches = self.flat_patches(&gray, &eroded);
        if patches.is_empty() {
            return self.unmeasurable("no flat background patches inside the document");
        }

        let smooth = gaussian_blur_f32(&gray, self.params.smoothing_sigma);
        let residual: RunningStats = patches
            .iter()
            .flat_map(|t| t.pixels())
            .map(|(x, y)| {
                (f64::from(gray.get_pixel(x, y).0[0]) - f64::from(smooth.get_pixel(x, y).0[0]))
                    / 255.0
            })
            .collect();

        let result = self
            .classify(residual.std_dev())
            .with("blockiness", blockiness(&gray, input.mask.as_image()))
            .with("patch_count", patches.len() as f64);

        if result.status == Status::Pass {
            result
        } else {
            result.recommend("Background noise is high: lower the ISO or add light")
        }
    }
}

/// Ratio of the mean gradient across 8-pixel block boundaries to the mean
/// gradient elsewhere. Values well above 1 indicate visible JPEG blocks.
fn blockiness(gray: &GrayImage, mask: &GrayImage) -> f64 {
    let (width, height) = gray.dimensions();
    let mut boundary = RunningStats::default();
    let mut interior = RunningStats::default();
    let at = |x: u32, y: u32| f64::from(gray.get_pixel(x, y).0[0]);
    let inside = |x: u32, y: u32| mask.get_pixel(x, y).0[0] != 0;

    for y in 0..height {
        for x in 0..width.saturating_sub(1) {
            if inside(x, y) && inside(x + 1, y) {
                let g = (at(x + 1, y) - at(x, y)).abs();
                if x % BLOCK == BLOCK - 1 {
                    boundary.add(g);
                } else {
                    interior.add(g);
                }
            }
        }
    }
    for y in 0..height.saturating_sub(1) {
        for x in 0..width {
            if inside(x, y) && inside(x, y + 1) {
                let g = (at(x, y + 1) - at(x, y)).abs();
                if y % BLOCK == BLOCK - 1 {
                    boundary.add(g);
                } else {
                    interior.add(g);
                }
            }
        }
    }
    if interior.mean() <= f64::EPSILON {
        return if boundary.mean() <= f64::EPSILON { 1.0 } else { f64::from(u8::MAX) };
    }
    boundary.mean() / interior.mean()
}
