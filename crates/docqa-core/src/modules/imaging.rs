//! Shared image statistics used by the locator and the metric computers.

#![allow(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_possible_wrap,
    clippy::cast_sign_loss
)]

use image::{GrayImage, Luma};
use imageproc::distance_transform::Norm;
use imageproc::drawing::draw_polygon_mut;
use imageproc::geometry::convex_hull;
use imageproc::morphology::erode;
use imageproc::point::Point;

/// 256-bin histogram of luminance values.
#[derive(Debug, Clone)]
pub struct Histogram {
    bins: [u64; 256],
    total: u64,
}

impl Default for Histogram {
    fn default() -> Self {
        Self {
            bins: [0; 256],
            total: 0,
        }
    }
}

impl Histogram {
    /// Compute histogram from grayscale image.
    #[must_use]
    pub fn from_luma(image: &GrayImage) -> Self {
        let mut histogram = Self::default();
        for pixel in image.pixels() {
            histogram.add(pixel.0[0]);
        }
        histogram
    }

    /// Histogram of the pixels where `mask` is non-zero.
    #[must_use]
    pub fn from_masked(image: &GrayImage, mask: &GrayImage) -> Self {
        let mut histogram = Self::default();
        for (pixel, m) in image.pixels().zip(mask.pixels()) {
            if m.0[0] != 0 {
                histogram.add(pixel.0[0]);
            }
        }
        histogram
    }

    /// Adds one sample.
    pub fn add(&mut self, value: u8) {
        self.bins[usize::from(value)] += 1;
        self.total += 1;
    }

    /// Returns the total pixel count.
    #[must_use]
    pub const fn total(&self) -> u64 {
        self.total
    }

    /// Calculate percentile value (0.0-1.0 → luminance 0-255).
    #[must_use]
    pub fn percentile(&self, p: f64) -> u8 {
        if self.total == 0 {
            return 0;
        }
        let target = (self.total as f64 * p.clamp(0.0, 1.0)).round() as u64;
        let mut cumulative = 0u64;
        for (i, &count) in self.bins.iter().enumerate() {
            cumulative += count;
            if cumulative >= target {
                return i as u8;
            }
        }
        255
    }

    /// Median luminance.
    #[must_use]
    pub fn median(&self) -> u8 {
        self.percentile(0.5)
    }

    /// Calculate mean luminance.
    #[must_use]
    pub fn mean(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        let sum: u64 = self
            .bins
            .iter()
            .enumerate()
            .map(|(i, &count)| (i as u64) * count)
            .sum();
        sum as f64 / self.total as f64
    }

    /// Calculate standard deviation of luminance.
    #[must_use]
    pub fn std_dev(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        let mean = self.mean();
        let variance: f64 = self
            .bins
            .iter()
            .enumerate()
            .map(|(i, &count)| {
                let diff = (i as f64) - mean;
                diff * diff * (count as f64)
            })
            .sum::<f64>()
            / (self.total as f64);
        variance.sqrt()
    }

    /// Count pixels below or equal to a threshold.
    #[must_use]
    pub fn count_below(&self, threshold: u8) -> u64 {
        self.bins[..=usize::from(threshold)].iter().sum()
    }

    /// Count pixels above or equal to a threshold.
    #[must_use]
    pub fn count_above(&self, threshold: u8) -> u64 {
        self.bins[usize::from(threshold)..].iter().sum()
    }

    /// Fraction of pixels below or equal to threshold.
    #[must_use]
    pub fn fraction_below(&self, threshold: u8) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        self.count_below(threshold) as f64 / self.total as f64
    }

    /// Fraction of pixels above or equal to threshold.
    #[must_use]
    pub fn fraction_above(&self, threshold: u8) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        self.count_above(threshold) as f64 / self.total as f64
    }

    /// Otsu split maximizing between-class variance.
    ///
    /// Returns `None` when every sample falls in a single bin.
    #[must_use]
    pub fn otsu(&self) -> Option<OtsuSplit> {
        if self.total == 0 {
            return None;
        }
        let sum_total: f64 = self
            .bins
            .iter()
            .enumerate()
            .map(|(i, &count)| i as f64 * count as f64)
            .sum();

        let mut sum_background = 0.0;
        let mut weight_background = 0u64;
        let mut best: Option<OtsuSplit> = None;
        let mut max_variance = 0.0;

        for (t, &count) in self.bins.iter().enumerate() {
            weight_background += count;
            if weight_background == 0 {
                continue;
            }
            let weight_foreground = self.total - weight_background;
            if weight_foreground == 0 {
                break;
            }

            sum_background += t as f64 * count as f64;
            let low_mean = sum_background / weight_background as f64;
            let high_mean = (sum_total - sum_background) / weight_foreground as f64;
            let between = weight_background as f64
                * weight_foreground as f64
                * (low_mean - high_mean).powi(2);

            if between > max_variance {
                max_variance = between;
                best = Some(OtsuSplit {
                    threshold: t as u8,
                    low_mean,
                    high_mean,
                });
            }
        }
        best
    }
}

/// Result of an Otsu split. Pixels `<= threshold` form the low class.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OtsuSplit {
    /// Last gray level of the low class.
    pub threshold: u8,
    /// Mean of the low class.
    pub low_mean: f64,
    /// Mean of the high class.
    pub high_mean: f64,
}

impl OtsuSplit {
    /// Gap between the class means in gray levels.
    #[must_use]
    pub fn separation(&self) -> f64 {
        self.high_mean - self.low_mean
    }
}

/// Streaming mean and variance.
#[derive(Debug, Clone, Copy, Default)]
pub struct RunningStats {
    count: u64,
    sum: f64,
    sum_sq: f64,
}

impl RunningStats {
    /// Adds one sample.
    pub fn add(&mut self, value: f64) {
        self.count += 1;
        self.sum += value;
        self.sum_sq += value * value;
    }

    /// Number of samples.
    #[must_use]
    pub const fn count(&self) -> u64 {
        self.count
    }

    /// Sample mean, 0 when empty.
    #[must_use]
    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.sum / self.count as f64
        }
    }

    /// Population variance, 0 when empty.
    #[must_use]
    pub fn variance(&self) -> f64 {
        if self.count == 0 {
            return 0.0;
        }
        let mean = self.mean();
        (self.sum_sq / self.count as f64 - mean * mean).max(0.0)
    }

    /// Population standard deviation.
    #[must_use]
    pub fn std_dev(&self) -> f64 {
        self.variance().sqrt()
    }
}

impl FromIterator<f64> for RunningStats {
    fn from_iter<I: IntoIterator<Item = f64>>(iter: I) -> Self {
        let mut stats = Self::default();
        for value in iter {
            stats.add(value);
        }
        stats
    }
}

/// A rectangular tile of the frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tile {
    /// Left edge.
    pub x: u32,
    /// Top edge.
    pub y: u32,
    /// Width, clipped at the frame edge.
    pub width: u32,
    /// Height, clipped at the frame edge.
    pub height: u32,
}

impl Tile {
    /// Pixel coordinates covered by the tile.
    pub fn pixels(self) -> impl Iterator<Item = (u32, u32)> {
        (self.y..self.y + self.height)
            .flat_map(move |y| (self.x..self.x + self.width).map(move |x| (x, y)))
    }

    /// Number of pixels in the tile.
    #[must_use]
    pub const fn area(self) -> u64 {
        self.width as u64 * self.height as u64
    }
}

/// Splits a frame into `size` x `size` tiles; edge tiles are clipped.
pub fn tiles(width: u32, height: u32, size: u32) -> impl Iterator<Item = Tile> {
    let size = size.max(1);
    (0..height.div_ceil(size)).flat_map(move |ty| {
        (0..width.div_ceil(size)).map(move |tx| {
            let x = tx * size;
            let y = ty * size;
            Tile {
                x,
                y,
                width: size.min(width - x),
                height: size.min(height - y),
            }
        })
    })
}

/// Fraction of a tile covered by the mask.
#[must_use]
pub fn mask_coverage(mask: &GrayImage, tile: Tile) -> f64 {
    if tile.area() == 0 {
        return 0.0;
    }
    let covered = tile
        .pixels()
        .filter(|&(x, y)| mask.get_pixel(x, y).0[0] != 0)
        .count();
    covered as f64 / tile.area() as f64
}

/// Shrinks the mask by `radius` pixels (chessboard distance).
#[must_use]
pub fn erode_mask(mask: &GrayImage, radius: u8) -> GrayImage {
    if radius == 0 {
        return mask.clone();
    }
    erode(mask, Norm::LInf, radius)
}

/// Mask pixels with a 4-neighbour outside the mask.
///
/// With `frame_is_outside` unset, the image border does not count as
/// outside, so a document cut off by the frame has no outline along the cut.
#[must_use]
pub fn mask_outline(mask: &GrayImage, frame_is_outside: bool) -> GrayImage {
    let (width, height) = mask.dimensions();
    let inside = |x: i64, y: i64| {
        if x < 0 || y < 0 || x >= i64::from(width) || y >= i64::from(height) {
            !frame_is_outside
        } else {
            mask.get_pixel(x as u32, y as u32).0[0] != 0
        }
    };
    GrayImage::from_fn(width, height, |x, y| {
        let (cx, cy) = (i64::from(x), i64::from(y));
        let edge = inside(cx, cy)
            && [(-1, 0), (1, 0), (0, -1), (0, 1)]
                .iter()
                .any(|&(dx, dy)| !inside(cx + dx, cy + dy));
        Luma([if edge { 255 } else { 0 }])
    })
}

/// The mask with its convex hull filled in.
///
/// Notches cut into the outline, such as a finger entering from the edge of
/// the page, become part of the returned region.
#[must_use]
pub fn convex_hull_mask(mask: &GrayImage) -> GrayImage {
    let points: Vec<Point<i32>> = mask_outline(mask, true)
        .enumerate_pixels()
        .filter(|(_, _, p)| p.0[0] != 0)
        .map(|(x, y, _)| Point::new(x as i32, y as i32))
        .collect();
    let mut hull = convex_hull(points);
    if hull.len() > 1 && hull.first() == hull.last() {
        hull.pop();
    }
    let mut filled = mask.clone();
    if hull.len() >= 3 {
        draw_polygon_mut(&mut filled, &hull, Luma([255]));
    }
    filled
}

/// Linear-interpolated percentile of unsorted samples.
#[must_use]
pub fn percentile(values: &[f64], p: f64) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let rank = p.clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;
    let weight = rank - lower as f64;
    Some(sorted[lower] * (1.0 - weight) + sorted[upper] * weight)
}

/// Median of unsorted samples.
#[must_use]
pub fn median(values: &[f64]) -> Option<f64> {
    percentile(values, 0.5)
}

/// Summed-area table for constant-time box means.
#[derive(Debug, Clone)]
pub struct IntegralImage {
    table: Vec<u64>,
    width: u32,
    height: u32,
}

impl IntegralImage {
    /// Builds the table. Entry `(x, y)` holds the sum of all pixels above
    /// and left of it, exclusive; the table is zero-padded by one.
    #[must_use]
    pub fn new(gray: &GrayImage) -> Self {
        let (width, height) = gray.dimensions();
        let stride = width as usize + 1;
        let mut table = vec![0u64; stride * (height as usize + 1)];
        for y in 0..height {
            let mut row_sum = 0u64;
            for x in 0..width {
                row_sum += u64::from(gray.get_pixel(x, y).0[0]);
                let idx = (y as usize + 1) * stride + x as usize + 1;
                let above = y as usize * stride + x as usize + 1;
                table[idx] = row_sum + table[above];
            }
        }
        Self {
            table,
            width,
            height,
        }
    }

    /// Mean over the square of `radius` around `(cx, cy)`, clipped to the frame.
    #[must_use]
    pub fn region_mean(&self, cx: u32, cy: u32, radius: u32) -> f64 {
        let stride = self.width as usize + 1;
        let x1 = cx.saturating_sub(radius) as usize;
        let y1 = cy.saturating_sub(radius) as usize;
        let x2 = (cx.saturating_add(radius).saturating_add(1) as usize).min(self.width as usize);
        let y2 = (cy.saturating_add(radius).saturating_add(1) as usize).min(self.height as usize);
        if x2 <= x1 || y2 <= y1 {
            return 0.0;
        }
        let area = ((x2 - x1) * (y2 - y1)) as f64;
        let sum = self.table[y2 * stride + x2] as f64 - self.table[y1 * stride + x2] as f64
            - self.table[y2 * stride + x1] as f64
            + self.table[y1 * stride + x1] as f64;
        sum / area
    }
}

/// Sobel gradient magnitude of every pixel.
#[must_use]
pub fn gradient_magnitudes(gray: &GrayImage) -> Vec<f64> {
    let gx = imageproc::gradients::horizontal_sobel(gray);
    let gy = imageproc::gradients::vertical_sobel(gray);
    gx.pixels()
        .zip(gy.pixels())
        .map(|(x, y)| f64::from(x.0[0]).hypot(f64::from(y.0[0])))
        .collect()
}
