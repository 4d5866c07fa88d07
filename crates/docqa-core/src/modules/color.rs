//! Paper color cast in CIELAB.

use super::imaging::{erode_mask, Histogram};
use super::NO_DOCUMENT;
use crate::domain::{
    Category, CategoryConfig, ColorParams, ConfigurationProfile, MetricComputer, MetricInput,
    MetricResult, Status,
};

/// D65 reference white.
const WHITE: [f64; 3] = [0.950_47, 1.0, 1.088_83];

/// Converts an 8-bit sRGB triple to CIELAB (D65).
#[must_use]
pub fn srgb_to_lab(rgb: [f64; 3]) -> [f64; 3] {
    let linear = rgb.map(|c| {
        let c = c / 255.0;
        if c <= 0.040_45 {
            c / 12.92
        } else {
            ((c + 0.055) / 1.055).powf(2.4)
        }
    });
    let [r, g, b] = linear;
    let xyz = [
        0.412_456_4 * r + 0.357_576_1 * g + 0.180_437_5 * b,
        0.212_672_9 * r + 0.715_152_2 * g + 0.072_175_0 * b,
        0.019_333_9 * r + 0.119_192_0 * g + 0.950_304_1 * b,
    ];
    let f = |t: f64| {
        if t > 216.0 / 24389.0 {
            t.cbrt()
        } else {
            (24389.0 / 27.0 * t + 16.0) / 116.0
        }
    };
    let fx = f(xyz[0] / WHITE[0]);
    let fy = f(xyz[1] / WHITE[1]);
    let fz = f(xyz[2] / WHITE[2]);
    [116.0 * fy - 16.0, 500.0 * (fx - fy), 200.0 * (fy - fz)]
}

/// Color computer.
#[derive(Debug, Clone)]
pub struct ColorComputer {
    config: CategoryConfig,
    params: ColorParams,
}

impl ColorComputer {
    /// Creates the computer.
    #[must_use]
    pub const fn new(config: CategoryConfig, params: ColorParams) -> Self {
        Self { config, params }
    }

    /// Builds the computer from a profile.
    #[must_use]
    pub fn from_profile(profile: &ConfigurationProfile) -> Self {
        Self::new(profile.categories.color.clone(), profile.params.color.clone())
    }
}

impl MetricComputer for ColorComputer {
    fn category(&self) -> Category {
        Category::Color
    }

    fn primary_measurement(&self) -> &'static str {
        "hue_cast_angle"
    }

    fn config(&self) -> &CategoryConfig {
        &self.config
    }

    #[allow(clippy::cast_precision_loss)]
    fn analyze(&self, input: &MetricInput<'_>) -> MetricResult {
        if !input.image.has_color() {
            return self.classify(0.0).with_diagnostic("grayscale image");
        }
        if input.mask.is_empty() {
            return self.unmeasurable(NO_DOCUMENT);
        }

        let rgb = input.image.to_rgb8();
        let gray = input.image.to_luma8();
        let eroded = erode_mask(input.mask.as_image(), self.params.erosion_px);
        let paper_floor = Histogram::from_masked(&gray, &eroded).median();

        let mut sum = [0.0f64; 3];
        let mut count = 0u64;
        for ((pixel, luma), m) in rgb.pixels().zip(gray.pixels()).zip(eroded.pixels()) {
            if m.0[0] != 0 && luma.0[0] >= paper_floor {
                for (s, c) in sum.iter_mut().zip(pixel.0) {
                    *s += f64::from(c);
                }
                count += 1;
            }
        }
        if count == 0 {
            return self.unmeasurable("no paper pixels inside the document");
        }
        let mean = sum.map(|s| s / count as f64);
        let [l, a, b] = srgb_to_lab(mean);
        let chroma = a.hypot(b);
        let cast_angle = chroma.atan2(l).to_degrees();

        let result = self
            .classify(cast_angle)
            .with("lab_l", l)
            .with("lab_a", a)
            .with("lab_b", b)
            .with("chroma", chroma)
            .with("hue_angle", b.atan2(a).to_degrees().rem_euclid(360.0))
            .with("delta_e_neutral", chroma);

        if result.status == Status::Pass {
            result
        } else {
            let tint = match (a >= 0.0, b >= 0.0) {
                (true, true) => "warm",
                (true, false) => "magenta",
                (false, true) => "green-yellow",
                (false, false) => "cool",
            };
            result.recommend(format!(
                "Paper shows a {tint} color cast: set white balance under neutral light"
            ))
        }
    }
}

#[cfg(test)]
#[allow(clippy::expect_used)]
mod tests {
    use super::*;
    use crate::domain::{DocumentMask, Image};
    use crate::modules::fixtures;
    use image::{DynamicImage, Rgb};

    fn run(image: &Image, mask: &DocumentMask) -> MetricResult {
        ColorComputer::from_profile(&ConfigurationProfile::strict())
            .analyze(&MetricInput { image, mask })
    }

    #[test]
    fn test_lab_reference_points() {
        let white = srgb_to_lab([255.0, 255.0, 255.0]);
        assert!((white[0] - 100.0).abs() < 0.01);
        assert!(white[1].abs() < 0.01 && white[2].abs() < 0.01);

        let black = srgb_to_lab([0.0, 0.0, 0.0]);
        assert!(black[0].abs() < 0.01);

        let red = srgb_to_lab([255.0, 0.0, 0.0]);
        assert!((red[0] - 53.24).abs() < 0.1, "L = {}", red[0]);
        assert!((red[1] - 80.09).abs() < 0.2, "a = {}", red[1]);
    }

    #[test]
    fn test_neutral_paper_passes() {
        let (image, mask) = fixtures::document(200, 160, 16);
        let result = run(&image, &mask);
        assert_eq!(result.status, Status::Pass, "{result:?}");
        assert!(result.primary_value().expect("measured") < 3.0);
    }

    #[test]
    fn test_yellow_paper_fails() {
        let (image, mask) = fixtures::document(200, 160, 16);
        let mut rgb = image.to_rgb8();
        for (x, y, p) in rgb.enumerate_pixels_mut() {
            if mask.contains(x, y) && p.0 == fixtures::PAPER {
                *p = Rgb([240, 225, 150]);
            }
        }
        let yellow = Image::new("yellow.png", DynamicImage::ImageRgb8(rgb));
        let result = run(&yellow, &mask);
        assert_eq!(result.status, Status::Fail);
        assert!(result.recommendations[0].contains("color cast"));
        assert!(result.measurement("lab_b").expect("measured") > 20.0);
    }

    #[test]
    fn test_grayscale_image_passes() {
        let (image, mask) = fixtures::document(100, 100, 10);
        let gray = fixtures::map_gray(&image, |_, _, v| v);
        let result = run(&gray, &mask);
        assert_eq!(result.status, Status::Pass);
        assert_eq!(result.diagnostic.as_deref(), Some("grayscale image"));
    }
}
