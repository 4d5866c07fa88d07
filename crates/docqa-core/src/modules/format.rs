//! Container format, bit depth and compression quality.

use crate::domain::{
    Category, CategoryConfig, ConfigurationProfile, FormatParams, MetricComputer, MetricInput,
    MetricResult, Status,
};

/// Format-integrity computer.
#[derive(Debug, Clone)]
pub struct FormatComputer {
    config: CategoryConfig,
    params: FormatParams,
}

impl FormatComputer {
    /// Creates the computer.
    #[must_use]
    pub const fn new(config: CategoryConfig, params: FormatParams) -> Self {
        Self { config, params }
    }

    /// Builds the computer from a profile.
    #[must_use]
    pub fn from_profile(profile: &ConfigurationProfile) -> Self {
        Self::new(
            profile.categories.format_integrity.clone(),
            profile.params.format_integrity.clone(),
        )
    }
}

impl MetricComputer for FormatComputer {
    fn category(&self) -> Category {
        Category::FormatIntegrity
    }

    fn primary_measurement(&self) -> &'static str {
        "compression_quality"
    }

    fn config(&self) -> &CategoryConfig {
        &self.config
    }

    fn analyze(&self, input: &MetricInput<'_>) -> MetricResult {
        let metadata = &input.image.metadata;
        let format = metadata.format;
        let allowed = format.is_some_and(|f| self.params.allowed_formats.contains(&f));
        let lossy = format.is_some_and(|f| f.is_lossy());

        let (quality, estimated) = match (lossy, metadata.jpeg_quality) {
            (false, _) => (1.0, true),
            (true, Some(q)) => (q, true),
            (true, None) => (self.config.warn_threshold, false),
        };

        let mut result = self
            .classify(quality)
            .with("bit_depth", f64::from(metadata.bit_depth))
            .with("format_allowed", if allowed { 1.0 } else { 0.0 })
            .with("format_code", format.map_or(0.0, |f| f64::from(f.code())));

        if !estimated {
            result = result
                .degrade(Status::Warn)
                .with_diagnostic("compression quality could not be estimated");
        } else if result.status != Status::Pass {
            result = result.recommend(format!(
                "Compression quality {:.0}% is low: save at {:.0}% or better, or lossless",
                quality * 100.0,
                self.config.pass_threshold * 100.0
            ));
        }

        if metadata.bit_depth < self.params.min_bit_depth {
            result = result
                .fail_extreme()
                .with_diagnostic(format!(
                    "bit depth {} is below the required {}",
                    metadata.bit_depth, self.params.min_bit_depth
                ))
                .recommend(format!(
                    "Capture with at least {} bits per channel",
                    self.params.min_bit_depth
                ));
        }
        if !allowed {
            let name = format.map_or("unknown", |f| f.as_str());
            let accepted: Vec<&str> = self
                .params
                .allowed_formats
                .iter()
                .map(|f| f.as_str())
                .collect();
            result = result
                .fail_extreme()
                .with_diagnostic(format!("format '{name}' is not accepted"))
                .recommend(format!("Save as one of: {}", accepted.join(", ")));
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ContainerFormat, DocumentMask, Image};
    use image::DynamicImage;

    fn run(profile: &ConfigurationProfile, image: &Image) -> MetricResult {
        let mask = DocumentMask::empty(image.width, image.height);
        FormatComputer::from_profile(profile).analyze(&MetricInput {
            image,
            mask: &mask,
        })
    }

    fn image(format: ContainerFormat) -> Image {
        Image::new("x", DynamicImage::new_rgb8(8, 8)).with_format(format)
    }

    #[test]
    fn test_lossless_png_passes() {
        let result = run(&ConfigurationProfile::strict(), &image(ContainerFormat::Png));
        assert_eq!(result.status, Status::Pass);
        assert_eq!(result.primary_value(), Some(1.0));
        assert_eq!(result.measurement("format_code"), Some(2.0));
    }

    #[test]
    fn test_jpeg_quality_thresholds() {
        let profile = ConfigurationProfile::strict();
        let mut jpeg = image(ContainerFormat::Jpeg);
        jpeg.metadata.jpeg_quality = Some(0.92);
        assert_eq!(run(&profile, &jpeg).status, Status::Pass);
        jpeg.metadata.jpeg_quality = Some(0.75);
        assert_eq!(run(&profile, &jpeg).status, Status::Warn);
        jpeg.metadata.jpeg_quality = Some(0.5);
        let result = run(&profile, &jpeg);
        assert_eq!(result.status, Status::Fail);
        assert!(!result.recommendations.is_empty());
    }

    #[test]
    fn test_disallowed_format_is_extreme() {
        let result = run(&ConfigurationProfile::strict(), &image(ContainerFormat::Bmp));
        assert_eq!(result.status, Status::Fail);
        assert!(result.beyond_fail_threshold);
        assert_eq!(result.measurement("format_allowed"), Some(0.0));
    }

    #[test]
    fn test_unknown_format_is_extreme() {
        let plain = Image::new("x", DynamicImage::new_rgb8(8, 8));
        let result = run(&ConfigurationProfile::strict(), &plain);
        assert!(result.beyond_fail_threshold);
        assert_eq!(result.measurement("format_code"), Some(0.0));
    }

    #[test]
    fn test_archival_requires_sixteen_bits() {
        let result = run(&ConfigurationProfile::archival(), &image(ContainerFormat::Tiff));
        assert_eq!(result.status, Status::Fail);
        assert!(result
            .diagnostic
            .as_deref()
            .is_some_and(|d| d.contains("bit depth")));
    }

    #[test]
    fn test_unknown_jpeg_quality_warns() {
        let result = run(&ConfigurationProfile::strict(), &image(ContainerFormat::Jpeg));
        assert_eq!(result.status, Status::Warn);
        assert!(result.diagnostic.is_some());
    }
}
