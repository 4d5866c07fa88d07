//! Configuration profiles: per-category thresholds, weights and parameters.
//!
//! A profile is pure input data. It is validated once, before any image is
//! analyzed, and never written to by the pipeline.

use serde::{Deserialize, Serialize};

use super::{Category, ConfigError, ContainerFormat, Polarity, SlaRequirement, Status};

/// Thresholds, weight and polarity for one category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CategoryConfig {
    /// Whether the category is computed and scored.
    pub enabled: bool,
    /// Values on the good side of this pass.
    pub pass_threshold: f64,
    /// Values between pass and this warn.
    pub warn_threshold: f64,
    /// Bound of the extreme band. Falls back to `warn_threshold`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fail_threshold: Option<f64>,
    /// Weight in the global score.
    pub weight: f64,
    /// Direction in which values improve.
    pub polarity: Polarity,
    /// Whether an extreme FAIL forces the global status to FAIL.
    pub critical: bool,
}

impl Default for CategoryConfig {
    fn default() -> Self {
        Self::higher(0.0, 0.0)
    }
}

impl CategoryConfig {
    /// Higher-is-better category with unit weight.
    #[must_use]
    pub const fn higher(pass_threshold: f64, warn_threshold: f64) -> Self {
        Self {
            enabled: true,
            pass_threshold,
            warn_threshold,
            fail_threshold: None,
            weight: 1.0,
            polarity: Polarity::HigherIsBetter,
            critical: false,
        }
    }

    /// Lower-is-better category with unit weight.
    #[must_use]
    pub const fn lower(pass_threshold: f64, warn_threshold: f64) -> Self {
        Self {
            polarity: Polarity::LowerIsBetter,
            ..Self::higher(pass_threshold, warn_threshold)
        }
    }

    /// Marks the category critical.
    #[must_use]
    pub const fn critical(mut self) -> Self {
        self.critical = true;
        self
    }

    /// Sets an explicit extreme-band bound.
    #[must_use]
    pub const fn with_fail(mut self, fail_threshold: f64) -> Self {
        self.fail_threshold = Some(fail_threshold);
        self
    }

    /// Effective extreme-band bound.
    #[must_use]
    pub fn fail_threshold(&self) -> f64 {
        self.fail_threshold.unwrap_or(self.warn_threshold)
    }

    /// Two-threshold status derivation following the polarity.
    #[must_use]
    pub fn classify(&self, value: f64) -> Status {
        if value.is_nan() {
            return Status::Fail;
        }
        match self.polarity {
            Polarity::HigherIsBetter => {
                if value >= self.pass_threshold {
                    Status::Pass
                } else if value >= self.warn_threshold {
                    Status::Warn
                } else {
                    Status::Fail
                }
            }
            Polarity::LowerIsBetter => {
                if value <= self.pass_threshold {
                    Status::Pass
                } else if value <= self.warn_threshold {
                    Status::Warn
                } else {
                    Status::Fail
                }
            }
        }
    }

    /// Whether the value lies strictly beyond the extreme-band bound.
    #[must_use]
    pub fn is_extreme(&self, value: f64) -> bool {
        if value.is_nan() {
            return true;
        }
        match self.polarity {
            Polarity::HigherIsBetter => value < self.fail_threshold(),
            Polarity::LowerIsBetter => value > self.fail_threshold(),
        }
    }

    fn validate(&self, field: &str) -> Result<(), ConfigError> {
        for (name, value) in [
            ("pass_threshold", self.pass_threshold),
            ("warn_threshold", self.warn_threshold),
            ("fail_threshold", self.fail_threshold()),
            ("weight", self.weight),
        ] {
            if !value.is_finite() {
                return Err(ConfigError::invalid(
                    format!("{field}.{name}"),
                    "must be a finite number",
                ));
            }
        }
        if self.weight < 0.0 {
            return Err(ConfigError::invalid(
                format!("{field}.weight"),
                format!("must be >= 0, got {}", self.weight),
            ));
        }
        let ordered = match self.polarity {
            Polarity::HigherIsBetter => {
                self.pass_threshold >= self.warn_threshold
                    && self.warn_threshold >= self.fail_threshold()
            }
            Polarity::LowerIsBetter => {
                self.pass_threshold <= self.warn_threshold
                    && self.warn_threshold <= self.fail_threshold()
            }
        };
        if !ordered {
            return Err(ConfigError::invalid(
                format!("{field}.warn_threshold"),
                format!(
                    "thresholds out of order for {:?}: pass {}, warn {}, fail {}",
                    self.polarity,
                    self.pass_threshold,
                    self.warn_threshold,
                    self.fail_threshold()
                ),
            ));
        }
        Ok(())
    }
}

/// Per-category thresholds, one field per category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CategoryTable {
    /// Laplacian variance.
    pub sharpness: CategoryConfig,
    /// Clipping percentage.
    pub exposure: CategoryConfig,
    /// p95 - p5 luminance spread.
    pub contrast: CategoryConfig,
    /// Skew angle in degrees.
    pub geometry: CategoryConfig,
    /// Residual standard deviation.
    pub noise: CategoryConfig,
    /// Hue-cast angle in degrees.
    pub color: CategoryConfig,
    /// Largest margin ratio.
    pub border_background: CategoryConfig,
    /// Bounding-box coverage.
    pub completeness: CategoryConfig,
    /// Foreign-object area percentage.
    pub foreign_objects: CategoryConfig,
    /// Compression quality.
    pub format_integrity: CategoryConfig,
    /// Effective DPI.
    pub resolution: CategoryConfig,
    /// Shadow intensity.
    pub document_shadow: CategoryConfig,
}

impl Default for CategoryTable {
    fn default() -> Self {
        Self {
            sharpness: CategoryConfig::higher(150.0, 120.0),
            exposure: CategoryConfig::lower(0.5, 1.0),
            contrast: CategoryConfig::higher(0.20, 0.15),
            geometry: CategoryConfig::lower(1.0, 3.0).with_fail(3.0).critical(),
            noise: CategoryConfig::lower(0.04, 0.06),
            color: CategoryConfig::lower(6.0, 12.0),
            border_background: CategoryConfig::lower(0.10, 0.12).critical(),
            completeness: CategoryConfig::higher(0.90, 0.80).critical(),
            foreign_objects: CategoryConfig::lower(1.0, 3.0),
            format_integrity: CategoryConfig::higher(0.85, 0.70),
            resolution: CategoryConfig::higher(300.0, 300.0).critical(),
            document_shadow: CategoryConfig::lower(20.0, 40.0),
        }
    }
}

impl CategoryTable {
    /// Config for one category.
    #[must_use]
    pub const fn get(&self, category: Category) -> &CategoryConfig {
        match category {
            Category::Sharpness => &self.sharpness,
            Category::Exposure => &self.exposure,
            Category::Contrast => &self.contrast,
            Category::Geometry => &self.geometry,
            Category::Noise => &self.noise,
            Category::Color => &self.color,
            Category::BorderBackground => &self.border_background,
            Category::Completeness => &self.completeness,
            Category::ForeignObjects => &self.foreign_objects,
            Category::FormatIntegrity => &self.format_integrity,
            Category::Resolution => &self.resolution,
            Category::DocumentShadow => &self.document_shadow,
        }
    }

    /// Mutable config for one category.
    pub fn get_mut(&mut self, category: Category) -> &mut CategoryConfig {
        match category {
            Category::Sharpness => &mut self.sharpness,
            Category::Exposure => &mut self.exposure,
            Category::Contrast => &mut self.contrast,
            Category::Geometry => &mut self.geometry,
            Category::Noise => &mut self.noise,
            Category::Color => &mut self.color,
            Category::BorderBackground => &mut self.border_background,
            Category::Completeness => &mut self.completeness,
            Category::ForeignObjects => &mut self.foreign_objects,
            Category::FormatIntegrity => &mut self.format_integrity,
            Category::Resolution => &mut self.resolution,
            Category::DocumentShadow => &mut self.document_shadow,
        }
    }

    /// Enabled categories in reporting order.
    pub fn enabled(&self) -> impl Iterator<Item = Category> + '_ {
        Category::ALL
            .into_iter()
            .filter(move |c| self.get(*c).enabled)
    }
}

/// Profile-level score thresholds for the global status.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    /// Minimum score for a global PASS.
    pub pass_score_threshold: f64,
    /// Minimum score for a global WARN.
    pub warn_score_threshold: f64,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            pass_score_threshold: 0.80,
            warn_score_threshold: 0.65,
        }
    }
}

/// Binarization method used to find the document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThresholdMethod {
    /// Global Otsu threshold.
    #[default]
    Otsu,
    /// Local mean minus an offset.
    Adaptive,
    /// Pixels foreground under both Otsu and adaptive thresholds.
    Combined,
}

/// Document locator settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LocatorConfig {
    /// Binarization method.
    pub method: ThresholdMethod,
    /// Neighbourhood radius for adaptive thresholding.
    pub block_radius: u32,
    /// Offset subtracted from the local mean.
    pub offset: i32,
    /// Smallest plausible document, as a fraction of the frame.
    pub min_area_ratio: f64,
    /// Minimum gap between the Otsu class means, in gray levels.
    pub min_class_separation: f64,
}

impl Default for LocatorConfig {
    fn default() -> Self {
        Self {
            method: ThresholdMethod::Otsu,
            block_radius: 25,
            offset: 10,
            min_area_ratio: 0.05,
            min_class_separation: 20.0,
        }
    }
}

/// Sharpness computer parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SharpnessParams {
    /// Tile edge for local sharpness.
    pub tile_size: u32,
    /// Canny low threshold.
    pub canny_low: f32,
    /// Canny high threshold.
    pub canny_high: f32,
}

impl Default for SharpnessParams {
    fn default() -> Self {
        Self {
            tile_size: 64,
            canny_low: 50.0,
            canny_high: 150.0,
        }
    }
}

/// Exposure computer parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExposureParams {
    /// Pixels at or below this level count as clipped shadows.
    pub shadow_clip_level: u8,
    /// Pixels at or above this level count as clipped highlights.
    pub highlight_clip_level: u8,
    /// Tile edge for illumination uniformity.
    pub tile_size: u32,
    /// Uniformity (std/mean) above this warns.
    pub uniformity_warn: f64,
    /// Uniformity above this fails.
    pub uniformity_fail: f64,
}

impl Default for ExposureParams {
    fn default() -> Self {
        Self {
            shadow_clip_level: 0,
            highlight_clip_level: 255,
            tile_size: 64,
            uniformity_warn: 0.15,
            uniformity_fail: 0.25,
        }
    }
}

/// Contrast computer parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContrastParams {
    /// Tile edge for local contrast.
    pub tile_size: u32,
}

impl Default for ContrastParams {
    fn default() -> Self {
        Self { tile_size: 64 }
    }
}

/// Geometry computer parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeometryParams {
    /// Lower bound on the Hough vote threshold.
    pub min_votes: u32,
    /// Vote threshold as a fraction of the shorter document side.
    pub vote_fraction: f64,
    /// Hough non-maximum suppression radius.
    pub suppression_radius: u32,
}

impl Default for GeometryParams {
    fn default() -> Self {
        Self {
            min_votes: 50,
            vote_fraction: 0.15,
            suppression_radius: 8,
        }
    }
}

/// Noise computer parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NoiseParams {
    /// Mask erosion before sampling.
    pub erosion_px: u8,
    /// Patch edge.
    pub patch_size: u32,
    /// Smoothing sigma for the residual.
    pub smoothing_sigma: f32,
    /// Fraction of flattest patches treated as background.
    pub flat_fraction: f64,
    /// Patches rougher than this multiple of the flattest patch are dropped.
    pub flat_std_ratio: f64,
    /// Gray-level deviation always accepted as flat.
    pub min_flat_std: f64,
}

impl Default for NoiseParams {
    fn default() -> Self {
        Self {
            erosion_px: 5,
            patch_size: 16,
            smoothing_sigma: 1.0,
            flat_fraction: 0.25,
            flat_std_ratio: 2.0,
            min_flat_std: 2.0,
        }
    }
}

/// Color computer parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColorParams {
    /// Mask erosion before sampling paper.
    pub erosion_px: u8,
}

impl Default for ColorParams {
    fn default() -> Self {
        Self { erosion_px: 10 }
    }
}

/// Border and background computer parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BorderParams {
    /// Fail when the background is brighter than allowed.
    pub require_black_background: bool,
    /// Maximum background median luminance (0-1).
    pub max_bg_median_luminance: f64,
}

impl Default for BorderParams {
    fn default() -> Self {
        Self {
            require_black_background: true,
            max_bg_median_luminance: 0.10,
        }
    }
}

/// Completeness computer parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompletenessParams {
    /// Document pixels closer than this to the frame edge touch it.
    pub min_margin_px: u32,
}

impl Default for CompletenessParams {
    fn default() -> Self {
        Self { min_margin_px: 8 }
    }
}

/// Foreign-object computer parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForeignObjectParams {
    /// Background pixels brighter than this (0-1) are clip candidates.
    pub clip_luminance: f64,
    /// Minimum clip component area.
    pub min_clip_area: u32,
    /// Clips must lie within this distance of a frame edge.
    pub edge_proximity_px: u32,
    /// Minimum clip aspect ratio.
    pub min_aspect_ratio: f64,
    /// Maximum clip aspect ratio.
    pub max_aspect_ratio: f64,
    /// Minimum pixelation score for a clip.
    pub pixelation_threshold: f64,
    /// Document pixels darker than this (0-1) are dark-object candidates.
    pub dark_luminance: f64,
    /// Minimum dark component area.
    pub min_dark_area: u32,
    /// Minimum penetration into the document box.
    pub min_penetration: f64,
    /// Minimum surround/object brightness ratio.
    pub min_contrast_ratio: f64,
}

impl Default for ForeignObjectParams {
    fn default() -> Self {
        Self {
            clip_luminance: 0.15,
            min_clip_area: 1000,
            edge_proximity_px: 50,
            min_aspect_ratio: 0.1,
            max_aspect_ratio: 10.0,
            pixelation_threshold: 0.3,
            dark_luminance: 0.10,
            min_dark_area: 500,
            min_penetration: 0.05,
            min_contrast_ratio: 2.0,
        }
    }
}

/// Format-integrity computer parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FormatParams {
    /// Accepted containers.
    pub allowed_formats: Vec<ContainerFormat>,
    /// Minimum bits per channel.
    pub min_bit_depth: u8,
}

impl Default for FormatParams {
    fn default() -> Self {
        Self {
            allowed_formats: vec![
                ContainerFormat::Tiff,
                ContainerFormat::Png,
                ContainerFormat::Jpeg,
            ],
            min_bit_depth: 8,
        }
    }
}

/// Resolution computer parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolutionParams {
    /// Long side of the assumed paper, in inches, for DPI estimation.
    pub assumed_paper_long_side_in: f64,
    /// DPI used when nothing is declared and no document was found.
    pub default_dpi: f64,
}

impl Default for ResolutionParams {
    fn default() -> Self {
        Self {
            assumed_paper_long_side_in: 11.69,
            default_dpi: 72.0,
        }
    }
}

/// Document-shadow computer parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShadowParams {
    /// Width of the band sampled outside the document.
    pub band_px: u8,
    /// Intensity drop above which a shadow is reported present.
    pub shadow_threshold: f64,
}

impl Default for ShadowParams {
    fn default() -> Self {
        Self {
            band_px: 50,
            shadow_threshold: 25.0,
        }
    }
}

/// Category-specific parameters beyond the shared thresholds.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricParams {
    /// Sharpness.
    pub sharpness: SharpnessParams,
    /// Exposure.
    pub exposure: ExposureParams,
    /// Contrast.
    pub contrast: ContrastParams,
    /// Geometry.
    pub geometry: GeometryParams,
    /// Noise.
    pub noise: NoiseParams,
    /// Color.
    pub color: ColorParams,
    /// Border and background.
    pub border_background: BorderParams,
    /// Completeness.
    pub completeness: CompletenessParams,
    /// Foreign objects.
    pub foreign_objects: ForeignObjectParams,
    /// Format integrity.
    pub format_integrity: FormatParams,
    /// Resolution.
    pub resolution: ResolutionParams,
    /// Document shadow.
    pub document_shadow: ShadowParams,
}

/// A named bundle of thresholds, weights and parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfigurationProfile {
    /// Profile name, reported in results.
    pub name: String,
    /// Free-form description.
    pub description: String,
    /// Global status thresholds.
    pub scoring: ScoringConfig,
    /// Document locator settings.
    pub locator: LocatorConfig,
    /// Per-category thresholds.
    pub categories: CategoryTable,
    /// Per-category parameters.
    pub params: MetricParams,
    /// SLA requirement checked after scoring.
    pub sla: SlaRequirement,
}

impl Default for ConfigurationProfile {
    fn default() -> Self {
        Self::strict()
    }
}

impl ConfigurationProfile {
    /// Name of the default profile.
    pub const DEFAULT_NAME: &'static str = "document_black_background_strict";

    /// Names of the built-in profiles.
    pub const BUILTIN_NAMES: [&'static str; 3] = [
        Self::DEFAULT_NAME,
        "document_lenient",
        "archival_quality",
    ];

    /// Documents photographed on a black background, strict thresholds.
    #[must_use]
    pub fn strict() -> Self {
        Self {
            name: Self::DEFAULT_NAME.into(),
            description: "Documents on a black background with strict capture requirements"
                .into(),
            scoring: ScoringConfig::default(),
            locator: LocatorConfig::default(),
            categories: CategoryTable::default(),
            params: MetricParams::default(),
            sla: SlaRequirement::default(),
        }
    }

    /// Relaxed skew, margin and focus thresholds.
    #[must_use]
    pub fn lenient() -> Self {
        let mut profile = Self::strict();
        profile.name = "document_lenient".into();
        profile.description = "Relaxed thresholds for handheld captures".into();
        profile.categories.geometry = CategoryConfig::lower(2.0, 5.0).with_fail(5.0).critical();
        profile.categories.border_background = CategoryConfig::lower(0.15, 0.20).critical();
        profile.categories.sharpness = CategoryConfig::higher(100.0, 80.0);
        profile
    }

    /// Lossless, deep, high-resolution captures for long-term preservation.
    #[must_use]
    pub fn archival() -> Self {
        let mut profile = Self::strict();
        profile.name = "archival_quality".into();
        profile.description = "Preservation-grade captures: lossless, 16-bit, 400+ DPI".into();
        profile.categories.resolution = CategoryConfig::higher(400.0, 400.0).critical();
        profile.categories.sharpness = CategoryConfig::higher(200.0, 160.0);
        profile.categories.noise = CategoryConfig::lower(0.02, 0.03);
        profile.params.format_integrity = FormatParams {
            allowed_formats: vec![ContainerFormat::Tiff, ContainerFormat::Png],
            min_bit_depth: 16,
        };
        profile
    }

    /// Looks up a built-in profile by name.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::UnknownProfile`] for unknown names.
    pub fn builtin(name: &str) -> Result<Self, ConfigError> {
        match name {
            Self::DEFAULT_NAME => Ok(Self::strict()),
            "document_lenient" => Ok(Self::lenient()),
            "archival_quality" => Ok(Self::archival()),
            other => Err(ConfigError::UnknownProfile(other.to_string())),
        }
    }

    /// Config for one category.
    #[must_use]
    pub const fn category(&self, category: Category) -> &CategoryConfig {
        self.categories.get(category)
    }

    /// Checks every field range. Run before any image is processed.
    ///
    /// # Errors
    ///
    /// Returns the first invalid field found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.name.trim().is_empty() {
            return Err(ConfigError::invalid("name", "must not be empty"));
        }
        self.validate_scoring()?;
        self.validate_categories()?;
        self.validate_params()?;
        self.validate_sla()
    }

    fn validate_scoring(&self) -> Result<(), ConfigError> {
        let s = &self.scoring;
        unit_interval("scoring.pass_score_threshold", s.pass_score_threshold)?;
        unit_interval("scoring.warn_score_threshold", s.warn_score_threshold)?;
        if s.warn_score_threshold > s.pass_score_threshold {
            return Err(ConfigError::invalid(
                "scoring.warn_score_threshold",
                "must not exceed scoring.pass_score_threshold",
            ));
        }
        let l = &self.locator;
        if !(0.0..1.0).contains(&l.min_area_ratio) {
            return Err(ConfigError::invalid(
                "locator.min_area_ratio",
                format!("must be in [0, 1), got {}", l.min_area_ratio),
            ));
        }
        if l.block_radius == 0 {
            return Err(ConfigError::invalid("locator.block_radius", "must be > 0"));
        }
        Ok(())
    }

    fn validate_categories(&self) -> Result<(), ConfigError> {
        let mut total_weight = 0.0;
        for category in Category::ALL {
            let config = self.categories.get(category);
            config.validate(&format!("categories.{category}"))?;
            if config.enabled {
                total_weight += config.weight;
            }
        }
        if total_weight <= 0.0 {
            return Err(ConfigError::invalid(
                "categories",
                "at least one enabled category needs a positive weight",
            ));
        }
        Ok(())
    }

    fn validate_params(&self) -> Result<(), ConfigError> {
        let p = &self.params;
        for (field, value) in [
            ("params.sharpness.tile_size", p.sharpness.tile_size),
            ("params.exposure.tile_size", p.exposure.tile_size),
            ("params.contrast.tile_size", p.contrast.tile_size),
            ("params.noise.patch_size", p.noise.patch_size),
        ] {
            if value < 4 {
                return Err(ConfigError::invalid(field, format!("must be >= 4, got {value}")));
            }
        }
        if p.exposure.shadow_clip_level >= p.exposure.highlight_clip_level {
            return Err(ConfigError::invalid(
                "params.exposure.shadow_clip_level",
                "must be below params.exposure.highlight_clip_level",
            ));
        }
        if p.exposure.uniformity_warn > p.exposure.uniformity_fail {
            return Err(ConfigError::invalid(
                "params.exposure.uniformity_warn",
                "must not exceed params.exposure.uniformity_fail",
            ));
        }
        if !(0.0..=1.0).contains(&p.noise.flat_fraction) || p.noise.flat_fraction == 0.0 {
            return Err(ConfigError::invalid(
                "params.noise.flat_fraction",
                "must be in (0, 1]",
            ));
        }
        unit_interval(
            "params.border_background.max_bg_median_luminance",
            p.border_background.max_bg_median_luminance,
        )?;
        unit_interval(
            "params.foreign_objects.clip_luminance",
            p.foreign_objects.clip_luminance,
        )?;
        unit_interval(
            "params.foreign_objects.dark_luminance",
            p.foreign_objects.dark_luminance,
        )?;
        if p.foreign_objects.min_aspect_ratio > p.foreign_objects.max_aspect_ratio {
            return Err(ConfigError::invalid(
                "params.foreign_objects.min_aspect_ratio",
                "must not exceed params.foreign_objects.max_aspect_ratio",
            ));
        }
        if p.format_integrity.allowed_formats.is_empty() {
            return Err(ConfigError::invalid(
                "params.format_integrity.allowed_formats",
                "must list at least one format",
            ));
        }
        if p.resolution.assumed_paper_long_side_in <= 0.0 || p.resolution.default_dpi <= 0.0 {
            return Err(ConfigError::invalid(
                "params.resolution",
                "paper size and default DPI must be positive",
            ));
        }
        if p.document_shadow.band_px < 3 {
            return Err(ConfigError::invalid(
                "params.document_shadow.band_px",
                "must be >= 3",
            ));
        }
        Ok(())
    }

    fn validate_sla(&self) -> Result<(), ConfigError> {
        let sla = &self.sla;
        unit_interval("sla.min_overall_score", sla.min_overall_score)?;
        unit_interval("sla.excellent_min_score", sla.excellent_min_score)?;
        unit_interval("sla.warning_min_score", sla.warning_min_score)?;
        if sla.warning_min_score > sla.min_overall_score {
            return Err(ConfigError::invalid(
                "sla.warning_min_score",
                "must not exceed sla.min_overall_score",
            ));
        }
        if !sla.enabled {
            return Ok(());
        }
        for category in sla
            .required_pass_categories
            .iter()
            .chain(&sla.performance_targets)
        {
            if !self.categories.get(*category).enabled {
                return Err(ConfigError::invalid(
                    "sla.required_pass_categories",
                    format!("category '{category}' is disabled in this profile"),
                ));
            }
        }
        Ok(())
    }
}

fn unit_interval(field: &str, value: f64) -> Result<(), ConfigError> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::invalid(
            field,
            format!("must be in [0, 1], got {value}"),
        ))
    }
}
