//! Quality categories, tri-state status and metric polarity.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// One independent quality dimension of a document capture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    /// Focus, measured by Laplacian variance.
    Sharpness,
    /// Clipping and illumination uniformity.
    Exposure,
    /// Global luminance spread.
    Contrast,
    /// Skew and warp of straight edges.
    Geometry,
    /// Residual noise on background patches.
    Noise,
    /// Color cast of the paper.
    Color,
    /// Margins and background darkness.
    BorderBackground,
    /// Whether the full document is in frame.
    Completeness,
    /// Clips, tools, fingers and other intruders.
    ForeignObjects,
    /// Container format, bit depth and compression.
    FormatIntegrity,
    /// Pixel density.
    Resolution,
    /// Cast shadow around the document edge.
    DocumentShadow,
}

impl Category {
    /// Every category, in reporting order.
    pub const ALL: [Self; 12] = [
        Self::Sharpness,
        Self::Exposure,
        Self::Contrast,
        Self::Geometry,
        Self::Noise,
        Self::Color,
        Self::BorderBackground,
        Self::Completeness,
        Self::ForeignObjects,
        Self::FormatIntegrity,
        Self::Resolution,
        Self::DocumentShadow,
    ];

    /// Returns the snake_case name used in results and configuration.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Sharpness => "sharpness",
            Self::Exposure => "exposure",
            Self::Contrast => "contrast",
            Self::Geometry => "geometry",
            Self::Noise => "noise",
            Self::Color => "color",
            Self::BorderBackground => "border_background",
            Self::Completeness => "completeness",
            Self::ForeignObjects => "foreign_objects",
            Self::FormatIntegrity => "format_integrity",
            Self::Resolution => "resolution",
            Self::DocumentShadow => "document_shadow",
        }
    }

    /// Whether a critical FAIL only forces the global verdict inside the
    /// extreme band. Other critical categories override on any FAIL.
    #[must_use]
    pub const fn overrides_only_when_extreme(self) -> bool {
        matches!(self, Self::Geometry)
    }

    /// Operator-facing action for a capture that misses this category.
    #[must_use]
    pub const fn action(self) -> &'static str {
        match self {
            Self::Sharpness => "Retake photo with better focus or use a tripod",
            Self::Exposure => "Adjust lighting or camera exposure settings",
            Self::Contrast => "Improve lighting conditions or post-process contrast",
            Self::Geometry => "Straighten document or adjust camera angle",
            Self::Noise => "Use a lower ISO setting or better lighting",
            Self::Color => "Use neutral lighting or apply white balance",
            Self::BorderBackground => "Ensure black background and proper margins",
            Self::Completeness => "Ensure full document is captured with margins",
            Self::ForeignObjects => "Remove hands, clips, or other objects from frame",
            Self::FormatIntegrity => "Save as TIFF, PNG, or high-quality JPEG",
            Self::Resolution => "Capture at a higher resolution or move closer",
            Self::DocumentShadow => "Remove shadows by repositioning lights",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| format!("unknown category '{s}'"))
    }
}

/// Tri-state outcome of a category or of the whole analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Status {
    /// Meets the pass threshold.
    Pass,
    /// Between pass and warn thresholds.
    Warn,
    /// Misses the warn threshold or could not be measured.
    Fail,
}

impl Status {
    /// Normalized score used by weighted aggregation.
    #[must_use]
    pub const fn score(self) -> f64 {
        match self {
            Self::Pass => 1.0,
            Self::Warn => 0.75,
            Self::Fail => 0.0,
        }
    }

    /// Returns the worse of two statuses.
    #[must_use]
    pub const fn worst(self, other: Self) -> Self {
        match (self, other) {
            (Self::Fail, _) | (_, Self::Fail) => Self::Fail,
            (Self::Warn, _) | (_, Self::Warn) => Self::Warn,
            _ => Self::Pass,
        }
    }

    /// Quality rank: higher is better.
    #[must_use]
    pub const fn rank(self) -> u8 {
        match self {
            Self::Pass => 2,
            Self::Warn => 1,
            Self::Fail => 0,
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Pass => "PASS",
            Self::Warn => "WARN",
            Self::Fail => "FAIL",
        })
    }
}

/// Direction in which raw measurement values improve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Polarity {
    /// Larger values are better (sharpness, contrast, coverage).
    HigherIsBetter,
    /// Smaller values are better (skew, clipping, noise).
    LowerIsBetter,
}
