//! Analysis result types.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::{BoundingBox, Category, ContainerFormat, MetricResult, SlaSection, Status};

/// Complete analysis result for a single image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    /// Where the image came from and how it was analyzed.
    pub metadata: ResultMetadata,
    /// Aggregate verdict.
    pub global: GlobalVerdict,
    /// Per-category results in reporting order.
    pub metrics: BTreeMap<Category, MetricResult>,
    /// Deduplicated operator actions.
    pub recommendations: Vec<String>,
    /// SLA verdict.
    pub sla: SlaSection,
}

impl AnalysisResult {
    /// Status of one category, if it was computed.
    #[must_use]
    pub fn status(&self, category: Category) -> Option<Status> {
        self.metrics.get(&category).map(|m| m.status)
    }

    /// Categories with the given status.
    pub fn categories_with(&self, status: Status) -> impl Iterator<Item = Category> + '_ {
        self.metrics
            .values()
            .filter(move |m| m.status == status)
            .map(|m| m.category)
    }

    /// Number of FAIL categories.
    #[must_use]
    pub fn fail_count(&self) -> usize {
        self.categories_with(Status::Fail).count()
    }
}

/// Identification and capture properties of an analyzed image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultMetadata {
    /// Path or other identifier of the source.
    pub source_id: String,
    /// Timestamp of analysis (RFC 3339, UTC).
    pub timestamp: String,
    /// Profile the image was analyzed with.
    pub profile_name: String,
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Container format, if known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<ContainerFormat>,
    /// Declared DPI.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dpi: Option<(f64, f64)>,
    /// Bits per channel.
    pub bit_depth: u8,
    /// Bounding box of the located document.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub document_bbox: Option<BoundingBox>,
}

/// Global score, star rating and status.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GlobalVerdict {
    /// Weighted score in [0, 1].
    pub score: f64,
    /// Star rating, 1 to 4.
    pub stars: u8,
    /// Status after critical overrides.
    pub status: Status,
    /// Status from the score thresholds alone.
    pub score_status: Status,
}
