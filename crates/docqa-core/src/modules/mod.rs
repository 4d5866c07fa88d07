//! Metric computer implementations.
//!
//! Each computer implements [`MetricComputer`](crate::domain::MetricComputer)
//! for one category and is built from a profile.

mod border;
mod color;
mod completeness;
mod contrast;
mod exposure;
mod foreign_objects;
mod format;
mod geometry;
mod imaging;
mod noise;
mod registry;
mod resolution;
mod shadow;
mod sharpness;

pub use border::BorderComputer;
pub use color::{srgb_to_lab, ColorComputer};
pub use completeness::CompletenessComputer;
pub use contrast::ContrastComputer;
pub use exposure::ExposureComputer;
pub use foreign_objects::ForeignObjectComputer;
pub use format::FormatComputer;
pub use geometry::GeometryComputer;
pub use imaging::{
    convex_hull_mask, erode_mask, gradient_magnitudes, mask_coverage, mask_outline, median,
    percentile, tiles, Histogram, IntegralImage, OtsuSplit, RunningStats, Tile,
};
pub use noise::NoiseComputer;
pub use registry::MetricRegistry;
pub use resolution::ResolutionComputer;
pub use shadow::ShadowComputer;
pub use sharpness::SharpnessComputer;

/// Minimum share of a tile inside the mask for the tile to be sampled.
pub(crate) const MIN_TILE_COVERAGE: f64 = 0.10;

/// Diagnostic for computers that need a located document.
pub(crate) const NO_DOCUMENT: &str = "no document located";
