//! Clips, tools and fingers in the frame.
//!
//! Two detectors run independently. Bright structured blobs outside the
//! document that reach a frame edge are counted as clips or tools. Dark
//! solid blobs reaching into the document are counted as fingers or other
//! occluders. A finger is darker than the paper, so the locator cuts it out
//! of the mask; dark candidates are therefore taken from the mask's convex
//! hull, which closes the notch again.

#![allow(clippy::cast_precision_loss)]

use image::{GrayImage, Luma};
use imageproc::distance_transform::Norm;
use imageproc::morphology::{close, open};
use imageproc::region_labelling::{connected_components, Connectivity};

use super::imaging::{convex_hull_mask, gradient_magnitudes, RunningStats};
use super::NO_DOCUMENT;
use crate::domain::{
    BoundingBox, Category, CategoryConfig, ConfigurationProfile, ForeignObjectParams,
    MetricComputer, MetricInput, MetricResult, Status,
};

/// Radius of the morphological clean-up of dark candidates.
const CLEANUP_RADIUS: u8 = 2;
/// Width of the ring sampled around a dark object.
const RING_PX: u32 = 5;

/// Pixels and bounds of one connected component.
#[derive(Debug, Clone)]
struct Component {
    pixels: Vec<(u32, u32)>,
    min_x: u32,
    min_y: u32,
    max_x: u32,
    max_y: u32,
}

impl Component {
    fn new() -> Self {
        Self {
            pixels: Vec::new(),
            min_x: u32::MAX,
            min_y: u32::MAX,
            max_x: 0,
            max_y: 0,
        }
    }

    fn push(&mut self, x: u32, y: u32) {
        self.pixels.push((x, y));
        self.min_x = self.min_x.min(x);
        self.min_y = self.min_y.min(y);
        self.max_x = self.max_x.max(x);
        self.max_y = self.max_y.max(y);
    }

    fn area(&self) -> u64 {
        self.pixels.len() as u64
    }

    const fn width(&self) -> u32 {
        self.max_x - self.min_x + 1
    }

    const fn height(&self) -> u32 {
        self.max_y - self.min_y + 1
    }
}

/// 8-connected components of the non-zero pixels.
fn components(binary: &GrayImage) -> Vec<Component> {
    let labels = connected_components(binary, Connectivity::Eight, Luma([0u8]));
    let mut out: Vec<Component> = Vec::new();
    for (x, y, label) in labels.enumerate_pixels() {
        let label = label.0[0] as usize;
        if label == 0 {
            continue;
        }
        if out.len() < label {
            out.resize_with(label, Component::new);
        }
        out[label - 1].push(x, y);
    }
    out.retain(|c| !c.pixels.is_empty());
    out
}

/// Foreign-object computer.
#[derive(Debug, Clone)]
pub struct ForeignObjectComputer {
    config: CategoryConfig,
    params: ForeignObjectParams,
}

impl ForeignObjectComputer {
    /// Creates the computer.
    #[must_use]
    pub const fn new(config: CategoryConfig, params: ForeignObjectParams) -> Self {
        Self { config, params }
    }

    /// Builds the computer from a profile.
    #[must_use]
    pub fn from_profile(profile: &ConfigurationProfile) -> Self {
        Self::new(
            profile.categories.foreign_objects.clone(),
            profile.params.foreign_objects.clone(),
        )
    }

    fn clips(&self, gray: &GrayImage, mask: &GrayImage) -> Vec<Component> {
        let (width, height) = gray.dimensions();
        let level = self.params.clip_luminance * 255.0;
        let candidates = GrayImage::from_fn(width, height, |x, y| {
            let bright = f64::from(gray.get_pixel(x, y).0[0]) > level;
            Luma([if bright && mask.get_pixel(x, y).0[0] == 0 { 255 } else { 0 }])
        });
        let magnitudes = gradient_magnitudes(gray);
        let p = self.params.edge_proximity_px;

        components(&candidates)
            .into_iter()
            .filter(|c| c.area() >= u64::from(self.params.min_clip_area))
            .filter(|c| {
                c.min_x <= p
                    || c.min_y <= p
                    || c.max_x.saturating_add(p) >= width - 1
                    || c.max_y.saturating_add(p) >= height - 1
            })
            .filter(|c| {
                let aspect = f64::from(c.width()) / f64::from(c.height());
                (self.params.min_aspect_ratio..=self.params.max_aspect_ratio).contains(&aspect)
            })
            .filter(|c| {
                let texture: RunningStats = (c.min_y..=c.max_y)
                    .flat_map(|y| (c.min_x..=c.max_x).map(move |x| (x, y)))
                    .map(|(x, y)| magnitudes[(y * width + x) as usize])
                    .collect();
                (texture.variance() / 1000.0).min(1.0) > self.params.pixelation_threshold
            })
            .collect()
    }

    fn dark_objects(&self, gray: &GrayImage, mask: &GrayImage, doc: BoundingBox) -> Vec<Component> {
        let (width, height) = gray.dimensions();
        let level = self.params.dark_luminance * 255.0;
        let hull = convex_hull_mask(mask);
        let candidates = GrayImage::from_fn(width, height, |x, y| {
            let dark = f64::from(gray.get_pixel(x, y).0[0]) < level;
            Luma([if dark && hull.get_pixel(x, y).0[0] != 0 { 255 } else { 0 }])
        });
        let cleaned = close(
            &open(&candidates, Norm::LInf, CLEANUP_RADIUS),
            Norm::LInf,
            CLEANUP_RADIUS,
        );
        let half_short = f64::from(doc.width.min(doc.height)) / 2.0;

        components(&cleaned)
            .into_iter()
            .filter(|c| c.area() >= u64::from(self.params.min_dark_area))
            .filter(|c| {
                let depth = c
                    .pixels
                    .iter()
                    .filter(|&&(x, y)| doc.contains(x, y))
                    .map(|&(x, y)| {
                        (x - doc.x)
                            .min(doc.right() - 1 - x)
                            .min(y - doc.y)
                            .min(doc.bottom() - 1 - y)
                    })
                    .max()
                    .unwrap_or(0);
                half_short > 0.0 && f64::from(depth) / half_short > self.params.min_penetration
            })
            .filter(|c| {
                let object: RunningStats = c
                    .pixels
                    .iter()
                    .map(|&(x, y)| f64::from(gray.get_pixel(x, y).0[0]))
                    .collect();
                let x0 = c.min_x.saturating_sub(RING_PX);
                let y0 = c.min_y.saturating_sub(RING_PX);
                let x1 = (c.max_x + RING_PX).min(width - 1);
                let y1 = (c.max_y + RING_PX).min(height - 1);
                let ring: RunningStats = (y0..=y1)
                    .flat_map(|y| (x0..=x1).map(move |x| (x, y)))
                    .filter(|&(x, y)| {
                        mask.get_pixel(x, y).0[0] != 0 && cleaned.get_pixel(x, y).0[0] == 0
                    })
                    .map(|(x, y)| f64::from(gray.get_pixel(x, y).0[0]))
                    .collect();
                ring.count() > 0 && ring.mean() / object.mean().max(1.0) > self.params.min_contrast_ratio
            })
            .collect()
    }
}

impl MetricComputer for ForeignObjectComputer {
    fn category(&self) -> Category {
        Category::ForeignObjects
    }

    fn primary_measurement(&self) -> &'static str {
        "foreign_object_area_pct"
    }

    fn config(&self) -> &CategoryConfig {
        &self.config
    }

    fn analyze(&self, input: &MetricInput<'_>) -> MetricResult {
        let Some(doc) = input.mask.bbox() else {
            return self.unmeasurable(NO_DOCUMENT);
        };
        let gray = input.image.to_luma8();
        let mask = input.mask.as_image();

        let clips = self.clips(&gray, mask);
        let dark = self.dark_objects(&gray, mask, doc);

        let frame = input.image.area().max(1) as f64;
        let clip_area: u64 = clips.iter().map(Component::area).sum();
        let dark_area: u64 = dark.iter().map(Component::area).sum();
        let clip_pct = clip_area as f64 / frame * 100.0;
        let dark_pct = dark_area as f64 / input.mask.pixel_count().max(1) as f64 * 100.0;

        let mut result = self
            .classify(clip_pct + dark_pct)
            .with("clip_count", clips.len() as f64)
            .with("dark_object_count", dark.len() as f64)
            .with("clip_area_pct", clip_pct)
            .with("dark_area_pct", dark_pct);

        if result.status != Status::Pass {
            if !clips.is_empty() {
                result = result.recommend("Remove clips or tools at the frame edge");
            }
            if !dark.is_empty() {
                result = result.recommend("Keep fingers and other objects off the document");
            }
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{DocumentMask, Image};
    use crate::modules::fixtures;

    fn run(image: &Image, mask: &DocumentMask) -> MetricResult {
        ForeignObjectComputer::from_profile(&ConfigurationProfile::strict())
            .analyze(&MetricInput { image, mask })
    }

    #[test]
    fn test_clean_capture_passes() {
        let (image, mask) = fixtures::document(400, 300, 30);
        let result = run(&image, &mask);
        assert_eq!(result.status, Status::Pass, "{result:?}");
        assert!(result.primary_value().unwrap_or(1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_finger_on_document_fails() {
        let (image, mask) = fixtures::document(400, 300, 30);
        let finger = fixtures::map_gray(&image, |x, y, v| {
            if (30..110).contains(&x) && (110..170).contains(&y) {
                5
            } else {
                v
            }
        });
        let result = run(&finger, &mask);
        assert!(result.measurement("dark_object_count").unwrap_or(0.0) >= 1.0, "{result:?}");
        assert_eq!(result.status, Status::Fail);
        assert!(result.recommendations.iter().any(|r| r.contains("fingers")));
    }

    #[test]
    fn test_finger_cut_out_of_mask_is_found() {
        // the finger enters from the left edge and is not part of the mask
        let (image, _) = fixtures::document(400, 300, 30);
        let finger = fixtures::map_gray(&image, |x, y, v| {
            if x < 110 && (110..170).contains(&y) {
                5
            } else {
                v
            }
        });
        let notched = DocumentMask::from_binary(GrayImage::from_fn(400, 300, |x, y| {
            let paper = (30..370).contains(&x) && (30..270).contains(&y);
            let finger = x < 110 && (110..170).contains(&y);
            Luma([if paper && !finger { 255 } else { 0 }])
        }));
        let result = run(&finger, &notched);
        assert!(result.measurement("dark_object_count").unwrap_or(0.0) >= 1.0, "{result:?}");
        assert_eq!(result.status, Status::Fail);
    }

    #[test]
    fn test_textured_clip_at_edge_counts() {
        let (image, mask) = fixtures::document(400, 300, 30);
        let clip = fixtures::map_gray(&image, |x, y, v| {
            if x < 25 && (100..200).contains(&y) {
                if (x / 3 + y / 3) % 2 == 0 { 250 } else { 60 }
            } else {
                v
            }
        });
        let result = run(&clip, &mask);
        assert!(result.measurement("clip_count").unwrap_or(0.0) >= 1.0, "{result:?}");
        assert_ne!(result.status, Status::Pass);
    }

    #[test]
    fn test_component_bounds() {
        let img = GrayImage::from_fn(20, 20, |x, y| {
            Luma([if (2..6).contains(&x) && (3..5).contains(&y) { 255 } else { 0 }])
        });
        let found = components(&img);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].area(), 8);
        assert_eq!((found[0].width(), found[0].height()), (4, 2));
    }
}
