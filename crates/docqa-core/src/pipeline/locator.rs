//! Finds the document region in a frame.
//!
//! The document is assumed to be brighter than its background. The frame is
//! binarized, the largest outer contour is kept and filled.

#![allow(clippy::cast_precision_loss)]

use image::{GrayImage, Luma};
use imageproc::contours::{find_contours, BorderType, Contour};
use imageproc::drawing::draw_polygon_mut;
use imageproc::point::Point;
use tracing::{debug, instrument};

use crate::domain::{DocumentMask, Image, LocatorConfig, ThresholdMethod, DOCUMENT};
use crate::modules::{Histogram, IntegralImage};

/// Locates the document and produces its mask.
#[derive(Debug, Clone, Default)]
pub struct DocumentLocator {
    config: LocatorConfig,
}

impl DocumentLocator {
    /// Creates a locator with the given settings.
    #[must_use]
    pub const fn new(config: LocatorConfig) -> Self {
        Self { config }
    }

    /// Returns the mask of the largest plausible document region.
    ///
    /// An empty mask means no document was found. This is an ordinary
    /// outcome, not an error.
    #[instrument(skip_all, fields(source = %image.source_id))]
    pub fn locate(&self, image: &Image) -> DocumentMask {
        let gray = image.to_luma8();
        let (width, height) = gray.dimensions();

        let Some(split) = Histogram::from_luma(&gray).otsu() else {
            debug!("single gray level, no document");
            return DocumentMask::empty(width, height);
        };
        if split.separation() < self.config.min_class_separation {
            debug!(
                separation = split.separation(),
                "class means too close, no document"
            );
            return DocumentMask::empty(width, height);
        }

        let binary = match self.config.method {
            ThresholdMethod::Otsu => otsu_binary(&gray, split.threshold),
            ThresholdMethod::Adaptive => {
                adaptive_binary(&gray, self.config.block_radius, self.config.offset)
            }
            ThresholdMethod::Combined => {
                let mut otsu = otsu_binary(&gray, split.threshold);
                let adaptive = adaptive_binary(&gray, self.config.block_radius, self.config.offset);
                for (o, a) in otsu.pixels_mut().zip(adaptive.pixels()) {
                    o.0[0] = o.0[0].min(a.0[0]);
                }
                otsu
            }
        };

        let contours = find_contours::<i32>(&binary);
        let Some((contour, area)) = largest_outer(&contours) else {
            debug!("no outer contour");
            return DocumentMask::empty(width, height);
        };

        let frame_area = f64::from(width) * f64::from(height);
        if area < self.config.min_area_ratio * frame_area {
            debug!(area, frame_area, "largest contour below minimum area");
            return DocumentMask::empty(width, height);
        }

        let mut polygon = contour.points.clone();
        while polygon.len() > 1 && polygon.first() == polygon.last() {
            polygon.pop();
        }
        let mut mask = GrayImage::new(width, height);
        draw_polygon_mut(&mut mask, &polygon, Luma([DOCUMENT]));

        let mask = DocumentMask::from_binary(mask);
        debug!(
            threshold = split.threshold,
            pixels = mask.pixel_count(),
            "document located"
        );
        mask
    }
}

fn otsu_binary(gray: &GrayImage, threshold: u8) -> GrayImage {
    let mut out = gray.clone();
    for pixel in out.pixels_mut() {
        pixel.0[0] = if pixel.0[0] > threshold { DOCUMENT } else { 0 };
    }
    out
}

fn adaptive_binary(gray: &GrayImage, block_radius: u32, offset: i32) -> GrayImage {
    let integral = IntegralImage::new(gray);
    GrayImage::from_fn(gray.width(), gray.height(), |x, y| {
        let local = integral.region_mean(x, y, block_radius) - f64::from(offset);
        let value = f64::from(gray.get_pixel(x, y).0[0]);
        Luma([if value > local { DOCUMENT } else { 0 }])
    })
}

/// Largest outer contour with at least three points, with its area.
fn largest_outer(contours: &[Contour<i32>]) -> Option<(&Contour<i32>, f64)> {
    contours
        .iter()
        .filter(|c| c.border_type == BorderType::Outer && c.points.len() >= 3)
        .map(|c| (c, shoelace_area(&c.points)))
        .max_by(|a, b| a.1.total_cmp(&b.1))
}

/// Polygon area by the shoelace formula.
fn shoelace_area(points: &[Point<i32>]) -> f64 {
    let n = points.len();
    let twice: i64 = (0..n)
        .map(|i| {
            let a = points[i];
            let b = points[(i + 1) % n];
            i64::from(a.x) * i64::from(b.y) - i64::from(b.x) * i64::from(a.y)
        })
        .sum();
    twice.unsigned_abs() as f64 / 2.0
}

#[cfg(test)]
#[allow(clippy::expect_used)]
mod tests {
    use super::*;
    use image::DynamicImage;

    fn framed(paper: (u32, u32, u32, u32)) -> Image {
        let (x0, y0, x1, y1) = paper;
        let gray = GrayImage::from_fn(200, 150, |x, y| {
            if (x0..x1).contains(&x) && (y0..y1).contains(&y) {
                Luma([230])
            } else {
                Luma([15])
            }
        });
        Image::new("frame.png", DynamicImage::ImageLuma8(gray))
    }

    #[test]
    fn test_locates_bright_rectangle() {
        let mask = DocumentLocator::default().locate(&framed((30, 20, 170, 130)));
        let bbox = mask.bbox().expect("document found");
        assert!(bbox.x.abs_diff(30) <= 1, "x = {}", bbox.x);
        assert!(bbox.y.abs_diff(20) <= 1, "y = {}", bbox.y);
        assert!(bbox.right().abs_diff(170) <= 1);
        assert!(bbox.bottom().abs_diff(130) <= 1);
        assert!(mask.contains(100, 75));
        assert!(!mask.contains(5, 5));
    }

    #[test]
    fn test_uniform_gray_is_empty() {
        let gray = GrayImage::from_pixel(120, 90, Luma([128]));
        let image = Image::new("gray.png", DynamicImage::ImageLuma8(gray));
        let mask = DocumentLocator::default().locate(&image);
        assert!(mask.is_empty());
        assert!(mask.bbox().is_none());
    }

    #[test]
    fn test_low_separation_is_empty() {
        let gray = GrayImage::from_fn(100, 100, |x, _| Luma([if x < 50 { 120 } else { 130 }]));
        let image = Image::new("flat.png", DynamicImage::ImageLuma8(gray));
        assert!(DocumentLocator::default().locate(&image).is_empty());
    }

    #[test]
    fn test_tiny_region_rejected() {
        let mask = DocumentLocator::default().locate(&framed((100, 70, 110, 80)));
        assert!(mask.is_empty());
    }

    #[test]
    fn test_keeps_largest_region() {
        let gray = GrayImage::from_fn(200, 150, |x, y| {
            let big = (60..190).contains(&x) && (10..140).contains(&y);
            let small = (5..40).contains(&x) && (5..40).contains(&y);
            Luma([if big || small { 230 } else { 15 }])
        });
        let image = Image::new("two.png", DynamicImage::ImageLuma8(gray));
        let mask = DocumentLocator::default().locate(&image);
        assert!(mask.contains(120, 75));
        assert!(!mask.contains(20, 20));
    }

    #[test]
    fn test_dark_ink_inside_paper_is_filled() {
        let gray = GrayImage::from_fn(200, 150, |x, y| {
            let paper = (30..170).contains(&x) && (20..130).contains(&y);
            let ink = (60..140).contains(&x) && (60..66).contains(&y);
            Luma([match (paper, ink) {
                (true, true) => 40,
                (true, false) => 230,
                _ => 15,
            }])
        });
        let image = Image::new("ink.png", DynamicImage::ImageLuma8(gray));
        let mask = DocumentLocator::default().locate(&image);
        assert!(mask.contains(100, 62));
    }

    #[test]
    fn test_shoelace_square() {
        let square = [
            Point::new(0, 0),
            Point::new(10, 0),
            Point::new(10, 10),
            Point::new(0, 10),
        ];
        assert!((shoelace_area(&square) - 100.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_deterministic() {
        let image = framed((30, 20, 170, 130));
        let locator = DocumentLocator::default();
        assert_eq!(locator.locate(&image), locator.locate(&image));
    }
}
