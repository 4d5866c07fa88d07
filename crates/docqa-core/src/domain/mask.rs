//! Binary document mask and its bounding box.

use image::{GrayImage, Luma};
use serde::{Deserialize, Serialize};

/// Mask value for document pixels.
pub const DOCUMENT: u8 = 255;

/// Axis-aligned bounding box in pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoundingBox {
    /// Left edge (inclusive).
    pub x: u32,
    /// Top edge (inclusive).
    pub y: u32,
    /// Width in pixels, at least 1.
    pub width: u32,
    /// Height in pixels, at least 1.
    pub height: u32,
}

impl BoundingBox {
    /// Creates a bounding box.
    #[must_use]
    pub const fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Right edge (exclusive).
    #[must_use]
    pub const fn right(&self) -> u32 {
        self.x + self.width
    }

    /// Bottom edge (exclusive).
    #[must_use]
    pub const fn bottom(&self) -> u32 {
        self.y + self.height
    }

    /// Area in pixels.
    #[must_use]
    pub const fn area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }

    /// Whether the point lies inside the box.
    #[must_use]
    pub const fn contains(&self, x: u32, y: u32) -> bool {
        x >= self.x && x < self.right() && y >= self.y && y < self.bottom()
    }
}

/// Region of the frame occupied by the document.
///
/// An empty mask is a valid outcome meaning no document was found; the
/// bounding box is `None` exactly when no pixel is set.
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentMask {
    mask: GrayImage,
    bbox: Option<BoundingBox>,
    pixel_count: u64,
}

impl DocumentMask {
    /// An empty mask covering a `width` x `height` frame.
    #[must_use]
    pub fn empty(width: u32, height: u32) -> Self {
        Self {
            mask: GrayImage::new(width, height),
            bbox: None,
            pixel_count: 0,
        }
    }

    /// Builds a mask from a binary image, normalizing any non-zero pixel to
    /// [`DOCUMENT`] and deriving the bounding box.
    #[must_use]
    pub fn from_binary(mut mask: GrayImage) -> Self {
        let mut min_x = u32::MAX;
        let mut min_y = u32::MAX;
        let mut max_x = 0u32;
        let mut max_y = 0u32;
        let mut pixel_count = 0u64;

        for (x, y, pixel) in mask.enumerate_pixels_mut() {
            if pixel.0[0] == 0 {
                continue;
            }
            *pixel = Luma([DOCUMENT]);
            pixel_count += 1;
            min_x = min_x.min(x);
            min_y = min_y.min(y);
            max_x = max_x.max(x);
            max_y = max_y.max(y);
        }

        let bbox = (pixel_count > 0)
            .then(|| BoundingBox::new(min_x, min_y, max_x - min_x + 1, max_y - min_y + 1));

        Self {
            mask,
            bbox,
            pixel_count,
        }
    }

    /// Whether no document was located.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.pixel_count == 0
    }

    /// Bounding box of the document pixels.
    #[must_use]
    pub const fn bbox(&self) -> Option<BoundingBox> {
        self.bbox
    }

    /// Number of document pixels.
    #[must_use]
    pub const fn pixel_count(&self) -> u64 {
        self.pixel_count
    }

    /// Underlying binary image (255 = document).
    #[must_use]
    pub const fn as_image(&self) -> &GrayImage {
        &self.mask
    }

    /// Frame dimensions.
    #[must_use]
    pub fn dimensions(&self) -> (u32, u32) {
        self.mask.dimensions()
    }

    /// Whether the pixel belongs to the document. Out-of-frame points do not.
    #[must_use]
    pub fn contains(&self, x: u32, y: u32) -> bool {
        x < self.mask.width() && y < self.mask.height() && self.mask.get_pixel(x, y).0[0] != 0
    }

    /// Fraction of the frame covered by document pixels.
    #[allow(clippy::cast_precision_loss)]
    #[must_use]
    pub fn area_ratio(&self) -> f64 {
        let (w, h) = self.dimensions();
        let total = u64::from(w) * u64::from(h);
        if total == 0 {
            return 0.0;
        }
        self.pixel_count as f64 / total as f64
    }
}
