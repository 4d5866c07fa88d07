//! Decoded capture plus the file-level metadata the metrics need.

use std::fmt;

use image::{DynamicImage, GenericImageView, GrayImage, RgbImage};
use serde::{Deserialize, Serialize};

/// Container format of the source file.
#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContainerFormat {
    /// JPEG / JFIF / EXIF JPEG.
    Jpeg,
    /// Portable Network Graphics.
    Png,
    /// Tagged Image File Format.
    Tiff,
    /// WebP.
    Webp,
    /// Windows bitmap.
    Bmp,
    /// GIF.
    Gif,
}

impl ContainerFormat {
    /// Maps a decoder format to a container format.
    #[must_use]
    pub const fn from_image_format(format: image::ImageFormat) -> Option<Self> {
        match format {
            image::ImageFormat::Jpeg => Some(Self::Jpeg),
            image::ImageFormat::Png => Some(Self::Png),
            image::ImageFormat::Tiff => Some(Self::Tiff),
            image::ImageFormat::WebP => Some(Self::Webp),
            image::ImageFormat::Bmp => Some(Self::Bmp),
            image::ImageFormat::Gif => Some(Self::Gif),
            _ => None,
        }
    }

    /// Lower-case format name as used in allow-lists.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Jpeg => "jpeg",
            Self::Png => "png",
            Self::Tiff => "tiff",
            Self::Webp => "webp",
            Self::Bmp => "bmp",
            Self::Gif => "gif",
        }
    }

    /// Stable numeric code reported as a measurement.
    #[must_use]
    pub const fn code(self) -> u8 {
        match self {
            Self::Jpeg => 1,
            Self::Png => 2,
            Self::Tiff => 3,
            Self::Webp => 4,
            Self::Bmp => 5,
            Self::Gif => 6,
        }
    }

    /// Whether the container discards information on save.
    #[must_use]
    pub const fn is_lossy(self) -> bool {
        matches!(self, Self::Jpeg | Self::Webp)
    }
}

impl fmt::Display for ContainerFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// File-level metadata captured while loading.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ImageMetadata {
    /// Container format, if known.
    pub format: Option<ContainerFormat>,
    /// Declared horizontal and vertical DPI.
    pub dpi: Option<(f64, f64)>,
    /// Bits per channel.
    pub bit_depth: u8,
    /// Estimated JPEG quality in (0, 1].
    pub jpeg_quality: Option<f64>,
    /// Size of the source file in bytes.
    pub file_size: Option<u64>,
}

/// A decoded capture. Read-only once constructed.
#[derive(Debug, Clone)]
pub struct Image {
    /// Path or other identifier of the source.
    pub source_id: String,
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Decoded pixel data.
    pub pixels: DynamicImage,
    /// File-level metadata.
    pub metadata: ImageMetadata,
}

impl Image {
    /// Wraps decoded pixels. Bit depth is derived from the pixel layout.
    #[must_use]
    pub fn new(source_id: impl Into<String>, pixels: DynamicImage) -> Self {
        let (width, height) = pixels.dimensions();
        let metadata = ImageMetadata {
            bit_depth: bits_per_channel(&pixels),
            ..ImageMetadata::default()
        };
        Self {
            source_id: source_id.into(),
            width,
            height,
            pixels,
            metadata,
        }
    }

    /// Replaces the metadata.
    #[must_use]
    pub fn with_metadata(mut self, metadata: ImageMetadata) -> Self {
        self.metadata = metadata;
        self
    }

    /// Sets the declared DPI.
    #[must_use]
    pub fn with_dpi(mut self, dpi_x: f64, dpi_y: f64) -> Self {
        self.metadata.dpi = Some((dpi_x, dpi_y));
        self
    }

    /// Sets the container format.
    #[must_use]
    pub fn with_format(mut self, format: ContainerFormat) -> Self {
        self.metadata.format = Some(format);
        self
    }

    /// Grayscale copy of the pixels.
    #[must_use]
    pub fn to_luma8(&self) -> GrayImage {
        self.pixels.to_luma8()
    }

    /// 8-bit RGB copy of the pixels.
    #[must_use]
    pub fn to_rgb8(&self) -> RgbImage {
        self.pixels.to_rgb8()
    }

    /// Whether the pixel layout carries color channels.
    #[must_use]
    pub fn has_color(&self) -> bool {
        self.pixels.color().has_color()
    }

    /// Total pixel count.
    #[must_use]
    pub const fn area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }
}

/// Bits per channel for a decoded image.
#[must_use]
pub fn bits_per_channel(pixels: &DynamicImage) -> u8 {
    let color = pixels.color();
    let channels = u16::from(color.channel_count()).max(1);
    u8::try_from(color.bits_per_pixel() / channels).unwrap_or(u8::MAX)
}
