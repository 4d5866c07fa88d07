//! Synthetic document captures for testing.

use std::io::Cursor;
use std::path::Path;

use anyhow::Context;
use docqa_core::domain::{bits_per_channel, ContainerFormat, Image, ImageMetadata};
use image::{DynamicImage, GrayImage, ImageFormat, Luma, Rgb, RgbImage};
use imageproc::geometric_transformations::{rotate_about_center, Interpolation};

/// Paper color of the default document.
pub const PAPER: [u8; 3] = [235, 235, 232];
/// Ink color of the default text lines.
pub const INK: [u8; 3] = [40, 40, 40];
/// Default background luminance.
pub const BACKGROUND: u8 = 12;

/// Builder for a document photographed on a dark background.
///
/// The default is a well-formed capture that passes every category of the
/// strict profile: light paper with ruled text lines, a tight margin on a
/// near-black background, PNG at 300 DPI. Each setter introduces one defect.
#[derive(Debug, Clone)]
pub struct SyntheticDocumentBuilder {
    name: String,
    width: u32,
    height: u32,
    margin: u32,
    paper: [u8; 3],
    background: u8,
    skew_degrees: f32,
    blur_sigma: f32,
    noise_amplitude: u8,
    occluder: Option<(u32, u32, u32, u32)>,
    format: Option<ContainerFormat>,
    dpi: Option<(f64, f64)>,
}

impl SyntheticDocumentBuilder {
    /// A clean `width` x `height` capture.
    #[must_use]
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            name: "synthetic://document".into(),
            width,
            height,
            margin: 20,
            paper: PAPER,
            background: BACKGROUND,
            skew_degrees: 0.0,
            blur_sigma: 0.0,
            noise_amplitude: 0,
            occluder: None,
            format: Some(ContainerFormat::Png),
            dpi: Some((300.0, 300.0)),
        }
    }

    /// The default 800 x 1000 capture.
    #[must_use]
    pub fn good() -> Self {
        Self::new(800, 1000)
    }

    /// Source identifier of the built image.
    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Distance from the paper to each frame edge. Zero makes the document
    /// touch every edge.
    #[must_use]
    pub const fn margin(mut self, margin: u32) -> Self {
        self.margin = margin;
        self
    }

    /// Paper color.
    #[must_use]
    pub const fn paper(mut self, rgb: [u8; 3]) -> Self {
        self.paper = rgb;
        self
    }

    /// Background luminance.
    #[must_use]
    pub const fn background(mut self, value: u8) -> Self {
        self.background = value;
        self
    }

    /// Rotates the whole frame by `degrees`.
    #[must_use]
    pub const fn skew(mut self, degrees: f32) -> Self {
        self.skew_degrees = degrees;
        self
    }

    /// Gaussian blur applied after drawing.
    #[must_use]
    pub const fn blur(mut self, sigma: f32) -> Self {
        self.blur_sigma = sigma;
        self
    }

    /// Deterministic per-pixel noise of +/- `amplitude`.
    #[must_use]
    pub const fn noise(mut self, amplitude: u8) -> Self {
        self.noise_amplitude = amplitude;
        self
    }

    /// Dark solid rectangle over the document, like a finger.
    #[must_use]
    pub const fn occluder(mut self, x: u32, y: u32, width: u32, height: u32) -> Self {
        self.occluder = Some((x, y, width, height));
        self
    }

    /// Declared container format.
    #[must_use]
    pub const fn format(mut self, format: Option<ContainerFormat>) -> Self {
        self.format = format;
        self
    }

    /// Declared DPI.
    #[must_use]
    pub const fn dpi(mut self, dpi: Option<(f64, f64)>) -> Self {
        self.dpi = dpi;
        self
    }

    /// Draws the frame.
    #[must_use]
    pub fn pixels(&self) -> DynamicImage {
        let (w, h, m) = (self.width, self.height, self.margin);
        let inset = m + 30;
        let bg = self.background;
        let mut rgb = RgbImage::from_fn(w, h, |x, y| {
            let on_paper = x >= m && x + m < w && y >= m && y + m < h;
            let on_ink =
                x >= inset && x + inset < w && y >= inset && y + inset < h && (y - inset) % 14 < 4;
            Rgb(match (on_paper, on_ink) {
                (true, true) => INK,
                (true, false) => self.paper,
                _ => [bg, bg, bg],
            })
        });

        if let Some((ox, oy, ow, oh)) = self.occluder {
            for y in oy..(oy + oh).min(h) {
                for x in ox..(ox + ow).min(w) {
                    rgb.put_pixel(x, y, Rgb([5, 5, 5]));
                }
            }
        }
        if self.noise_amplitude > 0 {
            add_noise(&mut rgb, self.noise_amplitude);
        }
        if self.skew_degrees.abs() > f32::EPSILON {
            rgb = rotate_about_center(
                &rgb,
                self.skew_degrees.to_radians(),
                Interpolation::Bilinear,
                Rgb([bg, bg, bg]),
            );
        }
        let pixels = DynamicImage::ImageRgb8(rgb);
        if self.blur_sigma > 0.0 {
            pixels.blur(self.blur_sigma)
        } else {
            pixels
        }
    }

    /// Builds the in-memory capture with its declared metadata.
    #[must_use]
    pub fn build(&self) -> Image {
        let pixels = self.pixels();
        let metadata = ImageMetadata {
            format: self.format,
            dpi: self.dpi,
            bit_depth: bits_per_channel(&pixels),
            jpeg_quality: None,
            file_size: None,
        };
        Image::new(self.name.clone(), pixels).with_metadata(metadata)
    }

    /// Encodes the frame as a PNG at `path`. DPI is not embedded.
    ///
    /// # Errors
    ///
    /// Returns an error if encoding or writing fails.
    pub fn save_png(&self, path: &Path) -> anyhow::Result<()> {
        self.pixels()
            .save_with_format(path, ImageFormat::Png)
            .with_context(|| format!("writing {}", path.display()))
    }

    /// Encodes the frame as PNG bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if encoding fails.
    pub fn png_bytes(&self) -> anyhow::Result<Vec<u8>> {
        let mut out = Cursor::new(Vec::new());
        self.pixels()
            .write_to(&mut out, ImageFormat::Png)
            .context("encoding png")?;
        Ok(out.into_inner())
    }

    /// A featureless gray frame in which no document can be found.
    #[must_use]
    pub fn uniform_gray(width: u32, height: u32, value: u8) -> Image {
        let img = GrayImage::from_pixel(width, height, Luma([value]));
        Image::new("synthetic://uniform_gray", DynamicImage::ImageLuma8(img))
            .with_format(ContainerFormat::Png)
    }
}

/// xorshift noise, reproducible across runs.
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_possible_wrap,
    clippy::cast_sign_loss
)]
fn add_noise(rgb: &mut RgbImage, amplitude: u8) {
    let mut state: u32 = 0x9E37_79B9;
    let span = u32::from(amplitude) * 2 + 1;
    for pixel in rgb.pixels_mut() {
        state ^= state << 13;
        state ^= state >> 17;
        state ^= state << 5;
        let delta = (state % span) as i16 - i16::from(amplitude);
        for channel in &mut pixel.0 {
            *channel = (i16::from(*channel) + delta).clamp(0, 255) as u8;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_document_layout() {
        let image = SyntheticDocumentBuilder::new(200, 160).build();
        assert_eq!((image.width, image.height), (200, 160));
        let gray = image.to_luma8();
        assert_eq!(gray.get_pixel(0, 0).0[0], BACKGROUND);
        assert!(gray.get_pixel(25, 25).0[0] > 200);
        assert!(gray.get_pixel(100, 51).0[0] < 60);
        assert_eq!(image.metadata.format, Some(ContainerFormat::Png));
        assert_eq!(image.metadata.bit_depth, 8);
    }

    #[test]
    fn test_zero_margin_reaches_edges() {
        let image = SyntheticDocumentBuilder::new(100, 100).margin(0).build();
        assert!(image.to_luma8().get_pixel(0, 0).0[0] > 200);
    }

    #[test]
    fn test_noise_is_deterministic() {
        let a = SyntheticDocumentBuilder::new(64, 64).noise(30).pixels();
        let b = SyntheticDocumentBuilder::new(64, 64).noise(30).pixels();
        assert_eq!(a, b);
        assert_ne!(a, SyntheticDocumentBuilder::new(64, 64).pixels());
    }

    #[test]
    fn test_occluder_is_dark() {
        let image = SyntheticDocumentBuilder::new(200, 200)
            .occluder(40, 60, 30, 30)
            .build();
        assert_eq!(image.to_luma8().get_pixel(50, 70).0[0], 5);
    }

    #[test]
    fn test_png_bytes_decode() {
        let bytes = SyntheticDocumentBuilder::new(32, 32)
            .png_bytes()
            .unwrap_or_default();
        let decoded = image::load_from_memory(&bytes).map(|img| (img.width(), img.height()));
        assert_eq!(decoded.ok(), Some((32, 32)));
    }

    #[test]
    fn test_uniform_gray() {
        let image = SyntheticDocumentBuilder::uniform_gray(20, 10, 100);
        assert!(image.to_luma8().pixels().all(|p| p.0[0] == 100));
    }
}
