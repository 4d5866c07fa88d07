//! File-level metadata: declared DPI, bit depth and JPEG quality.
//!
//! DPI is read from EXIF first, then from the container's own density
//! field (PNG `pHYs`, JPEG JFIF `APP0`). JPEG quality is estimated from the
//! luminance quantization table by inverting the IJG scaling formula.
//!
//! The `image` JPEG decoder exposes neither the JFIF density nor the
//! quantization tables, so those two segments are read directly from the
//! marker stream.

use std::io::Cursor;

use docqa_core::domain::{bits_per_channel, ContainerFormat, ImageMetadata};
use image::DynamicImage;
use tracing::trace;

const INCHES_PER_METER: f64 = 39.370_078_740_157_48;
const CM_PER_INCH: f64 = 2.54;

/// IJG reference luminance quantization table (Annex K of ITU T.81).
const STD_LUMINANCE_TABLE: [u16; 64] = [
    16, 11, 10, 16, 24, 40, 51, 61, 12, 12, 14, 19, 26, 58, 60, 55, 14, 13, 16, 24, 40, 57, 69,
    56, 14, 17, 22, 29, 51, 87, 80, 62, 18, 22, 37, 56, 68, 109, 103, 77, 24, 35, 55, 64, 81, 104,
    113, 92, 49, 64, 78, 87, 103, 121, 120, 101, 72, 92, 95, 98, 112, 100, 103, 99,
];

/// Builds the metadata record for a decoded file.
#[must_use]
pub fn extract(bytes: &[u8], format: ContainerFormat, pixels: &DynamicImage) -> ImageMetadata {
    let dpi = exif_dpi(bytes).or_else(|| match format {
        ContainerFormat::Png => png_dpi(bytes),
        ContainerFormat::Jpeg => jfif_dpi(bytes),
        _ => None,
    });
    let jpeg_quality = match format {
        ContainerFormat::Jpeg => jpeg_quality(bytes),
        _ => None,
    };

    ImageMetadata {
        format: Some(format),
        dpi,
        bit_depth: bits_per_channel(pixels),
        jpeg_quality,
        file_size: u64::try_from(bytes.len()).ok(),
    }
}

/// DPI from EXIF `XResolution`/`YResolution` and `ResolutionUnit`.
#[must_use]
pub fn exif_dpi(bytes: &[u8]) -> Option<(f64, f64)> {
    let exif = exif::Reader::new()
        .read_from_container(&mut Cursor::new(bytes))
        .ok()?;
    let rational = |tag| {
        let field = exif.get_field(tag, exif::In::PRIMARY)?;
        match &field.value {
            exif::Value::Rational(values) => values.first().map(exif::Rational::to_f64),
            _ => None,
        }
    };
    let x = rational(exif::Tag::XResolution)?;
    let y = rational(exif::Tag::YResolution).unwrap_or(x);
    // 2 = inches (the default), 3 = centimeters
    let unit = exif
        .get_field(exif::Tag::ResolutionUnit, exif::In::PRIMARY)
        .and_then(|f| f.value.get_uint(0))
        .unwrap_or(2);
    let scale = match unit {
        2 => 1.0,
        3 => CM_PER_INCH,
        _ => return None,
    };
    trace!(x, y, unit, "exif resolution");
    positive((x * scale, y * scale))
}

/// DPI from a PNG `pHYs` chunk with the meter unit.
#[must_use]
pub fn png_dpi(bytes: &[u8]) -> Option<(f64, f64)> {
    let reader = png::Decoder::new(Cursor::new(bytes)).read_info().ok()?;
    let dims = reader.info().pixel_dims?;
    if dims.unit != png::Unit::Meter {
        return None;
    }
    let x = f64::from(dims.xppu) / INCHES_PER_METER;
    let y = f64::from(dims.yppu) / INCHES_PER_METER;
    trace!(xppu = dims.xppu, yppu = dims.yppu, "png pixel dimensions");
    positive((x.round(), y.round()))
}

/// DPI from a JFIF `APP0` segment with a dots-per-inch or per-cm unit.
#[must_use]
pub fn jfif_dpi(bytes: &[u8]) -> Option<(f64, f64)> {
    jpeg_segments(bytes)
        .find(|(marker, data)| *marker == 0xE0 && data.starts_with(b"JFIF\0"))
        .and_then(|(_, data)| {
            let unit = *data.get(7)?;
            let x = f64::from(be_u16(data, 8)?);
            let y = f64::from(be_u16(data, 10)?);
            match unit {
                1 => positive((x, y)),
                2 => positive((x * CM_PER_INCH, y * CM_PER_INCH)),
                _ => None,
            }
        })
}

/// Estimated JPEG quality in (0, 1] from the luminance quantization table.
#[must_use]
pub fn jpeg_quality(bytes: &[u8]) -> Option<f64> {
    let table = jpeg_segments(bytes)
        .filter(|(marker, _)| *marker == 0xDB)
        .find_map(|(_, data)| luminance_table(data))?;

    let sum: u32 = table.iter().map(|&q| u32::from(q)).sum();
    let reference: u32 = STD_LUMINANCE_TABLE.iter().map(|&q| u32::from(q)).sum();
    let scale = f64::from(sum) * 100.0 / f64::from(reference);
    let quality = if scale <= 100.0 {
        (200.0 - scale) / 2.0
    } else {
        5000.0 / scale
    };
    Some((quality / 100.0).clamp(0.01, 1.0))
}

/// Table 0 from a DQT segment payload.
fn luminance_table(data: &[u8]) -> Option<Vec<u16>> {
    let mut pos = 0;
    while pos < data.len() {
        let precision = data[pos] >> 4;
        let id = data[pos] & 0x0F;
        let width = if precision == 0 { 1 } else { 2 };
        let body = data.get(pos + 1..pos + 1 + 64 * width)?;
        if id == 0 {
            return Some(if width == 1 {
                body.iter().map(|&b| u16::from(b)).collect()
            } else {
                body.chunks_exact(2)
                    .map(|c| u16::from_be_bytes([c[0], c[1]]))
                    .collect()
            });
        }
        pos += 1 + 64 * width;
    }
    None
}

/// Marker segments of a JPEG stream up to the first scan.
fn jpeg_segments(bytes: &[u8]) -> impl Iterator<Item = (u8, &[u8])> {
    let mut pos = if bytes.starts_with(&[0xFF, 0xD8]) {
        2
    } else {
        bytes.len()
    };
    std::iter::from_fn(move || {
        while bytes.get(pos) == Some(&0xFF) && bytes.get(pos + 1) == Some(&0xFF) {
            pos += 1;
        }
        if bytes.get(pos) != Some(&0xFF) {
            return None;
        }
        let marker = *bytes.get(pos + 1)?;
        // start of scan or end of image
        if marker == 0xDA || marker == 0xD9 {
            return None;
        }
        let len = usize::from(be_u16(bytes, pos + 2)?);
        let len = len.max(2);
        let data = bytes.get(pos + 4..pos + 2 + len)?;
        pos += 2 + len;
        Some((marker, data))
    })
}

fn be_u16(bytes: &[u8], at: usize) -> Option<u16> {
    Some(u16::from_be_bytes(bytes.get(at..at + 2)?.try_into().ok()?))
}

fn positive((x, y): (f64, f64)) -> Option<(f64, f64)> {
    (x.is_finite() && y.is_finite() && x > 0.0 && y > 0.0).then_some((x, y))
}

#[cfg(test)]
#[allow(clippy::expect_used)]
mod tests {
    use super::*;
    use image::codecs::jpeg::JpegEncoder;
    use image::{GrayImage, Luma};

    fn png_with_phys(ppm: u32, unit: png::Unit) -> Vec<u8> {
        let mut out = Vec::new();
        let mut encoder = png::Encoder::new(&mut out, 2, 2);
        encoder.set_color(png::ColorType::Grayscale);
        encoder.set_depth(png::BitDepth::Eight);
        encoder.set_pixel_dims(Some(png::PixelDimensions {
            xppu: ppm,
            yppu: ppm,
            unit,
        }));
        let mut writer = encoder.write_header().expect("png header");
        writer.write_image_data(&[0; 4]).expect("png data");
        writer.finish().expect("png end");
        out
    }

    fn jfif(unit: u8, density: u16) -> Vec<u8> {
        let mut bytes = vec![0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10];
        bytes.extend_from_slice(b"JFIF\0");
        bytes.extend_from_slice(&[1, 2, unit]);
        bytes.extend_from_slice(&density.to_be_bytes());
        bytes.extend_from_slice(&density.to_be_bytes());
        bytes.extend_from_slice(&[0, 0, 0xFF, 0xD9]);
        bytes
    }

    #[allow(clippy::cast_possible_truncation)]
    fn encoded_jpeg(quality: u8) -> Vec<u8> {
        let img = GrayImage::from_fn(32, 32, |x, y| Luma([((x * 7 + y * 3) % 256) as u8]));
        let mut out = Vec::new();
        let mut encoder = JpegEncoder::new_with_quality(&mut out, quality);
        assert!(encoder.encode_image(&img).is_ok());
        out
    }

    #[test]
    fn test_png_phys_meters() {
        // 11811 px/m is 300 DPI
        assert_eq!(png_dpi(&png_with_phys(11811, png::Unit::Meter)), Some((300.0, 300.0)));
    }

    #[test]
    fn test_png_phys_unknown_unit_is_ignored() {
        assert_eq!(png_dpi(&png_with_phys(11811, png::Unit::Unspecified)), None);
    }

    #[test]
    fn test_png_without_phys_has_no_dpi() {
        let mut out = Vec::new();
        let encoder = png::Encoder::new(&mut out, 1, 1);
        let mut writer = encoder.write_header().expect("png header");
        writer.write_image_data(&[0]).expect("png data");
        writer.finish().expect("png end");
        assert_eq!(png_dpi(&out), None);
    }

    #[test]
    fn test_truncated_png_has_no_dpi() {
        let bytes = png_with_phys(11811, png::Unit::Meter);
        assert_eq!(png_dpi(&bytes[..20]), None);
    }

    #[test]
    fn test_jfif_density() {
        assert_eq!(jfif_dpi(&jfif(1, 200)), Some((200.0, 200.0)));
        let per_cm = jfif_dpi(&jfif(2, 100)).map(|(x, _)| x);
        assert!(per_cm.is_some_and(|x| (x - 254.0).abs() < 1e-9));
        // aspect ratio only
        assert_eq!(jfif_dpi(&jfif(0, 1)), None);
    }

    #[test]
    fn test_jpeg_quality_tracks_encoder_setting() {
        let high = jpeg_quality(&encoded_jpeg(92)).unwrap_or_default();
        let low = jpeg_quality(&encoded_jpeg(40)).unwrap_or_default();
        assert!((high - 0.92).abs() < 0.04, "high = {high}");
        assert!((low - 0.40).abs() < 0.04, "low = {low}");
    }

    #[test]
    fn test_extract_png_has_no_quality() {
        let pixels = DynamicImage::new_rgb8(2, 2);
        let bytes = png_with_phys(11811, png::Unit::Meter);
        let meta = extract(&bytes, ContainerFormat::Png, &pixels);
        assert_eq!(meta.format, Some(ContainerFormat::Png));
        assert_eq!(meta.dpi, Some((300.0, 300.0)));
        assert_eq!(meta.bit_depth, 8);
        assert!(meta.jpeg_quality.is_none());
        assert_eq!(meta.file_size, u64::try_from(bytes.len()).ok());
    }

    #[test]
    fn test_garbage_yields_nothing() {
        assert!(exif_dpi(b"nope").is_none());
        assert!(jpeg_quality(b"nope").is_none());
        assert!(png_dpi(&[]).is_none());
    }
}
