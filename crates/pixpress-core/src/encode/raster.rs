//! Rasterize a surface at a target size and serialize it.
//!
//! The encoder draws the decoded source onto an off-screen RGBA canvas sized
//! to the [`RenderTarget`], then hands the canvas to the format's codec:
//!
//! - JPEG has no alpha channel, so the canvas starts opaque white and the
//!   source is composited over it. Transparent pixels come out white rather
//!   than black.
//! - PNG and WebP keep the canvas transparent.

use std::io::Cursor;

use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::codecs::webp::WebPEncoder;
use image::{imageops, ExtendedColorType, ImageEncoder, Rgba, RgbaImage};

use super::{EncodeError, EncodedArtifact, FilterType, OutputFormat, Quality};
use crate::decode::Surface;
use crate::geometry::{InvalidImageError, RenderTarget};

const OPAQUE_WHITE: Rgba<u8> = Rgba([255, 255, 255, 255]);

/// Encode a surface at the given size and format.
///
/// # Arguments
///
/// * `surface` - Decoded source pixels
/// * `target` - Output dimensions; the source is stretched to fill them exactly
/// * `format` - Output format
/// * `quality` - JPEG quality; ignored for PNG and (lossless) WebP
/// * `filter` - Interpolation used when the target differs from the source size
///
/// # Returns
///
/// An `EncodedArtifact` recording format, size and the quality actually used.
///
/// # Errors
///
/// Returns `EncodeError::InvalidImage` if the target has a zero dimension.
/// Returns `EncodeError::EncodingFailed` if the codec fails.
/// Returns `EncodeError::EmptyOutput` if the codec produced no bytes.
pub fn encode_surface(
    surface: &Surface,
    target: RenderTarget,
    format: OutputFormat,
    quality: Quality,
    filter: FilterType,
) -> Result<EncodedArtifact, EncodeError> {
    if target.width == 0 || target.height == 0 {
        return Err(InvalidImageError {
            width: target.width,
            height: target.height,
        }
        .into());
    }

    let canvas = rasterize(surface, target, format, filter);

    let (bytes, applied) = match format {
        OutputFormat::Png => (write_png(&canvas)?, None),
        OutputFormat::Jpeg => (write_jpeg(&canvas, quality)?, Some(quality)),
        OutputFormat::WebP => (write_webp(&canvas)?, None),
    };

    if bytes.is_empty() {
        return Err(EncodeError::EmptyOutput { format });
    }

    Ok(EncodedArtifact {
        format,
        quality: applied,
        width: target.width,
        height: target.height,
        bytes,
    })
}

/// Draw the source scaled to fill `target` on a fresh canvas.
fn rasterize(
    surface: &Surface,
    target: RenderTarget,
    format: OutputFormat,
    filter: FilterType,
) -> RgbaImage {
    let source = surface.image.to_rgba8();
    let scaled = if source.dimensions() == (target.width, target.height) {
        source
    } else {
        imageops::resize(&source, target.width, target.height, filter.to_image_filter())
    };

    if format.has_alpha() {
        // Source-over onto a transparent canvas is the source itself.
        return scaled;
    }

    let mut canvas = RgbaImage::from_pixel(target.width, target.height, OPAQUE_WHITE);
    imageops::overlay(&mut canvas, &scaled, 0, 0);
    canvas
}

fn write_png(canvas: &RgbaImage) -> Result<Vec<u8>, EncodeError> {
    let mut buffer = Cursor::new(Vec::new());
    PngEncoder::new(&mut buffer)
        .write_image(
            canvas.as_raw(),
            canvas.width(),
            canvas.height(),
            ExtendedColorType::Rgba8,
        )
        .map_err(|e| EncodeError::EncodingFailed(e.to_string()))?;
    Ok(buffer.into_inner())
}

fn write_jpeg(canvas: &RgbaImage, quality: Quality) -> Result<Vec<u8>, EncodeError> {
    // The canvas is fully opaque at this point, so dropping alpha is lossless.
    let rgb = image::DynamicImage::ImageRgba8(canvas.clone()).into_rgb8();

    let mut buffer = Cursor::new(Vec::new());
    JpegEncoder::new_with_quality(&mut buffer, quality.to_jpeg())
        .write_image(rgb.as_raw(), rgb.width(), rgb.height(), ExtendedColorType::Rgb8)
        .map_err(|e| EncodeError::EncodingFailed(e.to_string()))?;
    Ok(buffer.into_inner())
}

fn write_webp(canvas: &RgbaImage) -> Result<Vec<u8>, EncodeError> {
    // TODO: route quality through once a pure-Rust lossy WebP encoder is
    // available in the image crate; only lossless encoding exists today.
    let mut buffer = Cursor::new(Vec::new());
    WebPEncoder::new_lossless(&mut buffer)
        .write_image(
            canvas.as_raw(),
            canvas.width(),
            canvas.height(),
            ExtendedColorType::Rgba8,
        )
        .map_err(|e| EncodeError::EncodingFailed(e.to_string()))?;
    Ok(buffer.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decode::decode_bytes;
    use image::{DynamicImage, GenericImageView, ImageFormat};

    fn surface(width: u32, height: u32, pixel: Rgba<u8>) -> Surface {
        let img = RgbaImage::from_pixel(width, height, pixel);
        Surface::new(DynamicImage::ImageRgba8(img), Some(ImageFormat::Png)).unwrap()
    }

    fn gradient_surface(width: u32, height: u32) -> Surface {
        let img = RgbaImage::from_fn(width, height, |x, y| {
            Rgba([
                (x * 255 / width.max(1)) as u8,
                (y * 255 / height.max(1)) as u8,
                128,
                255,
            ])
        });
        Surface::new(DynamicImage::ImageRgba8(img), None).unwrap()
    }

    fn target(width: u32, height: u32) -> RenderTarget {
        RenderTarget { width, height }
    }

    #[test]
    fn test_jpeg_output_has_markers_and_size() {
        let src = gradient_surface(64, 32);
        let art = encode_surface(
            &src,
            target(32, 16),
            OutputFormat::Jpeg,
            Quality::from_percent(80),
            FilterType::Bilinear,
        )
        .unwrap();

        assert_eq!(&art.bytes[0..2], &[0xFF, 0xD8]);
        assert_eq!(&art.bytes[art.byte_size() - 2..], &[0xFF, 0xD9]);
        assert_eq!((art.width, art.height), (32, 16));
        assert_eq!(art.quality, Some(Quality::from_percent(80)));
        assert_eq!(art.mime(), "image/jpeg");

        let decoded = decode_bytes(&art.bytes).unwrap();
        assert_eq!(decoded.image.dimensions(), (32, 16));
    }

    #[test]
    fn test_jpeg_flattens_transparency_onto_white() {
        let src = surface(8, 8, Rgba([0, 0, 0, 0]));
        let art = encode_surface(
            &src,
            target(8, 8),
            OutputFormat::Jpeg,
            Quality::from_percent(100),
            FilterType::Nearest,
        )
        .unwrap();

        let decoded = decode_bytes(&art.bytes).unwrap().image.to_rgb8();
        for pixel in decoded.pixels() {
            assert!(pixel.0.iter().all(|&c| c > 245), "expected white, got {:?}", pixel);
        }
    }

    #[test]
    fn test_png_keeps_transparency_and_ignores_quality() {
        let src = surface(4, 4, Rgba([10, 20, 30, 0]));
        let low = encode_surface(
            &src,
            target(4, 4),
            OutputFormat::Png,
            Quality::from_percent(5),
            FilterType::Nearest,
        )
        .unwrap();
        let high = encode_surface(
            &src,
            target(4, 4),
            OutputFormat::Png,
            Quality::from_percent(95),
            FilterType::Nearest,
        )
        .unwrap();

        assert_eq!(low.bytes, high.bytes);
        assert_eq!(low.quality, None);

        let decoded = decode_bytes(&low.bytes).unwrap().image.to_rgba8();
        assert_eq!(decoded.get_pixel(0, 0).0[3], 0);
    }

    #[test]
    fn test_webp_round_trips_dimensions() {
        let src = gradient_surface(20, 10);
        let art = encode_surface(
            &src,
            target(10, 5),
            OutputFormat::WebP,
            Quality::from_percent(60),
            FilterType::Bilinear,
        )
        .unwrap();

        assert_eq!(&art.bytes[0..4], b"RIFF");
        assert_eq!(&art.bytes[8..12], b"WEBP");
        assert_eq!(art.quality, None);
        let decoded = decode_bytes(&art.bytes).unwrap();
        assert_eq!(decoded.image.dimensions(), (10, 5));
    }

    #[test]
    fn test_quality_above_max_matches_max() {
        let src = gradient_surface(24, 24);
        let encode = |q| {
            encode_surface(&src, target(24, 24), OutputFormat::Jpeg, q, FilterType::Bilinear)
                .unwrap()
                .bytes
        };

        assert_eq!(encode(Quality::from_percent(150)), encode(Quality::from_percent(100)));
        assert_eq!(encode(Quality::from_percent(0)), encode(Quality::from_percent(1)));
        assert_eq!(encode(Quality::from_fraction(0.0)), encode(Quality::from_fraction(0.01)));
    }

    #[test]
    fn test_zero_target_is_invalid() {
        let src = gradient_surface(4, 4);
        let result = encode_surface(
            &src,
            target(0, 4),
            OutputFormat::Png,
            Quality::default(),
            FilterType::Bilinear,
        );
        assert!(matches!(result, Err(EncodeError::InvalidImage(_))));
    }
}

// ============================================================================
// Property-Based Tests
// ============================================================================
