//! Image XObjects for the document writer.
//!
//! JPEG files whose pixels can be used as-is are embedded byte for byte
//! (`DCTDecode`). Everything else is embedded from decoded pixels as
//! zlib-compressed RGB (`FlateDecode`) with an optional soft mask for alpha.

use std::io::Write;

use flate2::write::ZlibEncoder;
use flate2::Compression;
use image::{DynamicImage, GenericImageView, ImageFormat};
use lopdf::{dictionary, Stream};

use crate::decode::{Orientation, SourceAsset, Surface};

/// An image stream plus its soft mask, ready to add to a PDF.
pub(crate) struct EmbeddedImage {
    pub image: Stream,
    pub smask: Option<Stream>,
}

/// How a queued image will get into the document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum EmbedPlan {
    /// Copy the JPEG bytes directly.
    Jpeg { components: u8 },
    /// Compress the decoded pixels.
    Raster,
    /// Re-encode to PNG first, then embed as raster.
    Transcode,
}

/// Decide how to embed an asset.
///
/// JPEGs go in directly only when the stored pixels are already upright and
/// in a gray or RGB color model; CMYK or EXIF-rotated JPEGs take the raster
/// path so the page matches the decoded image.
pub(crate) fn plan(asset: &SourceAsset, surface: &Surface) -> EmbedPlan {
    match surface.format {
        Some(ImageFormat::Jpeg) if surface.orientation == Orientation::Normal => {
            match jpeg_components(&asset.bytes) {
                Some(components @ (1 | 3)) => EmbedPlan::Jpeg { components },
                _ => EmbedPlan::Raster,
            }
        }
        Some(ImageFormat::Png) => EmbedPlan::Raster,
        _ => EmbedPlan::Transcode,
    }
}

/// Wrap JPEG bytes as a `DCTDecode` image XObject.
pub(crate) fn jpeg_xobject(bytes: &[u8], width: u32, height: u32, components: u8) -> EmbeddedImage {
    let color_space = if components == 1 { "DeviceGray" } else { "DeviceRGB" };
    let dict = dictionary! {
        "Type" => "XObject",
        "Subtype" => "Image",
        "Width" => i64::from(width),
        "Height" => i64::from(height),
        "ColorSpace" => color_space,
        "BitsPerComponent" => 8_i64,
        "Filter" => "DCTDecode",
    };
    EmbeddedImage {
        image: Stream::new(dict, bytes.to_vec()),
        smask: None,
    }
}

/// Build a `FlateDecode` RGB XObject, with an `SMask` when any pixel is not opaque.
pub(crate) fn raster_xobject(image: &DynamicImage) -> std::io::Result<EmbeddedImage> {
    let (width, height) = image.dimensions();

    let rgb = image.to_rgb8();
    let dict = dictionary! {
        "Type" => "XObject",
        "Subtype" => "Image",
        "Width" => i64::from(width),
        "Height" => i64::from(height),
        "ColorSpace" => "DeviceRGB",
        "BitsPerComponent" => 8_i64,
        "Filter" => "FlateDecode",
    };
    let image_stream = Stream::new(dict, deflate(rgb.as_raw())?);

    let smask = if image.color().has_alpha() {
        let alpha: Vec<u8> = image.to_rgba8().pixels().map(|p| p.0[3]).collect();
        if alpha.iter().all(|&a| a == u8::MAX) {
            None
        } else {
            let dict = dictionary! {
                "Type" => "XObject",
                "Subtype" => "Image",
                "Width" => i64::from(width),
                "Height" => i64::from(height),
                "ColorSpace" => "DeviceGray",
                "BitsPerComponent" => 8_i64,
                "Filter" => "FlateDecode",
            };
            Some(Stream::new(dict, deflate(&alpha)?))
        }
    } else {
        None
    };

    Ok(EmbeddedImage {
        image: image_stream,
        smask,
    })
}

fn deflate(data: &[u8]) -> std::io::Result<Vec<u8>> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data)?;
    encoder.finish()
}

/// Number of color components declared in a JPEG's frame header.
///
/// Walks the marker segments up to the first SOFn marker. Returns `None` if
/// the data is not a JPEG or no frame header precedes the scan.
pub(crate) fn jpeg_components(bytes: &[u8]) -> Option<u8> {
    if bytes.len() < 4 || bytes[0] != 0xFF || bytes[1] != 0xD8 {
        return None;
    }

    let mut pos = 2;
    while pos + 1 < bytes.len() {
        if bytes[pos] != 0xFF {
            return None;
        }
        let marker = bytes[pos + 1];
        pos += 2;

        match marker {
            // Fill byte; the marker starts at the next 0xFF.
            0xFF => pos -= 1,
            // Standalone markers carry no length.
            0x01 | 0xD0..=0xD7 => {}
            // End of image or start of scan before any frame header.
            0xD9 | 0xDA => return None,
            _ => {
                let len = usize::from(u16::from_be_bytes([*bytes.get(pos)?, *bytes.get(pos + 1)?]));
                let is_sof = matches!(marker, 0xC0..=0xCF) && !matches!(marker, 0xC4 | 0xC8 | 0xCC);
                if is_sof {
                    // length(2) precision(1) height(2) width(2) components(1)
                    return bytes.get(pos + 7).copied();
                }
                pos += len;
            }
        }
    }

    None
}
