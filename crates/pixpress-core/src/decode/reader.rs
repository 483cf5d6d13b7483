//! Byte-buffer decoding through the `image` crate.

use std::io::Cursor;

use image::{ImageFormat, ImageReader};

use super::orientation::{apply_orientation, read_orientation};
use super::{DecodeError, SourceAsset, Surface};

/// Decode a source asset into a pixel surface.
///
/// The container format is sniffed from the magic bytes; the host-reported
/// MIME type is not trusted for decoding. EXIF orientation is applied so the
/// surface dimensions match what a viewer would display.
///
/// # Errors
///
/// Returns `DecodeError::InvalidFormat` if the bytes are not a recognized image.
/// Returns `DecodeError::Corrupted` if the codec rejects the contents.
/// Returns `DecodeError::InvalidImage` if the decoded image has a zero dimension.
pub fn decode_asset(asset: &SourceAsset) -> Result<Surface, DecodeError> {
    decode_bytes(&asset.bytes)
}

/// Decode raw image bytes into a pixel surface.
pub fn decode_bytes(bytes: &[u8]) -> Result<Surface, DecodeError> {
    let reader = ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|e| DecodeError::Corrupted(e.to_string()))?;

    let format = reader.format().ok_or(DecodeError::InvalidFormat)?;

    let image = reader
        .decode()
        .map_err(|e| DecodeError::Corrupted(e.to_string()))?;

    let orientation = read_orientation(bytes);
    let image = apply_orientation(image, orientation);

    Ok(Surface::new(image, Some(format))?.with_orientation(orientation))
}

/// Guess the container format from the leading magic bytes.
pub fn sniff_format(bytes: &[u8]) -> Option<ImageFormat> {
    image::guess_format(bytes).ok()
}
