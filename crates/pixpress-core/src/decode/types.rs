//! Core types for image decoding.

use image::{DynamicImage, GenericImageView, ImageFormat};
use thiserror::Error;

use super::Orientation;
use crate::geometry::InvalidImageError;

/// Error types for image decoding operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// The byte buffer is not in a format the codec recognizes.
    #[error("Invalid or unsupported image format")]
    InvalidFormat,

    /// The codec recognized the format but rejected the contents.
    #[error("Corrupted or incomplete image file: {0}")]
    Corrupted(String),

    /// The image decoded but reports a zero-sized dimension.
    #[error(transparent)]
    InvalidImage(#[from] InvalidImageError),
}

/// A raw image file as selected or dropped by the user.
///
/// The bytes are never modified; all transforms produce new buffers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceAsset {
    /// Display name, usually the original file name.
    pub name: String,
    /// Raw file contents.
    pub bytes: Vec<u8>,
    /// MIME type reported by the host, if any.
    pub mime: Option<String>,
}

impl SourceAsset {
    /// Create a new asset from a file name and its bytes.
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            bytes,
            mime: None,
        }
    }

    /// Attach the MIME type reported by the host.
    pub fn with_mime(mut self, mime: impl Into<String>) -> Self {
        self.mime = Some(mime.into());
        self
    }

    /// Size of the raw file in bytes.
    pub fn byte_size(&self) -> usize {
        self.bytes.len()
    }

    /// MIME type, preferring the host-reported value and falling back to
    /// sniffing the magic bytes.
    pub fn inferred_mime(&self) -> Option<String> {
        match &self.mime {
            Some(mime) if !mime.is_empty() => Some(mime.clone()),
            _ => super::sniff_format(&self.bytes).map(|f| mime_for_format(f).to_string()),
        }
    }

    /// File name with the last extension stripped (`"a.b.png"` -> `"a.b"`).
    pub fn basename(&self) -> &str {
        crate::naming::strip_extension(&self.name)
    }
}

/// A decoded, pixel-addressable image.
///
/// Pixels are stored upright: any EXIF orientation has already been applied,
/// and `orientation` records what was applied.
#[derive(Debug, Clone)]
pub struct Surface {
    /// Decoded pixels in whatever color model the codec produced.
    pub image: DynamicImage,
    /// Container format the pixels were decoded from.
    pub format: Option<ImageFormat>,
    /// Orientation correction applied during decode.
    pub orientation: Orientation,
}

impl Surface {
    /// Wrap already-decoded pixels.
    ///
    /// # Errors
    ///
    /// Returns `InvalidImageError` if the image has a zero dimension.
    pub fn new(image: DynamicImage, format: Option<ImageFormat>) -> Result<Self, InvalidImageError> {
        let (width, height) = image.dimensions();
        if width == 0 || height == 0 {
            return Err(InvalidImageError { width, height });
        }
        Ok(Self {
            image,
            format,
            orientation: Orientation::Normal,
        })
    }

    /// Record the orientation correction that produced these pixels.
    pub fn with_orientation(mut self, orientation: Orientation) -> Self {
        self.orientation = orientation;
        self
    }

    /// Intrinsic width in pixels.
    pub fn native_width(&self) -> u32 {
        self.image.width()
    }

    /// Intrinsic height in pixels.
    pub fn native_height(&self) -> u32 {
        self.image.height()
    }

    /// Whether any channel of the color model carries alpha.
    pub fn has_alpha(&self) -> bool {
        self.image.color().has_alpha()
    }
}

/// Canonical MIME string for an `image` crate format.
pub fn mime_for_format(format: ImageFormat) -> &'static str {
    match format {
        ImageFormat::Png => "image/png",
        ImageFormat::Jpeg => "image/jpeg",
        ImageFormat::WebP => "image/webp",
        ImageFormat::Gif => "image/gif",
        ImageFormat::Bmp => "image/bmp",
        ImageFormat::Ico => "image/x-icon",
        ImageFormat::Tiff => "image/tiff",
        ImageFormat::Avif => "image/avif",
        _ => "application/octet-stream",
    }
}
