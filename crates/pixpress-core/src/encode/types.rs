//! Core types for image encoding.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::geometry::InvalidImageError;

/// Lowest quality a lossy encode will accept (as a fraction).
pub const MIN_QUALITY: f32 = 0.01;
/// Highest quality a lossy encode will accept (as a fraction).
pub const MAX_QUALITY: f32 = 1.0;

/// Errors that can occur while encoding a surface.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EncodeError {
    /// Target dimensions are zero.
    #[error(transparent)]
    InvalidImage(#[from] InvalidImageError),

    /// The encoder finished but produced no bytes.
    #[error("{format} encoding produced no output")]
    EmptyOutput { format: OutputFormat },

    /// The underlying codec reported an error.
    #[error("Encoding failed: {0}")]
    EncodingFailed(String),
}

/// Errors from parsing a requested output format.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormatError {
    /// The format is recognized but not offered yet.
    #[error("Output format {0} is not yet available")]
    NotYetAvailable(String),

    /// The format is not recognized at all.
    #[error("Unknown output format: {0}")]
    Unknown(String),
}

/// Output formats the encoder can produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OutputFormat {
    /// Lossless RGBA.
    Png,
    /// Lossy RGB; transparent pixels are flattened onto white.
    Jpeg,
    /// RGBA with a quality setting.
    WebP,
}

impl OutputFormat {
    /// Parse a MIME type or file extension.
    ///
    /// GIF and ICO are recognized but rejected with
    /// `FormatError::NotYetAvailable` so callers can tell "planned" apart
    /// from "nonsense".
    pub fn parse(value: &str) -> Result<Self, FormatError> {
        let normalized = value.trim().to_ascii_lowercase();
        match normalized.as_str() {
            "image/png" | "png" => Ok(OutputFormat::Png),
            "image/jpeg" | "image/jpg" | "jpeg" | "jpg" => Ok(OutputFormat::Jpeg),
            "image/webp" | "webp" => Ok(OutputFormat::WebP),
            "image/gif" | "gif" | "image/x-icon" | "image/vnd.microsoft.icon" | "ico" => {
                Err(FormatError::NotYetAvailable(normalized))
            }
            _ => Err(FormatError::Unknown(value.to_string())),
        }
    }

    /// MIME type for the encoded bytes.
    pub fn mime(self) -> &'static str {
        match self {
            OutputFormat::Png => "image/png",
            OutputFormat::Jpeg => "image/jpeg",
            OutputFormat::WebP => "image/webp",
        }
    }

    /// Preferred file extension.
    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Png => "png",
            OutputFormat::Jpeg => "jpg",
            OutputFormat::WebP => "webp",
        }
    }

    /// Whether the output keeps an alpha channel.
    pub fn has_alpha(self) -> bool {
        !matches!(self, OutputFormat::Jpeg)
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            OutputFormat::Png => "PNG",
            OutputFormat::Jpeg => "JPEG",
            OutputFormat::WebP => "WebP",
        };
        f.write_str(name)
    }
}

/// Lossy encode quality as a fraction in `[MIN_QUALITY, MAX_QUALITY]`.
///
/// Construction always clamps, so a `Quality` is valid by construction.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
pub struct Quality(f32);

impl Quality {
    /// Quality from a fraction; NaN maps to the maximum.
    pub fn from_fraction(value: f32) -> Self {
        if value.is_nan() {
            return Quality(MAX_QUALITY);
        }
        Quality(value.clamp(MIN_QUALITY, MAX_QUALITY))
    }

    /// Quality from a percentage (the 1-100 slider scale).
    pub fn from_percent(percent: u32) -> Self {
        Self::from_fraction(percent.min(100) as f32 / 100.0)
    }

    /// The clamped fraction.
    pub fn fraction(self) -> f32 {
        self.0
    }

    /// JPEG quality on the 1-100 scale.
    pub fn to_jpeg(self) -> u8 {
        ((self.0 * 100.0).round() as u8).clamp(1, 100)
    }
}

impl Default for Quality {
    fn default() -> Self {
        Quality::from_percent(75)
    }
}

/// Filter type for scaling the source onto the target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum FilterType {
    /// Nearest neighbor interpolation (fastest, lowest quality).
    Nearest,
    /// Bilinear interpolation (fast, acceptable quality).
    #[default]
    Bilinear,
    /// Lanczos3 interpolation (slower, highest quality).
    Lanczos3,
}

impl FilterType {
    /// Convert to the image crate's FilterType.
    pub fn to_image_filter(self) -> image::imageops::FilterType {
        match self {
            FilterType::Nearest => image::imageops::FilterType::Nearest,
            FilterType::Bilinear => image::imageops::FilterType::Triangle,
            FilterType::Lanczos3 => image::imageops::FilterType::Lanczos3,
        }
    }
}

/// A re-encoded image ready to be installed into a slot.
#[derive(Debug, Clone, PartialEq)]
pub struct EncodedArtifact {
    pub format: OutputFormat,
    /// Quality the encoder applied; `None` when the output ignores it
    /// (PNG, and WebP while only lossless encoding is available).
    pub quality: Option<Quality>,
    pub width: u32,
    pub height: u32,
    pub bytes: Vec<u8>,
}

impl EncodedArtifact {
    pub fn mime(&self) -> &'static str {
        self.format.mime()
    }

    pub fn byte_size(&self) -> usize {
        self.bytes.len()
    }
}
