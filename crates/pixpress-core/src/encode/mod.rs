//! Image encoding for the transcoding pipeline.
//!
//! This module provides functionality for:
//! - Rasterizing a decoded surface at a target size
//! - Encoding to PNG, JPEG (with quality) and WebP
//! - Parsing requested output formats, including ones that are planned but
//!   not yet offered
//!
//! # Examples
//!
//! ```ignore
//! use pixpress_core::encode::{encode_surface, FilterType, OutputFormat, Quality};
//! use pixpress_core::geometry::compute_render_target;
//!
//! let target = compute_render_target(surface.native_width(), surface.native_height(), 1024)?;
//! let artifact = encode_surface(&surface, target, OutputFormat::Jpeg, Quality::from_percent(75), FilterType::Bilinear)?;
//! println!("Encoded {} bytes", artifact.byte_size());
//! ```

mod raster;
mod types;

pub use raster::encode_surface;
pub use types::{
    EncodeError, EncodedArtifact, FilterType, FormatError, OutputFormat, Quality, MAX_QUALITY,
    MIN_QUALITY,
};
