//! Image decoding for the transcoding pipeline.
//!
//! This module turns raw file bytes into a [`Surface`]: decoded pixels plus
//! the container format they came from. Decoding is all-or-nothing; a buffer
//! the codec rejects never yields a partially decoded surface.
//!
//! The functions here are synchronous. The pipeline reaches them through the
//! [`Codec`](crate::codec::Codec) trait, which is where suspension happens.
//!
//! # Examples
//!
//! ```ignore
//! use pixpress_core::decode::{decode_asset, SourceAsset};
//!
//! let bytes = std::fs::read("photo.jpg").unwrap();
//! let surface = decode_asset(&SourceAsset::new("photo.jpg", bytes)).unwrap();
//! println!("Decoded {}x{}", surface.native_width(), surface.native_height());
//! ```

mod orientation;
mod reader;
mod types;

pub use orientation::{apply_orientation, read_orientation, Orientation};
pub use reader::{decode_asset, decode_bytes, sniff_format};
pub use types::{mime_for_format, DecodeError, SourceAsset, Surface};
