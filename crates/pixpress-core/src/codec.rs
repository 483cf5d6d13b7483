//! The suspension seam between the pipeline and the host codec.
//!
//! Decoding and encoding are the only operations in the pipeline that may
//! suspend. They are expressed as an async trait so a host can hand the work
//! to a worker or a native codec and resume when it signals completion.
//! Everything else in the pipeline runs synchronously between these points.
//!
//! The execution model is single-threaded, so the trait is `?Send`.

use async_trait::async_trait;

use crate::decode::{self, DecodeError, SourceAsset, Surface};
use crate::encode::{self, EncodeError, EncodedArtifact, FilterType, OutputFormat, Quality};
use crate::geometry::RenderTarget;

/// A host image codec.
#[async_trait(?Send)]
pub trait Codec {
    /// Decode an asset into a pixel surface.
    async fn decode(&self, asset: &SourceAsset) -> Result<Surface, DecodeError>;

    /// Rasterize `surface` at `target` and serialize it.
    async fn encode(
        &self,
        surface: &Surface,
        target: RenderTarget,
        format: OutputFormat,
        quality: Quality,
        filter: FilterType,
    ) -> Result<EncodedArtifact, EncodeError>;
}

/// Codec backed by the `image` crate, running inline on the caller's thread.
#[derive(Debug, Clone, Copy, Default)]
pub struct NativeCodec;

#[async_trait(?Send)]
impl Codec for NativeCodec {
    async fn decode(&self, asset: &SourceAsset) -> Result<Surface, DecodeError> {
        decode::decode_asset(asset)
    }

    async fn encode(
        &self,
        surface: &Surface,
        target: RenderTarget,
        format: OutputFormat,
        quality: Quality,
        filter: FilterType,
    ) -> Result<EncodedArtifact, EncodeError> {
        encode::encode_surface(surface, target, format, quality, filter)
    }
}
