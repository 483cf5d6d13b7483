//! Pixpress Core - Image transcoding and document assembly
//!
//! This crate provides the pipeline behind Pixpress's three tools: compress
//! (re-encode as JPEG with a size cap), convert (PNG, JPEG or WebP) and
//! document (an ordered image queue assembled into a PDF).
//!
//! It is host-agnostic. Decoding and encoding go through the [`Codec`] trait,
//! and output bytes are exposed to the host through a [`HandleProvider`].

pub mod artifact;
pub mod codec;
pub mod config;
pub mod decode;
pub mod document;
pub mod encode;
pub mod error;
pub mod geometry;
pub mod naming;
pub mod orchestrator;
pub mod queue;
pub mod state;

pub use artifact::{ArtifactStore, Handle, HandleError, HandleProvider, MemoryHandles, RequestToken, Slot};
pub use codec::{Codec, NativeCodec};
pub use config::PipelineConfig;
pub use decode::{DecodeError, Orientation, SourceAsset, Surface};
pub use document::{assemble_document, Document, Page, PageSize, UnsupportedEmbedFormatError};
pub use encode::{EncodeError, EncodedArtifact, FilterType, FormatError, OutputFormat, Quality};
pub use error::PipelineError;
pub use geometry::{compute_render_target, fit_within, InvalidImageError, RenderTarget};
pub use naming::{compressed_filename, converted_filename, document_filename, human_file_size};
pub use orchestrator::{Delivery, Orchestrator};
pub use queue::{AppendReport, EntryId, ImageQueue, QueueEntry, QueueIndexError, RejectedAsset};
pub use state::{Status, Tool, ToolState};

/// Crate version, as reported to hosts.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert_eq!(version(), "0.1.0");
    }

    #[test]
    fn test_reexports() {
        let config = PipelineConfig::default();
        assert_eq!(config.max_page_dim, config::MAX_PAGE_DIM);
        assert_eq!(PageSize::default(), PageSize::Auto);
    }
}
