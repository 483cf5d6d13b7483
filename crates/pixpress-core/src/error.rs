//! Error taxonomy for the pipeline.
//!
//! Each stage owns its error type; [`PipelineError`] is what the orchestrator
//! reports to collaborators.

use thiserror::Error;

use crate::artifact::HandleError;
use crate::decode::DecodeError;
use crate::document::{PageSize, UnsupportedEmbedFormatError};
use crate::encode::{EncodeError, FormatError};
use crate::geometry::InvalidImageError;
use crate::queue::QueueIndexError;

/// Any failure surfaced by the orchestrator.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PipelineError {
    #[error(transparent)]
    InvalidImage(#[from] InvalidImageError),

    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error(transparent)]
    Encode(#[from] EncodeError),

    #[error(transparent)]
    UnsupportedEmbedFormat(#[from] UnsupportedEmbedFormatError),

    #[error(transparent)]
    QueueIndex(#[from] QueueIndexError),

    /// The format is planned but not offered yet. Not a processing failure.
    #[error("Output format {0} is not yet available")]
    UnsupportedFormatRequested(String),

    #[error("Unknown output format: {0}")]
    UnknownFormat(String),

    /// The page size is planned but not offered yet.
    #[error("Page size {0} is not yet available")]
    PageSizeUnavailable(PageSize),

    #[error("Add at least one image before creating a document")]
    EmptyQueue,

    #[error("Failed to write document: {0}")]
    DocumentWrite(String),

    #[error(transparent)]
    Handle(#[from] HandleError),
}

impl PipelineError {
    /// Stable, machine-readable name for the error class.
    pub fn kind(&self) -> &'static str {
        match self {
            PipelineError::InvalidImage(_) => "invalid-image",
            PipelineError::Decode(DecodeError::InvalidImage(_)) => "invalid-image",
            PipelineError::Decode(_) => "decode",
            PipelineError::Encode(_) => "encode",
            PipelineError::UnsupportedEmbedFormat(_) => "unsupported-embed-format",
            PipelineError::QueueIndex(_) => "queue-index",
            PipelineError::UnsupportedFormatRequested(_) => "not-yet-available",
            PipelineError::UnknownFormat(_) => "unknown-format",
            PipelineError::PageSizeUnavailable(_) => "not-yet-available",
            PipelineError::EmptyQueue => "empty-queue",
            PipelineError::DocumentWrite(_) => "document-write",
            PipelineError::Handle(_) => "handle",
        }
    }

    /// Whether this is a "not yet available" signal rather than a failure.
    pub fn is_not_yet_available(&self) -> bool {
        matches!(
            self,
            PipelineError::UnsupportedFormatRequested(_) | PipelineError::PageSizeUnavailable(_)
        )
    }
}

impl From<FormatError> for PipelineError {
    fn from(err: FormatError) -> Self {
        match err {
            FormatError::NotYetAvailable(format) => PipelineError::UnsupportedFormatRequested(format),
            FormatError::Unknown(format) => PipelineError::UnknownFormat(format),
        }
    }
}

impl From<lopdf::Error> for PipelineError {
    fn from(err: lopdf::Error) -> Self {
        PipelineError::DocumentWrite(err.to_string())
    }
}

impl From<std::io::Error> for PipelineError {
    fn from(err: std::io::Error) -> Self {
        PipelineError::DocumentWrite(err.to_string())
    }
}
