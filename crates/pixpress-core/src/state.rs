//! Per-tool status snapshots and the reducer that advances them.
//!
//! A [`ToolState`] is an immutable value; the only way to get a new one is
//! [`reduce`]. Completion and failure events carry the [`RequestToken`] of the
//! request that produced them, and the reducer ignores events whose token is
//! not the one currently pending, so a slow superseded request can neither
//! mark a tool "ready" nor overwrite a newer error.

use serde::{Deserialize, Serialize};

use crate::artifact::{Handle, RequestToken, Slot};
use crate::error::PipelineError;

/// The three user-facing tools.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Tool {
    Compress,
    Convert,
    Document,
}

impl Tool {
    pub const ALL: [Tool; 3] = [Tool::Compress, Tool::Convert, Tool::Document];

    /// Slot holding the tool's source preview, if it has one.
    pub fn original_slot(self) -> Option<Slot> {
        match self {
            Tool::Compress => Some(Slot::CompressOriginal),
            Tool::Convert => Some(Slot::ConvertOriginal),
            Tool::Document => None,
        }
    }

    /// Slot holding the tool's output.
    pub fn output_slot(self) -> Slot {
        match self {
            Tool::Compress => Slot::CompressPreview,
            Tool::Convert => Slot::ConvertOutput,
            Tool::Document => Slot::DocumentOutput,
        }
    }
}

/// Coarse progress indicator for collaborators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Status {
    #[default]
    Idle,
    Working,
    Ready,
    Error,
}

/// What a finished request installed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputSummary {
    pub handle: Handle,
    pub mime: String,
    pub byte_size: usize,
    /// Pixel size for images; `None` for documents.
    pub dimensions: Option<(u32, u32)>,
    /// Page count for documents; `None` for images.
    pub pages: Option<usize>,
}

/// Snapshot of one tool.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ToolState {
    pub status: Status,
    /// Request whose outcome the tool is waiting for.
    pub pending: Option<RequestToken>,
    /// Last installed output; kept visible while a newer request runs.
    pub output: Option<OutputSummary>,
    /// Failure of the most recent request.
    pub error: Option<PipelineError>,
}

/// Inputs to [`reduce`].
#[derive(Debug, Clone, PartialEq)]
pub enum ToolEvent {
    /// A request was issued.
    Started(RequestToken),
    /// A request finished and its output was installed.
    Completed {
        token: RequestToken,
        output: OutputSummary,
    },
    /// A request failed.
    Failed {
        token: RequestToken,
        error: PipelineError,
    },
    /// A request finished but its handle could not be created. The previous
    /// output was already revoked.
    InstallFailed {
        token: RequestToken,
        error: PipelineError,
    },
    /// The tool's source and output were discarded.
    Reset,
}

/// Advance a tool snapshot by one event.
pub fn reduce(state: &ToolState, event: ToolEvent) -> ToolState {
    match event {
        ToolEvent::Started(token) => ToolState {
            status: Status::Working,
            pending: Some(token),
            output: state.output.clone(),
            error: None,
        },
        ToolEvent::Completed { token, output } if state.pending == Some(token) => ToolState {
            status: Status::Ready,
            pending: None,
            output: Some(output),
            error: None,
        },
        ToolEvent::Failed { token, error } if state.pending == Some(token) => ToolState {
            status: Status::Error,
            pending: None,
            output: state.output.clone(),
            error: Some(error),
        },
        ToolEvent::InstallFailed { token, error } if state.pending == Some(token) => ToolState {
            status: Status::Error,
            pending: None,
            output: None,
            error: Some(error),
        },
        ToolEvent::Completed { .. } | ToolEvent::Failed { .. } | ToolEvent::InstallFailed { .. } => {
            state.clone()
        }
        ToolEvent::Reset => ToolState::default(),
    }
}
