//! WASM-compatible wrapper types for pipeline outputs.
//!
//! This module provides JavaScript-friendly types that wrap the core pixpress
//! types, plus the string conversions the bindings need.

use pixpress_core::queue::{AppendReport, QueueEntry};
use pixpress_core::{Document, EncodedArtifact, Handle, PageSize, Status, Tool};
use serde::Serialize;
use wasm_bindgen::prelude::*;

/// An encoded image installed in one of the orchestrator's slots.
///
/// `url` is the object URL the orchestrator owns; it stays valid until the
/// slot is replaced or released. `bytes()` copies the encoded file into a
/// `Uint8Array`.
#[wasm_bindgen]
pub struct JsArtifact {
    url: String,
    mime: String,
    width: u32,
    height: u32,
    quality: Option<u32>,
    bytes: Vec<u8>,
}

impl JsArtifact {
    pub(crate) fn from_artifact(artifact: EncodedArtifact, handle: Handle) -> Self {
        JsArtifact {
            url: handle.as_str().to_string(),
            mime: artifact.mime().to_string(),
            width: artifact.width,
            height: artifact.height,
            quality: artifact.quality.map(|q| u32::from(q.to_jpeg())),
            bytes: artifact.bytes,
        }
    }
}

#[wasm_bindgen]
impl JsArtifact {
    #[wasm_bindgen(getter)]
    pub fn url(&self) -> String {
        self.url.clone()
    }

    #[wasm_bindgen(getter)]
    pub fn mime(&self) -> String {
        self.mime.clone()
    }

    #[wasm_bindgen(getter)]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[wasm_bindgen(getter)]
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Quality used (percent), or `undefined` for lossless output.
    #[wasm_bindgen(getter)]
    pub fn quality(&self) -> Option<u32> {
        self.quality
    }

    /// Size of the encoded file in bytes
    #[wasm_bindgen(getter)]
    pub fn byte_size(&self) -> usize {
        self.bytes.len()
    }

    /// Copy the encoded file into a new `Uint8Array`.
    pub fn bytes(&self) -> Vec<u8> {
        self.bytes.clone()
    }
}

/// An assembled PDF installed in the document slot.
#[wasm_bindgen]
pub struct JsDocument {
    url: String,
    page_sizes: Vec<u32>,
    bytes: Vec<u8>,
}

impl JsDocument {
    pub(crate) fn from_document(document: Document, handle: Handle) -> Self {
        let page_sizes = document
            .pages
            .iter()
            .flat_map(|p| [p.rendered_width, p.rendered_height])
            .collect();
        JsDocument {
            url: handle.as_str().to_string(),
            page_sizes,
            bytes: document.bytes,
        }
    }
}

#[wasm_bindgen]
impl JsDocument {
    #[wasm_bindgen(getter)]
    pub fn url(&self) -> String {
        self.url.clone()
    }

    #[wasm_bindgen(getter)]
    pub fn page_count(&self) -> usize {
        self.page_sizes.len() / 2
    }

    /// Page sizes as a flat `[w0, h0, w1, h1, ...]` array.
    #[wasm_bindgen(getter)]
    pub fn page_sizes(&self) -> Vec<u32> {
        self.page_sizes.clone()
    }

    #[wasm_bindgen(getter)]
    pub fn byte_size(&self) -> usize {
        self.bytes.len()
    }

    pub fn bytes(&self) -> Vec<u8> {
        self.bytes.clone()
    }
}

/// Queue entry as seen from JavaScript.
#[derive(Debug, Serialize)]
pub(crate) struct QueueEntryView {
    pub id: u64,
    pub name: String,
    pub url: String,
    pub width: u32,
    pub height: u32,
}

impl From<&QueueEntry> for QueueEntryView {
    fn from(entry: &QueueEntry) -> Self {
        QueueEntryView {
            id: entry.id.get(),
            name: entry.display_name.clone(),
            url: entry.handle.as_str().to_string(),
            width: entry.surface.native_width(),
            height: entry.surface.native_height(),
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct RejectedView {
    pub name: String,
    pub error: String,
}

/// Result of `append_images` as seen from JavaScript.
#[derive(Debug, Serialize)]
pub(crate) struct AppendReportView {
    pub added: Vec<u64>,
    pub rejected: Vec<RejectedView>,
    pub superseded: bool,
}

impl From<AppendReport> for AppendReportView {
    fn from(report: AppendReport) -> Self {
        AppendReportView {
            added: report.added.iter().map(|id| id.get()).collect(),
            rejected: report
                .rejected
                .into_iter()
                .map(|r| RejectedView {
                    name: r.name,
                    error: r.error.to_string(),
                })
                .collect(),
            superseded: report.superseded,
        }
    }
}

/// Parse a tool name (`"compress"`, `"convert"`, `"document"`).
pub(crate) fn parse_tool(value: &str) -> Option<Tool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "compress" => Some(Tool::Compress),
        "convert" => Some(Tool::Convert),
        "document" | "pdf" => Some(Tool::Document),
        _ => None,
    }
}

/// Parse a page size name; empty means auto.
pub(crate) fn parse_page_size(value: &str) -> Option<PageSize> {
    match value.trim().to_ascii_lowercase().as_str() {
        "" | "auto" => Some(PageSize::Auto),
        "a4" => Some(PageSize::A4),
        "letter" => Some(PageSize::Letter),
        _ => None,
    }
}

pub(crate) fn status_name(status: Status) -> &'static str {
    match status {
        Status::Idle => "idle",
        Status::Working => "working",
        Status::Ready => "ready",
        Status::Error => "error",
    }
}
