//! Pixpress WASM - WebAssembly bindings for Pixpress
//!
//! This crate exposes the pixpress-core pipeline to JavaScript/TypeScript
//! applications.
//!
//! # Module Structure
//!
//! - `orchestrator` - `JsOrchestrator`, the compress/convert/document front door
//! - `types` - WASM-compatible wrapper types for artifacts and documents
//! - `handles` - Object URL handles backed by Blobs
//! - `naming` - Download names and size labels
//! - `logger` - Browser console backend for `log`
//!
//! # Usage
//!
//! ```typescript
//! import init, { JsOrchestrator, converted_filename } from '@pixpress/wasm';
//!
//! // Initialize WASM module (must call first)
//! await init();
//!
//! const pipeline = new JsOrchestrator();
//! const bytes = new Uint8Array(await file.arrayBuffer());
//! const out = await pipeline.convert(file.name, bytes, 'image/webp');
//! if (out) download(out.url, converted_filename(file.name, out.mime));
//! ```

use wasm_bindgen::prelude::*;

mod handles;
mod logger;
mod naming;
mod orchestrator;
mod types;

// Re-export public types
pub use handles::ObjectUrlHandles;
pub use naming::{compressed_filename, converted_filename, document_filename, human_file_size};
pub use orchestrator::JsOrchestrator;
pub use types::{JsArtifact, JsDocument};

/// Initialize the WASM module (called automatically on load)
#[wasm_bindgen(start)]
pub fn init() {
    console_error_panic_hook::set_once();
    logger::init(log::LevelFilter::Info);
}

/// Change how much pipeline logging reaches the console
/// (`"off"`, `"error"`, `"warn"`, `"info"`, `"debug"`, `"trace"`).
#[wasm_bindgen]
pub fn set_log_level(level: &str) -> Result<(), JsValue> {
    let filter = logger::parse_level(level)
        .ok_or_else(|| JsValue::from_str(&format!("Unknown log level: {level}")))?;
    logger::init(filter);
    Ok(())
}

/// Get the version of the WASM module
#[wasm_bindgen]
pub fn version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!version().is_empty());
        assert_eq!(version(), pixpress_core::version());
    }
}
