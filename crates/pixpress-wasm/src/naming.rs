//! Download-name and size-label helpers for the UI.

use pixpress_core::{naming, OutputFormat, PipelineError};
use wasm_bindgen::prelude::*;

/// `compressed_<basename>.jpg`
#[wasm_bindgen]
pub fn compressed_filename(original: &str) -> String {
    naming::compressed_filename(original)
}

/// `<basename>_converted.<ext>` for a target MIME type or extension.
///
/// # Errors
///
/// Returns an error for targets the converter does not offer.
#[wasm_bindgen]
pub fn converted_filename(original: &str, target: &str) -> Result<String, JsValue> {
    let format = OutputFormat::parse(target)
        .map_err(|e| JsValue::from_str(&PipelineError::from(e).to_string()))?;
    Ok(naming::converted_filename(original, format))
}

/// `images_<timestamp>.pdf`; pass `Date.now()`.
#[wasm_bindgen]
pub fn document_filename(timestamp_ms: f64) -> String {
    naming::document_filename(timestamp_ms.max(0.0) as u64)
}

/// Human-readable size such as `"1.50 KB"`.
#[wasm_bindgen]
pub fn human_file_size(bytes: f64) -> String {
    naming::human_file_size(bytes.max(0.0) as u64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names() {
        assert_eq!(compressed_filename("cat.png"), "compressed_cat.jpg");
        assert_eq!(converted_filename("cat.png", "image/webp").unwrap(), "cat_converted.webp");
        assert_eq!(document_filename(1_700_000_000_123.0), "images_1700000000123.pdf");
        assert_eq!(document_filename(-5.0), "images_0.pdf");
    }

    #[test]
    fn test_human_file_size() {
        assert_eq!(human_file_size(0.0), "0 B");
        assert_eq!(human_file_size(1536.0), "1.50 KB");
    }
}
