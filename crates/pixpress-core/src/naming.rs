//! Suggested download names and human-readable sizes.

use crate::encode::OutputFormat;

const SIZE_UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];

/// Strip the last extension from a file name.
///
/// Only a non-empty suffix after the last `.` that contains no path separator
/// counts as an extension, so `"archive."` and `"dir.d/file"` are unchanged.
pub fn strip_extension(name: &str) -> &str {
    match name.rfind('.') {
        Some(dot) => {
            let ext = &name[dot + 1..];
            if ext.is_empty() || ext.contains('/') {
                name
            } else {
                &name[..dot]
            }
        }
        None => name,
    }
}

/// `compressed_<basename>.jpg`
pub fn compressed_filename(original: &str) -> String {
    format!("compressed_{}.jpg", strip_extension(original))
}

/// `<basename>_converted.<ext>`
pub fn converted_filename(original: &str, format: OutputFormat) -> String {
    format!("{}_converted.{}", strip_extension(original), format.extension())
}

/// `images_<timestamp>.pdf`, with the timestamp in milliseconds.
pub fn document_filename(timestamp_ms: u64) -> String {
    format!("images_{timestamp_ms}.pdf")
}

/// Format a byte count as e.g. `"1.50 KB"`; zero is `"0 B"`.
pub fn human_file_size(bytes: u64) -> String {
    if bytes == 0 {
        return "0 B".to_string();
    }
    let mut unit = 0;
    let mut value = bytes as f64;
    while value >= 1024.0 && unit < SIZE_UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    format!("{:.2} {}", value, SIZE_UNITS[unit])
}
