//! Helpers for keeping logs and error messages bounded and free of source text.

use std::path::Path;

/// Maximum size of engine diagnostics embedded in an error message.
pub const MAX_DIAGNOSTIC_BYTES: usize = 4096;

/// Returns only the filename component of a path (no directory).
pub fn redact_path(path: &Path) -> String {
    path.file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("<unknown>")
        .to_string()
}

/// Cuts `text` to at most `max` bytes on a char boundary, marking the cut.
pub fn truncate(text: &str, max: usize) -> String {
    if text.len() <= max {
        return text.to_string();
    }
    let mut end = max;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}… [truncated {} bytes]", &text[..end], text.len() - end)
}

/// Joins captured stderr and stdout into one diagnostic string.
pub fn diagnostics(stdout: &[u8], stderr: &[u8]) -> String {
    let stdout = String::from_utf8_lossy(stdout);
    let stderr = String::from_utf8_lossy(stderr);
    let combined = match (stderr.trim(), stdout.trim()) {
        ("", "") => "no output".to_string(),
        (err, "") => err.to_string(),
        ("", out) => out.to_string(),
        (err, out) => format!("{}\n{}", err, out),
    };
    truncate(&combined, MAX_DIAGNOSTIC_BYTES)
}
