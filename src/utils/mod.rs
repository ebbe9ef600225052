//! Filename helpers for downloaded media.

use std::path::{Path, PathBuf};

/// Sanitize a string for use as a filename.
/// Replaces path separators and other problematic characters.
pub fn sanitize_filename(name: &str) -> String {
    let sanitized: String = name
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' | '\0' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();

    // Trim and limit length
    let trimmed = sanitized.trim().trim_matches('_');
    if trimmed.len() > 150 {
        let mut end = 150;
        while !trimmed.is_char_boundary(end) {
            end -= 1;
        }
        trimmed[..end].to_string()
    } else if trimmed.is_empty() {
        "video".to_string()
    } else {
        trimmed.to_string()
    }
}

/// Destination path for a recovered video: `{output_dir}/{owner} - {title}.mp4`.
pub fn video_output_path(output_dir: &Path, owner: &str, title: &str) -> PathBuf {
    let basename = sanitize_filename(&format!("{} - {}", owner, title));
    output_dir.join(format!("{}.mp4", basename))
}
