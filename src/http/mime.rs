//! MIME type detection module
//!
//! Maps a served file's extension to its Content-Type. Extension matching is
//! case-insensitive.

use std::path::Path;

pub const HTML: &str = "text/html; charset=utf-8";
pub const TEXT: &str = "text/plain; charset=utf-8";

/// Get MIME Content-Type for a file path
///
/// # Examples
/// ```
/// use std::path::Path;
/// use dispatchd::http::mime::content_type;
/// assert_eq!(content_type(Path::new("index.HTML")), "text/html; charset=utf-8");
/// assert_eq!(content_type(Path::new("downloadables/a.zip")), "application/zip");
/// assert_eq!(content_type(Path::new("README")), "application/octet-stream");
/// ```
pub fn content_type(path: &Path) -> &'static str {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);

    match extension.as_deref() {
        // Text
        Some("html" | "htm") => HTML,
        Some("css") => "text/css",
        Some("txt" | "md" | "log") => TEXT,
        Some("csv") => "text/csv",
        Some("xml") => "application/xml",

        // Scripts and data
        Some("js" | "mjs") => "application/javascript",
        Some("json") => "application/json",
        Some("wasm") => "application/wasm",

        // Images
        Some("png") => "image/png",
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("svg") => "image/svg+xml",
        Some("ico") => "image/x-icon",
        Some("webp") => "image/webp",

        // Media
        Some("mp4") => "video/mp4",
        Some("webm") => "video/webm",
        Some("mp3") => "audio/mpeg",
        Some("wav") => "audio/wav",

        // Fonts
        Some("woff") => "font/woff",
        Some("woff2") => "font/woff2",
        Some("ttf") => "font/ttf",

        // Archives and documents
        Some("pdf") => "application/pdf",
        Some("zip") => "application/zip",
        Some("gz" | "gzip") => "application/gzip",
        Some("tar") => "application/x-tar",

        _ => "application/octet-stream",
    }
}

/// Whether the last path segment carries an extension (`report.txt`, not `report`)
pub fn has_extension(path: &str) -> bool {
    !path.ends_with('/') && Path::new(path).extension().is_some_and(|e| !e.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_common_types() {
        assert_eq!(content_type(Path::new("a/index.html")), HTML);
        assert_eq!(content_type(Path::new("style.css")), "text/css");
        assert_eq!(content_type(Path::new("report.txt")), TEXT);
        assert_eq!(content_type(Path::new("logo.PNG")), "image/png");
    }

    #[test]
    fn test_unknown_extension() {
        assert_eq!(content_type(Path::new("data.xyz")), "application/octet-stream");
        assert_eq!(content_type(Path::new("Makefile")), "application/octet-stream");
    }

    #[test]
    fn test_has_extension() {
        assert!(has_extension("report.txt"));
        assert!(has_extension("docs/guide.html"));
        assert!(!has_extension("report"));
        assert!(!has_extension("v1.2/report"));
        assert!(!has_extension("api/v1.0/"));
        assert!(!has_extension("assets.d/"));
        assert!(!has_extension(""));
    }
}
