//! MIME type resolution from file extensions
//!
//! The cache needs a content type whenever it stores a response; renames
//! re-derive it from the new extension rather than copying the old one.

use crate::path;

/// Common MIME type constants.
pub mod types {
    pub const HTML: &str = "text/html";
    pub const PLAIN: &str = "text/plain";
    pub const CSS: &str = "text/css";
    pub const JAVASCRIPT: &str = "application/javascript";
    pub const JSON: &str = "application/json";
    pub const XML: &str = "application/xml";
    pub const MARKDOWN: &str = "text/markdown";
    pub const CSV: &str = "text/csv";

    pub const PDF: &str = "application/pdf";
    pub const OCTET_STREAM: &str = "application/octet-stream";
    pub const WASM: &str = "application/wasm";
    pub const ZIP: &str = "application/zip";
    pub const TAR: &str = "application/x-tar";

    pub const PNG: &str = "image/png";
    pub const JPEG: &str = "image/jpeg";
    pub const GIF: &str = "image/gif";
    pub const WEBP: &str = "image/webp";
    pub const SVG: &str = "image/svg+xml";
    pub const ICO: &str = "image/x-icon";
    pub const BMP: &str = "image/bmp";

    pub const MP3: &str = "audio/mpeg";
    pub const WAV: &str = "audio/wav";
    pub const OGG_AUDIO: &str = "audio/ogg";

    pub const MP4: &str = "video/mp4";
    pub const WEBM: &str = "video/webm";
    pub const OGG_VIDEO: &str = "video/ogg";

    pub const WOFF: &str = "font/woff";
    pub const WOFF2: &str = "font/woff2";
    pub const TTF: &str = "font/ttf";
    pub const OTF: &str = "font/otf";
}

/// Resolves a MIME type for a virtual path
pub trait MimeResolver: Send + Sync {
    /// MIME type for `path`, based on its extension
    fn mime_for(&self, path: &str) -> String;
}

/// Built-in extension table
#[derive(Debug, Clone, Copy, Default)]
pub struct ExtensionMimeResolver;

impl MimeResolver for ExtensionMimeResolver {
    fn mime_for(&self, path: &str) -> String {
        from_path(path).to_string()
    }
}

/// Guess MIME type from a virtual path.
pub fn from_path(path: &str) -> &'static str {
    let ext = path::extname(path).trim_start_matches('.');
    if ext.is_empty() {
        return types::OCTET_STREAM;
    }
    from_extension(&ext.to_ascii_lowercase())
}

/// Guess MIME type from a lowercase extension without the dot.
pub fn from_extension(ext: &str) -> &'static str {
    match ext {
        "html" | "htm" => types::HTML,
        "css" => types::CSS,
        "js" | "mjs" | "cjs" => types::JAVASCRIPT,
        "json" | "map" => types::JSON,
        "xml" => types::XML,
        "md" | "markdown" => types::MARKDOWN,
        "csv" => types::CSV,
        "txt" => types::PLAIN,

        "svg" => types::SVG,
        "png" => types::PNG,
        "jpg" | "jpeg" => types::JPEG,
        "gif" => types::GIF,
        "webp" => types::WEBP,
        "ico" => types::ICO,
        "bmp" => types::BMP,

        "mp3" => types::MP3,
        "wav" => types::WAV,
        "ogg" | "oga" => types::OGG_AUDIO,

        "mp4" | "m4v" => types::MP4,
        "webm" => types::WEBM,
        "ogv" => types::OGG_VIDEO,

        "woff" => types::WOFF,
        "woff2" => types::WOFF2,
        "ttf" => types::TTF,
        "otf" => types::OTF,

        "pdf" => types::PDF,
        "wasm" => types::WASM,
        "zip" => types::ZIP,
        "tar" => types::TAR,

        _ => types::OCTET_STREAM,
    }
}

/// Check if the MIME type represents text content.
pub fn is_text(mime: &str) -> bool {
    mime.starts_with("text/")
        || mime == types::JSON
        || mime == types::XML
        || mime == types::JAVASCRIPT
        || mime == types::SVG
}
