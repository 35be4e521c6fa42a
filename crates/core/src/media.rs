//! Media types inferred from file extensions.

/// Media type of a gzip-compressed payload.
pub const GZIP: &str = "application/gzip";

/// Media type used when the extension is unknown.
pub const DEFAULT_MEDIA_TYPE: &str = "application/octet-stream";

/// Media type served for directory index paths.
pub const HTML: &str = "text/html; charset=utf-8";

/// Infer a media type from a path's extension.
///
/// Paths ending in `/` are directory indexes and are always HTML.
pub fn media_type_for_path(path: &str) -> &'static str {
    if path.is_empty() || path.ends_with('/') {
        return HTML;
    }

    let file_name = path.rsplit('/').next().unwrap_or(path);
    let Some((_, extension)) = file_name.rsplit_once('.') else {
        return DEFAULT_MEDIA_TYPE;
    };

    match extension.to_ascii_lowercase().as_str() {
        "html" | "htm" => HTML,
        "css" => "text/css; charset=utf-8",
        "js" | "mjs" => "text/javascript; charset=utf-8",
        "json" => "application/json",
        "map" => "application/json",
        "webmanifest" => "application/manifest+json",
        "xml" => "text/xml; charset=utf-8",
        "txt" | "text" => "text/plain; charset=utf-8",
        "md" => "text/markdown; charset=utf-8",
        "csv" => "text/csv; charset=utf-8",
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "avif" => "image/avif",
        "svg" => "image/svg+xml",
        "ico" => "image/x-icon",
        "woff" => "font/woff",
        "woff2" => "font/woff2",
        "ttf" => "font/ttf",
        "otf" => "font/otf",
        "wasm" => "application/wasm",
        "pdf" => "application/pdf",
        "mp4" => "video/mp4",
        "webm" => "video/webm",
        "mp3" => "audio/mpeg",
        "zip" => "application/zip",
        "tar" => "application/x-tar",
        "gz" | "tgz" => GZIP,
        _ => DEFAULT_MEDIA_TYPE,
    }
}

/// Whether a declared media type names a gzip-compressed payload.
pub fn is_gzip(media_type: &str) -> bool {
    media_type == GZIP
}
