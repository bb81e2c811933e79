//! Handler for the `theme://` custom protocol.
//!
//! Serves theme asset files to the webview from the themes directory. The
//! `?t=` cache-buster the script loader appends is stripped before the file
//! is resolved; responses are marked no-cache so a re-applied theme always
//! observes fresh content.

use std::fs;
use std::path::{Path, PathBuf};

/// Extracts the themes-relative file path from a request URI, rejecting
/// anything that could traverse out of the themes directory.
///
/// Depending on platform, a custom-scheme URI arrives either as
/// `theme://<theme>/<file>` (the theme lands in the host part) or as
/// `theme://localhost/<theme>/<file>`; both shapes are handled.
fn request_rel_path(uri: &tauri::http::Uri) -> Option<String> {
    let path = uri.path().strip_prefix('/').unwrap_or(uri.path());
    let full = match uri.host() {
        Some("localhost") | Some("") | None => path.to_string(),
        Some(host) => format!("{}/{}", host, path),
    };
    // Query (the cache-buster) is not part of the Uri path, but be tolerant
    // of callers that baked it into the path string.
    let full = full.split('?').next().unwrap_or("").to_string();

    if full.is_empty() || full.split('/').any(|seg| seg.is_empty() || seg == "..") {
        return None;
    }
    Some(full)
}

fn mime_for(path: &Path) -> &'static str {
    match path.extension().and_then(|e| e.to_str()) {
        Some("html") => "text/html",
        Some("js") => "text/javascript",
        Some("css") => "text/css",
        Some("json") => "application/json",
        Some("png") => "image/png",
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("webp") => "image/webp",
        Some("svg") => "image/svg+xml",
        Some("gif") => "image/gif",
        Some("woff") => "font/woff",
        Some("woff2") => "font/woff2",
        Some("ttf") => "font/ttf",
        Some("otf") => "font/otf",
        _ => "application/octet-stream",
    }
}

fn status(code: u16, body: &'static [u8]) -> tauri::http::Response<Vec<u8>> {
    tauri::http::Response::builder()
        .status(code)
        .body(body.to_vec())
        .unwrap()
}

/// Serves one theme asset request from `themes_root`.
pub fn handle_theme_request(
    themes_root: &Path,
    request: &tauri::http::Request<Vec<u8>>,
) -> tauri::http::Response<Vec<u8>> {
    let Some(rel_path) = request_rel_path(request.uri()) else {
        return status(403, b"Forbidden");
    };
    let file_path = themes_root.join(&rel_path);

    // Canonical containment check catches symlink tricks the segment check
    // above cannot see.
    if let (Ok(canonical_base), Ok(canonical_file)) =
        (themes_root.canonicalize(), file_path.canonicalize())
    {
        if !canonical_file.starts_with(&canonical_base) {
            return status(403, b"Forbidden");
        }
    }

    if !file_path.is_file() {
        return status(404, b"Not Found");
    }

    match fs::read(&file_path) {
        Ok(content) => tauri::http::Response::builder()
            .header("Content-Type", mime_for(&file_path))
            .header("Cache-Control", "no-cache")
            .header("Access-Control-Allow-Origin", "*")
            .body(content)
            .unwrap(),
        Err(_) => status(500, b"Internal Server Error"),
    }
}

/// Resolves the themes directory the way the app resolves its asset folders:
/// prefer `themes/` in the working directory, fall back to `../themes` for
/// dev runs started from the crate directory.
pub fn resolve_themes_root() -> PathBuf {
    let direct = PathBuf::from("themes");
    if direct.exists() {
        return direct;
    }
    let parent = PathBuf::from("../themes");
    if parent.exists() {
        return parent;
    }
    direct
}
