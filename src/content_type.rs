//! Fallback MIME type lookup by file extension. Only consulted when a
//! response carries neither a cached header nor a directory-listing
//! heuristic to supply `Content-Type` from.

pub const DEFAULT: &str = "application/octet-stream";

/// Returns the MIME type for `path`'s extension, or [`DEFAULT`] if unknown.
pub fn infer(path: &str) -> &'static str {
    let base = path.rsplit('/').next().unwrap_or(path);
    let ext = match base.rsplit_once('.') {
        Some((_, ext)) => ext.to_ascii_lowercase(),
        None => return DEFAULT,
    };

    match ext.as_str() {
        "gz" | "gzip" => "application/gzip",
        "bz2" => "application/x-bzip2",
        "xz" => "application/x-xz",
        "deb" => "application/vnd.debian.binary-package",
        "asc" => "application/pgp-signature",
        "json" => "application/json",
        "txt" => "text/plain",
        "html" | "htm" => "text/html",
        "xml" => "application/xml",
        "gpg" => "application/pgp-encrypted",
        _ => DEFAULT,
    }
}
