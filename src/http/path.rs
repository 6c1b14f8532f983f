//! Request path handling
//!
//! Maps the path component of a request target onto the document root.
//! Percent-escapes are decoded before the path is split, so an encoded
//! `%2e%2e` is treated exactly like a literal `..`.

use std::fmt::Write;
use std::path::{Component, Path, PathBuf};

/// Why a request path could not be mapped onto the document root
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathError {
    /// Bad percent-escape, invalid UTF-8, or a segment that is not a plain file name
    Malformed,
    /// `..` segments climb above the document root
    Escapes,
}

/// Decode `%XX` escapes. `+` is left alone, it only means space in query strings.
pub fn percent_decode(raw: &str) -> Option<String> {
    let bytes = raw.as_bytes();
    let mut decoded = Vec::with_capacity(bytes.len());
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] == b'%' {
            let hi = hex_value(*bytes.get(i + 1)?)?;
            let lo = hex_value(*bytes.get(i + 2)?)?;
            decoded.push((hi << 4) | lo);
            i += 3;
        } else {
            decoded.push(bytes[i]);
            i += 1;
        }
    }

    String::from_utf8(decoded).ok()
}

const fn hex_value(byte: u8) -> Option<u8> {
    match byte {
        b'0'..=b'9' => Some(byte - b'0'),
        b'a'..=b'f' => Some(byte - b'a' + 10),
        b'A'..=b'F' => Some(byte - b'A' + 10),
        _ => None,
    }
}

/// Percent-encode a path for use in an `href`; `/` and unreserved characters stay literal.
pub fn percent_encode(path: &str) -> String {
    let mut encoded = String::with_capacity(path.len());
    for byte in path.bytes() {
        if byte.is_ascii_alphanumeric() || matches!(byte, b'-' | b'.' | b'_' | b'~' | b'/') {
            encoded.push(char::from(byte));
        } else {
            let _ = write!(encoded, "%{byte:02X}");
        }
    }
    encoded
}

/// Resolve a request path (as found in the URI, still percent-encoded) below `root`.
///
/// Empty and `.` segments are dropped and `..` removes the previous segment.
/// The result is purely lexical: symlinks are checked later by [`is_within_root`].
pub fn resolve(root: &Path, request_path: &str) -> Result<PathBuf, PathError> {
    let decoded = percent_decode(request_path).ok_or(PathError::Malformed)?;
    let mut segments: Vec<&str> = Vec::new();

    for segment in decoded.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                if segments.pop().is_none() {
                    return Err(PathError::Escapes);
                }
            }
            _ if !is_plain_segment(segment) => return Err(PathError::Malformed),
            _ => segments.push(segment),
        }
    }

    let mut resolved = root.to_path_buf();
    resolved.extend(segments);
    Ok(resolved)
}

/// A segment must name exactly one ordinary path component on this platform
fn is_plain_segment(segment: &str) -> bool {
    if segment.contains(['\0', '\\']) {
        return false;
    }
    let mut components = Path::new(segment).components();
    matches!(components.next(), Some(Component::Normal(_))) && components.next().is_none()
}

/// Follow symlinks and check that `path` still lives under the canonical `root`.
///
/// Returns `None` when the path cannot be canonicalized (usually it does not exist).
pub async fn is_within_root(path: &Path, root: &Path) -> Option<bool> {
    let canonical = tokio::fs::canonicalize(path).await.ok()?;
    Some(canonical.starts_with(root))
}
