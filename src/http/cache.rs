//! HTTP cache validation module
//!
//! Provides `ETag` / `Last-Modified` generation and conditional request handling.

use chrono::{DateTime, NaiveDateTime, Utc};
use std::fs::Metadata;
use std::time::SystemTime;

/// IMF-fixdate, e.g. `Sun, 06 Nov 1994 08:49:37 GMT`
const HTTP_DATE_FORMAT: &str = "%a, %d %b %Y %H:%M:%S GMT";
/// RFC 850, e.g. `Sunday, 06-Nov-94 08:49:37 GMT`
const RFC850_FORMAT: &str = "%A, %d-%b-%y %H:%M:%S GMT";
/// asctime, e.g. `Sun Nov  6 08:49:37 1994`
const ASCTIME_FORMAT: &str = "%a %b %e %H:%M:%S %Y";

/// Validators of a file on disk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Validators {
    pub etag: String,
    /// Modification time truncated to whole seconds
    pub last_modified: DateTime<Utc>,
}

impl Validators {
    pub fn from_metadata(metadata: &Metadata) -> Self {
        let modified = metadata.modified().unwrap_or(SystemTime::UNIX_EPOCH);
        let secs = DateTime::<Utc>::from(modified).timestamp();
        let last_modified = DateTime::from_timestamp(secs, 0).unwrap_or_default();

        Self {
            etag: generate_etag(secs, metadata.len()),
            last_modified,
        }
    }

    pub fn last_modified_header(&self) -> String {
        format_http_date(self.last_modified)
    }
}

/// Generate `ETag` from modification time and size
///
/// # Returns
/// Quoted `ETag` string, e.g., `"65f1c2a0-1f4"`
pub fn generate_etag(mtime_secs: i64, len: u64) -> String {
    format!("\"{:x}-{len:x}\"", mtime_secs.max(0))
}

/// Check if client's `If-None-Match` header matches the server's `ETag`
///
/// Supports:
/// - Single `ETag`: `"abc123"`
/// - Multiple `ETags`: `"abc123", "def456"`
/// - Weak validators: `W/"abc123"`
/// - Wildcard: `*`
pub fn check_etag_match(if_none_match: Option<&str>, etag: &str) -> bool {
    if_none_match.is_some_and(|client_etag| {
        client_etag.split(',').map(str::trim).any(|candidate| {
            candidate == "*" || candidate.strip_prefix("W/").unwrap_or(candidate) == etag
        })
    })
}

pub fn format_http_date(time: DateTime<Utc>) -> String {
    time.format(HTTP_DATE_FORMAT).to_string()
}

/// Parse an HTTP date in any of the three formats HTTP/1.1 allows:
/// IMF-fixdate, RFC 850 or asctime
pub fn parse_http_date(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc2822(value) {
        return Some(parsed.with_timezone(&Utc));
    }
    [RFC850_FORMAT, ASCTIME_FORMAT]
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(value, format).ok())
        .map(|naive| naive.and_utc())
}

/// Decide whether a conditional GET/HEAD can be answered with 304.
///
/// `If-None-Match` takes precedence; `If-Modified-Since` is only consulted when
/// it is absent. Unparseable dates never produce a 304.
pub fn is_not_modified(
    if_none_match: Option<&str>,
    if_modified_since: Option<&str>,
    validators: &Validators,
) -> bool {
    if if_none_match.is_some() {
        return check_etag_match(if_none_match, &validators.etag);
    }

    if_modified_since
        .and_then(parse_http_date)
        .is_some_and(|since| validators.last_modified <= since)
}
