//! Cross-origin isolation headers
//!
//! Browsers only expose `SharedArrayBuffer` to documents that are cross-origin
//! isolated, which needs both headers below on the top-level document and on the
//! resources it loads. They are added to every response this server produces.

use hyper::header::{HeaderMap, HeaderName, HeaderValue, SERVER};

pub const CROSS_ORIGIN_OPENER_POLICY: HeaderName =
    HeaderName::from_static("cross-origin-opener-policy");
pub const CROSS_ORIGIN_EMBEDDER_POLICY: HeaderName =
    HeaderName::from_static("cross-origin-embedder-policy");

/// The fixed header set, in emission order
pub const ISOLATION_HEADERS: [(HeaderName, HeaderValue); 2] = [
    (
        CROSS_ORIGIN_OPENER_POLICY,
        HeaderValue::from_static("same-origin"),
    ),
    (
        CROSS_ORIGIN_EMBEDDER_POLICY,
        HeaderValue::from_static("require-corp"),
    ),
];

/// Last step before a response head is written.
///
/// Overrides any isolation header a handler may have set, so the values are
/// always exactly the constants above. `Server` is only added when missing.
pub fn finalize_headers(headers: &mut HeaderMap, server_name: &str) {
    for (name, value) in ISOLATION_HEADERS {
        headers.insert(name, value);
    }

    if !headers.contains_key(SERVER) {
        if let Ok(value) = HeaderValue::from_str(server_name) {
            headers.insert(SERVER, value);
        }
    }
}
