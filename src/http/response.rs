//! HTTP response building module
//!
//! Builders for every status the file server produces. None of them add the
//! cross-origin isolation headers; that happens once, in
//! [`finalize_headers`](super::isolation::finalize_headers).

use super::cache::{self, Validators};
use http_body_util::{BodyExt, Full};
use hyper::body::Bytes;
use hyper::header::{CONTENT_LENGTH, CONTENT_TYPE, DATE, ETAG, LAST_MODIFIED, LOCATION};
use hyper::{Response, StatusCode};
use std::fmt::Write;

const ERROR_CONTENT_TYPE: &str = "text/html;charset=utf-8";
const LISTING_CONTENT_TYPE: &str = "text/html; charset=utf-8";

/// Build an error page for `status`.
///
/// `message` defaults to the canonical reason phrase. The body is left out for
/// HEAD requests and for statuses that must not carry one.
pub fn build_error_response(
    status: StatusCode,
    message: Option<&str>,
    is_head: bool,
) -> Response<Full<Bytes>> {
    let reason = status.canonical_reason().unwrap_or("Unknown");
    let message = message.unwrap_or(reason);
    let page = format!(
        "<!DOCTYPE HTML>\n\
         <html lang=\"en\">\n    \
         <head>\n        \
         <meta charset=\"utf-8\">\n        \
         <title>Error response</title>\n    \
         </head>\n    \
         <body>\n        \
         <h1>Error response</h1>\n        \
         <p>Error code: {code}</p>\n        \
         <p>Message: {message}.</p>\n        \
         <p>Error code explanation: {code} - {explain}.</p>\n    \
         </body>\n\
         </html>\n",
        code = status.as_u16(),
        message = escape_html(message),
        explain = explain(status),
    );

    let omit_body = is_head
        || status.is_informational()
        || status == StatusCode::NO_CONTENT
        || status == StatusCode::NOT_MODIFIED;

    let mut builder = Response::builder().status(status);
    let body = if omit_body {
        Bytes::new()
    } else {
        builder = builder
            .header(CONTENT_TYPE, ERROR_CONTENT_TYPE)
            .header(CONTENT_LENGTH, page.len());
        Bytes::from(page)
    };

    builder.body(Full::new(body)).unwrap_or_else(|e| {
        log_build_error(status.as_str(), &e);
        fallback(status)
    })
}

/// Longer description used on error pages
fn explain(status: StatusCode) -> &'static str {
    match status.as_u16() {
        400 => "Bad request syntax or unsupported method",
        403 => "Request forbidden -- authorization will not help",
        404 => "Nothing matches the given URI",
        431 => "The server is unwilling to process the request because its header fields are too large",
        500 => "Server got itself in trouble",
        501 => "Server does not support this operation",
        505 => "Cannot fulfill request",
        _ => status.canonical_reason().unwrap_or("Unknown"),
    }
}

/// Build 301 redirect, used to add the trailing slash to directory URLs
pub fn build_redirect_response(location: &str) -> Response<Full<Bytes>> {
    Response::builder()
        .status(StatusCode::MOVED_PERMANENTLY)
        .header(LOCATION, location)
        .header(CONTENT_LENGTH, 0)
        .body(Full::new(Bytes::new()))
        .unwrap_or_else(|e| {
            log_build_error("301", &e);
            fallback(StatusCode::MOVED_PERMANENTLY)
        })
}

/// Build 304 Not Modified response
pub fn build_304_response(validators: &Validators) -> Response<Full<Bytes>> {
    Response::builder()
        .status(StatusCode::NOT_MODIFIED)
        .header(ETAG, &validators.etag)
        .header(LAST_MODIFIED, validators.last_modified_header())
        .body(Full::new(Bytes::new()))
        .unwrap_or_else(|e| {
            log_build_error("304", &e);
            fallback(StatusCode::NOT_MODIFIED)
        })
}

/// Build 200 response for a file.
///
/// `body` is empty for HEAD requests; `content_length` is still the file size.
pub fn build_file_response(
    body: Bytes,
    content_length: u64,
    content_type: &str,
    validators: &Validators,
) -> Response<Full<Bytes>> {
    Response::builder()
        .status(StatusCode::OK)
        .header(CONTENT_TYPE, content_type)
        .header(CONTENT_LENGTH, content_length)
        .header(LAST_MODIFIED, validators.last_modified_header())
        .header(ETAG, &validators.etag)
        .body(Full::new(body))
        .unwrap_or_else(|e| {
            log_build_error("200", &e);
            fallback(StatusCode::INTERNAL_SERVER_ERROR)
        })
}

/// Build generated HTML response (directory listings)
pub fn build_html_response(content: String, is_head: bool) -> Response<Full<Bytes>> {
    let content_length = content.len();
    let body = if is_head {
        Bytes::new()
    } else {
        Bytes::from(content)
    };

    Response::builder()
        .status(StatusCode::OK)
        .header(CONTENT_TYPE, LISTING_CONTENT_TYPE)
        .header(CONTENT_LENGTH, content_length)
        .body(Full::new(body))
        .unwrap_or_else(|e| {
            log_build_error("HTML", &e);
            fallback(StatusCode::INTERNAL_SERVER_ERROR)
        })
}

/// Serialize a complete response for writing straight to a socket.
///
/// Only used for responses produced before hyper owns the connection, so it
/// always announces `Connection: close` and adds a `Date` header.
pub async fn encode_response(response: Response<Full<Bytes>>) -> Vec<u8> {
    let (parts, body) = response.into_parts();
    let body = match body.collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(never) => match never {},
    };

    let mut head = format!(
        "HTTP/1.1 {} {}\r\n",
        parts.status.as_str(),
        parts.status.canonical_reason().unwrap_or("Unknown")
    );
    if !parts.headers.contains_key(DATE) {
        let _ = write!(
            head,
            "date: {}\r\n",
            cache::format_http_date(chrono::Utc::now())
        );
    }
    for (name, value) in &parts.headers {
        let _ = write!(head, "{}: ", name.as_str());
        head.push_str(&String::from_utf8_lossy(value.as_bytes()));
        head.push_str("\r\n");
    }
    head.push_str("connection: close\r\n\r\n");

    let mut wire = head.into_bytes();
    wire.extend_from_slice(&body);
    wire
}

/// Escape text for inclusion in HTML
pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#x27;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

fn fallback(status: StatusCode) -> Response<Full<Bytes>> {
    let mut response = Response::new(Full::new(Bytes::new()));
    *response.status_mut() = status;
    response
}

/// Log response build error
fn log_build_error(status: &str, error: &hyper::http::Error) {
    crate::logger::log_error(&format!("Failed to build {status} response: {error}"));
}
