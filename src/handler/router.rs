//! Request dispatch module
//!
//! Entry point for HTTP request processing: method validation, then static file serving.

use crate::config::AppState;
use crate::handler::static_files;
use crate::http;
use crate::logger;
use http_body_util::Full;
use hyper::body::Bytes;
use hyper::header::{HeaderName, IF_MODIFIED_SINCE, IF_NONE_MATCH};
use hyper::{Method, Request, Response, StatusCode};

/// Request context encapsulating information needed for request processing
#[derive(Debug)]
pub struct RequestContext<'a> {
    /// Path component of the target, still percent-encoded
    pub path: &'a str,
    pub query: Option<&'a str>,
    pub is_head: bool,
    pub if_none_match: Option<&'a str>,
    pub if_modified_since: Option<&'a str>,
}

impl<'a> RequestContext<'a> {
    pub fn from_request<B>(req: &'a Request<B>) -> Self {
        let header = move |name: HeaderName| req.headers().get(name).and_then(|v| v.to_str().ok());
        Self {
            path: collapse_leading_slashes(req.uri().path()),
            query: req.uri().query(),
            is_head: req.method() == Method::HEAD,
            if_none_match: header(IF_NONE_MATCH),
            if_modified_since: header(IF_MODIFIED_SINCE),
        }
    }
}

/// `//host/x` would become a protocol-relative URL when echoed in a redirect
fn collapse_leading_slashes(path: &str) -> &str {
    let rest = path.trim_start_matches('/');
    if rest.len() + 1 < path.len() {
        &path[path.len() - rest.len() - 1..]
    } else {
        path
    }
}

/// Main entry point for HTTP request handling.
///
/// The body is never read; GET and HEAD ignore it and every other method is refused.
/// The returned response does not carry the isolation headers yet.
pub async fn handle_request<B>(req: &Request<B>, state: &AppState) -> Response<Full<Bytes>> {
    let method = req.method();
    let is_head = *method == Method::HEAD;

    if let Some(resp) = check_http_method(method) {
        return resp;
    }

    // `*` (OPTIONS) and authority-form (CONNECT) targets never get here with GET/HEAD,
    // but hyper still accepts them on the request line
    if !req.uri().path().starts_with('/') {
        return http::build_error_response(
            StatusCode::BAD_REQUEST,
            Some("Bad request target"),
            is_head,
        );
    }

    let ctx = RequestContext::from_request(req);
    static_files::serve(&ctx, state).await
}

/// Only GET and HEAD are served; everything else gets 501
fn check_http_method(method: &Method) -> Option<Response<Full<Bytes>>> {
    match *method {
        Method::GET | Method::HEAD => None,
        _ => {
            logger::log_warning(&format!("Unsupported method: {method}"));
            Some(http::build_error_response(
                StatusCode::NOT_IMPLEMENTED,
                Some(&format!("Unsupported method ('{method}')")),
                false,
            ))
        }
    }
}
