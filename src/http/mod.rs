//! HTTP protocol layer module
//!
//! Protocol-level building blocks, decoupled from how files are looked up:
//! header injection, response builders, path mapping, MIME types and cache validators.

pub mod cache;
pub mod isolation;
pub mod mime;
pub mod path;
pub mod response;

// Re-export commonly used items
pub use isolation::{finalize_headers, ISOLATION_HEADERS};
pub use response::{
    build_304_response, build_error_response, build_file_response, build_html_response,
    build_redirect_response,
};
