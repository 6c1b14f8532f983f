//! Request handler module
//!
//! Method checks and dispatch, then mapping the request onto the document root.

pub mod listing;
pub mod router;
pub mod static_files;

// Re-export main entry point
pub use router::handle_request;
