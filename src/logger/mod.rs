//! Logger module
//!
//! Provides logging utilities for the file server including:
//! - Subscriber setup (level from config, `RUST_LOG` wins when set)
//! - Server lifecycle logging
//! - Access logging in several formats

mod format;

pub use format::AccessLogEntry;

use crate::config::{Config, LoggingConfig};
use crate::error::ServerError;
use std::net::SocketAddr;
use tracing_subscriber::EnvFilter;

/// Target used for access log lines, filterable with `RUST_LOG=access=off`
pub const ACCESS_TARGET: &str = "access";

/// Install the global tracing subscriber.
///
/// Should be called once at application startup.
pub fn init(config: &LoggingConfig) -> Result<(), ServerError> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))
        .map_err(|e| ServerError::Logger(format!("invalid log level '{}': {e}", config.level)))?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init()
        .map_err(|e| ServerError::Logger(e.to_string()))
}

pub fn log_server_start(addr: &SocketAddr, config: &Config, document_root: &std::path::Path) {
    tracing::info!("Serving HTTP on {addr} (http://{addr}/)");
    tracing::info!("Document root: {}", document_root.display());
    tracing::info!("Cross-origin isolation headers enabled on every response");
    if let Some(workers) = config.server.workers {
        tracing::info!("Worker threads: {workers}");
    }
    tracing::debug!(
        read_timeout = config.performance.read_timeout,
        directory_listing = config.http.directory_listing,
        "connection settings"
    );
}

pub fn log_server_stop(reason: &str) {
    tracing::info!("{reason}, shutting down");
}

pub fn log_connection_error(peer_addr: &SocketAddr, err: &impl std::fmt::Display) {
    tracing::debug!("connection from {peer_addr} ended with error: {err}");
}

pub fn log_connection_timeout(peer_addr: &SocketAddr, secs: u64) {
    tracing::warn!("connection from {peer_addr} timed out after {secs}s");
}

pub fn log_error(message: &str) {
    tracing::error!("{message}");
}

pub fn log_warning(message: &str) {
    tracing::warn!("{message}");
}

/// Log formatted access log entry
pub fn log_access(entry: &AccessLogEntry, format: &str) {
    tracing::info!(target: ACCESS_TARGET, "{}", entry.format(format));
}
