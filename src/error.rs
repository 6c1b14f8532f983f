//! Startup error types
//!
//! Everything here is fatal: `main` reports it on stderr and exits non-zero.
//! Per-request failures never surface as `ServerError`, they become HTTP responses.

use std::net::SocketAddr;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("invalid listen address '{addr}': {source}")]
    InvalidAddress {
        addr: String,
        source: std::net::AddrParseError,
    },

    #[error("document root '{}' is not a readable directory: {source}", path.display())]
    DocumentRoot {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        source: std::io::Error,
    },

    #[error("failed to initialise logging: {0}")]
    Logger(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl ServerError {
    /// Hint printed after a bind failure
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            Self::Bind { source, .. } => match source.kind() {
                std::io::ErrorKind::AddrInUse => {
                    Some("another process is already listening on this port; pick one with --port")
                }
                std::io::ErrorKind::PermissionDenied => {
                    Some("ports below 1024 usually need elevated privileges; try --port 8000")
                }
                _ => None,
            },
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn test_bind_error_hints() {
        let addr: SocketAddr = "0.0.0.0:80".parse().unwrap();
        let denied = ServerError::Bind {
            addr,
            source: io::Error::from(io::ErrorKind::PermissionDenied),
        };
        assert!(denied.hint().unwrap().contains("--port"));
        assert!(denied.to_string().contains("0.0.0.0:80"));

        let in_use = ServerError::Bind {
            addr,
            source: io::Error::from(io::ErrorKind::AddrInUse),
        };
        assert!(in_use.hint().unwrap().contains("already listening"));
    }

    #[test]
    fn test_other_errors_have_no_hint() {
        let err = ServerError::Logger("boom".to_string());
        assert!(err.hint().is_none());
    }
}
