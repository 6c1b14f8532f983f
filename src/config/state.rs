// Application state module
// Immutable state shared by every connection task

use std::path::PathBuf;

use super::types::Config;
use crate::error::ServerError;

/// Application state
#[derive(Debug)]
pub struct AppState {
    pub config: Config,
    /// Canonical form of `config.server.document_root`
    pub document_root: PathBuf,
}

impl AppState {
    /// Resolve the document root and build the shared state.
    ///
    /// Fails when the root does not exist or is not a directory.
    pub fn new(config: Config) -> Result<Self, ServerError> {
        let configured = PathBuf::from(&config.server.document_root);
        let document_root =
            configured
                .canonicalize()
                .map_err(|source| ServerError::DocumentRoot {
                    path: configured.clone(),
                    source,
                })?;

        if !document_root.is_dir() {
            return Err(ServerError::DocumentRoot {
                path: configured,
                source: std::io::Error::new(std::io::ErrorKind::InvalidInput, "not a directory"),
            });
        }

        Ok(Self {
            config,
            document_root,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    #[test]
    fn test_document_root_is_canonicalized() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.server.document_root = dir.path().join(".").display().to_string();

        let state = AppState::new(config).unwrap();
        assert_eq!(state.document_root, dir.path().canonicalize().unwrap());
    }

    #[test]
    fn test_missing_document_root() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.server.document_root = dir.path().join("nope").display().to_string();

        let err = AppState::new(config).unwrap_err();
        assert!(matches!(err, ServerError::DocumentRoot { .. }));
    }

    #[test]
    fn test_file_as_document_root() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("plain.txt");
        std::fs::write(&file, b"x").unwrap();
        let mut config = Config::default();
        config.server.document_root = file.display().to_string();

        assert!(AppState::new(config).is_err());
    }
}
