// Configuration types module
// Defines all configuration-related data structures

use serde::{Deserialize, Serialize};

/// Main configuration structure
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub logging: LoggingConfig,
    pub http: HttpConfig,
    pub performance: PerformanceConfig,
}

/// Listener and document root
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub document_root: String,
    pub workers: Option<usize>,
}

/// Logging configuration
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct LoggingConfig {
    pub level: String,
    pub access_log: bool,
    /// Access log format (common, combined or json)
    #[serde(default = "default_access_log_format")]
    pub access_log_format: String,
}

#[allow(clippy::missing_const_for_fn)]
fn default_access_log_format() -> String {
    "common".to_string()
}

/// Value of the `Server` response header unless configured
pub fn default_server_name() -> String {
    format!("coi-serve/{}", env!("CARGO_PKG_VERSION"))
}

/// HTTP behaviour of the file server
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct HttpConfig {
    pub server_name: String,
    /// Files tried, in order, when a directory is requested
    pub index_files: Vec<String>,
    /// Render an HTML listing for directories without an index file
    pub directory_listing: bool,
    /// Upper bound for the request line plus headers, in bytes
    pub max_head_size: usize,
}

/// Connection handling. Each connection carries exactly one request.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct PerformanceConfig {
    pub read_timeout: u64,
    pub write_timeout: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 8000,
                document_root: ".".to_string(),
                workers: None,
            },
            logging: LoggingConfig {
                level: "info".to_string(),
                access_log: true,
                access_log_format: default_access_log_format(),
            },
            http: HttpConfig {
                server_name: default_server_name(),
                index_files: vec!["index.html".to_string(), "index.htm".to_string()],
                directory_listing: true,
                max_head_size: 64 * 1024,
            },
            performance: PerformanceConfig {
                read_timeout: 30,
                write_timeout: 30,
            },
        }
    }
}
