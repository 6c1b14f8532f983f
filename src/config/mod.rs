// Configuration module entry point
// Loads configuration, applies command line overrides, holds shared state

mod cli;
mod state;
mod types;

use std::net::SocketAddr;

pub use cli::Cli;
pub use state::AppState;
pub use types::{
    default_server_name, Config, HttpConfig, LoggingConfig, PerformanceConfig, ServerConfig,
};

use crate::error::ServerError;

impl Config {
    /// Load configuration from specified file path (extension optional).
    ///
    /// Sources, lowest priority first: built-in defaults, the file (if present),
    /// `COI_`-prefixed environment variables such as `COI_SERVER__PORT`.
    pub fn load_from(config_path: &str) -> Result<Self, config::ConfigError> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(config_path).required(false))
            .add_source(
                config::Environment::with_prefix("COI")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 8000)?
            .set_default("server.document_root", ".")?
            .set_default("logging.level", "info")?
            .set_default("logging.access_log", true)?
            .set_default("logging.access_log_format", "common")?
            .set_default("http.server_name", default_server_name())?
            .set_default("http.index_files", vec!["index.html", "index.htm"])?
            .set_default("http.directory_listing", true)?
            .set_default("http.max_head_size", 65_536)?
            .set_default("performance.read_timeout", 30)?
            .set_default("performance.write_timeout", 30)?
            .build()?;

        settings.try_deserialize()
    }

    pub fn get_socket_addr(&self) -> Result<SocketAddr, ServerError> {
        let addr = format!("{}:{}", self.server.host, self.server.port);
        addr.parse()
            .map_err(|source| ServerError::InvalidAddress { addr, source })
    }

    /// Render as TOML, the same shape `load_from` reads
    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }
}
