// Command line interface
// Flags override values loaded from the config file and environment

use clap::Parser;

use super::types::Config;

#[derive(Debug, Parser)]
#[command(
    name = "coi-serve",
    version,
    about = "Serve a directory over HTTP with cross-origin isolation headers"
)]
pub struct Cli {
    /// Config file name, with or without extension
    #[arg(short, long, default_value = "coi-serve")]
    pub config: String,

    /// Address to listen on
    #[arg(short, long, value_name = "HOST")]
    pub bind: Option<String>,

    /// Port to listen on
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Directory to serve
    #[arg(short, long, value_name = "DIR")]
    pub directory: Option<String>,

    /// Print the effective configuration as TOML and exit
    #[arg(long)]
    pub print_config: bool,
}

impl Cli {
    pub fn apply(&self, config: &mut Config) {
        if let Some(host) = &self.bind {
            config.server.host.clone_from(host);
        }
        if let Some(port) = self.port {
            config.server.port = port;
        }
        if let Some(dir) = &self.directory {
            config.server.document_root.clone_from(dir);
        }
    }
}
