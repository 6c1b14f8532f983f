use std::process::ExitCode;

use clap::Parser;

use coi_serve::config::{Cli, Config};
use coi_serve::error::ServerError;
use coi_serve::logger;
use coi_serve::server::Server;

fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            if let Some(hint) = e.hint() {
                eprintln!("hint: {hint}");
            }
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<(), ServerError> {
    let mut cfg = Config::load_from(&cli.config)?;
    cli.apply(&mut cfg);

    if cli.print_config {
        let rendered = cfg
            .to_toml()
            .map_err(|e| ServerError::Io(std::io::Error::other(e)))?;
        print!("{rendered}");
        return Ok(());
    }

    logger::init(&cfg.logging)?;

    // Size the Tokio runtime from the `workers` setting
    let mut runtime_builder = tokio::runtime::Builder::new_multi_thread();
    runtime_builder.enable_all();
    if let Some(workers) = cfg.server.workers.filter(|&n| n > 0) {
        runtime_builder.worker_threads(workers);
    }
    let runtime = runtime_builder.build()?;

    runtime.block_on(async_main(cfg))
}

async fn async_main(cfg: Config) -> Result<(), ServerError> {
    let server = Server::bind(cfg)?;
    let addr = server.local_addr()?;
    logger::log_server_start(&addr, &server.state().config, &server.state().document_root);

    server.run().await
}
