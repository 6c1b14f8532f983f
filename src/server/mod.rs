// Server module entry point
// Binding, the accept loop, per-connection handling and signals

pub mod connection;
pub mod listener;
pub mod preflight;
pub mod signal;

// `loop` is a keyword, so the module is exposed as `server_loop`
#[path = "loop.rs"]
pub mod server_loop;

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;

pub use listener::bind_listener;

use crate::config::{AppState, Config};
use crate::error::ServerError;
use crate::logger;

/// A bound, not yet running, file server
#[derive(Debug)]
pub struct Server {
    listener: TcpListener,
    state: Arc<AppState>,
}

impl Server {
    /// Validate the configuration, resolve the document root and bind the socket.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn bind(config: Config) -> Result<Self, ServerError> {
        let addr = config.get_socket_addr()?;
        let state = AppState::new(config)?;
        let listener = bind_listener(addr)?;

        Ok(Self {
            listener,
            state: Arc::new(state),
        })
    }

    /// Address actually bound, useful when port 0 was requested
    pub fn local_addr(&self) -> Result<SocketAddr, ServerError> {
        Ok(self.listener.local_addr()?)
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    /// Serve until SIGINT or SIGTERM
    pub async fn run(self) -> Result<(), ServerError> {
        self.run_until(signal::shutdown_signal()).await
    }

    /// Serve until `shutdown` resolves with a reason to log
    pub async fn run_until<F>(self, shutdown: F) -> Result<(), ServerError>
    where
        F: Future<Output = &'static str>,
    {
        let reason = server_loop::run_accept_loop(self.listener, self.state, shutdown).await;
        logger::log_server_stop(reason);
        Ok(())
    }
}
