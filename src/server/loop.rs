// Server loop module
// Accepts connections until the shutdown future resolves

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;

use super::connection::spawn_connection;
use crate::config::AppState;
use crate::logger;

/// Pause after a failed accept (e.g. out of file descriptors) before retrying
const ACCEPT_BACKOFF: Duration = Duration::from_millis(50);

/// Run the accept loop; returns the shutdown reason once `shutdown` resolves.
///
/// Connections already handed to their tasks keep running.
pub async fn run_accept_loop<F>(
    listener: TcpListener,
    state: Arc<AppState>,
    shutdown: F,
) -> &'static str
where
    F: Future<Output = &'static str>,
{
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            accept_result = listener.accept() => {
                match accept_result {
                    Ok((stream, peer_addr)) => {
                        spawn_connection(stream, peer_addr, Arc::clone(&state));
                    }
                    Err(e) => {
                        logger::log_error(&format!("Failed to accept connection: {e}"));
                        tokio::time::sleep(ACCEPT_BACKOFF).await;
                    }
                }
            }

            reason = &mut shutdown => return reason,
        }
    }
}
