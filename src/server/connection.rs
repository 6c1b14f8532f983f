// Connection handling module
// Serves a single accepted TCP connection: preflight, then hyper

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use http_body_util::Full;
use hyper::body::{Body, Bytes, Incoming};
use hyper::header::{HeaderName, REFERER, USER_AGENT};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;

use super::preflight::{self, HeadOutcome, ReplayStream};
use crate::config::AppState;
use crate::handler;
use crate::http::{self, response::encode_response};
use crate::logger::{self, AccessLogEntry};

/// Handle a connection in its own task
pub fn spawn_connection(stream: TcpStream, peer_addr: SocketAddr, state: Arc<AppState>) {
    tokio::spawn(async move {
        handle_connection(stream, peer_addr, state).await;
    });
}

/// Read the request head ourselves; only well-formed requests reach hyper.
///
/// A connection carries a single request, so no head is ever parsed by hyper
/// without passing through the preflight first.
async fn handle_connection(mut stream: TcpStream, peer_addr: SocketAddr, state: Arc<AppState>) {
    let read_timeout = state.config.performance.read_timeout;
    let max_head_size = state.config.http.max_head_size;

    let head = tokio::time::timeout(
        Duration::from_secs(read_timeout),
        preflight::read_head(&mut stream, max_head_size),
    )
    .await;

    match head {
        Ok(Ok(HeadOutcome::Ready(prefix))) => {
            serve_http(ReplayStream::new(prefix, stream), peer_addr, state).await;
        }
        Ok(Ok(HeadOutcome::Rejected {
            status,
            message,
            request_line,
        })) => {
            let started = Instant::now();
            let mut entry = AccessLogEntry::new(peer_addr.to_string(), request_line);
            let body_bytes = reject(&mut stream, peer_addr, status, message, &state).await;
            if state.config.logging.access_log {
                entry.status = status.as_u16();
                entry.body_bytes = body_bytes;
                entry.request_time_us = elapsed_us(started);
                logger::log_access(&entry, &state.config.logging.access_log_format);
            }
        }
        // nothing to answer
        Ok(Ok(HeadOutcome::Closed)) => {}
        Ok(Err(e)) => logger::log_connection_error(&peer_addr, &e),
        Err(_) => logger::log_connection_timeout(&peer_addr, read_timeout),
    }
}

/// Write an error response for a refused head and close the connection.
///
/// Returns the body size that was sent.
async fn reject(
    stream: &mut TcpStream,
    peer_addr: SocketAddr,
    status: StatusCode,
    message: &str,
    state: &AppState,
) -> u64 {
    let mut response = http::build_error_response(status, Some(message), false);
    http::finalize_headers(response.headers_mut(), &state.config.http.server_name);
    let body_bytes = response.body().size_hint().exact().unwrap_or(0);
    let wire = encode_response(response).await;

    let write_timeout = state.config.performance.write_timeout;
    let write = async {
        stream.write_all(&wire).await?;
        stream.shutdown().await
    };
    match tokio::time::timeout(Duration::from_secs(write_timeout), write).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => logger::log_connection_error(&peer_addr, &e),
        Err(_) => logger::log_connection_timeout(&peer_addr, write_timeout),
    }

    body_bytes
}

/// Hand the connection to hyper; every response passes through `finalize_headers`.
async fn serve_http(io: ReplayStream<TcpStream>, peer_addr: SocketAddr, state: Arc<AppState>) {
    let performance = &state.config.performance;
    let timeout_secs = std::cmp::max(performance.read_timeout, performance.write_timeout);

    let mut builder = http1::Builder::new();
    builder.keep_alive(false);

    let service_state = Arc::clone(&state);
    let service = service_fn(move |req: Request<Incoming>| {
        let state = Arc::clone(&service_state);
        // GET and HEAD bodies are ignored, everything else is refused
        let req = req.map(|_| ());
        async move { Ok::<_, Infallible>(respond(&req, peer_addr, &state).await) }
    });

    let conn = builder.serve_connection(TokioIo::new(io), service);

    match tokio::time::timeout(Duration::from_secs(timeout_secs), conn).await {
        Ok(Ok(())) => {}
        Ok(Err(err)) => logger::log_connection_error(&peer_addr, &err),
        Err(_) => logger::log_connection_timeout(&peer_addr, timeout_secs),
    }
}

async fn respond(
    req: &Request<()>,
    peer_addr: SocketAddr,
    state: &AppState,
) -> Response<Full<Bytes>> {
    let started = Instant::now();

    let mut response = handler::handle_request(req, state).await;
    http::finalize_headers(response.headers_mut(), &state.config.http.server_name);

    if state.config.logging.access_log {
        let request_line = format!("{} {} {:?}", req.method(), req.uri(), req.version());
        let mut entry = AccessLogEntry::new(peer_addr.to_string(), request_line);
        entry.referer = header_string(req, REFERER);
        entry.user_agent = header_string(req, USER_AGENT);
        entry.status = response.status().as_u16();
        entry.body_bytes = response.body().size_hint().exact().unwrap_or(0);
        entry.request_time_us = elapsed_us(started);
        logger::log_access(&entry, &state.config.logging.access_log_format);
    }

    response
}

fn header_string<B>(req: &Request<B>, name: HeaderName) -> Option<String> {
    req.headers()
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

fn elapsed_us(started: Instant) -> u64 {
    u64::try_from(started.elapsed().as_micros()).unwrap_or(u64::MAX)
}
