// Request head preflight
// Reads the first request head off the socket before hyper sees the connection,
// so malformed requests still get an error response built by this server.

use hyper::body::Bytes;
use hyper::StatusCode;
use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, ReadBuf};

/// Same header limit hyper applies
const MAX_HEADERS: usize = 100;

const READ_CHUNK: usize = 4096;

/// Result of reading the first request head
#[derive(Debug)]
pub enum HeadOutcome {
    /// Everything read so far; starts with a complete, acceptable head
    Ready(Bytes),
    /// The head was read far enough to know it must be refused
    Rejected {
        status: StatusCode,
        message: &'static str,
        /// First line as received, for the access log
        request_line: String,
    },
    /// Peer closed before sending a complete head
    Closed,
}

#[derive(Debug, PartialEq, Eq)]
enum Inspection {
    Complete(usize),
    Partial,
    Invalid(StatusCode, &'static str),
}

/// Read from `stream` until a full request head is buffered, then check it.
///
/// # Errors
///
/// Only socket read errors are returned; protocol problems become
/// [`HeadOutcome::Rejected`].
pub async fn read_head<S>(stream: &mut S, max_head_size: usize) -> io::Result<HeadOutcome>
where
    S: AsyncRead + Unpin,
{
    let mut buf = Vec::with_capacity(READ_CHUNK.min(max_head_size.max(1)));
    let mut chunk = [0u8; READ_CHUNK];

    loop {
        let n = stream.read(&mut chunk).await?;
        if n == 0 {
            return Ok(HeadOutcome::Closed);
        }
        buf.extend_from_slice(&chunk[..n]);

        let verdict = match inspect(&buf) {
            Inspection::Complete(head_len) if head_len > max_head_size => head_too_large(),
            Inspection::Partial if buf.len() > max_head_size => head_too_large(),
            other => other,
        };

        match verdict {
            Inspection::Complete(_) => return Ok(HeadOutcome::Ready(Bytes::from(buf))),
            Inspection::Partial => {}
            Inspection::Invalid(status, message) => {
                return Ok(HeadOutcome::Rejected {
                    status,
                    message,
                    request_line: first_line(&buf, max_head_size),
                });
            }
        }
    }
}

/// Parse what has been buffered so far and apply the checks hyper would
/// otherwise answer with its own bare 400.
fn inspect(buf: &[u8]) -> Inspection {
    let mut headers = [httparse::EMPTY_HEADER; MAX_HEADERS];
    let mut req = httparse::Request::new(&mut headers);

    let head_len = match req.parse(buf) {
        Ok(httparse::Status::Complete(len)) => len,
        Ok(httparse::Status::Partial) => return Inspection::Partial,
        Err(httparse::Error::TooManyHeaders) => {
            return Inspection::Invalid(
                StatusCode::REQUEST_HEADER_FIELDS_TOO_LARGE,
                "Too many headers",
            );
        }
        Err(httparse::Error::Version) if names_a_version(buf) => {
            return Inspection::Invalid(
                StatusCode::HTTP_VERSION_NOT_SUPPORTED,
                "Invalid HTTP version",
            );
        }
        Err(_) => return Inspection::Invalid(StatusCode::BAD_REQUEST, "Bad request syntax"),
    };

    let target_ok = req
        .path
        .is_some_and(|target| target.parse::<hyper::Uri>().is_ok());
    if !target_ok {
        return Inspection::Invalid(StatusCode::BAD_REQUEST, "Bad request target");
    }

    if !framing_ok(req.version.unwrap_or(1), req.headers) {
        return Inspection::Invalid(StatusCode::BAD_REQUEST, "Bad request body framing");
    }

    Inspection::Complete(head_len)
}

const fn head_too_large() -> Inspection {
    Inspection::Invalid(
        StatusCode::REQUEST_HEADER_FIELDS_TOO_LARGE,
        "Request header too large",
    )
}

/// A version token is present but it is not HTTP/1.0 or HTTP/1.1
fn names_a_version(buf: &[u8]) -> bool {
    let line = buf.split(|&b| b == b'\n').next().unwrap_or_default();
    line.split(|&b| b == b' ')
        .filter(|word| !word.is_empty())
        .nth(2)
        .is_some_and(|word| word.starts_with(b"HTTP/"))
}

/// Content-Length values must be numeric and agree; Transfer-Encoding needs
/// HTTP/1.1 and must end in `chunked`.
fn framing_ok(minor_version: u8, headers: &[httparse::Header<'_>]) -> bool {
    let mut content_length: Option<u64> = None;
    let mut last_coding: Option<String> = None;

    for header in headers {
        if header.name.eq_ignore_ascii_case("content-length") {
            let Ok(value) = std::str::from_utf8(header.value) else {
                return false;
            };
            for part in value.split(',') {
                let part = part.trim();
                if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
                    return false;
                }
                let Ok(len) = part.parse::<u64>() else {
                    return false;
                };
                if content_length.is_some_and(|seen| seen != len) {
                    return false;
                }
                content_length = Some(len);
            }
        } else if header.name.eq_ignore_ascii_case("transfer-encoding") {
            if minor_version == 0 {
                return false;
            }
            let Ok(value) = std::str::from_utf8(header.value) else {
                return false;
            };
            if let Some(coding) = value.rsplit(',').next() {
                last_coding = Some(coding.trim().to_ascii_lowercase());
            }
        }
    }

    last_coding.map_or(true, |coding| coding == "chunked")
}

fn first_line(buf: &[u8], limit: usize) -> String {
    let end = buf
        .iter()
        .position(|&b| b == b'\r' || b == b'\n')
        .unwrap_or(buf.len())
        .min(limit);
    String::from_utf8_lossy(&buf[..end]).into_owned()
}

/// Stream that yields already-consumed bytes before reading from the socket again
#[derive(Debug)]
pub struct ReplayStream<S> {
    prefix: Bytes,
    inner: S,
}

impl<S> ReplayStream<S> {
    pub const fn new(prefix: Bytes, inner: S) -> Self {
        Self { prefix, inner }
    }
}

impl<S: AsyncRead + Unpin> AsyncRead for ReplayStream<S> {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        if !self.prefix.is_empty() {
            let n = self.prefix.len().min(buf.remaining());
            let replayed = self.prefix.split_to(n);
            buf.put_slice(&replayed);
            return Poll::Ready(Ok(()));
        }
        Pin::new(&mut self.inner).poll_read(cx, buf)
    }
}

impl<S: AsyncWrite + Unpin> AsyncWrite for ReplayStream<S> {
    fn poll_write(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        Pin::new(&mut self.inner).poll_write(cx, buf)
    }

    fn poll_write_vectored(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        bufs: &[io::IoSlice<'_>],
    ) -> Poll<io::Result<usize>> {
        Pin::new(&mut self.inner).poll_write_vectored(cx, bufs)
    }

    fn is_write_vectored(&self) -> bool {
        self.inner.is_write_vectored()
    }

    fn poll_flush(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.inner).poll_flush(cx)
    }

    fn poll_shutdown(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.inner).poll_shutdown(cx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncWriteExt;

    async fn outcome_for(raw: &[u8], max_head_size: usize) -> HeadOutcome {
        let (mut client, mut server) = tokio::io::duplex(64 * 1024);
        client.write_all(raw).await.unwrap();
        drop(client);
        read_head(&mut server, max_head_size).await.unwrap()
    }

    fn rejected_status(outcome: &HeadOutcome) -> Option<StatusCode> {
        match outcome {
            HeadOutcome::Rejected { status, .. } => Some(*status),
            _ => None,
        }
    }

    #[tokio::test]
    async fn test_complete_head_is_ready_with_all_bytes() {
        let raw = b"GET /index.html HTTP/1.1\r\nHost: localhost\r\n\r\nextra";
        match outcome_for(raw, 1024).await {
            HeadOutcome::Ready(bytes) => assert_eq!(bytes.as_ref(), raw.as_slice()),
            other => panic!("expected ready, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_garbage_is_400() {
        let outcome = outcome_for(b"\x01\x02 nonsense\r\n\r\n", 1024).await;
        assert_eq!(rejected_status(&outcome), Some(StatusCode::BAD_REQUEST));
    }

    #[tokio::test]
    async fn test_http2_request_line_is_505() {
        let outcome = outcome_for(b"GET / HTTP/2.0\r\nHost: x\r\n\r\n", 1024).await;
        assert_eq!(
            rejected_status(&outcome),
            Some(StatusCode::HTTP_VERSION_NOT_SUPPORTED)
        );
        match outcome {
            HeadOutcome::Rejected { request_line, .. } => {
                assert_eq!(request_line, "GET / HTTP/2.0");
            }
            other => panic!("expected rejection, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_missing_version_is_400() {
        let outcome = outcome_for(b"GET /\r\n\r\n", 1024).await;
        assert_eq!(rejected_status(&outcome), Some(StatusCode::BAD_REQUEST));
    }

    #[tokio::test]
    async fn test_oversized_head_is_431() {
        let mut raw = b"GET / HTTP/1.1\r\nX-Pad: ".to_vec();
        raw.extend(std::iter::repeat(b'a').take(512));
        let outcome = outcome_for(&raw, 128).await;
        assert_eq!(
            rejected_status(&outcome),
            Some(StatusCode::REQUEST_HEADER_FIELDS_TOO_LARGE)
        );
    }

    #[tokio::test]
    async fn test_too_many_headers_is_431() {
        let mut raw = b"GET / HTTP/1.1\r\n".to_vec();
        for i in 0..=MAX_HEADERS {
            raw.extend_from_slice(format!("X-H{i}: v\r\n").as_bytes());
        }
        raw.extend_from_slice(b"\r\n");
        let outcome = outcome_for(&raw, 64 * 1024).await;
        assert_eq!(
            rejected_status(&outcome),
            Some(StatusCode::REQUEST_HEADER_FIELDS_TOO_LARGE)
        );
    }

    #[tokio::test]
    async fn test_bad_content_length_is_400() {
        let outcome =
            outcome_for(b"GET / HTTP/1.1\r\nContent-Length: abc\r\n\r\n", 1024).await;
        assert_eq!(rejected_status(&outcome), Some(StatusCode::BAD_REQUEST));

        let outcome = outcome_for(
            b"GET / HTTP/1.1\r\nContent-Length: 1\r\nContent-Length: 2\r\n\r\n",
            1024,
        )
        .await;
        assert_eq!(rejected_status(&outcome), Some(StatusCode::BAD_REQUEST));
    }

    #[tokio::test]
    async fn test_chunked_on_http10_is_400() {
        let outcome = outcome_for(
            b"GET / HTTP/1.0\r\nTransfer-Encoding: chunked\r\n\r\n",
            1024,
        )
        .await;
        assert_eq!(rejected_status(&outcome), Some(StatusCode::BAD_REQUEST));
    }

    #[tokio::test]
    async fn test_eof_before_head_is_closed() {
        assert!(matches!(outcome_for(b"", 1024).await, HeadOutcome::Closed));
        assert!(matches!(
            outcome_for(b"GET / HTTP/1.1\r\nHost", 1024).await,
            HeadOutcome::Closed
        ));
    }

    #[tokio::test]
    async fn test_replay_stream_reads_prefix_first() {
        let (mut client, server) = tokio::io::duplex(1024);
        client.write_all(b" world").await.unwrap();
        drop(client);

        let mut replay = ReplayStream::new(Bytes::from_static(b"hello"), server);
        let mut out = String::new();
        replay.read_to_string(&mut out).await.unwrap();
        assert_eq!(out, "hello world");
    }

    #[tokio::test]
    async fn test_replay_stream_writes_through() {
        let (mut client, server) = tokio::io::duplex(1024);
        let mut replay = ReplayStream::new(Bytes::new(), server);
        replay.write_all(b"pong").await.unwrap();
        replay.shutdown().await.unwrap();

        let mut out = Vec::new();
        client.read_to_end(&mut out).await.unwrap();
        assert_eq!(out, b"pong");
    }
}
