//! Static file server that marks every response as cross-origin isolated.
//!
//! Each response, error pages included, carries
//! `Cross-Origin-Opener-Policy: same-origin` and
//! `Cross-Origin-Embedder-Policy: require-corp`, which browsers require before
//! exposing `SharedArrayBuffer` to WebAssembly threads.

pub mod config;
pub mod error;
pub mod handler;
pub mod http;
pub mod logger;
pub mod server;
