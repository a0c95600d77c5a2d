//! Pluggable HTTP POST transport for the Reader API.
//!
//! # Overview
//! One blocking "POST to the API server" operation, fulfilled by one of three
//! interchangeable backends chosen when the transport is built:
//!
//! - `sockets`: hand-built HTTP/1.1 over `std::net::TcpStream` (default),
//! - `streams`: a reusable `ureq` agent (cargo feature `streams`),
//! - `curl`: libcurl through the `curl` crate (cargo feature `curl`).
//!
//! # Design
//! - `Transport::post` returns only the response payload; status lines and
//!   headers never reach the caller, and bodies are never interpreted.
//! - Two failure kinds: `Configuration` at build time, `Communication` per
//!   call. Nothing retries or falls back to another backend.
//! - Handles are opened inside `post` and released before it returns, and
//!   again on drop.
//! - `ReaderClient` is the thin API layer on top: it builds form bodies,
//!   calls `post`, and reads tokens out of the replies.

pub mod client;
pub mod config;
pub mod error;
pub mod http;
pub mod transport;
pub mod types;

pub use client::ReaderClient;
pub use config::{Backend, TransportConfig};
pub use error::{ApiError, TransportError};
pub use transport::{factory, SocketTransport, Transport};
pub use types::{AuthTokens, Credentials};

#[cfg(feature = "streams")]
pub use transport::StreamTransport;

#[cfg(feature = "curl")]
pub use transport::CurlTransport;
