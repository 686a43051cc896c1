//! Asynchronous two-method HTTP client: `get(url)` and `post(url, body)`.
//!
//! # Overview
//! `Networking` is a facade over a pluggable `Transport`. Callers see the
//! same contract whatever stack sits underneath: the response body as UTF-8
//! text on 2xx, a typed `NetworkError` otherwise.
//!
//! # Design
//! - The default transport is a pooled `reqwest` client whose DNS lookups go
//!   through `FallbackResolver` (system resolver, then a public one).
//! - Native hosts can supply their own stack through the FFI crate; it only
//!   has to implement `Transport`.
//! - Connect/read/write timeouts default to 30 s and are fixed at build time.
//! - A connection that fails before any byte is sent is retried once.
//! - Calls are cancelled by dropping their future or via `Call::cancel`.
//! - The client is `Clone + Send + Sync`; share one instance across tasks.

pub mod client;
pub mod config;
pub mod dns;
pub mod error;
pub mod http;
pub mod transport;

pub use client::{Call, CancelHandle, Networking, NetworkingBuilder};
pub use config::{ConfigError, DnsFallback, NetworkingConfig};
pub use dns::{FallbackResolver, HostResolver, PublicResolver, ResolveError, SystemResolver};
pub use error::{BoxError, ConnectionPhase, NetworkError};
pub use http::{HttpMethod, HttpRequest, HttpResponse, JSON_CONTENT_TYPE};
pub use transport::{ReqwestTransport, Transport};

