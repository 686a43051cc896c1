//! The seam between the facade and an HTTP stack.
//!
//! # Design
//! A `Transport` executes exactly one attempt of one request and returns the
//! response for *any* status code. Retry, status interpretation and body
//! decoding live in the facade so every transport behaves the same way.
//!
//! Cancellation is drop-based: when the future returned by `execute` is
//! dropped, the transport must abort the in-flight operation. `reqwest`
//! does this by closing the connection instead of returning it to the pool,
//! so the shared client stays usable for other calls.

use std::error::Error as StdError;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;

use crate::config::NetworkingConfig;
use crate::dns::{HostResolver, ReqwestResolver, ResolveError};
use crate::error::{ConnectionPhase, NetworkError};
use crate::http::{HttpMethod, HttpRequest, HttpResponse};

/// Executes a single HTTP attempt.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Transport: Send + Sync {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, NetworkError>;
}

/// Default transport: a pooled `reqwest::Client` with rustls.
#[derive(Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new(
        config: &NetworkingConfig,
        resolver: Arc<dyn HostResolver>,
    ) -> Result<Self, NetworkError> {
        let client = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout)
            .read_timeout(config.read_timeout)
            .timeout(config.attempt_deadline())
            .dns_resolver(Arc::new(ReqwestResolver(resolver)))
            .build()
            .map_err(|e| NetworkError::Client {
                message: "could not build HTTP client".to_string(),
                cause: Some(Box::new(e)),
            })?;
        Ok(Self { client })
    }
}

impl fmt::Debug for ReqwestTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReqwestTransport").finish_non_exhaustive()
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, NetworkError> {
        let method = match request.method {
            HttpMethod::Get => reqwest::Method::GET,
            HttpMethod::Post => reqwest::Method::POST,
        };
        let mut builder = self.client.request(method, request.url.as_str());
        if let Some(content_type) = request.content_type {
            builder = builder.header(CONTENT_TYPE, content_type);
        }
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let response = builder.send().await.map_err(classify)?;
        let status = response.status();
        let body = response.bytes().await.map_err(classify)?;

        Ok(HttpResponse {
            status: status.as_u16(),
            reason: status.canonical_reason().unwrap_or_default().to_string(),
            body: body.to_vec(),
        })
    }
}

/// Map a reqwest failure onto the facade's error taxonomy.
pub(crate) fn classify(err: reqwest::Error) -> NetworkError {
    if err.is_timeout() {
        let message = err.to_string();
        return NetworkError::timeout(message, Some(Box::new(err)));
    }
    if err.is_connect() {
        let (phase, message) = match find_cause::<ResolveError>(&err) {
            Some(resolve) => (ConnectionPhase::Resolve, resolve.to_string()),
            None => (ConnectionPhase::Connect, describe(&err)),
        };
        return NetworkError::connection(phase, message, Some(Box::new(err)));
    }
    if err.is_builder() {
        return NetworkError::InvalidUrl {
            url: err.url().map(|u| u.to_string()).unwrap_or_default(),
            message: describe(&err),
        };
    }
    let message = describe(&err);
    NetworkError::connection(ConnectionPhase::Exchange, message, Some(Box::new(err)))
}

/// Walk the source chain looking for an error of type `T`.
fn find_cause<'a, T: StdError + 'static>(err: &'a (dyn StdError + 'static)) -> Option<&'a T> {
    let mut current = Some(err);
    while let Some(e) = current {
        if let Some(found) = e.downcast_ref::<T>() {
            return Some(found);
        }
        current = e.source();
    }
    None
}

/// The error's message followed by its innermost cause, which is usually
/// the most specific part ("Connection refused (os error 111)").
fn describe(err: &(dyn StdError + 'static)) -> String {
    let mut innermost = err;
    while let Some(next) = innermost.source() {
        innermost = next;
    }
    if err.source().is_none() {
        err.to_string()
    } else {
        format!("{err}: {innermost}")
    }
}
