//! The `Networking` facade: `get` and `post` over a pluggable transport.
//!
//! # Design
//! `Networking` holds an `Arc<dyn Transport>` and the immutable config, so
//! cloning it is cheap and every clone shares one connection pool. Each call
//! builds an `HttpRequest`, lets the transport execute it (retrying once on a
//! transient connect failure), then maps non-2xx statuses to
//! `NetworkError::HttpStatus` and decodes the body as UTF-8 text.
//!
//! Dropping a `get`/`post` future cancels the call. `spawn_get` /
//! `spawn_post` run the call as a Tokio task and return a `Call` whose
//! `cancel` aborts it; awaiting a cancelled `Call` yields
//! `NetworkError::Cancelled`.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use reqwest::Url;
use tokio::task::{AbortHandle, JoinHandle};
use tracing::Instrument;
use uuid::Uuid;

use crate::config::NetworkingConfig;
use crate::dns::{FallbackResolver, HostResolver, PublicResolver, SystemResolver};
use crate::error::NetworkError;
use crate::http::{HttpRequest, HttpResponse};
use crate::transport::{ReqwestTransport, Transport};

/// Cross-platform HTTP client exposing `get` and `post`.
#[derive(Clone)]
pub struct Networking {
    transport: Arc<dyn Transport>,
    config: Arc<NetworkingConfig>,
}

impl Networking {
    /// Client with default timeouts (30 s), retry and DNS fallback.
    pub fn new() -> Result<Self, NetworkError> {
        Self::builder().build()
    }

    pub fn builder() -> NetworkingBuilder {
        NetworkingBuilder::default()
    }

    /// Client over an already-built transport.
    pub fn with_transport(transport: Arc<dyn Transport>, config: NetworkingConfig) -> Self {
        Self {
            transport,
            config: Arc::new(config),
        }
    }

    pub fn config(&self) -> &NetworkingConfig {
        &self.config
    }

    /// GET `url` and return the body as text.
    pub async fn get(&self, url: &str) -> Result<String, NetworkError> {
        self.send(HttpRequest::get(url)).await
    }

    /// POST `body` as JSON to `url` and return the response body as text.
    pub async fn post(&self, url: &str, body: &str) -> Result<String, NetworkError> {
        self.send(HttpRequest::post_json(url, body)).await
    }

    /// Run `get` as a task on the current Tokio runtime.
    ///
    /// # Panics
    /// When called outside a Tokio runtime.
    pub fn spawn_get(&self, url: impl Into<String>) -> Call {
        self.spawn(HttpRequest::get(url))
    }

    /// Run `post` as a task on the current Tokio runtime.
    ///
    /// # Panics
    /// When called outside a Tokio runtime.
    pub fn spawn_post(&self, url: impl Into<String>, body: impl Into<String>) -> Call {
        self.spawn(HttpRequest::post_json(url, body))
    }

    /// Execute `request` and return its body as text.
    pub async fn send(&self, request: HttpRequest) -> Result<String, NetworkError> {
        self.send_with_id(Uuid::new_v4(), request).await
    }

    fn spawn(&self, request: HttpRequest) -> Call {
        let id = Uuid::new_v4();
        let client = self.clone();
        let task = tokio::spawn(async move { client.send_with_id(id, request).await });
        Call {
            id,
            abort: task.abort_handle(),
            task,
        }
    }

    async fn send_with_id(&self, id: Uuid, request: HttpRequest) -> Result<String, NetworkError> {
        let span = tracing::debug_span!(
            "http_call",
            call_id = %id,
            method = request.method.as_str(),
            url = %request.url,
        );
        async move {
            validate_url(&request.url)?;
            let response = self.execute_with_retry(request).await?;
            check_status(&response)?;
            tracing::debug!(status = response.status, bytes = response.body.len(), "call finished");
            Ok(response.into_text())
        }
        .instrument(span)
        .await
    }

    async fn execute_with_retry(&self, request: HttpRequest) -> Result<HttpResponse, NetworkError> {
        if !self.config.retry_on_connection_failure {
            return self.transport.execute(request).await;
        }
        match self.transport.execute(request.clone()).await {
            Err(err) if err.is_transient() => {
                tracing::warn!(error = %err, "connection failed before sending, retrying once");
                self.transport.execute(request).await
            }
            other => other,
        }
    }
}

impl fmt::Debug for Networking {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Networking")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// Reject URLs the transport could never serve before doing any I/O.
fn validate_url(url: &str) -> Result<(), NetworkError> {
    let parsed = Url::parse(url).map_err(|e| NetworkError::InvalidUrl {
        url: url.to_string(),
        message: e.to_string(),
    })?;
    match parsed.scheme() {
        "http" | "https" => Ok(()),
        other => Err(NetworkError::InvalidUrl {
            url: url.to_string(),
            message: format!("unsupported scheme `{other}`"),
        }),
    }
}

/// Map non-2xx status codes to `NetworkError::HttpStatus`.
fn check_status(response: &HttpResponse) -> Result<(), NetworkError> {
    if response.is_success() {
        return Ok(());
    }
    Err(NetworkError::HttpStatus {
        status: response.status,
        reason: response.reason.clone(),
        body: response.text(),
    })
}

/// Builder selecting the transport and resolvers at startup.
#[derive(Default)]
pub struct NetworkingBuilder {
    config: NetworkingConfig,
    transport: Option<Arc<dyn Transport>>,
    primary_resolver: Option<Arc<dyn HostResolver>>,
    fallback_resolver: Option<Arc<dyn HostResolver>>,
}

impl NetworkingBuilder {
    pub fn config(mut self, config: NetworkingConfig) -> Self {
        self.config = config;
        self
    }

    /// Use `transport` instead of the built-in reqwest one. Resolver settings
    /// are ignored; the transport owns name resolution.
    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Replace the system resolver as the first resolution path.
    pub fn primary_resolver(mut self, resolver: Arc<dyn HostResolver>) -> Self {
        self.primary_resolver = Some(resolver);
        self
    }

    /// Replace the public resolver chosen by `config.dns_fallback`.
    pub fn fallback_resolver(mut self, resolver: Arc<dyn HostResolver>) -> Self {
        self.fallback_resolver = Some(resolver);
        self
    }

    pub fn build(self) -> Result<Networking, NetworkError> {
        if let Some(transport) = self.transport {
            return Ok(Networking::with_transport(transport, self.config));
        }

        let primary = self
            .primary_resolver
            .unwrap_or_else(|| Arc::new(SystemResolver));
        let fallback = self.fallback_resolver.or_else(|| {
            PublicResolver::for_fallback(self.config.dns_fallback)
                .map(|r| Arc::new(r) as Arc<dyn HostResolver>)
        });
        let resolver = Arc::new(FallbackResolver::new(primary, fallback));
        let transport = ReqwestTransport::new(&self.config, resolver)?;
        Ok(Networking::with_transport(Arc::new(transport), self.config))
    }
}

/// A spawned, cancellable call. Await it for the result.
#[must_use = "a Call does nothing useful unless awaited or cancelled"]
pub struct Call {
    id: Uuid,
    abort: AbortHandle,
    task: JoinHandle<Result<String, NetworkError>>,
}

impl Call {
    /// Identifier carried by this call's log records.
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Abort the call. Returns `true` if it was still running.
    pub fn cancel(&self) -> bool {
        self.cancel_handle().cancel()
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// A handle that can cancel this call from elsewhere.
    pub fn cancel_handle(&self) -> CancelHandle {
        CancelHandle {
            id: self.id,
            abort: self.abort.clone(),
        }
    }
}

impl Future for Call {
    type Output = Result<String, NetworkError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match Pin::new(&mut self.task).poll(cx) {
            Poll::Pending => Poll::Pending,
            Poll::Ready(Ok(result)) => Poll::Ready(result),
            Poll::Ready(Err(err)) if err.is_cancelled() => {
                Poll::Ready(Err(NetworkError::Cancelled))
            }
            Poll::Ready(Err(err)) => std::panic::resume_unwind(err.into_panic()),
        }
    }
}

impl fmt::Debug for Call {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Call")
            .field("id", &self.id)
            .field("finished", &self.task.is_finished())
            .finish()
    }
}

/// Cloneable cancellation handle for a `Call`.
#[derive(Debug, Clone)]
pub struct CancelHandle {
    id: Uuid,
    abort: AbortHandle,
}

impl CancelHandle {
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Abort the call. Returns `true` if it was still running.
    pub fn cancel(&self) -> bool {
        if self.abort.is_finished() {
            return false;
        }
        tracing::debug!(call_id = %self.id, "cancelling call");
        self.abort.abort();
        true
    }
}
