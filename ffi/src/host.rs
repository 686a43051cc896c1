//! A `Transport` backed by the host platform's own HTTP stack.
//!
//! # Design
//! The host registers three callbacks in an `FfiHostTransport`. For every
//! attempt Rust calls `execute` with a borrowed `FfiHttpRequest` and an owned
//! `FfiHostCall` token. The host performs the request on its native stack
//! (with its own DNS, TLS and timeouts) and hands the token back through
//! `networking_host_call_complete` or `networking_host_call_fail`, from any
//! thread. Completion travels back to the waiting future over a oneshot
//! channel, so the host may also complete inline inside `execute`.
//!
//! If the waiting future is dropped first (the call was cancelled) Rust
//! invokes the host's `cancel` callback with the call id. The host must still
//! return the token; completing a cancelled call is a no-op.

use std::ffi::c_void;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use networking::{ConnectionPhase, HttpRequest, HttpResponse, NetworkError, Transport};
use tokio::sync::oneshot;

use crate::types::{c_string, FfiErrorCode, FfiHttpRequest};

/// Performs one request. The host owns `call` until it completes it.
pub type FfiHostExecute =
    extern "C" fn(context: *mut c_void, request: *const FfiHttpRequest, call: *mut FfiHostCall);

/// Asks the host to abandon the call with the given id.
pub type FfiHostCancel = extern "C" fn(context: *mut c_void, call_id: u64);

/// Releases `context` once the client no longer needs it.
pub type FfiHostRelease = extern "C" fn(context: *mut c_void);

/// Callbacks implementing HTTP on the host's native stack.
///
/// `context` is passed back verbatim to every callback and must be safe to
/// use from any thread. `cancel` and `release` may be null.
#[repr(C)]
pub struct FfiHostTransport {
    pub context: *mut c_void,
    pub execute: Option<FfiHostExecute>,
    pub cancel: Option<FfiHostCancel>,
    pub release: Option<FfiHostRelease>,
}

/// Token for one in-flight host request.
pub struct FfiHostCall {
    pub(crate) id: u64,
    pub(crate) url: String,
    pub(crate) sender: oneshot::Sender<Result<HttpResponse, NetworkError>>,
}

impl FfiHostCall {
    pub(crate) fn complete(self, result: Result<HttpResponse, NetworkError>) {
        if self.sender.send(result).is_err() {
            tracing::debug!(call_id = self.id, "host completed a call nobody is waiting for");
        }
    }
}

/// Map a host-reported failure onto `NetworkError`.
///
/// Hosts report `Connection` only when the connection could not be
/// established and nothing was sent; the facade retries those once. A
/// connection that broke after the request started going out must be
/// reported as `ConnectionLost`, which is never retried. Codes with no host
/// meaning are treated as `ConnectionLost`.
pub(crate) fn host_error(code: FfiErrorCode, message: String, url: &str) -> NetworkError {
    match code {
        FfiErrorCode::Connection => {
            NetworkError::connection(ConnectionPhase::Connect, message, None)
        }
        FfiErrorCode::Timeout => NetworkError::timeout(message, None),
        FfiErrorCode::Cancelled => NetworkError::Cancelled,
        FfiErrorCode::InvalidUrl => NetworkError::InvalidUrl {
            url: url.to_string(),
            message,
        },
        _ => NetworkError::connection(ConnectionPhase::Exchange, message, None),
    }
}

pub(crate) struct HostTransport {
    context: *mut c_void,
    execute: FfiHostExecute,
    cancel: Option<FfiHostCancel>,
    release: Option<FfiHostRelease>,
    next_id: AtomicU64,
}

// The host guarantees `context` may be used from any thread.
unsafe impl Send for HostTransport {}
unsafe impl Sync for HostTransport {}

impl HostTransport {
    /// `None` when the host left `execute` null.
    pub(crate) fn new(host: FfiHostTransport) -> Option<Self> {
        let execute = host.execute?;
        Some(Self {
            context: host.context,
            execute,
            cancel: host.cancel,
            release: host.release,
            next_id: AtomicU64::new(1),
        })
    }

    fn start(
        &self,
        id: u64,
        request: HttpRequest,
    ) -> oneshot::Receiver<Result<HttpResponse, NetworkError>> {
        let (sender, receiver) = oneshot::channel();
        let url = c_string(request.url.as_str());
        let call = Box::into_raw(Box::new(FfiHostCall {
            id,
            url: request.url,
            sender,
        }));

        let body = request.body.map(c_string);
        let content_type = request.content_type.map(c_string);
        let ffi_request = FfiHttpRequest {
            method: request.method.into(),
            url: url.as_ptr(),
            body: body.as_ref().map_or(std::ptr::null(), |b| b.as_ptr()),
            content_type: content_type.as_ref().map_or(std::ptr::null(), |c| c.as_ptr()),
        };
        (self.execute)(self.context, &ffi_request, call);
        receiver
    }
}

impl Drop for HostTransport {
    fn drop(&mut self) {
        if let Some(release) = self.release {
            release(self.context);
        }
    }
}

#[async_trait]
impl Transport for HostTransport {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, NetworkError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let receiver = self.start(id, request);

        let mut pending = PendingCall { transport: self, id, done: false };
        let outcome = receiver.await;
        pending.done = true;

        outcome.unwrap_or_else(|_| {
            Err(NetworkError::connection(
                ConnectionPhase::Exchange,
                "host transport dropped the call without completing it",
                None,
            ))
        })
    }
}

/// Notifies the host when an attempt is abandoned before it completes.
struct PendingCall<'a> {
    transport: &'a HostTransport,
    id: u64,
    done: bool,
}

impl Drop for PendingCall<'_> {
    fn drop(&mut self) {
        if self.done {
            return;
        }
        tracing::debug!(call_id = self.id, "cancelling host call");
        if let Some(cancel) = self.transport.cancel {
            cancel(self.transport.context, self.id);
        }
    }
}
