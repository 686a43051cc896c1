//! C-ABI wrapper around `networking`.
//!
//! # Overview
//! Exposes `get` and `post` through `extern "C"` functions so any language
//! with a C FFI can use the client without touching Rust's async runtime.
//! Calls come in two forms: blocking (`networking_get`) and asynchronous
//! with a completion callback and a cancellable handle
//! (`networking_get_async`). Hosts that prefer their platform HTTP stack
//! plug it in with `networking_new_with_host`.
//!
//! # Design
//! - Every `extern "C"` function wraps its body in `catch_unwind` so panics
//!   never cross the FFI boundary.
//! - Each client owns a multi-threaded Tokio runtime that drives its calls.
//! - A single `FfiNetworkingResult` envelope conveys bodies and errors
//!   uniformly.
//! - The C caller owns all returned pointers and must call the matching
//!   `networking_*free*` function to release them.

pub mod host;
pub mod types;

use std::ffi::{c_void, CString};
use std::os::raw::c_char;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use networking::{HttpResponse, Networking, NetworkingConfig};
use tokio::runtime::Runtime;

use host::{host_error, FfiHostCall, FfiHostTransport, HostTransport};
use types::*;

// ---------------------------------------------------------------------------
// Client lifecycle
// ---------------------------------------------------------------------------

fn runtime() -> Option<Runtime> {
    tokio::runtime::Builder::new_multi_thread()
        .thread_name("networking")
        .enable_all()
        .build()
        .map_err(|e| tracing::error!(error = %e, "could not start networking runtime"))
        .ok()
}

/// Parse an optional JSON config. Null means defaults.
fn config_from_json(json: *const c_char) -> Option<NetworkingConfig> {
    if json.is_null() {
        return Some(NetworkingConfig::default());
    }
    let text = unsafe { read_c_str(json) };
    serde_json::from_str(&text)
        .map_err(|e| tracing::warn!(error = %e, "rejecting networking config"))
        .ok()
}

fn into_handle(runtime: Runtime, build: impl FnOnce() -> Option<Networking>) -> *mut FfiNetworking {
    let inner = {
        let _guard = runtime.enter();
        build()
    };
    match inner {
        Some(inner) => Box::into_raw(Box::new(FfiNetworking { inner, runtime })),
        None => std::ptr::null_mut(),
    }
}

/// Create a client with default settings: 30 s timeouts, one retry on
/// connection failure, Google DNS fallback.
///
/// Returns null on failure. Free with `networking_free`.
#[unsafe(no_mangle)]
pub extern "C" fn networking_new() -> *mut FfiNetworking {
    networking_new_with_config(std::ptr::null())
}

/// Create a client from a JSON config such as
/// `{"connect_timeout_ms":5000,"dns_fallback":"cloudflare"}`. Missing keys
/// keep their defaults; null means all defaults.
///
/// Returns null if the JSON is invalid or the client cannot be built.
#[unsafe(no_mangle)]
pub extern "C" fn networking_new_with_config(config_json: *const c_char) -> *mut FfiNetworking {
    catch_unwind(AssertUnwindSafe(|| {
        let Some(config) = config_from_json(config_json) else {
            return std::ptr::null_mut();
        };
        let Some(runtime) = runtime() else {
            return std::ptr::null_mut();
        };
        into_handle(runtime, || {
            Networking::builder()
                .config(config)
                .build()
                .map_err(|e| tracing::error!(error = %e, "could not build networking client"))
                .ok()
        })
    }))
    .unwrap_or(std::ptr::null_mut())
}

/// Create a client that performs requests through the host's callbacks.
///
/// `config_json` may be null. Only `retry_on_connection_failure` applies;
/// timeouts and DNS are the host stack's business. On success the client
/// owns `host.context` and calls `host.release` when freed. Returns null if
/// `host.execute` is null or `config_json` is invalid, in which case the
/// caller keeps ownership of the context.
#[unsafe(no_mangle)]
pub extern "C" fn networking_new_with_host(
    host: FfiHostTransport,
    config_json: *const c_char,
) -> *mut FfiNetworking {
    catch_unwind(AssertUnwindSafe(|| {
        if host.execute.is_none() {
            return std::ptr::null_mut();
        }
        let Some(config) = config_from_json(config_json) else {
            return std::ptr::null_mut();
        };
        let Some(runtime) = runtime() else {
            return std::ptr::null_mut();
        };
        let transport = HostTransport::new(host);
        into_handle(runtime, || {
            transport.map(|t| Networking::with_transport(Arc::new(t), config))
        })
    }))
    .unwrap_or(std::ptr::null_mut())
}

/// Free a client. Pending asynchronous calls are dropped without invoking
/// their completion. Safe to call with null.
#[unsafe(no_mangle)]
pub extern "C" fn networking_free(client: *mut FfiNetworking) {
    if !client.is_null() {
        let _ = catch_unwind(AssertUnwindSafe(|| {
            let FfiNetworking { inner, runtime } = *unsafe { Box::from_raw(client) };
            drop(inner);
            runtime.shutdown_background();
        }));
    }
}

// ---------------------------------------------------------------------------
// Blocking calls
// ---------------------------------------------------------------------------

/// GET `url`, blocking the calling thread until the call finishes.
///
/// Must not be called from a completion callback. Free the result with
/// `networking_free_result`.
#[unsafe(no_mangle)]
pub extern "C" fn networking_get(
    client: *const FfiNetworking,
    url: *const c_char,
) -> *mut FfiNetworkingResult {
    catch_unwind(AssertUnwindSafe(|| {
        if client.is_null() {
            return FfiNetworkingResult::null_arg("client");
        }
        if url.is_null() {
            return FfiNetworkingResult::null_arg("url");
        }
        let client = unsafe { &*client };
        let url = unsafe { read_c_str(url) };
        FfiNetworkingResult::from_result(client.runtime.block_on(client.inner.get(&url)))
    }))
    .unwrap_or_else(|_| FfiNetworkingResult::panic("panic in networking_get"))
}

/// POST `body` as JSON to `url`, blocking until the call finishes.
///
/// Free the result with `networking_free_result`.
#[unsafe(no_mangle)]
pub extern "C" fn networking_post(
    client: *const FfiNetworking,
    url: *const c_char,
    body: *const c_char,
) -> *mut FfiNetworkingResult {
    catch_unwind(AssertUnwindSafe(|| {
        if client.is_null() {
            return FfiNetworkingResult::null_arg("client");
        }
        if url.is_null() {
            return FfiNetworkingResult::null_arg("url");
        }
        if body.is_null() {
            return FfiNetworkingResult::null_arg("body");
        }
        let client = unsafe { &*client };
        let url = unsafe { read_c_str(url) };
        let body = unsafe { read_c_str(body) };
        FfiNetworkingResult::from_result(client.runtime.block_on(client.inner.post(&url, &body)))
    }))
    .unwrap_or_else(|_| FfiNetworkingResult::panic("panic in networking_post"))
}

// ---------------------------------------------------------------------------
// Asynchronous calls
// ---------------------------------------------------------------------------

struct UserData(*mut c_void);

// The caller hands `user_data` to whichever thread runs the completion.
unsafe impl Send for UserData {}

impl UserData {
    fn get(&self) -> *mut c_void {
        self.0
    }
}

fn spawn_call(
    client: &FfiNetworking,
    start: impl FnOnce(&Networking) -> networking::Call,
    completion: FfiCompletion,
    user_data: *mut c_void,
) -> *mut FfiCall {
    let user_data = UserData(user_data);
    let call = {
        let _guard = client.runtime.enter();
        start(&client.inner)
    };
    let cancel = call.cancel_handle();
    client.runtime.spawn(async move {
        let result = FfiNetworkingResult::from_result(call.await);
        completion(user_data.get(), result);
    });
    Box::into_raw(Box::new(FfiCall { cancel }))
}

/// Start a GET and return immediately.
///
/// `completion` runs exactly once with `user_data` and the result, unless
/// the client is freed first. `user_data` must stay valid until
/// `completion` has returned, not merely until it is entered; hand over
/// ownership and reclaim it inside the callback. Free the returned handle with
/// `networking_call_free`; doing so does not cancel the call. Returns null
/// if any pointer argument is null.
#[unsafe(no_mangle)]
pub extern "C" fn networking_get_async(
    client: *const FfiNetworking,
    url: *const c_char,
    completion: Option<FfiCompletion>,
    user_data: *mut c_void,
) -> *mut FfiCall {
    catch_unwind(AssertUnwindSafe(|| {
        let Some(completion) = completion else {
            return std::ptr::null_mut();
        };
        if client.is_null() || url.is_null() {
            return std::ptr::null_mut();
        }
        let client = unsafe { &*client };
        let url = unsafe { read_c_str(url) };
        spawn_call(client, |n| n.spawn_get(url), completion, user_data)
    }))
    .unwrap_or(std::ptr::null_mut())
}

/// Start a POST and return immediately. See `networking_get_async`.
#[unsafe(no_mangle)]
pub extern "C" fn networking_post_async(
    client: *const FfiNetworking,
    url: *const c_char,
    body: *const c_char,
    completion: Option<FfiCompletion>,
    user_data: *mut c_void,
) -> *mut FfiCall {
    catch_unwind(AssertUnwindSafe(|| {
        let Some(completion) = completion else {
            return std::ptr::null_mut();
        };
        if client.is_null() || url.is_null() || body.is_null() {
            return std::ptr::null_mut();
        }
        let client = unsafe { &*client };
        let url = unsafe { read_c_str(url) };
        let body = unsafe { read_c_str(body) };
        spawn_call(client, |n| n.spawn_post(url, body), completion, user_data)
    }))
    .unwrap_or(std::ptr::null_mut())
}

/// Cancel an asynchronous call. Its completion then receives `Cancelled`.
///
/// Returns false if the call had already finished or `call` is null.
#[unsafe(no_mangle)]
pub extern "C" fn networking_call_cancel(call: *const FfiCall) -> bool {
    if call.is_null() {
        return false;
    }
    catch_unwind(AssertUnwindSafe(|| unsafe { &*call }.cancel.cancel())).unwrap_or(false)
}

/// Free a call handle. Safe to call with null.
#[unsafe(no_mangle)]
pub extern "C" fn networking_call_free(call: *mut FfiCall) {
    if !call.is_null() {
        let _ = catch_unwind(AssertUnwindSafe(|| {
            drop(unsafe { Box::from_raw(call) });
        }));
    }
}

// ---------------------------------------------------------------------------
// Host transport completion
// ---------------------------------------------------------------------------

/// Id of a host call, as later passed to the host's `cancel` callback.
#[unsafe(no_mangle)]
pub extern "C" fn networking_host_call_id(call: *const FfiHostCall) -> u64 {
    if call.is_null() {
        return 0;
    }
    catch_unwind(AssertUnwindSafe(|| unsafe { &*call }.id)).unwrap_or(0)
}

/// Complete a host call with the server's response. `body` may be null when
/// `body_len` is 0. Consumes `call`.
#[unsafe(no_mangle)]
pub extern "C" fn networking_host_call_complete(
    call: *mut FfiHostCall,
    status: u16,
    body: *const u8,
    body_len: usize,
) {
    if call.is_null() {
        return;
    }
    let _ = catch_unwind(AssertUnwindSafe(|| {
        let call = unsafe { Box::from_raw(call) };
        let body = if body.is_null() || body_len == 0 {
            Vec::new()
        } else {
            unsafe { std::slice::from_raw_parts(body, body_len) }.to_vec()
        };
        call.complete(Ok(HttpResponse::with_status(status, body)));
    }));
}

/// Fail a host call. `message` may be null. Consumes `call`.
///
/// Use `CONNECTION` only when the connection could not be established and
/// no request byte was sent; such attempts are retried once. Use
/// `CONNECTION_LOST` when the connection broke after the request started
/// going out; those are never retried.
#[unsafe(no_mangle)]
pub extern "C" fn networking_host_call_fail(
    call: *mut FfiHostCall,
    error_code: FfiErrorCode,
    message: *const c_char,
) {
    if call.is_null() {
        return;
    }
    let _ = catch_unwind(AssertUnwindSafe(|| {
        let call = unsafe { Box::from_raw(call) };
        let message = if message.is_null() {
            "host transport failed".to_string()
        } else {
            unsafe { read_c_str(message) }
        };
        let err = host_error(error_code, message, &call.url);
        call.complete(Err(err));
    }));
}

// ---------------------------------------------------------------------------
// Free functions
// ---------------------------------------------------------------------------

/// Free a result returned by any call. Safe to call with null.
#[unsafe(no_mangle)]
pub extern "C" fn networking_free_result(result: *mut FfiNetworkingResult) {
    if result.is_null() {
        return;
    }
    let _ = catch_unwind(AssertUnwindSafe(|| {
        let result = unsafe { Box::from_raw(result) };
        if !result.error_message.is_null() {
            drop(unsafe { CString::from_raw(result.error_message) });
        }
        if !result.body.is_null() {
            drop(unsafe { CString::from_raw(result.body) });
        }
    }));
}

/// Free a C string allocated by this library. Safe to call with null.
#[unsafe(no_mangle)]
pub extern "C" fn networking_free_string(s: *mut c_char) {
    if !s.is_null() {
        let _ = catch_unwind(AssertUnwindSafe(|| {
            drop(unsafe { CString::from_raw(s) });
        }));
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::CStr;
    use std::net::SocketAddr;
    use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
    use std::sync::mpsc;
    use std::sync::Mutex;
    use std::time::Duration;

    fn start_mock_server() -> SocketAddr {
        let std_listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = std_listener.local_addr().unwrap();
        std_listener.set_nonblocking(true).unwrap();

        std::thread::spawn(move || {
            let rt = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .unwrap();
            rt.block_on(async {
                let listener = tokio::net::TcpListener::from_std(std_listener).unwrap();
                mock_server::run(listener).await
            })
            .unwrap();
        });

        addr
    }

    fn local_client() -> *mut FfiNetworking {
        let config = CString::new(r#"{"dns_fallback":"none"}"#).unwrap();
        let client = networking_new_with_config(config.as_ptr());
        assert!(!client.is_null());
        client
    }

    /// Copy what the test needs out of a result, then free it.
    fn outcome(result: *mut FfiNetworkingResult) -> (FfiErrorCode, u16, Option<String>) {
        let r = unsafe { &*result };
        let body = (!r.body.is_null())
            .then(|| unsafe { CStr::from_ptr(r.body) }.to_str().unwrap().to_string());
        let out = (r.error_code, r.http_status, body);
        networking_free_result(result);
        out
    }

    type Outcome = (FfiErrorCode, u16, Option<String>);

    /// Owned sender handed to the completion, which reclaims it.
    fn completion_sender(tx: mpsc::Sender<Outcome>) -> *mut c_void {
        Box::into_raw(Box::new(tx)) as *mut c_void
    }

    extern "C" fn send_outcome(user_data: *mut c_void, result: *mut FfiNetworkingResult) {
        let sender = unsafe { Box::from_raw(user_data as *mut mpsc::Sender<Outcome>) };
        let _ = sender.send(outcome(result));
    }

    #[test]
    fn client_new_and_free() {
        let client = networking_new();
        assert!(!client.is_null());
        networking_free(client);
    }

    #[test]
    fn invalid_config_json_returns_null() {
        let config = CString::new(r#"{"dns_fallback":"bogus"}"#).unwrap();
        assert!(networking_new_with_config(config.as_ptr()).is_null());
    }

    #[test]
    fn get_returns_body() {
        let addr = start_mock_server();
        let client = local_client();
        let url = CString::new(format!("http://{addr}/utf8")).unwrap();

        let (code, status, body) = outcome(networking_get(client, url.as_ptr()));
        assert_eq!(code, FfiErrorCode::Ok);
        assert_eq!(status, 0);
        assert_eq!(body.as_deref(), Some("héllo wörld ✓"));

        networking_free(client);
    }

    #[test]
    fn post_echoes_payload() {
        let addr = start_mock_server();
        let client = local_client();
        let url = CString::new(format!("http://{addr}/post")).unwrap();
        let body = CString::new(r#"{"demo":"test"}"#).unwrap();

        let (code, _, body) = outcome(networking_post(client, url.as_ptr(), body.as_ptr()));
        assert_eq!(code, FfiErrorCode::Ok);
        assert!(body.unwrap().contains(r#""demo":"test""#));

        networking_free(client);
    }

    #[test]
    fn error_status_is_reported() {
        let addr = start_mock_server();
        let client = local_client();
        let url = CString::new(format!("http://{addr}/status/404")).unwrap();

        let (code, status, _) = outcome(networking_get(client, url.as_ptr()));
        assert_eq!(code, FfiErrorCode::HttpStatus);
        assert_eq!(status, 404);

        networking_free(client);
    }

    #[test]
    fn invalid_url_is_reported() {
        let client = local_client();
        let url = CString::new("not a url").unwrap();
        let (code, _, _) = outcome(networking_get(client, url.as_ptr()));
        assert_eq!(code, FfiErrorCode::InvalidUrl);
        networking_free(client);
    }

    #[test]
    fn null_args_are_reported() {
        let (code, _, _) = outcome(networking_get(std::ptr::null(), std::ptr::null()));
        assert_eq!(code, FfiErrorCode::NullArg);

        let client = local_client();
        let url = CString::new("http://localhost/post").unwrap();
        let (code, _, _) = outcome(networking_post(client, url.as_ptr(), std::ptr::null()));
        assert_eq!(code, FfiErrorCode::NullArg);
        networking_free(client);
    }

    #[test]
    fn async_get_invokes_completion() {
        let addr = start_mock_server();
        let client = local_client();
        let url = CString::new(format!("http://{addr}/get")).unwrap();
        let (tx, rx) = mpsc::channel::<Outcome>();

        let call = networking_get_async(
            client,
            url.as_ptr(),
            Some(send_outcome),
            completion_sender(tx),
        );
        assert!(!call.is_null());

        let (code, _, body) = rx.recv_timeout(Duration::from_secs(10)).unwrap();
        assert_eq!(code, FfiErrorCode::Ok);
        assert!(body.unwrap().contains(r#""method":"GET""#));
        assert!(!networking_call_cancel(call));

        networking_call_free(call);
        networking_free(client);
    }

    #[test]
    fn async_call_can_be_cancelled() {
        let addr = start_mock_server();
        let client = local_client();
        let url = CString::new(format!("http://{addr}/delay/5000")).unwrap();
        let (tx, rx) = mpsc::channel::<Outcome>();

        let call = networking_get_async(
            client,
            url.as_ptr(),
            Some(send_outcome),
            completion_sender(tx),
        );
        std::thread::sleep(Duration::from_millis(100));
        assert!(networking_call_cancel(call));

        let (code, _, _) = rx.recv_timeout(Duration::from_secs(2)).unwrap();
        assert_eq!(code, FfiErrorCode::Cancelled);

        networking_call_free(call);
        networking_free(client);
    }

    #[test]
    fn async_without_completion_returns_null() {
        let client = local_client();
        let url = CString::new("http://localhost/get").unwrap();
        let call = networking_get_async(client, url.as_ptr(), None, std::ptr::null_mut());
        assert!(call.is_null());
        networking_free(client);
    }

    // -- host transport ----------------------------------------------------

    static RELEASED: AtomicUsize = AtomicUsize::new(0);

    extern "C" fn release_counter(_context: *mut c_void) {
        RELEASED.fetch_add(1, Ordering::SeqCst);
    }

    /// Answers every request inline with its method and body.
    extern "C" fn echo_execute(
        _context: *mut c_void,
        request: *const FfiHttpRequest,
        call: *mut FfiHostCall,
    ) {
        let request = unsafe { &*request };
        let mut reply = match request.method {
            FfiHttpMethod::Get => "GET".to_string(),
            FfiHttpMethod::Post => "POST ".to_string(),
        };
        if !request.body.is_null() {
            reply.push_str(unsafe { CStr::from_ptr(request.body) }.to_str().unwrap());
        }
        networking_host_call_complete(call, 200, reply.as_ptr(), reply.len());
    }

    fn host(
        execute: host::FfiHostExecute,
        cancel: Option<host::FfiHostCancel>,
    ) -> FfiHostTransport {
        FfiHostTransport {
            context: std::ptr::null_mut(),
            execute: Some(execute),
            cancel,
            release: Some(release_counter),
        }
    }

    #[test]
    fn host_transport_serves_requests() {
        let client = networking_new_with_host(host(echo_execute, None), std::ptr::null());
        assert!(!client.is_null());

        let url = CString::new("https://example.test/post").unwrap();
        let body = CString::new(r#"{"demo":"test"}"#).unwrap();
        let (code, _, reply) = outcome(networking_post(client, url.as_ptr(), body.as_ptr()));
        assert_eq!(code, FfiErrorCode::Ok);
        assert_eq!(reply.as_deref(), Some(r#"POST {"demo":"test"}"#));

        let before = RELEASED.load(Ordering::SeqCst);
        networking_free(client);
        assert!(RELEASED.load(Ordering::SeqCst) > before);
    }

    static FLAKY_ATTEMPTS: AtomicUsize = AtomicUsize::new(0);

    /// Fails the first attempt with a connection error, then succeeds.
    extern "C" fn flaky_execute(
        _context: *mut c_void,
        _request: *const FfiHttpRequest,
        call: *mut FfiHostCall,
    ) {
        if FLAKY_ATTEMPTS.fetch_add(1, Ordering::SeqCst) == 0 {
            let message = CString::new("network unreachable").unwrap();
            networking_host_call_fail(call, FfiErrorCode::Connection, message.as_ptr());
        } else {
            networking_host_call_complete(call, 204, std::ptr::null(), 0);
        }
    }

    #[test]
    fn host_connection_failure_is_retried_once() {
        let client = networking_new_with_host(host(flaky_execute, None), std::ptr::null());
        let url = CString::new("https://example.test/get").unwrap();

        let (code, _, body) = outcome(networking_get(client, url.as_ptr()));
        assert_eq!(code, FfiErrorCode::Ok);
        assert_eq!(body.as_deref(), Some(""));
        assert_eq!(FLAKY_ATTEMPTS.load(Ordering::SeqCst), 2);

        networking_free(client);
    }

    static RESET_ATTEMPTS: AtomicUsize = AtomicUsize::new(0);

    /// Drops the connection mid-exchange on every attempt.
    extern "C" fn reset_execute(
        _context: *mut c_void,
        _request: *const FfiHttpRequest,
        call: *mut FfiHostCall,
    ) {
        RESET_ATTEMPTS.fetch_add(1, Ordering::SeqCst);
        let message = CString::new("connection reset by peer").unwrap();
        networking_host_call_fail(call, FfiErrorCode::ConnectionLost, message.as_ptr());
    }

    #[test]
    fn lost_connection_is_not_retried() {
        let client = networking_new_with_host(host(reset_execute, None), std::ptr::null());
        let url = CString::new("https://example.test/post").unwrap();
        let body = CString::new(r#"{"demo":"test"}"#).unwrap();

        let (code, _, _) = outcome(networking_post(client, url.as_ptr(), body.as_ptr()));
        assert_eq!(code, FfiErrorCode::ConnectionLost);
        assert_eq!(RESET_ATTEMPTS.load(Ordering::SeqCst), 1);

        networking_free(client);
    }

    extern "C" fn invalid_url_execute(
        _context: *mut c_void,
        _request: *const FfiHttpRequest,
        call: *mut FfiHostCall,
    ) {
        let message = CString::new("unsupported host").unwrap();
        networking_host_call_fail(call, FfiErrorCode::InvalidUrl, message.as_ptr());
    }

    #[test]
    fn host_invalid_url_reports_request_url() {
        let client = networking_new_with_host(host(invalid_url_execute, None), std::ptr::null());
        let url = CString::new("https://example.test/get").unwrap();

        let result = networking_get(client, url.as_ptr());
        let message = unsafe { CStr::from_ptr((*result).error_message) }
            .to_str()
            .unwrap()
            .to_string();
        let (code, _, _) = outcome(result);
        assert_eq!(code, FfiErrorCode::InvalidUrl);
        assert_eq!(message, "invalid URL `https://example.test/get`: unsupported host");

        networking_free(client);
    }

    #[test]
    fn host_call_id_of_null_is_zero() {
        assert_eq!(networking_host_call_id(std::ptr::null()), 0);
    }

    extern "C" fn timeout_execute(
        _context: *mut c_void,
        _request: *const FfiHttpRequest,
        call: *mut FfiHostCall,
    ) {
        networking_host_call_fail(call, FfiErrorCode::Timeout, std::ptr::null());
    }

    #[test]
    fn host_timeout_is_reported() {
        let client = networking_new_with_host(host(timeout_execute, None), std::ptr::null());
        let url = CString::new("https://example.test/get").unwrap();
        let (code, _, _) = outcome(networking_get(client, url.as_ptr()));
        assert_eq!(code, FfiErrorCode::Timeout);
        networking_free(client);
    }

    static PARKED: Mutex<Vec<usize>> = Mutex::new(Vec::new());
    static CANCELLED_ID: AtomicU64 = AtomicU64::new(0);

    /// Never answers on its own; keeps the token for later.
    extern "C" fn parking_execute(
        _context: *mut c_void,
        _request: *const FfiHttpRequest,
        call: *mut FfiHostCall,
    ) {
        PARKED.lock().unwrap().push(call as usize);
    }

    extern "C" fn record_cancel(_context: *mut c_void, call_id: u64) {
        CANCELLED_ID.store(call_id, Ordering::SeqCst);
    }

    #[test]
    fn cancelling_notifies_host() {
        let host = host(parking_execute, Some(record_cancel));
        let client = networking_new_with_host(host, std::ptr::null());
        let url = CString::new("https://example.test/get").unwrap();
        let (tx, rx) = mpsc::channel::<Outcome>();

        let call = networking_get_async(
            client,
            url.as_ptr(),
            Some(send_outcome),
            completion_sender(tx),
        );
        let parked = loop {
            if let Some(ptr) = PARKED.lock().unwrap().pop() {
                break ptr as *mut FfiHostCall;
            }
            std::thread::sleep(Duration::from_millis(10));
        };
        let id = networking_host_call_id(parked);

        assert!(networking_call_cancel(call));
        let (code, _, _) = rx.recv_timeout(Duration::from_secs(2)).unwrap();
        assert_eq!(code, FfiErrorCode::Cancelled);
        assert_eq!(CANCELLED_ID.load(Ordering::SeqCst), id);

        // Late completion of a cancelled call is harmless.
        networking_host_call_complete(parked, 200, std::ptr::null(), 0);

        networking_call_free(call);
        networking_free(client);
    }

    #[test]
    fn host_without_execute_returns_null() {
        let host = FfiHostTransport {
            context: std::ptr::null_mut(),
            execute: None,
            cancel: None,
            release: None,
        };
        assert!(networking_new_with_host(host, std::ptr::null()).is_null());
    }

    #[test]
    fn free_null_is_safe() {
        networking_free(std::ptr::null_mut());
        networking_free_result(std::ptr::null_mut());
        networking_free_string(std::ptr::null_mut());
        networking_call_free(std::ptr::null_mut());
        networking_host_call_complete(std::ptr::null_mut(), 200, std::ptr::null(), 0);
    }
}
