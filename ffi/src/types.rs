//! `#[repr(C)]` types for the FFI boundary.
//!
//! # Design
//! Each type mirrors a core type but uses C-compatible representations:
//! `*mut c_char` instead of `String` and C enums with explicit
//! discriminants. Conversion helpers live here to keep `lib.rs` focused on
//! the `extern "C"` surface.

use std::ffi::{c_void, CStr, CString};
use std::os::raw::c_char;

use networking::{ConnectionPhase, HttpMethod, NetworkError, Networking};
use tokio::runtime::Runtime;

/// Opaque handle to a `Networking` client and the runtime that drives it.
/// C callers receive a pointer to this and pass it back into every call.
pub struct FfiNetworking {
    pub(crate) inner: Networking,
    pub(crate) runtime: Runtime,
}

/// Opaque handle to an asynchronous call started with `networking_*_async`.
pub struct FfiCall {
    pub(crate) cancel: networking::CancelHandle,
}

/// Invoked exactly once when an asynchronous call finishes, on a runtime
/// worker thread. The callee owns `result` and must release it with
/// `networking_free_result`.
pub type FfiCompletion = extern "C" fn(user_data: *mut c_void, result: *mut FfiNetworkingResult);

// ---------------------------------------------------------------------------
// Request types
// ---------------------------------------------------------------------------

/// HTTP method as a C enum.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FfiHttpMethod {
    Get = 0,
    Post = 1,
}

impl From<HttpMethod> for FfiHttpMethod {
    fn from(m: HttpMethod) -> Self {
        match m {
            HttpMethod::Get => FfiHttpMethod::Get,
            HttpMethod::Post => FfiHttpMethod::Post,
        }
    }
}

/// A request handed to a host transport.
///
/// Every pointer is borrowed and valid only for the duration of the
/// `execute` callback; hosts copy what they need. `body` and `content_type`
/// are null for GET.
#[repr(C)]
pub struct FfiHttpRequest {
    pub method: FfiHttpMethod,
    pub url: *const c_char,
    pub body: *const c_char,
    pub content_type: *const c_char,
}

// ---------------------------------------------------------------------------
// Result types
// ---------------------------------------------------------------------------

/// Error codes returned in `FfiNetworkingResult`.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FfiErrorCode {
    Ok = 0,
    Connection = 1,
    Timeout = 2,
    HttpStatus = 3,
    Cancelled = 4,
    InvalidUrl = 5,
    Client = 6,
    Panic = 7,
    NullArg = 8,
    /// The connection broke after the request started going out.
    ConnectionLost = 9,
}

impl From<&NetworkError> for FfiErrorCode {
    fn from(err: &NetworkError) -> Self {
        match err {
            NetworkError::Connection {
                phase: ConnectionPhase::Exchange,
                ..
            } => FfiErrorCode::ConnectionLost,
            NetworkError::Connection { .. } => FfiErrorCode::Connection,
            NetworkError::Timeout { .. } => FfiErrorCode::Timeout,
            NetworkError::HttpStatus { .. } => FfiErrorCode::HttpStatus,
            NetworkError::Cancelled => FfiErrorCode::Cancelled,
            NetworkError::InvalidUrl { .. } => FfiErrorCode::InvalidUrl,
            NetworkError::Client { .. } => FfiErrorCode::Client,
        }
    }
}

/// Result envelope for every `get`/`post` call.
///
/// On success `error_code` is `Ok`, `error_message` is null and `body` holds
/// the response text (possibly empty). On failure `error_code` names the
/// category and `error_message` is a human-readable C string. For
/// `HttpStatus` failures `http_status` is set and `body` carries the error
/// body; otherwise `body` is null.
#[repr(C)]
pub struct FfiNetworkingResult {
    pub error_code: FfiErrorCode,
    pub error_message: *mut c_char,
    pub http_status: u16,
    pub body: *mut c_char,
}

impl FfiNetworkingResult {
    pub(crate) fn from_result(result: Result<String, NetworkError>) -> *mut Self {
        match result {
            Ok(body) => Self::ok(body),
            Err(err) => Self::from_error(err),
        }
    }

    pub(crate) fn ok(body: String) -> *mut Self {
        Box::into_raw(Box::new(FfiNetworkingResult {
            error_code: FfiErrorCode::Ok,
            error_message: std::ptr::null_mut(),
            http_status: 0,
            body: c_string(body).into_raw(),
        }))
    }

    pub(crate) fn from_error(err: NetworkError) -> *mut Self {
        let error_code = FfiErrorCode::from(&err);
        let error_message = c_string(err.to_string()).into_raw();
        let (http_status, body) = match err {
            NetworkError::HttpStatus { status, body, .. } => (status, c_string(body).into_raw()),
            _ => (0, std::ptr::null_mut()),
        };
        Box::into_raw(Box::new(FfiNetworkingResult {
            error_code,
            error_message,
            http_status,
            body,
        }))
    }

    /// Build an error result for a null argument.
    pub(crate) fn null_arg(name: &str) -> *mut Self {
        Self::failure(FfiErrorCode::NullArg, &format!("null argument: {name}"))
    }

    /// Build an error result for a caught panic.
    pub(crate) fn panic(msg: &str) -> *mut Self {
        Self::failure(FfiErrorCode::Panic, msg)
    }

    fn failure(error_code: FfiErrorCode, msg: &str) -> *mut Self {
        Box::into_raw(Box::new(FfiNetworkingResult {
            error_code,
            error_message: c_string(msg).into_raw(),
            http_status: 0,
            body: std::ptr::null_mut(),
        }))
    }
}

// ---------------------------------------------------------------------------
// String helpers
// ---------------------------------------------------------------------------

/// `CString` from arbitrary text. Interior NULs are dropped.
pub(crate) fn c_string(s: impl Into<Vec<u8>>) -> CString {
    let mut bytes = s.into();
    bytes.retain(|b| *b != 0);
    CString::new(bytes).unwrap_or_default()
}

/// Copy a caller-owned C string. Invalid UTF-8 is replaced.
///
/// # Safety
/// `ptr` must be non-null and point to a NUL-terminated string.
pub(crate) unsafe fn read_c_str(ptr: *const c_char) -> String {
    unsafe { CStr::from_ptr(ptr) }.to_string_lossy().into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn take(result: *mut FfiNetworkingResult) -> Box<FfiNetworkingResult> {
        unsafe { Box::from_raw(result) }
    }

    fn text(ptr: *mut c_char) -> String {
        unsafe { CString::from_raw(ptr) }.into_string().unwrap()
    }

    #[test]
    fn c_string_strips_interior_nul() {
        assert_eq!(c_string("a\0b").to_str().unwrap(), "ab");
    }

    #[test]
    fn ok_result_carries_body() {
        let r = take(FfiNetworkingResult::ok("hello".to_string()));
        assert_eq!(r.error_code, FfiErrorCode::Ok);
        assert!(r.error_message.is_null());
        assert_eq!(text(r.body), "hello");
    }

    #[test]
    fn http_status_result_carries_status_and_body() {
        let r = take(FfiNetworkingResult::from_error(NetworkError::HttpStatus {
            status: 404,
            reason: "Not Found".to_string(),
            body: "missing".to_string(),
        }));
        assert_eq!(r.error_code, FfiErrorCode::HttpStatus);
        assert_eq!(r.http_status, 404);
        assert_eq!(text(r.error_message), "unexpected response: 404 Not Found");
        assert_eq!(text(r.body), "missing");
    }

    #[test]
    fn error_codes_follow_variants() {
        let connection = NetworkError::connection(ConnectionPhase::Connect, "refused", None);
        assert_eq!(FfiErrorCode::from(&connection), FfiErrorCode::Connection);
        assert_eq!(FfiErrorCode::from(&NetworkError::timeout("slow", None)), FfiErrorCode::Timeout);
        assert_eq!(FfiErrorCode::from(&NetworkError::Cancelled), FfiErrorCode::Cancelled);
        let lost = NetworkError::connection(ConnectionPhase::Exchange, "reset", None);
        assert_eq!(FfiErrorCode::from(&lost), FfiErrorCode::ConnectionLost);

        let r = take(FfiNetworkingResult::from_error(connection));
        assert_eq!(r.http_status, 0);
        assert!(r.body.is_null());
        drop(text(r.error_message));
    }
}
