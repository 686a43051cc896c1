//! Error types for the networking facade.
//!
//! # Design
//! Every failure a caller can observe is one `NetworkError` variant. The
//! variant tells the caller *what* went wrong (could not connect, timed out,
//! non-2xx status, cancelled); the `Display` text is the human-readable
//! message and `source()` exposes the underlying transport error, if any.
//!
//! `Connection` carries a `ConnectionPhase` so the facade can tell a failure
//! that happened before any request byte left the machine (`Connect`, which
//! is retried once) from a resolution failure or a connection lost mid-way.

use thiserror::Error;

/// Boxed underlying cause attached to transport failures.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Where a connection-level failure happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionPhase {
    /// The host name could not be resolved, fallback resolver included.
    Resolve,
    /// The TCP/TLS connection could not be established. Nothing was sent.
    Connect,
    /// The connection broke after the request started going out.
    Exchange,
}

/// Errors returned by `Networking::get` and `Networking::post`.
#[derive(Debug, Error)]
pub enum NetworkError {
    /// Could not establish or keep a connection to the server.
    #[error("connection failed: {message}")]
    Connection {
        phase: ConnectionPhase,
        message: String,
        #[source]
        cause: Option<BoxError>,
    },

    /// A connect, read or write timeout elapsed.
    #[error("request timed out: {message}")]
    Timeout {
        message: String,
        #[source]
        cause: Option<BoxError>,
    },

    /// The server answered with a non-2xx status.
    #[error("unexpected response: {status} {reason}")]
    HttpStatus {
        status: u16,
        reason: String,
        body: String,
    },

    /// The caller cancelled the call before it completed.
    #[error("request was cancelled")]
    Cancelled,

    /// The URL could not be parsed or uses an unsupported scheme.
    #[error("invalid URL `{url}`: {message}")]
    InvalidUrl { url: String, message: String },

    /// The client itself could not be constructed.
    #[error("client setup failed: {message}")]
    Client {
        message: String,
        #[source]
        cause: Option<BoxError>,
    },
}

impl NetworkError {
    pub fn connection(
        phase: ConnectionPhase,
        message: impl Into<String>,
        cause: Option<BoxError>,
    ) -> Self {
        NetworkError::Connection {
            phase,
            message: message.into(),
            cause,
        }
    }

    pub fn timeout(message: impl Into<String>, cause: Option<BoxError>) -> Self {
        NetworkError::Timeout {
            message: message.into(),
            cause,
        }
    }

    /// True for failures that happened before any request byte was sent.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            NetworkError::Connection {
                phase: ConnectionPhase::Connect,
                ..
            }
        )
    }

    /// HTTP status code for `HttpStatus` errors.
    pub fn status(&self) -> Option<u16> {
        match self {
            NetworkError::HttpStatus { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, NetworkError::Cancelled)
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, NetworkError::Timeout { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn http_status_message_includes_status_and_reason() {
        let err = NetworkError::HttpStatus {
            status: 404,
            reason: "Not Found".to_string(),
            body: String::new(),
        };
        assert_eq!(err.to_string(), "unexpected response: 404 Not Found");
        assert_eq!(err.status(), Some(404));
    }

    #[test]
    fn only_connect_phase_is_transient() {
        assert!(NetworkError::connection(ConnectionPhase::Connect, "refused", None).is_transient());
        let resolve = NetworkError::connection(ConnectionPhase::Resolve, "nxdomain", None);
        assert!(!resolve.is_transient());
        assert!(!NetworkError::connection(ConnectionPhase::Exchange, "reset", None).is_transient());
        assert!(!NetworkError::timeout("read", None).is_transient());
        assert!(!NetworkError::Cancelled.is_transient());
    }

    #[test]
    fn cause_is_exposed_as_source() {
        let io = std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "refused");
        let err = NetworkError::connection(ConnectionPhase::Connect, "refused", Some(Box::new(io)));
        let source = err.source().expect("source");
        assert_eq!(source.to_string(), "refused");
    }

    #[test]
    fn cancelled_has_no_source() {
        let err = NetworkError::Cancelled;
        assert!(err.source().is_none());
        assert!(err.is_cancelled());
        assert_eq!(err.status(), None);
    }
}
