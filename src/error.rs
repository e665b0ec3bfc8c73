//! Error types for transport calls.
//!
//! Every failure that reaches a caller is one [`Error`]. Failures coming back
//! from the cluster or from the network are classified exactly once (see
//! [`crate::classify`]) and carry an [`ErrorRecord`] with the raw details, so
//! callers can both print a diagnostic and branch on [`Error::kind`].

use http::StatusCode;
use serde_json::Value;
use std::time::Duration;

/// The raw facts behind a classified failure.
///
/// `status` is `None` for failures that never produced an HTTP response
/// (connection refused, DNS failure, timeout, ...).
#[derive(Debug, Clone, PartialEq)]
pub struct ErrorRecord {
    /// HTTP status code, or `None` for non-HTTP failures.
    pub status: Option<StatusCode>,
    /// The raw response body (empty for non-HTTP failures).
    pub body: String,
    /// The structured JSON error object, when the body was one.
    pub payload: Option<Value>,
    /// The URL the failing transfer targeted.
    pub url: String,
    /// How long the transfer ran before failing.
    pub duration: Duration,
}

/// Fieldless discriminant of [`Error`], for matching without destructuring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    NotFound,
    HttpNotFound,
    Request,
    Script,
    Conflict,
    Authorization,
    Authentication,
    Proxy,
    Connection,
    ConnectionTimeout,
    Batch,
    Http,
    Deserialization,
    Serialization,
    Configuration,
    InvalidUrl,
    InvalidRequest,
    Closed,
}

/// The main error type for transport calls.
///
/// # Examples
///
/// ```no_run
/// use estransport::{Error, Transport};
///
/// # async fn example() -> Result<(), Error> {
/// let transport = Transport::builder()
///     .base_url("http://localhost:9200")?
///     .build()?;
///
/// match transport.get("/my-index/_doc/1").await {
///     Ok(response) => println!("found: {:?}", response.data),
///     Err(Error::NotFound { message, .. }) => eprintln!("{message}"),
///     Err(Error::ConnectionTimeout { record }) => {
///         eprintln!("gave up on {} after {:?}", record.url, record.duration);
///     }
///     Err(e) => eprintln!("other error: {e}"),
/// }
/// # Ok(())
/// # }
/// ```
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// The service reported a missing resource or document.
    #[error("{message}")]
    NotFound {
        /// Which resource or document was missing.
        message: String,
        record: Box<ErrorRecord>,
    },

    /// A 404 that was not produced by the service itself (wrong URL, proxy).
    #[error("URL '{}' not found", .record.url)]
    HttpNotFound { record: Box<ErrorRecord> },

    /// The service rejected the request as invalid.
    #[error("request error: {reason}")]
    Request {
        /// The reason text given by the service.
        reason: String,
        record: Box<ErrorRecord>,
    },

    /// A script failed while executing on the service.
    #[error("script error: {reason}")]
    Script {
        reason: String,
        /// The script stack lines reported by the service.
        script_stack: Vec<String>,
        record: Box<ErrorRecord>,
    },

    /// A version or optimistic-concurrency conflict.
    #[error("conflict error: {} failures", .failures.len())]
    Conflict {
        failures: Vec<Value>,
        record: Box<ErrorRecord>,
    },

    /// The credentials were accepted but lack permission (403).
    #[error("not authorized to access '{}'", .record.url)]
    Authorization { record: Box<ErrorRecord> },

    /// The credentials were rejected or missing (401).
    #[error("authentication failed for '{}'", .record.url)]
    Authentication { record: Box<ErrorRecord> },

    /// A 502 answered by an intermediary instead of the service.
    #[error("proxy error on '{}': {}", .record.url, .record.body)]
    Proxy { record: Box<ErrorRecord> },

    /// The transfer failed below HTTP (refused, reset, DNS, TLS, ...).
    #[error("connection to '{}' failed: {message}", .record.url)]
    Connection {
        message: String,
        record: Box<ErrorRecord>,
    },

    /// The transfer did not complete within its timeout.
    #[error("connection to '{}' timed out after {:?}", .record.url, .record.duration)]
    ConnectionTimeout { record: Box<ErrorRecord> },

    /// A bulk or by-query operation partially failed.
    #[error("batch operation failed: {count} failures, first one: {first}")]
    Batch {
        count: usize,
        first: Value,
        record: Box<ErrorRecord>,
    },

    /// Any other non-success status.
    #[error("HTTP error {status}: {}", .record.body)]
    Http {
        status: StatusCode,
        record: Box<ErrorRecord>,
    },

    /// Failed to deserialize a response body that claimed to be JSON.
    #[error("Failed to deserialize response (status {status}): {serde_error}")]
    Deserialization {
        raw_response: String,
        serde_error: String,
        status: StatusCode,
    },

    /// Failed to serialize the request body.
    #[error("Failed to serialize request: {0}")]
    Serialization(String),

    /// Invalid transport or connection configuration.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// An invalid URL was provided.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// The request cannot be sent as given.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// The multiplexer no longer accepts transfers.
    #[error("transport is closed")]
    Closed,
}

impl Error {
    /// Returns the kind of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::NotFound { .. } => ErrorKind::NotFound,
            Error::HttpNotFound { .. } => ErrorKind::HttpNotFound,
            Error::Request { .. } => ErrorKind::Request,
            Error::Script { .. } => ErrorKind::Script,
            Error::Conflict { .. } => ErrorKind::Conflict,
            Error::Authorization { .. } => ErrorKind::Authorization,
            Error::Authentication { .. } => ErrorKind::Authentication,
            Error::Proxy { .. } => ErrorKind::Proxy,
            Error::Connection { .. } => ErrorKind::Connection,
            Error::ConnectionTimeout { .. } => ErrorKind::ConnectionTimeout,
            Error::Batch { .. } => ErrorKind::Batch,
            Error::Http { .. } => ErrorKind::Http,
            Error::Deserialization { .. } => ErrorKind::Deserialization,
            Error::Serialization(_) => ErrorKind::Serialization,
            Error::Configuration(_) => ErrorKind::Configuration,
            Error::InvalidUrl(_) => ErrorKind::InvalidUrl,
            Error::InvalidRequest(_) => ErrorKind::InvalidRequest,
            Error::Closed => ErrorKind::Closed,
        }
    }

    /// Returns the record of a classified failure.
    ///
    /// Local errors (configuration, serialization, ...) have none.
    pub fn record(&self) -> Option<&ErrorRecord> {
        match self {
            Error::NotFound { record, .. }
            | Error::HttpNotFound { record }
            | Error::Request { record, .. }
            | Error::Script { record, .. }
            | Error::Conflict { record, .. }
            | Error::Authorization { record }
            | Error::Authentication { record }
            | Error::Proxy { record }
            | Error::Connection { record, .. }
            | Error::ConnectionTimeout { record }
            | Error::Batch { record, .. }
            | Error::Http { record, .. } => Some(record),
            Error::Deserialization { .. }
            | Error::Serialization(_)
            | Error::Configuration(_)
            | Error::InvalidUrl(_)
            | Error::InvalidRequest(_)
            | Error::Closed => None,
        }
    }

    /// Returns the HTTP status code if this error has one.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Error::Deserialization { status, .. } => Some(*status),
            _ => self.record().and_then(|record| record.status),
        }
    }

    /// Returns the raw response body if this error has one.
    pub fn raw_response(&self) -> Option<&str> {
        match self {
            Error::Deserialization { raw_response, .. } => Some(raw_response),
            _ => self
                .record()
                .filter(|record| record.status.is_some())
                .map(|record| record.body.as_str()),
        }
    }

    /// Returns `true` for failures that happened below HTTP.
    pub fn is_connection_level(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::Connection | ErrorKind::ConnectionTimeout
        )
    }
}

/// A specialized `Result` type for transport calls.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    fn record(status: Option<u16>, body: &str) -> Box<ErrorRecord> {
        Box::new(ErrorRecord {
            status: status.map(|s| StatusCode::from_u16(s).unwrap()),
            body: body.to_string(),
            payload: None,
            url: "http://localhost:9200/idx".to_string(),
            duration: Duration::from_millis(12),
        })
    }

    #[test]
    fn test_status_and_raw_response() {
        let err = Error::Http {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            record: record(Some(500), "boom"),
        };
        assert_eq!(err.status(), Some(StatusCode::INTERNAL_SERVER_ERROR));
        assert_eq!(err.raw_response(), Some("boom"));
        assert_eq!(err.kind(), ErrorKind::Http);

        let err = Error::Connection {
            message: "connection refused".to_string(),
            record: record(None, ""),
        };
        assert_eq!(err.status(), None);
        assert_eq!(err.raw_response(), None);
        assert!(err.is_connection_level());
    }

    #[test]
    fn test_messages_are_readable() {
        let err = Error::HttpNotFound {
            record: record(Some(404), "nope"),
        };
        assert_eq!(err.to_string(), "URL 'http://localhost:9200/idx' not found");

        let err = Error::ConnectionTimeout {
            record: record(None, ""),
        };
        assert!(err.to_string().contains("timed out after 12ms"));

        let err = Error::Configuration("Base URL is required".to_string());
        assert!(err.record().is_none());
    }
}
