//! Request types and request shaping.

use crate::config::GetBodyStrategy;
use crate::{Error, Result};
use bytes::Bytes;
use http::header::CONTENT_TYPE;
use http::{HeaderMap, HeaderName, HeaderValue, Method};
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;

/// Query key carrying a per-call timeout, in seconds.
pub const REQUEST_TIMEOUT_PARAM: &str = "request_timeout";

/// Query key carrying statuses to accept as success.
pub const IGNORE_PARAM: &str = "ignore";

/// A request body, serialized when the request is sent.
#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    Json(Value),
    /// Newline-delimited JSON, as used by the bulk and multi-search APIs.
    NdJson(Vec<Value>),
    Text(String),
    Bytes(Bytes),
}

impl RequestBody {
    /// The `Content-Type` this body is sent with unless the caller set one.
    pub fn content_type(&self) -> &'static str {
        match self {
            RequestBody::Json(_) => "application/json",
            RequestBody::NdJson(_) => "application/x-ndjson",
            RequestBody::Text(_) => "text/plain",
            RequestBody::Bytes(_) => "application/octet-stream",
        }
    }

    /// Serializes the body.
    ///
    /// # Errors
    ///
    /// Returns a serialization error when a JSON value cannot be written.
    pub fn to_bytes(&self) -> Result<Bytes> {
        match self {
            RequestBody::Json(value) => serde_json::to_vec(value)
                .map(Bytes::from)
                .map_err(|e| Error::Serialization(e.to_string())),
            RequestBody::NdJson(lines) => {
                let mut out = Vec::new();
                for line in lines {
                    serde_json::to_writer(&mut out, line)
                        .map_err(|e| Error::Serialization(e.to_string()))?;
                    out.push(b'\n');
                }
                Ok(Bytes::from(out))
            }
            RequestBody::Text(text) => Ok(Bytes::copy_from_slice(text.as_bytes())),
            RequestBody::Bytes(bytes) => Ok(bytes.clone()),
        }
    }
}

impl From<Value> for RequestBody {
    fn from(value: Value) -> Self {
        RequestBody::Json(value)
    }
}

impl From<String> for RequestBody {
    fn from(text: String) -> Self {
        RequestBody::Text(text)
    }
}

impl From<&str> for RequestBody {
    fn from(text: &str) -> Self {
        RequestBody::Text(text.to_string())
    }
}

impl From<Bytes> for RequestBody {
    fn from(bytes: Bytes) -> Self {
        RequestBody::Bytes(bytes)
    }
}

/// A logical request, relative to a node URL.
///
/// Retries reuse the same request; each attempt becomes its own transfer.
///
/// # Examples
///
/// ```
/// use estransport::Request;
/// use serde_json::json;
///
/// let request = Request::post("/my-index/_search")
///     .with_query_param("size", "10")
///     .with_query_param("request_timeout", "2.5")
///     .with_body(json!({"query": {"match_all": {}}}));
/// assert_eq!(request.query.len(), 2);
/// ```
#[derive(Debug, Clone)]
pub struct Request {
    pub method: Method,
    /// Path relative to the node URL.
    pub path: String,
    pub headers: HeaderMap,
    /// Query parameters, in order. May contain `request_timeout` and `ignore`.
    pub query: Vec<(String, String)>,
    pub body: Option<RequestBody>,
    /// Overrides the transport timeout for this call.
    pub timeout: Option<Duration>,
    /// Statuses accepted as success in addition to 2xx.
    pub ignore: Vec<u16>,
}

impl Request {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            headers: HeaderMap::new(),
            query: Vec::new(),
            body: None,
            timeout: None,
            ignore: Vec::new(),
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn head(path: impl Into<String>) -> Self {
        Self::new(Method::HEAD, path)
    }

    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::PUT, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    /// Adds a header to the request.
    ///
    /// # Errors
    ///
    /// Returns an error if the header name or value is invalid.
    pub fn with_header(mut self, name: impl AsRef<str>, value: impl AsRef<str>) -> Result<Self> {
        let name = HeaderName::try_from(name.as_ref())
            .map_err(|e| Error::InvalidRequest(format!("Invalid header name: {e}")))?;
        let value = HeaderValue::try_from(value.as_ref())
            .map_err(|e| Error::InvalidRequest(format!("Invalid header value: {e}")))?;
        self.headers.insert(name, value);
        Ok(self)
    }

    /// Appends a query parameter.
    pub fn with_query_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    /// Appends several query parameters, keeping their order.
    pub fn with_query_params(mut self, params: impl IntoIterator<Item = (String, String)>) -> Self {
        self.query.extend(params);
        self
    }

    pub fn with_body(mut self, body: impl Into<RequestBody>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Serializes `value` as the JSON body.
    ///
    /// # Errors
    ///
    /// Returns a serialization error if `value` cannot be represented as JSON.
    pub fn with_json<T: Serialize + ?Sized>(self, value: &T) -> Result<Self> {
        let value = serde_json::to_value(value).map_err(|e| Error::Serialization(e.to_string()))?;
        Ok(self.with_body(RequestBody::Json(value)))
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_ignore(mut self, statuses: impl IntoIterator<Item = u16>) -> Self {
        self.ignore.extend(statuses);
        self
    }

    /// Produces the wire form of this request.
    ///
    /// Control query parameters are removed and applied; the body is
    /// serialized and given a `Content-Type` unless one is set. A `GET` or
    /// `HEAD` with a non-empty body is handled according to `strategy`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidRequest`] for malformed control parameters or a
    /// body the strategy refuses, and [`Error::Serialization`] for bodies that
    /// cannot be serialized.
    pub fn normalize(self, strategy: GetBodyStrategy) -> Result<NormalizedRequest> {
        let mut timeout = self.timeout;
        let mut ignore = self.ignore;
        let mut query = Vec::with_capacity(self.query.len());
        for (key, value) in self.query {
            match key.as_str() {
                REQUEST_TIMEOUT_PARAM => timeout = Some(parse_timeout(&value)?),
                IGNORE_PARAM => ignore.extend(parse_ignore(&value)?),
                _ => query.push((key, value)),
            }
        }

        let mut method = self.method;
        let mut headers = self.headers;
        let mut payload = None;

        if let Some(body) = self.body {
            let bytes = body.to_bytes()?;
            let bodiless = method == Method::GET || method == Method::HEAD;
            if !bytes.is_empty() {
                match (bodiless, strategy) {
                    (false, _) | (true, GetBodyStrategy::Post) => {
                        if bodiless {
                            tracing::debug!(path = %self.path, "Sending {method} with a body as POST");
                            method = Method::POST;
                        }
                        if !headers.contains_key(CONTENT_TYPE) {
                            headers.insert(CONTENT_TYPE, HeaderValue::from_static(body.content_type()));
                        }
                        payload = Some(bytes);
                    }
                    (true, GetBodyStrategy::Source) => {
                        let source = String::from_utf8(bytes.to_vec()).map_err(|_| {
                            Error::InvalidRequest("binary body cannot be sent as source".to_string())
                        })?;
                        let content_type = headers
                            .get(CONTENT_TYPE)
                            .and_then(|value| value.to_str().ok())
                            .unwrap_or(body.content_type())
                            .to_string();
                        headers.remove(CONTENT_TYPE);
                        query.push(("source".to_string(), source));
                        query.push(("source_content_type".to_string(), content_type));
                    }
                    (true, GetBodyStrategy::Reject) => {
                        return Err(Error::InvalidRequest(format!(
                            "{method} {} must not carry a body",
                            self.path
                        )));
                    }
                }
            }
        }

        Ok(NormalizedRequest {
            method,
            path: self.path,
            headers,
            query,
            body: payload,
            timeout,
            ignore,
        })
    }
}

/// A request after control parameters and body handling were applied.
#[derive(Debug, Clone)]
pub struct NormalizedRequest {
    pub method: Method,
    pub path: String,
    pub headers: HeaderMap,
    /// Query parameters to transmit.
    pub query: Vec<(String, String)>,
    pub body: Option<Bytes>,
    pub timeout: Option<Duration>,
    pub ignore: Vec<u16>,
}

fn parse_timeout(value: &str) -> Result<Duration> {
    value
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|secs| *secs > 0.0)
        .and_then(|secs| Duration::try_from_secs_f64(secs).ok())
        .ok_or_else(|| {
            Error::InvalidRequest(format!(
                "{REQUEST_TIMEOUT_PARAM} must be a positive number of seconds, got '{value}'"
            ))
        })
}

fn parse_ignore(value: &str) -> Result<Vec<u16>> {
    value
        .split(',')
        .map(str::trim)
        .filter(|code| !code.is_empty())
        .map(|code| {
            code.parse::<u16>().map_err(|_| {
                Error::InvalidRequest(format!("{IGNORE_PARAM} expects status codes, got '{code}'"))
            })
        })
        .collect()
}
