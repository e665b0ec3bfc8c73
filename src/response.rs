//! Successful responses and their decoded payloads.

use crate::{Error, Result};
use bytes::Bytes;
use http::{HeaderMap, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::time::Duration;

/// The decoded body of a successful response.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    /// No body.
    Empty,
    /// Outcome of a `HEAD` request.
    Exists(bool),
    Json(Value),
    Text(String),
    /// Binary content, or text in a charset that could not be decoded.
    Binary(Bytes),
}

impl Payload {
    pub fn as_json(&self) -> Option<&Value> {
        match self {
            Payload::Json(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Payload::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Payload::Empty)
    }
}

/// A successful response plus what it took to get it.
///
/// # Examples
///
/// ```no_run
/// use estransport::Transport;
///
/// # async fn example() -> Result<(), estransport::Error> {
/// let transport = Transport::builder()
///     .base_url("http://localhost:9200")?
///     .build()?;
///
/// let response = transport.get("/_cluster/health").await?;
/// println!("status: {}", response.status);
/// println!("took {:?} over {} attempt(s)", response.latency, response.attempts);
///
/// if let Some(health) = response.data.as_json() {
///     println!("cluster is {}", health["status"]);
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct Response<T> {
    pub data: T,

    /// The response body as received, lossily decoded for binary content.
    pub raw_body: String,

    pub status: StatusCode,

    /// Headers of the final response (after redirects).
    pub headers: HeaderMap,

    /// Time from the first attempt until the successful one completed.
    pub latency: Duration,

    /// Attempts made, `1` when the first one succeeded.
    pub attempts: usize,
}

impl<T> Response<T> {
    pub fn new(
        data: T,
        raw_body: String,
        status: StatusCode,
        headers: HeaderMap,
        latency: Duration,
        attempts: usize,
    ) -> Self {
        Self {
            data,
            raw_body,
            status,
            headers,
            latency,
            attempts,
        }
    }

    /// Transforms the data while keeping the response details.
    ///
    /// ```
    /// # use estransport::{Payload, Response};
    /// # use http::{HeaderMap, StatusCode};
    /// # use std::time::Duration;
    /// let response = Response::new(
    ///     Payload::Exists(true),
    ///     String::new(),
    ///     StatusCode::OK,
    ///     HeaderMap::new(),
    ///     Duration::from_millis(4),
    ///     1,
    /// );
    /// let exists = response.map(|payload| payload == Payload::Exists(true));
    /// assert!(exists.data);
    /// ```
    pub fn map<U, F>(self, f: F) -> Response<U>
    where
        F: FnOnce(T) -> U,
    {
        Response {
            data: f(self.data),
            raw_body: self.raw_body,
            status: self.status,
            headers: self.headers,
            latency: self.latency,
            attempts: self.attempts,
        }
    }

    pub fn was_retried(&self) -> bool {
        self.attempts > 1
    }

    /// Returns a header value by name, if it is valid text.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name)?.to_str().ok()
    }
}

impl Response<Payload> {
    /// Deserializes a JSON payload into `T`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Deserialization`] when the payload is not JSON or
    /// does not match `T`.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        let value = self.data.as_json().ok_or_else(|| Error::Deserialization {
            raw_response: self.raw_body.clone(),
            serde_error: "response payload is not JSON".to_string(),
            status: self.status,
        })?;
        serde_json::from_value(value.clone()).map_err(|e| Error::Deserialization {
            raw_response: self.raw_body.clone(),
            serde_error: e.to_string(),
            status: self.status,
        })
    }
}

impl<T> AsRef<T> for Response<T> {
    fn as_ref(&self) -> &T {
        &self.data
    }
}

impl<T> std::ops::Deref for Response<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &self.data
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    fn response(data: Payload, raw: &str) -> Response<Payload> {
        Response::new(
            data,
            raw.to_string(),
            StatusCode::OK,
            HeaderMap::new(),
            Duration::from_millis(10),
            2,
        )
    }

    #[derive(Debug, Deserialize, PartialEq)]
    struct Health {
        status: String,
        number_of_nodes: u32,
    }

    #[test]
    fn test_json_deserializes_payload() {
        let raw = r#"{"status":"green","number_of_nodes":3}"#;
        let resp = response(Payload::Json(serde_json::from_str(raw).unwrap()), raw);
        let health: Health = resp.json().unwrap();
        assert_eq!(
            health,
            Health {
                status: "green".to_string(),
                number_of_nodes: 3
            }
        );
        assert!(resp.was_retried());
    }

    #[test]
    fn test_json_on_wrong_shape_or_text() {
        let resp = response(Payload::Json(json!({"status": 1})), r#"{"status":1}"#);
        let err = resp.json::<Health>().unwrap_err();
        assert!(matches!(err, Error::Deserialization { ref raw_response, .. } if raw_response == r#"{"status":1}"#));

        let resp = response(Payload::Text("green".to_string()), "green");
        assert!(resp.json::<Value>().is_err());
        assert_eq!(resp.data.as_text(), Some("green"));
    }
}
