//! Maps transfer failures onto the [`Error`] taxonomy.

use crate::connection::{EngineErrorKind, HttpFailure, TransferFailure};
use crate::{Error, ErrorRecord};
use serde_json::Value;

/// Classifies a failed transfer.
///
/// Pure: the same failure always yields an equal error. HTTP bodies are
/// inspected as JSON when they parse to an object; anything else is treated
/// as an opaque body.
pub fn classify(failure: &TransferFailure) -> Error {
    match failure {
        TransferFailure::Closed => Error::Closed,
        TransferFailure::Engine(engine) => {
            let record = Box::new(ErrorRecord {
                status: None,
                body: String::new(),
                payload: None,
                url: engine.url.clone(),
                duration: engine.duration,
            });
            match engine.kind {
                EngineErrorKind::Timeout => Error::ConnectionTimeout { record },
                _ => Error::Connection {
                    message: engine.message.clone(),
                    record,
                },
            }
        }
        TransferFailure::Http(http) => classify_http(http),
    }
}

fn classify_http(failure: &HttpFailure) -> Error {
    let payload = serde_json::from_str::<Value>(&failure.body)
        .ok()
        .filter(Value::is_object);
    let record = Box::new(ErrorRecord {
        status: Some(failure.status),
        body: failure.body.clone(),
        payload: payload.clone(),
        url: failure.url.clone(),
        duration: failure.duration,
    });

    let failures = payload
        .as_ref()
        .and_then(|p| p.get("failures"))
        .and_then(Value::as_array);
    if let Some(first) = failures.and_then(|f| f.first()) {
        return Error::Batch {
            count: failures.map_or(0, Vec::len),
            first: first.clone(),
            record,
        };
    }

    match (failure.status.as_u16(), payload.as_ref()) {
        (401, _) => Error::Authentication { record },
        (403, _) => Error::Authorization { record },
        (404, Some(payload)) => Error::NotFound {
            message: not_found_message(payload),
            record,
        },
        (404, None) => Error::HttpNotFound { record },
        (409, _) => Error::Conflict {
            failures: failures.cloned().unwrap_or_default(),
            record,
        },
        (502, None) => Error::Proxy { record },
        (_, Some(payload)) if is_script_error(payload) => {
            let error = payload.get("error");
            let reason = error
                .and_then(|e| e.pointer("/caused_by/reason"))
                .or_else(|| error.and_then(|e| e.get("reason")))
                .map(text)
                .unwrap_or_else(|| "script error".to_string());
            Error::Script {
                reason,
                script_stack: script_stack(payload),
                record,
            }
        }
        (400..=499, Some(payload)) => Error::Request {
            reason: request_reason(payload, &failure.body),
            record,
        },
        _ => Error::Http {
            status: failure.status,
            record,
        },
    }
}

fn text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Array(items) => items.iter().map(text).collect::<Vec<_>>().join(","),
        other => other.to_string(),
    }
}

fn not_found_message(payload: &Value) -> String {
    if let Some(resource) = payload.pointer("/error/resource.id") {
        return format!("Resource '{}' not found", text(resource));
    }
    match (payload.get("_index"), payload.get("_id")) {
        (Some(index), Some(id)) => format!("Document '{}/{}' not found", text(index), text(id)),
        _ => "Resource not found".to_string(),
    }
}

fn root_causes(error: &Value) -> impl Iterator<Item = &Value> {
    error
        .get("root_cause")
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
}

fn is_script_error(payload: &Value) -> bool {
    let Some(error) = payload.get("error").filter(|e| e.is_object()) else {
        return false;
    };
    let is_script_type = |v: &Value| v.get("type").and_then(Value::as_str) == Some("script_exception");
    is_script_type(error) || root_causes(error).any(is_script_type) || error.get("script_stack").is_some()
}

fn script_stack(payload: &Value) -> Vec<String> {
    let Some(error) = payload.get("error") else {
        return Vec::new();
    };
    error
        .get("script_stack")
        .or_else(|| root_causes(error).find_map(|cause| cause.get("script_stack")))
        .and_then(Value::as_array)
        .map(|lines| lines.iter().map(text).collect())
        .unwrap_or_default()
}

fn request_reason(payload: &Value, body: &str) -> String {
    let error = payload.get("error");
    if let Some(reason) = error.and_then(|e| e.get("reason")) {
        return text(reason);
    }
    if let Some(reason) = error
        .and_then(|e| root_causes(e).next())
        .and_then(|cause| cause.get("reason"))
    {
        return text(reason);
    }
    match error {
        Some(Value::String(message)) => message.clone(),
        _ => body.to_string(),
    }
}
