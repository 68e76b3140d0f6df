//! Error types for the feature service client.
//!
//! # Design
//! The four variants correspond to the four places a call can go wrong:
//! construction (`Configuration`), the HTTP round-trip (`Transport`), the
//! response body (`Parse`) and the service itself (`Api`). `Api` keeps the
//! service's `error` value untouched so callers can inspect codes and details.

use serde_json::Value;
use thiserror::Error;

/// Message reported when a config identifies neither a URL nor a full
/// catalog/service/type triple.
pub const MISSING_IDENTIFICATION: &str = "Must provide at least a feature service \"catalog\", \"service\" and \"type\", or a \"url\" to a feature service or feature layer";

/// Errors delivered by the feature service client.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ServiceError {
    /// The client config cannot identify a feature service.
    #[error("{0}")]
    Configuration(String),

    /// The HTTP round-trip failed (connection, DNS, TLS, ...).
    #[error("{0}")]
    Transport(String),

    /// The response body is not valid JSON.
    ///
    /// `transport` carries a transport error that was reported alongside the
    /// unparseable body, if any.
    #[error("Error parsing JSON in Feature Service response: {detail}")]
    Parse {
        detail: String,
        transport: Option<String>,
    },

    /// The response parsed but carried an `error` field.
    #[error("{}", api_message(.0))]
    Api(Value),
}

impl ServiceError {
    pub(crate) fn missing_identification() -> Self {
        ServiceError::Configuration(MISSING_IDENTIFICATION.to_string())
    }

    /// The numeric `code` of an API error object, when the service sent one.
    pub fn api_code(&self) -> Option<i64> {
        match self {
            ServiceError::Api(value) => value.get("code").and_then(Value::as_i64),
            _ => None,
        }
    }
}

/// Render an API error value as text: strings verbatim, objects by their
/// `message` (prefixed with `code` when present), anything else as JSON.
fn api_message(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Object(map) => match (map.get("code"), map.get("message").and_then(Value::as_str)) {
            (Some(code), Some(message)) => format!("{code}: {message}"),
            (None, Some(message)) => message.to_string(),
            _ => value.to_string(),
        },
        other => other.to_string(),
    }
}
