//! Response normalization.
//!
//! Every call ends in exactly one `Completion`. The body decides first: an
//! unparseable body wins over everything, then a service-reported `error`
//! field, and only then does the transport error (if any) surface, paired
//! with the parsed body.

use serde_json::Value;
use tracing::{debug, warn};

use crate::error::ServiceError;
use crate::http::Exchange;

/// Payload handed back with a completion.
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseData {
    /// The parsed response body.
    Json(Value),
    /// The raw body, returned when it could not be parsed.
    Raw(String),
}

impl ResponseData {
    pub fn as_json(&self) -> Option<&Value> {
        match self {
            ResponseData::Json(value) => Some(value),
            ResponseData::Raw(_) => None,
        }
    }
}

/// The `(error, data)` pair delivered once per call.
#[derive(Debug, Clone, PartialEq)]
pub struct Completion {
    pub error: Option<ServiceError>,
    pub data: Option<ResponseData>,
}

impl Completion {
    pub fn into_parts(self) -> (Option<ServiceError>, Option<ResponseData>) {
        (self.error, self.data)
    }

    /// Collapse to a `Result`, dropping any data that accompanied an error.
    pub fn into_result(self) -> Result<Value, ServiceError> {
        match (self.error, self.data) {
            (Some(err), _) => Err(err),
            (None, Some(ResponseData::Json(value))) => Ok(value),
            (None, Some(ResponseData::Raw(body))) => Ok(Value::String(body)),
            (None, None) => Ok(Value::Null),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

/// Turn a raw exchange into a completion.
pub fn normalize(exchange: &Exchange) -> Completion {
    normalize_parts(exchange.transport_error.as_deref(), exchange.body())
}

/// Normalize a transport error and body. A missing body is parsed as empty
/// input, so a bare transport failure reports as a parse error that carries
/// the transport error along, with no data.
pub fn normalize_parts(transport_error: Option<&str>, body: Option<&str>) -> Completion {
    let raw = body.unwrap_or_default();

    let parsed: Value = match serde_json::from_str(raw) {
        Ok(value) => value,
        Err(e) => {
            if let Some(transport) = transport_error {
                warn!(%transport, "transport error masked by unparseable response body");
            }
            return Completion {
                error: Some(ServiceError::Parse {
                    detail: e.to_string(),
                    transport: transport_error.map(str::to_string),
                }),
                data: body.map(|b| ResponseData::Raw(b.to_string())),
            };
        }
    };

    if let Some(api_error) = parsed.get("error").filter(|e| is_reported(e)) {
        debug!(error = %api_error, "feature service reported an error");
        return Completion {
            error: Some(ServiceError::Api(api_error.clone())),
            data: None,
        };
    }

    Completion {
        error: transport_error.map(|e| ServiceError::Transport(e.to_string())),
        data: Some(ResponseData::Json(parsed)),
    }
}

/// An `error` field only counts when it holds something; `null`, `false`,
/// `0` and `""` are treated as no error.
fn is_reported(error: &Value) -> bool {
    match error {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}
