//! Core types shared by the request and response pipelines.

use http::Method;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Wrapper key used for non-object response bodies unless configured otherwise.
pub const DEFAULT_PAYLOAD_KEY: &str = "$key";

/// Returns the JSON type name for error messages.
pub fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Direction of the exchange a model applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Request,
    Response,
}

impl Direction {
    /// Returns the prefix used when naming compiled models.
    pub fn model_prefix(&self) -> &'static str {
        match self {
            Direction::Request => "request",
            Direction::Response => "response",
        }
    }

    /// Create direction from a request flag (true = Request, false = Response).
    pub fn from_request_flag(is_request: bool) -> Self {
        if is_request {
            Direction::Request
        } else {
            Direction::Response
        }
    }
}

/// Where the inbound payload lives for a given HTTP method.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadSource {
    /// Mutating methods (POST, PUT, PATCH) carry their payload in the body.
    Body,
    /// Read and delete methods (GET, DELETE) carry it in the query string.
    Query,
}

impl PayloadSource {
    /// Returns `None` for methods with no defined payload handling.
    pub fn for_method(method: &Method) -> Option<Self> {
        if *method == Method::POST || *method == Method::PUT || *method == Method::PATCH {
            Some(PayloadSource::Body)
        } else if *method == Method::GET || *method == Method::DELETE {
            Some(PayloadSource::Query)
        } else {
            None
        }
    }
}
