//! Failure records: the uniform shape of every rejection.
//!
//! | Code | Raised when |
//! |------|-------------|
//! | `ACLx001` | authorization denied |
//! | `ACLx002` | authorization misconfigured or returned an invalid shape |
//! | `REQx001` | inbound payload failed validation |
//! | `REQx002` | inbound method has no defined handling (hook configured) |
//! | `RESx001` | outbound payload failed validation |
//! | `SCHEMAx001` | no response model for the outbound status |
//!
//! Application code may report its own outcomes in the same shape with
//! [`Failure::custom`] (conventionally `AUTHx004`, `ERRORx001`, ...).

use std::error::Error as StdError;
use std::fmt;
use std::sync::Arc;

use serde::{Serialize, Serializer};

use crate::error::ValidationError;
use crate::exchange::{Exchange, Next};
use crate::options::Hook;

/// Stable failure codes.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FailureCode {
    AccessDenied,
    AccessMisconfigured,
    RequestInvalid,
    MethodUnsupported,
    ResponseInvalid,
    SchemaNotFound,
    /// Caller-defined code.
    Custom(String),
}

impl FailureCode {
    pub fn as_str(&self) -> &str {
        match self {
            FailureCode::AccessDenied => "ACLx001",
            FailureCode::AccessMisconfigured => "ACLx002",
            FailureCode::RequestInvalid => "REQx001",
            FailureCode::MethodUnsupported => "REQx002",
            FailureCode::ResponseInvalid => "RESx001",
            FailureCode::SchemaNotFound => "SCHEMAx001",
            FailureCode::Custom(code) => code,
        }
    }
}

impl fmt::Display for FailureCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for FailureCode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// Underlying cause attached to a failure.
pub type Cause = Arc<dyn StdError + Send + Sync>;

/// `{code, message, fields?, error?, statusCode?}`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Failure {
    pub code: FailureCode,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fields: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none", serialize_with = "serialize_cause")]
    pub error: Option<Cause>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_code: Option<u16>,
}

fn serialize_cause<S: Serializer>(cause: &Option<Cause>, serializer: S) -> Result<S::Ok, S::Error> {
    match cause {
        Some(cause) => serializer.serialize_str(&cause.to_string()),
        None => serializer.serialize_none(),
    }
}

impl Failure {
    fn new(code: FailureCode, message: &str) -> Self {
        Self {
            code,
            message: message.to_string(),
            fields: None,
            error: None,
            status_code: None,
        }
    }

    pub fn access_denied() -> Self {
        Self::new(FailureCode::AccessDenied, "Access denied.")
    }

    pub fn auth_not_callable() -> Self {
        Self::new(
            FailureCode::AccessMisconfigured,
            "Auth parameter must be a function.",
        )
    }

    pub fn auth_invalid_result() -> Self {
        Self::new(
            FailureCode::AccessMisconfigured,
            "Return type must be a boolean or object.",
        )
    }

    pub fn request_invalid(error: ValidationError) -> Self {
        Self::with_validation(FailureCode::RequestInvalid, "Request validation failed.", error)
    }

    pub fn method_unsupported() -> Self {
        Self::new(FailureCode::MethodUnsupported, "Invalid request method.")
    }

    pub fn response_invalid(error: ValidationError) -> Self {
        Self::with_validation(
            FailureCode::ResponseInvalid,
            "Response validation failed.",
            error,
        )
    }

    pub fn schema_not_found(status: u16) -> Self {
        Self {
            status_code: Some(status),
            ..Self::new(FailureCode::SchemaNotFound, "Response schema not found.")
        }
    }

    /// A caller-defined failure in the same shape.
    pub fn custom(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: FailureCode::Custom(code.into()),
            message: message.into(),
            fields: None,
            error: None,
            status_code: None,
        }
    }

    fn with_validation(code: FailureCode, message: &str, error: ValidationError) -> Self {
        Self {
            fields: Some(error.fields()),
            error: Some(Arc::new(error)),
            ..Self::new(code, message)
        }
    }
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

/// Hand `failure` to `hook` if one is configured, else to the error continuation.
pub(crate) async fn report(
    hook: Option<&Hook>,
    exchange: &mut Exchange,
    next: &dyn Next,
    failure: Failure,
) {
    tracing::debug!(
        code = %failure.code,
        fields = ?failure.fields,
        hooked = hook.is_some(),
        "contract failure"
    );
    match hook {
        Some(hook) => hook(exchange, failure),
        None => next.fail(exchange, failure).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FieldError;
    use serde_json::json;

    #[test]
    fn codes() {
        assert_eq!(Failure::access_denied().code.as_str(), "ACLx001");
        assert_eq!(Failure::auth_not_callable().code.as_str(), "ACLx002");
        assert_eq!(Failure::auth_invalid_result().code.as_str(), "ACLx002");
        assert_eq!(Failure::method_unsupported().code.as_str(), "REQx002");
        assert_eq!(Failure::schema_not_found(500).code.as_str(), "SCHEMAx001");
        assert_eq!(Failure::custom("AUTHx004", "Token expired").code.as_str(), "AUTHx004");
    }

    #[test]
    fn serializes_minimal_shape() {
        let value = serde_json::to_value(Failure::access_denied()).unwrap();
        assert_eq!(value, json!({ "code": "ACLx001", "message": "Access denied." }));
    }

    #[test]
    fn serializes_status_code() {
        let value = serde_json::to_value(Failure::schema_not_found(500)).unwrap();
        assert_eq!(
            value,
            json!({
                "code": "SCHEMAx001",
                "message": "Response schema not found.",
                "statusCode": 500
            })
        );
    }

    #[test]
    fn validation_failure_carries_fields_and_cause() {
        let failure = Failure::request_invalid(ValidationError {
            errors: vec![FieldError {
                path: "name".into(),
                message: "Path `name` is required.".into(),
            }],
        });

        assert_eq!(failure.fields.as_deref(), Some(&["name".to_string()][..]));
        let value = serde_json::to_value(&failure).unwrap();
        assert_eq!(value["code"], "REQx001");
        assert_eq!(value["fields"], json!(["name"]));
        assert_eq!(
            value["error"],
            "validation failed: name: Path `name` is required."
        );
        assert_eq!(failure.to_string(), "REQx001: Request validation failed.");
    }
}
