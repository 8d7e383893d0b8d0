use http::StatusCode;
use serde_json::{Value, json};

use crate::dialect::Dialect;

/// Trait for domain errors that can be converted to HTTP responses.
///
/// Implemented by each component's error type. The proxy handler converts
/// these into actual HTTP responses, keeping domain errors decoupled from
/// axum and from the caller's request dialect.
pub trait HttpError: std::error::Error {
    /// HTTP status code for this error.
    fn status_code(&self) -> StatusCode;

    /// Machine-readable error type (e.g. `not_found_error`).
    fn error_type(&self) -> &str;

    /// Message safe to expose to API consumers.
    fn client_message(&self) -> String;

    /// Render the dialect-appropriate error body for this error.
    fn to_body(&self, dialect: Dialect) -> Value {
        match dialect {
            Dialect::OpenAi => json!({
                "error": {
                    "message": self.client_message(),
                    "type": self.error_type(),
                    "code": Value::Null,
                }
            }),
            Dialect::Claude => json!({
                "type": "error",
                "error": {
                    "type": self.error_type(),
                    "message": self.client_message(),
                }
            }),
        }
    }
}
