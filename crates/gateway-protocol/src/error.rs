use gateway_core::HttpError;
use http::StatusCode;

/// Which phase of the conversion a `ConvertError` was raised in. Carried
/// separately from the message so callers can decide whether to retry
/// (never, for this kind of error) or just log.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Request,
    Response,
    Streaming,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::Request => "request",
            Self::Response => "response",
            Self::Streaming => "streaming",
        };
        f.write_str(label)
    }
}

#[derive(Debug, thiserror::Error)]
#[error("{stage} conversion failed: {message}")]
pub struct ConvertError {
    pub stage: Stage,
    pub message: String,
}

impl ConvertError {
    #[must_use]
    pub fn new(stage: Stage, message: impl Into<String>) -> Self {
        Self { stage, message: message.into() }
    }
}

impl HttpError for ConvertError {
    fn status_code(&self) -> StatusCode {
        StatusCode::INTERNAL_SERVER_ERROR
    }

    fn error_type(&self) -> &str {
        "api_error"
    }

    fn client_message(&self) -> String {
        "an internal error occurred while translating the upstream response".to_owned()
    }
}
