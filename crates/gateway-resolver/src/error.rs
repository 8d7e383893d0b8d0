use gateway_core::HttpError;
use http::StatusCode;

#[derive(Debug, thiserror::Error)]
pub enum ResolverError {
    #[error("model not found: {model}")]
    ModelNotFound { model: String },
    #[error("no available providers for model: {model}")]
    NoAvailableProviders { model: String },
    #[error("mapping disabled")]
    MappingDisabled,
    #[error("router internal error: {0}")]
    RouterInternal(String),
}

impl HttpError for ResolverError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::ModelNotFound { .. } => StatusCode::NOT_FOUND,
            Self::NoAvailableProviders { .. } => StatusCode::SERVICE_UNAVAILABLE,
            Self::MappingDisabled => StatusCode::NOT_FOUND,
            Self::RouterInternal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_type(&self) -> &str {
        match self {
            Self::ModelNotFound { .. } => "not_found_error",
            Self::NoAvailableProviders { .. } => "overloaded_error",
            Self::MappingDisabled => "not_found_error",
            Self::RouterInternal(_) => "internal_error",
        }
    }

    fn client_message(&self) -> String {
        match self {
            Self::RouterInternal(_) => "an internal error occurred".to_owned(),
            other => other.to_string(),
        }
    }
}
