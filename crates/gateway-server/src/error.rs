use gateway_core::HttpError;
use http::StatusCode;

#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("missing or empty `model` field")]
    MissingModel,
    #[error("request body is not a JSON object")]
    InvalidBody,
    #[error(transparent)]
    Resolver(#[from] gateway_resolver::ResolverError),
    #[error(transparent)]
    Failover(#[from] gateway_failover::FailoverError),
    #[error(transparent)]
    Convert(#[from] gateway_protocol::ConvertError),
    #[error("upstream request failed: {0}")]
    UpstreamNetwork(String),
    #[error("internal error: {0}")]
    Internal(String),
}

impl HttpError for ServerError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::MissingModel | Self::InvalidBody => StatusCode::BAD_REQUEST,
            Self::Resolver(e) => e.status_code(),
            Self::Failover(e) => e.status_code(),
            Self::Convert(e) => e.status_code(),
            Self::UpstreamNetwork(_) => StatusCode::BAD_GATEWAY,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_type(&self) -> &str {
        match self {
            Self::MissingModel | Self::InvalidBody => "invalid_request_error",
            Self::Resolver(e) => e.error_type(),
            Self::Failover(e) => e.error_type(),
            Self::Convert(e) => e.error_type(),
            Self::UpstreamNetwork(_) => "api_error",
            Self::Internal(_) => "api_error",
        }
    }

    fn client_message(&self) -> String {
        match self {
            Self::Resolver(e) => e.client_message(),
            Self::Failover(e) => e.client_message(),
            Self::Convert(e) => e.client_message(),
            other => other.to_string(),
        }
    }
}
