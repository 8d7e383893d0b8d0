use gateway_core::HttpError;
use http::StatusCode;

use crate::FailedAttempt;

#[derive(Debug, thiserror::Error)]
pub enum FailoverError {
    #[error("no available providers")]
    NoCandidates,
    #[error("all providers unavailable or in cooldown")]
    AllUnavailable { failed: Vec<FailedAttempt> },
    #[error("selected provider unavailable and failover disabled")]
    FailoverDisabled,
}

impl HttpError for FailoverError {
    fn status_code(&self) -> StatusCode {
        StatusCode::SERVICE_UNAVAILABLE
    }

    fn error_type(&self) -> &str {
        "overloaded_error"
    }

    fn client_message(&self) -> String {
        self.to_string()
    }
}
