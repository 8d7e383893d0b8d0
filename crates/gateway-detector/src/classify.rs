use crate::FailureKind;

/// Everything the classifier needs to know about one upstream attempt. The
/// proxy handler builds this from whatever HTTP client error/response it
/// actually has; the detector never sees a `reqwest::Error` directly so it
/// stays free of an HTTP-client dependency.
#[derive(Debug, Clone, Default)]
pub struct ClassifyInput {
    /// Set when the attempt failed before a response was received.
    pub error_message: Option<String>,
    /// The transport layer's own timeout signal, if it has one more
    /// specific than the error message (e.g. `reqwest::Error::is_timeout`).
    pub is_timeout: bool,
    /// The transport layer's own connect-failure signal.
    pub is_connect: bool,
    /// The upstream's HTTP status, when a response was received at all.
    pub status: Option<u16>,
}

impl ClassifyInput {
    #[must_use]
    pub fn from_error(message: impl Into<String>, is_timeout: bool, is_connect: bool) -> Self {
        Self {
            error_message: Some(message.into()),
            is_timeout,
            is_connect,
            status: None,
        }
    }

    #[must_use]
    pub const fn from_status(status: u16) -> Self {
        Self {
            error_message: None,
            is_timeout: false,
            is_connect: false,
            status: Some(status),
        }
    }
}

const TIMEOUT_NEEDLES: [&str; 3] = ["timeout", "timed out", "deadline exceeded"];
const CONNECTION_NEEDLES: [&str; 7] = [
    "connection refused",
    "connection reset",
    "dial",
    "dns",
    "unreachable",
    "broken pipe",
    "read: connection",
];

/// Whether this attempt counts as a failure at all.
#[must_use]
pub fn classify(input: &ClassifyInput) -> bool {
    kind(input).is_some()
}

/// The failure kind for this attempt, in classification-rule order. `None`
/// means the attempt was not a failure.
#[must_use]
pub fn kind(input: &ClassifyInput) -> Option<FailureKind> {
    if input.is_timeout {
        return Some(FailureKind::Timeout);
    }
    if let Some(message) = &input.error_message {
        let lowered = message.to_ascii_lowercase();
        if TIMEOUT_NEEDLES.iter().any(|needle| lowered.contains(needle)) {
            return Some(FailureKind::Timeout);
        }
        if input.is_connect || CONNECTION_NEEDLES.iter().any(|needle| lowered.contains(needle)) {
            return Some(FailureKind::Connection);
        }
        return Some(FailureKind::Unknown);
    }

    match input.status {
        Some(status) if (500..600).contains(&status) => Some(FailureKind::ServerError),
        Some(429) => Some(FailureKind::RateLimit),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transport_timeout_flag_wins_first() {
        let input = ClassifyInput::from_error("connection refused", true, false);
        assert_eq!(kind(&input), Some(FailureKind::Timeout));
    }

    #[test]
    fn message_timeout_needle_is_detected() {
        let input = ClassifyInput::from_error("operation timed out after 30s", false, false);
        assert_eq!(kind(&input), Some(FailureKind::Timeout));
    }

    #[test]
    fn connection_error_detected_by_flag_or_message() {
        assert_eq!(
            kind(&ClassifyInput::from_error("boom", false, true)),
            Some(FailureKind::Connection)
        );
        assert_eq!(
            kind(&ClassifyInput::from_error("dial tcp: connection refused", false, false)),
            Some(FailureKind::Connection)
        );
    }

    #[test]
    fn unrecognized_error_is_unknown() {
        let input = ClassifyInput::from_error("something strange happened", false, false);
        assert_eq!(kind(&input), Some(FailureKind::Unknown));
    }

    #[test]
    fn server_error_status_range() {
        assert_eq!(kind(&ClassifyInput::from_status(500)), Some(FailureKind::ServerError));
        assert_eq!(kind(&ClassifyInput::from_status(599)), Some(FailureKind::ServerError));
        assert_eq!(kind(&ClassifyInput::from_status(600)), None);
    }

    #[test]
    fn rate_limit_status() {
        assert_eq!(kind(&ClassifyInput::from_status(429)), Some(FailureKind::RateLimit));
    }

    #[test]
    fn success_status_is_not_a_failure() {
        assert_eq!(kind(&ClassifyInput::from_status(200)), None);
        assert!(!classify(&ClassifyInput::from_status(200)));
    }
}
