use serde_json::Error as JsonError;

/// Errors raised by the conversation engine.
///
/// Cloneable so a single failure can be both emitted to listeners and
/// returned from [`Turn::start`](super::Turn::start).
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum AIError {
    #[error("{0} is required")]
    MissingCredential(&'static str),
    #[error("Invalid adapter: '{name}' Valid adapters: {valid}")]
    UnknownAdapter { name: String, valid: String },
    #[error("Invalid API key: {0}")]
    InvalidCredential(String),

    #[error("Malformed payload: {0}")]
    MalformedPayload(String),
    #[error("Unexpected payload shape: {0}")]
    UnexpectedPayload(String),

    #[error("Network error: {0}")]
    NetworkError(String),
    #[error("Authentication error: {0}")]
    AuthenticationError(String),
    #[error("Rate limit error: {0}")]
    RateLimitError(String),
    #[error("API error {status}: {body}")]
    APIError { status: u16, body: String },
    #[error("Backend error ({kind}): {message}")]
    BackendError { kind: String, message: String },
    #[error("Response has no body")]
    MissingBody,
    #[error("Stream interrupted: {0}")]
    StreamInterrupted(String),

    #[error("Turn already started")]
    TurnAlreadyStarted,
    #[error("Turn was dropped before it was started")]
    TurnAbandoned,
    #[error("Cancelled")]
    Cancelled,
    #[error("Cannot generate content, conversation ended")]
    ConversationEnded,
    #[error("Invalid transition: {0}")]
    InvalidTransition(&'static str),
}

impl AIError {
    /// Per-payload problems are reported and skipped; everything else ends
    /// the turn.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::MalformedPayload(_) | Self::UnexpectedPayload(_))
    }

    /// Configuration problems are detected before any network call.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::MissingCredential(_) | Self::UnknownAdapter { .. } | Self::InvalidCredential(_)
        )
    }

    /// Classify a non-success HTTP status.
    pub fn from_status(status: u16, body: String) -> Self {
        match status {
            401 | 403 => Self::AuthenticationError(body),
            429 => Self::RateLimitError(body),
            _ => Self::APIError { status, body },
        }
    }

    /// Classify an error event reported inside a response stream.
    pub fn from_stream_error(kind: &str, message: String) -> Self {
        match kind {
            "authentication_error" | "permission_error" => Self::AuthenticationError(message),
            "rate_limit_error" => Self::RateLimitError(message),
            _ => Self::BackendError {
                kind: kind.to_string(),
                message,
            },
        }
    }
}

impl From<JsonError> for AIError {
    fn from(error: JsonError) -> Self {
        AIError::MalformedPayload(error.to_string())
    }
}

impl From<reqwest::Error> for AIError {
    fn from(error: reqwest::Error) -> Self {
        AIError::NetworkError(error.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recoverable_classification() {
        assert!(AIError::MalformedPayload("x".into()).is_recoverable());
        assert!(AIError::UnexpectedPayload("x".into()).is_recoverable());
        assert!(!AIError::StreamInterrupted("eof".into()).is_recoverable());
        assert!(!AIError::MissingBody.is_recoverable());
    }

    #[test]
    fn status_classification() {
        assert!(matches!(
            AIError::from_status(401, "nope".into()),
            AIError::AuthenticationError(_)
        ));
        assert!(matches!(
            AIError::from_status(429, String::new()),
            AIError::RateLimitError(_)
        ));
        assert_eq!(
            AIError::from_status(500, "boom".into()).to_string(),
            "API error 500: boom"
        );
    }

    #[test]
    fn stream_error_classification() {
        assert!(matches!(
            AIError::from_stream_error("rate_limit_error", "slow down".into()),
            AIError::RateLimitError(_)
        ));
        let err = AIError::from_stream_error("overloaded_error", "Overloaded".into());
        assert_eq!(err.to_string(), "Backend error (overloaded_error): Overloaded");
        assert!(!err.is_recoverable());
    }

    #[test]
    fn missing_credential_names_the_variable() {
        let err = AIError::MissingCredential("OPENAI_API_KEY");
        assert_eq!(err.to_string(), "OPENAI_API_KEY is required");
        assert!(err.is_configuration());
    }
}
