//! Error types for Duet.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DuetError {
    #[error("Rate limited: {0}")]
    RateLimited(String),

    #[error("Transient fault: {0}")]
    TransientFault(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("File is too large: {size} bytes (limit {limit} bytes)")]
    InputTooLarge { size: usize, limit: usize },

    #[error("Could not read '{0}' as text. Only plain-text files are supported.")]
    InputUndecodable(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl DuetError {
    /// Whether a backend call that failed with this error may be attempted again.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::RateLimited(_) | Self::TransientFault(_))
    }

    /// Classify a non-success HTTP status returned by a model backend.
    pub fn from_status(status: u16, body: &str, provider: &str) -> Self {
        match status {
            401 | 403 => Self::Unauthorized(format!("{provider} API error {status}: {body}")),
            429 => Self::RateLimited(format!("{provider} API error {status}: {body}")),
            _ => Self::TransientFault(format!("{provider} API error {status}: {body}")),
        }
    }
}

pub type Result<T> = std::result::Result<T, DuetError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_classification() {
        assert!(matches!(
            DuetError::from_status(401, "bad key", "Anthropic"),
            DuetError::Unauthorized(_)
        ));
        assert!(matches!(
            DuetError::from_status(403, "denied", "OpenAI"),
            DuetError::Unauthorized(_)
        ));
        assert!(matches!(
            DuetError::from_status(429, "slow down", "OpenAI"),
            DuetError::RateLimited(_)
        ));
        assert!(matches!(
            DuetError::from_status(503, "unavailable", "OpenAI"),
            DuetError::TransientFault(_)
        ));
        assert!(matches!(
            DuetError::from_status(400, "bad request", "Anthropic"),
            DuetError::TransientFault(_)
        ));
    }

    #[test]
    fn retryable_kinds() {
        assert!(DuetError::RateLimited("x".into()).is_retryable());
        assert!(DuetError::TransientFault("x".into()).is_retryable());
        assert!(!DuetError::Unauthorized("x".into()).is_retryable());
        assert!(!DuetError::Config("x".into()).is_retryable());
        assert!(!DuetError::InputTooLarge { size: 2, limit: 1 }.is_retryable());
    }

    #[test]
    fn status_message_carries_provider_and_body() {
        let err = DuetError::from_status(500, "boom", "Anthropic");
        assert_eq!(err.to_string(), "Transient fault: Anthropic API error 500: boom");
    }
}
