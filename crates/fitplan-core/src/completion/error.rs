//! Completion service errors.

use std::time::Duration;

use thiserror::Error;

/// A single failed call to a completion service.
#[derive(Debug, Error)]
pub enum CompletionError {
    #[error("completion API returned {status}: {body}")]
    Http { status: u16, body: String },

    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("completion call timed out after {0:?}")]
    Timeout(Duration),

    #[error("invalid completion response: {0}")]
    InvalidResponse(String),

    #[error("API key environment variable {0} is not set")]
    MissingApiKey(String),
}

impl CompletionError {
    /// Whether another attempt could plausibly succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Http { status, .. } => is_retryable_status(*status),
            Self::Network(_) | Self::Timeout(_) => true,
            Self::InvalidResponse(_) | Self::MissingApiKey(_) => false,
        }
    }
}

fn is_retryable_status(status: u16) -> bool {
    matches!(status, 408 | 429) || (500..600).contains(&status)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn http(status: u16) -> CompletionError {
        CompletionError::Http {
            status,
            body: String::new(),
        }
    }

    #[test]
    fn transient_failures_are_retryable() {
        for status in [408, 429, 500, 502, 503, 504, 529] {
            assert!(http(status).is_retryable(), "{status}");
        }
        assert!(CompletionError::Timeout(Duration::from_secs(1)).is_retryable());
    }

    #[test]
    fn permanent_failures_are_not_retryable() {
        for status in [400, 401, 403, 404, 422] {
            assert!(!http(status).is_retryable(), "{status}");
        }
        assert!(!CompletionError::InvalidResponse("no choices".into()).is_retryable());
        assert!(!CompletionError::MissingApiKey("OPENAI_API_KEY".into()).is_retryable());
    }
}
