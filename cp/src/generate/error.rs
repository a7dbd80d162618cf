//! Generation error types

use std::time::Duration;
use thiserror::Error;

use crate::llm::LlmError;

/// Failure of a question or idea generation call
///
/// Every variant is recovered the same way: the round yields nothing and the
/// operator may simply try again.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GenerationError {
    #[error("Generation unavailable: {0}")]
    Unavailable(String),

    #[error("Malformed generator output: {0}")]
    MalformedOutput(String),

    #[error("Generation timed out after {0:?}")]
    Timeout(Duration),
}

impl GenerationError {
    pub fn is_retryable(&self) -> bool {
        true
    }
}

impl From<LlmError> for GenerationError {
    fn from(err: LlmError) -> Self {
        match err {
            LlmError::InvalidResponse(_) | LlmError::Json(_) => GenerationError::MalformedOutput(err.to_string()),
            other => GenerationError::Unavailable(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_llm_error() {
        let err: GenerationError = LlmError::InvalidResponse("no content".to_string()).into();
        assert!(matches!(err, GenerationError::MalformedOutput(_)));

        let err: GenerationError = LlmError::ApiError {
            status: 503,
            message: "down".to_string(),
        }
        .into();
        assert!(matches!(err, GenerationError::Unavailable(ref m) if m.contains("503")));

        let err: GenerationError = LlmError::RateLimited {
            retry_after: Duration::from_secs(5),
        }
        .into();
        assert!(matches!(err, GenerationError::Unavailable(_)));
        assert!(err.is_retryable());
    }
}
