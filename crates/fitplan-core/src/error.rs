//! Top-level failure taxonomy for an agent invocation.
//!
//! Critical failures become a [`PipelineError`] and abort the invocation.
//! Non-critical failures never reach this type: they are logged and turned
//! into warning strings at their call site.

use thiserror::Error;
use uuid::Uuid;

use crate::completion::InvokeError;
use crate::context::StoreError;
use crate::plan::{ParseFailure, PlanValidationError};

/// A failure that aborts an agent invocation.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The caller's context was malformed. Raised before any external call.
    #[error("invalid request: {0}")]
    Validation(String),

    /// A critical dependency was unavailable.
    #[error("medical conditions unavailable for user {user_id}: {source}")]
    Resource {
        user_id: Uuid,
        #[source]
        source: StoreError,
    },

    /// The completion service failed after exhausting its own retries.
    #[error("completion service failed: {0}")]
    ExternalService(#[from] InvokeError),

    /// Every refinement attempt produced text that could not be parsed.
    #[error(
        "could not parse a workout plan from the completion response after {attempts} \
         attempt(s); maximum refinement attempts reached ({last})"
    )]
    ParseExhausted { attempts: u32, last: ParseFailure },

    /// Every refinement attempt produced a plan that failed validation.
    #[error(
        "workout plan failed validation after {attempts} attempt(s); maximum refinement \
         attempts reached: {last}"
    )]
    ValidationExhausted {
        attempts: u32,
        last: PlanValidationError,
    },

    /// Any other failure inside generation.
    #[error("processing failed: {0}")]
    Processing(String),
}

impl PipelineError {
    /// Short category label used in result narratives and logs.
    pub fn category(&self) -> &'static str {
        match self {
            Self::Validation(_) => "invalid request",
            Self::Resource { .. } => "resource unavailable",
            Self::ExternalService(_) => "external service failure",
            Self::ParseExhausted { .. } | Self::ValidationExhausted { .. } | Self::Processing(_) => {
                "processing failure"
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exhaustion_messages_name_the_attempt_budget() {
        let parse = PipelineError::ParseExhausted {
            attempts: 3,
            last: ParseFailure::NotAnObject,
        };
        let msg = parse.to_string();
        assert!(msg.contains("could not parse"), "{msg}");
        assert!(msg.contains("maximum refinement attempts"), "{msg}");

        let validation = PipelineError::ValidationExhausted {
            attempts: 2,
            last: PlanValidationError::EmptyExerciseList,
        };
        let msg = validation.to_string();
        assert!(msg.contains("failed validation after 2 attempt(s)"), "{msg}");
        assert!(msg.contains("maximum refinement attempts"), "{msg}");
        assert!(msg.contains("empty exercise list"), "{msg}");
    }

    #[test]
    fn resource_error_names_the_user() {
        let user_id = Uuid::new_v4();
        let err = PipelineError::Resource {
            user_id,
            source: StoreError::Unavailable("connection refused".into()),
        };
        assert!(err.to_string().contains(&user_id.to_string()));
        assert_eq!(err.category(), "resource unavailable");
    }
}
