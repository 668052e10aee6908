//! Refinement loop: generate, parse and validate until a plan is accepted or
//! the attempt budget runs out.
//!
//! ```text
//! Generating -> Parsing -> Validating -> Accepted
//!                  |            |
//!                  +------------+--> Retrying -> Generating
//!                  |            |
//!                  +------------+--> Exhausted
//! ```
//!
//! A completion failure that survives the invoker's own retries leaves the
//! loop directly as [`RefinementError::Completion`]; it is not exhaustion.
//! Attempts never overlap.

use std::fmt;
use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::completion::{CompletionInvoker, InvokeError};
use crate::config::PipelineConfig;
use crate::error::PipelineError;
use crate::plan::parser::log_failure;
use crate::plan::{ExerciseEntry, ParseFailure, PlanCandidate, PlanValidationError, try_parse_plan, validate_plan};

// ---------------------------------------------------------------------------
// Phases
// ---------------------------------------------------------------------------

/// Where a refinement run currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefinePhase {
    Generating,
    Parsing,
    Validating,
    Accepted,
    Retrying,
    Exhausted,
}

impl RefinePhase {
    /// Check whether `from -> to` is an edge of the refinement graph.
    pub fn is_valid_transition(from: RefinePhase, to: RefinePhase) -> bool {
        use RefinePhase::*;
        matches!(
            (from, to),
            (Generating, Parsing)
                | (Parsing, Validating)
                | (Parsing, Retrying)
                | (Parsing, Exhausted)
                | (Validating, Accepted)
                | (Validating, Retrying)
                | (Validating, Exhausted)
                | (Retrying, Generating)
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Accepted | Self::Exhausted)
    }
}

impl fmt::Display for RefinePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Generating => "generating",
            Self::Parsing => "parsing",
            Self::Validating => "validating",
            Self::Accepted => "accepted",
            Self::Retrying => "retrying",
            Self::Exhausted => "exhausted",
        };
        f.write_str(s)
    }
}

// ---------------------------------------------------------------------------
// Attempts and outcomes
// ---------------------------------------------------------------------------

/// Why one attempt was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AttemptFailure {
    #[error("could not parse response: {0}")]
    Parse(ParseFailure),

    #[error("{0}")]
    Validation(PlanValidationError),
}

/// Record of one generate/parse/validate cycle.
#[derive(Debug, Clone, PartialEq)]
pub struct RefinementAttempt {
    pub attempt_number: u32,
    /// Absent when the response did not parse.
    pub candidate: Option<PlanCandidate>,
    /// Absent only on the accepted attempt.
    pub failure: Option<AttemptFailure>,
}

/// The plan the loop settled on.
#[derive(Debug, Clone, PartialEq)]
pub struct AcceptedPlan {
    pub candidate: PlanCandidate,
    pub exercises: Vec<ExerciseEntry>,
    /// Prompt sent on the accepted attempt.
    pub prompt: String,
    /// Completion text returned on the accepted attempt.
    pub raw_response: String,
    pub attempts: Vec<RefinementAttempt>,
}

/// The loop ended without an accepted plan.
#[derive(Debug, Error)]
pub enum RefinementError {
    #[error("completion failed on refinement attempt {attempt}: {source}")]
    Completion {
        attempt: u32,
        prompt: String,
        #[source]
        source: InvokeError,
    },

    #[error("no acceptable plan after {n} attempt(s): {last}", n = .attempts.len())]
    Exhausted {
        attempts: Vec<RefinementAttempt>,
        last: AttemptFailure,
        prompt: String,
        raw_response: String,
    },
}

impl RefinementError {
    /// Prompt and completion text of the final attempt, where available.
    pub fn last_exchange(&self) -> (&str, Option<&str>) {
        match self {
            Self::Completion { prompt, .. } => (prompt, None),
            Self::Exhausted {
                prompt,
                raw_response,
                ..
            } => (prompt, Some(raw_response)),
        }
    }
}

impl From<RefinementError> for PipelineError {
    fn from(err: RefinementError) -> Self {
        match err {
            RefinementError::Completion { source, .. } => PipelineError::ExternalService(source),
            RefinementError::Exhausted { attempts, last, .. } => {
                let attempts = u32::try_from(attempts.len()).unwrap_or(u32::MAX);
                match last {
                    AttemptFailure::Parse(last) => PipelineError::ParseExhausted { attempts, last },
                    AttemptFailure::Validation(last) => {
                        PipelineError::ValidationExhausted { attempts, last }
                    }
                }
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Controller
// ---------------------------------------------------------------------------

/// Drives the refinement loop for one prompt.
#[derive(Debug, Clone)]
pub struct RefinementController {
    invoker: Arc<CompletionInvoker>,
    max_attempts: u32,
    include_feedback: bool,
}

impl RefinementController {
    /// A budget of zero is treated as one attempt.
    pub fn new(invoker: Arc<CompletionInvoker>, config: &PipelineConfig) -> Self {
        Self {
            invoker,
            max_attempts: config.max_refinement_attempts.max(1),
            include_feedback: config.include_validation_feedback,
        }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Run the loop for `base_prompt`, validating against `fitness_level`.
    pub async fn run(
        &self,
        base_prompt: &str,
        fitness_level: Option<&str>,
    ) -> Result<AcceptedPlan, RefinementError> {
        let mut attempts: Vec<RefinementAttempt> = Vec::new();
        let mut prompt = base_prompt.to_string();
        let mut phase = RefinePhase::Generating;
        let mut attempt: u32 = 1;

        loop {
            debug!(attempt, max_attempts = self.max_attempts, "generating plan");
            let raw = match self.invoker.invoke(&prompt).await {
                Ok(raw) => raw,
                Err(source) => {
                    return Err(RefinementError::Completion {
                        attempt,
                        prompt,
                        source,
                    });
                }
            };

            phase = advance(phase, RefinePhase::Parsing, attempt);
            let failure = match try_parse_plan(&raw) {
                Err(parse) => {
                    log_failure(&parse, raw.len());
                    attempts.push(RefinementAttempt {
                        attempt_number: attempt,
                        candidate: None,
                        failure: Some(AttemptFailure::Parse(parse.clone())),
                    });
                    AttemptFailure::Parse(parse)
                }
                Ok(candidate) => {
                    phase = advance(phase, RefinePhase::Validating, attempt);
                    match validate_plan(&candidate, fitness_level) {
                        Ok(exercises) => {
                            advance(phase, RefinePhase::Accepted, attempt);
                            info!(attempt, exercises = exercises.len(), "plan accepted");
                            attempts.push(RefinementAttempt {
                                attempt_number: attempt,
                                candidate: Some(candidate.clone()),
                                failure: None,
                            });
                            return Ok(AcceptedPlan {
                                candidate,
                                exercises,
                                prompt,
                                raw_response: raw,
                                attempts,
                            });
                        }
                        Err(invalid) => {
                            attempts.push(RefinementAttempt {
                                attempt_number: attempt,
                                candidate: Some(candidate),
                                failure: Some(AttemptFailure::Validation(invalid.clone())),
                            });
                            AttemptFailure::Validation(invalid)
                        }
                    }
                }
            };

            if attempt >= self.max_attempts {
                advance(phase, RefinePhase::Exhausted, attempt);
                warn!(attempt, reason = %failure, "maximum refinement attempts reached");
                return Err(RefinementError::Exhausted {
                    attempts,
                    last: failure,
                    prompt,
                    raw_response: raw,
                });
            }

            phase = advance(phase, RefinePhase::Retrying, attempt);
            info!(attempt, reason = %failure, "plan rejected, refining");
            if self.include_feedback {
                prompt = with_retry_feedback(base_prompt, &failure);
            }
            attempt += 1;
            phase = advance(phase, RefinePhase::Generating, attempt);
        }
    }
}

fn advance(from: RefinePhase, to: RefinePhase, attempt: u32) -> RefinePhase {
    debug_assert!(
        RefinePhase::is_valid_transition(from, to),
        "invalid refinement transition: {from} -> {to}"
    );
    debug!(attempt, %from, %to, "refinement transition");
    to
}

/// The base prompt plus a note about why the previous answer was rejected.
pub fn with_retry_feedback(base_prompt: &str, failure: &AttemptFailure) -> String {
    format!(
        "{base_prompt}\nYour previous response was rejected: {failure}. \
         Return a corrected plan in the required JSON format.\n"
    )
}
