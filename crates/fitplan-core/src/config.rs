//! Pipeline tuning values.
//!
//! Everything here is handed to constructors by the caller. Nothing in this
//! crate reads the process environment.

use std::time::Duration;

/// Default number of generate/parse/validate cycles per invocation.
pub const DEFAULT_MAX_REFINEMENT_ATTEMPTS: u32 = 3;

/// Default number of past workouts folded into the prompt.
pub const DEFAULT_WORKOUT_HISTORY_LIMIT: usize = 5;

/// Default per-call timeout for profile-store reads.
pub const DEFAULT_STORE_TIMEOUT: Duration = Duration::from_secs(10);

/// Behavior switches for one agent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineConfig {
    /// Outer refinement bound. Independent of the completion invoker's
    /// own retry budget.
    pub max_refinement_attempts: u32,
    /// Append the previous attempt's failure to the prompt on retry.
    pub include_validation_feedback: bool,
    /// How many recent workouts to fetch for the prompt. Zero disables the
    /// history lookup.
    pub workout_history_limit: usize,
    /// Timeout applied to every profile-store call.
    pub store_timeout: Duration,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_refinement_attempts: DEFAULT_MAX_REFINEMENT_ATTEMPTS,
            include_validation_feedback: false,
            workout_history_limit: DEFAULT_WORKOUT_HISTORY_LIMIT,
            store_timeout: DEFAULT_STORE_TIMEOUT,
        }
    }
}
