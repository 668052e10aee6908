//! Workout plans: prompt construction, response parsing and validation.

pub mod parser;
pub mod prompt;
pub mod types;
pub mod validator;

pub use parser::{ParseFailure, decode_json_object, parse_plan_response, strip_code_fence, try_parse_plan};
pub use prompt::{PromptInputs, build_prompt};
pub use types::{ExerciseEntry, PlanCandidate, Reps};
pub use validator::{BEGINNER_MAX_EXERCISES, PlanValidationError, validate_plan};
