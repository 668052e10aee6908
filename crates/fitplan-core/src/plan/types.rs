//! Plan shapes before and after validation.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};

/// One parsed, unvalidated completion output.
///
/// Entries stay as raw JSON until [`super::validate_plan`] has checked them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanCandidate {
    pub plan: Vec<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explanations: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<String>,
}

/// Repetition target: a number as the model wrote it, or a description such
/// as "AMRAP" or "30 seconds".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Reps {
    Count(Number),
    Description(String),
}

impl fmt::Display for Reps {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Count(n) => write!(f, "{n}"),
            Self::Description(s) => f.write_str(s),
        }
    }
}

/// A validated exercise. Fields the model added beyond the required ones
/// (rest, tempo, notes, ...) are kept in `extra`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExerciseEntry {
    pub exercise: String,
    pub sets: Number,
    pub reps: Reps,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}
