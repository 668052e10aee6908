//! Structural and domain checks for a [`PlanCandidate`].
//!
//! Rules run in a fixed order and stop at the first failure:
//!
//! 1. The plan list is non-empty.
//! 2. Each entry, in index order, has a name, a numeric `sets` value, and a
//!    `reps` value that is a number or a non-blank description.
//! 3. A beginner plan has at most [`BEGINNER_MAX_EXERCISES`] entries.
//!
//! A missing or non-list `plan` never reaches this module: the parser
//! rejects it and [`PlanCandidate::plan`] is always a list.

use serde_json::{Map, Value};
use thiserror::Error;

use super::types::{ExerciseEntry, PlanCandidate, Reps};

/// Inclusive upper bound on exercises in a beginner plan.
pub const BEGINNER_MAX_EXERCISES: usize = 12;

const BEGINNER: &str = "beginner";

/// The reason a plan candidate was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlanValidationError {
    #[error("empty exercise list")]
    EmptyExerciseList,

    #[error("Exercise at index {index} is missing a name")]
    MissingName { index: usize },

    #[error("Exercise \"{exercise}\" is missing valid sets")]
    InvalidSets { exercise: String },

    #[error("Exercise \"{exercise}\" is missing valid reps")]
    InvalidReps { exercise: String },

    #[error("too many exercises for a beginner ({count} > {max})")]
    TooManyForBeginner { count: usize, max: usize },
}

/// Validate `candidate` for a user at `fitness_level`.
///
/// Returns the typed exercises on success.
pub fn validate_plan(
    candidate: &PlanCandidate,
    fitness_level: Option<&str>,
) -> Result<Vec<ExerciseEntry>, PlanValidationError> {
    if candidate.plan.is_empty() {
        return Err(PlanValidationError::EmptyExerciseList);
    }

    let exercises = candidate
        .plan
        .iter()
        .enumerate()
        .map(|(index, entry)| validate_entry(index, entry))
        .collect::<Result<Vec<_>, _>>()?;

    if is_beginner(fitness_level) && exercises.len() > BEGINNER_MAX_EXERCISES {
        return Err(PlanValidationError::TooManyForBeginner {
            count: exercises.len(),
            max: BEGINNER_MAX_EXERCISES,
        });
    }

    Ok(exercises)
}

fn validate_entry(index: usize, entry: &Value) -> Result<ExerciseEntry, PlanValidationError> {
    let Some(fields) = entry.as_object() else {
        return Err(PlanValidationError::MissingName { index });
    };

    let name = match fields.get("exercise") {
        Some(Value::String(s)) if !s.trim().is_empty() => s.clone(),
        _ => return Err(PlanValidationError::MissingName { index }),
    };

    let sets = match fields.get("sets") {
        Some(Value::Number(n)) => n.clone(),
        _ => {
            return Err(PlanValidationError::InvalidSets {
                exercise: name.clone(),
            });
        }
    };

    let reps = match fields.get("reps") {
        Some(Value::String(s)) if !s.trim().is_empty() => Reps::Description(s.clone()),
        Some(Value::Number(n)) => Reps::Count(n.clone()),
        _ => return Err(PlanValidationError::InvalidReps { exercise: name }),
    };

    let extra: Map<String, Value> = fields
        .iter()
        .filter(|(k, _)| !matches!(k.as_str(), "exercise" | "sets" | "reps"))
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();

    Ok(ExerciseEntry {
        exercise: name,
        sets,
        reps,
        extra,
    })
}

fn is_beginner(level: Option<&str>) -> bool {
    level.is_some_and(|l| l.trim().eq_ignore_ascii_case(BEGINNER))
}
