//! Workout prompt construction.
//!
//! [`build_prompt`] is pure: the same inputs always produce the same text.
//! Missing optional inputs never fail; their section is left out or filled
//! with a placeholder.

use serde_json::{Map, Value};

use crate::agent::UserProfile;
use crate::context::{ContraindicationNote, PastWorkout};

pub const NO_GOALS: &str = "No specific goals provided.";
pub const NO_RESEARCH: &str = "No prior research available.";
pub const NO_CONDITIONS: &str = "No known medical conditions.";

const GENERIC_CAUTION: &str = "No specific contraindications on record. Favor low-impact movements, \
    keep loads conservative and stop any exercise that causes pain.";

/// Everything the workout prompt is built from.
#[derive(Debug, Clone, Copy)]
pub struct PromptInputs<'a> {
    pub profile: &'a UserProfile,
    pub preferences: &'a Map<String, Value>,
    pub goals: &'a [String],
    pub research_data: Option<&'a Value>,
    pub medical_conditions: &'a [String],
    pub contraindications: &'a [ContraindicationNote],
    pub past_workouts: &'a [PastWorkout],
    pub feedback: Option<&'a str>,
}

/// Build the system instruction sent to the completion service.
pub fn build_prompt(inputs: &PromptInputs<'_>) -> String {
    let mut out = String::from(
        "You are an expert strength and conditioning coach. Create a personalized workout \
         plan for the user described below.\n",
    );

    out.push_str("\nUser Profile:\n");
    push_profile(&mut out, inputs.profile);

    if !inputs.preferences.is_empty() {
        out.push_str("\nUser Preferences:\n");
        for (key, value) in inputs.preferences {
            out.push_str(&format!("- {key}: {}\n", render_value(value)));
        }
    }

    out.push_str("\nGoals:\n");
    if inputs.goals.is_empty() {
        out.push_str(&format!("{NO_GOALS}\n"));
    } else {
        for goal in inputs.goals {
            out.push_str(&format!("- {goal}\n"));
        }
    }

    out.push_str("\nResearch Summary:\n");
    out.push_str(&format!("{}\n", research_summary(inputs.research_data)));

    out.push_str("\nInjury and Medical Notes:\n");
    push_injury_notes(&mut out, inputs.medical_conditions, inputs.contraindications);

    if !inputs.past_workouts.is_empty() {
        out.push_str("\nRecent Workout History:\n");
        for (i, workout) in inputs.past_workouts.iter().enumerate() {
            push_past_workout(&mut out, i + 1, workout);
        }
    }

    if let Some(feedback) = inputs.feedback.map(str::trim).filter(|f| !f.is_empty()) {
        out.push_str("\nUser Feedback on Previous Plan:\n");
        out.push_str(&format!("{feedback}\n"));
    }

    out.push_str(OUTPUT_FORMAT);
    out
}

const OUTPUT_FORMAT: &str = r#"
Respond with a single JSON object and nothing else, in this format:
{
  "plan": [
    {"exercise": "Exercise name", "sets": 3, "reps": 10}
  ],
  "explanations": "Why these exercises were chosen",
  "reasoning": "How the plan addresses the goals and medical notes"
}
"sets" must be a number. "reps" may be a number or a description such as "AMRAP" or "30 seconds".
Never include exercises listed under "Avoid".
"#;

fn push_profile(out: &mut String, profile: &UserProfile) {
    out.push_str(&format!("- id: {}\n", profile.id));
    if let Some(level) = &profile.fitness_level {
        out.push_str(&format!("- fitnessLevel: {level}\n"));
    }
    for (key, value) in &profile.details {
        out.push_str(&format!("- {key}: {}\n", render_value(value)));
    }
}

fn research_summary(research: Option<&Value>) -> String {
    match research {
        None | Some(Value::Null) => NO_RESEARCH.to_string(),
        Some(Value::String(s)) if s.trim().is_empty() => NO_RESEARCH.to_string(),
        Some(Value::String(s)) => s.clone(),
        Some(Value::Object(obj)) => match obj.get("summary") {
            Some(Value::String(s)) if !s.trim().is_empty() => s.clone(),
            _ if obj.is_empty() => NO_RESEARCH.to_string(),
            _ => Value::Object(obj.clone()).to_string(),
        },
        Some(other) => other.to_string(),
    }
}

/// One line per medical condition. Matching against contraindications
/// ignores case and surrounding whitespace; output keeps the user's casing.
fn push_injury_notes(out: &mut String, conditions: &[String], notes: &[ContraindicationNote]) {
    if conditions.is_empty() {
        out.push_str(&format!("{NO_CONDITIONS}\n"));
        return;
    }

    for condition in conditions {
        let key = normalize(condition);
        let label = if key.is_empty() {
            "Unspecified condition"
        } else {
            condition.trim()
        };

        let avoid: Vec<&str> = if key.is_empty() {
            Vec::new()
        } else {
            notes
                .iter()
                .filter(|n| normalize(&n.condition) == key)
                .flat_map(|n| n.exercises_to_avoid.iter().map(String::as_str))
                .collect()
        };

        if avoid.is_empty() {
            out.push_str(&format!("Condition: {label} — {GENERIC_CAUTION}\n"));
        } else {
            out.push_str(&format!("Condition: {label} — Avoid: {}\n", avoid.join(", ")));
        }
    }
}

fn push_past_workout(out: &mut String, number: usize, workout: &PastWorkout) {
    out.push_str(&format!(
        "Past Workout #{number} ({}): {}\n",
        workout.performed_at.format("%Y-%m-%d"),
        workout.title
    ));
    out.push_str(&format!("  Exercises: {}\n", render_value(&workout.exercises)));
    if let Some(notes) = workout.notes.as_deref().filter(|n| !n.trim().is_empty()) {
        out.push_str(&format!("  Notes: {notes}\n"));
    }
    if !workout.feedback.is_empty() {
        let (positive, negative) = workout.rating_counts();
        out.push_str(&format!("  Feedback: {positive} positive, {negative} negative\n"));
        for comment in workout.feedback.iter().filter_map(|f| f.comment.as_deref()) {
            out.push_str(&format!("    \"{comment}\"\n"));
        }
    }
}

fn render_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn normalize(s: &str) -> String {
    s.trim().to_lowercase()
}
