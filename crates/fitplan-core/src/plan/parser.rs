//! Completion response parser.
//!
//! Turns free-form completion text into a [`PlanCandidate`]. The text may be
//! wrapped in a fenced code block, with or without a language tag. Each way
//! of failing is a distinct [`ParseFailure`] and logs its own warning, but
//! [`parse_plan_response`] only reports `None` to its caller.

use serde_json::{Map, Value};
use thiserror::Error;
use tracing::warn;

use super::types::PlanCandidate;

const FENCE: &str = "```";

/// Why a completion response did not yield a plan candidate.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseFailure {
    #[error("response was empty")]
    Empty,

    #[error("response is not valid JSON: {0}")]
    NotJson(String),

    #[error("response JSON is not an object")]
    NotAnObject,

    #[error("response object has no `plan` field")]
    MissingPlan,

    #[error("response field `plan` is not a list")]
    PlanNotAList,
}

/// Return the contents of the first fenced block in `raw`, or the trimmed
/// input when there is no fence.
///
/// A language tag directly after the opening fence is dropped. An opening
/// fence without a closing one yields everything after it.
pub fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(open) = trimmed.find(FENCE) else {
        return trimmed;
    };

    let after_open = &trimmed[open + FENCE.len()..];
    let tag_len = after_open
        .find(|c: char| !(c.is_ascii_alphanumeric() || c == '-' || c == '_'))
        .unwrap_or(after_open.len());
    let body = &after_open[tag_len..];

    match body.find(FENCE) {
        Some(close) => body[..close].trim(),
        None => body.trim(),
    }
}

/// Decode `raw` (fence-stripped) into a JSON object.
pub fn decode_json_object(raw: &str) -> Result<Map<String, Value>, ParseFailure> {
    if raw.trim().is_empty() {
        return Err(ParseFailure::Empty);
    }

    let body = strip_code_fence(raw);
    let value: Value =
        serde_json::from_str(body).map_err(|e| ParseFailure::NotJson(e.to_string()))?;

    match value {
        Value::Object(map) => Ok(map),
        _ => Err(ParseFailure::NotAnObject),
    }
}

/// Parse `raw` into a plan candidate, reporting exactly why it failed.
pub fn try_parse_plan(raw: &str) -> Result<PlanCandidate, ParseFailure> {
    let mut object = decode_json_object(raw)?;

    let plan = match object.remove("plan") {
        None => return Err(ParseFailure::MissingPlan),
        Some(Value::Array(items)) => items,
        Some(_) => return Err(ParseFailure::PlanNotAList),
    };

    Ok(PlanCandidate {
        plan,
        explanations: text_field(&object, "explanations"),
        reasoning: text_field(&object, "reasoning"),
    })
}

/// Parse `raw` into a plan candidate, logging and discarding the reason on
/// failure.
pub fn parse_plan_response(raw: &str) -> Option<PlanCandidate> {
    match try_parse_plan(raw) {
        Ok(candidate) => Some(candidate),
        Err(failure) => {
            log_failure(&failure, raw.len());
            None
        }
    }
}

pub(crate) fn log_failure(failure: &ParseFailure, raw_len: usize) {
    match failure {
        ParseFailure::Empty => warn!("completion response was empty, nothing to parse"),
        ParseFailure::NotJson(detail) => {
            warn!(raw_len, error = %detail, "completion response could not be decoded as JSON")
        }
        ParseFailure::NotAnObject => warn!(raw_len, "decoded completion response is not a JSON object"),
        ParseFailure::MissingPlan => warn!(raw_len, "decoded completion response has no plan field"),
        ParseFailure::PlanNotAList => warn!(raw_len, "plan field in completion response is not a list"),
    }
}

/// Strings are taken as-is; any other non-null value is rendered as JSON.
fn text_field(object: &Map<String, Value>, key: &str) -> Option<String> {
    match object.get(key)? {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}
