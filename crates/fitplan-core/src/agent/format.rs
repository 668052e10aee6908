//! Output formatter: folds an agent outcome into the fixed [`AgentResult`]
//! shape.

use serde_json::{Map, Value};

use super::{AgentKind, AgentResult, ChatMessage};
use crate::error::PipelineError;

/// Placeholder used when the model gave no reasoning.
pub const DEFAULT_REASONING: &str = "No reasoning was provided with this plan.";

/// Placeholder used when the model gave no explanations.
pub const DEFAULT_EXPLANATIONS: &str = "No explanations were provided with this plan.";

/// What a successful agent run hands to the formatter.
#[derive(Debug, Clone, Default)]
pub struct SuccessPayload {
    pub data: Map<String, Value>,
    pub reasoning: Option<String>,
    pub explanations: Option<String>,
}

/// Normalize an outcome into an [`AgentResult`].
///
/// Warnings are attached whether or not the run succeeded.
pub fn format_result(
    agent: AgentKind,
    outcome: Result<SuccessPayload, PipelineError>,
    messages: Vec<ChatMessage>,
    warnings: Vec<String>,
) -> AgentResult {
    let result = match outcome {
        Ok(payload) => {
            let mut data = payload.data;
            data.insert(
                "explanations".to_string(),
                Value::String(non_blank(payload.explanations).unwrap_or_else(|| DEFAULT_EXPLANATIONS.to_string())),
            );
            let reasoning =
                non_blank(payload.reasoning).unwrap_or_else(|| DEFAULT_REASONING.to_string());
            AgentResult::success(agent, data, reasoning)
        }
        Err(err) => {
            let reasoning = format!(
                "The {agent} agent stopped with a {} and produced no plan. {}",
                err.category(),
                next_step(&err)
            );
            AgentResult::failure(agent, reasoning, err.to_string())
        }
    };

    result.with_messages(messages).with_warnings(warnings)
}

fn next_step(err: &PipelineError) -> &'static str {
    match err {
        PipelineError::Validation(_) => "Correct the request and try again.",
        PipelineError::Resource { .. } => {
            "The user's medical information could not be loaded, so no plan was generated."
        }
        PipelineError::ExternalService(_) => "The completion service may be unavailable; retry later.",
        PipelineError::ParseExhausted { .. }
        | PipelineError::ValidationExhausted { .. }
        | PipelineError::Processing(_) => "Retry the request or adjust the goals.",
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.trim().is_empty())
}
