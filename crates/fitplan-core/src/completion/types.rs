//! Request types for the completion boundary.

use serde::{Deserialize, Serialize};

/// Model parameters used for every call an invoker makes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionSettings {
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl Default for CompletionSettings {
    fn default() -> Self {
        Self {
            model: "gpt-4o-mini".to_string(),
            temperature: 0.7,
            max_tokens: 2000,
        }
    }
}

/// One call to a completion service: a single system-role instruction.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    pub model: String,
    pub system_prompt: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl CompletionRequest {
    pub fn new(settings: &CompletionSettings, system_prompt: impl Into<String>) -> Self {
        Self {
            model: settings.model.clone(),
            system_prompt: system_prompt.into(),
            temperature: settings.temperature,
            max_tokens: settings.max_tokens,
        }
    }
}
