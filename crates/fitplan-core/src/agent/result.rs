//! The result contract every agent invocation produces.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use super::AgentKind;

/// Speaker of a conversation message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// One message of the conversation that produced a result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Outcome of one top-level agent invocation.
///
/// Created exactly once per invocation and never mutated by the agent
/// afterwards. `success == false` always comes with `error` set and an empty
/// `data` map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentResult {
    /// Time-ordered identifier, unique within the process.
    pub id: String,
    pub agent: AgentKind,
    pub success: bool,
    pub data: Map<String, Value>,
    pub reasoning: String,
    pub messages: Vec<ChatMessage>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default)]
    pub warnings: Vec<String>,
    pub created_at: DateTime<Utc>,
}

impl AgentResult {
    pub fn success(agent: AgentKind, data: Map<String, Value>, reasoning: impl Into<String>) -> Self {
        Self {
            id: synthetic_id(agent),
            agent,
            success: true,
            data,
            reasoning: reasoning.into(),
            messages: Vec::new(),
            error: None,
            warnings: Vec::new(),
            created_at: Utc::now(),
        }
    }

    pub fn failure(agent: AgentKind, reasoning: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            id: synthetic_id(agent),
            agent,
            success: false,
            data: Map::new(),
            reasoning: reasoning.into(),
            messages: Vec::new(),
            error: Some(error.into()),
            warnings: Vec::new(),
            created_at: Utc::now(),
        }
    }

    pub fn with_messages(mut self, messages: Vec<ChatMessage>) -> Self {
        self.messages = messages;
        self
    }

    pub fn with_warnings(mut self, warnings: Vec<String>) -> Self {
        self.warnings = warnings;
        self
    }
}

/// UUIDv7 embeds a millisecond timestamp plus random bits, so ids sort by
/// creation time and do not collide within a process.
fn synthetic_id(agent: AgentKind) -> String {
    format!("{agent}-{}", Uuid::now_v7())
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn ids_are_unique_and_prefixed() {
        let ids: HashSet<String> = (0..500)
            .map(|_| AgentResult::success(AgentKind::WorkoutPlan, Map::new(), "r").id)
            .collect();
        assert_eq!(ids.len(), 500);
        assert!(ids.iter().all(|id| id.starts_with("workout-plan-")));
    }

    #[test]
    fn failure_has_empty_data_and_error() {
        let result = AgentResult::failure(AgentKind::Nutrition, "narrative", "boom");
        assert!(!result.success);
        assert!(result.data.is_empty());
        assert_eq!(result.error.as_deref(), Some("boom"));
    }

    #[test]
    fn serializes_camel_case_and_omits_absent_error() {
        let result = AgentResult::success(AgentKind::WorkoutPlan, Map::new(), "ok")
            .with_messages(vec![ChatMessage::system("prompt")]);
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["agent"], "workout-plan");
        assert_eq!(json["messages"][0]["role"], "system");
        assert!(json.get("createdAt").is_some());
        assert!(json.get("error").is_none());
    }
}
