//! Agents: the entry points that turn an [`AgentContext`] into an
//! [`AgentResult`].
//!
//! The set of agents is closed. [`AgentKind`] names them, string tags are
//! validated once by [`AgentKind::from_str`], and [`Agent::new`] resolves
//! the concrete agent at construction time so `run` is a plain `match`.

pub mod format;
pub mod nutrition;
pub mod result;
pub mod workout;

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::warn;
use uuid::Uuid;

use crate::completion::CompletionInvoker;
use crate::config::PipelineConfig;
use crate::context::ProfileStore;
use crate::error::PipelineError;
use crate::memory::SharedMemory;

pub use format::{SuccessPayload, format_result};
pub use nutrition::NutritionAgent;
pub use result::{AgentResult, ChatMessage, Role};
pub use workout::WorkoutPlanAgent;

// ---------------------------------------------------------------------------
// Agent kinds
// ---------------------------------------------------------------------------

/// The agents this crate provides.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AgentKind {
    WorkoutPlan,
    Nutrition,
}

impl AgentKind {
    pub const ALL: [AgentKind; 2] = [AgentKind::WorkoutPlan, AgentKind::Nutrition];

    /// Name used for memory history keys and result ids.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::WorkoutPlan => "workout-plan",
            Self::Nutrition => "nutrition",
        }
    }
}

impl fmt::Display for AgentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AgentKind {
    type Err = AgentKindParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "workout-plan" | "workout" => Ok(Self::WorkoutPlan),
            "nutrition" => Ok(Self::Nutrition),
            other => Err(AgentKindParseError(other.to_owned())),
        }
    }
}

/// Error returned when parsing an unknown [`AgentKind`] tag.
#[derive(Debug, Clone)]
pub struct AgentKindParseError(pub String);

impl fmt::Display for AgentKindParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "unknown agent {:?} (expected workout-plan or nutrition)",
            self.0
        )
    }
}

impl std::error::Error for AgentKindParseError {}

// ---------------------------------------------------------------------------
// Invocation context
// ---------------------------------------------------------------------------

/// The user profile as supplied by the caller.
///
/// `id` and `fitness_level` are interpreted; every other field is carried
/// verbatim into the prompt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: Uuid,
    #[serde(default)]
    pub fitness_level: Option<String>,
    #[serde(flatten)]
    pub details: Map<String, Value>,
}

/// Input to an agent invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentContext {
    pub user_profile: UserProfile,
    #[serde(default)]
    pub goals: Vec<String>,
    #[serde(default)]
    pub research_data: Option<Value>,
    #[serde(default)]
    pub feedback: Option<String>,
    #[serde(default)]
    pub previous_messages: Vec<ChatMessage>,
}

impl AgentContext {
    /// Check the input shape for `kind` before any external call is made.
    pub fn validate_for(&self, kind: AgentKind) -> Result<(), PipelineError> {
        if self.user_profile.id.is_nil() {
            return Err(PipelineError::Validation(
                "userProfile.id must be a non-nil user id".to_string(),
            ));
        }

        if let Some(idx) = self.goals.iter().position(|g| g.trim().is_empty()) {
            return Err(PipelineError::Validation(format!(
                "goal at index {idx} is blank"
            )));
        }

        if kind == AgentKind::WorkoutPlan {
            let level = self.user_profile.fitness_level.as_deref().unwrap_or("");
            if level.trim().is_empty() {
                return Err(PipelineError::Validation(
                    "userProfile.fitnessLevel is required".to_string(),
                ));
            }
            if self.goals.is_empty() {
                return Err(PipelineError::Validation(
                    "at least one goal is required".to_string(),
                ));
            }
        }

        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Dispatch
// ---------------------------------------------------------------------------

/// Collaborators shared by every agent.
#[derive(Clone)]
pub struct AgentDeps {
    pub profile_store: Arc<dyn ProfileStore>,
    pub invoker: Arc<CompletionInvoker>,
    pub memory: Arc<SharedMemory>,
    pub config: PipelineConfig,
}

impl fmt::Debug for AgentDeps {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AgentDeps")
            .field("invoker", &self.invoker)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// A concrete agent, resolved once from its [`AgentKind`].
#[derive(Debug)]
pub enum Agent {
    WorkoutPlan(WorkoutPlanAgent),
    Nutrition(NutritionAgent),
}

impl Agent {
    pub fn new(kind: AgentKind, deps: AgentDeps) -> Self {
        match kind {
            AgentKind::WorkoutPlan => Self::WorkoutPlan(WorkoutPlanAgent::new(deps)),
            AgentKind::Nutrition => Self::Nutrition(NutritionAgent::new(deps)),
        }
    }

    pub fn kind(&self) -> AgentKind {
        match self {
            Self::WorkoutPlan(_) => AgentKind::WorkoutPlan,
            Self::Nutrition(_) => AgentKind::Nutrition,
        }
    }

    /// Run the agent. Never fails: every failure is reported inside the
    /// returned result.
    pub async fn run(&self, context: &AgentContext) -> AgentResult {
        match self {
            Self::WorkoutPlan(agent) => agent.generate(context).await,
            Self::Nutrition(agent) => agent.generate(context).await,
        }
    }
}

/// Append `result` to the user's memory. A failure becomes a warning on the
/// returned result instead of an error.
pub(crate) fn remember(memory: &SharedMemory, user_id: Uuid, mut result: AgentResult) -> AgentResult {
    if let Err(e) = memory.store_result(user_id, result.agent.as_str(), result.clone()) {
        warn!(user_id = %user_id, agent = %result.agent, error = %e, "failed to store result in memory");
        result
            .warnings
            .push(format!("This result could not be saved to memory: {e}"));
    }
    result
}
