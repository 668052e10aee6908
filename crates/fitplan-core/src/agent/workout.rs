//! Workout plan agent.

use serde_json::{Map, Value, json};
use tracing::{info, warn};

use super::format::{SuccessPayload, format_result};
use super::{AgentContext, AgentDeps, AgentKind, AgentResult, ChatMessage, remember};
use crate::context::ContextGatherer;
use crate::error::PipelineError;
use crate::plan::{PromptInputs, build_prompt};
use crate::refine::RefinementController;

/// Generates a workout plan through the refinement loop.
#[derive(Debug)]
pub struct WorkoutPlanAgent {
    deps: AgentDeps,
    gatherer: ContextGatherer,
    controller: RefinementController,
}

impl WorkoutPlanAgent {
    pub fn new(deps: AgentDeps) -> Self {
        let gatherer = ContextGatherer::new(deps.profile_store.clone(), &deps.config);
        let controller = RefinementController::new(deps.invoker.clone(), &deps.config);
        Self {
            deps,
            gatherer,
            controller,
        }
    }

    /// Produce a plan for `context`. Never fails; failures are reported in
    /// the returned result.
    pub async fn generate(&self, context: &AgentContext) -> AgentResult {
        let mut warnings = Vec::new();
        let mut messages = context.previous_messages.clone();

        let outcome = self.try_generate(context, &mut warnings, &mut messages).await;
        if let Err(e) = &outcome {
            warn!(user_id = %context.user_profile.id, category = e.category(), error = %e, "workout plan generation failed");
        }

        let result = format_result(AgentKind::WorkoutPlan, outcome, messages, warnings);
        if context.user_profile.id.is_nil() {
            return result;
        }
        remember(&self.deps.memory, context.user_profile.id, result)
    }

    async fn try_generate(
        &self,
        context: &AgentContext,
        warnings: &mut Vec<String>,
        messages: &mut Vec<ChatMessage>,
    ) -> Result<SuccessPayload, PipelineError> {
        context.validate_for(AgentKind::WorkoutPlan)?;

        let profile = &context.user_profile;
        let level = profile.fitness_level.as_deref();
        info!(user_id = %profile.id, goals = context.goals.len(), "generating workout plan");

        let gathered = self.gatherer.gather(profile.id, level, warnings).await?;

        let preferences = match self.deps.memory.preferences(profile.id) {
            Ok(p) => p,
            Err(e) => {
                warn!(user_id = %profile.id, error = %e, "could not read saved preferences");
                warnings.push(format!("Saved preferences could not be read: {e}"));
                Map::new()
            }
        };

        let prompt = build_prompt(&PromptInputs {
            profile,
            preferences: &preferences,
            goals: &context.goals,
            research_data: context.research_data.as_ref(),
            medical_conditions: &gathered.profile.medical_conditions,
            contraindications: &gathered.profile.contraindications,
            past_workouts: &gathered.past_workouts,
            feedback: context.feedback.as_deref(),
        });

        let accepted = match self.controller.run(&prompt, level).await {
            Ok(accepted) => accepted,
            Err(e) => {
                let (last_prompt, last_raw) = e.last_exchange();
                messages.push(ChatMessage::system(last_prompt));
                if let Some(raw) = last_raw {
                    messages.push(ChatMessage::assistant(raw));
                }
                return Err(e.into());
            }
        };

        messages.push(ChatMessage::system(accepted.prompt.as_str()));
        messages.push(ChatMessage::assistant(accepted.raw_response.as_str()));

        let plan = serde_json::to_value(&accepted.exercises)
            .map_err(|e| PipelineError::Processing(format!("could not encode accepted plan: {e}")))?;

        let mut data = Map::new();
        data.insert("plan".to_string(), plan);
        data.insert(
            "refinementAttempts".to_string(),
            json!(accepted.attempts.len()),
        );
        data.insert(
            "medicalConditions".to_string(),
            Value::from(gathered.profile.medical_conditions.clone()),
        );

        Ok(SuccessPayload {
            data,
            reasoning: accepted.candidate.reasoning,
            explanations: accepted.candidate.explanations,
        })
    }
}
