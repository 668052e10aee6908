//! Nutrition plan agent.
//!
//! Computes daily macro targets from the profile when it carries enough
//! body data, then asks the completion service for a meal plan that hits
//! them. There is no refinement loop: one invocation (with the invoker's own
//! retries) either yields a usable meal list or fails.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{info, warn};

use super::format::{SuccessPayload, format_result};
use super::{AgentContext, AgentDeps, AgentKind, AgentResult, ChatMessage, UserProfile, remember};
use crate::error::PipelineError;
use crate::plan::decode_json_object;

const PROTEIN_G_PER_KG: f64 = 1.8;
const FAT_SHARE: f64 = 0.25;
const DEFICIT_KCAL: f64 = 500.0;
const SURPLUS_KCAL: f64 = 300.0;
const MIN_CALORIES: f64 = 1200.0;

/// Biological sex as used by the BMR equation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sex {
    Male,
    Female,
}

/// Which way the user wants their weight to go.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GoalDirection {
    Lose,
    Maintain,
    Gain,
}

impl GoalDirection {
    /// Read the direction from free-text goals. Loss wins over gain when
    /// both appear.
    pub fn from_goals(goals: &[String]) -> Self {
        let text = goals.join(" ").to_lowercase();
        let any = |words: &[&str]| words.iter().any(|w| text.contains(w));
        if any(&["lose", "loss", "cut", "lean out", "slim"]) {
            Self::Lose
        } else if any(&["gain", "bulk", "build muscle", "muscle", "mass"]) {
            Self::Gain
        } else {
            Self::Maintain
        }
    }

    fn calorie_adjustment(self) -> f64 {
        match self {
            Self::Lose => -DEFICIT_KCAL,
            Self::Maintain => 0.0,
            Self::Gain => SURPLUS_KCAL,
        }
    }
}

/// Daily intake targets.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MacroTargets {
    pub calories: u32,
    pub protein_g: u32,
    pub fat_g: u32,
    pub carbs_g: u32,
    pub direction: GoalDirection,
}

/// Body data needed for the macro calculation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BodyMetrics {
    pub weight_kg: f64,
    pub height_cm: f64,
    pub age_years: f64,
    pub sex: Sex,
    pub activity_factor: f64,
}

impl BodyMetrics {
    /// Pull metrics out of the profile's free-form fields. `None` if any
    /// required value is missing or not positive.
    pub fn from_profile(profile: &UserProfile) -> Option<Self> {
        let d = &profile.details;
        let weight_kg = number(d, &["weightKg", "weight"])?;
        let height_cm = number(d, &["heightCm", "height"])?;
        let age_years = number(d, &["age"])?;
        let sex = match text(d, &["sex", "gender"])?.as_str() {
            "male" | "m" | "man" => Sex::Male,
            "female" | "f" | "woman" => Sex::Female,
            _ => return None,
        };
        let activity_factor = text(d, &["activityLevel"])
            .map(|level| activity_factor(&level))
            .unwrap_or(1.2);

        Some(Self {
            weight_kg,
            height_cm,
            age_years,
            sex,
            activity_factor,
        })
    }

    /// Mifflin-St Jeor basal metabolic rate, kcal/day.
    pub fn bmr(&self) -> f64 {
        let base = 10.0 * self.weight_kg + 6.25 * self.height_cm - 5.0 * self.age_years;
        match self.sex {
            Sex::Male => base + 5.0,
            Sex::Female => base - 161.0,
        }
    }
}

fn activity_factor(level: &str) -> f64 {
    match level.replace([' ', '-'], "_").as_str() {
        "sedentary" => 1.2,
        "light" | "lightly_active" => 1.375,
        "moderate" | "moderately_active" => 1.55,
        "active" => 1.725,
        "very_active" | "extra_active" | "athlete" => 1.9,
        _ => 1.2,
    }
}

fn number(details: &Map<String, Value>, keys: &[&str]) -> Option<f64> {
    keys.iter()
        .find_map(|k| details.get(*k))
        .and_then(|v| match v {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        })
        .filter(|n| *n > 0.0)
}

fn text(details: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter()
        .find_map(|k| details.get(*k))
        .and_then(Value::as_str)
        .map(|s| s.trim().to_lowercase())
}

/// Daily targets for `metrics` and `direction`: protein by body weight, a
/// fixed fat share of calories, carbohydrate for the remainder.
pub fn calculate_macros(metrics: &BodyMetrics, direction: GoalDirection) -> MacroTargets {
    let tdee = metrics.bmr() * metrics.activity_factor;
    let calories = (tdee + direction.calorie_adjustment()).max(MIN_CALORIES);
    let protein_g = PROTEIN_G_PER_KG * metrics.weight_kg;
    let fat_g = calories * FAT_SHARE / 9.0;
    let carbs_g = ((calories - protein_g * 4.0 - fat_g * 9.0) / 4.0).max(0.0);

    MacroTargets {
        calories: calories.round() as u32,
        protein_g: protein_g.round() as u32,
        fat_g: fat_g.round() as u32,
        carbs_g: carbs_g.round() as u32,
        direction,
    }
}

/// Generates a meal plan for the user's goals.
#[derive(Debug)]
pub struct NutritionAgent {
    deps: AgentDeps,
}

impl NutritionAgent {
    pub fn new(deps: AgentDeps) -> Self {
        Self { deps }
    }

    pub async fn generate(&self, context: &AgentContext) -> AgentResult {
        let mut warnings = Vec::new();
        let mut messages = context.previous_messages.clone();

        let outcome = self.try_generate(context, &mut warnings, &mut messages).await;
        if let Err(e) = &outcome {
            warn!(user_id = %context.user_profile.id, category = e.category(), error = %e, "nutrition plan generation failed");
        }

        let result = format_result(AgentKind::Nutrition, outcome, messages, warnings);
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
        context.validate_for(AgentKind::Nutrition)?;
        let profile = &context.user_profile;

        let direction = GoalDirection::from_goals(&context.goals);
        let macros = BodyMetrics::from_profile(profile).map(|m| calculate_macros(&m, direction));
        if macros.is_none() {
            warnings.push(
                "Macro targets were not calculated: the profile needs weight, height, age and sex."
                    .to_string(),
            );
        }
        info!(user_id = %profile.id, ?direction, has_macros = macros.is_some(), "generating nutrition plan");

        let prompt = build_nutrition_prompt(context, macros.as_ref());
        messages.push(ChatMessage::system(prompt.as_str()));

        let raw = self.deps.invoker.invoke(&prompt).await?;
        messages.push(ChatMessage::assistant(raw.as_str()));

        let mut object = decode_json_object(&raw).map_err(|f| {
            PipelineError::Processing(format!("could not parse a meal plan from the completion response: {f}"))
        })?;

        let meals = match object.remove("meals") {
            Some(Value::Array(meals)) if !meals.is_empty() => meals,
            _ => {
                return Err(PipelineError::Processing(
                    "meal plan response has no meals".to_string(),
                ));
            }
        };

        let mut data = Map::new();
        data.insert("meals".to_string(), Value::Array(meals));
        if let Some(m) = macros {
            let encoded = serde_json::to_value(m)
                .map_err(|e| PipelineError::Processing(format!("could not encode macro targets: {e}")))?;
            data.insert("macros".to_string(), encoded);
        }

        Ok(SuccessPayload {
            data,
            reasoning: string_field(&object, "reasoning"),
            explanations: string_field(&object, "explanations"),
        })
    }
}

fn string_field(object: &Map<String, Value>, key: &str) -> Option<String> {
    object.get(key).and_then(Value::as_str).map(str::to_string)
}

fn build_nutrition_prompt(context: &AgentContext, macros: Option<&MacroTargets>) -> String {
    let mut out = String::from(
        "You are a registered dietitian. Create a one-day meal plan for the user described below.\n",
    );

    out.push_str("\nUser Profile:\n");
    for (key, value) in &context.user_profile.details {
        out.push_str(&format!("- {key}: {value}\n"));
    }

    out.push_str("\nGoals:\n");
    if context.goals.is_empty() {
        out.push_str("No specific goals provided.\n");
    }
    for goal in &context.goals {
        out.push_str(&format!("- {goal}\n"));
    }

    out.push_str("\nDaily Targets:\n");
    match macros {
        Some(m) => {
            out.push_str(&format!(
                "{} kcal, {} g protein, {} g fat, {} g carbohydrate\n",
                m.calories, m.protein_g, m.fat_g, m.carbs_g
            ));
        }
        None => out.push_str("Not available; choose sensible portions for the goals.\n"),
    }

    if let Some(feedback) = context.feedback.as_deref().map(str::trim).filter(|f| !f.is_empty()) {
        out.push_str(&format!("\nUser Feedback on Previous Plan:\n{feedback}\n"));
    }

    out.push_str(
        r#"
Respond with a single JSON object and nothing else, in this format:
{
  "meals": [
    {"name": "Breakfast", "foods": ["..."], "calories": 500}
  ],
  "explanations": "How the meals meet the targets",
  "reasoning": "Why this plan suits the goals"
}
"#,
    );
    out
}
