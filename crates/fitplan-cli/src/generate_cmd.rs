//! CLI handler for `fitplan generate`.
//!
//! Runs one agent against a JSON context file and prints the resulting
//! `AgentResult` as pretty JSON. A failed run still exits 0: the failure is
//! carried inside the printed result.

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use serde_json::{Map, Value};
use sqlx::PgPool;
use tracing::info;

use fitplan_core::completion::{CompletionInvoker, HttpCompletionClient};
use fitplan_core::context::PgProfileStore;
use fitplan_core::memory::SharedMemory;
use fitplan_core::{Agent, AgentContext, AgentDeps, AgentKind, AgentResult};

use crate::config::FitplanConfig;

/// Options for one `generate` run.
#[derive(Debug, Clone)]
pub struct GenerateOptions {
    pub context_file: String,
    pub agent: AgentKind,
    pub model: Option<String>,
    pub preferences_file: Option<String>,
}

/// Execute `fitplan generate` and print the result.
pub async fn run_generate(
    config: &FitplanConfig,
    pool: &PgPool,
    options: &GenerateOptions,
) -> Result<()> {
    let context = load_context(Path::new(&options.context_file))?;
    let preferences = match &options.preferences_file {
        Some(path) => Some(load_preferences(Path::new(path))?),
        None => None,
    };

    let result = generate(config, pool, options, &context, preferences).await?;

    let rendered =
        serde_json::to_string_pretty(&result).context("failed to serialize agent result")?;
    println!("{rendered}");
    Ok(())
}

/// Build the agent and run it once against `context`.
pub async fn generate(
    config: &FitplanConfig,
    pool: &PgPool,
    options: &GenerateOptions,
    context: &AgentContext,
    preferences: Option<Map<String, Value>>,
) -> Result<AgentResult> {
    let mut settings = config.completion.clone();
    if let Some(model) = &options.model {
        settings.model = model.clone();
    }

    let client = HttpCompletionClient::new(
        config.endpoint.base_url.clone(),
        config.endpoint.api_key.clone(),
        config.endpoint.api_key_env.clone(),
        config.endpoint.timeout,
    )
    .context("failed to build completion client")?;

    let model = settings.model.clone();
    let invoker = CompletionInvoker::new(
        Arc::new(client),
        settings,
        config.retry_policy.clone(),
        config.endpoint.timeout,
    );

    let memory = Arc::new(SharedMemory::new());
    if let Some(preferences) = preferences {
        let user_id = context.user_profile.id;
        memory
            .with_user(user_id, |store| store.store_user_preferences(preferences))
            .context("failed to seed user preferences")?;
    }

    let deps = AgentDeps {
        profile_store: Arc::new(PgProfileStore::new(pool.clone())),
        invoker: Arc::new(invoker),
        memory,
        config: config.pipeline.clone(),
    };

    let agent = Agent::new(options.agent, deps);
    info!(
        agent = %options.agent,
        user_id = %context.user_profile.id,
        model = %model,
        "running agent"
    );
    Ok(agent.run(context).await)
}

/// Read and decode an agent context file.
pub fn load_context(path: &Path) -> Result<AgentContext> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read context file: {}", path.display()))?;
    serde_json::from_str(&contents)
        .with_context(|| format!("failed to parse context file: {}", path.display()))
}

/// Read a preferences file: a JSON object merged into the user's memory.
pub fn load_preferences(path: &Path) -> Result<Map<String, Value>> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read preferences file: {}", path.display()))?;
    match serde_json::from_str::<Value>(&contents)
        .with_context(|| format!("failed to parse preferences file: {}", path.display()))?
    {
        Value::Object(map) => Ok(map),
        _ => bail!("preferences file must contain a JSON object"),
    }
}
