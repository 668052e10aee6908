//! Configuration file management for fitplan.
//!
//! Provides a TOML-based config file at `~/.config/fitplan/config.toml` and a
//! resolution chain: CLI flag > env var > config file > default.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};

use fitplan_core::completion::{CompletionSettings, RetryPolicy};
use fitplan_core::config::{
    DEFAULT_MAX_REFINEMENT_ATTEMPTS, DEFAULT_STORE_TIMEOUT, DEFAULT_WORKOUT_HISTORY_LIMIT,
};
use fitplan_core::PipelineConfig;
use fitplan_db::config::DbConfig;

/// Env var overriding `completion.base_url`.
pub const BASE_URL_ENV: &str = "FITPLAN_COMPLETION_BASE_URL";
/// Env var overriding `completion.model`.
pub const MODEL_ENV: &str = "FITPLAN_MODEL";

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_API_KEY_ENV: &str = "OPENAI_API_KEY";
const DEFAULT_TIMEOUT_SECS: u64 = 60;

// -----------------------------------------------------------------------
// Config file types
// -----------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigFile {
    pub database: DatabaseSection,
    #[serde(default)]
    pub completion: CompletionSection,
    #[serde(default)]
    pub pipeline: PipelineSection,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseSection {
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompletionSection {
    pub base_url: String,
    pub model: String,
    /// Name of the env var holding the API key. The key itself is never
    /// written to the config file.
    pub api_key_env: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub timeout_secs: u64,
}

impl Default for CompletionSection {
    fn default() -> Self {
        let settings = CompletionSettings::default();
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            model: settings.model,
            api_key_env: DEFAULT_API_KEY_ENV.to_string(),
            temperature: settings.temperature,
            max_tokens: settings.max_tokens,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineSection {
    pub max_refinement_attempts: u32,
    pub max_retries: u32,
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
    pub include_validation_feedback: bool,
    pub workout_history_limit: usize,
}

impl Default for PipelineSection {
    fn default() -> Self {
        let policy = RetryPolicy::default();
        Self {
            max_refinement_attempts: DEFAULT_MAX_REFINEMENT_ATTEMPTS,
            max_retries: policy.max_retries,
            initial_backoff_ms: policy.initial_backoff.as_millis() as u64,
            max_backoff_ms: policy.max_backoff.as_millis() as u64,
            include_validation_feedback: false,
            workout_history_limit: DEFAULT_WORKOUT_HISTORY_LIMIT,
        }
    }
}

impl ConfigFile {
    /// A config with the given database URL and default everything else.
    pub fn with_database_url(url: impl Into<String>) -> Self {
        Self {
            database: DatabaseSection { url: url.into() },
            completion: CompletionSection::default(),
            pipeline: PipelineSection::default(),
        }
    }
}

// -----------------------------------------------------------------------
// Paths
// -----------------------------------------------------------------------

/// Return the fitplan config directory.
///
/// Always uses XDG layout: `$XDG_CONFIG_HOME/fitplan` or `~/.config/fitplan`,
/// including on macOS.
pub fn config_dir() -> PathBuf {
    if let Ok(xdg) = std::env::var("XDG_CONFIG_HOME") {
        return PathBuf::from(xdg).join("fitplan");
    }
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config")
        .join("fitplan")
}

/// Return the path to the fitplan config file.
pub fn config_path() -> PathBuf {
    config_dir().join("config.toml")
}

// -----------------------------------------------------------------------
// Read / write
// -----------------------------------------------------------------------

/// Load and parse the config file. Returns an error if it does not exist.
pub fn load_config() -> Result<ConfigFile> {
    load_config_from(&config_path())
}

pub fn load_config_from(path: &Path) -> Result<ConfigFile> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config file at {}", path.display()))?;
    let config: ConfigFile = toml::from_str(&contents).context("failed to parse config file")?;
    Ok(config)
}

/// Serialize and write the config file, creating parent dirs as needed.
pub fn save_config(config: &ConfigFile) -> Result<()> {
    save_config_to(config, &config_path())
}

/// Write `config` to `path`. Sets file permissions to 0600 on Unix.
pub fn save_config_to(config: &ConfigFile, path: &Path) -> Result<()> {
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("failed to create config directory {}", dir.display()))?;
    }

    let contents = toml::to_string_pretty(config).context("failed to serialize config")?;
    std::fs::write(path, &contents)
        .with_context(|| format!("failed to write config file at {}", path.display()))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let perms = std::fs::Permissions::from_mode(0o600);
        std::fs::set_permissions(path, perms)
            .with_context(|| format!("failed to set permissions on {}", path.display()))?;
    }

    Ok(())
}

// -----------------------------------------------------------------------
// Resolved config
// -----------------------------------------------------------------------

/// Where and how to reach the completion service.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionEndpoint {
    pub base_url: String,
    pub api_key: Option<String>,
    /// Env var the key was read from.
    pub api_key_env: String,
    pub timeout: Duration,
}

/// Fully resolved configuration, ready for use.
#[derive(Debug, Clone)]
pub struct FitplanConfig {
    pub db_config: DbConfig,
    pub pipeline: PipelineConfig,
    pub retry_policy: RetryPolicy,
    pub completion: CompletionSettings,
    pub endpoint: CompletionEndpoint,
}

impl FitplanConfig {
    /// Resolve configuration from the real config file and environment.
    pub fn resolve(cli_db_url: Option<&str>) -> Result<Self> {
        Self::resolve_with(cli_db_url, load_config().ok(), |name| std::env::var(name).ok())
    }

    /// Resolve configuration using the chain: CLI flag > env var > config file > default.
    ///
    /// - DB URL: `cli_db_url` > `FITPLAN_DATABASE_URL` > `database.url` > `DbConfig::DEFAULT_URL`
    /// - Base URL: `FITPLAN_COMPLETION_BASE_URL` > `completion.base_url` > default
    /// - Model: `FITPLAN_MODEL` > `completion.model` > default
    /// - API key: the env var named by `completion.api_key_env`
    pub fn resolve_with(
        cli_db_url: Option<&str>,
        file_config: Option<ConfigFile>,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self> {
        let db_url = if let Some(url) = cli_db_url {
            url.to_string()
        } else if let Some(url) = env(DbConfig::URL_ENV) {
            url
        } else if let Some(ref cfg) = file_config {
            cfg.database.url.clone()
        } else {
            DbConfig::DEFAULT_URL.to_string()
        };
        let db_config = DbConfig::new(db_url);

        let (completion, pipeline) = match file_config {
            Some(cfg) => (cfg.completion, cfg.pipeline),
            None => (CompletionSection::default(), PipelineSection::default()),
        };

        if pipeline.max_refinement_attempts == 0 {
            bail!("pipeline.max_refinement_attempts must be at least 1");
        }
        if pipeline.initial_backoff_ms > pipeline.max_backoff_ms {
            bail!(
                "pipeline.initial_backoff_ms ({}) exceeds pipeline.max_backoff_ms ({})",
                pipeline.initial_backoff_ms,
                pipeline.max_backoff_ms
            );
        }
        if completion.timeout_secs == 0 {
            bail!("completion.timeout_secs must be at least 1");
        }

        let base_url = env(BASE_URL_ENV).unwrap_or(completion.base_url);
        let model = env(MODEL_ENV).unwrap_or(completion.model);
        let api_key = env(&completion.api_key_env).filter(|k| !k.trim().is_empty());

        Ok(Self {
            db_config,
            pipeline: PipelineConfig {
                max_refinement_attempts: pipeline.max_refinement_attempts,
                include_validation_feedback: pipeline.include_validation_feedback,
                workout_history_limit: pipeline.workout_history_limit,
                store_timeout: DEFAULT_STORE_TIMEOUT,
            },
            retry_policy: RetryPolicy {
                max_retries: pipeline.max_retries,
                initial_backoff: Duration::from_millis(pipeline.initial_backoff_ms),
                max_backoff: Duration::from_millis(pipeline.max_backoff_ms),
            },
            completion: CompletionSettings {
                model,
                temperature: completion.temperature,
                max_tokens: completion.max_tokens,
            },
            endpoint: CompletionEndpoint {
                base_url,
                api_key,
                api_key_env: completion.api_key_env,
                timeout: Duration::from_secs(completion.timeout_secs),
            },
        })
    }
}

// -----------------------------------------------------------------------
// Tests
// -----------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn env_of(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    fn no_env() -> impl Fn(&str) -> Option<String> {
        env_of(&[])
    }

    #[test]
    fn save_and_load_config_roundtrip() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("fitplan").join("config.toml");

        let mut original = ConfigFile::with_database_url("postgresql://testhost:5432/testdb");
        original.pipeline.max_refinement_attempts = 5;
        original.completion.model = "local-model".to_string();

        save_config_to(&original, &path).unwrap();
        let loaded = load_config_from(&path).unwrap();

        assert_eq!(loaded, original);
    }

    #[cfg(unix)]
    #[test]
    fn save_config_sets_permissions() {
        use std::os::unix::fs::PermissionsExt;

        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("config.toml");
        save_config_to(&ConfigFile::with_database_url("postgresql://x/y"), &path).unwrap();

        let meta = std::fs::metadata(&path).unwrap();
        assert_eq!(meta.permissions().mode() & 0o777, 0o600);
    }

    #[test]
    fn missing_sections_take_defaults() {
        let cfg: ConfigFile = toml::from_str(
            r#"
            [database]
            url = "postgresql://h:5432/db"

            [pipeline]
            max_refinement_attempts = 2
            "#,
        )
        .unwrap();

        assert_eq!(cfg.completion, CompletionSection::default());
        assert_eq!(cfg.pipeline.max_refinement_attempts, 2);
        assert_eq!(cfg.pipeline.max_retries, 3);
        assert_eq!(cfg.pipeline.workout_history_limit, 5);
        assert!(!cfg.pipeline.include_validation_feedback);
    }

    #[test]
    fn load_config_from_missing_file_errors() {
        let tmp = tempfile::TempDir::new().unwrap();
        let err = load_config_from(&tmp.path().join("nope.toml")).unwrap_err();
        assert!(err.to_string().contains("failed to read config file"));
    }

    #[test]
    fn resolve_with_cli_flag_overrides_all() {
        let file = ConfigFile::with_database_url("postgresql://file:5432/filedb");
        let env = env_of(&[(DbConfig::URL_ENV, "postgresql://env:5432/envdb")]);

        let config =
            FitplanConfig::resolve_with(Some("postgresql://cli:5432/clidb"), Some(file), env)
                .unwrap();
        assert_eq!(config.db_config.database_url, "postgresql://cli:5432/clidb");
    }

    #[test]
    fn resolve_with_env_var_overrides_config_file() {
        let file = ConfigFile::with_database_url("postgresql://file:5432/filedb");
        let env = env_of(&[(DbConfig::URL_ENV, "postgresql://env:5432/envdb")]);

        let config = FitplanConfig::resolve_with(None, Some(file), env).unwrap();
        assert_eq!(config.db_config.database_url, "postgresql://env:5432/envdb");
    }

    #[test]
    fn resolve_uses_config_file_when_no_override() {
        let file = ConfigFile::with_database_url("postgresql://file:5432/filedb");
        let config = FitplanConfig::resolve_with(None, Some(file), no_env()).unwrap();
        assert_eq!(config.db_config.database_url, "postgresql://file:5432/filedb");
    }

    #[test]
    fn resolve_defaults_when_nothing_set() {
        let config = FitplanConfig::resolve_with(None, None, no_env()).unwrap();

        assert_eq!(config.db_config.database_url, DbConfig::DEFAULT_URL);
        assert_eq!(config.pipeline, PipelineConfig::default());
        assert_eq!(config.retry_policy, RetryPolicy::default());
        assert_eq!(config.completion, CompletionSettings::default());
        assert_eq!(config.endpoint.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.endpoint.api_key, None);
        assert_eq!(config.endpoint.api_key_env, DEFAULT_API_KEY_ENV);
    }

    #[test]
    fn resolve_reads_api_key_from_named_env_var() {
        let mut file = ConfigFile::with_database_url("postgresql://h/db");
        file.completion.api_key_env = "MY_KEY".to_string();
        let env = env_of(&[("MY_KEY", "sk-test"), (DEFAULT_API_KEY_ENV, "sk-other")]);

        let config = FitplanConfig::resolve_with(None, Some(file), env).unwrap();
        assert_eq!(config.endpoint.api_key.as_deref(), Some("sk-test"));
        assert_eq!(config.endpoint.api_key_env, "MY_KEY");
    }

    #[test]
    fn resolve_ignores_blank_api_key() {
        let env = env_of(&[(DEFAULT_API_KEY_ENV, "   ")]);
        let config = FitplanConfig::resolve_with(None, None, env).unwrap();
        assert_eq!(config.endpoint.api_key, None);
    }

    #[test]
    fn resolve_env_overrides_model_and_base_url() {
        let env = env_of(&[
            (MODEL_ENV, "env-model"),
            (BASE_URL_ENV, "http://localhost:8080/v1"),
        ]);
        let config = FitplanConfig::resolve_with(None, None, env).unwrap();
        assert_eq!(config.completion.model, "env-model");
        assert_eq!(config.endpoint.base_url, "http://localhost:8080/v1");
    }

    #[test]
    fn resolve_maps_pipeline_section() {
        let mut file = ConfigFile::with_database_url("postgresql://h/db");
        file.pipeline = PipelineSection {
            max_refinement_attempts: 4,
            max_retries: 1,
            initial_backoff_ms: 100,
            max_backoff_ms: 400,
            include_validation_feedback: true,
            workout_history_limit: 0,
        };

        let config = FitplanConfig::resolve_with(None, Some(file), no_env()).unwrap();
        assert_eq!(config.pipeline.max_refinement_attempts, 4);
        assert!(config.pipeline.include_validation_feedback);
        assert_eq!(config.pipeline.workout_history_limit, 0);
        assert_eq!(config.retry_policy.max_retries, 1);
        assert_eq!(config.retry_policy.initial_backoff, Duration::from_millis(100));
        assert_eq!(config.retry_policy.max_backoff, Duration::from_millis(400));
    }

    #[test]
    fn resolve_rejects_zero_refinement_attempts() {
        let mut file = ConfigFile::with_database_url("postgresql://h/db");
        file.pipeline.max_refinement_attempts = 0;

        let err = FitplanConfig::resolve_with(None, Some(file), no_env()).unwrap_err();
        assert!(err.to_string().contains("max_refinement_attempts"));
    }

    #[test]
    fn resolve_rejects_inverted_backoff() {
        let mut file = ConfigFile::with_database_url("postgresql://h/db");
        file.pipeline.initial_backoff_ms = 9000;

        let err = FitplanConfig::resolve_with(None, Some(file), no_env()).unwrap_err();
        assert!(err.to_string().contains("exceeds"));
    }

    #[test]
    fn config_path_ends_with_expected_filename() {
        let path = config_path();
        assert!(
            path.ends_with("fitplan/config.toml"),
            "unexpected config path: {}",
            path.display()
        );
    }
}
