use std::time::Duration;

use anyhow::{Context, Result, bail};
use sqlx::postgres::PgPoolOptions;
use sqlx::{Executor, PgPool};
use tracing::info;

use crate::config::DbConfig;

/// Migrations from `crates/fitplan-db/migrations/`, embedded at compile time.
pub static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!();

/// Tables the profile store owns, in the order `db-init` reports them.
pub const PROFILE_TABLES: [&str; 4] = [
    "medical_conditions",
    "contraindications",
    "workout_logs",
    "workout_feedback",
];

const MAX_CONNECTIONS: u32 = 5;
const ACQUIRE_TIMEOUT: Duration = Duration::from_secs(10);

fn pool_options() -> PgPoolOptions {
    PgPoolOptions::new()
        .max_connections(MAX_CONNECTIONS)
        .acquire_timeout(ACQUIRE_TIMEOUT)
}

/// Connect now; fails if the server is unreachable.
pub async fn create_pool(config: &DbConfig) -> Result<PgPool> {
    pool_options()
        .connect(&config.database_url)
        .await
        .with_context(|| format!("failed to connect to database at {}", config.database_url))
}

/// Build a pool that connects on first use.
///
/// Only a malformed URL fails here. An unreachable server surfaces from the
/// first query, which the profile store reports per call.
pub fn create_lazy_pool(config: &DbConfig) -> Result<PgPool> {
    pool_options()
        .connect_lazy(&config.database_url)
        .with_context(|| format!("invalid database URL {}", config.database_url))
}

pub async fn run_migrations(pool: &PgPool) -> Result<()> {
    MIGRATOR
        .run(pool)
        .await
        .context("failed to run database migrations")?;

    info!(known = MIGRATOR.iter().count(), "profile store schema is current");
    Ok(())
}

/// Quote `name` as a PostgreSQL identifier.
fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Create the configured database unless it already exists.
///
/// Returns `true` when the database was created.
pub async fn ensure_database_exists(config: &DbConfig) -> Result<bool> {
    let Some(db_name) = config.database_name() else {
        bail!("database URL {} does not name a database", config.database_url);
    };

    let maintenance = DbConfig::new(config.maintenance_url());
    let admin = pool_options()
        .max_connections(1)
        .connect(&maintenance.database_url)
        .await
        .with_context(|| format!("failed to reach {}", maintenance.database_url))?;

    let exists: bool =
        sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM pg_database WHERE datname = $1)")
            .bind(db_name)
            .fetch_one(&admin)
            .await
            .context("failed to look up database")?;

    if !exists {
        // CREATE DATABASE takes no bind parameters.
        admin
            .execute(format!("CREATE DATABASE {}", quote_identifier(db_name)).as_str())
            .await
            .with_context(|| format!("failed to create database {db_name}"))?;
        info!(db = db_name, "database created");
    }

    admin.close().await;
    Ok(!exists)
}

/// Row counts for the profile tables, in [`PROFILE_TABLES`] order.
pub async fn table_counts(pool: &PgPool) -> Result<Vec<(&'static str, i64)>> {
    let mut counts = Vec::with_capacity(PROFILE_TABLES.len());
    for table in PROFILE_TABLES {
        let count: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {table}"))
            .fetch_one(pool)
            .await
            .with_context(|| format!("failed to count rows in {table}"))?;
        counts.push((table, count));
    }
    Ok(counts)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identifiers_are_quoted_and_escaped() {
        assert_eq!(quote_identifier("fitplan"), "\"fitplan\"");
        assert_eq!(quote_identifier("Fit\"Plan"), "\"Fit\"\"Plan\"");
    }

    #[test]
    fn lazy_pool_accepts_unreachable_server() {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        let _guard = rt.enter();
        assert!(create_lazy_pool(&DbConfig::new("postgresql://127.0.0.1:1/nowhere")).is_ok());
    }

    #[test]
    fn lazy_pool_rejects_malformed_url() {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        let _guard = rt.enter();
        assert!(create_lazy_pool(&DbConfig::new("not a url")).is_err());
    }
}
