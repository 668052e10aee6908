//! Throwaway profile-store databases for integration tests.
//!
//! Every test database lives on one server per test binary: the one named by
//! `FITPLAN_TEST_PG_URL`, or a PostgreSQL container started on first use.

use sqlx::{Executor, PgPool};
use testcontainers::runners::AsyncRunner;
use testcontainers::{ContainerAsync, ImageExt};
use testcontainers_modules::postgres::Postgres;
use tokio::sync::OnceCell;
use uuid::Uuid;

use fitplan_db::config::DbConfig;
use fitplan_db::pool;

const SERVER_ENV: &str = "FITPLAN_TEST_PG_URL";

struct TestServer {
    config: DbConfig,
    _container: Option<ContainerAsync<Postgres>>,
}

static SERVER: OnceCell<TestServer> = OnceCell::const_new();

async fn start_server() -> TestServer {
    if let Ok(url) = std::env::var(SERVER_ENV) {
        return TestServer {
            config: DbConfig::new(url),
            _container: None,
        };
    }

    let container = Postgres::default()
        .with_tag("16")
        .start()
        .await
        .expect("failed to start PostgreSQL container");
    let host = container.get_host().await.expect("container host");
    let port = container
        .get_host_port_ipv4(5432)
        .await
        .expect("container port");

    TestServer {
        config: DbConfig::new(format!("postgresql://postgres:postgres@{host}:{port}")),
        _container: Some(container),
    }
}

async fn server() -> &'static DbConfig {
    &SERVER.get_or_init(start_server).await.config
}

/// Connection config for database `db_name` on the test server.
pub async fn test_db_config(db_name: &str) -> DbConfig {
    server().await.with_database(db_name)
}

/// Create a migrated database with a unique name.
///
/// Returns the pool and the name to hand to [`drop_test_db`].
pub async fn create_test_db() -> (PgPool, String) {
    let db_name = format!("fitplan_test_{}", Uuid::now_v7().simple());
    let config = test_db_config(&db_name).await;

    pool::ensure_database_exists(&config)
        .await
        .unwrap_or_else(|e| panic!("failed to create {db_name}: {e:#}"));
    let db = pool::create_pool(&config)
        .await
        .unwrap_or_else(|e| panic!("failed to connect to {db_name}: {e:#}"));
    pool::run_migrations(&db)
        .await
        .unwrap_or_else(|e| panic!("failed to migrate {db_name}: {e:#}"));

    (db, db_name)
}

/// Drop a database made by [`create_test_db`], closing its other sessions.
pub async fn drop_test_db(db_name: &str) {
    let maintenance = DbConfig::new(server().await.maintenance_url());
    let admin = pool::create_pool(&maintenance)
        .await
        .unwrap_or_else(|e| panic!("failed to reach maintenance database: {e:#}"));

    let _ = sqlx::query(
        "SELECT pg_terminate_backend(pid) FROM pg_stat_activity \
         WHERE datname = $1 AND pid <> pg_backend_pid()",
    )
    .bind(db_name)
    .execute(&admin)
    .await;
    // Generated names are plain lowercase identifiers.
    let _ = admin
        .execute(format!("DROP DATABASE IF EXISTS {db_name}").as_str())
        .await;
    admin.close().await;
}
