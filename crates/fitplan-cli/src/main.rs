mod condition_cmds;
mod config;
mod contraindication_cmds;
mod generate_cmd;
mod workout_cmds;

use clap::{Parser, Subcommand};

use fitplan_core::AgentKind;
use fitplan_db::pool;

use config::FitplanConfig;
use generate_cmd::GenerateOptions;

#[derive(Parser)]
#[command(name = "fitplan", about = "Workout and nutrition plan generation")]
struct Cli {
    /// Database URL (overrides FITPLAN_DATABASE_URL env var)
    #[arg(long, global = true)]
    database_url: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Write a fitplan config file (no database required)
    Init {
        /// PostgreSQL connection URL
        #[arg(long, default_value = "postgresql://localhost:5432/fitplan")]
        db_url: String,
        /// Overwrite existing config file
        #[arg(long)]
        force: bool,
    },
    /// Initialize the fitplan database (requires config file or env vars)
    DbInit,
    /// Medical conditions per user
    Condition {
        #[command(subcommand)]
        command: ConditionCommands,
    },
    /// Exercises to avoid per medical condition
    Contraindication {
        #[command(subcommand)]
        command: ContraindicationCommands,
    },
    /// Workout logs and feedback
    Workout {
        #[command(subcommand)]
        command: WorkoutCommands,
    },
    /// Run an agent against a JSON context file and print the result
    Generate {
        /// Path to the agent context JSON file
        context_file: String,
        /// Agent to run: workout-plan or nutrition
        #[arg(long, default_value = "workout-plan")]
        agent: AgentKind,
        /// Override the completion model
        #[arg(long)]
        model: Option<String>,
        /// JSON object of saved user preferences to seed memory with
        #[arg(long)]
        preferences: Option<String>,
    },
}

#[derive(Subcommand)]
pub enum ConditionCommands {
    /// Replace a user's medical conditions
    Set {
        /// User ID (UUID)
        user_id: String,
        /// One or more condition labels
        #[arg(required = true)]
        conditions: Vec<String>,
    },
    /// Show a user's medical conditions
    Show {
        /// User ID (UUID)
        user_id: String,
    },
    /// Remove a user's medical conditions
    Clear {
        /// User ID (UUID)
        user_id: String,
    },
}

#[derive(Subcommand)]
pub enum ContraindicationCommands {
    /// Add or replace the exercises to avoid for a condition
    Add {
        /// Condition label (matched case-insensitively)
        condition: String,
        /// Comma-separated exercises to avoid (e.g. "Squat,Lunge")
        #[arg(long, default_value = "")]
        avoid: String,
        /// Free-form notes
        #[arg(long)]
        notes: Option<String>,
    },
    /// List all contraindications
    List,
}

#[derive(Subcommand)]
pub enum WorkoutCommands {
    /// Log a completed workout
    Log {
        /// User ID (UUID)
        user_id: String,
        /// Workout title
        #[arg(long)]
        title: String,
        /// Path to a JSON array describing the exercises performed
        #[arg(long)]
        exercises_file: String,
        /// Free-form notes
        #[arg(long)]
        notes: Option<String>,
    },
    /// Rate a logged workout
    Feedback {
        /// Workout log ID (UUID)
        log_id: String,
        /// up or down
        #[arg(long)]
        rating: String,
        /// Optional comment
        #[arg(long)]
        comment: Option<String>,
    },
    /// List a user's recent workouts
    History {
        /// User ID (UUID)
        user_id: String,
        /// Maximum number of workouts to show
        #[arg(long, default_value_t = 10)]
        limit: i64,
    },
}

/// Execute the `fitplan init` command: write config file.
fn cmd_init(db_url: &str, force: bool) -> anyhow::Result<()> {
    let path = config::config_path();

    if path.exists() && !force {
        anyhow::bail!(
            "config file already exists at {}\nUse --force to overwrite.",
            path.display()
        );
    }

    let cfg = config::ConfigFile::with_database_url(db_url);
    config::save_config(&cfg)?;

    println!("Config written to {}", path.display());
    println!("  database.url = {db_url}");
    println!("  completion.model = {}", cfg.completion.model);
    println!(
        "  completion.api_key_env = {} (export the key there)",
        cfg.completion.api_key_env
    );
    println!();
    println!("Next: run `fitplan db-init` to create and migrate the database.");

    Ok(())
}

/// Execute the `fitplan db-init` command: create database and run migrations.
async fn cmd_db_init(cli_db_url: Option<&str>) -> anyhow::Result<()> {
    let resolved = FitplanConfig::resolve(cli_db_url)?;

    println!("Initializing fitplan database...");

    if pool::ensure_database_exists(&resolved.db_config).await? {
        println!("Created database {}.", resolved.db_config.database_url);
    }
    let db_pool = pool::create_pool(&resolved.db_config).await?;
    pool::run_migrations(&db_pool).await?;

    let counts = pool::table_counts(&db_pool).await?;
    println!("Database ready. Tables:");
    for (table, count) in &counts {
        println!("  {table}: {count} rows");
    }

    db_pool.close().await;

    println!("fitplan db-init complete.");
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Init { db_url, force } => {
            cmd_init(&db_url, force)?;
        }
        Commands::DbInit => {
            cmd_db_init(cli.database_url.as_deref()).await?;
        }
        Commands::Condition { command } => {
            let resolved = FitplanConfig::resolve(cli.database_url.as_deref())?;
            let db_pool = pool::create_pool(&resolved.db_config).await?;
            let result = condition_cmds::run_condition_command(command, &db_pool).await;
            db_pool.close().await;
            result?;
        }
        Commands::Contraindication { command } => {
            let resolved = FitplanConfig::resolve(cli.database_url.as_deref())?;
            let db_pool = pool::create_pool(&resolved.db_config).await?;
            let result =
                contraindication_cmds::run_contraindication_command(command, &db_pool).await;
            db_pool.close().await;
            result?;
        }
        Commands::Workout { command } => {
            let resolved = FitplanConfig::resolve(cli.database_url.as_deref())?;
            let db_pool = pool::create_pool(&resolved.db_config).await?;
            let result = workout_cmds::run_workout_command(command, &db_pool).await;
            db_pool.close().await;
            result?;
        }
        Commands::Generate {
            context_file,
            agent,
            model,
            preferences,
        } => {
            let resolved = FitplanConfig::resolve(cli.database_url.as_deref())?;
            // Lazy so an unreachable database shows up in the result, not here.
            let db_pool = pool::create_lazy_pool(&resolved.db_config)?;
            let options = GenerateOptions {
                context_file,
                agent,
                model,
                preferences_file: preferences,
            };
            let result = generate_cmd::run_generate(&resolved, &db_pool, &options).await;
            db_pool.close().await;
            result?;
        }
    }

    Ok(())
}
