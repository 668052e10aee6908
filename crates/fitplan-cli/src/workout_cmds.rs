//! CLI handlers for `fitplan workout` subcommands.
//!
//! Implements:
//! - `fitplan workout log <user-id> --title T --exercises-file F` -- record a completed workout
//! - `fitplan workout feedback <log-id> --rating up|down`          -- rate a logged workout
//! - `fitplan workout history <user-id>`                           -- list recent workouts

use anyhow::{Context, Result, bail};
use serde_json::Value;
use sqlx::PgPool;
use uuid::Uuid;

use fitplan_db::models::FeedbackRating;
use fitplan_db::queries::workout_logs::{self, NewWorkoutLog};

use crate::WorkoutCommands;
use crate::condition_cmds::parse_user_id;

/// Dispatch a `WorkoutCommands` variant to the appropriate handler.
pub async fn run_workout_command(command: WorkoutCommands, pool: &PgPool) -> Result<()> {
    match command {
        WorkoutCommands::Log {
            user_id,
            title,
            exercises_file,
            notes,
        } => cmd_log(pool, &user_id, &title, &exercises_file, notes.as_deref()).await,
        WorkoutCommands::Feedback {
            log_id,
            rating,
            comment,
        } => cmd_feedback(pool, &log_id, &rating, comment.as_deref()).await,
        WorkoutCommands::History { user_id, limit } => cmd_history(pool, &user_id, limit).await,
    }
}

/// Parse the exercises file: a JSON array of whatever the client logged.
fn parse_exercises(contents: &str) -> Result<Value> {
    let value: Value = serde_json::from_str(contents).context("exercises file is not valid JSON")?;
    if !value.is_array() {
        bail!("exercises file must contain a JSON array");
    }
    Ok(value)
}

// -----------------------------------------------------------------------
// fitplan workout log
// -----------------------------------------------------------------------

async fn cmd_log(
    pool: &PgPool,
    user_id: &str,
    title: &str,
    exercises_file: &str,
    notes: Option<&str>,
) -> Result<()> {
    let user_id = parse_user_id(user_id)?;
    let contents = std::fs::read_to_string(exercises_file)
        .with_context(|| format!("failed to read exercises file: {exercises_file}"))?;
    let exercises = parse_exercises(&contents)
        .with_context(|| format!("failed to parse exercises file: {exercises_file}"))?;

    let log = workout_logs::insert_workout_log(
        pool,
        &NewWorkoutLog {
            user_id,
            title,
            exercises: &exercises,
            notes,
        },
    )
    .await?;

    println!("Workout logged.");
    println!("  Log ID:    {}", log.id);
    println!("  Title:     {}", log.title);
    println!("  Performed: {}", log.performed_at);
    Ok(())
}

// -----------------------------------------------------------------------
// fitplan workout feedback
// -----------------------------------------------------------------------

async fn cmd_feedback(
    pool: &PgPool,
    log_id: &str,
    rating: &str,
    comment: Option<&str>,
) -> Result<()> {
    let log_id =
        Uuid::parse_str(log_id).with_context(|| format!("invalid workout log ID: {log_id}"))?;
    let rating: FeedbackRating = rating.parse()?;

    let feedback = workout_logs::insert_feedback(pool, log_id, rating, comment)
        .await
        .with_context(|| format!("does workout log {log_id} exist?"))?;

    println!("Feedback {} recorded ({}).", feedback.id, feedback.rating);
    Ok(())
}

// -----------------------------------------------------------------------
// fitplan workout history
// -----------------------------------------------------------------------

async fn cmd_history(pool: &PgPool, user_id: &str, limit: i64) -> Result<()> {
    let user_id = parse_user_id(user_id)?;
    let logs = workout_logs::recent_workout_logs(pool, user_id, limit).await?;

    if logs.is_empty() {
        println!("No workouts logged for user {user_id}.");
        return Ok(());
    }

    for log in &logs {
        println!(
            "{}  {}  {}",
            log.performed_at.format("%Y-%m-%d"),
            log.id,
            log.title
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_exercises_accepts_array() {
        let value = parse_exercises(r#"[{"exercise": "Squat", "sets": 3}]"#).unwrap();
        assert_eq!(value.as_array().map(Vec::len), Some(1));
    }

    #[test]
    fn parse_exercises_rejects_object() {
        let err = parse_exercises(r#"{"exercise": "Squat"}"#).unwrap_err();
        assert!(err.to_string().contains("JSON array"));
    }

    #[test]
    fn parse_exercises_rejects_invalid_json() {
        assert!(parse_exercises("not json").is_err());
    }
}
