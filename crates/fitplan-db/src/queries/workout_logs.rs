//! Database query functions for the `workout_logs` and `workout_feedback`
//! tables.

use anyhow::{Context, Result};
use sqlx::PgPool;
use sqlx::types::Json;
use uuid::Uuid;

use crate::models::{FeedbackRating, WorkoutFeedback, WorkoutLog};

/// Parameters for inserting a workout log row.
#[derive(Debug, Clone)]
pub struct NewWorkoutLog<'a> {
    pub user_id: Uuid,
    pub title: &'a str,
    pub exercises: &'a serde_json::Value,
    pub notes: Option<&'a str>,
}

/// Insert a workout log. `performed_at` defaults to now.
pub async fn insert_workout_log(pool: &PgPool, new: &NewWorkoutLog<'_>) -> Result<WorkoutLog> {
    let log = sqlx::query_as::<_, WorkoutLog>(
        "INSERT INTO workout_logs (user_id, title, exercises, notes) \
         VALUES ($1, $2, $3, $4) \
         RETURNING *",
    )
    .bind(new.user_id)
    .bind(new.title)
    .bind(Json(new.exercises))
    .bind(new.notes)
    .fetch_one(pool)
    .await
    .with_context(|| format!("failed to insert workout log for user {}", new.user_id))?;

    Ok(log)
}

/// Fetch a user's most recent workout logs, newest first.
pub async fn recent_workout_logs(
    pool: &PgPool,
    user_id: Uuid,
    limit: i64,
) -> Result<Vec<WorkoutLog>> {
    let logs = sqlx::query_as::<_, WorkoutLog>(
        "SELECT * FROM workout_logs \
         WHERE user_id = $1 \
         ORDER BY performed_at DESC \
         LIMIT $2",
    )
    .bind(user_id)
    .bind(limit)
    .fetch_all(pool)
    .await
    .with_context(|| format!("failed to fetch workout logs for user {user_id}"))?;

    Ok(logs)
}

/// Attach feedback to a logged workout.
pub async fn insert_feedback(
    pool: &PgPool,
    log_id: Uuid,
    rating: FeedbackRating,
    comment: Option<&str>,
) -> Result<WorkoutFeedback> {
    let feedback = sqlx::query_as::<_, WorkoutFeedback>(
        "INSERT INTO workout_feedback (log_id, rating, comment) \
         VALUES ($1, $2, $3) \
         RETURNING *",
    )
    .bind(log_id)
    .bind(rating)
    .bind(comment)
    .fetch_one(pool)
    .await
    .with_context(|| format!("failed to insert feedback for workout log {log_id}"))?;

    Ok(feedback)
}

/// Fetch all feedback attached to any of `log_ids`, oldest first.
pub async fn feedback_for_logs(pool: &PgPool, log_ids: &[Uuid]) -> Result<Vec<WorkoutFeedback>> {
    if log_ids.is_empty() {
        return Ok(Vec::new());
    }

    let rows = sqlx::query_as::<_, WorkoutFeedback>(
        "SELECT * FROM workout_feedback \
         WHERE log_id = ANY($1) \
         ORDER BY created_at",
    )
    .bind(log_ids)
    .fetch_all(pool)
    .await
    .context("failed to fetch workout feedback")?;

    Ok(rows)
}
