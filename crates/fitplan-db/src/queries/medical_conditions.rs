//! Database query functions for the `medical_conditions` table.

use anyhow::{Context, Result};
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::MedicalConditions;

/// Fetch the medical conditions row for a user.
///
/// Returns `Ok(None)` when the user has no row; callers treat that as "no
/// conditions", not as an error.
pub async fn get_medical_conditions(
    pool: &PgPool,
    user_id: Uuid,
) -> Result<Option<MedicalConditions>> {
    let row = sqlx::query_as::<_, MedicalConditions>(
        "SELECT user_id, conditions, updated_at FROM medical_conditions WHERE user_id = $1",
    )
    .bind(user_id)
    .fetch_optional(pool)
    .await
    .with_context(|| format!("failed to fetch medical conditions for user {user_id}"))?;

    Ok(row)
}

/// Replace a user's medical conditions. Blank entries are dropped.
pub async fn upsert_medical_conditions(
    pool: &PgPool,
    user_id: Uuid,
    conditions: &[String],
) -> Result<MedicalConditions> {
    let cleaned: Vec<String> = conditions
        .iter()
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty())
        .collect();

    let row = sqlx::query_as::<_, MedicalConditions>(
        "INSERT INTO medical_conditions (user_id, conditions) VALUES ($1, $2) \
         ON CONFLICT (user_id) DO UPDATE \
         SET conditions = EXCLUDED.conditions, updated_at = now() \
         RETURNING user_id, conditions, updated_at",
    )
    .bind(user_id)
    .bind(&cleaned)
    .fetch_one(pool)
    .await
    .with_context(|| format!("failed to store medical conditions for user {user_id}"))?;

    Ok(row)
}

/// Delete a user's medical conditions row. Returns whether a row existed.
pub async fn clear_medical_conditions(pool: &PgPool, user_id: Uuid) -> Result<bool> {
    let result = sqlx::query("DELETE FROM medical_conditions WHERE user_id = $1")
        .bind(user_id)
        .execute(pool)
        .await
        .with_context(|| format!("failed to clear medical conditions for user {user_id}"))?;

    Ok(result.rows_affected() > 0)
}
