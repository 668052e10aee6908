//! Database query functions for the `contraindications` table.

use anyhow::{Context, Result};
use sqlx::PgPool;

use crate::models::Contraindication;

/// Parameters for inserting a contraindication row.
#[derive(Debug, Clone)]
pub struct NewContraindication<'a> {
    pub condition: &'a str,
    pub exercises_to_avoid: &'a [String],
    pub notes: Option<&'a str>,
}

/// Insert a contraindication, or replace the exercise list of an existing
/// row for the same condition.
pub async fn upsert_contraindication(
    pool: &PgPool,
    new: &NewContraindication<'_>,
) -> Result<Contraindication> {
    let row = sqlx::query_as::<_, Contraindication>(
        "INSERT INTO contraindications (condition, exercises_to_avoid, notes) \
         VALUES ($1, $2, $3) \
         ON CONFLICT (condition) DO UPDATE \
         SET exercises_to_avoid = EXCLUDED.exercises_to_avoid, notes = EXCLUDED.notes \
         RETURNING *",
    )
    .bind(new.condition.trim())
    .bind(new.exercises_to_avoid)
    .bind(new.notes)
    .fetch_one(pool)
    .await
    .with_context(|| format!("failed to store contraindication {:?}", new.condition))?;

    Ok(row)
}

/// Fetch the contraindications whose condition is one of `conditions`.
///
/// Matching is case-insensitive and ignores surrounding whitespace on both
/// sides. Rows come back in the stored casing, ordered by condition.
pub async fn list_contraindications_for(
    pool: &PgPool,
    conditions: &[String],
) -> Result<Vec<Contraindication>> {
    if conditions.is_empty() {
        return Ok(Vec::new());
    }

    let normalized: Vec<String> = conditions
        .iter()
        .map(|c| c.trim().to_lowercase())
        .collect();

    let rows = sqlx::query_as::<_, Contraindication>(
        "SELECT * FROM contraindications \
         WHERE lower(btrim(condition)) = ANY($1) \
         ORDER BY condition",
    )
    .bind(&normalized)
    .fetch_all(pool)
    .await
    .context("failed to fetch contraindications")?;

    Ok(rows)
}

/// List every contraindication, ordered by condition.
pub async fn list_contraindications(pool: &PgPool) -> Result<Vec<Contraindication>> {
    let rows = sqlx::query_as::<_, Contraindication>(
        "SELECT * FROM contraindications ORDER BY condition",
    )
    .fetch_all(pool)
    .await
    .context("failed to list contraindications")?;

    Ok(rows)
}
