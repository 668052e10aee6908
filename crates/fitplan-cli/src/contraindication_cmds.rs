//! CLI handlers for `fitplan contraindication` subcommands.
//!
//! Implements:
//! - `fitplan contraindication add <condition> --avoid a,b` -- record exercises to avoid
//! - `fitplan contraindication list`                        -- list every contraindication

use anyhow::{Result, bail};
use sqlx::PgPool;

use fitplan_db::queries::contraindications::{self, NewContraindication};

use crate::ContraindicationCommands;

/// Dispatch a `ContraindicationCommands` variant to the appropriate handler.
pub async fn run_contraindication_command(
    command: ContraindicationCommands,
    pool: &PgPool,
) -> Result<()> {
    match command {
        ContraindicationCommands::Add {
            condition,
            avoid,
            notes,
        } => cmd_add(pool, &condition, &avoid, notes.as_deref()).await,
        ContraindicationCommands::List => cmd_list(pool).await,
    }
}

/// Split a comma-separated exercise list, dropping blank entries.
fn split_exercises(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_owned)
        .collect()
}

async fn cmd_add(pool: &PgPool, condition: &str, avoid: &str, notes: Option<&str>) -> Result<()> {
    if condition.trim().is_empty() {
        bail!("condition must not be blank");
    }
    let exercises = split_exercises(avoid);

    let row = contraindications::upsert_contraindication(
        pool,
        &NewContraindication {
            condition,
            exercises_to_avoid: &exercises,
            notes,
        },
    )
    .await?;

    println!("Contraindication stored:");
    println!("  Condition: {}", row.condition);
    if row.exercises_to_avoid.is_empty() {
        println!("  Avoid:     (none listed)");
    } else {
        println!("  Avoid:     {}", row.exercises_to_avoid.join(", "));
    }
    if let Some(notes) = &row.notes {
        println!("  Notes:     {notes}");
    }
    Ok(())
}

async fn cmd_list(pool: &PgPool) -> Result<()> {
    let rows = contraindications::list_contraindications(pool).await?;

    if rows.is_empty() {
        println!("No contraindications found. Use `fitplan contraindication add` to create one.");
        return Ok(());
    }

    let cond_w = rows
        .iter()
        .map(|r| r.condition.len())
        .max()
        .unwrap_or(9)
        .max(9);

    println!("{:<cond_w$}  AVOID", "CONDITION");
    println!("{:-<cond_w$}  {:-<5}", "", "");
    for row in &rows {
        println!("{:<cond_w$}  {}", row.condition, row.exercises_to_avoid.join(", "));
    }
    Ok(())
}
