//! CLI handlers for `fitplan condition` subcommands.
//!
//! Implements:
//! - `fitplan condition set <user-id> <condition>...` -- replace a user's conditions
//! - `fitplan condition show <user-id>`               -- print a user's conditions
//! - `fitplan condition clear <user-id>`              -- delete a user's conditions

use anyhow::{Context, Result};
use sqlx::PgPool;
use uuid::Uuid;

use fitplan_db::queries::medical_conditions;

use crate::ConditionCommands;

// -----------------------------------------------------------------------
// Public entry point
// -----------------------------------------------------------------------

/// Dispatch a `ConditionCommands` variant to the appropriate handler.
pub async fn run_condition_command(command: ConditionCommands, pool: &PgPool) -> Result<()> {
    match command {
        ConditionCommands::Set {
            user_id,
            conditions,
        } => cmd_set(pool, &user_id, &conditions).await,
        ConditionCommands::Show { user_id } => cmd_show(pool, &user_id).await,
        ConditionCommands::Clear { user_id } => cmd_clear(pool, &user_id).await,
    }
}

pub(crate) fn parse_user_id(raw: &str) -> Result<Uuid> {
    let id = Uuid::parse_str(raw).with_context(|| format!("invalid user ID: {raw}"))?;
    if id.is_nil() {
        anyhow::bail!("user ID must not be the nil UUID");
    }
    Ok(id)
}

// -----------------------------------------------------------------------
// fitplan condition set
// -----------------------------------------------------------------------

async fn cmd_set(pool: &PgPool, user_id: &str, conditions: &[String]) -> Result<()> {
    let id = parse_user_id(user_id)?;
    let row = medical_conditions::upsert_medical_conditions(pool, id, conditions).await?;

    if row.conditions.is_empty() {
        println!("User {id} now has no medical conditions on record.");
    } else {
        println!("Medical conditions for user {id}:");
        for condition in &row.conditions {
            println!("  - {condition}");
        }
    }
    Ok(())
}

// -----------------------------------------------------------------------
// fitplan condition show
// -----------------------------------------------------------------------

async fn cmd_show(pool: &PgPool, user_id: &str) -> Result<()> {
    let id = parse_user_id(user_id)?;
    match medical_conditions::get_medical_conditions(pool, id).await? {
        Some(row) if !row.conditions.is_empty() => {
            println!("Medical conditions for user {id}:");
            for condition in &row.conditions {
                println!("  - {condition}");
            }
            println!("Updated: {}", row.updated_at);
        }
        _ => println!("No medical conditions on record for user {id}."),
    }
    Ok(())
}

// -----------------------------------------------------------------------
// fitplan condition clear
// -----------------------------------------------------------------------

async fn cmd_clear(pool: &PgPool, user_id: &str) -> Result<()> {
    let id = parse_user_id(user_id)?;
    if medical_conditions::clear_medical_conditions(pool, id).await? {
        println!("Cleared medical conditions for user {id}.");
    } else {
        println!("No medical conditions on record for user {id}.");
    }
    Ok(())
}
