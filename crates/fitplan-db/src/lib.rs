//! PostgreSQL access for the fitplan profile store.
//!
//! Holds the connection config, pool helpers, embedded migrations, typed row
//! models and the query functions the generation pipeline reads from.

pub mod config;
pub mod models;
pub mod pool;
pub mod queries;
