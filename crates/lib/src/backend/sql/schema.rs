//! SQL schema definitions and migrations.
//!
//! One table per capability, each keyed by the collection id. The schema is
//! portable between SQLite and Postgres.
//!
//! # Migration System
//!
//! Migrations are code rather than SQL files so each one can handle dialect
//! differences between SQLite and PostgreSQL.
//!
//! ## Adding a New Migration
//!
//! 1. Increment `SCHEMA_VERSION`
//! 2. Add a new `migrate_vN_to_vM` async function
//! 3. Add the migration to the match statement in `run_migration`

use super::{SqlxBackend, SqlxResultExt};
use crate::Result;
use crate::backend::errors::BackendError;

/// Current schema version.
pub const SCHEMA_VERSION: i64 = 1;

/// SQL statements to create the schema tables.
pub const CREATE_TABLES: &[&str] = &[
    // BIGINT (64-bit) used for portability between SQLite and PostgreSQL
    "CREATE TABLE IF NOT EXISTS schema_version (
        version BIGINT PRIMARY KEY
    )",
    "CREATE TABLE IF NOT EXISTS kv_entries (
        collection TEXT NOT NULL,
        entry_key TEXT NOT NULL,
        entry_value TEXT NOT NULL,
        PRIMARY KEY (collection, entry_key)
    )",
    "CREATE TABLE IF NOT EXISTS set_members (
        collection TEXT NOT NULL,
        member TEXT NOT NULL,
        PRIMARY KEY (collection, member)
    )",
    "CREATE TABLE IF NOT EXISTS hash_fields (
        collection TEXT NOT NULL,
        owner TEXT NOT NULL,
        field TEXT NOT NULL,
        field_value TEXT NOT NULL,
        PRIMARY KEY (collection, owner, field)
    )",
    // position is assigned as MAX(position) + 1 within the collection
    "CREATE TABLE IF NOT EXISTS list_items (
        collection TEXT NOT NULL,
        position BIGINT NOT NULL,
        item TEXT NOT NULL,
        PRIMARY KEY (collection, position)
    )",
];

/// SQL statements to create indexes.
pub const CREATE_INDEXES: &[&str] = &[
    // Scans by field name, e.g. every confirmationCode
    "CREATE INDEX IF NOT EXISTS idx_hash_fields_field ON hash_fields(collection, field)",
];

/// Initialize the database schema.
///
/// Creates tables and indexes if they don't exist, and handles migrations
/// if the schema version has changed.
pub async fn initialize(backend: &SqlxBackend) -> Result<()> {
    let pool = backend.pool();

    for statement in CREATE_TABLES {
        sqlx::query(statement)
            .execute(pool)
            .await
            .sql_context(&format!("Schema creation failed - SQL: {statement}"))?;
    }

    let row: Option<(i64,)> = sqlx::query_as("SELECT version FROM schema_version")
        .fetch_optional(pool)
        .await
        .sql_context("Failed to check schema version")?;

    match row {
        None => {
            sqlx::query("INSERT INTO schema_version (version) VALUES ($1)")
                .bind(SCHEMA_VERSION)
                .execute(pool)
                .await
                .sql_context("Failed to initialize schema version")?;
        }
        Some((current_version,)) if current_version < SCHEMA_VERSION => {
            migrate(backend, current_version, SCHEMA_VERSION).await?;
        }
        Some((current_version,)) if current_version > SCHEMA_VERSION => {
            return Err(BackendError::SqlxError {
                reason: format!(
                    "Database schema v{current_version} is newer than supported v{SCHEMA_VERSION}"
                ),
                source: None,
            }
            .into());
        }
        Some(_) => {}
    }

    for statement in CREATE_INDEXES {
        sqlx::query(statement)
            .execute(pool)
            .await
            .sql_context(&format!("Index creation failed - SQL: {statement}"))?;
    }

    Ok(())
}

/// Run migrations sequentially from one schema version to another.
async fn migrate(backend: &SqlxBackend, from: i64, to: i64) -> Result<()> {
    tracing::info!(from, to, "Starting SQL schema migration");

    let mut current = from;
    while current < to {
        let next = current + 1;
        tracing::info!(from = current, to = next, "Running migration");

        run_migration(backend, current, next).await?;

        sqlx::query("UPDATE schema_version SET version = $1")
            .bind(next)
            .execute(backend.pool())
            .await
            .sql_context(&format!("Failed to update schema version to {next}"))?;

        current = next;
    }

    tracing::info!(from, to, "All migrations completed successfully");
    Ok(())
}

/// Execute a single migration step.
///
/// There are no migrations yet, so any attempt to migrate is an error.
async fn run_migration(backend: &SqlxBackend, from: i64, to: i64) -> Result<()> {
    let _ = backend;

    Err(BackendError::SqlxError {
        reason: format!(
            "Unknown migration path: v{from} to v{to}. \
             This likely means SCHEMA_VERSION was incremented without adding a migration."
        ),
        source: None,
    }
    .into())
}
