//! Versioned schema for the budget database
//!
//! `schema_version` holds the highest applied step. Each step runs inside its
//! own transaction together with the version bump, so a failed step leaves
//! the previous schema intact.

use rusqlite::Connection;
use tracing::{debug, info};

use super::connection::DatabaseError;

struct Migration {
    version: i32,
    name: &'static str,
    sql: &'static str,
}

const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        name: "budget states",
        sql: "
            CREATE TABLE IF NOT EXISTS budget_states (
                provider_id TEXT PRIMARY KEY,
                period TEXT NOT NULL,
                consumed_requests INTEGER NOT NULL DEFAULT 0 CHECK(consumed_requests >= 0),
                spend REAL NOT NULL DEFAULT 0,
                last_reset_date TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );
        ",
    },
    Migration {
        version: 2,
        name: "budget period index",
        sql: "CREATE INDEX IF NOT EXISTS idx_budget_states_period ON budget_states(period);",
    },
];

/// Version the schema ends up at after `run_migrations`
pub fn latest_version() -> i32 {
    MIGRATIONS.last().map_or(0, |m| m.version)
}

/// Apply every step newer than the stored version
pub fn run_migrations(conn: &Connection) -> Result<(), DatabaseError> {
    let current = schema_version(conn)?;
    let pending: Vec<&Migration> = MIGRATIONS.iter().filter(|m| m.version > current).collect();

    if pending.is_empty() {
        debug!(version = current, "Budget schema is up to date");
        return Ok(());
    }

    info!(
        from_version = current,
        to_version = latest_version(),
        "Migrating budget schema"
    );

    for migration in pending {
        apply(conn, migration).map_err(|e| {
            DatabaseError::Migration(format!(
                "V{:03} ({}) failed: {e}",
                migration.version, migration.name
            ))
        })?;
        debug!(version = migration.version, name = migration.name, "Applied migration");
    }

    Ok(())
}

fn apply(conn: &Connection, migration: &Migration) -> Result<(), rusqlite::Error> {
    conn.execute_batch("BEGIN IMMEDIATE;")?;
    let result = conn.execute_batch(migration.sql).and_then(|()| {
        conn.execute("DELETE FROM schema_version", [])?;
        conn.execute(
            "INSERT INTO schema_version (version) VALUES (?1)",
            [migration.version],
        )?;
        Ok(())
    });

    match result {
        Ok(()) => conn.execute_batch("COMMIT;"),
        Err(e) => {
            let _ = conn.execute_batch("ROLLBACK;");
            Err(e)
        },
    }
}

/// Stored schema version, 0 for a fresh database
pub fn schema_version(conn: &Connection) -> Result<i32, DatabaseError> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS schema_version (version INTEGER PRIMARY KEY)",
        [],
    )?;
    let version = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_version",
        [],
        |row| row.get(0),
    )?;
    Ok(version)
}
