//! SQLite connection pool for the budget database

use std::path::Path;

use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use thiserror::Error;
use tracing::{debug, info};

use crate::config::DatabaseConfig;

use super::migrations;

/// Database errors
#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("Connection pool error: {0}")]
    Pool(#[from] r2d2::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Migration error: {0}")]
    Migration(String),

    #[error("Cannot create database directory {path}: {reason}")]
    Directory { path: String, reason: String },
}

/// Pool shared by every budget store handle
pub type ConnectionPool = Pool<SqliteConnectionManager>;

/// Open the budget database and bring its schema up to date
///
/// File databases use WAL so `budget status` can read while a resolution
/// writes. Every pooled connection gets the same busy timeout.
pub fn create_pool(config: &DatabaseConfig) -> Result<ConnectionPool, DatabaseError> {
    let in_memory = config.is_in_memory();
    info!(
        path = %config.path,
        in_memory,
        max_connections = config.max_connections,
        "Opening budget database"
    );

    let manager = if in_memory {
        SqliteConnectionManager::memory()
    } else {
        ensure_parent_dir(Path::new(&config.path))?;
        SqliteConnectionManager::file(&config.path)
    }
    .with_init(|conn| conn.execute_batch("PRAGMA busy_timeout = 5000;"));

    let pool = Pool::builder()
        .max_size(config.max_connections)
        .build(manager)?;

    let conn = pool.get()?;
    if !in_memory {
        conn.execute_batch("PRAGMA journal_mode = WAL; PRAGMA synchronous = NORMAL;")?;
    }
    if config.run_migrations {
        migrations::run_migrations(&conn)?;
    }
    drop(conn);

    debug!("Budget database ready");
    Ok(pool)
}

fn ensure_parent_dir(path: &Path) -> Result<(), DatabaseError> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => {
            std::fs::create_dir_all(parent).map_err(|e| DatabaseError::Directory {
                path: parent.display().to_string(),
                reason: e.to_string(),
            })
        },
        _ => Ok(()),
    }
}
