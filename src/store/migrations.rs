//! Version-tracked migrations for the message cache.
//!
//! Each migration has a version number and SQL. `run_migrations()` checks
//! the current version and applies only the new ones sequentially.
//! A cache created before version tracking existed (an `emails` table but no
//! `_migrations` table) is detected and seeded at V1 without re-running DDL.

use libsql::Connection;
use tracing::{debug, info};

use crate::error::DatabaseError;

/// A single migration step.
struct Migration {
    version: i64,
    name: &'static str,
    sql: &'static str,
}

/// All migrations in order. Add new versions to the end.
static MIGRATIONS: &[Migration] = &[Migration {
    version: 1,
    name: "emails_table",
    sql: r#"
        CREATE TABLE IF NOT EXISTS emails (
            id TEXT PRIMARY KEY,
            from_email TEXT,
            to_email TEXT,
            subject TEXT,
            body TEXT,
            date_received TEXT,
            label_ids TEXT
        );
    "#,
}];

/// Bring the schema up to the latest version.
pub async fn run_migrations(conn: &Connection) -> Result<(), DatabaseError> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS _migrations (
            version INTEGER PRIMARY KEY,
            name TEXT NOT NULL,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        );",
    )
    .await
    .map_err(|e| DatabaseError::Migration(format!("cannot create _migrations: {e}")))?;

    if schema_version(conn).await? == 0 && unversioned_cache_exists(conn).await? {
        record_version(conn, &MIGRATIONS[0]).await?;
        info!("Found a message cache without version history, marked as V1");
    }

    let applied = schema_version(conn).await?;
    for migration in MIGRATIONS.iter().filter(|m| m.version > applied) {
        info!(version = migration.version, name = migration.name, "Migrating message cache");
        conn.execute_batch(migration.sql).await.map_err(|e| {
            DatabaseError::Migration(format!("V{} {}: {e}", migration.version, migration.name))
        })?;
        record_version(conn, migration).await?;
    }

    let version = schema_version(conn).await?;
    debug!(version, "Message cache schema up to date");
    Ok(())
}

/// Highest applied version, 0 on a fresh database.
async fn schema_version(conn: &Connection) -> Result<i64, DatabaseError> {
    scalar(conn, "SELECT COALESCE(MAX(version), 0) FROM _migrations").await
}

/// An `emails` table with no recorded migrations.
async fn unversioned_cache_exists(conn: &Connection) -> Result<bool, DatabaseError> {
    let tables = scalar(
        conn,
        "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = 'emails'",
    )
    .await?;
    Ok(tables > 0)
}

async fn record_version(conn: &Connection, migration: &Migration) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT OR IGNORE INTO _migrations (version, name) VALUES (?1, ?2)",
        libsql::params![migration.version, migration.name],
    )
    .await
    .map(|_| ())
    .map_err(|e| DatabaseError::Migration(format!("cannot record V{}: {e}", migration.version)))
}

/// First column of the first row of a single-value query.
async fn scalar(conn: &Connection, sql: &str) -> Result<i64, DatabaseError> {
    let mut rows = conn
        .query(sql, ())
        .await
        .map_err(|e| DatabaseError::Migration(format!("{sql}: {e}")))?;
    match rows.next().await {
        Ok(Some(row)) => row
            .get::<i64>(0)
            .map_err(|e| DatabaseError::Migration(format!("{sql}: {e}"))),
        Ok(None) => Ok(0),
        Err(e) => Err(DatabaseError::Migration(format!("{sql}: {e}"))),
    }
}
