//! Database migrations for the SQLite key-value store
//!
//! Each migration is applied atomically and tracked in the
//! `kv_schema_version` table.

use super::super::errors::SubspacesResult;
use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::params;

/// Current schema version of the key-value store
pub const CURRENT_KV_SCHEMA_VERSION: i32 = 1;

/// Migration descriptor
pub struct Migration {
    pub version: i32,
    pub description: &'static str,
    pub up_sql: &'static str,
    pub down_sql: Option<&'static str>,
}

/// All available migrations in order
pub fn get_migrations() -> Vec<Migration> {
    vec![Migration {
        version: 1,
        description: "Ordered key-value table",
        up_sql: r#"
                CREATE TABLE IF NOT EXISTS kv_schema_version (
                    version INTEGER PRIMARY KEY
                );

                -- BLOB keys compare with memcmp, which keeps prefix scans ordered
                CREATE TABLE IF NOT EXISTS kv (
                    key BLOB PRIMARY KEY,
                    value BLOB NOT NULL
                ) WITHOUT ROWID;
            "#,
        down_sql: Some(
            r#"
                DROP TABLE IF EXISTS kv;
                DROP TABLE IF EXISTS kv_schema_version;
            "#,
        ),
    }]
}

/// Get current schema version from database
fn get_current_version(pool: &Pool<SqliteConnectionManager>) -> SubspacesResult<i32> {
    let conn = pool.get()?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS kv_schema_version (
            version INTEGER PRIMARY KEY
        )",
        [],
    )?;

    let version: Result<i32, _> = conn.query_row(
        "SELECT version FROM kv_schema_version ORDER BY version DESC LIMIT 1",
        [],
        |row| row.get(0),
    );

    Ok(version.unwrap_or(0))
}

/// Run all pending migrations
pub fn migrate(pool: &Pool<SqliteConnectionManager>) -> SubspacesResult<()> {
    let current_version = get_current_version(pool)?;
    let pending_migrations: Vec<_> = get_migrations()
        .into_iter()
        .filter(|m| m.version > current_version)
        .collect();

    if pending_migrations.is_empty() {
        return Ok(());
    }

    let conn = pool.get()?;

    for migration in pending_migrations {
        let tx = conn.unchecked_transaction()?;
        tx.execute_batch(migration.up_sql)?;
        tx.execute(
            "INSERT INTO kv_schema_version (version) VALUES (?)",
            params![migration.version],
        )?;
        tx.commit()?;

        tracing::info!(
            version = migration.version,
            description = migration.description,
            "Applied key-value store migration"
        );
    }

    Ok(())
}

/// Get the latest migration version available
pub fn get_latest_version() -> i32 {
    get_migrations()
        .iter()
        .map(|m| m.version)
        .max()
        .unwrap_or(0)
}
