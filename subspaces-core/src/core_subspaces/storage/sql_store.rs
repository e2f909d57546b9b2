//! SQLite-backed key-value store

use super::super::errors::SubspacesResult;
use super::keys::prefix_end;
use super::kv::KvStore;
use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{params, OptionalExtension};
use std::path::Path;

/// Key-value store persisted in a single SQLite table
pub struct SqliteStore {
    pool: Pool<SqliteConnectionManager>,
}

impl SqliteStore {
    /// Create a store over the given connection pool, running migrations
    pub fn new(pool: Pool<SqliteConnectionManager>) -> SubspacesResult<Self> {
        super::migrations::migrate(&pool)?;
        Ok(Self { pool })
    }

    /// Open (or create) a database file
    pub fn open(path: impl AsRef<Path>, pool_size: u32) -> SubspacesResult<Self> {
        let manager = SqliteConnectionManager::file(path.as_ref());
        let pool = Pool::builder().max_size(pool_size).build(manager)?;
        Self::new(pool)
    }

    /// Create a new in-memory store.
    ///
    /// Every SQLite in-memory connection is a separate database, so the pool
    /// is limited to a single connection.
    pub fn memory() -> SubspacesResult<Self> {
        let manager = SqliteConnectionManager::memory();
        let pool = Pool::builder().max_size(1).build(manager)?;
        Self::new(pool)
    }

    /// Number of stored entries
    pub fn len(&self) -> SubspacesResult<usize> {
        let conn = self.pool.get()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM kv", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    pub fn is_empty(&self) -> SubspacesResult<bool> {
        Ok(self.len()? == 0)
    }
}

impl KvStore for SqliteStore {
    fn get(&self, key: &[u8]) -> SubspacesResult<Option<Vec<u8>>> {
        let conn = self.pool.get()?;
        let value = conn
            .query_row("SELECT value FROM kv WHERE key = ?", params![key], |row| {
                row.get(0)
            })
            .optional()?;
        Ok(value)
    }

    fn set(&mut self, key: &[u8], value: &[u8]) -> SubspacesResult<()> {
        let conn = self.pool.get()?;
        conn.execute(
            "INSERT INTO kv (key, value) VALUES (?, ?)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            params![key, value],
        )?;
        tracing::trace!(key = %hex::encode(key), "kv set");
        Ok(())
    }

    fn has(&self, key: &[u8]) -> SubspacesResult<bool> {
        let conn = self.pool.get()?;
        let found = conn
            .query_row("SELECT 1 FROM kv WHERE key = ?", params![key], |_| Ok(()))
            .optional()?;
        Ok(found.is_some())
    }

    fn delete(&mut self, key: &[u8]) -> SubspacesResult<()> {
        let conn = self.pool.get()?;
        conn.execute("DELETE FROM kv WHERE key = ?", params![key])?;
        tracing::trace!(key = %hex::encode(key), "kv delete");
        Ok(())
    }

    fn prefix_scan(&self, prefix: &[u8]) -> SubspacesResult<Vec<(Vec<u8>, Vec<u8>)>> {
        let conn = self.pool.get()?;
        let rows = match prefix_end(prefix) {
            Some(end) => {
                let mut stmt = conn.prepare(
                    "SELECT key, value FROM kv WHERE key >= ? AND key < ? ORDER BY key",
                )?;
                let rows = stmt
                    .query_map(params![prefix, end], |row| Ok((row.get(0)?, row.get(1)?)))?
                    .collect::<Result<Vec<(Vec<u8>, Vec<u8>)>, _>>()?;
                rows
            }
            None => {
                let mut stmt =
                    conn.prepare("SELECT key, value FROM kv WHERE key >= ? ORDER BY key")?;
                let rows = stmt
                    .query_map(params![prefix], |row| Ok((row.get(0)?, row.get(1)?)))?
                    .collect::<Result<Vec<(Vec<u8>, Vec<u8>)>, _>>()?;
                rows
            }
        };
        Ok(rows)
    }
}
