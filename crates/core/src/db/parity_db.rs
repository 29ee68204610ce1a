use std::path::Path;

use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use thiserror::Error;

use crate::db::ParityRunRecord;
use crate::model::normalize_address;

/// Minimum schema version we know how to handle.
///
/// `0` means "no schema yet" (fresh DB).
const MIN_SUPPORTED_SCHEMA_VERSION: i32 = 0;

/// Latest schema version this crate knows about.
pub const CURRENT_SCHEMA_VERSION: i32 = 2;

/// Error type for parity database operations.
#[derive(Debug, Error)]
pub enum DbError {
    /// Underlying SQLite error.
    #[error("SQLite error: {0}")]
    Sql(#[from] rusqlite::Error),

    /// The database was created with a newer schema version than we support.
    #[error(
        "Unsupported schema version {found}; supported range is {min_supported}..={max_supported}"
    )]
    UnsupportedSchemaVersion { found: i32, min_supported: i32, max_supported: i32 },
}

/// Convenience result type for DB operations.
pub type DbResult<T> = Result<T, DbError>;

/// SQLite-backed parity cache.
///
/// A thin wrapper around `rusqlite::Connection` responsible for:
/// - Opening/creating the DB file.
/// - Applying schema migrations.
/// - Blob cache and run history helpers.
#[derive(Debug)]
pub struct ParityDb {
    conn: Connection,
}

impl ParityDb {
    /// Open (or create) a parity database at the given path and ensure the schema exists.
    ///
    /// The parent directory must already exist.
    pub fn open(path: &Path) -> DbResult<Self> {
        let conn = Connection::open(path)?;
        apply_migrations(&conn)?;
        Ok(Self { conn })
    }

    /// Fresh in-memory database, mainly for tests.
    pub fn open_in_memory() -> DbResult<Self> {
        let conn = Connection::open_in_memory()?;
        apply_migrations(&conn)?;
        Ok(Self { conn })
    }

    /// Cached text for `(prefix, address)`; the address may be in any form.
    pub fn cache_get(&self, prefix: &str, address: &str) -> DbResult<Option<String>> {
        let content = self
            .conn
            .query_row(
                "SELECT content FROM cache_entries WHERE prefix = ?1 AND address = ?2",
                params![prefix, normalize_address(address)],
                |row| row.get(0),
            )
            .optional()?;
        Ok(content)
    }

    /// Insert or replace the cached text for `(prefix, address)`.
    pub fn cache_put(&self, prefix: &str, address: &str, content: &str) -> DbResult<()> {
        self.conn.execute(
            r#"
            INSERT INTO cache_entries (prefix, address, content, updated_at)
            VALUES (?1, ?2, ?3, ?4)
            ON CONFLICT(prefix, address)
            DO UPDATE SET content = excluded.content, updated_at = excluded.updated_at
            "#,
            params![prefix, normalize_address(address), content, Utc::now().to_rfc3339()],
        )?;
        Ok(())
    }

    pub fn cache_exists(&self, prefix: &str, address: &str) -> DbResult<bool> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM cache_entries WHERE prefix = ?1 AND address = ?2",
            params![prefix, normalize_address(address)],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    /// Remove every cached blob and return how many were removed. Run history is kept.
    pub fn cache_clear(&self) -> DbResult<usize> {
        Ok(self.conn.execute("DELETE FROM cache_entries", [])?)
    }

    /// Insert a parity run record and return its row id.
    pub fn insert_parity_run(&self, record: &ParityRunRecord) -> DbResult<i64> {
        self.conn.execute(
            r#"
            INSERT INTO parity_runs
                (started_at, finished_at, hooks_hash, backend, total, green, yellow, red)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
            params![
                record.started_at,
                record.finished_at,
                record.hooks_hash,
                record.backend,
                record.total,
                record.green,
                record.yellow,
                record.red
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    /// List parity runs (ordered by id).
    pub fn list_parity_runs(&self) -> DbResult<Vec<ParityRunRecord>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT started_at, finished_at, hooks_hash, backend, total, green, yellow, red
            FROM parity_runs
            ORDER BY id
            "#,
        )?;
        let rows = stmt.query_map([], |row| {
            Ok(ParityRunRecord {
                started_at: row.get(0)?,
                finished_at: row.get(1)?,
                hooks_hash: row.get(2)?,
                backend: row.get(3)?,
                total: row.get(4)?,
                green: row.get(5)?,
                yellow: row.get(6)?,
                red: row.get(7)?,
            })
        })?;

        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }
}

/// Apply schema migrations to bring the database to the latest version.
///
/// We use `PRAGMA user_version` as the schema version indicator.
///
/// Version map:
/// - 0: no schema
/// - 1: blob cache
/// - 2: add parity_runs table
fn apply_migrations(conn: &Connection) -> DbResult<()> {
    let current_version = current_schema_version(conn)?;

    if current_version > CURRENT_SCHEMA_VERSION {
        return Err(DbError::UnsupportedSchemaVersion {
            found: current_version,
            min_supported: MIN_SUPPORTED_SCHEMA_VERSION,
            max_supported: CURRENT_SCHEMA_VERSION,
        });
    }

    if current_version < 1 {
        conn.execute_batch(
            r#"
            BEGIN;
            CREATE TABLE IF NOT EXISTS cache_entries (
                prefix      TEXT NOT NULL,
                address     TEXT NOT NULL,
                content     TEXT NOT NULL,
                updated_at  TEXT NOT NULL,
                PRIMARY KEY (prefix, address)
            );

            PRAGMA user_version = 1;
            COMMIT;
            "#,
        )?;
    }

    if current_version < 2 {
        conn.execute_batch(
            r#"
            BEGIN;
            CREATE TABLE IF NOT EXISTS parity_runs (
                id           INTEGER PRIMARY KEY AUTOINCREMENT,
                started_at   TEXT NOT NULL,
                finished_at  TEXT NOT NULL,
                hooks_hash   TEXT,
                backend      TEXT,
                total        INTEGER NOT NULL,
                green        INTEGER NOT NULL,
                yellow       INTEGER NOT NULL,
                red          INTEGER NOT NULL
            );

            PRAGMA user_version = 2;
            COMMIT;
            "#,
        )?;
    }

    Ok(())
}

/// Read the SQLite schema version from `PRAGMA user_version`.
fn current_schema_version(conn: &Connection) -> DbResult<i32> {
    let version: i32 = conn.query_row("PRAGMA user_version;", [], |row| row.get(0))?;
    Ok(version)
}
