//! SQLite scan log.
//!
//! One table, `codigos`: id, data, type, timestamp. The schema is versioned
//! and migrated on open, see [`schema`].
//!
//! Supports:
//! - Inserting a scan with store-assigned id and timestamp
//! - Listing all scans, newest first
//! - Deleting one scan or clearing the log
//! - Duplicate checks and aggregate statistics

pub mod error;
pub mod schema;

use std::path::{Path, PathBuf};

use chrono::{DateTime, SecondsFormat};
use rusqlite::{params, Connection, OptionalExtension};
use tracing::{debug, info};

use crate::model::{CodeStats, NewScannedCode, ScannedCode, TypeCount};
pub use error::{Result, StoreError};
pub use schema::{SchemaStatus, StoreHealth, SCHEMA_VERSION};

/// Default database location (~/.local/share/scanqr/scanqr.db or platform equivalent)
pub fn default_db_path() -> Result<PathBuf> {
    let data_dir = directories::ProjectDirs::from("", "", "scanqr")
        .ok_or(StoreError::DataDir)?
        .data_dir()
        .to_path_buf();

    Ok(data_dir.join("scanqr.db"))
}

/// Database handle. Open once at startup and keep it for the whole session.
pub struct Store {
    conn: Connection,
    path: Option<PathBuf>,
    status: SchemaStatus,
}

impl Store {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path).map_err(|source| StoreError::Open {
            path: path.to_path_buf(),
            source,
        })?;
        info!(path = %path.display(), "opened scan database");

        Self::from_connection(conn, Some(path.to_path_buf()))
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?, None)
    }

    fn from_connection(mut conn: Connection, path: Option<PathBuf>) -> Result<Self> {
        let status = schema::initialize(&mut conn)?;
        Ok(Store { conn, path, status })
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Record a scan. Id and timestamp are assigned here.
    pub fn insert(&self, data: &str, kind: &str) -> Result<ScannedCode> {
        self.insert_code(&NewScannedCode::new(data, kind))
    }

    /// Record a scan, applying column defaults for missing fields.
    ///
    /// A caller-supplied id that already exists fails with a constraint error.
    pub fn insert_code(&self, code: &NewScannedCode) -> Result<ScannedCode> {
        let inserted = self.conn.query_row(
            "INSERT INTO codigos (id, data, type, timestamp)
             VALUES (COALESCE(?1, lower(hex(randomblob(16)))), ?2, ?3, ?4)
             RETURNING id, data, type, timestamp",
            params![
                code.id.as_deref(),
                code.data_or_default(),
                code.kind_or_default(),
                schema::now_millis()
            ],
            code_from_row,
        )?;

        debug!(id = %inserted.id, kind = %inserted.kind, "inserted scan");
        Ok(inserted)
    }

    /// All scans, newest first. Equal timestamps come back in reverse insertion order.
    pub fn list(&self) -> Result<Vec<ScannedCode>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, data, type, timestamp
             FROM codigos
             ORDER BY timestamp DESC, rowid DESC",
        )?;

        let codes = stmt.query_map([], code_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(codes)
    }

    pub fn get(&self, id: &str) -> Result<Option<ScannedCode>> {
        let code = self
            .conn
            .query_row(
                "SELECT id, data, type, timestamp FROM codigos WHERE id = ?1",
                params![id],
                code_from_row,
            )
            .optional()?;

        Ok(code)
    }

    /// Delete every scan. Returns how many were removed.
    pub fn clear(&self) -> Result<usize> {
        let removed = self.conn.execute("DELETE FROM codigos", [])?;
        info!(removed, "cleared scan log");
        Ok(removed)
    }

    /// Delete one scan. Returns false when no scan had that id.
    pub fn delete(&self, id: &str) -> Result<bool> {
        let removed = self.conn.execute("DELETE FROM codigos WHERE id = ?1", params![id])?;
        Ok(removed > 0)
    }

    pub fn exists(&self, data: &str) -> Result<bool> {
        let found = self.conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM codigos WHERE data = ?1)",
            params![data],
            |row| row.get(0),
        )?;

        Ok(found)
    }

    pub fn stats(&self) -> Result<CodeStats> {
        let total: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM codigos", [], |row| row.get(0))?;

        let mut stmt = self.conn.prepare(
            "SELECT type, COUNT(*) AS count
             FROM codigos
             GROUP BY type
             ORDER BY count DESC, type ASC",
        )?;
        let by_type = stmt
            .query_map([], |row| {
                Ok(TypeCount {
                    kind: row.get(0)?,
                    count: row.get::<_, i64>(1)?.max(0) as u64,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let newest: Option<i64> = self
            .conn
            .query_row("SELECT MAX(timestamp) FROM codigos", [], |row| row.get(0))?;

        Ok(CodeStats {
            total: total.max(0) as u64,
            by_type,
            last_scan: newest.and_then(iso_timestamp),
        })
    }

    /// Schema version and how the last initialization went.
    pub fn health(&self) -> Result<StoreHealth> {
        Ok(StoreHealth {
            schema_version: schema::user_version(&self.conn)?,
            target_version: SCHEMA_VERSION,
            status: self.status.clone(),
        })
    }

    /// Rebuild the table with the current schema, keeping every row.
    ///
    /// All rows get the current time as their timestamp.
    pub fn rebuild(&mut self) -> Result<usize> {
        let restored = schema::recreate(&mut self.conn)?;
        self.status = SchemaStatus::Current;
        info!(rows = restored, "rebuilt scan table");
        Ok(restored)
    }

    /// Drop the table and forget the schema version.
    ///
    /// Health turns degraded and queries fail until the database is opened
    /// again or rebuilt.
    pub fn drop_table(&mut self) -> Result<()> {
        self.conn.execute_batch("DROP TABLE IF EXISTS codigos")?;
        self.conn.pragma_update(None, "user_version", 0)?;
        self.status = SchemaStatus::Degraded {
            reason: "scan table dropped, reopen the database to recreate it".to_string(),
        };
        info!("dropped scan table");
        Ok(())
    }

    pub fn close(self) -> Result<()> {
        self.conn.close().map_err(|(_, e)| StoreError::Sqlite(e))?;
        debug!("closed scan database");
        Ok(())
    }
}

fn code_from_row(row: &rusqlite::Row) -> rusqlite::Result<ScannedCode> {
    Ok(ScannedCode {
        id: row.get(0)?,
        data: row.get(1)?,
        kind: row.get(2)?,
        timestamp: row.get(3)?,
    })
}

/// Millisecond epoch to ISO-8601 UTC, e.g. `2025-01-01T12:00:00.000Z`.
pub fn iso_timestamp(millis: i64) -> Option<String> {
    DateTime::from_timestamp_millis(millis).map(|dt| dt.to_rfc3339_opts(SecondsFormat::Millis, true))
}
