//! Versioned schema for the `codigos` table.
//!
//! The version lives in `PRAGMA user_version`. Each step runs in its own
//! transaction together with the version bump, so a half-applied step never
//! sticks. Databases written before versioning existed report version 0 and
//! may already hold a `codigos` table with or without `timestamp`; every step
//! therefore inspects before it changes anything.
//!
//! Only the base table is load-bearing: if it cannot be created the open
//! fails. A later step that fails falls back to [`recreate`], and if that fails
//! too the store keeps running on whatever schema it has and reports
//! [`SchemaStatus::Degraded`].

use rusqlite::{params, Connection};
use serde::Serialize;
use tracing::{debug, error, info, warn};

pub const TABLE: &str = "codigos";

/// Version a fully migrated database reports.
pub const SCHEMA_VERSION: i64 = 3;

const CREATE_BASE_TABLE: &str = "CREATE TABLE IF NOT EXISTS codigos (
    id TEXT PRIMARY KEY NOT NULL DEFAULT (lower(hex(randomblob(16)))),
    data TEXT NOT NULL DEFAULT '',
    type TEXT NOT NULL DEFAULT 'qr'
)";

const CREATE_TIMESTAMP_INDEX: &str =
    "CREATE INDEX IF NOT EXISTS idx_codigos_timestamp ON codigos(timestamp)";

const REBUILD_TABLE: &str = "codigos_rebuild";

fn create_full_table_sql(name: &str) -> String {
    format!(
        "CREATE TABLE {name} (
            id TEXT PRIMARY KEY NOT NULL DEFAULT (lower(hex(randomblob(16)))),
            data TEXT NOT NULL DEFAULT '',
            type TEXT NOT NULL DEFAULT 'qr',
            timestamp INTEGER NOT NULL DEFAULT (CAST(strftime('%s', 'now') AS INTEGER) * 1000)
        )"
    )
}

struct Migration {
    version: i64,
    description: &'static str,
    apply: fn(&Connection) -> rusqlite::Result<()>,
}

const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        description: "create codigos table",
        apply: create_base_table,
    },
    Migration {
        version: 2,
        description: "add timestamp column",
        apply: add_timestamp_column,
    },
    Migration {
        version: 3,
        description: "index codigos by timestamp",
        apply: create_timestamp_index,
    },
];

/// How initialization left the schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SchemaStatus {
    Current,
    /// A migration failed and the table was rebuilt from a backup of its rows.
    Recovered { reason: String },
    /// Migration and rebuild both failed; some columns may be missing.
    Degraded { reason: String },
}

impl SchemaStatus {
    pub fn is_degraded(&self) -> bool {
        matches!(self, SchemaStatus::Degraded { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoreHealth {
    pub schema_version: i64,
    pub target_version: i64,
    pub status: SchemaStatus,
}

pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

pub fn user_version(conn: &Connection) -> rusqlite::Result<i64> {
    conn.query_row("PRAGMA user_version", [], |row| row.get(0))
}

/// Bring the schema up to [`SCHEMA_VERSION`].
///
/// Returns `Err` only when the base table cannot be created.
pub fn initialize(conn: &mut Connection) -> rusqlite::Result<SchemaStatus> {
    let current = user_version(conn)?;

    if current > SCHEMA_VERSION {
        warn!(current, supported = SCHEMA_VERSION, "database schema is newer than this build");
        return Ok(SchemaStatus::Degraded {
            reason: format!(
                "schema version {current} is newer than supported version {SCHEMA_VERSION}"
            ),
        });
    }

    for migration in MIGRATIONS.iter().filter(|m| m.version > current) {
        match apply(conn, migration) {
            Ok(()) => debug!(version = migration.version, "applied migration: {}", migration.description),
            Err(e) if migration.version == 1 => return Err(e),
            Err(e) => {
                warn!(version = migration.version, error = %e, "migration failed, rebuilding table");
                let reason = format!(
                    "migration {} ({}) failed: {e}",
                    migration.version, migration.description
                );

                return Ok(match recreate(conn) {
                    Ok(restored) => {
                        info!(rows = restored, "table rebuilt with current schema");
                        SchemaStatus::Recovered { reason }
                    }
                    Err(rebuild_err) => {
                        error!(error = %rebuild_err, "table rebuild failed, continuing with existing schema");
                        SchemaStatus::Degraded {
                            reason: format!("{reason}; rebuild failed: {rebuild_err}"),
                        }
                    }
                });
            }
        }
    }

    Ok(SchemaStatus::Current)
}

fn apply(conn: &mut Connection, migration: &Migration) -> rusqlite::Result<()> {
    let tx = conn.transaction()?;
    (migration.apply)(&tx)?;
    tx.pragma_update(None, "user_version", migration.version)?;
    tx.commit()
}

fn create_base_table(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(CREATE_BASE_TABLE)
}

fn add_timestamp_column(conn: &Connection) -> rusqlite::Result<()> {
    let timestamp = column_info(conn)?
        .into_iter()
        .find(|(name, _)| name == "timestamp")
        .map(|(_, not_null)| not_null);

    // a legacy column may be nullable or hold NULLs; those rows would break
    // every later read, so anything short of NOT NULL without NULLs is rebuilt
    let timestamp_expr = match timestamp {
        Some(true) if null_timestamps(conn)? == 0 => return Ok(()),
        Some(_) => {
            info!("filling missing timestamps");
            "COALESCE(timestamp, ?1)"
        }
        None => {
            info!("adding timestamp column");
            "?1"
        }
    };

    // sqlite refuses ALTER TABLE ADD COLUMN with an expression default,
    // so the table is copied into a fresh one instead
    conn.execute_batch(&format!("DROP TABLE IF EXISTS {REBUILD_TABLE}"))?;
    conn.execute_batch(&create_full_table_sql(REBUILD_TABLE))?;
    conn.execute(
        &format!(
            "INSERT INTO {REBUILD_TABLE} (id, data, type, timestamp)
             SELECT id, data, type, {timestamp_expr} FROM codigos ORDER BY rowid"
        ),
        params![now_millis()],
    )?;
    conn.execute_batch(&format!(
        "DROP TABLE codigos;
         ALTER TABLE {REBUILD_TABLE} RENAME TO codigos;"
    ))?;

    Ok(())
}

fn create_timestamp_index(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(CREATE_TIMESTAMP_INDEX)
}

/// Column names of `codigos`, empty if the table does not exist.
pub fn table_columns(conn: &Connection) -> rusqlite::Result<Vec<String>> {
    Ok(column_info(conn)?.into_iter().map(|(name, _)| name).collect())
}

/// `(name, not_null)` for each column of `codigos`.
fn column_info(conn: &Connection) -> rusqlite::Result<Vec<(String, bool)>> {
    let mut stmt = conn.prepare("PRAGMA table_info(codigos)")?;
    let columns = stmt
        .query_map([], |row| Ok((row.get::<_, String>(1)?, row.get::<_, i64>(3)? != 0)))?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(columns)
}

fn null_timestamps(conn: &Connection) -> rusqlite::Result<i64> {
    conn.query_row(
        "SELECT COUNT(*) FROM codigos WHERE timestamp IS NULL",
        [],
        |row| row.get(0),
    )
}

/// Drop and recreate `codigos` with the full schema, keeping every row.
///
/// Rows keep their id, data and type; all of them get the current time as
/// timestamp. Runs in one transaction, so a failure leaves the old table
/// untouched. Returns the number of rows restored.
pub fn recreate(conn: &mut Connection) -> rusqlite::Result<usize> {
    let tx = conn.transaction()?;
    let columns = table_columns(&tx)?;

    let pick = |name: &str| {
        if columns.iter().any(|c| c == name) {
            name.to_string()
        } else {
            "NULL".to_string()
        }
    };

    let backup: Vec<(Option<String>, Option<String>, Option<String>)> = if columns.is_empty() {
        Vec::new()
    } else {
        let mut stmt = tx.prepare(&format!(
            "SELECT {}, {}, {} FROM codigos ORDER BY rowid",
            pick("id"),
            pick("data"),
            pick("type")
        ))?;
        let rows = stmt
            .query_map([], |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)))?
            .collect::<Result<Vec<_>, _>>()?;
        rows
    };

    debug!(rows = backup.len(), "backed up rows before rebuild");

    tx.execute_batch("DROP TABLE IF EXISTS codigos")?;
    tx.execute_batch(&create_full_table_sql(TABLE))?;
    tx.execute_batch(CREATE_TIMESTAMP_INDEX)?;

    let timestamp = now_millis();
    {
        let mut insert = tx.prepare(
            "INSERT INTO codigos (id, data, type, timestamp)
             VALUES (COALESCE(?1, lower(hex(randomblob(16)))), COALESCE(?2, ''), COALESCE(?3, 'qr'), ?4)",
        )?;
        for (id, data, kind) in &backup {
            insert.execute(params![id, data, kind, timestamp])?;
        }
    }

    tx.pragma_update(None, "user_version", SCHEMA_VERSION)?;
    tx.commit()?;

    Ok(backup.len())
}
