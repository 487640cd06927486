//! SQLite-backed metadata store implementation.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, TransactionBehavior};
use serde_json::Value;
use tracing::debug;

use super::{MetadataError, MetadataRecord, MetadataStore, Status, StatusEntry};

/// How long a writer waits on a lock held by another process.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

const SELECT_COLUMNS: &str =
    "SELECT name, created_at, status, updated_at, additional_info, history FROM metadata_records";

/// SQLite-backed metadata store.
///
/// All access goes through one connection mutex, and each transition runs in
/// its own transaction, so updates to the same id never interleave.
pub struct SqliteMetadataStore {
    conn: Mutex<Connection>,
}

/// Raw column values before decoding.
struct RecordRow {
    name: String,
    created_at: String,
    status: String,
    updated_at: String,
    additional_info: String,
    history: String,
}

impl SqliteMetadataStore {
    /// Create a new SQLite metadata store, creating the database file and tables if needed.
    pub fn new(path: &Path) -> Result<Self, MetadataError> {
        let conn = Connection::open(path)?;
        conn.busy_timeout(BUSY_TIMEOUT)?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create an in-memory SQLite metadata store (useful for testing).
    pub fn in_memory() -> Result<Self, MetadataError> {
        let conn = Connection::open_in_memory()?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn initialize_schema(conn: &Connection) -> Result<(), MetadataError> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS metadata_records (
                name TEXT PRIMARY KEY,
                created_at TEXT NOT NULL,
                status TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                additional_info TEXT NOT NULL,
                history TEXT NOT NULL DEFAULT '[]'
            );

            CREATE INDEX IF NOT EXISTS idx_metadata_status ON metadata_records(status);
            "#,
        )?;
        Ok(())
    }

    fn lock_conn(&self) -> Result<MutexGuard<'_, Connection>, MetadataError> {
        self.conn.lock().map_err(|_| MetadataError::LockPoisoned)
    }

    fn read_row(row: &rusqlite::Row) -> rusqlite::Result<RecordRow> {
        Ok(RecordRow {
            name: row.get(0)?,
            created_at: row.get(1)?,
            status: row.get(2)?,
            updated_at: row.get(3)?,
            additional_info: row.get(4)?,
            history: row.get(5)?,
        })
    }

    fn decode(row: RecordRow) -> Result<MetadataRecord, MetadataError> {
        let corrupt = |reason: String| MetadataError::Corrupt {
            name: row.name.clone(),
            reason,
        };

        let created_at = parse_time(&row.created_at).map_err(&corrupt)?;
        let updated_at = parse_time(&row.updated_at).map_err(&corrupt)?;
        let additional_info: Value = serde_json::from_str(&row.additional_info)
            .map_err(|e| corrupt(format!("additional_info: {}", e)))?;
        let history: Vec<StatusEntry> = serde_json::from_str(&row.history)
            .map_err(|e| corrupt(format!("history: {}", e)))?;

        Ok(MetadataRecord {
            created_at,
            current: StatusEntry {
                status: Status::from_code(&row.status),
                updated_at,
                additional_info,
            },
            history,
            name: row.name,
        })
    }

    fn encode_json<T: serde::Serialize>(value: &T) -> Result<String, MetadataError> {
        serde_json::to_string(value).map_err(|e| MetadataError::Database(e.to_string()))
    }
}

fn parse_time(raw: &str) -> Result<DateTime<Utc>, String> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| format!("timestamp {:?}: {}", raw, e))
}

impl MetadataStore for SqliteMetadataStore {
    fn create_if_absent(&self, record: &MetadataRecord) -> Result<bool, MetadataError> {
        let conn = self.lock_conn()?;

        let inserted = conn.execute(
            "INSERT OR IGNORE INTO metadata_records (name, created_at, status, updated_at, additional_info, history) VALUES (?, ?, ?, ?, ?, ?)",
            params![
                record.name,
                record.created_at.to_rfc3339(),
                record.current.status.as_str(),
                record.current.updated_at.to_rfc3339(),
                Self::encode_json(&record.current.additional_info)?,
                Self::encode_json(&record.history)?,
            ],
        )?;

        if inserted == 0 {
            debug!(remote_id = %record.name, "Metadata record already exists, not creating another");
        }
        Ok(inserted == 1)
    }

    fn get(&self, name: &str) -> Result<Option<MetadataRecord>, MetadataError> {
        let conn = self.lock_conn()?;

        let row = conn
            .query_row(
                &format!("{} WHERE name = ?", SELECT_COLUMNS),
                params![name],
                Self::read_row,
            )
            .optional()?;

        row.map(Self::decode).transpose()
    }

    fn update(
        &self,
        name: &str,
        status: Status,
        additional_info: Value,
    ) -> Result<MetadataRecord, MetadataError> {
        let mut conn = self.lock_conn()?;
        // Take the write lock up front so two processes never both hold a
        // read lock and then fail to upgrade.
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let row = tx
            .query_row(
                &format!("{} WHERE name = ?", SELECT_COLUMNS),
                params![name],
                Self::read_row,
            )
            .optional()?
            .ok_or_else(|| MetadataError::NotFound(name.to_string()))?;

        let mut record = Self::decode(row)?;
        record.transition(status, additional_info, Utc::now());

        tx.execute(
            "UPDATE metadata_records SET status = ?, updated_at = ?, additional_info = ?, history = ? WHERE name = ?",
            params![
                record.current.status.as_str(),
                record.current.updated_at.to_rfc3339(),
                Self::encode_json(&record.current.additional_info)?,
                Self::encode_json(&record.history)?,
                name,
            ],
        )?;
        tx.commit()?;

        debug!(
            name = %name,
            status = %record.current.status,
            description = %record.current.status.description(),
            "Recorded status transition"
        );
        Ok(record)
    }

    fn list_by_status(&self, status: &Status) -> Result<Vec<MetadataRecord>, MetadataError> {
        let conn = self.lock_conn()?;

        let mut stmt = conn.prepare(&format!(
            "{} WHERE status = ? ORDER BY created_at ASC, name ASC",
            SELECT_COLUMNS
        ))?;

        let rows = stmt.query_map(params![status.as_str()], Self::read_row)?;

        let mut records = Vec::new();
        for row in rows {
            records.push(Self::decode(row?)?);
        }
        Ok(records)
    }
}
