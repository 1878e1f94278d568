//! Storage layer for dailyfeedback.
//!
//! This module provides `SQLite`-based persistent storage for feedback
//! records and for completion flags recorded against remote snapshots.

pub mod migrations;
pub mod schema;

use std::path::{Path, PathBuf};

use rusqlite::{params, Connection, OptionalExtension};
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::record::{now_timestamp, FeedbackRecord, NewFeedback};

/// Columns selected for every record query, in `row_to_record` order.
const RECORD_COLUMNS: &str = "id, date, member, note, images, item_dones, created_at";

/// Storage engine for feedback records.
///
/// Provides persistent storage using `SQLite` with support for:
/// - Append-only id assignment
/// - Update and delete by id
/// - A side table of completion flags for read-only remote entries
#[derive(Debug)]
pub struct Storage {
    /// Path to the database file.
    path: PathBuf,
    /// Database connection.
    conn: Connection,
}

/// Identity of a remote snapshot entry in the side table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteEntryKey {
    /// URL the snapshot was loaded from.
    pub url: String,
    /// Entry date.
    pub date: String,
    /// Entry member.
    pub member: String,
    /// Entry creation timestamp.
    pub created_at: String,
}

impl RemoteEntryKey {
    /// Key for a record of the snapshot loaded from `url`.
    #[must_use]
    pub fn for_record(url: &str, record: &FeedbackRecord) -> Self {
        Self {
            url: url.to_string(),
            date: record.date.clone(),
            member: record.member.clone(),
            created_at: record.created_at.clone(),
        }
    }

    /// BLAKE3 digest of the four key fields.
    #[must_use]
    pub fn digest(&self) -> String {
        let mut hasher = blake3::Hasher::new();
        for part in [&self.url, &self.date, &self.member, &self.created_at] {
            hasher.update(part.as_bytes());
            hasher.update(&[0x1f]);
        }
        hasher.finalize().to_hex().to_string()
    }
}

impl Storage {
    /// Open or create a storage database at the given path.
    ///
    /// Creates the parent directories and database file if they don't exist.
    /// Initializes the schema if this is a new database.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or schema initialization fails.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent).map_err(|source| Error::DirectoryCreate {
                    path: parent.to_path_buf(),
                    source,
                })?;
            }
        }

        debug!("Opening database at {}", path.display());
        let conn = Connection::open(&path).map_err(|source| Error::DatabaseOpen {
            path: path.clone(),
            source,
        })?;

        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")?;

        migrations::initialize_schema(&conn)?;

        info!("Database opened successfully at {}", path.display());
        Ok(Self { path, conn })
    }

    /// Create an in-memory storage instance for testing.
    ///
    /// # Errors
    ///
    /// Returns an error if the in-memory database cannot be created.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(|source| Error::DatabaseOpen {
            path: PathBuf::from(":memory:"),
            source,
        })?;

        migrations::initialize_schema(&conn)?;

        Ok(Self {
            path: PathBuf::from(":memory:"),
            conn,
        })
    }

    /// Get the path to the database file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append a record and return its new id.
    ///
    /// `member` and `note` are trimmed; `created_at` defaults to now.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn add(&self, feedback: &NewFeedback) -> Result<i64> {
        let feedback = feedback.clone().normalized();
        let created_at = feedback.created_at.clone().unwrap_or_else(now_timestamp);

        self.conn.execute(
            r"
            INSERT INTO feedback (date, member, note, images, item_dones, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            ",
            params![
                feedback.date,
                feedback.member,
                feedback.note,
                serde_json::to_string(&feedback.images)?,
                serde_json::to_string(&feedback.item_dones)?,
                created_at,
            ],
        )?;

        let id = self.conn.last_insert_rowid();
        debug!("Inserted feedback with id {}", id);
        Ok(id)
    }

    /// Append several records in one transaction and return their ids.
    ///
    /// Either every record is stored or none is.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn add_all(&self, feedback: &[NewFeedback]) -> Result<Vec<i64>> {
        let tx = self.conn.unchecked_transaction()?;
        let ids = feedback
            .iter()
            .map(|fb| self.add(fb))
            .collect::<Result<Vec<_>>>()?;
        tx.commit()?;
        debug!("Inserted {} feedback records", ids.len());
        Ok(ids)
    }

    /// Replace the stored fields of a record.
    ///
    /// Keeps the existing `created_at` unless the update carries one.
    /// Returns `false` if no record has this id.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn update(&self, id: i64, feedback: &NewFeedback) -> Result<bool> {
        let Some(existing) = self.get(id)? else {
            return Ok(false);
        };

        let feedback = feedback.clone().normalized();
        let created_at = feedback
            .created_at
            .clone()
            .or_else(|| (!existing.created_at.is_empty()).then_some(existing.created_at))
            .unwrap_or_else(now_timestamp);

        let affected = self.conn.execute(
            r"
            UPDATE feedback
            SET date = ?1, member = ?2, note = ?3, images = ?4, item_dones = ?5, created_at = ?6
            WHERE id = ?7
            ",
            params![
                feedback.date,
                feedback.member,
                feedback.note,
                serde_json::to_string(&feedback.images)?,
                serde_json::to_string(&feedback.item_dones)?,
                created_at,
                id,
            ],
        )?;
        debug!("Updated feedback {}", id);
        Ok(affected > 0)
    }

    /// Overwrite only the completion flags of a record.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn update_item_dones(&self, id: i64, item_dones: &[bool]) -> Result<bool> {
        let affected = self.conn.execute(
            "UPDATE feedback SET item_dones = ?1 WHERE id = ?2",
            params![serde_json::to_string(item_dones)?, id],
        )?;
        Ok(affected > 0)
    }

    /// Get a record by its id.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn get(&self, id: i64) -> Result<Option<FeedbackRecord>> {
        let result = self
            .conn
            .query_row(
                &format!("SELECT {RECORD_COLUMNS} FROM feedback WHERE id = ?1"),
                [id],
                Self::row_to_record,
            )
            .optional()?;
        Ok(result)
    }

    /// Get every record in insertion order.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn get_all(&self) -> Result<Vec<FeedbackRecord>> {
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT {RECORD_COLUMNS} FROM feedback ORDER BY id ASC"))?;

        let records = stmt
            .query_map([], Self::row_to_record)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(records)
    }

    /// Count stored records.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn count(&self) -> Result<i64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM feedback", [], |row| row.get(0))?;
        Ok(count)
    }

    /// Delete a record by id.
    ///
    /// Returns `true` if a record was deleted, `false` if not found.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn delete(&self, id: i64) -> Result<bool> {
        let affected = self
            .conn
            .execute("DELETE FROM feedback WHERE id = ?1", [id])?;
        Ok(affected > 0)
    }

    /// Flags recorded against a remote entry, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn remote_item_dones(&self, key: &RemoteEntryKey) -> Result<Option<Vec<bool>>> {
        let raw: Option<String> = self
            .conn
            .query_row(
                "SELECT item_dones FROM remote_item_dones WHERE entry_key = ?1",
                [key.digest()],
                |row| row.get(0),
            )
            .optional()?;
        Ok(raw.map(|s| parse_json_column(&s, "remote_item_dones.item_dones")))
    }

    /// Record flags against a remote entry.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn set_remote_item_dones(&self, key: &RemoteEntryKey, item_dones: &[bool]) -> Result<()> {
        self.conn.execute(
            r"
            INSERT OR REPLACE INTO remote_item_dones
                (entry_key, url, date, member, created_at, item_dones, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            ",
            params![
                key.digest(),
                key.url,
                key.date,
                key.member,
                key.created_at,
                serde_json::to_string(item_dones)?,
                now_timestamp(),
            ],
        )?;
        debug!(url = %key.url, member = %key.member, "Recorded remote item flags");
        Ok(())
    }

    /// Get database statistics.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn stats(&self) -> Result<StorageStats> {
        let total_records = self.count()?;

        let members: i64 = self.conn.query_row(
            "SELECT COUNT(DISTINCT member) FROM feedback WHERE member != ''",
            [],
            |row| row.get(0),
        )?;

        let (earliest_date, latest_date): (Option<String>, Option<String>) =
            self.conn
                .query_row("SELECT MIN(date), MAX(date) FROM feedback", [], |row| {
                    Ok((row.get(0)?, row.get(1)?))
                })?;

        let remote_overlays: i64 =
            self.conn
                .query_row("SELECT COUNT(*) FROM remote_item_dones", [], |row| {
                    row.get(0)
                })?;

        let db_size_bytes = if self.path.to_string_lossy() == ":memory:" {
            0
        } else {
            std::fs::metadata(&self.path).map(|m| m.len()).unwrap_or(0)
        };

        Ok(StorageStats {
            total_records,
            members,
            earliest_date,
            latest_date,
            remote_overlays,
            db_size_bytes,
        })
    }

    /// Convert a database row to a `FeedbackRecord`.
    fn row_to_record(row: &rusqlite::Row) -> rusqlite::Result<FeedbackRecord> {
        let images: String = row.get(4)?;
        let item_dones: String = row.get(5)?;

        Ok(FeedbackRecord {
            id: Some(row.get(0)?),
            date: row.get(1)?,
            member: row.get(2)?,
            note: row.get(3)?,
            images: parse_json_column(&images, "feedback.images"),
            item_dones: parse_json_column(&item_dones, "feedback.item_dones"),
            created_at: row.get(6)?,
        })
    }
}

/// Decode a JSON array column, falling back to empty on bad data.
fn parse_json_column<T: serde::de::DeserializeOwned + Default>(raw: &str, column: &str) -> T {
    serde_json::from_str(raw).unwrap_or_else(|e| {
        warn!(column, error = %e, "Malformed JSON column, using empty value");
        T::default()
    })
}

/// Statistics about the storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageStats {
    /// Total number of records stored.
    pub total_records: i64,
    /// Number of distinct members.
    pub members: i64,
    /// Earliest record date.
    pub earliest_date: Option<String>,
    /// Latest record date.
    pub latest_date: Option<String>,
    /// Number of remote entries with locally recorded flags.
    pub remote_overlays: i64,
    /// Size of the database file in bytes.
    pub db_size_bytes: u64,
}
