//! `SQLite` schema definitions for dailyfeedback.
//!
//! This module contains the SQL statements for creating and managing
//! the database schema.

/// SQL statement to create the feedback table.
///
/// `images` and `item_dones` hold JSON arrays.
pub const CREATE_FEEDBACK_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS feedback (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    date TEXT NOT NULL,
    member TEXT NOT NULL,
    note TEXT NOT NULL DEFAULT '',
    images TEXT NOT NULL DEFAULT '[]',
    item_dones TEXT NOT NULL DEFAULT '[]',
    created_at TEXT NOT NULL
)
";

/// SQL statement to create an index on date for filtering.
pub const CREATE_DATE_INDEX: &str = r"
CREATE INDEX IF NOT EXISTS idx_feedback_date ON feedback(date)
";

/// SQL statement to create an index on member for filtering.
pub const CREATE_MEMBER_INDEX: &str = r"
CREATE INDEX IF NOT EXISTS idx_feedback_member ON feedback(member)
";

/// SQL statement to create a combined date/member index.
pub const CREATE_DATE_MEMBER_INDEX: &str = r"
CREATE INDEX IF NOT EXISTS idx_feedback_date_member ON feedback(date, member)
";

/// SQL statement to create the side table of completion flags recorded
/// against remote snapshot entries.
///
/// `entry_key` is the BLAKE3 digest of (url, date, member, created_at).
pub const CREATE_REMOTE_ITEM_DONES_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS remote_item_dones (
    entry_key TEXT PRIMARY KEY,
    url TEXT NOT NULL,
    date TEXT NOT NULL,
    member TEXT NOT NULL,
    created_at TEXT NOT NULL,
    item_dones TEXT NOT NULL,
    updated_at TEXT NOT NULL
)
";

/// SQL statement to create the metadata table for storing key-value pairs.
pub const CREATE_METADATA_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS metadata (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
)
";

/// All schema creation statements in order.
pub const SCHEMA_STATEMENTS: &[&str] = &[
    CREATE_FEEDBACK_TABLE,
    CREATE_DATE_INDEX,
    CREATE_MEMBER_INDEX,
    CREATE_DATE_MEMBER_INDEX,
    CREATE_REMOTE_ITEM_DONES_TABLE,
    CREATE_METADATA_TABLE,
];
