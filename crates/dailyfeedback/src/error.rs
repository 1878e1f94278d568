//! Error types for dailyfeedback.
//!
//! This module defines all error types used throughout the dailyfeedback crate,
//! providing detailed context for logs and a single user-facing message for
//! the command line.

use std::path::PathBuf;
use thiserror::Error;

/// The main error type for dailyfeedback operations.
#[derive(Error, Debug)]
pub enum Error {
    // === Storage Errors ===
    /// Failed to open or create the database.
    #[error("failed to open database at {path}: {source}")]
    DatabaseOpen {
        /// Path to the database file.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: rusqlite::Error,
    },

    /// A database query failed.
    #[error("database query failed: {0}")]
    DatabaseQuery(#[from] rusqlite::Error),

    /// Failed to run database migrations.
    #[error("database migration failed: {message}")]
    DatabaseMigration {
        /// Description of what went wrong.
        message: String,
    },

    // === Configuration Errors ===
    /// Failed to load configuration.
    #[error("failed to load configuration: {0}")]
    ConfigLoad(Box<figment::Error>),

    /// Configuration validation failed.
    #[error("invalid configuration: {message}")]
    ConfigValidation {
        /// Description of the validation failure.
        message: String,
    },

    // === Record Errors ===
    /// A record is missing a required field.
    #[error("invalid feedback: {message}")]
    InvalidRecord {
        /// Description of what is missing.
        message: String,
    },

    /// No record exists with the given id or position.
    #[error("feedback {id} not found")]
    NotFound {
        /// The id (or snapshot position) that was looked up.
        id: i64,
    },

    /// A sub-item index is outside the note's items.
    #[error("item {index} is out of range (note has {count} items)")]
    ItemOutOfRange {
        /// The zero-based index requested.
        index: usize,
        /// Number of items in the note.
        count: usize,
    },

    /// The current data source is a remote snapshot.
    #[error("remote data is read-only")]
    ReadOnly,

    // === Remote Errors ===
    /// No URL was given for a remote load.
    #[error("no remote URL given")]
    MissingUrl,

    /// Loading a remote snapshot failed.
    #[error("failed to load {url}: {message}")]
    RemoteLoad {
        /// The URL that was fetched.
        url: String,
        /// Description of what went wrong.
        message: String,
    },

    // === Transfer Errors ===
    /// An import document could not be understood.
    #[error("invalid import file: {message}")]
    InvalidImport {
        /// Description of the problem.
        message: String,
    },

    /// An import document contained no records.
    #[error("the file contains no feedback to import")]
    NothingToImport,

    /// A file attached as an image is not an image.
    #[error("{path} is not an image ({mime})")]
    NotAnImage {
        /// Path of the rejected file.
        path: PathBuf,
        /// The guessed mime type.
        mime: String,
    },

    // === I/O Errors ===
    /// File system operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to create a required directory.
    #[error("failed to create directory {path}: {source}")]
    DirectoryCreate {
        /// Path that couldn't be created.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    // === Serialization Errors ===
    /// JSON serialization/deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // === Generic Errors ===
    /// An internal error occurred (bug).
    #[error("internal error: {0}")]
    Internal(String),
}

/// A specialized Result type for dailyfeedback operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Message shown for every remote failure, whatever its cause.
pub const REMOTE_LOAD_FAILED: &str =
    "load failed: check that the URL is reachable and returns feedback JSON";

impl From<figment::Error> for Error {
    fn from(err: figment::Error) -> Self {
        Self::ConfigLoad(Box::new(err))
    }
}

impl Error {
    /// Create a new internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Create an invalid record error.
    #[must_use]
    pub fn invalid_record(message: impl Into<String>) -> Self {
        Self::InvalidRecord {
            message: message.into(),
        }
    }

    /// Create a remote load error.
    #[must_use]
    pub fn remote_load(url: impl Into<String>, message: impl Into<String>) -> Self {
        Self::RemoteLoad {
            url: url.into(),
            message: message.into(),
        }
    }

    /// Create an invalid import error.
    #[must_use]
    pub fn invalid_import(message: impl Into<String>) -> Self {
        Self::InvalidImport {
            message: message.into(),
        }
    }

    /// Check if this error came from loading a remote snapshot.
    #[must_use]
    pub fn is_remote_load(&self) -> bool {
        matches!(self, Self::RemoteLoad { .. })
    }

    /// Check if this error was caused by writing to remote data.
    #[must_use]
    pub fn is_read_only(&self) -> bool {
        matches!(self, Self::ReadOnly)
    }

    /// The one-line message shown to the user.
    ///
    /// Remote failures collapse to a generic "load failed"; the details stay
    /// in the `Display` output for logs.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::RemoteLoad { .. } => REMOTE_LOAD_FAILED.to_string(),
            other => other.to_string(),
        }
    }
}
