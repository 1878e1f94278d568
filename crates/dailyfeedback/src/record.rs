//! Core feedback record types.
//!
//! This module defines the records kept in the local store, exchanged in
//! export files, and read from remote snapshots.

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::{Error, Result};
use crate::segment;

/// A dated feedback note about one team member.
///
/// Field names serialize in camelCase so exported files stay compatible with
/// the browser version of the log.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FeedbackRecord {
    /// Unique identifier (assigned by the storage layer).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,

    /// Calendar day, e.g. `2024-03-01`.
    #[serde(deserialize_with = "null_as_default")]
    pub date: String,

    /// Team member the note is about.
    #[serde(deserialize_with = "null_as_default")]
    pub member: String,

    /// Rich-text note; may contain inline markup.
    #[serde(deserialize_with = "null_as_default")]
    pub note: String,

    /// Attached images as data URIs.
    #[serde(deserialize_with = "null_as_default")]
    pub images: Vec<String>,

    /// Completion flags, one per numbered sub-item of `note`.
    #[serde(deserialize_with = "null_as_default")]
    pub item_dones: Vec<bool>,

    /// Creation timestamp (RFC 3339, milliseconds, UTC).
    #[serde(deserialize_with = "null_as_default")]
    pub created_at: String,
}

/// Decode an explicit `null` as the field's default.
fn null_as_default<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// A record that has not been stored yet.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewFeedback {
    /// Calendar day.
    pub date: String,
    /// Team member.
    pub member: String,
    /// Rich-text note.
    pub note: String,
    /// Attached images as data URIs.
    pub images: Vec<String>,
    /// Completion flags.
    pub item_dones: Vec<bool>,
    /// Creation timestamp; filled in by storage when empty.
    pub created_at: Option<String>,
}

impl NewFeedback {
    /// Build a new record with one unchecked flag per sub-item in `note`.
    #[must_use]
    pub fn new(
        date: impl Into<String>,
        member: impl Into<String>,
        note: impl Into<String>,
        images: Vec<String>,
    ) -> Self {
        let note = note.into();
        let item_dones = vec![false; segment::item_count(&note)];
        Self {
            date: date.into(),
            member: member.into(),
            note,
            images,
            item_dones,
            created_at: None,
        }
    }

    /// Trim the free-text fields the way every write does.
    #[must_use]
    pub fn normalized(mut self) -> Self {
        self.member = self.member.trim().to_string();
        self.note = self.note.trim().to_string();
        self
    }

    /// Check that the fields a save needs are present.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidRecord`] when the date or member is empty.
    pub fn validate(&self) -> Result<()> {
        if self.date.trim().is_empty() {
            return Err(Error::invalid_record("date is required"));
        }
        if self.member.trim().is_empty() {
            return Err(Error::invalid_record("member is required"));
        }
        Ok(())
    }
}

impl From<FeedbackRecord> for NewFeedback {
    fn from(record: FeedbackRecord) -> Self {
        Self {
            date: record.date,
            member: record.member,
            note: record.note,
            images: record.images,
            item_dones: record.item_dones,
            created_at: (!record.created_at.is_empty()).then_some(record.created_at),
        }
    }
}

impl FeedbackRecord {
    /// Whether the note contains markup.
    #[must_use]
    pub fn is_html(&self) -> bool {
        is_note_html(&self.note)
    }

    /// Number of numbered sub-items in the note.
    #[must_use]
    pub fn item_count(&self) -> usize {
        segment::item_count(&self.note)
    }

    /// Flags fitted to the current item count.
    #[must_use]
    pub fn effective_item_dones(&self) -> Vec<bool> {
        segment::reconcile_item_dones(&self.item_dones, self.item_count())
    }

    /// Whether there is anything to show besides the header.
    #[must_use]
    pub fn has_content(&self) -> bool {
        !self.note.is_empty() || !self.images.is_empty()
    }
}

/// Notes containing `<` are treated as markup; everything else is plain text.
#[must_use]
pub fn is_note_html(note: &str) -> bool {
    note.contains('<')
}

/// Current time in the timestamp format records use.
#[must_use]
pub fn now_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Today's local date as `YYYY-MM-DD`.
#[must_use]
pub fn today() -> String {
    chrono::Local::now().format("%Y-%m-%d").to_string()
}
