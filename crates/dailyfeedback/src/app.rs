//! Application state and user-level operations.
//!
//! [`App`] ties the local store to an optional remote snapshot. All reads go
//! through the current [`DataMode`]; writes are only allowed in local mode,
//! except for completion flags, which remote entries keep in a local side
//! table.

use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::query::{unique_members, FeedbackFilter};
use crate::record::{FeedbackRecord, NewFeedback};
use crate::remote::RemoteSource;
use crate::segment;
use crate::storage::{RemoteEntryKey, Storage};
use crate::transfer::{self, ExportEnvelope};

/// Where records are read from.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum DataMode {
    /// The local store.
    #[default]
    Local,
    /// A read-only snapshot loaded from `url`.
    ///
    /// Snapshot entries are numbered by 1-based position on load; that number
    /// is their `id` for as long as the snapshot is active.
    Remote {
        /// URL the snapshot came from.
        url: String,
        /// Records as fetched.
        snapshot: Vec<FeedbackRecord>,
    },
}

/// Editable fields of a record.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Draft {
    /// Calendar day.
    pub date: String,
    /// Team member.
    pub member: String,
    /// Rich-text note.
    pub note: String,
    /// Attached images as data URIs.
    pub images: Vec<String>,
}

impl From<&FeedbackRecord> for Draft {
    fn from(record: &FeedbackRecord) -> Self {
        Self {
            date: record.date.clone(),
            member: record.member.clone(),
            note: record.note.clone(),
            images: record.images.clone(),
        }
    }
}

/// The feedback log.
#[derive(Debug)]
pub struct App<R> {
    storage: Storage,
    remote: R,
    mode: DataMode,
    editing: Option<i64>,
}

impl<R: RemoteSource> App<R> {
    /// Start in local mode with no edit in progress.
    #[must_use]
    pub fn new(storage: Storage, remote: R) -> Self {
        Self {
            storage,
            remote,
            mode: DataMode::Local,
            editing: None,
        }
    }

    /// The underlying store.
    #[must_use]
    pub fn storage(&self) -> &Storage {
        &self.storage
    }

    /// The current data mode.
    #[must_use]
    pub fn mode(&self) -> &DataMode {
        &self.mode
    }

    /// Whether a remote snapshot is active.
    #[must_use]
    pub fn is_remote(&self) -> bool {
        matches!(self.mode, DataMode::Remote { .. })
    }

    /// The id of the record being edited, if any.
    #[must_use]
    pub fn editing(&self) -> Option<i64> {
        self.editing
    }

    /// All records of the current source.
    ///
    /// Remote entries carry any completion flags recorded locally.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    pub fn records(&self) -> Result<Vec<FeedbackRecord>> {
        match &self.mode {
            DataMode::Local => self.storage.get_all(),
            DataMode::Remote { url, snapshot } => snapshot
                .iter()
                .map(|record| -> Result<FeedbackRecord> {
                    let mut record = record.clone();
                    let key = RemoteEntryKey::for_record(url, &record);
                    if let Some(flags) = self.storage.remote_item_dones(&key)? {
                        record.item_dones = flags;
                    }
                    Ok(record)
                })
                .collect(),
        }
    }

    /// Filtered records of the current source, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    pub fn list(&self, filter: &FeedbackFilter) -> Result<Vec<FeedbackRecord>> {
        Ok(filter.apply(&self.records()?))
    }

    /// Distinct members of the current source.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    pub fn members(&self) -> Result<Vec<String>> {
        Ok(unique_members(&self.records()?))
    }

    /// One record of the current source.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if no record has this id.
    pub fn get(&self, id: i64) -> Result<FeedbackRecord> {
        let found = match &self.mode {
            DataMode::Local => self.storage.get(id)?,
            DataMode::Remote { .. } => self.records()?.into_iter().find(|r| r.id == Some(id)),
        };
        found.ok_or(Error::NotFound { id })
    }

    /// Fetch a snapshot and switch to remote mode.
    ///
    /// The current mode is kept when the fetch fails.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingUrl`] for an empty URL and
    /// [`Error::RemoteLoad`] for any fetch failure.
    pub async fn load_remote(&mut self, url: &str) -> Result<usize> {
        let url = url.trim();
        if url.is_empty() {
            return Err(Error::MissingUrl);
        }

        let mut snapshot = self.remote.fetch(url).await?;
        for (position, record) in (1_i64..).zip(snapshot.iter_mut()) {
            record.id = Some(position);
        }

        let count = snapshot.len();
        info!(url, count, "Switched to remote data");
        self.mode = DataMode::Remote {
            url: url.to_string(),
            snapshot,
        };
        self.editing = None;
        Ok(count)
    }

    /// Switch back to the local store.
    pub fn use_local(&mut self) {
        if self.is_remote() {
            info!("Switched to local data");
        }
        self.mode = DataMode::Local;
    }

    /// Start editing a stored record.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ReadOnly`] in remote mode and [`Error::NotFound`] for an
    /// unknown id.
    pub fn begin_edit(&mut self, id: i64) -> Result<Draft> {
        self.ensure_local()?;
        let record = self.storage.get(id)?.ok_or(Error::NotFound { id })?;
        self.editing = Some(id);
        debug!(id, "Editing feedback");
        Ok(Draft::from(&record))
    }

    /// Abandon the edit in progress.
    pub fn cancel_edit(&mut self) {
        self.editing = None;
    }

    /// Blank draft for a new record on `date`.
    ///
    /// Any edit in progress is abandoned.
    pub fn new_draft(&mut self, date: impl Into<String>) -> Draft {
        self.editing = None;
        Draft {
            date: date.into(),
            ..Draft::default()
        }
    }

    /// Store a draft and return the record id.
    ///
    /// Updates the record being edited, or adds a new one. On update the
    /// creation time is kept and completion flags are fitted to the new item
    /// count; on add every item starts unchecked.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ReadOnly`] in remote mode, [`Error::InvalidRecord`] when
    /// the date or member is missing, or a storage error.
    pub fn save(&mut self, draft: &Draft) -> Result<i64> {
        self.ensure_local()?;

        let id = match self.editing {
            Some(id) => {
                let existing = self.storage.get(id)?.ok_or(Error::NotFound { id })?;
                let feedback = NewFeedback {
                    date: draft.date.clone(),
                    member: draft.member.clone(),
                    note: draft.note.clone(),
                    images: draft.images.clone(),
                    item_dones: segment::reconcile_item_dones(
                        &existing.item_dones,
                        segment::item_count(&draft.note),
                    ),
                    created_at: (!existing.created_at.is_empty()).then_some(existing.created_at),
                };
                feedback.validate()?;
                if !self.storage.update(id, &feedback)? {
                    return Err(Error::NotFound { id });
                }
                info!(id, "Updated feedback");
                id
            }
            None => {
                let feedback = NewFeedback::new(
                    draft.date.clone(),
                    draft.member.clone(),
                    draft.note.clone(),
                    draft.images.clone(),
                );
                feedback.validate()?;
                let id = self.storage.add(&feedback)?;
                info!(id, "Added feedback");
                id
            }
        };

        self.editing = None;
        Ok(id)
    }

    /// Delete a stored record.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ReadOnly`] in remote mode and [`Error::NotFound`] for an
    /// unknown id.
    pub fn delete(&mut self, id: i64) -> Result<()> {
        self.ensure_local()?;
        if !self.storage.delete(id)? {
            return Err(Error::NotFound { id });
        }
        if self.editing == Some(id) {
            self.editing = None;
        }
        info!(id, "Deleted feedback");
        Ok(())
    }

    /// Flip the completion flag of item `index` (0-based) and return its new
    /// state.
    ///
    /// Local records are updated in place; remote entries record the flags in
    /// the side table.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] for an unknown id and
    /// [`Error::ItemOutOfRange`] when the note has no such item.
    pub fn toggle_item(&mut self, id: i64, index: usize) -> Result<bool> {
        let record = self.get(id)?;
        let count = record.item_count();
        if index >= count {
            return Err(Error::ItemOutOfRange { index, count });
        }

        let flags = segment::toggle_item_done(&record.item_dones, index);
        let done = flags[index];

        match &self.mode {
            DataMode::Local => {
                if !self.storage.update_item_dones(id, &flags)? {
                    return Err(Error::NotFound { id });
                }
            }
            DataMode::Remote { url, .. } => {
                let key = RemoteEntryKey::for_record(url, &record);
                self.storage.set_remote_item_dones(&key, &flags)?;
            }
        }

        debug!(id, index, done, "Toggled item");
        Ok(done)
    }

    /// Export the filtered records of the current source.
    ///
    /// Returns the suggested file name and the file contents.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read or serialization fails.
    pub fn export(&self, filter: &FeedbackFilter) -> Result<(String, String)> {
        let records = self.list(filter)?;
        let name = transfer::export_file_name(filter);
        debug!(count = records.len(), file = %name, "Exporting feedback");
        Ok((name, ExportEnvelope::new(records).to_json()?))
    }

    /// Append the records of an import file and switch to local mode.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NothingToImport`] for an empty file, or a parse or
    /// storage error.
    pub fn import(&mut self, json: &str) -> Result<usize> {
        let feedback = transfer::parse_import(json)?;
        let ids = self.storage.add_all(&feedback)?;
        self.use_local();
        info!(count = ids.len(), "Imported feedback");
        Ok(ids.len())
    }

    fn ensure_local(&self) -> Result<()> {
        if self.is_remote() {
            Err(Error::ReadOnly)
        } else {
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    /// Remote source serving a fixed snapshot, or failing.
    #[derive(Debug, Default)]
    struct FakeRemote {
        records: Vec<FeedbackRecord>,
        fail: bool,
    }

    #[async_trait]
    impl RemoteSource for FakeRemote {
        async fn fetch(&self, url: &str) -> Result<Vec<FeedbackRecord>> {
            if self.fail {
                Err(Error::remote_load(url, "connection refused"))
            } else {
                Ok(self.records.clone())
            }
        }
    }

    const URL: &str = "https://example.com/feedback.json";

    fn remote_record(date: &str, member: &str, note: &str, created_at: &str) -> FeedbackRecord {
        FeedbackRecord {
            id: Some(77),
            date: date.to_string(),
            member: member.to_string(),
            note: note.to_string(),
            created_at: created_at.to_string(),
            ..FeedbackRecord::default()
        }
    }

    fn test_app() -> App<FakeRemote> {
        let remote = FakeRemote {
            records: vec![
                remote_record("2024-03-01", "Ana", "1. a 2. b", "2024-03-01T09:00:00.000Z"),
                remote_record("2024-03-02", "Bo", "plain", "2024-03-02T09:00:00.000Z"),
            ],
            fail: false,
        };
        App::new(Storage::open_in_memory().unwrap(), remote)
    }

    fn draft(date: &str, member: &str, note: &str) -> Draft {
        Draft {
            date: date.to_string(),
            member: member.to_string(),
            note: note.to_string(),
            images: Vec::new(),
        }
    }

    #[test]
    fn test_starts_local() {
        let app = test_app();
        assert_eq!(app.mode(), &DataMode::Local);
        assert!(app.editing().is_none());
        assert!(app.records().unwrap().is_empty());
    }

    #[test]
    fn test_save_adds_with_unchecked_items() {
        let mut app = test_app();
        let id = app.save(&draft("2024-03-01", " Ana ", "1. a 2. b 3. c")).unwrap();

        let record = app.get(id).unwrap();
        assert_eq!(record.member, "Ana");
        assert_eq!(record.item_dones, vec![false, false, false]);
        assert!(!record.created_at.is_empty());
    }

    #[test]
    fn test_save_requires_date_and_member() {
        let mut app = test_app();
        assert!(matches!(
            app.save(&draft("2024-03-01", "", "x")).unwrap_err(),
            Error::InvalidRecord { .. }
        ));
        assert!(matches!(
            app.save(&draft("", "Ana", "x")).unwrap_err(),
            Error::InvalidRecord { .. }
        ));
        assert_eq!(app.storage().count().unwrap(), 0);
    }

    #[test]
    fn test_edit_keeps_created_at_and_reconciles_flags() {
        let mut app = test_app();
        let id = app.save(&draft("2024-03-01", "Ana", "1. a 2. b 3. c")).unwrap();
        app.toggle_item(id, 0).unwrap();
        app.toggle_item(id, 2).unwrap();
        let before = app.get(id).unwrap();

        let mut edited = app.begin_edit(id).unwrap();
        assert_eq!(app.editing(), Some(id));
        edited.note = "1. a 2. b".to_string();
        assert_eq!(app.save(&edited).unwrap(), id);

        let after = app.get(id).unwrap();
        assert_eq!(after.created_at, before.created_at);
        assert_eq!(after.item_dones, vec![true, false]);
        assert!(app.editing().is_none());
        assert_eq!(app.storage().count().unwrap(), 1);
    }

    #[test]
    fn test_edit_growing_items_pads_false() {
        let mut app = test_app();
        let id = app.save(&draft("2024-03-01", "Ana", "1. a")).unwrap();
        app.toggle_item(id, 0).unwrap();

        let mut edited = app.begin_edit(id).unwrap();
        edited.note = "1. a 2. b".to_string();
        app.save(&edited).unwrap();

        assert_eq!(app.get(id).unwrap().item_dones, vec![true, false]);
    }

    #[test]
    fn test_cancel_edit_then_save_adds() {
        let mut app = test_app();
        let id = app.save(&draft("2024-03-01", "Ana", "x")).unwrap();
        let edited = app.begin_edit(id).unwrap();
        app.cancel_edit();

        let new_id = app.save(&edited).unwrap();
        assert_ne!(new_id, id);
        assert_eq!(app.storage().count().unwrap(), 2);
    }

    #[test]
    fn test_new_draft_abandons_edit() {
        let mut app = test_app();
        let id = app.save(&draft("2024-03-01", "Ana", "x")).unwrap();
        app.begin_edit(id).unwrap();

        let blank = app.new_draft("2024-03-05");
        assert_eq!(blank.date, "2024-03-05");
        assert!(blank.member.is_empty());
        assert!(app.editing().is_none());
    }

    #[test]
    fn test_begin_edit_unknown_id() {
        let mut app = test_app();
        assert!(matches!(
            app.begin_edit(5).unwrap_err(),
            Error::NotFound { id: 5 }
        ));
    }

    #[test]
    fn test_delete() {
        let mut app = test_app();
        let id = app.save(&draft("2024-03-01", "Ana", "x")).unwrap();
        app.begin_edit(id).unwrap();

        app.delete(id).unwrap();
        assert!(app.editing().is_none());
        assert!(matches!(app.get(id).unwrap_err(), Error::NotFound { .. }));
        assert!(matches!(app.delete(id).unwrap_err(), Error::NotFound { .. }));
    }

    #[test]
    fn test_toggle_local_item() {
        let mut app = test_app();
        let id = app.save(&draft("2024-03-01", "Ana", "1. a 2. b")).unwrap();

        assert!(app.toggle_item(id, 1).unwrap());
        assert_eq!(app.get(id).unwrap().item_dones, vec![false, true]);
        assert!(!app.toggle_item(id, 1).unwrap());
        assert_eq!(app.get(id).unwrap().item_dones, vec![false, false]);
    }

    #[test]
    fn test_toggle_out_of_range() {
        let mut app = test_app();
        let id = app.save(&draft("2024-03-01", "Ana", "1. a 2. b")).unwrap();
        assert!(matches!(
            app.toggle_item(id, 2).unwrap_err(),
            Error::ItemOutOfRange { index: 2, count: 2 }
        ));

        let plain = app.save(&draft("2024-03-01", "Ana", "no items")).unwrap();
        assert!(matches!(
            app.toggle_item(plain, 0).unwrap_err(),
            Error::ItemOutOfRange { .. }
        ));
    }

    #[test]
    fn test_list_and_members() {
        let mut app = test_app();
        app.save(&draft("2024-03-01", "Bo", "x")).unwrap();
        app.save(&draft("2024-03-02", "Ana", "y")).unwrap();
        app.save(&draft("2024-03-02", "Bo", "z")).unwrap();

        let day = app
            .list(&FeedbackFilter::all().with_date("2024-03-02"))
            .unwrap();
        assert_eq!(day.len(), 2);
        assert_eq!(app.list(&FeedbackFilter::all()).unwrap()[0].date, "2024-03-02");
        assert_eq!(app.members().unwrap(), vec!["Ana", "Bo"]);
    }

    #[tokio::test]
    async fn test_load_remote_numbers_entries() {
        let mut app = test_app();
        assert_eq!(app.load_remote(URL).await.unwrap(), 2);
        assert!(app.is_remote());

        let records = app.records().unwrap();
        assert_eq!(records[0].id, Some(1));
        assert_eq!(records[1].id, Some(2));
        assert_eq!(app.get(2).unwrap().member, "Bo");
        assert_eq!(app.members().unwrap(), vec!["Ana", "Bo"]);
    }

    #[tokio::test]
    async fn test_load_remote_empty_url() {
        let mut app = test_app();
        assert!(matches!(
            app.load_remote("   ").await.unwrap_err(),
            Error::MissingUrl
        ));
        assert!(!app.is_remote());
    }

    #[tokio::test]
    async fn test_load_remote_failure_keeps_mode() {
        let mut app = App::new(
            Storage::open_in_memory().unwrap(),
            FakeRemote {
                records: Vec::new(),
                fail: true,
            },
        );
        let err = app.load_remote(URL).await.unwrap_err();
        assert!(err.user_message().starts_with("load failed"));
        assert_eq!(app.mode(), &DataMode::Local);
    }

    #[tokio::test]
    async fn test_remote_is_read_only() {
        let mut app = test_app();
        let id = app.save(&draft("2024-03-01", "Ana", "x")).unwrap();
        app.load_remote(URL).await.unwrap();

        assert!(app.begin_edit(id).unwrap_err().is_read_only());
        assert!(app.delete(id).unwrap_err().is_read_only());
        assert!(app.save(&draft("2024-03-01", "Ana", "y")).unwrap_err().is_read_only());
        assert_eq!(app.storage().count().unwrap(), 1);
    }

    #[tokio::test]
    async fn test_remote_toggle_uses_side_table() {
        let mut app = test_app();
        app.load_remote(URL).await.unwrap();

        assert!(app.toggle_item(1, 1).unwrap());
        assert_eq!(app.get(1).unwrap().item_dones, vec![false, true]);
        assert_eq!(app.storage().count().unwrap(), 0);

        // Flags survive reloading the same snapshot.
        app.use_local();
        app.load_remote(URL).await.unwrap();
        assert_eq!(app.get(1).unwrap().item_dones, vec![false, true]);
    }

    #[tokio::test]
    async fn test_remote_toggle_out_of_range() {
        let mut app = test_app();
        app.load_remote(URL).await.unwrap();
        assert!(matches!(
            app.toggle_item(2, 0).unwrap_err(),
            Error::ItemOutOfRange { count: 0, .. }
        ));
    }

    #[tokio::test]
    async fn test_use_local_after_remote() {
        let mut app = test_app();
        app.save(&draft("2024-03-09", "Cy", "x")).unwrap();
        app.load_remote(URL).await.unwrap();
        app.use_local();

        assert_eq!(app.members().unwrap(), vec!["Cy"]);
    }

    #[test]
    fn test_export_import_roundtrip() {
        fn fields(record: &FeedbackRecord) -> (&str, &str, &str, &[String], &[bool]) {
            (
                record.date.as_str(),
                record.member.as_str(),
                record.note.as_str(),
                record.images.as_slice(),
                record.item_dones.as_slice(),
            )
        }

        let mut source = test_app();
        let mut with_image = draft("2024-03-01", "Ana", "1. a 2. b");
        with_image.images = vec!["data:image/png;base64,iVBORw0KGgo=".to_string()];
        let id = source.save(&with_image).unwrap();
        source.toggle_item(id, 0).unwrap();
        source.save(&draft("2024-03-02", "Bo", "x")).unwrap();

        let filter = FeedbackFilter::all().with_member("Ana");
        let (name, json) = source.export(&filter).unwrap();
        assert_eq!(name, "feedback-all-Ana.json");

        let mut target = test_app();
        assert_eq!(target.import(&json).unwrap(), 1);

        let original = source.get(id).unwrap();
        let imported = target.records().unwrap();
        assert_eq!(imported.len(), 1);
        assert_eq!(fields(&imported[0]), fields(&original));
        assert_eq!(imported[0].item_dones, vec![true, false]);
        assert_eq!(imported[0].images.len(), 1);
    }

    #[test]
    fn test_import_appends_duplicates() {
        let mut app = test_app();
        app.save(&draft("2024-03-01", "Ana", "x")).unwrap();
        let (_, json) = app.export(&FeedbackFilter::all()).unwrap();

        app.import(&json).unwrap();
        assert_eq!(app.storage().count().unwrap(), 2);
    }

    #[test]
    fn test_import_empty_is_rejected() {
        let mut app = test_app();
        assert!(matches!(
            app.import("[]").unwrap_err(),
            Error::NothingToImport
        ));
    }

    #[tokio::test]
    async fn test_import_switches_to_local() {
        let mut app = test_app();
        app.load_remote(URL).await.unwrap();

        let json = r#"[{"date": "2024-03-04", "member": "Di", "note": ""}]"#;
        assert_eq!(app.import(json).unwrap(), 1);
        assert!(!app.is_remote());
        assert_eq!(app.members().unwrap(), vec!["Di"]);
    }

    #[tokio::test]
    async fn test_export_remote_snapshot() {
        let mut app = test_app();
        app.load_remote(URL).await.unwrap();

        let (name, json) = app
            .export(&FeedbackFilter::all().with_date("2024-03-02"))
            .unwrap();
        assert_eq!(name, "feedback-2024-03-02-all.json");
        let records = transfer::parse_records(&json).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].member, "Bo");
    }
}
