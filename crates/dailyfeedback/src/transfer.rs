//! Export and import of feedback files.
//!
//! Exports are a versioned envelope around the record list. Imports accept
//! either that envelope or a bare array of records, so files written by the
//! browser version of the log load unchanged.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Error, Result};
use crate::query::FeedbackFilter;
use crate::record::{now_timestamp, FeedbackRecord, NewFeedback};

/// Version written into every export envelope.
pub const EXPORT_VERSION: u32 = 1;

/// The export file layout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportEnvelope {
    /// Format version.
    pub version: u32,
    /// Exported records.
    pub data: Vec<FeedbackRecord>,
    /// When the export was written.
    pub export_at: String,
}

impl ExportEnvelope {
    /// Wrap records in a fresh envelope stamped with the current time.
    #[must_use]
    pub fn new(data: Vec<FeedbackRecord>) -> Self {
        Self {
            version: EXPORT_VERSION,
            data,
            export_at: now_timestamp(),
        }
    }

    /// Pretty-printed JSON for writing to disk.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// File name for an export under the given filter.
///
/// `feedback-<date|all>-<member|all>.json`
#[must_use]
pub fn export_file_name(filter: &FeedbackFilter) -> String {
    format!(
        "feedback-{}-{}.json",
        filter.date().unwrap_or("all"),
        filter.member().unwrap_or("all")
    )
}

/// Decode records from a bare array or an envelope.
///
/// An object without a `data` array yields no records.
///
/// # Errors
///
/// Returns [`Error::Json`] for malformed JSON and [`Error::InvalidImport`]
/// when the document is neither an array nor an object.
pub fn parse_records(json: &str) -> Result<Vec<FeedbackRecord>> {
    let value: Value = serde_json::from_str(json)?;
    records_from_value(value)
}

/// Decode the records of an already-parsed document.
///
/// # Errors
///
/// Returns [`Error::InvalidImport`] for unsupported shapes.
pub fn records_from_value(value: Value) -> Result<Vec<FeedbackRecord>> {
    match value {
        Value::Array(_) => Ok(serde_json::from_value(value)?),
        Value::Object(mut map) => match map.remove("data") {
            Some(data @ Value::Array(_)) => Ok(serde_json::from_value(data)?),
            Some(Value::Null) | None => Ok(Vec::new()),
            Some(_) => Err(Error::invalid_import("`data` must be an array")),
        },
        _ => Err(Error::invalid_import(
            "expected an array of records or an export envelope",
        )),
    }
}

/// Records ready to append from an import file.
///
/// Ids are dropped and every entry gets the same fresh `createdAt`.
///
/// # Errors
///
/// Returns [`Error::NothingToImport`] for an empty file, or a parse error.
pub fn parse_import(json: &str) -> Result<Vec<NewFeedback>> {
    let records = parse_records(json)?;
    if records.is_empty() {
        return Err(Error::NothingToImport);
    }

    let imported_at = now_timestamp();
    Ok(records
        .into_iter()
        .map(|record| NewFeedback {
            date: record.date,
            member: record.member,
            note: record.note,
            images: record.images,
            item_dones: record.item_dones,
            created_at: Some(imported_at.clone()),
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(date: &str, member: &str, note: &str) -> FeedbackRecord {
        FeedbackRecord {
            id: Some(9),
            date: date.to_string(),
            member: member.to_string(),
            note: note.to_string(),
            item_dones: vec![true],
            created_at: "2024-03-01T09:00:00.000Z".to_string(),
            ..FeedbackRecord::default()
        }
    }

    #[test]
    fn test_export_file_name() {
        assert_eq!(
            export_file_name(&FeedbackFilter::all()),
            "feedback-all-all.json"
        );
        assert_eq!(
            export_file_name(&FeedbackFilter::all().with_date("2024-03-01")),
            "feedback-2024-03-01-all.json"
        );
        assert_eq!(
            export_file_name(
                &FeedbackFilter::all()
                    .with_date("2024-03-01")
                    .with_member("Ana")
            ),
            "feedback-2024-03-01-Ana.json"
        );
    }

    #[test]
    fn test_envelope_shape() {
        let envelope = ExportEnvelope::new(vec![record("2024-03-01", "Ana", "1. a")]);
        let json = envelope.to_json().unwrap();
        let value: Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value["version"], 1);
        assert!(value["exportAt"].is_string());
        assert_eq!(value["data"][0]["member"], "Ana");
        assert_eq!(value["data"][0]["itemDones"], serde_json::json!([true]));
        assert!(json.contains('\n'));
    }

    #[test]
    fn test_parse_records_bare_array() {
        let json = r#"[{"date": "2024-03-01", "member": "Ana", "note": "hi"}]"#;
        let records = parse_records(json).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].note, "hi");
    }

    #[test]
    fn test_parse_records_envelope() {
        let json = r#"{"version": 1, "data": [{"date": "2024-03-01", "member": "Ana"}], "exportAt": "x"}"#;
        assert_eq!(parse_records(json).unwrap().len(), 1);
    }

    #[test]
    fn test_parse_records_object_without_data_is_empty() {
        assert!(parse_records(r#"{"version": 1}"#).unwrap().is_empty());
        assert!(parse_records(r#"{"data": null}"#).unwrap().is_empty());
    }

    #[test]
    fn test_parse_records_rejects_scalars() {
        let err = parse_records("42").unwrap_err();
        assert!(matches!(err, Error::InvalidImport { .. }));

        let err = parse_records(r#"{"data": "nope"}"#).unwrap_err();
        assert!(matches!(err, Error::InvalidImport { .. }));
    }

    #[test]
    fn test_parse_records_malformed_json() {
        let err = parse_records("{not json").unwrap_err();
        assert!(matches!(err, Error::Json(_)));
    }

    #[test]
    fn test_parse_import_empty_is_rejected() {
        assert!(matches!(
            parse_import("[]").unwrap_err(),
            Error::NothingToImport
        ));
        assert!(matches!(
            parse_import(r#"{"version": 1, "data": []}"#).unwrap_err(),
            Error::NothingToImport
        ));
    }

    #[test]
    fn test_parse_import_resets_identity_fields() {
        let envelope = ExportEnvelope::new(vec![
            record("2024-03-01", "Ana", "1. a"),
            record("2024-03-02", "Bo", "x"),
        ]);
        let imported = parse_import(&envelope.to_json().unwrap()).unwrap();

        assert_eq!(imported.len(), 2);
        assert_eq!(imported[0].member, "Ana");
        assert_eq!(imported[0].item_dones, vec![true]);
        let stamp = imported[0].created_at.clone().unwrap();
        assert_ne!(stamp, "2024-03-01T09:00:00.000Z");
        assert_eq!(imported[1].created_at.as_deref(), Some(stamp.as_str()));
    }

    #[test]
    fn test_parse_import_treats_null_fields_as_empty() {
        let json = r#"[{"date":"2024-03-01","member":"Ana","note":null,"images":null,"itemDones":null}]"#;
        let imported = parse_import(json).unwrap();

        assert_eq!(imported.len(), 1);
        assert_eq!(imported[0].member, "Ana");
        assert_eq!(imported[0].note, "");
        assert!(imported[0].images.is_empty());
        assert!(imported[0].item_dones.is_empty());
    }

    #[test]
    fn test_parse_records_envelope_with_null_member() {
        let json = r#"{"data":[{"date":"2024-03-01","member":null,"note":"hi","createdAt":null}]}"#;
        let records = parse_records(json).unwrap();

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].member, "");
        assert_eq!(records[0].created_at, "");
        assert_eq!(records[0].note, "hi");
    }
}
