//! Terminal output for records.

use std::fmt::Write;

use crate::codec::describe_data_uri;
use crate::record::FeedbackRecord;
use crate::render::render_note_text;
use crate::Result;

/// Widest note column in table output, in characters.
const NOTE_PREVIEW_WIDTH: usize = 48;

/// One block per record, notes rendered with item checkboxes.
#[must_use]
pub fn format_plain(records: &[FeedbackRecord]) -> String {
    let mut out = String::new();
    for record in records {
        let _ = writeln!(out, "{}", header(record));
        let body = render_note_text(&record.note, &record.effective_item_dones());
        for line in body.lines() {
            let _ = writeln!(out, "    {line}");
        }
    }
    out
}

/// Fixed-width table, one row per record.
#[must_use]
pub fn format_table(records: &[FeedbackRecord]) -> String {
    let member_width = records
        .iter()
        .map(|r| r.member.chars().count())
        .max()
        .unwrap_or(0)
        .max("MEMBER".len());

    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:>5}  {:<10}  {:<member_width$}  {:>5}  {:>6}  NOTE",
        "ID", "DATE", "MEMBER", "ITEMS", "IMAGES"
    );
    for record in records {
        let _ = writeln!(
            out,
            "{:>5}  {:<10}  {:<member_width$}  {:>5}  {:>6}  {}",
            record.id.map_or_else(|| "-".to_string(), |id| id.to_string()),
            record.date,
            record.member,
            progress(record),
            record.images.len(),
            note_preview(record)
        );
    }
    out
}

/// Records as a pretty JSON array.
///
/// # Errors
///
/// Returns an error if serialization fails.
pub fn format_json(records: &[FeedbackRecord]) -> Result<String> {
    Ok(serde_json::to_string_pretty(records)?)
}

/// Full view of one record, including image details.
#[must_use]
pub fn format_detail(record: &FeedbackRecord) -> String {
    let mut out = header(record);
    out.push('\n');
    let _ = writeln!(out, "created: {}", record.created_at);

    if record.has_content() {
        let body = render_note_text(&record.note, &record.effective_item_dones());
        if !body.is_empty() {
            out.push('\n');
            let _ = writeln!(out, "{body}");
        }
    } else {
        let _ = writeln!(out, "(no content)");
    }

    for (i, image) in record.images.iter().enumerate() {
        let position = i + 1;
        match describe_data_uri(image) {
            Some((mime, size)) => {
                let _ = writeln!(out, "image {position}: {mime}, {size} bytes");
            }
            None => {
                let _ = writeln!(out, "image {position}: (unreadable)");
            }
        }
    }
    out
}

fn header(record: &FeedbackRecord) -> String {
    let mut header = format!(
        "#{}  {}  {}",
        record.id.unwrap_or_default(),
        record.date,
        record.member
    );
    let mut details = Vec::new();
    if record.item_count() > 0 {
        details.push(format!("{} done", progress(record)));
    }
    match record.images.len() {
        0 => {}
        1 => details.push("1 image".to_string()),
        n => details.push(format!("{n} images")),
    }
    if !details.is_empty() {
        let _ = write!(header, "  ({})", details.join(", "));
    }
    header
}

fn progress(record: &FeedbackRecord) -> String {
    let flags = record.effective_item_dones();
    if flags.is_empty() {
        return "-".to_string();
    }
    let done = flags.iter().filter(|d| **d).count();
    format!("{done}/{}", flags.len())
}

fn note_preview(record: &FeedbackRecord) -> String {
    let text = render_note_text(&record.note, &record.effective_item_dones());
    let first = text.lines().next().unwrap_or_default();
    if first.chars().count() > NOTE_PREVIEW_WIDTH {
        let cut: String = first.chars().take(NOTE_PREVIEW_WIDTH - 3).collect();
        format!("{cut}...")
    } else {
        first.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> FeedbackRecord {
        FeedbackRecord {
            id: Some(3),
            date: "2024-03-01".to_string(),
            member: "Ana".to_string(),
            note: "Review: 1. tests 2. docs".to_string(),
            images: vec!["data:image/png;base64,aGVsbG8=".to_string()],
            item_dones: vec![true],
            created_at: "2024-03-01T09:00:00.000Z".to_string(),
        }
    }

    #[test]
    fn test_format_plain() {
        let out = format_plain(&[sample()]);
        assert!(out.starts_with("#3  2024-03-01  Ana  (1/2 done, 1 image)\n"));
        assert!(out.contains("    Review:\n"));
        assert!(out.contains("    [x] 1. tests\n"));
        assert!(out.contains("    [ ] 2. docs\n"));
    }

    #[test]
    fn test_format_plain_empty() {
        assert!(format_plain(&[]).is_empty());
    }

    #[test]
    fn test_format_table() {
        let out = format_table(&[sample()]);
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains("MEMBER"));
        assert!(lines[1].contains("1/2"));
        assert!(lines[1].contains("Review:"));
    }

    #[test]
    fn test_note_preview_truncates() {
        let record = FeedbackRecord {
            note: "x".repeat(100),
            ..FeedbackRecord::default()
        };
        let preview = note_preview(&record);
        assert_eq!(preview.chars().count(), NOTE_PREVIEW_WIDTH);
        assert!(preview.ends_with("..."));
    }

    #[test]
    fn test_format_json() {
        let out = format_json(&[sample()]).unwrap();
        let value: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(value[0]["member"], "Ana");
    }

    #[test]
    fn test_format_detail() {
        let out = format_detail(&sample());
        assert!(out.contains("created: 2024-03-01T09:00:00.000Z"));
        assert!(out.contains("[ ] 2. docs"));
        assert!(out.contains("image 1: image/png, 5 bytes"));
    }

    #[test]
    fn test_format_detail_without_content() {
        let record = FeedbackRecord {
            id: Some(1),
            date: "2024-03-01".to_string(),
            member: "Bo".to_string(),
            ..FeedbackRecord::default()
        };
        assert!(format_detail(&record).contains("(no content)"));
    }
}
