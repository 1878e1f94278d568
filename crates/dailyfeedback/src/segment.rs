//! Note segmentation and sub-item completion tracking.
//!
//! A note is split into an introductory part and a sequence of numbered
//! sub-items. A sub-item begins at a numeric marker: ASCII digits, then `.`
//! or the full-width `．`, then at least one whitespace character or `&nbsp;`
//! entity.
//!
//! The same detector ([`find_marker`]) decides both where the note is split
//! and whether a resulting segment is an item. A segment is an item whenever
//! the detector finds a marker anywhere in its trimmed text.
//!
//! Completion flags are positional: flag `i` belongs to the `i`-th item
//! segment, not to any particular item text. Reordering items in an edit
//! moves the flags with the positions, not with the content.

/// The HTML entity rich-text editors emit for a non-breaking space.
const NBSP_ENTITY: &str = "&nbsp;";

/// Full-width full stop accepted as a marker separator.
const FULL_WIDTH_STOP: char = '．';

/// A numeric marker found in a note, as byte offsets into the text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Marker {
    /// Offset of the first digit.
    pub start: usize,
    /// Offset just past the `.` / `．` separator.
    pub label_end: usize,
    /// Offset just past the whitespace run that follows the separator.
    pub end: usize,
}

/// One piece of a segmented note.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoteSegment {
    /// Trimmed fragment. For items that start with their marker this is the
    /// text after the marker.
    pub content: String,
    /// Whether the segment carries a completion flag.
    pub is_item: bool,
    /// The marker label (`"3."`) when the segment starts with one.
    pub label: Option<String>,
}

/// A note split into segments.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SegmentedNote {
    /// Segments in note order.
    pub segments: Vec<NoteSegment>,
    /// Number of segments with `is_item` set.
    pub item_count: usize,
}

impl SegmentedNote {
    /// Item segments paired with their position among items.
    pub fn items(&self) -> impl Iterator<Item = (usize, &NoteSegment)> {
        self.segments.iter().filter(|s| s.is_item).enumerate()
    }

    /// Segments that are not items.
    pub fn intro(&self) -> impl Iterator<Item = &NoteSegment> {
        self.segments.iter().filter(|s| !s.is_item)
    }
}

/// Find the first marker at or after byte offset `from`.
///
/// A marker may not start in the middle of a digit run, so `12. x` yields a
/// single marker labelled `12.`.
#[must_use]
pub fn find_marker(text: &str, from: usize) -> Option<Marker> {
    let bytes = text.as_bytes();
    text.get(from..)?
        .char_indices()
        .map(|(offset, c)| (from + offset, c))
        .filter(|&(pos, c)| c.is_ascii_digit() && (pos == 0 || !bytes[pos - 1].is_ascii_digit()))
        .find_map(|(pos, _)| marker_at(text, pos))
}

/// Byte offsets of every marker start in `text`, in order.
#[must_use]
pub fn marker_positions(text: &str) -> Vec<usize> {
    let mut positions = Vec::new();
    let mut from = 0;
    while let Some(marker) = find_marker(text, from) {
        positions.push(marker.start);
        from = marker.end;
    }
    positions
}

/// Split a note into segments and count its items.
#[must_use]
pub fn segment_note(note: &str) -> SegmentedNote {
    let mut bounds = vec![0];
    bounds.extend(marker_positions(note).into_iter().filter(|&p| p > 0));
    bounds.push(note.len());

    let segments: Vec<NoteSegment> = bounds
        .windows(2)
        .map(|w| note[w[0]..w[1]].trim())
        .filter(|s| !s.is_empty())
        .map(classify)
        .collect();
    let item_count = segments.iter().filter(|s| s.is_item).count();

    SegmentedNote {
        segments,
        item_count,
    }
}

/// Number of sub-items in a note.
#[must_use]
pub fn item_count(note: &str) -> usize {
    segment_note(note).item_count
}

/// Fit previous completion flags to a new item count.
///
/// Flags are kept by index; missing slots are filled with `false` and extra
/// ones dropped.
#[must_use]
pub fn reconcile_item_dones(previous: &[bool], count: usize) -> Vec<bool> {
    let mut flags: Vec<bool> = previous.iter().copied().take(count).collect();
    flags.resize(count, false);
    flags
}

/// Invert the flag at `index`, growing the sequence with `false` as needed.
#[must_use]
pub fn toggle_item_done(flags: &[bool], index: usize) -> Vec<bool> {
    let mut flags = flags.to_vec();
    if index >= flags.len() {
        flags.resize(index + 1, false);
    }
    flags[index] = !flags[index];
    flags
}

fn classify(trimmed: &str) -> NoteSegment {
    match find_marker(trimmed, 0) {
        Some(marker) if marker.start == 0 => NoteSegment {
            content: trimmed[marker.end..].trim().to_string(),
            is_item: true,
            label: Some(trimmed[..marker.label_end].to_string()),
        },
        Some(_) => NoteSegment {
            content: trimmed.to_string(),
            is_item: true,
            label: None,
        },
        None => NoteSegment {
            content: trimmed.to_string(),
            is_item: false,
            label: None,
        },
    }
}

fn marker_at(text: &str, start: usize) -> Option<Marker> {
    let digits = text[start..]
        .bytes()
        .take_while(u8::is_ascii_digit)
        .count();
    if digits == 0 {
        return None;
    }

    let after_digits = start + digits;
    let rest = &text[after_digits..];
    let separator = if rest.starts_with('.') {
        1
    } else if rest.starts_with(FULL_WIDTH_STOP) {
        FULL_WIDTH_STOP.len_utf8()
    } else {
        return None;
    };

    let label_end = after_digits + separator;
    let end = skip_gap(text, label_end);
    (end > label_end).then_some(Marker {
        start,
        label_end,
        end,
    })
}

fn skip_gap(text: &str, mut pos: usize) -> usize {
    loop {
        let rest = &text[pos..];
        if let Some(c) = rest.chars().next().filter(|c| c.is_whitespace()) {
            pos += c.len_utf8();
        } else if rest.starts_with(NBSP_ENTITY) {
            pos += NBSP_ENTITY.len();
        } else {
            return pos;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn contents(note: &SegmentedNote) -> Vec<&str> {
        note.segments.iter().map(|s| s.content.as_str()).collect()
    }

    #[test]
    fn test_note_without_markers_is_one_intro_segment() {
        let note = segment_note("Great progress on the release checklist today.");
        assert_eq!(note.item_count, 0);
        assert_eq!(note.segments.len(), 1);
        assert!(!note.segments[0].is_item);
    }

    #[test]
    fn test_three_inline_items() {
        let note = segment_note("1. a 2. b 3. c");
        assert_eq!(note.item_count, 3);
        assert_eq!(contents(&note), vec!["a", "b", "c"]);
        assert!(note.segments.iter().all(|s| s.is_item));
    }

    #[test]
    fn test_intro_before_items() {
        let note = segment_note("Review notes:\n1. tighten tests\n2. rename module");
        assert_eq!(note.item_count, 2);
        assert_eq!(
            contents(&note),
            vec!["Review notes:", "tighten tests", "rename module"]
        );
        assert!(!note.segments[0].is_item);
        assert_eq!(note.segments[1].label.as_deref(), Some("1."));
    }

    #[test]
    fn test_full_width_stop_and_nbsp_entity() {
        let note = segment_note("1． 第一项 2.&nbsp;second 3.&nbsp;&nbsp; third");
        assert_eq!(note.item_count, 3);
        assert_eq!(contents(&note), vec!["第一项", "second", "third"]);
        assert_eq!(note.segments[0].label.as_deref(), Some("1．"));
    }

    #[test]
    fn test_non_breaking_space_character() {
        let note = segment_note("1.\u{a0}one 2.\u{a0}two");
        assert_eq!(note.item_count, 2);
    }

    #[test]
    fn test_multi_digit_marker_is_not_split() {
        let note = segment_note("12. twelfth 13. thirteenth");
        assert_eq!(note.item_count, 2);
        assert_eq!(note.segments[0].label.as_deref(), Some("12."));
        assert_eq!(contents(&note), vec!["twelfth", "thirteenth"]);
    }

    #[test]
    fn test_decimal_number_is_not_a_marker() {
        let note = segment_note("Upgrade to 2.0 before Friday");
        assert_eq!(note.item_count, 0);
        assert_eq!(note.segments.len(), 1);
    }

    #[test]
    fn test_marker_without_body_is_not_an_item() {
        // "1. " trims to "1." which no longer has the trailing gap.
        let note = segment_note("1. ");
        assert_eq!(note.item_count, 0);
        assert_eq!(contents(&note), vec!["1."]);
    }

    #[test]
    fn test_html_paragraph_items() {
        let note = segment_note("<p>1. first</p><p>2. second</p>");
        assert_eq!(note.item_count, 2);
        assert_eq!(note.segments[0].content, "<p>");
        assert!(!note.segments[0].is_item);
        assert_eq!(note.segments[1].content, "first</p><p>");
        assert_eq!(note.segments[2].content, "second</p>");
    }

    #[test]
    fn test_empty_note() {
        let note = segment_note("");
        assert!(note.segments.is_empty());
        assert_eq!(note.item_count, 0);
    }

    #[test]
    fn test_items_iterator_positions() {
        let note = segment_note("Intro 1. a 2. b");
        let positions: Vec<usize> = note.items().map(|(i, _)| i).collect();
        assert_eq!(positions, vec![0, 1]);
        assert_eq!(note.intro().count(), 1);
    }

    #[test]
    fn test_find_marker_offsets() {
        let marker = find_marker("see 3.  x", 0).unwrap();
        assert_eq!(marker.start, 4);
        assert_eq!(marker.label_end, 6);
        assert_eq!(marker.end, 8);
        assert!(find_marker("no markers", 0).is_none());
        assert!(find_marker("abc", 10).is_none());
    }

    #[test]
    fn test_marker_positions() {
        assert_eq!(marker_positions("1. a 2. b"), vec![0, 5]);
        assert!(marker_positions("plain").is_empty());
    }

    #[test]
    fn test_reconcile_extends_with_false() {
        assert_eq!(
            reconcile_item_dones(&[true, false], 3),
            vec![true, false, false]
        );
    }

    #[test]
    fn test_reconcile_truncates() {
        assert_eq!(reconcile_item_dones(&[true, true, true], 1), vec![true]);
        assert!(reconcile_item_dones(&[true], 0).is_empty());
    }

    #[test]
    fn test_toggle_within_range() {
        assert_eq!(toggle_item_done(&[false, false], 1), vec![false, true]);
        assert_eq!(toggle_item_done(&[true], 0), vec![false]);
    }

    #[test]
    fn test_toggle_grows_sequence() {
        assert_eq!(
            toggle_item_done(&[true], 4),
            vec![true, false, false, false, true]
        );
        assert_eq!(toggle_item_done(&[], 0), vec![true]);
    }

    #[test]
    fn test_item_count() {
        assert_eq!(item_count("1. a\n2. b"), 2);
        assert_eq!(item_count("nothing numbered"), 0);
    }
}
