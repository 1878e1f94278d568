//! Rendering of segmented notes.
//!
//! Notes are rendered two ways: as an HTML fragment for rich viewers and as
//! plain text for the terminal. Both walk the segments produced by
//! [`crate::segment::segment_note`] and pair each item with its completion
//! flag by position.
//!
//! Markup cleanup applied while rendering:
//!
//! - **Form controls**: `<input>`, `<select>` and `<button>` elements inside
//!   item content are replaced by a `<span class="form-value">` holding the
//!   control's value, so controls pasted from other pages cannot break the
//!   item layout.
//! - **Dangling open tags**: splitting inside block markup leaves segments
//!   like `first</p><p>`; the trailing `<p>` is dropped so the next segment
//!   is not nested inside it.
//! - **Formatting noise**: an intro segment that is a single tag (`<br>`,
//!   `<p></p>`) is not rendered.

use std::fmt::Write as _;
use std::sync::OnceLock;

use regex::{Captures, Regex};

use crate::record::{is_note_html, FeedbackRecord};
use crate::segment::{segment_note, NoteSegment};

const TAG_NAME: &str = "[A-Za-z][A-Za-z0-9]*";

fn compiled(cell: &'static OnceLock<Regex>, pattern: impl FnOnce() -> String) -> &'static Regex {
    cell.get_or_init(|| Regex::new(&pattern()).expect("Invalid regex pattern"))
}

fn select_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    compiled(&RE, || r"(?is)<select\b[^>]*>(.*?)</select\s*>".to_string())
}

fn option_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    compiled(&RE, || r"(?is)<option\b([^>]*)>(.*?)(?:</option\s*>|$)".to_string())
}

fn button_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    compiled(&RE, || r"(?is)<button\b[^>]*>(.*?)</button\s*>".to_string())
}

fn input_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    compiled(&RE, || r"(?is)<input\b([^>]*)>".to_string())
}

fn attr_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    compiled(&RE, || {
        r#"(?i)\b([a-z-]+)(?:\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s"'>/]+)))?"#.to_string()
    })
}

fn dangling_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    compiled(&RE, || {
        format!(r"(?s)</(?P<close>{TAG_NAME})\s*>\s*(?P<open><(?P<name>{TAG_NAME})\b[^>]*>)\s*$")
    })
}

fn single_tag_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    compiled(&RE, || {
        format!(r"(?s)^<(?P<name>{TAG_NAME})\b[^>]*>(?:\s*</(?P<close>{TAG_NAME})\s*>)?$")
    })
}

fn line_break_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    compiled(&RE, || {
        r"(?i)<br\s*/?>|</(?:p|div|li|h[1-6]|tr|blockquote)\s*>".to_string()
    })
}

fn any_tag_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    compiled(&RE, || r"(?s)<[^>]*>".to_string())
}

/// Escape text for inclusion in HTML.
#[must_use]
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Decode the handful of entities rich-text editors produce.
#[must_use]
pub fn decode_entities(text: &str) -> String {
    text.replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&#x27;", "'")
        .replace("&amp;", "&")
}

/// Strip markup, turning line breaks and block ends into newlines.
#[must_use]
pub fn strip_tags(html: &str) -> String {
    let with_breaks = line_break_re().replace_all(html, "\n");
    let text = decode_entities(&any_tag_re().replace_all(&with_breaks, ""));
    let lines: Vec<&str> = text
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect();
    lines.join("\n")
}

/// Replace form controls with text placeholders holding their values.
#[must_use]
pub fn sanitize_form_controls(html: &str) -> String {
    let html = select_re().replace_all(html, |caps: &Captures| {
        form_value(&selected_option_label(&caps[1]))
    });
    let html = button_re().replace_all(&html, |caps: &Captures| {
        form_value(&strip_tags(&caps[1]))
    });
    let html = input_re().replace_all(&html, |caps: &Captures| {
        form_value(&input_value(&caps[1]))
    });
    html.into_owned()
}

/// Drop a trailing opening tag that directly follows its own closing tag.
#[must_use]
pub fn strip_dangling_open_tag(html: &str) -> &str {
    let Some(caps) = dangling_re().captures(html) else {
        return html;
    };
    if !caps["close"].eq_ignore_ascii_case(&caps["name"]) {
        return html;
    }
    match caps.name("open") {
        Some(open) => html[..open.start()].trim_end(),
        None => html,
    }
}

/// Whether a segment is a single bare tag such as `<br>` or `<p></p>`.
#[must_use]
pub fn is_formatting_noise(segment: &str) -> bool {
    let Some(caps) = single_tag_re().captures(segment.trim()) else {
        return false;
    };
    caps.name("close")
        .map_or(true, |close| close.as_str().eq_ignore_ascii_case(&caps["name"]))
}

/// Render a note as an HTML fragment with togglable item markers.
#[must_use]
pub fn render_note_html(note: &str, item_dones: &[bool]) -> String {
    let html = is_note_html(note);
    let segmented = segment_note(note);
    let mut out = String::new();

    for segment in segmented.intro() {
        if html && is_formatting_noise(&segment.content) {
            continue;
        }
        let body = segment_html(segment, html, false);
        let _ = write!(out, r#"<div class="note-intro">{body}</div>"#);
    }

    if segmented.item_count > 0 {
        out.push_str(r#"<ol class="note-items">"#);
        for (index, segment) in segmented.items() {
            let done = item_dones.get(index).copied().unwrap_or(false);
            let label = segment
                .label
                .clone()
                .unwrap_or_else(|| format!("{}.", index + 1));
            let _ = write!(
                out,
                concat!(
                    r#"<li class="note-item{done_class}" data-index="{index}">"#,
                    r#"<span class="item-toggle" role="checkbox" aria-checked="{done}" data-index="{index}">{mark}</span>"#,
                    r#"<span class="item-label">{label}</span>"#,
                    r#"<span class="item-content">{body}</span></li>"#,
                ),
                index = index,
                done = done,
                done_class = if done { " done" } else { "" },
                mark = if done { "&#9745;" } else { "&#9744;" },
                label = escape_html(&label),
                body = segment_html(segment, html, true),
            );
        }
        out.push_str("</ol>");
    }

    out
}

/// Render a note as terminal text, one `[x] N. item` line per item.
#[must_use]
pub fn render_note_text(note: &str, item_dones: &[bool]) -> String {
    let html = is_note_html(note);
    let segmented = segment_note(note);
    let mut lines = Vec::new();

    for segment in segmented.intro() {
        let text = segment_text(segment, html, false);
        if !text.is_empty() {
            lines.push(text);
        }
    }

    for (index, segment) in segmented.items() {
        let done = item_dones.get(index).copied().unwrap_or(false);
        let label = segment
            .label
            .clone()
            .unwrap_or_else(|| format!("{}.", index + 1));
        let text = segment_text(segment, html, true).replace('\n', " ");
        lines.push(format!("[{}] {label} {text}", if done { "x" } else { " " }));
    }

    lines.join("\n")
}

/// Render a whole record for preview: note followed by its images.
#[must_use]
pub fn render_preview_html(record: &FeedbackRecord, item_dones: &[bool]) -> String {
    if !record.has_content() {
        return "<p>(no content)</p>".to_string();
    }

    let mut out = String::new();
    if !record.note.is_empty() {
        let class = if record.is_html() {
            "preview-note preview-note-html"
        } else {
            "preview-note"
        };
        let _ = write!(
            out,
            r#"<div class="{class}">{}</div>"#,
            render_note_html(&record.note, item_dones)
        );
    }
    if !record.images.is_empty() {
        out.push_str(r#"<div class="preview-images">"#);
        for (i, src) in record.images.iter().enumerate() {
            let _ = write!(
                out,
                r#"<img src="{}" alt="feedback image {}" />"#,
                escape_html(src),
                i + 1
            );
        }
        out.push_str("</div>");
    }
    out
}

fn segment_html(segment: &NoteSegment, html: bool, item: bool) -> String {
    if !html {
        return escape_html(&segment.content);
    }
    let cleaned = strip_dangling_open_tag(&segment.content);
    if item {
        sanitize_form_controls(cleaned)
    } else {
        cleaned.to_string()
    }
}

fn segment_text(segment: &NoteSegment, html: bool, item: bool) -> String {
    if !html {
        return segment.content.clone();
    }
    strip_tags(&segment_html(segment, true, item))
}

fn form_value(text: &str) -> String {
    format!(r#"<span class="form-value">{}</span>"#, escape_html(text.trim()))
}

fn selected_option_label(options_html: &str) -> String {
    let mut first = None;
    for caps in option_re().captures_iter(options_html) {
        let label = strip_tags(&caps[2]);
        if attribute(&caps[1], "selected").is_some() {
            return label;
        }
        first.get_or_insert(label);
    }
    first.unwrap_or_default()
}

fn input_value(attrs: &str) -> String {
    let kind = attribute(attrs, "type").unwrap_or_default();
    if kind.eq_ignore_ascii_case("checkbox") || kind.eq_ignore_ascii_case("radio") {
        let mark = if attribute(attrs, "checked").is_some() {
            "\u{2611}"
        } else {
            "\u{2610}"
        };
        return mark.to_string();
    }
    decode_entities(&attribute(attrs, "value").unwrap_or_default())
}

/// Value of an attribute; `Some("")` for a bare boolean attribute.
fn attribute(attrs: &str, name: &str) -> Option<String> {
    attr_re()
        .captures_iter(attrs)
        .find(|caps| caps[1].eq_ignore_ascii_case(name))
        .map(|caps| {
            caps.get(2)
                .or_else(|| caps.get(3))
                .or_else(|| caps.get(4))
                .map(|m| m.as_str().to_string())
                .unwrap_or_default()
        })
}
