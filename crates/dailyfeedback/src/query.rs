//! Filtering and ordering of feedback lists.

use std::cmp::Ordering;
use std::collections::BTreeSet;

use crate::record::FeedbackRecord;

/// Date and member filter for feedback lists.
///
/// `None` or an empty string matches everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeedbackFilter {
    /// Exact calendar day to keep.
    pub date: Option<String>,
    /// Exact member name to keep (compared after trimming).
    pub member: Option<String>,
}

impl FeedbackFilter {
    /// A filter that keeps everything.
    #[must_use]
    pub fn all() -> Self {
        Self::default()
    }

    /// Restrict to one day.
    #[must_use]
    pub fn with_date(mut self, date: impl Into<String>) -> Self {
        self.date = Some(date.into());
        self
    }

    /// Restrict to one member.
    #[must_use]
    pub fn with_member(mut self, member: impl Into<String>) -> Self {
        self.member = Some(member.into());
        self
    }

    /// The active date, if any.
    #[must_use]
    pub fn date(&self) -> Option<&str> {
        self.date.as_deref().filter(|d| !d.is_empty())
    }

    /// The active member, if any.
    #[must_use]
    pub fn member(&self) -> Option<&str> {
        self.member
            .as_deref()
            .map(str::trim)
            .filter(|m| !m.is_empty())
    }

    /// Check whether a record passes the filter.
    #[must_use]
    pub fn matches(&self, record: &FeedbackRecord) -> bool {
        self.date().map_or(true, |d| record.date == d)
            && self.member().map_or(true, |m| record.member == m)
    }

    /// Keep matching records and order them newest first.
    #[must_use]
    pub fn apply(&self, records: &[FeedbackRecord]) -> Vec<FeedbackRecord> {
        let mut filtered: Vec<FeedbackRecord> =
            records.iter().filter(|r| self.matches(r)).cloned().collect();
        sort_newest_first(&mut filtered);
        filtered
    }
}

/// Order by date descending, then creation time descending.
pub fn sort_newest_first(records: &mut [FeedbackRecord]) {
    records.sort_by(compare_newest_first);
}

fn compare_newest_first(a: &FeedbackRecord, b: &FeedbackRecord) -> Ordering {
    b.date
        .cmp(&a.date)
        .then_with(|| b.created_at.cmp(&a.created_at))
}

/// Distinct non-empty member names, sorted.
#[must_use]
pub fn unique_members(records: &[FeedbackRecord]) -> Vec<String> {
    records
        .iter()
        .filter(|r| !r.member.is_empty())
        .map(|r| r.member.clone())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}
