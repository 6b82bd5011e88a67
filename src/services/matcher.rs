//! Deduplication of new TILs against recorded ones.

use crate::models::{Candidate, EntryKind, TilEntry};
use chrono::NaiveDate;

/// What matching a candidate did to the collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatchOutcome {
    /// Matched an entry created today; nothing changed.
    JustLearned {
        /// Position of the matched entry.
        index: usize,
    },
    /// Matched an older entry; today was recorded as a repeat.
    Repeated {
        /// Position of the matched entry.
        index: usize,
        /// When the entry was first recorded.
        added_on: NaiveDate,
    },
    /// Matched a URL entry annotated with a different message; nothing changed.
    Conflict {
        /// Position of the matched entry.
        index: usize,
        /// When the entry was first recorded.
        added_on: NaiveDate,
        /// The message already on the entry.
        existing_message: String,
    },
    /// No match. The entry is not yet part of the collection.
    New(TilEntry),
}

impl MatchOutcome {
    /// Label used in metrics and logs.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::JustLearned { .. } => "just_learned",
            Self::Repeated { .. } => "repeated",
            Self::Conflict { .. } => "conflict",
            Self::New(_) => "new",
        }
    }
}

/// Returns the position of the first entry equivalent to `kind` and `value`.
#[must_use]
pub fn find_equivalent(entries: &[TilEntry], kind: EntryKind, value: &str) -> Option<usize> {
    entries
        .iter()
        .position(|entry| entry.is_equivalent(kind, value))
}

/// Matches `candidate` against `entries`, merging into a match when one exists.
///
/// A repeat appends `today` to `repeated_added_on` (at most once), unions
/// the candidate's categories, and adopts its message if the entry has
/// none. A new entry is returned unattached so the caller can complete it.
pub fn apply(entries: &mut [TilEntry], candidate: &Candidate, today: NaiveDate) -> MatchOutcome {
    let Some(index) = find_equivalent(entries, candidate.kind, &candidate.value) else {
        let mut entry = TilEntry::new(candidate.value.clone(), &candidate.categories, today);
        entry.kind = candidate.kind;
        entry.message.clone_from(&candidate.message);
        return MatchOutcome::New(entry);
    };

    let entry = &mut entries[index];

    if let Some(existing_message) = conflicting_message(entry, candidate) {
        return MatchOutcome::Conflict {
            index,
            added_on: entry.added_on,
            existing_message,
        };
    }

    if entry.added_on == today {
        return MatchOutcome::JustLearned { index };
    }

    entry.record_repeat(today);
    entry.merge_categories(&candidate.categories);
    if entry.message.is_none() {
        entry.message.clone_from(&candidate.message);
    }

    MatchOutcome::Repeated {
        index,
        added_on: entry.added_on,
    }
}

fn conflicting_message(entry: &TilEntry, candidate: &Candidate) -> Option<String> {
    if candidate.kind != EntryKind::Url {
        return None;
    }
    let new = candidate.message.as_deref()?;
    let existing = entry.message.as_deref()?;
    (existing.trim().to_lowercase() != new.trim().to_lowercase()).then(|| existing.to_string())
}

/// Sorts entries by `added_on`, newest first, keeping the order of equal dates.
pub fn sort_entries(entries: &mut [TilEntry]) {
    entries.sort_by(|a, b| b.added_on.cmp(&a.added_on));
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn candidate(value: &str) -> Candidate {
        Candidate {
            value: value.to_string(),
            kind: EntryKind::classify(value),
            message: None,
            categories: Vec::new(),
        }
    }

    #[test]
    fn test_new_entry() {
        let mut entries = Vec::new();
        let mut c = candidate("https://example.com");
        c.categories = vec!["web".to_string()];
        let outcome = apply(&mut entries, &c, date("2023-01-01"));
        let MatchOutcome::New(entry) = outcome else {
            panic!("expected a new entry");
        };
        assert_eq!(entry.kind, EntryKind::Url);
        assert_eq!(entry.added_on, date("2023-01-01"));
        assert_eq!(entry.categories, vec!["web"]);
        assert!(entry.repeated_added_on.is_empty());
    }

    #[test]
    fn test_forced_kind_is_kept() {
        let c = Candidate {
            kind: EntryKind::Url,
            ..candidate("localhost")
        };
        let MatchOutcome::New(entry) = apply(&mut [], &c, date("2023-01-01")) else {
            panic!("expected a new entry");
        };
        assert_eq!(entry.kind, EntryKind::Url);
    }

    #[test]
    fn test_same_day_is_just_learned() {
        let mut entries = vec![TilEntry::new("foo", ["a"], date("2023-01-01"))];
        let mut c = candidate("FOO");
        c.categories = vec!["b".to_string()];
        let outcome = apply(&mut entries, &c, date("2023-01-01"));
        assert_eq!(outcome, MatchOutcome::JustLearned { index: 0 });
        assert!(entries[0].repeated_added_on.is_empty());
        assert_eq!(entries[0].categories, vec!["a"]);
    }

    #[test]
    fn test_repeat_appends_once_and_merges() {
        let mut entries = vec![TilEntry::new("foo", ["a"], date("2023-01-01"))];
        let mut c = candidate("foo");
        c.categories = vec!["b".to_string()];
        c.message = Some("again".to_string());

        let outcome = apply(&mut entries, &c, date("2023-01-02"));
        assert_eq!(
            outcome,
            MatchOutcome::Repeated {
                index: 0,
                added_on: date("2023-01-01")
            }
        );
        apply(&mut entries, &c, date("2023-01-02"));

        assert_eq!(entries[0].repeated_added_on, vec![date("2023-01-02")]);
        assert_eq!(entries[0].categories, vec!["a", "b"]);
        assert_eq!(entries[0].message.as_deref(), Some("again"));
        assert_eq!(entries[0].added_on, date("2023-01-01"));
    }

    #[test]
    fn test_kinds_do_not_match_each_other() {
        let entries = vec![TilEntry::new("example.com", Vec::<String>::new(), date("2023-01-01"))];
        assert_eq!(find_equivalent(&entries, EntryKind::Url, "example.com"), Some(0));
        assert_eq!(find_equivalent(&entries, EntryKind::Factoid, "example.com"), None);
    }

    #[test]
    fn test_first_equivalent_wins() {
        let entries = vec![
            TilEntry::new("foo", Vec::<String>::new(), date("2023-01-02")),
            TilEntry::new("Foo", Vec::<String>::new(), date("2023-01-01")),
        ];
        assert_eq!(find_equivalent(&entries, EntryKind::Factoid, "foo"), Some(0));
    }

    #[test]
    fn test_conflicting_url_message() {
        let mut entries = vec![
            TilEntry::new("https://example.com", Vec::<String>::new(), date("2023-01-01"))
                .with_message("Reserved domains"),
        ];
        let mut c = candidate("https://example.com");
        c.message = Some("Something else".to_string());

        let outcome = apply(&mut entries, &c, date("2023-02-01"));
        assert_eq!(
            outcome,
            MatchOutcome::Conflict {
                index: 0,
                added_on: date("2023-01-01"),
                existing_message: "Reserved domains".to_string(),
            }
        );
        assert!(entries[0].repeated_added_on.is_empty());

        c.message = Some("reserved DOMAINS".to_string());
        assert!(matches!(
            apply(&mut entries, &c, date("2023-02-01")),
            MatchOutcome::Repeated { .. }
        ));
    }

    #[test]
    fn test_sort_entries_is_stable_descending() {
        let mut entries = vec![
            TilEntry::new("a", Vec::<String>::new(), date("2023-01-01")),
            TilEntry::new("b", Vec::<String>::new(), date("2023-01-03")),
            TilEntry::new("c", Vec::<String>::new(), date("2023-01-01")),
        ];
        sort_entries(&mut entries);
        let values: Vec<&str> = entries.iter().map(|e| e.value.as_str()).collect();
        assert_eq!(values, vec!["b", "a", "c"]);
    }
}
