//! TIL entry type and classification.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use url::Url;

/// The shape of a TIL entry's value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    /// A link to a page.
    Url,
    /// A plain statement of fact.
    Factoid,
}

impl EntryKind {
    /// Classifies a raw value.
    ///
    /// A value is a URL if it starts with `http://` or `https://`, or if it
    /// contains a `.`, does not end with one, and has no whitespace.
    /// Everything else is a factoid.
    #[must_use]
    pub fn classify(value: &str) -> Self {
        let value = value.trim();
        let has_scheme = value.starts_with("http://") || value.starts_with("https://");
        let looks_like_host = !value.ends_with('.')
            && value.contains('.')
            && !value.chars().any(char::is_whitespace);

        if has_scheme || looks_like_host {
            Self::Url
        } else {
            Self::Factoid
        }
    }

    /// Returns the kind as it appears in the store.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Url => "url",
            Self::Factoid => "factoid",
        }
    }
}

impl fmt::Display for EntryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One recorded fact or link.
///
/// Field order is the key order of the persisted JSON document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TilEntry {
    /// Factoid text or URL. Identity key, never changed.
    pub value: String,
    /// Derived from `value` at creation.
    #[serde(rename = "type")]
    pub kind: EntryKind,
    /// Page title for URL entries.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Free-text annotation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Sorted, unique tags.
    #[serde(default)]
    pub categories: Vec<String>,
    /// Creation date.
    pub added_on: NaiveDate,
    /// Later dates on which the same value was added again.
    #[serde(default)]
    pub repeated_added_on: Vec<NaiveDate>,
}

impl TilEntry {
    /// Creates an entry first learned on `today`.
    ///
    /// The kind is inferred from the value and categories are normalized.
    #[must_use]
    pub fn new<I, S>(value: impl Into<String>, categories: I, today: NaiveDate) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let value = value.into().trim().to_string();
        Self {
            kind: EntryKind::classify(&value),
            value,
            title: None,
            message: None,
            categories: normalize_categories(categories),
            added_on: today,
            repeated_added_on: Vec::new(),
        }
    }

    /// Sets the annotation.
    #[must_use]
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// Sets the title.
    #[must_use]
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Returns true if this entry stands for the same value.
    ///
    /// Values match case-insensitively, and only within the same kind.
    #[must_use]
    pub fn is_equivalent(&self, kind: EntryKind, value: &str) -> bool {
        self.kind == kind && self.value.trim().to_lowercase() == value.trim().to_lowercase()
    }

    /// Records a repeat on `date`.
    ///
    /// Returns false if the date was already recorded or is the creation date.
    pub fn record_repeat(&mut self, date: NaiveDate) -> bool {
        if date == self.added_on || self.repeated_added_on.contains(&date) {
            return false;
        }
        self.repeated_added_on.push(date);
        true
    }

    /// Unions new categories into the entry, keeping them sorted.
    ///
    /// Returns true if any category was added.
    pub fn merge_categories<I, S>(&mut self, categories: I) -> bool
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let before = self.categories.len();
        let merged = normalize_categories(
            self.categories
                .iter()
                .map(String::as_str)
                .chain(normalize_categories(categories).iter().map(String::as_str)),
        );
        self.categories = merged;
        self.categories.len() != before
    }

    /// Fallback display label, `"<type> <value>"`.
    #[must_use]
    pub fn label(&self) -> String {
        format!("{} {}", self.kind, self.value)
    }

    /// The title if set, otherwise the label.
    #[must_use]
    pub fn title_or_label(&self) -> String {
        self.title.clone().unwrap_or_else(|| self.label())
    }

    /// Returns true if a URL entry still needs a real page title.
    #[must_use]
    pub fn needs_title(&self) -> bool {
        self.kind == EntryKind::Url
            && self
                .title
                .as_deref()
                .is_none_or(|title| title.trim().is_empty() || title == self.value)
    }

    /// Parses the value as a URL, assuming `https` when no scheme is given.
    #[must_use]
    pub fn url(&self) -> Option<Url> {
        if self.kind != EntryKind::Url {
            return None;
        }
        parse_url(&self.value)
    }

    /// Host of the entry's URL, lowercased.
    #[must_use]
    pub fn host(&self) -> Option<String> {
        self.url()
            .and_then(|url| url.host_str().map(str::to_lowercase))
    }

    /// Returns true if `keyword` occurs in the value, title, or message.
    ///
    /// Comparison is a case-insensitive substring match.
    #[must_use]
    pub fn mentions(&self, keyword: &str) -> bool {
        let keyword = keyword.to_lowercase();
        if keyword.is_empty() {
            return false;
        }
        [Some(&self.value), self.title.as_ref(), self.message.as_ref()]
            .into_iter()
            .flatten()
            .any(|text| text.to_lowercase().contains(&keyword))
    }

    /// Returns true if the entry's host is `domain` or one of its subdomains.
    #[must_use]
    pub fn is_on_domain(&self, domain: &str) -> bool {
        let domain = domain.trim().trim_start_matches("www.").to_lowercase();
        if domain.is_empty() {
            return false;
        }
        self.host().is_some_and(|host| {
            let host = host.trim_start_matches("www.");
            host == domain || host.ends_with(&format!(".{domain}"))
        })
    }
}

/// Parses a URL-ish value, assuming `https` when no scheme is given.
#[must_use]
pub fn parse_url(value: &str) -> Option<Url> {
    let value = value.trim();
    Url::parse(value)
        .ok()
        .filter(|url| url.has_host())
        .or_else(|| Url::parse(&format!("https://{value}")).ok())
}

/// Trims categories, strips surrounding commas, drops empties, sorts, dedups.
#[must_use]
pub fn normalize_categories<I, S>(categories: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    categories
        .into_iter()
        .map(|c| c.as_ref().trim().trim_matches(',').trim().to_string())
        .filter(|c| !c.is_empty())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test_case("https://example.com", EntryKind::Url ; "https scheme")]
    #[test_case("http://localhost:5000", EntryKind::Url ; "http scheme")]
    #[test_case("example.com/path", EntryKind::Url ; "bare host with path")]
    #[test_case("I learned that recursion is fun", EntryKind::Factoid ; "sentence")]
    #[test_case("Rust is fun.", EntryKind::Factoid ; "sentence with full stop")]
    #[test_case("version2.0 is out", EntryKind::Factoid ; "dot with whitespace")]
    #[test_case("ends.with.dot.", EntryKind::Factoid ; "trailing dot")]
    #[test_case("nodots", EntryKind::Factoid ; "single word")]
    fn test_classify(value: &str, expected: EntryKind) {
        assert_eq!(EntryKind::classify(value), expected);
    }

    #[test]
    fn test_new_entry_normalizes() {
        let entry = TilEntry::new(
            "  https://example.com ",
            ["web,", "rust", "web", " ", ",async"],
            date("2023-01-01"),
        );
        assert_eq!(entry.value, "https://example.com");
        assert_eq!(entry.kind, EntryKind::Url);
        assert_eq!(entry.categories, vec!["async", "rust", "web"]);
        assert!(entry.repeated_added_on.is_empty());
    }

    #[test]
    fn test_is_equivalent_case_insensitive_same_kind_only() {
        let entry = TilEntry::new("https://Example.com/A", Vec::<String>::new(), date("2023-01-01"));
        assert!(entry.is_equivalent(EntryKind::Url, "https://example.com/a"));
        assert!(!entry.is_equivalent(EntryKind::Factoid, "https://example.com/a"));
        assert!(!entry.is_equivalent(EntryKind::Url, "https://example.com/b"));
    }

    #[test]
    fn test_record_repeat_skips_creation_date_and_duplicates() {
        let mut entry = TilEntry::new("foo", Vec::<String>::new(), date("2023-01-01"));
        assert!(!entry.record_repeat(date("2023-01-01")));
        assert!(entry.record_repeat(date("2023-01-02")));
        assert!(!entry.record_repeat(date("2023-01-02")));
        assert_eq!(entry.repeated_added_on, vec![date("2023-01-02")]);
    }

    #[test]
    fn test_merge_categories() {
        let mut entry = TilEntry::new("foo", ["b"], date("2023-01-01"));
        assert!(entry.merge_categories(["a", "b"]));
        assert_eq!(entry.categories, vec!["a", "b"]);
        assert!(!entry.merge_categories(["a"]));
    }

    #[test]
    fn test_title_or_label() {
        let entry = TilEntry::new("foo", Vec::<String>::new(), date("2023-01-01"));
        assert_eq!(entry.title_or_label(), "factoid foo");
        let entry = entry.with_title("Foo");
        assert_eq!(entry.title_or_label(), "Foo");
    }

    #[test]
    fn test_host_and_domain() {
        let entry = TilEntry::new("docs.rs/serde", Vec::<String>::new(), date("2023-01-01"));
        assert_eq!(entry.host().as_deref(), Some("docs.rs"));
        assert!(entry.is_on_domain("docs.rs"));
        assert!(!entry.is_on_domain("rs"));

        let entry = TilEntry::new(
            "https://www.blog.example.com/post",
            Vec::<String>::new(),
            date("2023-01-01"),
        );
        assert!(entry.is_on_domain("example.com"));
        assert!(entry.is_on_domain("www.blog.example.com"));
        assert!(!entry.is_on_domain("ample.com"));

        let factoid = TilEntry::new("no url here", Vec::<String>::new(), date("2023-01-01"));
        assert!(factoid.host().is_none());
        assert!(!factoid.is_on_domain("here"));
    }

    #[test]
    fn test_mentions() {
        let entry = TilEntry::new("https://example.com", Vec::<String>::new(), date("2023-01-01"))
            .with_title("Example Domain")
            .with_message("IANA reserved");
        assert!(entry.mentions("EXAMPLE"));
        assert!(entry.mentions("domain"));
        assert!(entry.mentions("iana"));
        assert!(!entry.mentions("rust"));
        assert!(!entry.mentions(""));
    }

    #[test]
    fn test_needs_title() {
        let entry = TilEntry::new("https://example.com", Vec::<String>::new(), date("2023-01-01"));
        assert!(entry.needs_title());
        let raw = entry.clone().with_title("https://example.com");
        assert!(raw.needs_title());
        let titled = entry.with_title("Example Domain");
        assert!(!titled.needs_title());
        let factoid = TilEntry::new("foo", Vec::<String>::new(), date("2023-01-01"));
        assert!(!factoid.needs_title());
    }
}
