//! Request types for the TIL query processor.

use super::{DateFilter, EntryKind, normalize_categories};
use crate::{Error, Result};

/// Default number of cards returned by `til find`.
pub const DEFAULT_FIND_LIMIT: usize = 5;

/// A request to record one or more TILs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AddRequest {
    /// Positional value: factoid text or a URL.
    pub value: Option<String>,
    /// Annotation (`-m`). Becomes the value when nothing else is given.
    pub message: Option<String>,
    /// Links (`-u`), each recorded as its own URL entry.
    pub urls: Vec<String>,
    /// Categories (`-c`).
    pub categories: Vec<String>,
}

/// One value to be matched against the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    /// Trimmed value.
    pub value: String,
    /// Kind of the value.
    pub kind: EntryKind,
    /// Annotation carried along.
    pub message: Option<String>,
    /// Normalized categories.
    pub categories: Vec<String>,
}

impl AddRequest {
    /// Creates a request for a single value.
    #[must_use]
    pub fn value(value: impl Into<String>) -> Self {
        Self {
            value: Some(value.into()),
            ..Self::default()
        }
    }

    /// Sets the annotation.
    #[must_use]
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// Adds a link.
    #[must_use]
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.urls.push(url.into());
        self
    }

    /// Adds a category.
    #[must_use]
    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.categories.push(category.into());
        self
    }

    /// Expands the request into the candidates to match.
    ///
    /// Every `-u` link is a URL candidate annotated with the message.
    /// Without links, the positional value (or else the message) is the
    /// single candidate and its kind is inferred.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidQuery`] if there is no value, message, or link.
    pub fn candidates(&self) -> Result<Vec<Candidate>> {
        let categories = normalize_categories(&self.categories);
        let message = non_empty(self.message.as_deref());

        let urls: Vec<&str> = self
            .urls
            .iter()
            .map(|u| u.trim())
            .filter(|u| !u.is_empty())
            .collect();

        if !urls.is_empty() {
            let mut candidates: Vec<Candidate> = urls
                .into_iter()
                .map(|url| Candidate {
                    value: url.to_string(),
                    kind: EntryKind::Url,
                    message: message.clone(),
                    categories: categories.clone(),
                })
                .collect();
            if let Some(value) = non_empty(self.value.as_deref()) {
                candidates.insert(
                    0,
                    Candidate {
                        kind: EntryKind::classify(&value),
                        value,
                        message: None,
                        categories: categories.clone(),
                    },
                );
            }
            return Ok(candidates);
        }

        if let Some(value) = non_empty(self.value.as_deref()) {
            return Ok(vec![Candidate {
                kind: EntryKind::classify(&value),
                value,
                message,
                categories,
            }]);
        }

        if let Some(value) = message {
            return Ok(vec![Candidate {
                kind: EntryKind::classify(&value),
                value,
                message: None,
                categories,
            }]);
        }

        Err(Error::InvalidQuery(
            "you need to provide a value, a message, or at least one URL for a TIL entry"
                .to_string(),
        ))
    }
}

/// A request to search recorded TILs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FindRequest {
    /// Case-insensitive substrings of value, title, or message.
    pub keywords: Vec<String>,
    /// Categories to intersect with.
    pub categories: Vec<String>,
    /// Hosts (or parent domains) of URL entries.
    pub domains: Vec<String>,
    /// Optional restriction on `added_on`.
    pub date: Option<DateFilter>,
    /// Maximum number of cards to return.
    pub limit: usize,
}

impl Default for FindRequest {
    fn default() -> Self {
        Self {
            keywords: Vec::new(),
            categories: Vec::new(),
            domains: Vec::new(),
            date: None,
            limit: DEFAULT_FIND_LIMIT,
        }
    }
}

impl FindRequest {
    /// Creates a keyword search.
    #[must_use]
    pub fn keywords<I, S>(keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            keywords: keywords.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    /// Adds a category filter.
    #[must_use]
    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.categories.push(category.into());
        self
    }

    /// Adds a domain filter.
    #[must_use]
    pub fn with_domain(mut self, domain: impl Into<String>) -> Self {
        self.domains.push(domain.into());
        self
    }

    /// Sets the date filter.
    #[must_use]
    pub const fn with_date(mut self, date: DateFilter) -> Self {
        self.date = Some(date);
        self
    }

    /// Sets the result limit.
    #[must_use]
    pub const fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    /// Keywords, categories, and domains with blanks and stray commas removed.
    #[must_use]
    pub fn normalized(&self) -> Self {
        let clean = |items: &[String]| -> Vec<String> {
            items
                .iter()
                .map(|s| s.trim().trim_matches(',').trim().to_string())
                .filter(|s| !s.is_empty())
                .collect()
        };
        Self {
            keywords: clean(&self.keywords),
            categories: clean(&self.categories),
            domains: clean(&self.domains),
            date: self.date,
            limit: self.limit,
        }
    }

    /// Checks that the request can select anything.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidQuery`] if there are no keywords, categories,
    /// or domains, or if the limit is zero.
    pub fn validate(&self) -> Result<()> {
        if self.keywords.is_empty() && self.categories.is_empty() && self.domains.is_empty() {
            return Err(Error::InvalidQuery(
                "cannot find anything without a keyword, a category, or a domain".to_string(),
            ));
        }
        if self.limit == 0 {
            return Err(Error::InvalidQuery("the limit must be at least 1".to_string()));
        }
        Ok(())
    }
}

/// A parsed `til` subcommand.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TilQuery {
    /// `til add`.
    Add(AddRequest),
    /// `til find`.
    Find(FindRequest),
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(ToString::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_candidates_from_value() {
        let request = AddRequest::value("example.com/path").with_category("web,");
        let candidates = request.candidates().unwrap();
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].kind, EntryKind::Url);
        assert_eq!(candidates[0].categories, vec!["web"]);
    }

    #[test]
    fn test_candidates_from_urls_carry_message() {
        let request = AddRequest::default()
            .with_message("Useful links")
            .with_url("https://a.example")
            .with_url("https://b.example");
        let candidates = request.candidates().unwrap();
        assert_eq!(candidates.len(), 2);
        assert!(candidates.iter().all(|c| c.kind == EntryKind::Url));
        assert!(
            candidates
                .iter()
                .all(|c| c.message.as_deref() == Some("Useful links"))
        );
    }

    #[test]
    fn test_candidates_from_message_only() {
        let request = AddRequest::default().with_message("Ferris is a crab");
        let candidates = request.candidates().unwrap();
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].value, "Ferris is a crab");
        assert_eq!(candidates[0].kind, EntryKind::Factoid);
        assert!(candidates[0].message.is_none());
    }

    #[test]
    fn test_candidates_require_something() {
        let err = AddRequest::default()
            .with_message("   ")
            .with_category("web")
            .candidates()
            .unwrap_err();
        assert!(matches!(err, Error::InvalidQuery(_)));
    }

    #[test]
    fn test_find_validate() {
        assert!(FindRequest::default().validate().is_err());
        assert!(FindRequest::keywords(["rust"]).validate().is_ok());
        assert!(FindRequest::default().with_domain("docs.rs").validate().is_ok());
        assert!(
            FindRequest::keywords(["rust"])
                .with_limit(0)
                .validate()
                .is_err()
        );
        assert!(
            FindRequest::keywords([" ", ","])
                .normalized()
                .validate()
                .is_err()
        );
    }
}
