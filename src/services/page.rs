//! Rendered TIL page.

use crate::config::{SarathiConfig, is_within_root};
use crate::git::{PublishReport, Publisher};
use crate::models::TilEntry;
use crate::rendering::{RenderContext, TemplateRenderer};
use crate::storage::write_atomic;
use crate::{Error, Result};
use chrono::NaiveDate;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::instrument;

/// Renders the entry list into the blog's TIL page and publishes it.
///
/// The template sees:
///
/// | Name | Value |
/// |------|-------|
/// | `dates` | one item per day, newest first, each with `date` and `entries` |
/// | `entry.value`, `entry.type`, `entry.label` | the entry and its `"<type> <value>"` label |
/// | `entry.title` | the title, or the label when there is none |
/// | `entry.message`, `entry.url` | empty when absent |
/// | `entry.categories` | comma-separated |
/// | `generated_on`, `total` | render date and number of entries |
pub struct PagePublisher {
    template_path: PathBuf,
    page_path: PathBuf,
    blog_root: PathBuf,
    publisher: Arc<dyn Publisher>,
    renderer: TemplateRenderer,
}

impl PagePublisher {
    /// Creates a page publisher.
    #[must_use]
    pub fn new(
        template_path: impl Into<PathBuf>,
        page_path: impl Into<PathBuf>,
        blog_root: impl Into<PathBuf>,
        publisher: Arc<dyn Publisher>,
    ) -> Self {
        Self {
            template_path: template_path.into(),
            page_path: page_path.into(),
            blog_root: blog_root.into(),
            publisher,
            renderer: TemplateRenderer::new(),
        }
    }

    /// Creates a page publisher from configuration.
    #[must_use]
    pub fn from_config(config: &SarathiConfig, publisher: Arc<dyn Publisher>) -> Self {
        Self::new(
            &config.template_path,
            &config.page_path,
            &config.blog_path,
            publisher,
        )
    }

    /// Returns the page path.
    #[must_use]
    pub fn page_path(&self) -> &Path {
        &self.page_path
    }

    /// Renders and publishes the page as of today.
    ///
    /// # Errors
    ///
    /// See [`Self::publish_as_of`].
    pub fn publish(&self, entries: &[TilEntry]) -> Result<PublishReport> {
        self.publish_as_of(entries, chrono::Local::now().date_naive())
    }

    /// Renders and publishes the page, stamping it with `today`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the page lies outside the blog root, and
    /// [`Error::Publish`] if the template cannot be read or rendered, the
    /// page cannot be written, or publishing fails.
    #[instrument(skip(self, entries), fields(operation = "page.publish", count = entries.len()))]
    pub fn publish_as_of(&self, entries: &[TilEntry], today: NaiveDate) -> Result<PublishReport> {
        if !is_within_root(&self.blog_root, &self.page_path) {
            return Err(Error::Config(format!(
                "the TIL page {} needs to be in the blog folder {}",
                self.page_path.display(),
                self.blog_root.display()
            )));
        }

        let content = self.render(entries, today)?;
        write_atomic(&self.page_path, &content).map_err(|e| {
            Error::publish("write_page", format!("{}: {e}", self.page_path.display()))
        })?;
        tracing::debug!(path = %self.page_path.display(), "Wrote page");

        self.publisher.publish(&self.page_path, &content)
    }

    /// Renders the page without writing it.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Publish`] if the template cannot be read or rendered.
    pub fn render(&self, entries: &[TilEntry], today: NaiveDate) -> Result<String> {
        let template = fs::read_to_string(&self.template_path).map_err(|e| {
            Error::publish("read_template", format!("{}: {e}", self.template_path.display()))
        })?;
        self.renderer.render(&template, &page_context(entries, today))
    }
}

/// Groups entries by day, newest day first, each day sorted by title.
#[must_use]
pub fn group_by_date(entries: &[TilEntry]) -> Vec<(NaiveDate, Vec<&TilEntry>)> {
    let mut groups: BTreeMap<NaiveDate, Vec<&TilEntry>> = BTreeMap::new();
    for entry in entries {
        groups.entry(entry.added_on).or_default().push(entry);
    }

    groups
        .into_iter()
        .rev()
        .map(|(date, mut day)| {
            day.sort_by_cached_key(|entry| entry.title_or_label());
            (date, day)
        })
        .collect()
}

fn page_context(entries: &[TilEntry], today: NaiveDate) -> RenderContext {
    let dates = group_by_date(entries)
        .into_iter()
        .map(|(date, day)| {
            RenderContext::new()
                .with_string("date", date.to_string())
                .with_list("entries", day.into_iter().map(entry_context).collect())
        })
        .collect();

    RenderContext::new()
        .with_list("dates", dates)
        .with_string("generated_on", today.to_string())
        .with_string("total", entries.len().to_string())
}

fn entry_context(entry: &TilEntry) -> RenderContext {
    RenderContext::new()
        .with_string("value", entry.value.clone())
        .with_string("type", entry.kind.as_str())
        .with_string("title", entry.title_or_label())
        .with_string("label", entry.label())
        .with_string("message", entry.message.clone().unwrap_or_default())
        .with_string("categories", entry.categories.join(", "))
        .with_string(
            "url",
            entry.url().map(|url| url.to_string()).unwrap_or_default(),
        )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::git::NoopPublisher;
    use tempfile::TempDir;

    const TEMPLATE: &str = "\
# Today I Learned

{{#each dates}}
## {{date.date}}
{{#each date.entries}}
- {{entry.title}}{{#if entry.url}} <{{entry.url}}>{{/if}}
{{/each}}
{{/each}}
_{{total}} entries, generated {{generated_on}}_
";

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn publisher_in(dir: &TempDir) -> PagePublisher {
        let template = dir.path().join("til.md.tmpl");
        fs::write(&template, TEMPLATE).unwrap();
        PagePublisher::new(
            template,
            dir.path().join("pages").join("til.md"),
            dir.path(),
            Arc::new(NoopPublisher),
        )
    }

    fn sample() -> Vec<TilEntry> {
        vec![
            TilEntry::new("zebras are striped", Vec::<String>::new(), date("2023-01-02")),
            TilEntry::new("https://example.com", Vec::<String>::new(), date("2023-01-02"))
                .with_title("Example Domain"),
            TilEntry::new("ants are strong", Vec::<String>::new(), date("2023-01-01")),
        ]
    }

    #[test]
    fn test_group_by_date() {
        let entries = sample();
        let groups = group_by_date(&entries);
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].0, date("2023-01-02"));
        let titles: Vec<String> = groups[0].1.iter().map(|e| e.title_or_label()).collect();
        assert_eq!(titles, vec!["Example Domain", "factoid zebras are striped"]);
        assert_eq!(groups[1].0, date("2023-01-01"));
    }

    #[test]
    fn test_publish_writes_page() {
        let dir = TempDir::new().unwrap();
        let page = publisher_in(&dir);
        page.publish_as_of(&sample(), date("2023-01-03")).unwrap();

        let written = fs::read_to_string(page.page_path()).unwrap();
        assert_eq!(
            written,
            "\
# Today I Learned

## 2023-01-02
- Example Domain <https://example.com/>
- factoid zebras are striped
## 2023-01-01
- factoid ants are strong
_3 entries, generated 2023-01-03_
"
        );
    }

    #[test]
    fn test_page_outside_root_is_config_error() {
        let dir = TempDir::new().unwrap();
        let other = TempDir::new().unwrap();
        let template = dir.path().join("til.md.tmpl");
        fs::write(&template, TEMPLATE).unwrap();
        let page = PagePublisher::new(
            template,
            other.path().join("til.md"),
            dir.path(),
            Arc::new(NoopPublisher),
        );
        let err = page.publish_as_of(&sample(), date("2023-01-03")).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_missing_template_is_publish_error() {
        let dir = TempDir::new().unwrap();
        let page = PagePublisher::new(
            dir.path().join("missing.tmpl"),
            dir.path().join("til.md"),
            dir.path(),
            Arc::new(NoopPublisher),
        );
        let err = page.publish_as_of(&sample(), date("2023-01-03")).unwrap_err();
        assert!(matches!(err, Error::Publish { ref operation, .. } if operation == "read_template"));
        assert!(!dir.path().join("til.md").exists());
    }
}
