//! TIL query processor.
//!
//! Handles `til add` and `til find` against the entry store, and keeps
//! the published page in step with it.

use super::matcher::{self, MatchOutcome};
use super::page::PagePublisher;
use crate::config::SarathiConfig;
use crate::fetch::{HttpTitleFetcher, TitleFetcher};
use crate::git::{GitPublisher, NoopPublisher, Publisher};
use crate::models::{
    AddRequest, Card, Candidate, EntryKind, FindRequest, Reply, TilEntry, TilQuery,
};
use crate::storage::{EntryStore, JsonFileStore};
use crate::{Error, Result};
use chrono::NaiveDate;
use std::sync::Arc;
use tracing::instrument;

/// Reply when a value was first recorded today.
pub const JUST_LEARNED: &str = "Try learning something else today. You *just* learnt this thing.";

/// Reply when a search finds nothing.
pub const NO_RESULTS: &str = "Sorry, I couldn't find any relevant TILs.";

/// The result of a processed command.
///
/// A failed publish does not undo the local change, so it travels next to
/// the reply instead of replacing it.
#[derive(Debug)]
pub struct Outcome {
    /// What to tell the user.
    pub reply: Reply,
    /// The first publishing failure, if any.
    pub publish_error: Option<Error>,
}

impl Outcome {
    /// The reply, followed by a warning if publishing failed.
    #[must_use]
    pub fn into_reply(self) -> Reply {
        let mut reply = self.reply;
        if let Some(err) = self.publish_error {
            reply.push_text(format!(
                "The change is saved locally, but publishing it failed: {err}"
            ));
        }
        reply
    }
}

impl From<Reply> for Outcome {
    fn from(reply: Reply) -> Self {
        Self {
            reply,
            publish_error: None,
        }
    }
}

/// Service for recording and searching TILs.
pub struct TilService {
    store: Arc<dyn EntryStore>,
    fetcher: Arc<dyn TitleFetcher>,
    publisher: Arc<dyn Publisher>,
    page: Option<PagePublisher>,
    testing: bool,
}

impl TilService {
    /// Creates a service over `store` that looks titles up with `fetcher`.
    #[must_use]
    pub fn new(store: Arc<dyn EntryStore>, fetcher: Arc<dyn TitleFetcher>) -> Self {
        Self {
            store,
            fetcher,
            publisher: Arc::new(NoopPublisher),
            page: None,
            testing: false,
        }
    }

    /// Brings the work tree up to date through `publisher` before every
    /// change is read.
    #[must_use]
    pub fn with_publisher(mut self, publisher: Arc<dyn Publisher>) -> Self {
        self.publisher = publisher;
        self
    }

    /// Regenerates `page` after every change.
    #[must_use]
    pub fn with_page(mut self, page: PagePublisher) -> Self {
        self.page = Some(page);
        self
    }

    /// In testing mode nothing is persisted or published.
    #[must_use]
    pub const fn with_testing(mut self, testing: bool) -> Self {
        self.testing = testing;
        self
    }

    /// Wires the JSON store, HTTP title fetcher, git publisher, and page
    /// from configuration.
    #[must_use]
    pub fn from_config(config: &SarathiConfig) -> Self {
        let publisher: Arc<dyn Publisher> = if config.testing {
            Arc::new(NoopPublisher)
        } else {
            Arc::new(GitPublisher::new(&config.blog_path, &config.git))
        };
        let store = Arc::new(JsonFileStore::new(
            &config.til_json_path,
            &config.blog_path,
            Arc::clone(&publisher),
        ));
        let fetcher = Arc::new(HttpTitleFetcher::new(config.fetch_timeout));
        let page = PagePublisher::from_config(config, Arc::clone(&publisher));

        Self::new(store, fetcher)
            .with_publisher(publisher)
            .with_page(page)
            .with_testing(config.testing)
    }

    /// Processes a parsed `til` command.
    ///
    /// # Errors
    ///
    /// See [`Self::add`] and [`Self::find`].
    pub fn process(&self, query: TilQuery) -> Result<Outcome> {
        self.process_as_of(query, today())
    }

    /// Processes a parsed `til` command as of `today`.
    ///
    /// # Errors
    ///
    /// See [`Self::add_as_of`] and [`Self::find_as_of`].
    pub fn process_as_of(&self, query: TilQuery, today: NaiveDate) -> Result<Outcome> {
        match query {
            TilQuery::Add(request) => self.add_as_of(&request, today),
            TilQuery::Find(request) => self.find_as_of(&request, today).map(Outcome::from),
        }
    }

    /// Records the TILs in `request` as learned today.
    ///
    /// # Errors
    ///
    /// See [`Self::add_as_of`].
    pub fn add(&self, request: &AddRequest) -> Result<Outcome> {
        self.add_as_of(request, today())
    }

    /// Records the TILs in `request` as learned on `today`.
    ///
    /// The work tree is synced first. Every candidate is then matched
    /// against the store; the collection is sorted newest first, saved, and
    /// the page regenerated, even when nothing changed.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidQuery`] if the request has nothing to add,
    /// [`Error::Publish`] if the sync fails (nothing is changed then), and
    /// [`Error::Storage`] if the store cannot be read or written. Failures
    /// after the save are returned in [`Outcome::publish_error`].
    #[instrument(skip(self, request), fields(operation = "til.add"))]
    pub fn add_as_of(&self, request: &AddRequest, today: NaiveDate) -> Result<Outcome> {
        let candidates = request.candidates()?;
        self.publisher.sync()?;
        let mut entries = self.store.load()?;
        let mut reply = Reply::default();

        for candidate in &candidates {
            let outcome = matcher::apply(&mut entries, candidate, today);
            metrics::counter!("til_add_total", "outcome" => outcome.as_str()).increment(1);
            tracing::info!(
                value = %candidate.value,
                kind = %candidate.kind,
                outcome = outcome.as_str(),
                "Matched TIL"
            );
            reply.push_text(self.apply_outcome(&mut entries, candidate, outcome));
        }

        matcher::sort_entries(&mut entries);

        if self.testing {
            tracing::debug!("Testing mode, not persisting");
            return Ok(reply.into());
        }

        let publish_error = self.persist(&entries)?;
        Ok(Outcome {
            reply,
            publish_error,
        })
    }

    fn apply_outcome(
        &self,
        entries: &mut Vec<TilEntry>,
        candidate: &Candidate,
        outcome: MatchOutcome,
    ) -> String {
        match outcome {
            MatchOutcome::JustLearned { .. } => JUST_LEARNED.to_string(),
            MatchOutcome::Repeated { added_on, .. } => format!(
                "This TIL was already recorded on {added_on}. \
                 Adding today's date to the `repeated_added_on` column."
            ),
            MatchOutcome::Conflict {
                added_on,
                existing_message,
                ..
            } => format!(
                "{} was already recorded on {added_on} with a different message: \
                 `{existing_message}`. Nothing was changed.",
                candidate.value
            ),
            MatchOutcome::New(mut entry) => {
                let text = match entry.kind {
                    EntryKind::Factoid => "TIL factoid added.".to_string(),
                    EntryKind::Url => match self.fetcher.fetch_title(&entry.value) {
                        Some(title) => {
                            let text = format!("TIL url added. Page Title: `{title}`");
                            entry.title = Some(title);
                            text
                        },
                        None => {
                            entry.title = Some(entry.value.clone());
                            format!(
                                "TIL url added. URL: {}. Unable to retrieve page title.",
                                entry.value
                            )
                        },
                    },
                };
                entries.push(entry);
                text
            },
        }
    }

    /// Searches recorded TILs.
    ///
    /// # Errors
    ///
    /// See [`Self::find_as_of`].
    pub fn find(&self, request: &FindRequest) -> Result<Reply> {
        self.find_as_of(request, today())
    }

    /// Searches recorded TILs, evaluating date filters relative to `today`.
    ///
    /// An entry is relevant if a category matches, a keyword occurs in its
    /// value, title, or message, or its host is on a requested domain. The
    /// date filter then narrows the result and the limit caps the cards.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidQuery`] if the request has no criteria or a
    /// zero limit, and [`Error::Storage`] if the store cannot be read.
    #[instrument(skip(self, request), fields(operation = "til.find"))]
    pub fn find_as_of(&self, request: &FindRequest, today: NaiveDate) -> Result<Reply> {
        let request = request.normalized();
        if let Err(err) = request.validate() {
            metrics::counter!("til_find_total", "status" => "invalid").increment(1);
            return Err(err);
        }

        let entries = self.store.load()?;
        let matches: Vec<&TilEntry> = entries
            .iter()
            .filter(|entry| is_relevant(entry, &request))
            .filter(|entry| {
                request
                    .date
                    .is_none_or(|filter| filter.accepts(entry.added_on, today))
            })
            .collect();

        tracing::info!(matches = matches.len(), "Searched TILs");

        if matches.is_empty() {
            metrics::counter!("til_find_total", "status" => "empty").increment(1);
            return Ok(Reply::text(NO_RESULTS));
        }
        metrics::counter!("til_find_total", "status" => "found").increment(1);

        let mut reply = Reply::default();
        if matches.len() > 1 {
            let mut summary = format!("Found {} matching TILs.", matches.len());
            if matches.len() > request.limit {
                summary.push_str(&format!(" Showing the first {}.", request.limit));
            }
            reply.push_text(summary);
        }
        for entry in matches.into_iter().take(request.limit) {
            reply.push_card(Card::from_entry(entry));
        }
        Ok(reply)
    }

    /// Looks up titles for URL entries that lack one.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Publish`] if the work tree cannot be synced and
    /// [`Error::Storage`] if the store cannot be read or written.
    #[instrument(skip(self), fields(operation = "til.fix_titles"))]
    pub fn fix_titles(&self) -> Result<Outcome> {
        self.publisher.sync()?;
        let mut entries = self.store.load()?;
        let mut missing = 0usize;
        let mut fixed = 0usize;

        for entry in entries.iter_mut().filter(|entry| entry.needs_title()) {
            missing += 1;
            if let Some(title) = self.fetcher.fetch_title(&entry.value) {
                tracing::info!(value = %entry.value, title, "Fixed title");
                entry.title = Some(title);
                fixed += 1;
            }
        }

        let reply = Reply::text(format!("Fixed {fixed} of {missing} missing page titles."));
        if fixed == 0 || self.testing {
            return Ok(reply.into());
        }

        let publish_error = self.persist(&entries)?;
        Ok(Outcome {
            reply,
            publish_error,
        })
    }

    /// Regenerates and publishes the page from the current store.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if no page is configured,
    /// [`Error::Publish`] if the work tree cannot be synced, and
    /// [`Error::Storage`] if the store cannot be read.
    #[instrument(skip(self), fields(operation = "til.render_page"))]
    pub fn render_page(&self) -> Result<Outcome> {
        let page = self
            .page
            .as_ref()
            .ok_or_else(|| Error::Config("no TIL page is configured".to_string()))?;
        self.publisher.sync()?;
        let entries = self.store.load()?;

        if self.testing {
            return Ok(Reply::text("Testing mode: the TIL page was not regenerated.").into());
        }

        let reply = Reply::text(format!(
            "TIL page regenerated with {} entries.",
            entries.len()
        ));
        let publish_error = match page.publish(&entries) {
            Ok(_) => None,
            Err(err @ Error::Publish { .. }) => Some(err),
            Err(err) => return Err(err),
        };
        Ok(Outcome {
            reply,
            publish_error,
        })
    }

    /// Saves the store and the page, collecting the first publish failure.
    fn persist(&self, entries: &[TilEntry]) -> Result<Option<Error>> {
        let mut publish_error = None;

        match self.store.save(entries) {
            Ok(report) => tracing::debug!(?report, "Saved store"),
            Err(err @ Error::Publish { .. }) => {
                tracing::warn!(error = %err, "Publishing the store failed");
                publish_error = Some(err);
            },
            Err(err) => return Err(err),
        }

        if let Some(page) = &self.page {
            match page.publish(entries) {
                Ok(report) => tracing::debug!(?report, "Published page"),
                Err(err @ Error::Publish { .. }) => {
                    tracing::warn!(error = %err, "Publishing the page failed");
                    publish_error.get_or_insert(err);
                },
                Err(err) => return Err(err),
            }
        }

        Ok(publish_error)
    }
}

fn is_relevant(entry: &TilEntry, request: &FindRequest) -> bool {
    let category_match = request.categories.iter().any(|wanted| {
        entry
            .categories
            .iter()
            .any(|have| have.eq_ignore_ascii_case(wanted))
    });

    category_match
        || request.keywords.iter().any(|keyword| entry.mentions(keyword))
        || request.domains.iter().any(|domain| entry.is_on_domain(domain))
}

fn today() -> NaiveDate {
    chrono::Local::now().date_naive()
}
