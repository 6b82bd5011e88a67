//! JSON document store.
//!
//! # Format
//!
//! A pretty-printed array (4-space indent, trailing newline) of entries
//! with keys `value`, `type`, `title`, `message`, `categories`,
//! `added_on`, `repeated_added_on`.
//!
//! Records written by the older message-and-links layout are converted on
//! load and written back in the current layout.

use super::EntryStore;
use super::write_atomic;
use crate::config::is_within_root;
use crate::git::{PublishReport, Publisher};
use crate::models::{EntryKind, TilEntry, normalize_categories};
use crate::{Error, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::instrument;

/// Maximum size of the store document (16 MiB).
pub const MAX_STORE_SIZE: u64 = 16 * 1024 * 1024;

/// A record as found on disk.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum StoredRecord {
    Unified(TilEntry),
    Legacy(LegacyRecord),
}

/// Message-and-links record.
#[derive(Debug, Deserialize)]
struct LegacyRecord {
    message: String,
    #[serde(default)]
    links: Vec<LegacyLink>,
    #[serde(default)]
    categories: Vec<String>,
    added_on: NaiveDate,
    #[serde(default)]
    repeated_added_on: Vec<NaiveDate>,
}

#[derive(Debug, Deserialize)]
struct LegacyLink {
    url: String,
    #[serde(default)]
    title: Option<String>,
}

impl LegacyRecord {
    /// One URL entry per link, or a factoid when there are none.
    fn into_entries(self) -> Vec<TilEntry> {
        let categories = normalize_categories(&self.categories);
        let message = Some(self.message.trim().to_string()).filter(|m| !m.is_empty());

        if self.links.is_empty() {
            return vec![TilEntry {
                value: self.message.trim().to_string(),
                kind: EntryKind::Factoid,
                title: None,
                message: None,
                categories,
                added_on: self.added_on,
                repeated_added_on: self.repeated_added_on,
            }];
        }

        self.links
            .into_iter()
            .map(|link| TilEntry {
                value: link.url.trim().to_string(),
                kind: EntryKind::Url,
                title: link.title.filter(|t| !t.trim().is_empty()),
                message: message.clone(),
                categories: categories.clone(),
                added_on: self.added_on,
                repeated_added_on: self.repeated_added_on.clone(),
            })
            .collect()
    }
}

/// Serializes entries in the store's on-disk layout.
///
/// # Errors
///
/// Returns [`Error::Storage`] if serialization fails.
pub fn to_json(entries: &[TilEntry]) -> Result<String> {
    let mut buffer = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut serializer = serde_json::Serializer::with_formatter(&mut buffer, formatter);
    entries
        .serialize(&mut serializer)
        .map_err(|e| Error::storage("serialize_store", e))?;
    let mut json = String::from_utf8(buffer).map_err(|e| Error::storage("serialize_store", e))?;
    json.push('\n');
    Ok(json)
}

fn from_json(content: &str) -> Result<Vec<TilEntry>> {
    let records: Vec<StoredRecord> =
        serde_json::from_str(content).map_err(|e| Error::storage("parse_store", e))?;

    let mut entries: Vec<TilEntry> = Vec::with_capacity(records.len());
    let mut converted = 0usize;
    for record in records {
        match record {
            StoredRecord::Unified(entry) => entries.push(entry),
            StoredRecord::Legacy(legacy) => {
                converted += 1;
                for entry in legacy.into_entries() {
                    if entries
                        .iter()
                        .any(|e| e.is_equivalent(entry.kind, &entry.value))
                    {
                        tracing::warn!(value = %entry.value, "Dropping duplicate legacy link");
                        continue;
                    }
                    entries.push(entry);
                }
            },
        }
    }

    if converted > 0 {
        tracing::info!(converted, "Converted legacy records");
    }
    Ok(entries)
}

/// JSON file store inside the blog's work tree.
pub struct JsonFileStore {
    path: PathBuf,
    blog_root: PathBuf,
    publisher: Arc<dyn Publisher>,
}

impl JsonFileStore {
    /// Creates a store at `path`, which must lie under `blog_root`.
    #[must_use]
    pub fn new(
        path: impl Into<PathBuf>,
        blog_root: impl Into<PathBuf>,
        publisher: Arc<dyn Publisher>,
    ) -> Self {
        Self {
            path: path.into(),
            blog_root: blog_root.into(),
            publisher,
        }
    }

    /// Returns the store path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn check_path(&self, operation: &str) -> Result<()> {
        if is_within_root(&self.blog_root, &self.path) {
            Ok(())
        } else {
            Err(Error::storage(
                operation,
                format!(
                    "{} is outside the blog folder {}",
                    self.path.display(),
                    self.blog_root.display()
                ),
            ))
        }
    }
}

impl EntryStore for JsonFileStore {
    #[instrument(skip(self), fields(operation = "store.load", path = %self.path.display()))]
    fn load(&self) -> Result<Vec<TilEntry>> {
        self.check_path("read_store")?;

        let metadata = fs::metadata(&self.path).map_err(|e| {
            Error::storage("read_store", format!("{}: {e}", self.path.display()))
        })?;
        if metadata.len() > MAX_STORE_SIZE {
            return Err(Error::storage(
                "read_store",
                format!(
                    "{} is {} bytes, more than the {MAX_STORE_SIZE} byte limit",
                    self.path.display(),
                    metadata.len()
                ),
            ));
        }

        let content = fs::read_to_string(&self.path).map_err(|e| {
            Error::storage("read_store", format!("{}: {e}", self.path.display()))
        })?;
        let entries = from_json(&content)?;
        tracing::debug!(count = entries.len(), "Loaded entries");
        Ok(entries)
    }

    #[instrument(skip(self, entries), fields(operation = "store.save", count = entries.len()))]
    fn save(&self, entries: &[TilEntry]) -> Result<PublishReport> {
        self.check_path("write_store")?;

        let content = to_json(entries)?;
        write_atomic(&self.path, &content).map_err(|e| {
            Error::storage("write_store", format!("{}: {e}", self.path.display()))
        })?;
        tracing::debug!(path = %self.path.display(), "Wrote store");

        self.publisher.publish(&self.path, &content)
    }
}
