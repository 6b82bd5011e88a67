//! Publishing changed files.
//!
//! A [`Publisher`] is synced before the store is read, and the store and
//! the rendered page are handed to it after every write. [`GitPublisher`]
//! fast-forwards the blog's work tree, then commits and pushes;
//! [`NoopPublisher`] does nothing.

mod publisher;
mod remote;

pub use publisher::GitPublisher;
pub use remote::{Credentials, RemoteManager};

use crate::Result;
use std::path::{Path, PathBuf};

/// Outcome of publishing one file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PublishReport {
    /// Path of the file, relative to the work tree when known.
    pub path: PathBuf,
    /// Whether a commit was created.
    pub committed: bool,
    /// Id of the new commit.
    pub commit: Option<String>,
    /// Whether the branch was pushed.
    pub pushed: bool,
}

impl PublishReport {
    /// A report for a file that was not published.
    #[must_use]
    pub fn skipped(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            ..Self::default()
        }
    }
}

/// Publishes a changed file.
pub trait Publisher: Send + Sync {
    /// Brings the local copy up to date before anything is read or written.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Publish`] if the local copy cannot be updated.
    fn sync(&self) -> Result<()> {
        Ok(())
    }

    /// Publishes `path`, which has just been written with `content`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Publish`] if the file cannot be published.
    fn publish(&self, path: &Path, content: &str) -> Result<PublishReport>;
}

/// A publisher that does nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopPublisher;

impl Publisher for NoopPublisher {
    fn publish(&self, path: &Path, _content: &str) -> Result<PublishReport> {
        tracing::debug!(path = %path.display(), "Publishing disabled");
        Ok(PublishReport::skipped(path))
    }
}
