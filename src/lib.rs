//! # Sarathi
//!
//! A personal bot for steering through the battlefield of knowledge.
//!
//! Sarathi records short "Today I Learned" (TIL) notes, deduplicates them
//! against what was learned before, and republishes a rendered TIL page for
//! a companion blog kept in a git work tree.
//!
//! ## Layers
//!
//! - [`storage`]: the JSON entry store
//! - [`services`]: matching, the query processor, and page publication
//! - [`git`], [`fetch`], [`rendering`]: the collaborators behind publication
//!   and title lookup, each behind a trait so the core runs without network
//!   or repository
//! - [`commands`]: the chat-style front end (`til add`, `til find`, `fortune`)
//!
//! ## Example
//!
//! ```rust,ignore
//! use sarathi::{AddRequest, SarathiConfig, TilService};
//!
//! let config = SarathiConfig::load(None)?;
//! let service = TilService::from_config(&config);
//! let request = AddRequest::value("https://example.com").with_category("web");
//! println!("{}", service.add(&request)?.into_reply());
//! ```

#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![warn(missing_docs)]
#![forbid(unsafe_code)]
#![allow(clippy::multiple_crate_versions)]

use thiserror::Error as ThisError;

pub mod commands;
pub mod config;
pub mod fetch;
pub mod git;
pub mod models;
pub mod observability;
pub mod rendering;
pub mod services;
pub mod storage;

pub use config::SarathiConfig;
pub use models::{
    AddRequest, Card, DateFilter, EntryKind, FindRequest, Reply, TilEntry, TilQuery,
};
pub use services::{FortuneService, PagePublisher, TilService};
pub use storage::{EntryStore, JsonFileStore};

/// Error type for sarathi operations.
///
/// # Error Variant Triggers
///
/// | Variant | Raised When |
/// |---------|-------------|
/// | `InvalidQuery` | Missing or contradictory command arguments |
/// | `Storage` | Store unreadable, not valid JSON, or outside the blog root |
/// | `Publish` | Page rendering, commit, pull, or push failed |
/// | `Config` | Required paths missing or outside the blog root |
/// | `External` | A helper program (fortune) failed to run |
/// | `Internal` | A command reached processing that the front end should have rejected |
#[derive(Debug, ThisError)]
pub enum Error {
    /// The user supplied insufficient or contradictory arguments.
    ///
    /// Recovered by the front end and shown as a friendly message.
    #[error("invalid query: {0}")]
    InvalidQuery(String),

    /// The entry store could not be read or written.
    #[error("storage operation '{operation}' failed: {cause}")]
    Storage {
        /// The operation that failed.
        operation: String,
        /// The underlying cause.
        cause: String,
    },

    /// Publishing a changed file failed.
    ///
    /// The local mutation that preceded it is still applied.
    #[error("publish operation '{operation}' failed: {cause}")]
    Publish {
        /// The operation that failed.
        operation: String,
        /// The underlying cause.
        cause: String,
    },

    /// The configuration is unusable. Aborts startup.
    #[error("configuration error: {0}")]
    Config(String),

    /// An external helper program failed.
    #[error("external command '{operation}' failed: {cause}")]
    External {
        /// The command that failed.
        operation: String,
        /// The underlying cause.
        cause: String,
    },

    /// A defect: state the front end should have made unreachable.
    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Builds a [`Error::Storage`] from an operation name and any displayable cause.
    pub fn storage(operation: &str, cause: impl std::fmt::Display) -> Self {
        Self::Storage {
            operation: operation.to_string(),
            cause: cause.to_string(),
        }
    }

    /// Builds a [`Error::Publish`] from an operation name and any displayable cause.
    pub fn publish(operation: &str, cause: impl std::fmt::Display) -> Self {
        Self::Publish {
            operation: operation.to_string(),
            cause: cause.to_string(),
        }
    }
}

/// Result type alias for sarathi operations.
pub type Result<T> = std::result::Result<T, Error>;
