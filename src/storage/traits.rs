//! Entry store trait.

use crate::Result;
use crate::git::PublishReport;
use crate::models::TilEntry;

/// Persistence boundary for the TIL collection.
pub trait EntryStore: Send + Sync {
    /// Loads every entry in stored order.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Storage`] if the store is missing, unreadable,
    /// or not a valid entry document.
    fn load(&self) -> Result<Vec<TilEntry>>;

    /// Overwrites the store with `entries` and publishes it.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Storage`] if the store cannot be written, or
    /// [`crate::Error::Publish`] if publishing fails after the write.
    fn save(&self, entries: &[TilEntry]) -> Result<PublishReport>;
}
