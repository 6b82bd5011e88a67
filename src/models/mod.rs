//! Data models for sarathi.
//!
//! Entries, the requests that create and search them, and the replies sent
//! back to the chat.

mod date_filter;
mod entry;
mod query;
mod reply;

pub use date_filter::{DateDirection, DateFilter, DateUnit};
pub use entry::{EntryKind, TilEntry, normalize_categories, parse_url};
pub use query::{AddRequest, Candidate, DEFAULT_FIND_LIMIT, FindRequest, TilQuery};
pub use reply::{Card, NO_PAGE_TITLE, Reply, ReplyItem};
