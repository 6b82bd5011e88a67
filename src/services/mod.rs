//! Business logic services.
//!
//! Services orchestrate the store, the title fetcher, and the publishers.

mod fortune;
pub mod matcher;
mod page;
mod til;

pub use fortune::{FortuneService, validate_args as validate_fortune_args};
pub use matcher::MatchOutcome;
pub use page::{PagePublisher, group_by_date};
pub use til::{JUST_LEARNED, NO_RESULTS, Outcome, TilService};
