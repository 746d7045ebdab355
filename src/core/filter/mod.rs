//! Content filtering
//!
//! Ordered block/sanitize rule evaluation over an immutable rule snapshot.

mod engine;
mod types;

pub use engine::{ContentFilterEngine, FilterSnapshot};
pub use types::{FilterAction, FilterOutcome, FilterRule};
