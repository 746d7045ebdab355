//! PII detection and masking
//!
//! Combines a pattern-based detector with an optional entity detector,
//! merges overlapping spans, and masks each match with a kind-specific
//! placeholder.

mod detector;
mod patterns;
mod redactor;

pub use detector::{merge_overlapping, EntityDetector, PIIKind, PIIMatch, PatternDetector};
pub use redactor::{PIIRedactor, RedactionOutcome};
