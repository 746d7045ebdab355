//! PII detectors
//!
//! The pattern detector is always available and infallible. The entity
//! detector seam covers model-based recognition (for example a remote NER
//! service); it is optional and allowed to fail independently of redaction.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::utils::error::Result;

use super::patterns::{
    CREDIT_CARD_PATTERN, EMAIL_PATTERN, IP_ADDRESS_PATTERN, PHONE_PATTERN, SSN_PATTERN,
};

/// Kind of personally identifying information
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PIIKind {
    Email,
    Phone,
    Ssn,
    CreditCard,
    IpAddress,
    /// Person name, from the entity detector
    Person,
    /// Organization name, from the entity detector
    Organization,
    /// Geographic location, from the entity detector
    Location,
}

impl PIIKind {
    /// Placeholder inserted in place of a detected span
    ///
    /// Placeholders contain no digits or address characters so they can
    /// never be re-detected as PII, which keeps redaction idempotent.
    pub fn placeholder(&self) -> &'static str {
        match self {
            PIIKind::Email => "[EMAIL]",
            PIIKind::Phone => "[PHONE]",
            PIIKind::Ssn => "[SSN]",
            PIIKind::CreditCard => "[CARD]",
            PIIKind::IpAddress => "[IP]",
            PIIKind::Person => "[NAME]",
            PIIKind::Organization => "[ORG]",
            PIIKind::Location => "[LOCATION]",
        }
    }

    /// All known placeholder tokens
    pub fn placeholders() -> &'static [&'static str] {
        &[
            "[EMAIL]",
            "[PHONE]",
            "[SSN]",
            "[CARD]",
            "[IP]",
            "[NAME]",
            "[ORG]",
            "[LOCATION]",
        ]
    }
}

/// A detected PII span, byte-indexed into the input text
///
/// Used only transiently during redaction and never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PIIMatch {
    pub start: usize,
    pub end: usize,
    pub kind: PIIKind,
}

impl PIIMatch {
    /// Span width in bytes
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    /// Whether the span is empty
    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }
}

/// Regex-based PII detector
#[derive(Debug, Clone, Copy, Default)]
pub struct PatternDetector;

impl PatternDetector {
    /// Find all pattern matches in `text`
    pub fn detect(&self, text: &str) -> Vec<PIIMatch> {
        let mut matches = Vec::new();

        let sources = [
            (&*EMAIL_PATTERN, PIIKind::Email),
            (&*PHONE_PATTERN, PIIKind::Phone),
            (&*SSN_PATTERN, PIIKind::Ssn),
            (&*CREDIT_CARD_PATTERN, PIIKind::CreditCard),
            (&*IP_ADDRESS_PATTERN, PIIKind::IpAddress),
        ];

        for (pattern, kind) in sources {
            for m in pattern.find_iter(text) {
                matches.push(PIIMatch {
                    start: m.start(),
                    end: m.end(),
                    kind,
                });
            }
        }

        matches
    }
}

/// Model-based entity detection seam
///
/// Implementations may call out to an NER model or service. Errors degrade
/// redaction to pattern-only rather than failing the request.
#[async_trait]
pub trait EntityDetector: Send + Sync {
    async fn detect(&self, text: &str) -> Result<Vec<PIIMatch>>;
}

/// Merge overlapping spans into the widest covering span
///
/// Guarantees no character range is masked twice and no sub-span survives
/// inside a larger detected one. On overlap the kind of the wider original
/// span wins.
pub fn merge_overlapping(mut matches: Vec<PIIMatch>) -> Vec<PIIMatch> {
    if matches.is_empty() {
        return matches;
    }

    matches.sort_by_key(|m| (m.start, std::cmp::Reverse(m.end)));

    let mut merged: Vec<PIIMatch> = Vec::with_capacity(matches.len());
    let mut dominant_len = 0usize;

    for m in matches {
        match merged.last_mut() {
            Some(last) if m.start < last.end => {
                if m.len() > dominant_len {
                    last.kind = m.kind;
                    dominant_len = m.len();
                }
                last.end = last.end.max(m.end);
            }
            _ => {
                dominant_len = m.len();
                merged.push(m);
            }
        }
    }

    merged
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pattern_detector_finds_kinds() {
        let detector = PatternDetector;
        let text = "mail alice@example.com or call 555-123-4567";
        let matches = detector.detect(text);

        assert!(matches.iter().any(|m| m.kind == PIIKind::Email));
        assert!(matches.iter().any(|m| m.kind == PIIKind::Phone));
        for m in &matches {
            assert!(text.is_char_boundary(m.start));
            assert!(text.is_char_boundary(m.end));
        }
    }

    #[test]
    fn test_merge_disjoint_spans_unchanged() {
        let matches = vec![
            PIIMatch { start: 0, end: 5, kind: PIIKind::Email },
            PIIMatch { start: 10, end: 15, kind: PIIKind::Phone },
        ];
        assert_eq!(merge_overlapping(matches.clone()), matches);
    }

    #[test]
    fn test_merge_overlap_takes_widest_cover() {
        let matches = vec![
            PIIMatch { start: 4, end: 10, kind: PIIKind::Ssn },
            PIIMatch { start: 0, end: 16, kind: PIIKind::CreditCard },
        ];
        let merged = merge_overlapping(matches);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].start, 0);
        assert_eq!(merged[0].end, 16);
        assert_eq!(merged[0].kind, PIIKind::CreditCard);
    }

    #[test]
    fn test_merge_chain_of_overlaps() {
        let matches = vec![
            PIIMatch { start: 0, end: 4, kind: PIIKind::Phone },
            PIIMatch { start: 3, end: 8, kind: PIIKind::Email },
            PIIMatch { start: 7, end: 12, kind: PIIKind::Ssn },
        ];
        let merged = merge_overlapping(matches);
        assert_eq!(merged.len(), 1);
        assert_eq!((merged[0].start, merged[0].end), (0, 12));
        assert_eq!(merged[0].kind, PIIKind::Email);
    }

    #[test]
    fn test_adjacent_spans_not_merged() {
        let matches = vec![
            PIIMatch { start: 0, end: 5, kind: PIIKind::Email },
            PIIMatch { start: 5, end: 10, kind: PIIKind::Phone },
        ];
        assert_eq!(merge_overlapping(matches).len(), 2);
    }
}
