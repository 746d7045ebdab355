//! PII redactor
//!
//! Unions the pattern and entity detectors over the same input, merges
//! overlapping spans, and replaces each merged span with the placeholder
//! for its kind. Redacting already-masked text yields zero new matches.

use serde_json::json;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::monitoring::AuditSink;

use super::detector::{merge_overlapping, EntityDetector, PIIKind, PIIMatch, PatternDetector};

/// Result of one redaction pass
#[derive(Debug, Clone)]
pub struct RedactionOutcome {
    pub masked_text: String,
    /// Merged spans that were masked, in ascending order
    pub matches: Vec<PIIMatch>,
}

/// Detects and masks personally identifying spans
pub struct PIIRedactor {
    patterns: PatternDetector,
    entity: Option<Arc<dyn EntityDetector>>,
    audit: Arc<dyn AuditSink>,
}

impl PIIRedactor {
    /// Redactor with pattern detection only
    pub fn new(audit: Arc<dyn AuditSink>) -> Self {
        Self {
            patterns: PatternDetector,
            entity: None,
            audit,
        }
    }

    /// Add a model-based entity detector
    pub fn with_entity_detector(mut self, detector: Arc<dyn EntityDetector>) -> Self {
        self.entity = Some(detector);
        self
    }

    /// Detect and mask PII in `text`
    ///
    /// An entity detector failure is logged and redaction proceeds with the
    /// pattern matches alone.
    pub async fn redact(&self, text: &str) -> RedactionOutcome {
        let mut matches = self.patterns.detect(text);

        if let Some(entity) = &self.entity {
            match entity.detect(text).await {
                Ok(entity_matches) => matches.extend(entity_matches),
                Err(e) => {
                    warn!(error = %e, "entity detector failed, using pattern matches only");
                }
            }
        }

        // A span that is already a placeholder must not count as a match,
        // otherwise re-redaction would not be a fixed point.
        matches.retain(|m| {
            text.get(m.start..m.end)
                .map(|s| !PIIKind::placeholders().contains(&s))
                .unwrap_or(false)
        });

        let matches = merge_overlapping(matches);
        if matches.is_empty() {
            return RedactionOutcome {
                masked_text: text.to_string(),
                matches,
            };
        }

        let mut masked = text.to_string();
        for m in matches.iter().rev() {
            masked.replace_range(m.start..m.end, m.kind.placeholder());
        }

        debug!(spans = matches.len(), "masked PII spans");
        self.audit.emit(
            "pii_masked",
            json!({
                "match_count": matches.len(),
                "kinds": matches.iter().map(|m| m.kind).collect::<Vec<_>>(),
            }),
        );

        RedactionOutcome {
            masked_text: masked,
            matches,
        }
    }

    /// Whether `text` contains no detectable pattern-based PII
    pub fn is_clean(&self, text: &str) -> bool {
        self.patterns.detect(text).is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::monitoring::NoopAuditSink;
    use crate::utils::error::{ChatError, Result};
    use async_trait::async_trait;

    fn redactor() -> PIIRedactor {
        PIIRedactor::new(Arc::new(NoopAuditSink))
    }

    #[tokio::test]
    async fn test_masks_email_with_kind_placeholder() {
        let outcome = redactor().redact("reach me at alice@example.com today").await;
        assert_eq!(outcome.masked_text, "reach me at [EMAIL] today");
        assert_eq!(outcome.matches.len(), 1);
        assert_eq!(outcome.matches[0].kind, PIIKind::Email);
    }

    #[tokio::test]
    async fn test_masks_multiple_kinds() {
        let outcome = redactor()
            .redact("ssn 123-45-6789, card 4111-1111-1111-1111")
            .await;
        assert!(outcome.masked_text.contains("[SSN]"));
        assert!(outcome.masked_text.contains("[CARD]"));
        assert!(!outcome.masked_text.contains("6789"));
        assert!(!outcome.masked_text.contains("4111"));
    }

    #[tokio::test]
    async fn test_redaction_is_idempotent() {
        let redactor = redactor();
        let first = redactor
            .redact("email alice@example.com, ip 10.0.0.1, ssn 123-45-6789")
            .await;
        let second = redactor.redact(&first.masked_text).await;
        assert!(second.matches.is_empty());
        assert_eq!(second.masked_text, first.masked_text);
    }

    #[tokio::test]
    async fn test_clean_text_untouched() {
        let outcome = redactor().redact("nothing sensitive here").await;
        assert_eq!(outcome.masked_text, "nothing sensitive here");
        assert!(outcome.matches.is_empty());
    }

    struct StubEntityDetector {
        matches: Vec<PIIMatch>,
    }

    #[async_trait]
    impl EntityDetector for StubEntityDetector {
        async fn detect(&self, _text: &str) -> Result<Vec<PIIMatch>> {
            Ok(self.matches.clone())
        }
    }

    struct FailingEntityDetector;

    #[async_trait]
    impl EntityDetector for FailingEntityDetector {
        async fn detect(&self, _text: &str) -> Result<Vec<PIIMatch>> {
            Err(ChatError::Moderation("ner service down".into()))
        }
    }

    #[tokio::test]
    async fn test_entity_matches_unioned_with_patterns() {
        let text = "Alice wrote to alice@example.com";
        let redactor = redactor().with_entity_detector(Arc::new(StubEntityDetector {
            matches: vec![PIIMatch {
                start: 0,
                end: 5,
                kind: PIIKind::Person,
            }],
        }));

        let outcome = redactor.redact(text).await;
        assert_eq!(outcome.masked_text, "[NAME] wrote to [EMAIL]");
    }

    #[tokio::test]
    async fn test_entity_overlap_merges_to_widest() {
        let text = "mail alice@example.com now";
        // Entity span covers the email match and a little more.
        let redactor = redactor().with_entity_detector(Arc::new(StubEntityDetector {
            matches: vec![PIIMatch {
                start: 5,
                end: 26,
                kind: PIIKind::Person,
            }],
        }));

        let outcome = redactor.redact(text).await;
        assert_eq!(outcome.matches.len(), 1);
        assert_eq!(outcome.masked_text, "mail [NAME]");
    }

    #[tokio::test]
    async fn test_entity_detector_failure_degrades_to_patterns() {
        let redactor = redactor().with_entity_detector(Arc::new(FailingEntityDetector));
        let outcome = redactor.redact("mail alice@example.com").await;
        assert_eq!(outcome.masked_text, "mail [EMAIL]");
    }
}
