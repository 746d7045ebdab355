//! Content filter engine
//!
//! Applies the ordered rule list to incoming text. Block rules win over
//! sanitize rules regardless of list position: the first matching block rule
//! short-circuits evaluation with no partial sanitization applied. If no
//! block rule matches, every matching sanitize rule is applied cumulatively.
//!
//! The compiled rule set lives in an immutable snapshot behind an
//! `ArcSwap`; in-flight requests always see a consistent rule set and a
//! reload replaces the whole snapshot atomically.

use arc_swap::ArcSwap;
use regex::RegexBuilder;
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::config::{FilterConfigFile, RuleAction};
use crate::monitoring::AuditSink;
use crate::utils::error::{ChatError, Result};

use super::types::{FilterAction, FilterOutcome, FilterRule};

/// Immutable compiled view of one filter configuration
#[derive(Debug)]
pub struct FilterSnapshot {
    rules: Vec<FilterRule>,
    max_message_length: usize,
    enable_logging: bool,
}

impl FilterSnapshot {
    /// Compile a configuration into a snapshot
    pub fn compile(config: &FilterConfigFile) -> Result<Self> {
        config.validate()?;

        let mut rules = Vec::with_capacity(config.regex_filters.len());
        for rule in &config.regex_filters {
            let pattern = RegexBuilder::new(&rule.pattern)
                .case_insensitive(!config.settings.case_sensitive)
                .build()
                .map_err(|e| {
                    ChatError::Config(format!("filter rule '{}': invalid pattern: {}", rule.name, e))
                })?;

            rules.push(FilterRule {
                name: rule.name.clone(),
                pattern,
                action: rule.action,
                message: rule.message.clone(),
                replacement: rule.replacement.clone().unwrap_or_else(|| "***".into()),
            });
        }

        debug!(rules = rules.len(), "filter snapshot compiled");
        Ok(Self {
            rules,
            max_message_length: config.settings.max_message_length,
            enable_logging: config.settings.enable_logging,
        })
    }

    /// Number of compiled rules
    pub fn rule_count(&self) -> usize {
        self.rules.len()
    }
}

/// Content filter engine with hot-reloadable rules
pub struct ContentFilterEngine {
    snapshot: ArcSwap<FilterSnapshot>,
    audit: Arc<dyn AuditSink>,
}

impl ContentFilterEngine {
    /// Build an engine from a filter configuration
    pub fn new(config: &FilterConfigFile, audit: Arc<dyn AuditSink>) -> Result<Self> {
        let snapshot = FilterSnapshot::compile(config)?;
        Ok(Self {
            snapshot: ArcSwap::from_pointee(snapshot),
            audit,
        })
    }

    /// Replace the rule snapshot atomically
    ///
    /// A failed compile leaves the previous snapshot in place.
    pub fn reload(&self, config: &FilterConfigFile) -> Result<()> {
        let next = FilterSnapshot::compile(config)?;
        let previous = self.snapshot.swap(Arc::new(next));
        debug!(
            previous_rules = previous.rule_count(),
            current_rules = self.snapshot.load().rule_count(),
            "filter snapshot swapped"
        );
        Ok(())
    }

    /// Current number of loaded rules
    pub fn rule_count(&self) -> usize {
        self.snapshot.load().rule_count()
    }

    /// Apply the loaded rules to `text`
    ///
    /// Returns `ChatError::Validation` for empty or over-length input before
    /// any rule is evaluated; this is not a filter match.
    pub fn apply(&self, text: &str) -> Result<FilterOutcome> {
        let snapshot = self.snapshot.load();

        if text.trim().is_empty() {
            return Err(ChatError::Validation("message must not be empty".into()));
        }
        if text.chars().count() > snapshot.max_message_length {
            return Err(ChatError::Validation(format!(
                "message exceeds maximum length of {} characters",
                snapshot.max_message_length
            )));
        }

        // Block rules are checked first so a later block rule cannot be
        // preempted by an earlier sanitize rule.
        for rule in snapshot.rules.iter().filter(|r| r.action == RuleAction::Block) {
            if rule.pattern.is_match(text) {
                if snapshot.enable_logging {
                    warn!(rule = %rule.name, "content blocked by filter rule");
                    self.audit.emit(
                        "content_blocked",
                        json!({ "rule": rule.name, "content_length": text.len() }),
                    );
                }
                return Ok(FilterOutcome {
                    action: FilterAction::Block,
                    matched_rule: Some(rule.name.clone()),
                    message: Some(rule.message.clone()),
                    sanitized_text: text.to_string(),
                    triggered: vec![rule.name.clone()],
                });
            }
        }

        let mut sanitized = text.to_string();
        let mut triggered = Vec::new();
        let mut warnings = Vec::new();

        for rule in snapshot
            .rules
            .iter()
            .filter(|r| r.action == RuleAction::Sanitize)
        {
            if rule.pattern.is_match(&sanitized) {
                sanitized = rule
                    .pattern
                    .replace_all(&sanitized, rule.replacement.as_str())
                    .into_owned();
                triggered.push(rule.name.clone());
                warnings.push(rule.message.clone());
            }
        }

        if triggered.is_empty() {
            return Ok(FilterOutcome {
                action: FilterAction::Pass,
                matched_rule: None,
                message: None,
                sanitized_text: sanitized,
                triggered,
            });
        }

        if snapshot.enable_logging {
            debug!(rules = ?triggered, "content sanitized by filter rules");
            self.audit.emit(
                "content_sanitized",
                json!({ "rules": triggered, "content_length": text.len() }),
            );
        }

        Ok(FilterOutcome {
            action: FilterAction::Sanitize,
            matched_rule: None,
            message: Some(warnings.join("; ")),
            sanitized_text: sanitized,
            triggered,
        })
    }
}
