//! Filter rule and result types

use crate::config::RuleAction;
use regex::Regex;

/// A compiled filter rule
///
/// Rules are immutable once compiled into a snapshot; configuration reloads
/// build a new snapshot instead of mutating rules in place.
#[derive(Debug, Clone)]
pub struct FilterRule {
    pub name: String,
    pub pattern: Regex,
    pub action: RuleAction,
    /// User-facing message returned on block or carried as a warning
    pub message: String,
    /// Replacement text applied by sanitize rules
    pub replacement: String,
}

/// Overall outcome of filter evaluation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterAction {
    /// No rule matched
    Pass,
    /// A block rule matched; the message is rejected
    Block,
    /// One or more sanitize rules rewrote the text
    Sanitize,
}

/// Result of applying the filter to one message
#[derive(Debug, Clone)]
pub struct FilterOutcome {
    pub action: FilterAction,
    /// Name of the block rule that matched, if any
    pub matched_rule: Option<String>,
    /// Block message or aggregated sanitize warning
    pub message: Option<String>,
    /// Text after sanitization; equals the input for `Pass` and `Block`
    pub sanitized_text: String,
    /// Names of every rule that matched, in evaluation order
    pub triggered: Vec<String>,
}

impl FilterOutcome {
    /// Whether the message may continue through the pipeline
    pub fn is_allowed(&self) -> bool {
        self.action != FilterAction::Block
    }
}
