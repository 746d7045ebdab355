//! Pipeline state machine
//!
//! Each request moves forward through these states; there are no backward
//! transitions. `Blocked` and `ServiceError` are terminal.

use std::fmt;

/// Processing state of one chat request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Received,
    LengthChecked,
    RegexFiltered,
    Moderated,
    PiiMasked,
    ContextBuilt,
    ModelInvoked,
    Persisted,
    Responded,
    /// Terminal: rejected by a filter rule or moderation
    Blocked,
    /// Terminal: a required dependency failed
    ServiceError,
}

impl PipelineState {
    /// Whether the request can make no further progress
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            PipelineState::Responded | PipelineState::Blocked | PipelineState::ServiceError
        )
    }
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PipelineState::Received => "received",
            PipelineState::LengthChecked => "length_checked",
            PipelineState::RegexFiltered => "regex_filtered",
            PipelineState::Moderated => "moderated",
            PipelineState::PiiMasked => "pii_masked",
            PipelineState::ContextBuilt => "context_built",
            PipelineState::ModelInvoked => "model_invoked",
            PipelineState::Persisted => "persisted",
            PipelineState::Responded => "responded",
            PipelineState::Blocked => "blocked",
            PipelineState::ServiceError => "service_error",
        };
        f.write_str(name)
    }
}
