//! Pipeline orchestration

mod orchestrator;
mod state;

pub use orchestrator::ChatOrchestrator;
pub use state::PipelineState;
