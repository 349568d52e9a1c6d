pub mod consolidation;
mod runtime;

pub use consolidation::{
    ConsolidationContext, ConsolidationError, ConsolidationOutcome, ConsolidationStage, SkipReason,
    run_consolidation, trigger_consolidation,
};
pub use runtime::AgentRuntime;
