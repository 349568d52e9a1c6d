use thiserror::Error;

/// Step of a consolidation attempt that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsolidationStage {
    Serialize,
    Invoke,
    Persist,
}

impl ConsolidationStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConsolidationStage::Serialize => "serialize",
            ConsolidationStage::Invoke => "invoke",
            ConsolidationStage::Persist => "persist",
        }
    }
}

#[derive(Debug, Error)]
pub enum ConsolidationError {
    #[error("failed to serialize turn: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("consolidation model call failed: {0:#}")]
    Invoke(anyhow::Error),
    #[error("failed to persist fact: {0:#}")]
    Persist(anyhow::Error),
}

impl ConsolidationError {
    pub fn stage(&self) -> ConsolidationStage {
        match self {
            ConsolidationError::Serialize(_) => ConsolidationStage::Serialize,
            ConsolidationError::Invoke(_) => ConsolidationStage::Invoke,
            ConsolidationError::Persist(_) => ConsolidationStage::Persist,
        }
    }
}
