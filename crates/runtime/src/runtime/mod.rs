//! Agent runtime: configuration plus the completion client, wired as the host
//! for post-turn consolidation.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tokio::task::JoinHandle;

use factlog_config::AppConfig;
use factlog_llm::{CompletionClient, Content, LlmRouter, Provider};
use factlog_memory::KnowledgeLog;

use crate::consolidation::{ConsolidationContext, ConsolidationOutcome, trigger_consolidation};

#[derive(Clone)]
pub struct AgentRuntime {
    pub config: AppConfig,
    llm: Arc<dyn CompletionClient>,
}

impl AgentRuntime {
    /// Build a runtime whose completion client is the provider router from
    /// `config.llm`.
    pub fn new(config: AppConfig) -> Result<Self> {
        let timeout = match config.llm.request_timeout_secs {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        };
        let router = LlmRouter::new(
            Provider::from_name(&config.llm.provider),
            &config.llm.ollama_base_url,
            timeout,
        )?;
        Ok(Self::with_client(config, Arc::new(router)))
    }

    pub fn with_client(config: AppConfig, llm: Arc<dyn CompletionClient>) -> Self {
        Self { config, llm }
    }

    pub fn knowledge_log(&self) -> KnowledgeLog {
        KnowledgeLog::in_dir(self.config.knowledge_dir())
    }

    /// Post-turn hook for the agent loop.  Never blocks; drop the handle to
    /// leave the attempt running in the background.
    pub fn after_turn(self: &Arc<Self>, turn: &[Content]) -> Option<JoinHandle<ConsolidationOutcome>> {
        trigger_consolidation(self, turn)
    }
}

impl ConsolidationContext for AgentRuntime {
    fn forever_mode_enabled(&self) -> bool {
        self.config.forever_mode_enabled()
    }

    fn completion_client(&self) -> Arc<dyn CompletionClient> {
        Arc::clone(&self.llm)
    }

    fn knowledge_dir(&self) -> PathBuf {
        self.config.knowledge_dir()
    }
}
