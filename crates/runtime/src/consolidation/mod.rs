//! Forever-mode fact consolidation.
//!
//! After each turn the agent loop calls [`trigger_consolidation`].  When the
//! session has forever mode on and the turn is non-empty, a detached task
//! serializes the turn, asks the pinned fast model for at most one fact, and
//! appends that fact to the knowledge log.  The caller never waits on the task
//! and never sees its errors: every failure ends in a `tracing::error!` and a
//! [`ConsolidationOutcome::Failed`].

mod error;
mod prompt;

use std::path::PathBuf;
use std::sync::Arc;

use chrono::Utc;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};
use uuid::Uuid;

use factlog_llm::{
    CancellationToken, CompletionClient, CompletionRequest, Content, LlmRole,
};
use factlog_memory::KnowledgeLog;

pub use error::{ConsolidationError, ConsolidationStage};
pub use prompt::{
    CONSOLIDATION_MODEL, CONSOLIDATION_PROMPT, NO_SIGNIFICANT_FACTS, SkipReason, extract_fact,
    serialize_turn,
};

/// What the consolidation step needs from its host agent.
pub trait ConsolidationContext: Send + Sync + 'static {
    fn forever_mode_enabled(&self) -> bool;
    fn completion_client(&self) -> Arc<dyn CompletionClient>;
    fn knowledge_dir(&self) -> PathBuf;
}

/// Terminal state of one consolidation attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsolidationOutcome {
    /// The fact that was appended, normalized to a single line.
    Recorded(String),
    Skipped(SkipReason),
    Failed(ConsolidationStage),
}

/// Start a background consolidation attempt for `turn` if forever mode is on
/// and the turn has content.
///
/// Returns immediately.  Dropping the returned handle detaches the task; it is
/// only awaited by callers that want the outcome (tests, one-shot CLI runs).
/// Must be called from inside a Tokio runtime; outside one the call logs and
/// does nothing.
pub fn trigger_consolidation<C>(
    ctx: &Arc<C>,
    turn: &[Content],
) -> Option<JoinHandle<ConsolidationOutcome>>
where
    C: ConsolidationContext + ?Sized,
{
    if !ctx.forever_mode_enabled() || turn.is_empty() {
        return None;
    }

    let runtime = match Handle::try_current() {
        Ok(handle) => handle,
        Err(err) => {
            error!(?err, "consolidation triggered outside a Tokio runtime; skipping");
            return None;
        }
    };

    let ctx = Arc::clone(ctx);
    let turn = turn.to_vec();
    Some(runtime.spawn(async move { run_consolidation(&*ctx, &turn).await }))
}

/// One full attempt.  Never fails; errors are logged and reported as
/// [`ConsolidationOutcome::Failed`].
pub async fn run_consolidation<C>(ctx: &C, turn: &[Content]) -> ConsolidationOutcome
where
    C: ConsolidationContext + ?Sized,
{
    let prompt_id = new_prompt_id();
    match consolidate(ctx, turn, &prompt_id).await {
        Ok(outcome) => outcome,
        Err(err) => {
            let stage = err.stage();
            error!(
                error = %err,
                stage = stage.as_str(),
                prompt_id = %prompt_id,
                "consolidation failed"
            );
            ConsolidationOutcome::Failed(stage)
        }
    }
}

async fn consolidate<C>(
    ctx: &C,
    turn: &[Content],
    prompt_id: &str,
) -> Result<ConsolidationOutcome, ConsolidationError>
where
    C: ConsolidationContext + ?Sized,
{
    let payload = serialize_turn(turn)?;

    // Sent as one flat text block: some APIs reject structured histories whose
    // function-call / function-response parts do not alternate strictly.
    let request = CompletionRequest {
        model: CONSOLIDATION_MODEL.to_string(),
        is_chat: false,
        contents: vec![Content::user_text(payload)],
        system_instruction: Some(CONSOLIDATION_PROMPT.to_string()),
        // Never cancelled; the only time-box is the client's own timeout.
        cancel: CancellationToken::new(),
        prompt_id: prompt_id.to_string(),
        role: LlmRole::UtilitySummarizer,
        max_attempts: 1,
    };

    let response = ctx
        .completion_client()
        .generate(request)
        .await
        .map_err(ConsolidationError::Invoke)?;

    let fact = match extract_fact(response.text.as_deref()) {
        Ok(fact) => fact,
        Err(reason) => {
            debug!(?reason, prompt_id, "consolidation: nothing to record");
            return Ok(ConsolidationOutcome::Skipped(reason));
        }
    };

    let log = KnowledgeLog::in_dir(ctx.knowledge_dir());
    log.append_fact(&fact)
        .await
        .map_err(ConsolidationError::Persist)?;

    info!(prompt_id, fact = %fact, path = %log.path().display(), "consolidation: fact recorded");
    Ok(ConsolidationOutcome::Recorded(fact))
}

fn new_prompt_id() -> String {
    let suffix = Uuid::new_v4().simple().to_string();
    format!("consolidation-{}-{}", Utc::now().timestamp_millis(), &suffix[..8])
}
