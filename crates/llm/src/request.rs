//! Provider-neutral completion request/response and the client seam.

use std::future::Future;

use anyhow::{Result, anyhow, bail};
use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::content::Content;

/// Which part of the agent is calling the model.  Only used for routing
/// decisions and log fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LlmRole {
    Main,
    UtilitySummarizer,
}

impl LlmRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            LlmRole::Main => "main",
            LlmRole::UtilitySummarizer => "utility_summarizer",
        }
    }
}

#[derive(Debug, Clone)]
pub struct CompletionRequest {
    pub model: String,
    /// `false` for single-shot calls that carry no conversation history.
    pub is_chat: bool,
    pub contents: Vec<Content>,
    pub system_instruction: Option<String>,
    pub cancel: CancellationToken,
    /// Correlation id surfaced in logs.
    pub prompt_id: String,
    pub role: LlmRole,
    /// Total attempts including the first.  Values below 1 are treated as 1.
    pub max_attempts: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompletionResponse {
    pub text: Option<String>,
}

impl CompletionResponse {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
        }
    }
}

#[async_trait]
pub trait CompletionClient: Send + Sync {
    async fn generate(&self, request: CompletionRequest) -> Result<CompletionResponse>;
}

/// Run `call` up to `max_attempts` times back to back, returning the first
/// success.  Each attempt races `cancel`; cancellation ends the loop at once.
pub async fn run_attempts<F, Fut, T>(
    max_attempts: u32,
    cancel: &CancellationToken,
    prompt_id: &str,
    mut call: F,
) -> Result<T>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let max_attempts = max_attempts.max(1);
    let mut last_err = None;

    for attempt in 1..=max_attempts {
        let outcome = tokio::select! {
            _ = cancel.cancelled() => bail!("completion {prompt_id} cancelled"),
            outcome = call(attempt) => outcome,
        };
        match outcome {
            Ok(value) => return Ok(value),
            Err(err) => {
                if attempt < max_attempts {
                    warn!(?err, attempt, max_attempts, prompt_id, "completion attempt failed; retrying");
                }
                last_err = Some(err);
            }
        }
    }

    Err(last_err.unwrap_or_else(|| anyhow!("completion {prompt_id} made no attempts")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn single_attempt_does_not_retry() {
        let calls = Arc::new(AtomicU32::new(0));
        let cancel = CancellationToken::new();
        let counter = calls.clone();
        let result: Result<()> = run_attempts(1, &cancel, "t-1", |_| {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                bail!("transient")
            }
        })
        .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn zero_attempts_still_runs_once() {
        let cancel = CancellationToken::new();
        let value = run_attempts(0, &cancel, "t-0", |attempt| async move { Ok(attempt) })
            .await
            .unwrap();
        assert_eq!(value, 1);
    }

    #[tokio::test]
    async fn retries_until_success() {
        let cancel = CancellationToken::new();
        let value = run_attempts(3, &cancel, "t-3", |attempt| async move {
            if attempt < 3 {
                bail!("attempt {attempt} failed")
            }
            Ok("done")
        })
        .await
        .unwrap();
        assert_eq!(value, "done");
    }

    #[tokio::test]
    async fn last_error_is_returned() {
        let cancel = CancellationToken::new();
        let err = run_attempts::<_, _, ()>(2, &cancel, "t-err", |attempt| async move {
            bail!("failure #{attempt}")
        })
        .await
        .unwrap_err();
        assert_eq!(err.to_string(), "failure #2");
    }

    #[tokio::test]
    async fn cancellation_short_circuits_a_hung_call() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let err = run_attempts::<_, _, ()>(1, &cancel, "t-cancel", |_| {
            std::future::pending::<Result<()>>()
        })
        .await
        .unwrap_err();
        assert!(err.to_string().contains("cancelled"));
    }

    #[test]
    fn role_labels() {
        assert_eq!(LlmRole::Main.as_str(), "main");
        assert_eq!(LlmRole::UtilitySummarizer.as_str(), "utility_summarizer");
    }
}
