mod content;
mod request;

use std::time::Duration;

use anyhow::{Context, Result, anyhow, bail};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::debug;

pub use content::{Content, Part, Role};
pub use request::{CompletionClient, CompletionRequest, CompletionResponse, LlmRole, run_attempts};
pub use tokio_util::sync::CancellationToken;

const OPENROUTER_CHAT_URL: &str = "https://openrouter.ai/api/v1/chat/completions";

/// Model alias that resolves to each provider's small, fast model.  Utility
/// callers pin this instead of a provider-specific name.
pub const FAST_UTILITY_MODEL: &str = "fast-utility";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Provider {
    Ollama,
    OpenRouter,
}

impl Provider {
    /// Anything other than `openrouter` (case-insensitive) selects Ollama.
    pub fn from_name(name: &str) -> Self {
        if name.trim().eq_ignore_ascii_case("openrouter") {
            Provider::OpenRouter
        } else {
            Provider::Ollama
        }
    }

    /// Concrete model name for `model`, expanding [`FAST_UTILITY_MODEL`].
    pub fn resolve_model<'a>(&self, model: &'a str) -> &'a str {
        if model != FAST_UTILITY_MODEL {
            return model;
        }
        match self {
            Provider::Ollama => "llama3.2:3b",
            Provider::OpenRouter => "meta-llama/llama-3.2-3b-instruct",
        }
    }
}

#[derive(Debug, Clone)]
pub struct OllamaClient {
    client: reqwest::Client,
    base_url: String,
}

#[derive(Debug, Clone)]
pub struct OpenRouterClient {
    client: reqwest::Client,
}

impl OllamaClient {
    pub fn new(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }
}

impl OpenRouterClient {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

/// Routes completion requests to the configured provider.
#[derive(Debug, Clone)]
pub struct LlmRouter {
    provider: Provider,
    ollama: OllamaClient,
    openrouter: OpenRouterClient,
}

impl LlmRouter {
    /// `timeout` of `None` leaves the HTTP client without a request timeout.
    pub fn new(provider: Provider, ollama_base_url: &str, timeout: Option<Duration>) -> Result<Self> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build().context("build HTTP client")?;

        Ok(Self {
            provider,
            ollama: OllamaClient::new(client.clone(), ollama_base_url),
            openrouter: OpenRouterClient::new(client),
        })
    }

    pub fn provider(&self) -> Provider {
        self.provider
    }

    async fn send_once(&self, request: &CompletionRequest) -> Result<CompletionResponse> {
        let model = self.provider.resolve_model(&request.model);
        match self.provider {
            Provider::Ollama => self.ollama.complete(model, request).await,
            Provider::OpenRouter => self.openrouter.complete(model, request).await,
        }
    }
}

#[async_trait]
impl CompletionClient for LlmRouter {
    async fn generate(&self, request: CompletionRequest) -> Result<CompletionResponse> {
        debug!(
            provider = ?self.provider,
            model = %request.model,
            role = request.role.as_str(),
            prompt_id = %request.prompt_id,
            "completion request"
        );
        run_attempts(request.max_attempts, &request.cancel, &request.prompt_id, |_| {
            self.send_once(&request)
        })
        .await
    }
}

impl OllamaClient {
    async fn complete(&self, model: &str, request: &CompletionRequest) -> Result<CompletionResponse> {
        let base_url = self.base_url.trim_end_matches('/');
        let (endpoint, payload) = if request.is_chat {
            (format!("{base_url}/api/chat"), ollama_chat_payload(model, request)?)
        } else {
            (format!("{base_url}/api/generate"), ollama_generate_payload(model, request)?)
        };

        let response = self
            .client
            .post(&endpoint)
            .json(&payload)
            .send()
            .await
            .with_context(|| format!("Ollama unavailable at {base_url}"))?;

        let body = read_json_body(response, "Ollama", &endpoint).await?;

        Ok(CompletionResponse {
            text: ollama_text(&body),
        })
    }
}

impl OpenRouterClient {
    async fn complete(&self, model: &str, request: &CompletionRequest) -> Result<CompletionResponse> {
        let api_key = std::env::var("OPENROUTER_API_KEY")
            .ok()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| anyhow!("OPENROUTER_API_KEY is not set"))?;

        let response = self
            .client
            .post(OPENROUTER_CHAT_URL)
            .bearer_auth(api_key)
            .header("HTTP-Referer", "https://factlog.local")
            .header("X-Title", "Factlog")
            .json(&openrouter_payload(model, request)?)
            .send()
            .await
            .context("OpenRouter request failed")?;

        let body = read_json_body(response, "OpenRouter", OPENROUTER_CHAT_URL).await?;

        Ok(CompletionResponse {
            text: openrouter_text(&body),
        })
    }
}

// ── Payloads ──────────────────────────────────────────────────────────────────

/// Fail with status and raw body on non-2xx; only successful bodies are
/// parsed as JSON.
async fn read_json_body(
    response: reqwest::Response,
    provider: &str,
    endpoint: &str,
) -> Result<serde_json::Value> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        bail!("{provider} error ({status}): {}", body.trim());
    }

    response
        .json()
        .await
        .with_context(|| format!("decode {provider} response from {endpoint}"))
}

fn role_label(role: Role) -> &'static str {
    match role {
        Role::User => "user",
        Role::Model => "assistant",
    }
}

fn chat_messages(request: &CompletionRequest) -> serde_json::Result<Vec<serde_json::Value>> {
    let mut messages = Vec::with_capacity(request.contents.len() + 1);
    if let Some(system) = &request.system_instruction {
        messages.push(json!({"role": "system", "content": system}));
    }
    for content in &request.contents {
        let text = content.render()?;
        messages.push(json!({"role": role_label(content.role), "content": text}));
    }
    Ok(messages)
}

fn ollama_chat_payload(model: &str, request: &CompletionRequest) -> serde_json::Result<serde_json::Value> {
    Ok(json!({
        "model": model,
        "messages": chat_messages(request)?,
        "stream": false
    }))
}

/// Single-shot payload: every content block is flattened into `prompt`.
fn ollama_generate_payload(
    model: &str,
    request: &CompletionRequest,
) -> serde_json::Result<serde_json::Value> {
    let prompt = request
        .contents
        .iter()
        .map(Content::render)
        .collect::<serde_json::Result<Vec<_>>>()?
        .join("\n\n");

    let mut payload = json!({
        "model": model,
        "prompt": prompt,
        "stream": false
    });
    if let Some(system) = &request.system_instruction {
        payload["system"] = json!(system);
    }
    Ok(payload)
}

fn openrouter_payload(model: &str, request: &CompletionRequest) -> serde_json::Result<serde_json::Value> {
    Ok(json!({
        "model": model,
        "messages": chat_messages(request)?
    }))
}

fn ollama_text(body: &serde_json::Value) -> Option<String> {
    body.get("response")
        .or_else(|| body.get("message").and_then(|message| message.get("content")))
        .and_then(|value| value.as_str())
        .map(ToString::to_string)
}

fn openrouter_text(body: &serde_json::Value) -> Option<String> {
    body.get("choices")
        .and_then(|choices| choices.get(0))
        .and_then(|choice| choice.get("message"))
        .and_then(|message| message.get("content"))
        .and_then(|content| content.as_str())
        .map(ToString::to_string)
}

// ── Tests ────────────────────────────────────────────────────────────────────
