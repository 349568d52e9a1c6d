use std::env;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    pub name: String,
    /// Long-session mode.  When `true` every completed turn is handed to the
    /// background fact consolidation step.
    pub forever_mode: bool,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            name: "Factlog".to_string(),
            forever_mode: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    pub provider: String,
    /// Base URL for the Ollama API.  Overridden at runtime by the
    /// `OLLAMA_BASE_URL` environment variable when set.
    pub ollama_base_url: String,
    /// HTTP timeout applied to every completion request.  `0` disables it.
    pub request_timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: "ollama".to_string(),
            ollama_base_url: "http://localhost:11434".to_string(),
            request_timeout_secs: 120,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct KnowledgeConfig {
    /// Directory holding the knowledge log.  Relative paths resolve against
    /// the process working directory.
    pub dir: String,
}

impl Default for KnowledgeConfig {
    fn default() -> Self {
        Self {
            dir: ".factlog/knowledge".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TelemetryConfig {
    pub log_level: String,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub agent: AgentConfig,
    pub llm: LlmConfig,
    pub knowledge: KnowledgeConfig,
    pub telemetry: TelemetryConfig,
}

impl AppConfig {
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut config = Self::default();
        match fs::read_to_string(path) {
            Ok(raw) => {
                config = toml::from_str(&raw)
                    .with_context(|| format!("parse config {}", path.display()))?;
            }
            Err(err) if err.kind() == ErrorKind::NotFound => {}
            Err(err) => {
                return Err(err).with_context(|| format!("read config {}", path.display()));
            }
        }

        config.apply_env_overrides(|key| env::var(key).ok());
        Ok(config)
    }

    /// Apply `FACTLOG_*` / `OLLAMA_BASE_URL` overrides read through `lookup`.
    pub fn apply_env_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(enabled) = lookup("FACTLOG_FOREVER_MODE").as_deref().and_then(parse_flag) {
            self.agent.forever_mode = enabled;
        }

        if let Some(dir) = lookup("FACTLOG_KNOWLEDGE_DIR") {
            if !dir.trim().is_empty() {
                self.knowledge.dir = dir;
            }
        }

        if let Some(value) = lookup("OLLAMA_BASE_URL") {
            if !value.is_empty() {
                self.llm.provider = "ollama".to_string();
                self.llm.ollama_base_url = value;
            }
        }
    }

    pub fn save_to(&self, path: impl AsRef<Path>) -> Result<()> {
        if let Some(parent) = path.as_ref().parent() {
            fs::create_dir_all(parent)?;
        }

        let rendered = toml::to_string_pretty(self)?;
        fs::write(path, rendered)?;
        Ok(())
    }

    pub fn forever_mode_enabled(&self) -> bool {
        self.agent.forever_mode
    }

    pub fn knowledge_dir(&self) -> PathBuf {
        PathBuf::from(&self.knowledge.dir)
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

// ── Tests ────────────────────────────────────────────────────────────────────
