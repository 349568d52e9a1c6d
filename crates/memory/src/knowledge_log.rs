use std::fs;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{Local, NaiveTime};
use tokio::io::AsyncWriteExt;

/// File name of the knowledge log inside the knowledge directory.
pub const KNOWLEDGE_LOG_FILE: &str = "knowledge.log";

const TIME_FORMAT: &str = "%H:%M:%S";

/// One parsed `[HH:MM:SS] - fact` line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KnowledgeEntry {
    pub time: NaiveTime,
    pub fact: String,
}

impl KnowledgeEntry {
    pub fn parse(line: &str) -> Option<Self> {
        let rest = line.strip_prefix('[')?;
        let (stamp, fact) = rest.split_once("] - ")?;
        let time = NaiveTime::parse_from_str(stamp, TIME_FORMAT).ok()?;
        Some(Self {
            time,
            fact: fact.to_string(),
        })
    }
}

/// Render one log line, trailing newline included.
pub fn format_entry(time: NaiveTime, fact: &str) -> String {
    format!("[{}] - {fact}\n", time.format(TIME_FORMAT))
}

/// Append-only text log of consolidated facts.
///
/// Every write opens the file in append mode, writes one complete line with a
/// single `write_all`, and closes it again.  Concurrent writers in the same or
/// other tasks rely on `O_APPEND` to keep lines whole; there is no lock.
#[derive(Debug, Clone)]
pub struct KnowledgeLog {
    dir: PathBuf,
    path: PathBuf,
}

impl KnowledgeLog {
    pub fn in_dir(dir: impl Into<PathBuf>) -> Self {
        let dir = dir.into();
        let path = dir.join(KNOWLEDGE_LOG_FILE);
        Self { dir, path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append `fact` stamped with the current local wall-clock time.
    pub async fn append_fact(&self, fact: &str) -> Result<String> {
        self.append_fact_at(fact, Local::now().time()).await
    }

    /// Append `fact` stamped with `time`.  Returns the line written.
    pub async fn append_fact_at(&self, fact: &str, time: NaiveTime) -> Result<String> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .with_context(|| format!("create knowledge dir {}", self.dir.display()))?;

        let line = format_entry(time, fact);
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .with_context(|| format!("open knowledge log {}", self.path.display()))?;
        file.write_all(line.as_bytes())
            .await
            .with_context(|| format!("append to knowledge log {}", self.path.display()))?;
        file.flush().await?;
        Ok(line)
    }

    /// All well-formed entries in file order.  A missing file yields nothing.
    pub fn load(&self) -> Result<Vec<KnowledgeEntry>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }

        let file = fs::File::open(&self.path)
            .with_context(|| format!("open knowledge log {}", self.path.display()))?;
        let reader = BufReader::new(file);
        let mut entries = Vec::new();

        for (line_idx, line_result) in reader.lines().enumerate() {
            let line = line_result?;
            if line.trim().is_empty() {
                continue;
            }
            match KnowledgeEntry::parse(&line) {
                Some(entry) => entries.push(entry),
                None => tracing::warn!(
                    line = line_idx + 1,
                    path = %self.path.display(),
                    "malformed knowledge log line; skipping"
                ),
            }
        }

        Ok(entries)
    }

    /// The last `limit` entries, oldest first.
    pub fn recent(&self, limit: usize) -> Result<Vec<KnowledgeEntry>> {
        let mut entries = self.load()?;
        let skip = entries.len().saturating_sub(limit);
        Ok(entries.split_off(skip))
    }

    /// Recent entries re-rendered as log lines, ready to drop into a prompt.
    pub fn render_for_prompt(&self, limit: usize) -> Result<String> {
        Ok(self
            .recent(limit)?
            .iter()
            .map(|entry| format_entry(entry.time, &entry.fact))
            .collect())
    }
}
