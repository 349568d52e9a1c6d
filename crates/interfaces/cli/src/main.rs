mod knowledge_cmds;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use factlog_config::AppConfig;
use factlog_llm::Content;
use factlog_runtime::{AgentRuntime, ConsolidationOutcome};

#[derive(Debug, Parser)]
#[command(
    name = "factlog",
    version,
    about = "Background fact consolidation for long-running agents"
)]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(long, global = true, default_value = "config/default.toml")]
    config: PathBuf,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Consolidate one turn (a JSON array of content blocks) into the knowledge log.
    Consolidate {
        #[arg(value_name = "TURN_JSON")]
        turn: PathBuf,
        /// Run even when forever mode is off in the configuration.
        #[arg(long)]
        force: bool,
    },
    /// Inspect the knowledge log.
    Knowledge {
        #[command(subcommand)]
        command: KnowledgeCommands,
    },
    /// Inspect the effective configuration.
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(Debug, Subcommand)]
enum KnowledgeCommands {
    /// Print the most recent entries.
    Tail {
        #[arg(long, default_value_t = 20)]
        limit: usize,
    },
    /// Print the knowledge log path.
    Path,
}

#[derive(Debug, Subcommand)]
enum ConfigCommands {
    /// Print the configuration after env overrides, as TOML.
    Show,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    let config = AppConfig::load_from(&cli.config)?;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.telemetry.log_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match cli.command {
        Commands::Consolidate { turn, force } => consolidate(config, &turn, force).await,
        Commands::Knowledge { command } => match command {
            KnowledgeCommands::Tail { limit } => knowledge_cmds::tail(&config, limit),
            KnowledgeCommands::Path => knowledge_cmds::path(&config),
        },
        Commands::Config { command } => match command {
            ConfigCommands::Show => {
                print!("{}", toml::to_string_pretty(&config)?);
                Ok(())
            }
        },
    }
}

async fn consolidate(mut config: AppConfig, turn_path: &Path, force: bool) -> Result<()> {
    let raw = std::fs::read_to_string(turn_path)
        .with_context(|| format!("read turn file {}", turn_path.display()))?;
    let turn: Vec<Content> = serde_json::from_str(&raw)
        .with_context(|| format!("parse turn file {}", turn_path.display()))?;

    if force {
        config.agent.forever_mode = true;
    }
    if !config.forever_mode_enabled() {
        bail!("forever mode is off; enable agent.forever_mode, set FACTLOG_FOREVER_MODE=1, or pass --force");
    }

    let runtime = Arc::new(AgentRuntime::new(config)?);
    let Some(handle) = runtime.after_turn(&turn) else {
        println!("turn is empty; nothing to consolidate");
        return Ok(());
    };

    // A one-shot process has to wait, or the runtime would drop the task on exit.
    match handle.await.context("consolidation task panicked")? {
        ConsolidationOutcome::Recorded(fact) => {
            println!("recorded: {fact}");
            println!("log: {}", runtime.knowledge_log().path().display());
        }
        ConsolidationOutcome::Skipped(reason) => println!("skipped: {reason:?}"),
        ConsolidationOutcome::Failed(stage) => {
            println!("failed at {} (see log output)", stage.as_str());
        }
    }
    Ok(())
}
