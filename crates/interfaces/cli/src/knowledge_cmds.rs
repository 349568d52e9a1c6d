use anyhow::Result;

use factlog_config::AppConfig;
use factlog_memory::KnowledgeLog;

pub fn tail(config: &AppConfig, limit: usize) -> Result<()> {
    print!("{}", tail_text(config, limit)?);
    Ok(())
}

fn tail_text(config: &AppConfig, limit: usize) -> Result<String> {
    let log = KnowledgeLog::in_dir(config.knowledge_dir());
    let rendered = log.render_for_prompt(limit)?;
    if rendered.is_empty() {
        return Ok(format!("no knowledge recorded yet ({})\n", log.path().display()));
    }
    Ok(rendered)
}

pub fn path(config: &AppConfig) -> Result<()> {
    println!("{}", KnowledgeLog::in_dir(config.knowledge_dir()).path().display());
    Ok(())
}
