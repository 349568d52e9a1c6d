pub mod knowledge_log;

pub use knowledge_log::{KNOWLEDGE_LOG_FILE, KnowledgeEntry, KnowledgeLog, format_entry};
