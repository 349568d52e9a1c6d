//! Fixed prompt, model pin, and response filter for turn consolidation.

use factlog_llm::{Content, FAST_UTILITY_MODEL};

/// Model used for every consolidation call.  Resolved by the router to the
/// provider's small, fast model.
pub const CONSOLIDATION_MODEL: &str = FAST_UTILITY_MODEL;

/// Reply the model gives when a turn holds nothing worth keeping.
pub const NO_SIGNIFICANT_FACTS: &str = "NO_SIGNIFICANT_FACTS";

pub const CONSOLIDATION_PROMPT: &str = "\
You maintain the working memory of an autonomous agent that runs for a very \
long time.  You are given one interaction turn serialized as JSON: the \
messages, tool calls and tool results exchanged in that turn, in order.

Extract the single most useful concrete fact the agent discovered in this \
turn and would want to remember later.  Good facts are specific and \
verifiable: file or directory paths and what they contain, commands that were \
run and whether they succeeded, error messages and their causes, versions, \
configuration values, names of functions or modules and where they live.

Rules:
- Reply with exactly one line of plain text, at most 200 characters.
- No bullet markers, quotes, timestamps or commentary.
- Do not restate instructions, opinions, plans or small talk.
- If the turn contains no fact worth recording, reply with exactly \
NO_SIGNIFICANT_FACTS and nothing else.";

/// Flatten a turn into one JSON text block, parts kept in order.
pub fn serialize_turn(turn: &[Content]) -> serde_json::Result<String> {
    serde_json::to_string(turn)
}

/// Why a model reply produced no knowledge log entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    EmptyResponse,
    NoSignificantFacts,
}

/// Fact text collapsed onto one line, or the reason the reply is not worth
/// recording.  Runs of whitespace, line breaks included, become one space.
pub fn extract_fact(raw: Option<&str>) -> Result<String, SkipReason> {
    let fact = raw
        .unwrap_or_default()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");
    if fact.is_empty() {
        Err(SkipReason::EmptyResponse)
    } else if fact == NO_SIGNIFICANT_FACTS {
        Err(SkipReason::NoSignificantFacts)
    } else {
        Ok(fact)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use factlog_llm::{Part, Role};
    use serde_json::json;

    #[test]
    fn prompt_names_the_sentinel() {
        assert!(CONSOLIDATION_PROMPT.contains(NO_SIGNIFICANT_FACTS));
    }

    #[test]
    fn sentinel_and_blank_replies_are_dropped() {
        assert_eq!(
            extract_fact(Some("NO_SIGNIFICANT_FACTS")),
            Err(SkipReason::NoSignificantFacts)
        );
        assert_eq!(
            extract_fact(Some("  NO_SIGNIFICANT_FACTS\n")),
            Err(SkipReason::NoSignificantFacts)
        );
        assert_eq!(extract_fact(Some("")), Err(SkipReason::EmptyResponse));
        assert_eq!(extract_fact(Some(" \n\t ")), Err(SkipReason::EmptyResponse));
        assert_eq!(extract_fact(None), Err(SkipReason::EmptyResponse));
    }

    #[test]
    fn real_fact_is_trimmed() {
        assert_eq!(
            extract_fact(Some("  Found config loader at src/config.ts.  ")),
            Ok("Found config loader at src/config.ts.".to_string())
        );
    }

    #[test]
    fn multi_line_fact_is_collapsed_to_one_line() {
        assert_eq!(
            extract_fact(Some("  Found loader at src/config.ts.\nAlso:\ttests  pass.\r\n")),
            Ok("Found loader at src/config.ts. Also: tests pass.".to_string())
        );
        assert_eq!(
            extract_fact(Some("\nNO_SIGNIFICANT_FACTS\n\n")),
            Err(SkipReason::NoSignificantFacts)
        );
    }

    #[test]
    fn sentinel_inside_longer_text_is_kept() {
        assert_eq!(
            extract_fact(Some("NO_SIGNIFICANT_FACTS except tests pass")),
            Ok("NO_SIGNIFICANT_FACTS except tests pass".to_string())
        );
    }

    #[test]
    fn serialization_is_ordered_and_deterministic() {
        let turn = vec![
            Content::user_text("list the repo"),
            Content {
                role: Role::Model,
                parts: vec![Part::FunctionCall {
                    name: "ls".into(),
                    args: json!({"path": "."}),
                }],
            },
            Content {
                role: Role::User,
                parts: vec![Part::FunctionResponse {
                    name: "ls".into(),
                    response: json!({"entries": ["Cargo.toml", "src"]}),
                }],
            },
        ];

        let first = serialize_turn(&turn).unwrap();
        let second = serialize_turn(&turn).unwrap();
        assert_eq!(first, second);

        let list = first.find("list the repo").unwrap();
        let call = first.find("functionCall").unwrap();
        let response = first.find("functionResponse").unwrap();
        assert!(list < call && call < response);
    }
}
