//! Role-tagged conversational content exchanged with completion models.

use serde::{Deserialize, Serialize};

/// Who produced a [`Content`] block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Model,
}

/// A single part of a content block.
///
/// Serialises externally tagged, so a text part is `{"text":"hi"}` and a
/// tool call is `{"functionCall":{"name":..,"args":..}}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Part {
    Text(String),
    FunctionCall {
        name: String,
        #[serde(default)]
        args: serde_json::Value,
    },
    FunctionResponse {
        name: String,
        #[serde(default)]
        response: serde_json::Value,
    },
}

impl Part {
    pub fn text(text: impl Into<String>) -> Self {
        Part::Text(text.into())
    }

    /// Plain-text rendering.  Tool calls and responses become compact JSON so
    /// nothing is lost when a structured turn is sent as one text block.
    pub fn render(&self) -> serde_json::Result<String> {
        match self {
            Part::Text(text) => Ok(text.clone()),
            other => serde_json::to_string(other),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Content {
    pub role: Role,
    #[serde(default)]
    pub parts: Vec<Part>,
}

impl Content {
    pub fn user_text(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            parts: vec![Part::text(text)],
        }
    }

    pub fn model_text(text: impl Into<String>) -> Self {
        Self {
            role: Role::Model,
            parts: vec![Part::text(text)],
        }
    }

    /// All parts rendered and joined with newlines.
    pub fn render(&self) -> serde_json::Result<String> {
        Ok(self
            .parts
            .iter()
            .map(Part::render)
            .collect::<serde_json::Result<Vec<_>>>()?
            .join("\n"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn text_part_serialises_as_bare_text_key() {
        let content = Content::user_text("hi");
        let value = serde_json::to_value(&content).unwrap();
        assert_eq!(value, json!({"role": "user", "parts": [{"text": "hi"}]}));
    }

    #[test]
    fn function_parts_use_camel_case_tags() {
        let part = Part::FunctionCall {
            name: "run_shell".into(),
            args: json!({"cmd": "ls"}),
        };
        let value = serde_json::to_value(&part).unwrap();
        assert_eq!(value["functionCall"]["name"], "run_shell");
        assert_eq!(value["functionCall"]["args"]["cmd"], "ls");

        let parsed: Part =
            serde_json::from_value(json!({"functionResponse": {"name": "run_shell", "response": {"exit": 0}}}))
                .unwrap();
        assert!(matches!(parsed, Part::FunctionResponse { ref name, .. } if name == "run_shell"));
    }

    #[test]
    fn render_keeps_tool_parts_as_json() {
        let content = Content {
            role: Role::Model,
            parts: vec![
                Part::text("listing files"),
                Part::FunctionCall {
                    name: "ls".into(),
                    args: json!({}),
                },
            ],
        };
        let rendered = content.render().unwrap();
        assert!(rendered.starts_with("listing files\n"));
        assert!(rendered.contains("\"functionCall\""));
        assert!(rendered.contains("\"ls\""));
    }

    #[test]
    fn missing_parts_default_to_empty() {
        let content: Content = serde_json::from_str(r#"{"role":"model"}"#).unwrap();
        assert_eq!(content.role, Role::Model);
        assert!(content.parts.is_empty());
    }
}
