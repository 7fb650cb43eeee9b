//! Anthropic Messages API payloads.

use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const ROLE_USER: &str = "user";
pub const ROLE_ASSISTANT: &str = "assistant";

pub const STOP_REASON_TOOL_USE: &str = "tool_use";

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    Text {
        text: String,
    },
    Thinking {
        thinking: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        signature: Option<String>,
    },
    RedactedThinking {
        data: String,
    },
    ToolUse {
        id: String,
        name: String,
        input: Value,
    },
    ToolResult {
        tool_use_id: String,
        content: String,
        is_error: bool,
    },
}

impl ContentBlock {
    pub fn text(text: impl Into<String>) -> Self {
        ContentBlock::Text { text: text.into() }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct ChatMessage {
    pub role: String,
    pub content: Vec<ContentBlock>,
}

impl ChatMessage {
    pub fn user_text(text: impl Into<String>) -> Self {
        Self {
            role: ROLE_USER.to_string(),
            content: vec![ContentBlock::text(text)],
        }
    }
}

#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct ToolDefinition {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub input_schema: Value,
}

#[derive(Serialize, Debug)]
pub struct MessagesRequest {
    pub model: String,
    pub max_tokens: u32,
    pub messages: Vec<ChatMessage>,
    pub temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools: Option<Vec<ToolDefinition>>,
}

#[derive(Deserialize, Clone, Debug, PartialEq)]
pub struct MessagesResponse {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub model: String,
    pub content: Vec<ContentBlock>,
    #[serde(default)]
    pub stop_reason: Option<String>,
}

impl MessagesResponse {
    pub fn uses_tools(&self) -> bool {
        self.stop_reason.as_deref() == Some(STOP_REASON_TOOL_USE)
    }

    pub fn into_message(self) -> ChatMessage {
        ChatMessage {
            role: ROLE_ASSISTANT.to_string(),
            content: self.content,
        }
    }
}

/// Joins the text blocks of a message with newlines.
pub fn text_from_blocks(blocks: &[ContentBlock]) -> String {
    blocks
        .iter()
        .filter_map(|block| match block {
            ContentBlock::Text { text } => Some(text.as_str()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn response_blocks_deserialize_by_type() {
        let response: MessagesResponse = serde_json::from_value(json!({
            "id": "msg_1",
            "model": "claude",
            "stop_reason": "tool_use",
            "content": [
                {"type": "text", "text": "Let me check."},
                {"type": "tool_use", "id": "toolu_1", "name": "read_doc_contents", "input": {"doc_id": "plan.md"}}
            ],
            "usage": {"input_tokens": 1, "output_tokens": 2}
        }))
        .expect("response parses");

        assert!(response.uses_tools());
        assert_eq!(text_from_blocks(&response.content), "Let me check.");
        assert!(matches!(
            &response.content[1],
            ContentBlock::ToolUse { name, .. } if name == "read_doc_contents"
        ));
    }

    #[test]
    fn tool_results_serialize_in_wire_shape() {
        let block = ContentBlock::ToolResult {
            tool_use_id: "toolu_1".to_string(),
            content: "[\"ok\"]".to_string(),
            is_error: false,
        };

        assert_eq!(
            serde_json::to_value(&block).unwrap(),
            json!({"type": "tool_result", "tool_use_id": "toolu_1", "content": "[\"ok\"]", "is_error": false})
        );
    }

    #[test]
    fn request_omits_unset_optionals() {
        let request = MessagesRequest {
            model: "m".to_string(),
            max_tokens: 10,
            messages: vec![ChatMessage::user_text("hi")],
            temperature: 1.0,
            tools: None,
        };

        let value = serde_json::to_value(&request).unwrap();
        assert!(value.get("tools").is_none());
        assert_eq!(value["messages"][0]["content"][0]["type"], "text");
    }

    #[test]
    fn text_from_blocks_joins_multiple_text_blocks() {
        let blocks = vec![
            ContentBlock::text("one"),
            ContentBlock::Thinking {
                thinking: "hidden".to_string(),
                signature: None,
            },
            ContentBlock::text("two"),
        ];
        assert_eq!(text_from_blocks(&blocks), "one\ntwo");
    }
}
