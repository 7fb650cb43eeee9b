use async_trait::async_trait;

use crate::api::{ChatMessage, MessagesResponse, ToolDefinition};

pub mod claude;

pub use claude::Claude;

/// Per-call options for a chat completion.
#[derive(Debug, Clone)]
pub struct ChatParams {
    pub messages: Vec<ChatMessage>,
    pub temperature: f32,
    pub tools: Option<Vec<ToolDefinition>>,
}

impl ChatParams {
    pub fn new(messages: Vec<ChatMessage>) -> Self {
        Self {
            messages,
            temperature: 1.0,
            tools: None,
        }
    }

    pub fn with_tools(mut self, tools: Vec<ToolDefinition>) -> Self {
        self.tools = (!tools.is_empty()).then_some(tools);
        self
    }
}

#[async_trait]
pub trait LanguageModel: Send + Sync {
    async fn chat(&self, params: ChatParams) -> Result<MessagesResponse, String>;
}
