//! Conversation state and the tool-use loop.
//!
//! [`Chat`] owns the message history and drives the model until it stops
//! asking for tools. [`cli_chat::CliChat`] layers document mentions and
//! prompt commands on top for the interactive terminal.

use std::sync::Arc;
use tracing::debug;

use crate::api::{text_from_blocks, ChatMessage, ROLE_USER};
use crate::core::registry::ClientRegistry;
use crate::llm::{ChatParams, LanguageModel};
use crate::mcp::McpService;

pub mod cli_chat;
pub mod tools;

pub use cli_chat::CliChat;

pub struct Chat<C, L> {
    llm: Arc<L>,
    clients: ClientRegistry<C>,
    messages: Vec<ChatMessage>,
}

impl<C, L> Chat<C, L>
where
    C: McpService,
    L: LanguageModel,
{
    pub fn new(clients: ClientRegistry<C>, llm: Arc<L>) -> Self {
        Self {
            llm,
            clients,
            messages: Vec::new(),
        }
    }

    pub fn clients(&self) -> &ClientRegistry<C> {
        &self.clients
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn push_message(&mut self, message: ChatMessage) {
        self.messages.push(message);
    }

    /// Runs model turns until one finishes without a tool request and
    /// returns that turn's text. Text accompanying a tool request is handed
    /// to `on_interim` as it arrives.
    pub async fn complete<F>(&mut self, mut on_interim: F) -> Result<String, String>
    where
        F: FnMut(&str),
    {
        loop {
            let tools = tools::all_tools(&self.clients).await?;
            let params = ChatParams::new(self.messages.clone()).with_tools(tools);
            let response = self.llm.chat(params).await?;
            let uses_tools = response.uses_tools();
            let text = text_from_blocks(&response.content);
            let message = response.into_message();

            if !uses_tools {
                self.messages.push(message);
                return Ok(text);
            }

            if !text.is_empty() {
                on_interim(&text);
            }
            let results = tools::execute_tool_requests(&self.clients, &message.content).await?;
            debug!(results = results.len(), "Returning tool results to model");
            self.messages.push(message);
            self.messages.push(ChatMessage {
                role: ROLE_USER.to_string(),
                content: results,
            });
        }
    }

    /// Appends `query` as a user message and completes the turn.
    pub async fn run<F>(&mut self, query: &str, on_interim: F) -> Result<String, String>
    where
        F: FnMut(&str),
    {
        self.messages.push(ChatMessage::user_text(query));
        self.complete(on_interim).await
    }
}
