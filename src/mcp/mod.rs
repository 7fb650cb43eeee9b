//! Model Context Protocol client surface used by the chat session.
//!
//! [`client::McpClient`] speaks JSON-RPC to a stdio server; the rest of the
//! crate depends only on the [`McpService`] trait and the plain data types
//! below.

use async_trait::async_trait;
use serde_json::{Map, Value};
use std::collections::HashMap;

pub mod client;

pub use client::McpClient;

#[derive(Debug, Clone, PartialEq)]
pub struct ToolInfo {
    pub name: String,
    pub description: Option<String>,
    pub input_schema: Value,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptInfo {
    pub name: String,
    pub description: Option<String>,
    pub arguments: Vec<String>,
}

/// A prompt message reduced to its role and text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptText {
    pub role: String,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ToolOutput {
    pub texts: Vec<String>,
    pub is_error: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ResourceValue {
    Json(Value),
    Text(String),
}

impl ResourceValue {
    pub fn as_text(&self) -> String {
        match self {
            ResourceValue::Text(text) => text.clone(),
            ResourceValue::Json(Value::String(text)) => text.clone(),
            ResourceValue::Json(value) => value.to_string(),
        }
    }
}

/// Operations the chat layer needs from a connected MCP server.
#[async_trait]
pub trait McpService: Send + Sync {
    async fn list_tools(&self) -> Result<Vec<ToolInfo>, String>;

    async fn call_tool(&self, name: &str, arguments: Map<String, Value>)
        -> Result<ToolOutput, String>;

    async fn list_prompts(&self) -> Result<Vec<PromptInfo>, String>;

    async fn get_prompt(
        &self,
        name: &str,
        arguments: HashMap<String, String>,
    ) -> Result<Vec<PromptText>, String>;

    async fn read_resource(&self, uri: &str) -> Result<ResourceValue, String>;
}
