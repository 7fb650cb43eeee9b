use crate::core::exit_stack::Release;
use crate::core::launch::LaunchDescriptor;
use crate::mcp::{McpService, PromptInfo, PromptText, ResourceValue, ToolInfo, ToolOutput};
use async_trait::async_trait;
use rust_mcp_schema::schema_utils::{NotificationFromClient, RequestFromClient};
use rust_mcp_schema::{
    CallToolRequestParams, ClientCapabilities, GetPromptRequestParams, Implementation,
    InitializeRequestParams, InitializeResult, ReadResourceRequestParams, LATEST_PROTOCOL_VERSION,
};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};

mod protocol;
mod transport_stdio;

use transport_stdio::StdioClient;

/// A connected, initialized MCP server reached over stdio.
pub struct McpClient {
    id: String,
    transport: Arc<StdioClient>,
    server_details: InitializeResult,
}

impl McpClient {
    /// Spawns the server described by `descriptor` and completes the MCP
    /// handshake. The subprocess is killed if the handshake fails.
    pub async fn connect(id: impl Into<String>, descriptor: &LaunchDescriptor) -> Result<Self, String> {
        let id = id.into();
        let transport = StdioClient::spawn(id.clone(), descriptor).await?;

        let server_details = match initialize(&transport).await {
            Ok(details) => details,
            Err(err) => {
                let _ = transport.shutdown().await;
                return Err(format!("MCP initialize failed for {id}: {err}"));
            }
        };
        info!(
            client_id = %id,
            server = %server_details.server_info.name,
            protocol_version = %server_details.protocol_version,
            "Connected to MCP server"
        );

        Ok(Self {
            id,
            transport,
            server_details,
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn server_details(&self) -> &InitializeResult {
        &self.server_details
    }

    pub async fn ping(&self) -> Result<(), String> {
        self.transport
            .send_request(RequestFromClient::PingRequest(None))
            .await
            .and_then(protocol::parse_response_value)
            .map(|_| ())
    }

    pub async fn close(&self) -> Result<(), String> {
        debug!(client_id = %self.id, "Closing MCP client");
        self.transport.shutdown().await
    }
}

fn client_details() -> InitializeRequestParams {
    InitializeRequestParams {
        capabilities: ClientCapabilities::default(),
        client_info: Implementation {
            name: env!("CARGO_PKG_NAME").to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            title: Some("MCP Chat".to_string()),
            description: Some("Terminal chat client for MCP servers".to_string()),
            icons: Vec::new(),
            website_url: None,
        },
        meta: None,
        protocol_version: LATEST_PROTOCOL_VERSION.to_string(),
    }
}

async fn initialize(transport: &StdioClient) -> Result<InitializeResult, String> {
    let response = transport
        .send_request(RequestFromClient::InitializeRequest(client_details()))
        .await?;
    let result = protocol::parse_initialize_result(response)?;
    transport
        .send_notification(NotificationFromClient::InitializedNotification(None))
        .await?;
    Ok(result)
}

#[async_trait]
impl McpService for McpClient {
    async fn list_tools(&self) -> Result<Vec<ToolInfo>, String> {
        let response = self
            .transport
            .send_request(RequestFromClient::ListToolsRequest(None))
            .await?;
        protocol::parse_list_tools(response).map(|list| protocol::tool_infos(&list))
    }

    async fn call_tool(
        &self,
        name: &str,
        arguments: Map<String, Value>,
    ) -> Result<ToolOutput, String> {
        let params = CallToolRequestParams::new(name).with_arguments(arguments);
        let response = self
            .transport
            .send_request(RequestFromClient::CallToolRequest(params))
            .await?;
        protocol::parse_call_tool(response).map(|result| protocol::tool_output(&result))
    }

    async fn list_prompts(&self) -> Result<Vec<PromptInfo>, String> {
        let response = self
            .transport
            .send_request(RequestFromClient::ListPromptsRequest(None))
            .await?;
        protocol::parse_list_prompts(response).map(|list| protocol::prompt_infos(&list))
    }

    async fn get_prompt(
        &self,
        name: &str,
        arguments: HashMap<String, String>,
    ) -> Result<Vec<PromptText>, String> {
        let params = GetPromptRequestParams {
            name: name.to_string(),
            arguments: (!arguments.is_empty()).then_some(arguments),
            meta: None,
        };
        let response = self
            .transport
            .send_request(RequestFromClient::GetPromptRequest(params))
            .await?;
        protocol::parse_get_prompt(response).map(|result| protocol::prompt_texts(&result))
    }

    async fn read_resource(&self, uri: &str) -> Result<ResourceValue, String> {
        let params = ReadResourceRequestParams {
            meta: None,
            uri: uri.to_string(),
        };
        let response = self
            .transport
            .send_request(RequestFromClient::ReadResourceRequest(params))
            .await?;
        let result = protocol::parse_read_resource(response)?;
        protocol::resource_value(&result)
    }
}

#[async_trait]
impl Release for McpClient {
    async fn release(&self) -> Result<(), String> {
        self.close().await
    }
}

#[cfg(test)]
mod tests;
