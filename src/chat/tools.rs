//! Routing of model tool calls to the MCP server that provides each tool.

use serde_json::{json, Map, Value};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::api::{ContentBlock, ToolDefinition};
use crate::core::registry::ClientRegistry;
use crate::mcp::McpService;

pub const TOOL_NOT_FOUND: &str = "Could not find that tool";

/// Collects the tools of every registered client, in registry order.
pub async fn all_tools<C: McpService>(
    clients: &ClientRegistry<C>,
) -> Result<Vec<ToolDefinition>, String> {
    let mut tools = Vec::new();
    for (key, client) in clients.iter() {
        let listed = client.list_tools().await?;
        debug!(client_id = %key, count = listed.len(), "Listed MCP tools");
        tools.extend(listed.into_iter().map(|tool| ToolDefinition {
            name: tool.name,
            description: tool.description,
            input_schema: tool.input_schema,
        }));
    }
    Ok(tools)
}

/// Returns the first client, in registry order, that exposes `tool_name`.
pub async fn find_client_with_tool<C: McpService>(
    clients: &ClientRegistry<C>,
    tool_name: &str,
) -> Result<Option<Arc<C>>, String> {
    for client in clients.clients() {
        let tools = client.list_tools().await?;
        if tools.iter().any(|tool| tool.name == tool_name) {
            return Ok(Some(client.clone()));
        }
    }
    Ok(None)
}

fn tool_arguments(input: &Value) -> Map<String, Value> {
    match input {
        Value::Object(map) => map.clone(),
        _ => Map::new(),
    }
}

/// Executes every `tool_use` block in `content` and returns one
/// `tool_result` block per request, in request order.
///
/// Tool failures are reported to the model as error results; only failures
/// to enumerate tools propagate.
pub async fn execute_tool_requests<C: McpService>(
    clients: &ClientRegistry<C>,
    content: &[ContentBlock],
) -> Result<Vec<ContentBlock>, String> {
    let mut results = Vec::new();
    for block in content {
        let ContentBlock::ToolUse { id, name, input } = block else {
            continue;
        };

        let Some(client) = find_client_with_tool(clients, name).await? else {
            warn!(tool = %name, "Model requested an unknown tool");
            results.push(ContentBlock::ToolResult {
                tool_use_id: id.clone(),
                content: TOOL_NOT_FOUND.to_string(),
                is_error: true,
            });
            continue;
        };

        debug!(tool = %name, tool_use_id = %id, "Calling MCP tool");
        let result = match client.call_tool(name, tool_arguments(input)).await {
            Ok(output) => ContentBlock::ToolResult {
                tool_use_id: id.clone(),
                content: Value::from(output.texts).to_string(),
                is_error: output.is_error,
            },
            Err(err) => {
                warn!(tool = %name, tool_use_id = %id, error = %err, "MCP tool call failed");
                let message = format!("Error executing tool '{name}': {err}");
                ContentBlock::ToolResult {
                    tool_use_id: id.clone(),
                    content: json!({ "error": message }).to_string(),
                    is_error: true,
                }
            }
        };
        results.push(result);
    }
    Ok(results)
}
