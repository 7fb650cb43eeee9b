use rust_mcp_schema::schema_utils::ServerMessage;
use rust_mcp_schema::{
    CallToolResult, ContentBlock, GetPromptResult, InitializeResult, ListPromptsResult,
    ListToolsResult, PromptMessage, ReadResourceResult, Role, RpcError,
};
use serde_json::Value;

use crate::mcp::{PromptInfo, PromptText, ResourceValue, ToolInfo, ToolOutput};

pub(crate) const JSON_MIME_TYPE: &str = "application/json";

pub(crate) fn parse_initialize_result(message: ServerMessage) -> Result<InitializeResult, String> {
    let value = parse_response_value(message)?;
    let result =
        serde_json::from_value::<InitializeResult>(value).map_err(|err| err.to_string())?;
    if result.protocol_version.trim().is_empty() {
        return Err("Unexpected initialize response.".to_string());
    }
    Ok(result)
}

pub(crate) fn parse_list_tools(message: ServerMessage) -> Result<ListToolsResult, String> {
    parse_response(message)
}

pub(crate) fn parse_list_prompts(message: ServerMessage) -> Result<ListPromptsResult, String> {
    parse_response(message)
}

pub(crate) fn parse_get_prompt(message: ServerMessage) -> Result<GetPromptResult, String> {
    parse_response(message)
}

pub(crate) fn parse_read_resource(message: ServerMessage) -> Result<ReadResourceResult, String> {
    parse_response(message)
}

pub(crate) fn parse_call_tool(message: ServerMessage) -> Result<CallToolResult, String> {
    parse_response(message)
}

fn parse_response<T: serde::de::DeserializeOwned>(message: ServerMessage) -> Result<T, String> {
    let value = parse_response_value(message)?;
    serde_json::from_value::<T>(value).map_err(|err| err.to_string())
}

pub(crate) fn parse_response_value(message: ServerMessage) -> Result<Value, String> {
    match message {
        ServerMessage::Response(response) => {
            serde_json::to_value(&response.result).map_err(|err| err.to_string())
        }
        ServerMessage::Error(error) => Err(format_rpc_error(&error.error)),
        other => Err(format!("Unexpected MCP server message: {other:?}")),
    }
}

pub(crate) fn format_rpc_error(error: &RpcError) -> String {
    let mut output = format!("MCP error {}: {}", error.code, error.message);
    if let Some(data) = &error.data {
        let details = data
            .get("details")
            .and_then(|value| value.as_str())
            .map(|value| value.to_string())
            .or_else(|| data.as_str().map(|value| value.to_string()))
            .or_else(|| serde_json::to_string_pretty(data).ok());

        if let Some(details) = details {
            if !details.is_empty() {
                output.push('\n');
                output.push_str(&details);
            }
        }
    }
    output
}

fn string_field(value: &Value, key: &str) -> Option<String> {
    value.get(key).and_then(Value::as_str).map(str::to_string)
}

pub(crate) fn tool_infos(result: &ListToolsResult) -> Vec<ToolInfo> {
    result
        .tools
        .iter()
        .filter_map(|tool| serde_json::to_value(tool).ok())
        .filter_map(|value| {
            Some(ToolInfo {
                name: string_field(&value, "name")?,
                description: string_field(&value, "description"),
                input_schema: value
                    .get("inputSchema")
                    .cloned()
                    .unwrap_or_else(|| serde_json::json!({"type": "object"})),
            })
        })
        .collect()
}

pub(crate) fn prompt_infos(result: &ListPromptsResult) -> Vec<PromptInfo> {
    result
        .prompts
        .iter()
        .filter_map(|prompt| serde_json::to_value(prompt).ok())
        .filter_map(|value| {
            let arguments = value
                .get("arguments")
                .and_then(Value::as_array)
                .map(|args| {
                    args.iter()
                        .filter_map(|arg| string_field(arg, "name"))
                        .collect()
                })
                .unwrap_or_default();
            Some(PromptInfo {
                name: string_field(&value, "name")?,
                description: string_field(&value, "description"),
                arguments,
            })
        })
        .collect()
}

pub(crate) fn prompt_texts(result: &GetPromptResult) -> Vec<PromptText> {
    result.messages.iter().map(prompt_text).collect()
}

fn prompt_text(message: &PromptMessage) -> PromptText {
    let role = match message.role {
        Role::User => "user",
        Role::Assistant => "assistant",
    };
    PromptText {
        role: role.to_string(),
        text: content_to_string(&message.content),
    }
}

fn content_to_string(content: &ContentBlock) -> String {
    match content {
        ContentBlock::TextContent(text) => text.text.clone(),
        _ => serde_json::to_string(content)
            .unwrap_or_else(|_| "Unsupported prompt content.".to_string()),
    }
}

pub(crate) fn tool_output(result: &CallToolResult) -> ToolOutput {
    let texts = result
        .content
        .iter()
        .filter_map(|block| match block {
            ContentBlock::TextContent(text) => Some(text.text.clone()),
            _ => None,
        })
        .collect();
    ToolOutput {
        texts,
        is_error: result.is_error.unwrap_or(false),
    }
}

/// Interprets the first content entry of a resource read. JSON resources are
/// decoded; everything else is returned as text.
pub(crate) fn resource_value(result: &ReadResourceResult) -> Result<ResourceValue, String> {
    let value = serde_json::to_value(result).map_err(|err| err.to_string())?;
    let first = value
        .get("contents")
        .and_then(Value::as_array)
        .and_then(|contents| contents.first())
        .ok_or_else(|| "MCP resource has no contents.".to_string())?;
    let text = string_field(first, "text").unwrap_or_default();
    if string_field(first, "mimeType").as_deref() == Some(JSON_MIME_TYPE) {
        let parsed = serde_json::from_str(&text)
            .map_err(|err| format!("Invalid JSON resource: {err}"))?;
        return Ok(ResourceValue::Json(parsed));
    }
    Ok(ResourceValue::Text(text))
}
