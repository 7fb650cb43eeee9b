//! A small MCP server exposing in-memory documents over stdio.
//!
//! Frames are newline-delimited JSON-RPC 2.0 messages. Requests are answered
//! in arrival order; notifications get no reply.

use rust_mcp_schema::schema_utils::RpcErrorCodes;
use rust_mcp_schema::{
    JsonrpcErrorResponse, JsonrpcMessage, JsonrpcRequest, JsonrpcResultResponse, RequestId,
    Result as RpcResult, RpcError,
};
use serde_json::{json, Map, Value};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{debug, warn};

pub mod store;

pub use store::{DocError, DocumentStore};

pub const SERVER_NAME: &str = "DocumentMCP";
const FALLBACK_PROTOCOL_VERSION: &str = "2025-11-25";
const SUPPORTED_PROTOCOL_VERSIONS: &[&str] = &["2024-11-05", "2025-03-26", "2025-06-18", "2025-11-25"];

const DOCUMENTS_URI: &str = "docs://documents";
const DOCUMENT_URI_PREFIX: &str = "docs://documents/";

fn rpc_error(code: RpcErrorCodes, message: impl Into<String>) -> RpcError {
    RpcError::new(code, message.into(), None)
}

fn success(id: RequestId, result: Value) -> JsonrpcMessage {
    let extra = match result {
        Value::Object(map) => map,
        _ => Map::new(),
    };
    JsonrpcResultResponse::new(
        id,
        RpcResult {
            meta: None,
            extra: Some(extra),
        },
    )
    .into()
}

fn failure(id: Option<RequestId>, error: RpcError) -> JsonrpcMessage {
    JsonrpcErrorResponse::new(error, id).into()
}

#[derive(Debug, Default)]
pub struct DocServer {
    store: DocumentStore,
}

impl DocServer {
    pub fn new(store: DocumentStore) -> Self {
        Self { store }
    }

    /// Handles one raw frame. Returns the reply to send, if any.
    pub fn handle_line(&mut self, line: &str) -> Option<JsonrpcMessage> {
        let frame: Value = match serde_json::from_str(line) {
            Ok(frame) => frame,
            Err(err) => {
                warn!(error = %err, "Unparsable JSON-RPC frame");
                return Some(failure(
                    None,
                    rpc_error(RpcErrorCodes::PARSE_ERROR, format!("Parse error: {err}")),
                ));
            }
        };
        let id = frame
            .get("id")
            .and_then(|id| serde_json::from_value::<RequestId>(id.clone()).ok());

        match serde_json::from_value::<JsonrpcMessage>(frame) {
            Ok(JsonrpcMessage::Request(request)) => Some(self.handle(request)),
            Ok(JsonrpcMessage::Notification(notification)) => {
                debug!(method = %notification.method, "Notification received");
                None
            }
            Ok(JsonrpcMessage::ResultResponse(_) | JsonrpcMessage::ErrorResponse(_)) => {
                debug!("Ignoring response frame");
                None
            }
            Err(err) => {
                warn!(error = %err, "Invalid JSON-RPC frame");
                Some(failure(
                    id,
                    rpc_error(RpcErrorCodes::INVALID_REQUEST, format!("Invalid request: {err}")),
                ))
            }
        }
    }

    pub fn handle(&mut self, request: JsonrpcRequest) -> JsonrpcMessage {
        let params = Value::Object(request.params.unwrap_or_default());
        debug!(method = %request.method, "Request received");
        let outcome = match request.method.as_str() {
            "initialize" => Ok(initialize_result(&params)),
            "ping" => Ok(json!({})),
            "tools/list" => Ok(json!({ "tools": tool_definitions() })),
            "tools/call" => self.call_tool(&params),
            "resources/list" => Ok(json!({
                "resources": [{
                    "uri": DOCUMENTS_URI,
                    "name": "documents",
                    "description": "Ids of every available document",
                    "mimeType": "application/json",
                }]
            })),
            "resources/templates/list" => Ok(json!({
                "resourceTemplates": [{
                    "uriTemplate": format!("{DOCUMENT_URI_PREFIX}{{doc_id}}"),
                    "name": "document",
                    "description": "Contents of one document",
                    "mimeType": "text/plain",
                }]
            })),
            "resources/read" => self.read_resource(&params),
            "prompts/list" => Ok(json!({ "prompts": prompt_definitions() })),
            "prompts/get" => get_prompt(&params),
            other => Err(RpcError::method_not_found().with_message(format!("Method not found: {other}"))),
        };

        match outcome {
            Ok(result) => success(request.id, result),
            Err(error) => {
                warn!(method = %request.method, code = error.code, message = %error.message, "Request failed");
                failure(Some(request.id), error)
            }
        }
    }

    fn call_tool(&mut self, params: &Value) -> Result<Value, RpcError> {
        let name = string_param(params, "name")?;
        let arguments = params.get("arguments").cloned().unwrap_or_else(|| json!({}));

        let result = match name {
            "read_doc_contents" => {
                let doc_id = string_param(&arguments, "doc_id")?;
                self.store.read(doc_id).map(str::to_string)
            }
            "edit_document" => {
                let doc_id = string_param(&arguments, "doc_id")?;
                let old_str = string_param(&arguments, "old_str")?;
                let new_str = string_param(&arguments, "new_str")?;
                self.store
                    .edit(doc_id, old_str, new_str)
                    .map(|()| format!("Edited {doc_id}"))
            }
            other => return Err(rpc_error(RpcErrorCodes::INVALID_PARAMS, format!("Unknown tool: {other}"))),
        };

        Ok(match result {
            Ok(text) => tool_result(&text, false),
            Err(err) => tool_result(&err.to_string(), true),
        })
    }

    fn read_resource(&self, params: &Value) -> Result<Value, RpcError> {
        let uri = string_param(params, "uri")?;
        if uri == DOCUMENTS_URI {
            let ids = serde_json::to_string(&self.store.ids())
                .map_err(|err| rpc_error(RpcErrorCodes::INVALID_PARAMS, err.to_string()))?;
            return Ok(resource_contents(uri, "application/json", &ids));
        }

        let doc_id = uri
            .strip_prefix(DOCUMENT_URI_PREFIX)
            .ok_or_else(|| rpc_error(RpcErrorCodes::INVALID_PARAMS, format!("Unknown resource: {uri}")))?;
        let content = self
            .store
            .read(doc_id)
            .map_err(|err| rpc_error(RpcErrorCodes::INVALID_PARAMS, err.to_string()))?;
        Ok(resource_contents(uri, "text/plain", content))
    }
}

fn string_param<'a>(params: &'a Value, key: &str) -> Result<&'a str, RpcError> {
    params
        .get(key)
        .and_then(Value::as_str)
        .ok_or_else(|| rpc_error(RpcErrorCodes::INVALID_PARAMS, format!("Missing string parameter: {key}")))
}

fn initialize_result(params: &Value) -> Value {
    let requested = params.get("protocolVersion").and_then(Value::as_str);
    let protocol_version = match requested {
        Some(version) if SUPPORTED_PROTOCOL_VERSIONS.contains(&version) => version,
        _ => FALLBACK_PROTOCOL_VERSION,
    };
    json!({
        "protocolVersion": protocol_version,
        "capabilities": {
            "tools": { "listChanged": false },
            "resources": { "subscribe": false, "listChanged": false },
            "prompts": { "listChanged": false },
        },
        "serverInfo": {
            "name": SERVER_NAME,
            "version": env!("CARGO_PKG_VERSION"),
        },
    })
}

fn tool_definitions() -> Value {
    json!([
        {
            "name": "read_doc_contents",
            "description": "Read the contents of a document and return it as a string.",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "doc_id": { "type": "string", "description": "Id of the document to read" }
                },
                "required": ["doc_id"]
            }
        },
        {
            "name": "edit_document",
            "description": "Edit a document by replacing a string in the documents content with a new string.",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "doc_id": { "type": "string", "description": "Id of the document that will be edited" },
                    "old_str": { "type": "string", "description": "The text to replace. Must match exactly, including whitespace." },
                    "new_str": { "type": "string", "description": "The new text to insert in place of the old text." }
                },
                "required": ["doc_id", "old_str", "new_str"]
            }
        }
    ])
}

fn prompt_definitions() -> Value {
    json!([
        {
            "name": "format",
            "description": "Rewrites the contents of the document in Markdown format.",
            "arguments": [
                { "name": "doc_id", "description": "Id of the document to format", "required": true }
            ]
        },
        {
            "name": "summarize",
            "description": "Summarizes the contents of the document.",
            "arguments": [
                { "name": "doc_id", "description": "Id of the document to summarize", "required": true }
            ]
        }
    ])
}

fn get_prompt(params: &Value) -> Result<Value, RpcError> {
    let name = string_param(params, "name")?;
    let arguments = params.get("arguments").cloned().unwrap_or_else(|| json!({}));
    let doc_id = string_param(&arguments, "doc_id")?;
    let (description, text) = match name {
        "format" => ("Rewrites the contents of the document in Markdown format.", store::format_prompt(doc_id)),
        "summarize" => ("Summarizes the contents of the document.", store::summarize_prompt(doc_id)),
        other => return Err(rpc_error(RpcErrorCodes::INVALID_PARAMS, format!("Unknown prompt: {other}"))),
    };
    Ok(json!({
        "description": description,
        "messages": [
            { "role": "user", "content": { "type": "text", "text": text } }
        ]
    }))
}

fn tool_result(text: &str, is_error: bool) -> Value {
    json!({
        "content": [{ "type": "text", "text": text }],
        "isError": is_error,
    })
}

fn resource_contents(uri: &str, mime_type: &str, text: &str) -> Value {
    json!({
        "contents": [{ "uri": uri, "mimeType": mime_type, "text": text }]
    })
}

/// Serves frames from `input` until EOF, writing replies to `output`.
pub async fn serve<R, W>(server: &mut DocServer, input: R, output: &mut W) -> std::io::Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = input.lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let Some(response) = server.handle_line(line) else {
            continue;
        };
        let mut frame = serde_json::to_string(&response).map_err(std::io::Error::other)?;
        frame.push('\n');
        output.write_all(frame.as_bytes()).await?;
        output.flush().await?;
    }
    debug!("Input closed; document server exiting");
    Ok(())
}
