use async_trait::async_trait;
use std::time::Duration;
use tracing::debug;

use super::{ChatParams, LanguageModel};
use crate::api::{MessagesRequest, MessagesResponse};

const ANTHROPIC_VERSION: &str = "2023-06-01";
const MAX_TOKENS: u32 = 8000;
const REQUEST_TIMEOUT_SECONDS: u64 = 300;
const CONNECT_TIMEOUT_SECONDS: u64 = 10;

/// Non-streaming client for the Anthropic Messages API.
pub struct Claude {
    client: reqwest::Client,
    model: String,
    api_key: String,
    base_url: String,
}

impl Claude {
    pub fn new(
        model: impl Into<String>,
        api_key: impl Into<String>,
        base_url: impl Into<String>,
    ) -> Result<Self, String> {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECONDS))
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECONDS))
            .build()
            .map_err(|err| format!("Failed to build HTTP client: {err}"))?;
        Ok(Self {
            client,
            model: model.into(),
            api_key: api_key.into(),
            base_url: base_url.into(),
        })
    }

    pub fn build_request(&self, params: ChatParams) -> MessagesRequest {
        MessagesRequest {
            model: self.model.clone(),
            max_tokens: MAX_TOKENS,
            messages: params.messages,
            temperature: params.temperature,
            tools: params.tools,
        }
    }
}

/// Joins `base_url` and `path`, tolerating a trailing slash on the base.
pub fn construct_api_url(base_url: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base_url.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

fn extract_error_summary(value: &serde_json::Value) -> Option<String> {
    value
        .pointer("/error/message")
        .and_then(|v| v.as_str())
        .or_else(|| value.get("message").and_then(|v| v.as_str()))
        .map(|text| text.split_whitespace().collect::<Vec<_>>().join(" "))
}

pub fn format_api_error(status: reqwest::StatusCode, body: &str) -> String {
    let trimmed = body.trim();
    match serde_json::from_str::<serde_json::Value>(trimmed) {
        Ok(value) => match extract_error_summary(&value) {
            Some(summary) if !summary.is_empty() => {
                format!("API request failed with status {status}: {summary}")
            }
            _ => format!("API request failed with status {status}: {value}"),
        },
        Err(_) if trimmed.is_empty() => format!("API request failed with status {status}"),
        Err(_) => format!("API request failed with status {status}: {trimmed}"),
    }
}

#[async_trait]
impl LanguageModel for Claude {
    async fn chat(&self, params: ChatParams) -> Result<MessagesResponse, String> {
        let request = self.build_request(params);
        let url = construct_api_url(&self.base_url, "v1/messages");
        debug!(
            model = %request.model,
            messages = request.messages.len(),
            tools = request.tools.as_ref().map(Vec::len).unwrap_or(0),
            "Sending messages request"
        );

        let response = self
            .client
            .post(url)
            .header("Content-Type", "application/json")
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&request)
            .send()
            .await
            .map_err(|err| format!("API request failed: {err}"))?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(format_api_error(status, &body));
        }

        let message = response
            .json::<MessagesResponse>()
            .await
            .map_err(|err| format!("Invalid API response: {err}"))?;
        debug!(
            id = %message.id,
            stop_reason = ?message.stop_reason,
            "Received messages response"
        );
        Ok(message)
    }
}
