//! OpenAI-Compatible Chat Provider
//!
//! Talks to the Chat Completions API with function-calling enabled. Works
//! against any OpenAI-compatible endpoint via `api_base`.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::{ChatProvider, ProviderConfig, ToolSchema};
use crate::types::{ChatMessage, ErrorCategory, LensError, ProviderError, Result, Role, ToolCall};

const DEFAULT_API_BASE: &str = "https://api.openai.com/v1";
const DEFAULT_MODEL: &str = "gpt-4o";

/// Chat Completions provider with secure API key handling
pub struct OpenAiProvider {
    /// API key - never exposed in logs or debug output
    api_key: SecretString,
    api_base: String,
    model: String,
    temperature: f32,
    client: reqwest::Client,
}

impl std::fmt::Debug for OpenAiProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiProvider")
            .field("api_key", &"[REDACTED]")
            .field("api_base", &self.api_base)
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .finish()
    }
}

impl OpenAiProvider {
    pub fn new(config: &ProviderConfig, api_key: SecretString) -> Result<Self> {
        let api_base = config
            .api_base
            .clone()
            .unwrap_or_else(|| DEFAULT_API_BASE.to_string());
        let model = config
            .model
            .clone()
            .unwrap_or_else(|| DEFAULT_MODEL.to_string());

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .connect_timeout(Duration::from_secs(
                crate::constants::network::CONNECTION_TIMEOUT_SECS,
            ))
            .build()
            .map_err(|e| LensError::provider(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            api_key,
            api_base,
            model,
            temperature: config.temperature,
            client,
        })
    }

    fn build_request(&self, messages: &[ChatMessage], tools: &[ToolSchema]) -> ChatRequest {
        let wire_messages = messages.iter().map(WireMessage::from).collect();

        let wire_tools = if tools.is_empty() {
            None
        } else {
            Some(
                tools
                    .iter()
                    .map(|t| WireTool {
                        tool_type: "function".to_string(),
                        function: WireFunction {
                            name: t.name.clone(),
                            description: t.description.clone(),
                            parameters: t.parameters.clone(),
                        },
                    })
                    .collect(),
            )
        };

        ChatRequest {
            model: self.model.clone(),
            messages: wire_messages,
            temperature: self.temperature,
            tools: wire_tools,
        }
    }
}

#[async_trait]
impl ChatProvider for OpenAiProvider {
    async fn chat(
        &self,
        messages: &[ChatMessage],
        tools: &[ToolSchema],
        cancel: &CancellationToken,
    ) -> Result<ChatMessage> {
        let start_time = Instant::now();
        let request = self.build_request(messages, tools);
        let url = format!("{}/chat/completions", self.api_base);

        debug!(
            "Chat request: {} messages, {} tools, model {}",
            messages.len(),
            tools.len(),
            self.model
        );

        let send = self
            .client
            .post(&url)
            .header(
                "Authorization",
                format!("Bearer {}", self.api_key.expose_secret()),
            )
            .header("Content-Type", "application/json")
            .json(&request)
            .send();

        let response = tokio::select! {
            _ = cancel.cancelled() => {
                return Err(LensError::Cancelled("chat request aborted".to_string()));
            }
            result = send => result.map_err(|e| {
                ProviderError::with_provider(
                    ErrorCategory::Network,
                    format!("request failed: {}", e),
                    "openai",
                )
            })?,
        };

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::with_provider(
                ErrorCategory::from_http_status(status),
                format!("API error ({}): {}", status, body),
                "openai",
            )
            .into());
        }

        let body: ChatResponse = response.json().await.map_err(|e| {
            ProviderError::with_provider(
                ErrorCategory::Unknown,
                format!("failed to parse response: {}", e),
                "openai",
            )
        })?;

        let choice = body.choices.into_iter().next().ok_or_else(|| {
            ProviderError::with_provider(ErrorCategory::Unknown, "no choices in response", "openai")
        })?;

        debug!(
            "Chat response in {}ms ({} tool calls)",
            start_time.elapsed().as_millis(),
            choice
                .message
                .tool_calls
                .as_ref()
                .map(Vec::len)
                .unwrap_or(0)
        );

        Ok(choice.message.into_chat_message())
    }

    fn name(&self) -> &str {
        "openai"
    }

    fn model(&self) -> &str {
        &self.model
    }
}

// =============================================================================
// Wire Types
// =============================================================================

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<WireMessage>,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<WireTool>>,
}

#[derive(Debug, Serialize)]
struct WireMessage {
    role: String,
    content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_calls: Option<Vec<WireToolCall>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_call_id: Option<String>,
}

impl From<&ChatMessage> for WireMessage {
    fn from(msg: &ChatMessage) -> Self {
        let tool_calls = if msg.tool_calls.is_empty() {
            None
        } else {
            Some(
                msg.tool_calls
                    .iter()
                    .map(|call| WireToolCall {
                        id: call.id.clone(),
                        call_type: "function".to_string(),
                        function: WireFunctionCall {
                            name: call.name.clone(),
                            arguments: call.arguments.to_string(),
                        },
                    })
                    .collect(),
            )
        };

        Self {
            role: msg.role.to_string(),
            content: msg.content.clone(),
            tool_calls,
            tool_call_id: msg.tool_call_id.clone(),
        }
    }
}

#[derive(Debug, Serialize)]
struct WireTool {
    #[serde(rename = "type")]
    tool_type: String,
    function: WireFunction,
}

#[derive(Debug, Serialize)]
struct WireFunction {
    name: String,
    description: String,
    parameters: Value,
}

#[derive(Debug, Serialize, Deserialize)]
struct WireToolCall {
    id: String,
    #[serde(rename = "type")]
    call_type: String,
    function: WireFunctionCall,
}

#[derive(Debug, Serialize, Deserialize)]
struct WireFunctionCall {
    name: String,
    /// Arguments arrive as a JSON-encoded string on the wire
    arguments: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
    tool_calls: Option<Vec<WireToolCall>>,
}

impl ResponseMessage {
    fn into_chat_message(self) -> ChatMessage {
        let tool_calls = self
            .tool_calls
            .unwrap_or_default()
            .into_iter()
            .map(|call| {
                let arguments =
                    serde_json::from_str::<Value>(&call.function.arguments).unwrap_or_else(|e| {
                        warn!(
                            "Unparseable arguments for tool '{}': {}",
                            call.function.name, e
                        );
                        Value::Object(serde_json::Map::new())
                    });
                ToolCall {
                    id: call.id,
                    name: call.function.name,
                    arguments,
                }
            })
            .collect();

        ChatMessage {
            role: Role::Assistant,
            content: self.content.unwrap_or_default(),
            tool_calls,
            tool_call_id: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_wire_message_from_tool_result() {
        let msg = ChatMessage::tool("call_1", "file contents");
        let wire = WireMessage::from(&msg);
        assert_eq!(wire.role, "tool");
        assert_eq!(wire.tool_call_id.as_deref(), Some("call_1"));
        assert!(wire.tool_calls.is_none());
    }

    #[test]
    fn test_wire_message_serializes_call_arguments_as_string() {
        let msg = ChatMessage::assistant_with_calls(
            "",
            vec![ToolCall {
                id: "call_1".into(),
                name: "read_file".into(),
                arguments: json!({"path": "src/lib.rs"}),
            }],
        );
        let wire = WireMessage::from(&msg);
        let calls = wire.tool_calls.unwrap();
        assert_eq!(calls[0].function.arguments, r#"{"path":"src/lib.rs"}"#);
    }

    #[test]
    fn test_response_message_parses_tool_calls() {
        let response = ResponseMessage {
            content: None,
            tool_calls: Some(vec![WireToolCall {
                id: "call_2".into(),
                call_type: "function".into(),
                function: WireFunctionCall {
                    name: "list_files".into(),
                    arguments: r#"{"dir": "src"}"#.into(),
                },
            }]),
        };

        let msg = response.into_chat_message();
        assert_eq!(msg.role, Role::Assistant);
        assert_eq!(msg.tool_calls.len(), 1);
        assert_eq!(msg.tool_calls[0].arguments["dir"], "src");
    }

    #[test]
    fn test_response_message_bad_arguments_fall_back_to_empty_object() {
        let response = ResponseMessage {
            content: Some("".into()),
            tool_calls: Some(vec![WireToolCall {
                id: "call_3".into(),
                call_type: "function".into(),
                function: WireFunctionCall {
                    name: "grep".into(),
                    arguments: "{{{".into(),
                },
            }]),
        };

        let msg = response.into_chat_message();
        assert!(msg.tool_calls[0].arguments.is_object());
    }
}
