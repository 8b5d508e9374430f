//! Chat Transcript Types
//!
//! The agent's entire working memory is an ordered, append-only list of
//! `ChatMessage` values. Tool invocations requested by the assistant are
//! answered by `tool`-role messages correlated by call id.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Message role in a chat transcript
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
    Tool,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::System => write!(f, "system"),
            Self::User => write!(f, "user"),
            Self::Assistant => write!(f, "assistant"),
            Self::Tool => write!(f, "tool"),
        }
    }
}

/// A tool invocation requested by the assistant
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCall {
    /// Correlation id; the answering tool message carries the same id
    pub id: String,
    /// Registered tool name
    pub name: String,
    /// Arguments as a JSON object
    pub arguments: Value,
}

/// One entry in an agent transcript
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
    /// Tool invocations requested by an assistant turn
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCall>,
    /// Correlates a tool-role message with its originating call
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
            tool_calls: Vec::new(),
            tool_call_id: None,
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
            tool_calls: Vec::new(),
            tool_call_id: None,
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
            tool_calls: Vec::new(),
            tool_call_id: None,
        }
    }

    pub fn assistant_with_calls(content: impl Into<String>, tool_calls: Vec<ToolCall>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
            tool_calls,
            tool_call_id: None,
        }
    }

    /// Tool result message answering the call with the given id
    pub fn tool(call_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: Role::Tool,
            content: content.into(),
            tool_calls: Vec::new(),
            tool_call_id: Some(call_id.into()),
        }
    }

    pub fn requests_tools(&self) -> bool {
        !self.tool_calls.is_empty()
    }
}

/// Result of one `Agent::execute` call; immutable after return
#[derive(Debug, Clone)]
pub struct AgentResult {
    /// Final assistant text; empty when the run failed
    pub content: String,
    /// Loop iterations consumed
    pub iterations: usize,
    pub success: bool,
    /// Present iff `success` is false
    pub error: Option<String>,
    /// Full transcript, returned even on failure for diagnosis
    pub history: Vec<ChatMessage>,
}

impl AgentResult {
    pub fn succeeded(content: String, iterations: usize, history: Vec<ChatMessage>) -> Self {
        Self {
            content,
            iterations,
            success: true,
            error: None,
            history,
        }
    }

    pub fn failed(error: impl Into<String>, iterations: usize, history: Vec<ChatMessage>) -> Self {
        Self {
            content: String::new(),
            iterations,
            success: false,
            error: Some(error.into()),
            history,
        }
    }
}

/// Check the transcript correlation invariant: every tool-role message must
/// answer a call id announced by the immediately preceding assistant turn.
pub fn transcript_is_correlated(history: &[ChatMessage]) -> bool {
    let mut open_ids: Vec<String> = Vec::new();

    for msg in history {
        match msg.role {
            Role::Assistant => {
                open_ids = msg.tool_calls.iter().map(|c| c.id.clone()).collect();
            }
            Role::Tool => {
                let Some(id) = &msg.tool_call_id else {
                    return false;
                };
                if !open_ids.contains(id) {
                    return false;
                }
            }
            _ => {
                open_ids.clear();
            }
        }
    }

    true
}
