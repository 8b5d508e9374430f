//! LLM Provider Abstraction
//!
//! Defines the `ChatProvider` trait the agent loop talks to: one call takes
//! the full transcript plus the registry's tool declarations and returns the
//! assistant's next message, which may request tool invocations.
//!
//! ## Modules
//!
//! - `key_pool`: immutable API key pool with atomic round-robin cursor
//! - `openai`: OpenAI-compatible Chat Completions implementation

mod key_pool;
mod openai;

pub use key_pool::KeyPool;
pub use openai::OpenAiProvider;

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use crate::types::{ChatMessage, LensError, Result};

/// JSON Schema declaration of a callable tool, sent with every chat request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolSchema {
    pub name: String,
    pub description: String,
    /// JSON Schema for the tool's arguments object
    pub parameters: Value,
}

/// Shared provider handle for concurrent use across pipeline stages
pub type SharedProvider = Arc<dyn ChatProvider>;

/// One conversational turn against an LLM chat API
#[async_trait]
pub trait ChatProvider: Send + Sync {
    /// Send the transcript and tool declarations; returns the assistant's
    /// reply. Cancelling `cancel` aborts the in-flight request only.
    async fn chat(
        &self,
        messages: &[ChatMessage],
        tools: &[ToolSchema],
        cancel: &CancellationToken,
    ) -> Result<ChatMessage>;

    /// Provider name for logging
    fn name(&self) -> &str;

    /// Model name currently in use
    fn model(&self) -> &str;
}

// =============================================================================
// Provider Configuration
// =============================================================================

/// Configuration for LLM providers
///
/// API keys are redacted in debug output and never serialized; each provider
/// draws keys from a shared [`KeyPool`] at construction.
#[derive(Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Provider type: currently "openai" (any OpenAI-compatible endpoint)
    pub provider: String,
    /// Model name (provider-specific)
    pub model: Option<String>,
    /// One or more API keys, drawn round-robin per agent construction
    #[serde(default, skip_serializing)]
    pub api_keys: Vec<String>,
    /// API base URL (for custom endpoints)
    #[serde(default)]
    pub api_base: Option<String>,
    /// Request timeout in seconds
    pub timeout_secs: u64,
    /// Temperature for generation (0.0 = deterministic)
    pub temperature: f32,
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("provider", &self.provider)
            .field("model", &self.model)
            .field("api_keys", &format!("[{} REDACTED]", self.api_keys.len()))
            .field("api_base", &self.api_base)
            .field("timeout_secs", &self.timeout_secs)
            .field("temperature", &self.temperature)
            .finish()
    }
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            provider: "openai".to_string(),
            model: None,
            api_keys: Vec::new(),
            api_base: None,
            timeout_secs: crate::constants::network::DEFAULT_TIMEOUT_SECS,
            temperature: 0.0,
        }
    }
}

/// Create a shared provider from configuration, drawing one key from `pool`
pub fn create_provider(config: &ProviderConfig, pool: &KeyPool) -> Result<SharedProvider> {
    match config.provider.as_str() {
        "openai" => Ok(Arc::new(OpenAiProvider::new(config, pool.next_key())?)),
        _ => Err(LensError::Config(format!(
            "Unknown provider: {}. Supported: openai",
            config.provider
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_config_debug_redacts_keys() {
        let config = ProviderConfig {
            api_keys: vec!["sk-secret".to_string()],
            ..Default::default()
        };
        let debug = format!("{:?}", config);
        assert!(!debug.contains("sk-secret"));
        assert!(debug.contains("REDACTED"));
    }

    #[test]
    fn test_create_provider_unknown() {
        let pool = KeyPool::new(vec!["k".into()]).unwrap();
        let config = ProviderConfig {
            provider: "mystery".to_string(),
            ..Default::default()
        };
        assert!(create_provider(&config, &pool).is_err());
    }
}
