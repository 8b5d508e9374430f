//! Configuration Types
//!
//! All configuration structures with sensible defaults.
//! Supports global (~/.config/repolens/) and project (.repolens/) level
//! configuration.

use serde::{Deserialize, Serialize};

use crate::constants::{pipeline, session};
use crate::llm::ProviderConfig;
use crate::types::{LensError, Result};

/// Root configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Configuration version
    pub version: String,

    /// LLM provider settings
    pub llm: ProviderConfig,

    /// Analysis pipeline settings
    pub pipeline: PipelineConfig,

    /// Session management settings
    pub session: SessionConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: "1.0".to_string(),
            llm: ProviderConfig::default(),
            pipeline: PipelineConfig::default(),
            session: SessionConfig::default(),
        }
    }
}

impl Config {
    /// Validate configuration values are within acceptable ranges
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=2.0).contains(&self.llm.temperature) {
            return Err(LensError::Config(format!(
                "LLM temperature must be between 0.0 and 2.0, got {}",
                self.llm.temperature
            )));
        }

        if self.llm.timeout_secs == 0 {
            return Err(LensError::Config(
                "LLM timeout_secs must be greater than 0".to_string(),
            ));
        }

        if self.pipeline.writer_concurrency == 0 {
            return Err(LensError::Config(
                "pipeline writer_concurrency must be greater than 0".to_string(),
            ));
        }

        if self.session.max_sessions == 0 {
            return Err(LensError::Config(
                "session max_sessions must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}

// =============================================================================
// Pipeline Configuration
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Cache-key discriminator for analysis runs
    pub analysis_type: String,

    /// Language documents are written in
    pub language: String,

    /// Secondary language documents are translated into, if any
    pub translate_to: Option<String>,

    /// Concurrent document-writing agents
    pub writer_concurrency: usize,

    /// TTL for cached analysis results, in seconds
    pub cache_ttl_secs: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            analysis_type: "full".to_string(),
            language: "en".to_string(),
            translate_to: None,
            writer_concurrency: pipeline::WRITER_CONCURRENCY,
            cache_ttl_secs: pipeline::RESULT_TTL_SECS,
        }
    }
}

// =============================================================================
// Session Configuration
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Maximum live sessions; the oldest is evicted beyond this
    pub max_sessions: usize,

    /// Inactivity timeout before a session is garbage-collected, in seconds
    pub idle_timeout_secs: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            max_sessions: session::MAX_SESSIONS,
            idle_timeout_secs: session::IDLE_TIMEOUT_SECS,
        }
    }
}
