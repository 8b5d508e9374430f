//! Unified Error Type System
//!
//! Centralized error types for the entire application.
//! Provider errors carry a category so callers can distinguish failures that
//! the agent loop may absorb from failures that must end a pipeline stage.
//!
//! ## Error Categories
//!
//! - **RateLimit**: API rate limiting (absorbable inside the loop)
//! - **Auth**: Authentication failures (fail fast)
//! - **Network**: Connectivity issues
//! - **Unavailable**: Provider unavailable
//! - **BadRequest**: Invalid request payload
//!
//! ## Design Principles
//!
//! - Single unified error type (LensError) for the entire application
//! - Structured error variants with context for better debugging
//! - No panic/unwrap - all errors are recoverable

use thiserror::Error;

// =============================================================================
// Error Categories
// =============================================================================

/// Categories for provider-level failures
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Rate limited by the provider
    RateLimit,
    /// Authentication failed - fail fast, don't retry
    Auth,
    /// Network/connectivity issues
    Network,
    /// Provider unavailable (5xx, not found)
    Unavailable,
    /// Invalid request - don't retry, fix request
    BadRequest,
    /// Unknown error
    Unknown,
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::RateLimit => write!(f, "RATE_LIMIT"),
            Self::Auth => write!(f, "AUTH"),
            Self::Network => write!(f, "NETWORK"),
            Self::Unavailable => write!(f, "UNAVAILABLE"),
            Self::BadRequest => write!(f, "BAD_REQUEST"),
            Self::Unknown => write!(f, "UNKNOWN"),
        }
    }
}

impl ErrorCategory {
    /// Whether the agent loop may keep iterating after this failure.
    /// Auth and malformed requests will not resolve by retrying.
    pub fn is_absorbable(&self) -> bool {
        matches!(
            self,
            Self::RateLimit | Self::Network | Self::Unavailable | Self::Unknown
        )
    }

    /// Classify an HTTP status code from a chat API
    pub fn from_http_status(status: u16) -> Self {
        match status {
            429 => Self::RateLimit,
            401 | 403 => Self::Auth,
            400 => Self::BadRequest,
            404 => Self::Unavailable,
            500..=599 => Self::Unavailable,
            _ => Self::Unknown,
        }
    }
}

// =============================================================================
// Provider Error
// =============================================================================

/// Structured provider error with category and provider context
#[derive(Debug, Clone)]
pub struct ProviderError {
    /// Error category for routing decisions
    pub category: ErrorCategory,
    /// Detailed error message
    pub message: String,
    /// Provider that produced the error
    pub provider: Option<String>,
}

impl std::fmt::Display for ProviderError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(provider) = &self.provider {
            write!(f, "[{}:{}] {}", provider, self.category, self.message)
        } else {
            write!(f, "[{}] {}", self.category, self.message)
        }
    }
}

impl std::error::Error for ProviderError {}

impl ProviderError {
    pub fn new(category: ErrorCategory, message: impl Into<String>) -> Self {
        Self {
            category,
            message: message.into(),
            provider: None,
        }
    }

    pub fn with_provider(
        category: ErrorCategory,
        message: impl Into<String>,
        provider: impl Into<String>,
    ) -> Self {
        Self {
            category,
            message: message.into(),
            provider: Some(provider.into()),
        }
    }

    /// Create from simple message (defaults to Unknown category)
    pub fn from_message(message: impl Into<String>) -> Self {
        Self::new(ErrorCategory::Unknown, message)
    }

    pub fn is_absorbable(&self) -> bool {
        self.category.is_absorbable()
    }
}

// =============================================================================
// Application Error
// =============================================================================

#[derive(Debug, Error)]
pub enum LensError {
    // -------------------------------------------------------------------------
    // System Errors (auto From impl)
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // -------------------------------------------------------------------------
    // LLM Errors
    // -------------------------------------------------------------------------
    /// Structured provider error with category
    #[error("Provider error: {0}")]
    Provider(ProviderError),

    /// No JSON object could be recovered from model output
    #[error("Malformed model output: {0}")]
    MalformedOutput(String),

    // -------------------------------------------------------------------------
    // Agent / Pipeline Errors
    // -------------------------------------------------------------------------
    /// A pipeline stage failed; fatal to the run
    #[error("Stage '{stage}' failed: {message}")]
    Stage { stage: String, message: String },

    /// In-flight operation cancelled via its abort signal
    #[error("Cancelled: {0}")]
    Cancelled(String),

    // -------------------------------------------------------------------------
    // Domain Errors
    // -------------------------------------------------------------------------
    #[error("Config error: {0}")]
    Config(String),
}

impl From<ProviderError> for LensError {
    fn from(err: ProviderError) -> Self {
        LensError::Provider(err)
    }
}

pub type Result<T> = std::result::Result<T, LensError>;

// =============================================================================
// Helper Functions
// =============================================================================

impl LensError {
    /// Create a stage failure
    pub fn stage(stage: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Stage {
            stage: stage.into(),
            message: message.into(),
        }
    }

    /// Create a provider error from message (convenience wrapper)
    pub fn provider(message: impl Into<String>) -> Self {
        Self::Provider(ProviderError::from_message(message))
    }

    /// Whether the agent loop may swallow this error and keep iterating
    pub fn is_absorbable(&self) -> bool {
        match self {
            Self::Provider(e) => e.is_absorbable(),
            _ => false,
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
