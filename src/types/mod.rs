pub mod analysis;
pub mod chat;
pub mod error;

pub use analysis::{
    AnalysisResult, CoreFeature, CoreFeatures, DependencyGraph, DocOutcome, DocTask,
    EntryCandidate, GraphEdge, Hotspot, ModuleEntry, ProjectOverview, TechStackEntry,
};
pub use chat::{AgentResult, ChatMessage, Role, ToolCall, transcript_is_correlated};
pub use error::{ErrorCategory, LensError, ProviderError, Result};

// =============================================================================
// Domain Newtypes
// =============================================================================

use std::fmt;

/// Type-safe wrapper for session IDs
///
/// Prevents accidental mixing of session IDs with other string types.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SessionId(String);

impl SessionId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for SessionId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for SessionId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}
