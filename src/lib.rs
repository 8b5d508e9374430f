//! RepoLens - Agent-Driven Repository Analysis
//!
//! Analyzes a source repository by driving an LLM agent through a bounded
//! tool-calling loop, then runs a five-stage pipeline that turns raw
//! repository access into a project overview, a dependency graph, a ranked
//! feature list, and a published set of Markdown documents.
//!
//! ## Core Features
//!
//! - **Bounded Agent Loop**: transcript-driven tool-calling with an
//!   iteration ceiling and a pluggable continuation oracle
//! - **Five-Stage Pipeline**: overview → dependencies → core features →
//!   planning/scheduling/writing → assembly/publishing
//! - **Bounded Fan-Out**: concurrent per-document writing with isolated
//!   task failures
//! - **Result Caching**: TTL'd short-circuit keyed by repository and
//!   analysis type
//!
//! ## Quick Start
//!
//! ```ignore
//! use repolens::pipeline::{AnalysisPipeline, RunContext};
//!
//! let pipeline = AnalysisPipeline::new(ctx);
//! let result = pipeline.run().await?;
//! println!("{} documents written", result.documents_written());
//! ```
//!
//! ## Modules
//!
//! - [`agent`]: the conversation/tool-call loop and its continuation oracle
//! - [`llm`]: provider abstraction, key pool, OpenAI-compatible client
//! - [`pipeline`]: the stage orchestrator, prompts, and writing fan-out
//! - [`tools`]: tool registry contracts consumed by the agent
//! - [`store`]: document store and result cache seams
//! - [`session`], [`progress`]: run-scoped bookkeeping and heartbeats

pub mod agent;
pub mod cli;
pub mod config;
pub mod constants;
pub mod extract;
pub mod llm;
pub mod pipeline;
pub mod progress;
pub mod session;
pub mod store;
pub mod tools;
pub mod types;

// =============================================================================
// Core Re-exports
// =============================================================================

// Configuration
pub use config::{Config, ConfigLoader, PipelineConfig, SessionConfig};

// Error Types
pub use types::{ErrorCategory, LensError, ProviderError, Result};

// =============================================================================
// Pipeline Re-exports
// =============================================================================

pub use pipeline::{
    AnalysisPipeline, AgentSource, PipelineStage, ProviderAgentSource, RunContext, cache_key,
};
pub use types::{AnalysisResult, CoreFeatures, DependencyGraph, DocTask, ProjectOverview};

// =============================================================================
// Agent Re-exports
// =============================================================================

pub use agent::{Agent, ContinuationOracle, ExecuteOptions, HeuristicOracle, ModelOracle};
pub use extract::{extract_json, extract_typed, extract_typed_with_reprompt};
pub use llm::{ChatProvider, KeyPool, ProviderConfig, SharedProvider, ToolSchema, create_provider};
pub use tools::{StaticRegistry, Tool, ToolOutput, ToolRegistry};
