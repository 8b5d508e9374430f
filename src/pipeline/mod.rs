//! Analysis Pipeline Orchestrator
//!
//! Drives one repository analysis as a state machine over pipeline stages:
//!
//! ```text
//! NotStarted -> Overview -> Dependencies -> CoreFeatures -> Planning
//!            -> Scheduling -> Writing(parallel) -> Assembling -> Published
//! ```
//!
//! `Failed` is reachable from every state; a stage failure aborts the
//! remaining stages rather than degrading to a partial result. Every
//! collaborator (agents, cache, document store, progress sink, sessions)
//! arrives through an explicit `RunContext` so runs share no hidden state.
//!
//! Before Stage 1 the orchestrator consults a result cache keyed by
//! `(repository_url, analysis_type)`; a hit skips the whole pipeline and
//! still emits the terminal progress event.

pub mod prompts;
pub mod writer;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use sha2::{Digest, Sha256};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::agent::{Agent, ExecuteOptions};
use crate::constants::pipeline::checkpoint;
use crate::extract::extract_typed_with_reprompt;
use crate::llm::{KeyPool, ProviderConfig};
use crate::progress::{AnalysisStatus, ProgressSink};
use crate::session::SessionManager;
use crate::store::{Cache, DocumentStore};
use crate::tools::ToolRegistry;
use crate::types::{
    AnalysisResult, ChatMessage, CoreFeatures, DependencyGraph, DocTask, LensError,
    ProjectOverview, Result, SessionId,
};

// =============================================================================
// Stages
// =============================================================================

/// Discrete phases of one analysis run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineStage {
    NotStarted,
    Overview,
    Dependencies,
    CoreFeatures,
    Planning,
    Scheduling,
    Writing,
    Assembling,
    Published,
    Failed,
}

impl PipelineStage {
    pub fn name(&self) -> &'static str {
        match self {
            Self::NotStarted => "starting",
            Self::Overview => "overview",
            Self::Dependencies => "dependencies",
            Self::CoreFeatures => "core_features",
            Self::Planning => "planning",
            Self::Scheduling => "scheduling",
            Self::Writing => "writing",
            Self::Assembling => "assembling",
            Self::Published => "published",
            Self::Failed => "failed",
        }
    }

    /// Heartbeat percentage emitted when the stage completes. Fixed values,
    /// not derived from actual work done.
    pub fn checkpoint(&self) -> u8 {
        match self {
            Self::NotStarted => checkpoint::STARTED,
            Self::Overview => checkpoint::OVERVIEW,
            Self::Dependencies => checkpoint::DEPENDENCIES,
            Self::CoreFeatures => checkpoint::CORE_FEATURES,
            Self::Planning => checkpoint::PLANNING,
            Self::Scheduling => checkpoint::SCHEDULING,
            Self::Writing | Self::Assembling => checkpoint::WRITING,
            Self::Published => checkpoint::PUBLISHED,
            Self::Failed => 0,
        }
    }
}

// =============================================================================
// Run Context
// =============================================================================

/// Produces a fresh agent per stage or writing task.
/// Each construction draws the next API key from the pool.
pub trait AgentSource: Send + Sync {
    fn agent(&self) -> Result<Agent>;
}

/// Production source backed by the configured LLM provider
pub struct ProviderAgentSource {
    config: ProviderConfig,
    keys: KeyPool,
    registry: Arc<dyn ToolRegistry>,
    repo_root: PathBuf,
    cancel: CancellationToken,
}

impl ProviderAgentSource {
    pub fn new(
        config: ProviderConfig,
        keys: KeyPool,
        registry: Arc<dyn ToolRegistry>,
        repo_root: PathBuf,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            config,
            keys,
            registry,
            repo_root,
            cancel,
        }
    }
}

impl AgentSource for ProviderAgentSource {
    fn agent(&self) -> Result<Agent> {
        Ok(
            Agent::new(&self.config, &self.keys, self.registry.clone(), &self.repo_root)?
                .with_cancellation(self.cancel.clone()),
        )
    }
}

/// Everything one analysis run needs, constructed per run.
/// No component reaches for process-wide state.
pub struct RunContext {
    pub repository_url: String,
    pub repository_path: PathBuf,
    /// Cache-key discriminator, e.g. "full" or "structural"
    pub analysis_type: String,
    /// Key under which documents are stored and published
    pub project_key: String,
    pub primary_language: String,
    pub translate_to: Option<String>,
    pub writer_concurrency: usize,
    /// How long a finished result stays in the cache
    pub cache_ttl: Duration,
    pub agents: Arc<dyn AgentSource>,
    pub cache: Arc<dyn Cache>,
    pub docs: Arc<dyn DocumentStore>,
    pub progress: Arc<dyn ProgressSink>,
    pub sessions: Arc<SessionManager>,
}

/// Stable cache key for one `(repository_url, analysis_type)` pair
pub fn cache_key(repository_url: &str, analysis_type: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(repository_url.as_bytes());
    hasher.update(b"::");
    hasher.update(analysis_type.as_bytes());
    format!("analysis:{:x}", hasher.finalize())
}

// =============================================================================
// Orchestrator
// =============================================================================

#[derive(Debug, Deserialize)]
struct TaskList {
    #[serde(default)]
    tasks: Vec<DocTask>,
}

pub struct AnalysisPipeline {
    ctx: RunContext,
}

impl AnalysisPipeline {
    pub fn new(ctx: RunContext) -> Self {
        Self { ctx }
    }

    pub fn context(&self) -> &RunContext {
        &self.ctx
    }

    /// Run the full analysis. The session created here is removed exactly
    /// once through the single cleanup point below, on every exit path.
    pub async fn run(&self) -> Result<AnalysisResult> {
        let key = cache_key(&self.ctx.repository_url, &self.ctx.analysis_type);

        // A broken cache backend is a terminal failure too; pollers must
        // still observe a failed record, not a stuck one
        let cached = match self.ctx.cache.get(&key).await {
            Ok(hit) => hit,
            Err(e) => {
                self.ctx.progress.on_failed(&e.to_string());
                return Err(e);
            }
        };

        if let Some(value) = cached {
            match serde_json::from_value::<AnalysisResult>(value) {
                Ok(cached) => {
                    info!("Cache hit for {}, skipping pipeline", self.ctx.repository_url);
                    self.emit(PipelineStage::Published, Some("result served from cache"));
                    self.ctx.progress.on_status(AnalysisStatus::Completed);
                    return Ok(cached);
                }
                Err(e) => warn!("Ignoring undecodable cache entry: {}", e),
            }
        }

        let session = self.ctx.sessions.create(
            self.ctx.repository_path.display().to_string(),
            format!(
                "{} analysis of {}",
                self.ctx.analysis_type, self.ctx.repository_url
            ),
        );

        let outcome = self.run_stages(&session, &key).await;

        // Single cleanup point covering success and failure
        self.ctx.sessions.end(&session);

        match outcome {
            Ok(result) => {
                self.ctx.progress.on_status(AnalysisStatus::Completed);
                Ok(result)
            }
            Err(e) => {
                self.ctx.progress.on_failed(&e.to_string());
                Err(e)
            }
        }
    }

    async fn run_stages(&self, session: &SessionId, key: &str) -> Result<AnalysisResult> {
        let ctx = &self.ctx;
        self.emit(PipelineStage::NotStarted, Some(&ctx.repository_url));

        let overview: ProjectOverview = self
            .structured_stage(
                session,
                PipelineStage::Overview,
                &prompts::analyst_role(),
                &prompts::overview_action(),
                true,
            )
            .await?;
        ctx.sessions.update_context(
            session,
            serde_json::json!({"stage": "overview", "modules": overview.modules.len()}),
        );
        self.emit(PipelineStage::Overview, None);

        let graph: DependencyGraph = self
            .structured_stage(
                session,
                PipelineStage::Dependencies,
                &prompts::analyst_role(),
                &prompts::dependencies_action(&overview),
                true,
            )
            .await?;
        self.emit(PipelineStage::Dependencies, None);

        let features: CoreFeatures = self
            .structured_stage::<CoreFeatures>(
                session,
                PipelineStage::CoreFeatures,
                &prompts::analyst_role(),
                &prompts::core_features_action(&overview, &graph),
                true,
            )
            .await?
            .sorted_by_importance();
        ctx.sessions.update_context(
            session,
            serde_json::json!({"stage": "core_features", "features": features.features.len()}),
        );
        self.emit(PipelineStage::CoreFeatures, None);

        let plan = self.plan(session, &features).await?;
        self.emit(PipelineStage::Planning, None);

        let tasks = self.schedule(session, &plan).await?;
        self.emit(
            PipelineStage::Scheduling,
            Some(&format!("{} documents scheduled", tasks.len())),
        );

        self.emit(PipelineStage::Writing, None);
        let documents = writer::write_documents(ctx, &tasks).await;

        self.emit(PipelineStage::Assembling, None);
        writer::save_sidebar(ctx, &documents).await?;
        let published = ctx.docs.publish(&ctx.project_key).await?;
        info!("Published {} documents for {}", published, ctx.project_key);

        let result = AnalysisResult {
            repository_url: ctx.repository_url.clone(),
            analysis_type: ctx.analysis_type.clone(),
            overview,
            dependency_graph: graph,
            core_features: features,
            documents,
            generated_at: Utc::now(),
        };

        ctx.cache
            .set(key, serde_json::to_value(&result)?, ctx.cache_ttl)
            .await?;

        self.emit(
            PipelineStage::Published,
            Some(&format!("{} documents published", result.documents_written())),
        );
        Ok(result)
    }

    /// One agent call expected to yield structured output, with bounded
    /// reprompting on extraction failure. The reprompt continues the same
    /// transcript so the model sees what it previously sent. The stage's
    /// transcript is recorded on the run's session.
    async fn structured_stage<T: DeserializeOwned>(
        &self,
        session: &SessionId,
        stage: PipelineStage,
        role: &str,
        action: &str,
        with_tools: bool,
    ) -> Result<T> {
        info!("Stage '{}' starting", stage.name());

        let agent = self.ctx.agents.agent()?;
        let mut opts = ExecuteOptions::structured();
        opts.with_tools = with_tools;

        let result = agent.execute(action, role, opts).await;
        self.ctx
            .sessions
            .record_turns(session, result.history.clone());
        if !result.success {
            return Err(LensError::stage(
                stage.name(),
                result
                    .error
                    .unwrap_or_else(|| "agent run failed".to_string()),
            ));
        }

        // Transcript minus its system seed; the retry call adds its own
        let history: Vec<ChatMessage> = result.history.iter().skip(1).cloned().collect();
        let agent_ref = &agent;
        let role = role.to_string();

        extract_typed_with_reprompt(&result.content, |err| {
            let history = history.clone();
            let role = role.clone();
            async move {
                let retry = agent_ref
                    .execute(
                        &prompts::reprompt_action(&err),
                        &role,
                        ExecuteOptions {
                            history,
                            with_env: false,
                            json_output: true,
                            with_tools: false,
                        },
                    )
                    .await;
                if retry.success {
                    Ok(retry.content)
                } else {
                    Err(LensError::stage(
                        "reprompt",
                        retry
                            .error
                            .unwrap_or_else(|| "reprompt run failed".to_string()),
                    ))
                }
            }
        })
        .await
        .map_err(|e| LensError::stage(stage.name(), e.to_string()))
    }

    /// Free-text documentation plan from the planner agent
    async fn plan(&self, session: &SessionId, features: &CoreFeatures) -> Result<String> {
        let agent = self.ctx.agents.agent()?;
        let result = agent
            .execute(
                &prompts::planner_action(features),
                &prompts::planner_role(),
                ExecuteOptions::exploring(),
            )
            .await;

        self.ctx
            .sessions
            .record_turns(session, result.history.clone());
        if result.success {
            Ok(result.content)
        } else {
            Err(LensError::stage(
                PipelineStage::Planning.name(),
                result
                    .error
                    .unwrap_or_else(|| "planner run failed".to_string()),
            ))
        }
    }

    /// Turn the plan into document tasks. The synthetic "Overview" task is
    /// always first; a scheduler task with the same name is dropped rather
    /// than duplicated.
    async fn schedule(&self, session: &SessionId, plan: &str) -> Result<Vec<DocTask>> {
        let list: TaskList = self
            .structured_stage(
                session,
                PipelineStage::Scheduling,
                &prompts::scheduler_role(),
                &prompts::scheduler_action(plan),
                false,
            )
            .await?;

        let overview = DocTask::overview();
        let overview_name = overview.doc_name();
        let mut tasks = vec![overview];
        tasks.extend(
            list.tasks
                .into_iter()
                .filter(|t| t.doc_name() != overview_name),
        );
        Ok(tasks)
    }

    fn emit(&self, stage: PipelineStage, details: Option<&str>) {
        self.ctx
            .progress
            .on_progress(stage.name(), stage.checkpoint(), details);
    }
}
