//! Analyze Command
//!
//! Wires the run context together (provider, tools, stores, progress
//! rendering) and drives one full analysis of a local repository checkout.

use std::env;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use console::style;
use tokio::runtime::Runtime;
use tokio_util::sync::CancellationToken;

use crate::cli::progress::{ConsoleProgress, TeeSink};
use crate::cli::tools::default_registry;
use crate::config::{Config, ConfigLoader};
use crate::llm::KeyPool;
use crate::pipeline::{AnalysisPipeline, ProviderAgentSource, RunContext};
use crate::progress::ProgressStore;
use crate::session::SessionManager;
use crate::store::{MemoryCache, MemoryDocStore};
use crate::types::{AnalysisResult, LensError, Result};

pub struct AnalyzeOptions {
    pub path: PathBuf,
    /// Repository URL used for cache and progress keys; defaults to the path
    pub url: Option<String>,
    pub model: Option<String>,
    pub translate_to: Option<String>,
    pub quiet: bool,
}

pub fn run(opts: AnalyzeOptions) -> Result<()> {
    let mut config = ConfigLoader::load()?;
    apply_overrides(&mut config, &opts);

    let repo_root = opts
        .path
        .canonicalize()
        .map_err(|e| LensError::Config(format!("repository path '{}': {}", opts.path.display(), e)))?;

    let repository_url = opts
        .url
        .clone()
        .unwrap_or_else(|| format!("file://{}", repo_root.display()));

    let project_key = repo_root
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("project")
        .to_string();

    let keys = resolve_api_keys(&config)?;

    let registry = Arc::new(default_registry(&repo_root));
    let cancel = CancellationToken::new();
    let agents = Arc::new(ProviderAgentSource::new(
        config.llm.clone(),
        keys,
        registry,
        repo_root.clone(),
        cancel,
    ));

    let progress_store = Arc::new(ProgressStore::new());
    let progress = Arc::new(TeeSink::new(vec![
        Box::new(ConsoleProgress::new(opts.quiet)),
        Box::new(progress_store.sink_for(repository_url.clone())),
    ]));

    let docs = Arc::new(MemoryDocStore::new());
    let ctx = RunContext {
        repository_url,
        repository_path: repo_root,
        analysis_type: config.pipeline.analysis_type.clone(),
        project_key: project_key.clone(),
        primary_language: config.pipeline.language.clone(),
        translate_to: config.pipeline.translate_to.clone(),
        writer_concurrency: config.pipeline.writer_concurrency,
        cache_ttl: Duration::from_secs(config.pipeline.cache_ttl_secs),
        agents,
        cache: Arc::new(MemoryCache::new()),
        docs: docs.clone(),
        progress,
        sessions: Arc::new(SessionManager::with_limits(
            config.session.max_sessions,
            config.session.idle_timeout_secs,
        )),
    };

    let pipeline = AnalysisPipeline::new(ctx);
    let runtime = Runtime::new()?;
    let result = runtime.block_on(pipeline.run())?;

    runtime.block_on(print_summary(&result, &docs, &project_key))?;
    Ok(())
}

fn apply_overrides(config: &mut Config, opts: &AnalyzeOptions) {
    if let Some(model) = &opts.model {
        config.llm.model = Some(model.clone());
    }
    if let Some(language) = &opts.translate_to {
        config.pipeline.translate_to = Some(language.clone());
    }
}

/// Keys come from config or, failing that, the conventional env var
fn resolve_api_keys(config: &Config) -> Result<KeyPool> {
    let mut keys = config.llm.api_keys.clone();
    if keys.is_empty()
        && let Ok(key) = env::var("OPENAI_API_KEY")
    {
        keys.push(key);
    }
    if keys.is_empty() {
        return Err(LensError::Config(
            "no API key configured; set llm.api_keys or OPENAI_API_KEY".to_string(),
        ));
    }
    KeyPool::new(keys)
}

async fn print_summary(
    result: &AnalysisResult,
    docs: &Arc<MemoryDocStore>,
    project_key: &str,
) -> Result<()> {
    use crate::store::DocumentStore;

    println!();
    println!(
        "{} {} documents written ({} scheduled)",
        style("Summary:").bold(),
        result.documents_written(),
        result.documents.len()
    );
    for doc in &result.documents {
        let mark = if doc.success {
            style("✓").green()
        } else {
            style("✗").red()
        };
        println!("  {} {}", mark, doc.title);
        if let Some(error) = &doc.error {
            println!("      {}", style(error).dim());
        }
    }

    let published = docs.list_published(project_key).await?;
    println!(
        "{} {} published artifacts under '{}'",
        style("Published:").bold(),
        published.len(),
        project_key
    );
    Ok(())
}
