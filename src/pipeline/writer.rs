//! Document-Writing Fan-Out
//!
//! Runs one writer agent per scheduled document, at most
//! `writer_concurrency` in flight at once. Every task's failure is caught
//! inside its own future and reported as a `DocOutcome`; one bad task never
//! aborts the batch and the batch is fully awaited before assembly.
//!
//! Each written document is immediately translated by a tool-free agent when
//! a translation language is configured; both language variants are saved as
//! drafts under the same document name.

use futures::StreamExt;
use futures::stream;
use tracing::{info, warn};

use super::RunContext;
use super::prompts;
use crate::agent::ExecuteOptions;
use crate::types::{DocOutcome, DocTask, LensError, Result};

/// Sidebar document name; leading underscore keeps it out of task-name space
pub const SIDEBAR_DOC_NAME: &str = "_sidebar";

/// Write every scheduled document concurrently and collect all outcomes.
/// Completion order is arbitrary; outcomes are re-sorted to task order.
pub async fn write_documents(ctx: &RunContext, tasks: &[DocTask]) -> Vec<DocOutcome> {
    let concurrency = ctx.writer_concurrency.max(1);

    let mut outcomes: Vec<DocOutcome> = stream::iter(tasks.iter().cloned())
        .map(|task| async move {
            let doc_name = task.doc_name();
            match write_one(ctx, &task).await {
                Ok(()) => {
                    info!("Document '{}' written", doc_name);
                    DocOutcome {
                        title: task.title,
                        doc_name,
                        success: true,
                        error: None,
                    }
                }
                Err(e) => {
                    warn!("Document '{}' failed: {}", doc_name, e);
                    DocOutcome {
                        title: task.title,
                        doc_name,
                        success: false,
                        error: Some(e.to_string()),
                    }
                }
            }
        })
        .buffer_unordered(concurrency)
        .collect()
        .await;

    let order: Vec<String> = tasks.iter().map(DocTask::doc_name).collect();
    outcomes.sort_by_key(|o| order.iter().position(|n| n == &o.doc_name));
    outcomes
}

/// Write one document and its translation
async fn write_one(ctx: &RunContext, task: &DocTask) -> Result<()> {
    let doc_name = task.doc_name();

    let writer = ctx.agents.agent()?;
    let result = writer
        .execute(
            &prompts::writer_action(task),
            &prompts::writer_role(),
            ExecuteOptions::exploring(),
        )
        .await;

    if !result.success {
        return Err(LensError::stage(
            "writing",
            result
                .error
                .unwrap_or_else(|| "writer agent failed".to_string()),
        ));
    }

    ctx.docs
        .save_doc(
            &ctx.project_key,
            &doc_name,
            &ctx.primary_language,
            &result.content,
        )
        .await?;

    if let Some(language) = &ctx.translate_to {
        let translated = translate(ctx, &result.content, language).await?;
        ctx.docs
            .save_doc(&ctx.project_key, &doc_name, language, &translated)
            .await?;
    }

    Ok(())
}

/// Tool-free translation pass over a finished document
async fn translate(ctx: &RunContext, document: &str, language: &str) -> Result<String> {
    let translator = ctx.agents.agent()?;
    let result = translator
        .execute(
            &prompts::translator_action(document),
            &prompts::translator_role(language),
            ExecuteOptions::text_only(),
        )
        .await;

    if !result.success {
        return Err(LensError::stage(
            "translation",
            result
                .error
                .unwrap_or_else(|| "translator agent failed".to_string()),
        ));
    }

    Ok(result.content)
}

/// Literal Markdown link list over the successfully written documents
pub fn build_sidebar(outcomes: &[DocOutcome]) -> String {
    let mut sidebar = String::from("# Documentation\n\n");
    for outcome in outcomes.iter().filter(|o| o.success) {
        sidebar.push_str(&format!("- [{}]({})\n", outcome.title, outcome.doc_name));
    }
    sidebar
}

/// Persist the sidebar for every configured language
pub async fn save_sidebar(ctx: &RunContext, outcomes: &[DocOutcome]) -> Result<()> {
    let sidebar = build_sidebar(outcomes);

    ctx.docs
        .save_doc(
            &ctx.project_key,
            SIDEBAR_DOC_NAME,
            &ctx.primary_language,
            &sidebar,
        )
        .await?;

    if let Some(language) = &ctx.translate_to {
        ctx.docs
            .save_doc(&ctx.project_key, SIDEBAR_DOC_NAME, language, &sidebar)
            .await?;
    }

    Ok(())
}
