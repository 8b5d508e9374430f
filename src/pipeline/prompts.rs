//! Pipeline Prompts
//!
//! Builders for the role and action prompts of every pipeline stage. Stage
//! prompts that expect structured output embed the exact JSON shape so the
//! extractor has something to hold the model to.

use crate::types::{CoreFeatures, DependencyGraph, DocTask, ProjectOverview};

/// Shared role for the repository-facing analysis stages
pub fn analyst_role() -> String {
    "You are a senior software engineer analyzing an unfamiliar repository. \
     You read code with the available tools before making claims, cite file \
     paths as evidence, and answer with exactly the requested JSON shape."
        .to_string()
}

pub fn overview_action() -> String {
    "Explore this repository and produce a project overview.\n\
     \n\
     Identify:\n\
     - the major modules (path, role, representative files)\n\
     - the technology stack (type, name, evidence file)\n\
     - likely entry points (path, why)\n\
     \n\
     Respond with JSON only:\n\
     {\n\
       \"modules\": [{\"path\": \"...\", \"role\": \"...\", \"examples\": [\"...\"]}],\n\
       \"tech_stack\": [{\"type\": \"...\", \"name\": \"...\", \"evidence\": \"...\"}],\n\
       \"entry_candidates\": [{\"path\": \"...\", \"why\": \"...\"}],\n\
       \"notes\": \"...\"\n\
     }"
        .to_string()
}

pub fn dependencies_action(overview: &ProjectOverview) -> String {
    format!(
        "Using this project overview as your starting point, map the \
         repository's dependency structure.\n\
         \n\
         Overview:\n{}\n\
         \n\
         Produce module-level and call-level edges, and a hotspots list \
         ranked by combined fan-in and fan-out.\n\
         \n\
         Respond with JSON only:\n\
         {{\n\
           \"module_graph\": [{{\"from\": \"...\", \"to\": \"...\"}}],\n\
           \"call_graph\": [{{\"from\": \"...\", \"to\": \"...\"}}],\n\
           \"hotspots\": [{{\"symbol\": \"...\", \"fan_in\": 0, \"fan_out\": 0, \"files\": [\"...\"]}}]\n\
         }}",
        serde_json::to_string_pretty(overview).unwrap_or_default()
    )
}

pub fn core_features_action(overview: &ProjectOverview, graph: &DependencyGraph) -> String {
    format!(
        "Using the overview and dependency graph below, identify the core \
         features of this project and rank them by importance.\n\
         \n\
         Overview:\n{}\n\
         \n\
         Dependency graph:\n{}\n\
         \n\
         Importance is a number between 0 and 1. Cite evidence files for \
         each feature.\n\
         \n\
         Respond with JSON only:\n\
         {{\n\
           \"features\": [{{\n\
             \"id\": \"kebab-case-id\",\n\
             \"name\": \"...\",\n\
             \"why_core\": \"...\",\n\
             \"importance\": 0.9,\n\
             \"evidence\": [\"...\"],\n\
             \"entry_points\": [\"...\"],\n\
             \"primary_modules\": [\"...\"],\n\
             \"key_symbols\": [\"...\"]\n\
           }}],\n\
           \"ranking_rule\": \"...\"\n\
         }}",
        serde_json::to_string_pretty(overview).unwrap_or_default(),
        serde_json::to_string_pretty(graph).unwrap_or_default()
    )
}

pub fn planner_role() -> String {
    "You are a documentation architect. You design documentation sets that \
     take a reader from zero context to productive contribution."
        .to_string()
}

pub fn planner_action(features: &CoreFeatures) -> String {
    format!(
        "Plan a documentation set for this project. The identified core \
         features, most important first:\n{}\n\
         \n\
         Describe in prose which documents should exist, what each covers, \
         and who reads it. Do not write the documents yet.",
        serde_json::to_string_pretty(features).unwrap_or_default()
    )
}

pub fn scheduler_role() -> String {
    "You convert a documentation plan into a machine-readable task list. \
     You respond with JSON only, no commentary."
        .to_string()
}

pub fn scheduler_action(plan: &str) -> String {
    format!(
        "Convert this documentation plan into a task array.\n\
         \n\
         Plan:\n{}\n\
         \n\
         Respond with JSON only:\n\
         {{\n\
           \"tasks\": [{{\n\
             \"title\": \"...\",\n\
             \"goal\": \"...\",\n\
             \"outline\": [\"...\"],\n\
             \"target_reader\": \"...\"\n\
           }}]\n\
         }}",
        plan
    )
}

pub fn writer_role() -> String {
    "You are a technical writer embedded with the engineering team. You \
     verify claims against the actual code with the available tools and \
     write precise, example-driven Markdown."
        .to_string()
}

pub fn writer_action(task: &DocTask) -> String {
    let outline = if task.outline.is_empty() {
        "(author's choice)".to_string()
    } else {
        task.outline
            .iter()
            .map(|item| format!("- {}", item))
            .collect::<Vec<_>>()
            .join("\n")
    };

    format!(
        "Write the document \"{}\".\n\
         \n\
         Goal: {}\n\
         Target reader: {}\n\
         Outline:\n{}\n\
         \n\
         Ground every claim in the repository. Output the finished Markdown \
         document only, starting with a level-1 heading.",
        task.title, task.goal, task.target_reader, outline
    )
}

pub fn translator_role(language: &str) -> String {
    format!(
        "You are a professional technical translator. Translate Markdown \
         documents into {} while preserving all Markdown structure, code \
         blocks, and identifiers exactly. Output the translated document \
         only.",
        language
    )
}

pub fn translator_action(document: &str) -> String {
    format!("Translate this document:\n\n{}", document)
}

/// Follow-up sent when a structured reply failed extraction
pub fn reprompt_action(error: &str) -> String {
    format!(
        "Your previous reply could not be parsed as JSON: {}\n\
         Resend the complete answer as a single valid JSON object with no \
         surrounding prose or code fences.",
        error
    )
}
