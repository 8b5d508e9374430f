//! Pipeline Artifact Types
//!
//! Structured outputs extracted from model text at each pipeline stage.
//! Stage 1 produces `ProjectOverview`, Stage 2 `DependencyGraph`, Stage 3
//! `CoreFeatures`; Stage 4 fans out one `DocTask` per document and reports a
//! `DocOutcome` per task. `AnalysisResult` is the cached terminal artifact.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// =============================================================================
// Stage 1: Project Overview
// =============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProjectOverview {
    #[serde(default)]
    pub modules: Vec<ModuleEntry>,
    #[serde(default)]
    pub tech_stack: Vec<TechStackEntry>,
    #[serde(default)]
    pub entry_candidates: Vec<EntryCandidate>,
    #[serde(default)]
    pub notes: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModuleEntry {
    pub path: String,
    pub role: String,
    #[serde(default)]
    pub examples: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TechStackEntry {
    /// Category: language, framework, build, storage, ...
    #[serde(rename = "type")]
    pub kind: String,
    pub name: String,
    #[serde(default)]
    pub evidence: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntryCandidate {
    pub path: String,
    pub why: String,
}

// =============================================================================
// Stage 2: Dependency Graph
// =============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DependencyGraph {
    #[serde(default)]
    pub module_graph: Vec<GraphEdge>,
    #[serde(default)]
    pub call_graph: Vec<GraphEdge>,
    #[serde(default)]
    pub hotspots: Vec<Hotspot>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphEdge {
    pub from: String,
    pub to: String,
}

/// Symbol the model ranked by combined fan-in and fan-out.
/// The ordering is advisory; nothing downstream depends on it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Hotspot {
    pub symbol: String,
    #[serde(default)]
    pub fan_in: u32,
    #[serde(default)]
    pub fan_out: u32,
    #[serde(default)]
    pub files: Vec<String>,
}

// =============================================================================
// Stage 3: Core Features
// =============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CoreFeatures {
    #[serde(default)]
    pub features: Vec<CoreFeature>,
    /// Descriptive text about how the model ranked features. Never enforced;
    /// the pipeline sorts by `importance` itself before fan-out.
    #[serde(default)]
    pub ranking_rule: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoreFeature {
    /// Join key for Stage-4 fan-out
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub why_core: String,
    #[serde(default)]
    pub importance: f32,
    #[serde(default)]
    pub evidence: Vec<String>,
    #[serde(default)]
    pub entry_points: Vec<String>,
    #[serde(default)]
    pub primary_modules: Vec<String>,
    #[serde(default)]
    pub key_symbols: Vec<String>,
}

impl CoreFeatures {
    /// Sort features by importance descending. The `ranking_rule` text stays
    /// advisory; this is the ordering the writer fan-out actually uses.
    pub fn sorted_by_importance(mut self) -> Self {
        self.features
            .sort_by(|a, b| b.importance.total_cmp(&a.importance));
        self
    }
}

// =============================================================================
// Stage 4: Document Tasks
// =============================================================================

/// One scheduled document, produced by the scheduler agent
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocTask {
    pub title: String,
    #[serde(default)]
    pub goal: String,
    #[serde(default)]
    pub outline: Vec<String>,
    #[serde(default)]
    pub target_reader: String,
}

impl DocTask {
    /// The synthetic task prepended to every schedule
    pub fn overview() -> Self {
        Self {
            title: "Overview".to_string(),
            goal: "Orient a new reader: what the project does, how it is structured, and where to start reading".to_string(),
            outline: vec![
                "Purpose".to_string(),
                "Architecture".to_string(),
                "Key modules".to_string(),
                "Getting started".to_string(),
            ],
            target_reader: "Developers new to the codebase".to_string(),
        }
    }

    /// Stable document name derived from the title
    pub fn doc_name(&self) -> String {
        let slug: String = self
            .title
            .to_lowercase()
            .chars()
            .map(|c| if c.is_alphanumeric() { c } else { '-' })
            .collect();
        let mut out = String::with_capacity(slug.len());
        for part in slug.split('-').filter(|p| !p.is_empty()) {
            if !out.is_empty() {
                out.push('-');
            }
            out.push_str(part);
        }
        out
    }
}

/// Per-task outcome of the writing fan-out. Failures are isolated; the batch
/// reports every outcome instead of aborting on the first error.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocOutcome {
    pub title: String,
    pub doc_name: String,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

// =============================================================================
// Terminal Artifact
// =============================================================================

/// Complete result of one analysis run; serialized into the cache
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub repository_url: String,
    pub analysis_type: String,
    pub overview: ProjectOverview,
    pub dependency_graph: DependencyGraph,
    pub core_features: CoreFeatures,
    pub documents: Vec<DocOutcome>,
    pub generated_at: DateTime<Utc>,
}

impl AnalysisResult {
    /// Count of documents that persisted successfully
    pub fn documents_written(&self) -> usize {
        self.documents.iter().filter(|d| d.success).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feature(id: &str, importance: f32) -> CoreFeature {
        CoreFeature {
            id: id.to_string(),
            name: id.to_string(),
            why_core: String::new(),
            importance,
            evidence: vec![],
            entry_points: vec![],
            primary_modules: vec![],
            key_symbols: vec![],
        }
    }

    #[test]
    fn test_sorted_by_importance() {
        let features = CoreFeatures {
            features: vec![feature("low", 0.2), feature("high", 0.9), feature("mid", 0.5)],
            ranking_rule: "model's own ordering".to_string(),
        };

        let sorted = features.sorted_by_importance();
        let ids: Vec<&str> = sorted.features.iter().map(|f| f.id.as_str()).collect();
        assert_eq!(ids, vec!["high", "mid", "low"]);
    }

    #[test]
    fn test_doc_name_slug() {
        let task = DocTask {
            title: "HTTP API & Routing".to_string(),
            goal: String::new(),
            outline: vec![],
            target_reader: String::new(),
        };
        assert_eq!(task.doc_name(), "http-api-routing");
    }

    #[test]
    fn test_overview_task_title() {
        assert_eq!(DocTask::overview().title, "Overview");
        assert_eq!(DocTask::overview().doc_name(), "overview");
    }

    #[test]
    fn test_overview_tolerates_missing_fields() {
        let parsed: ProjectOverview = serde_json::from_str(r#"{"modules": []}"#).unwrap();
        assert!(parsed.tech_stack.is_empty());
        assert!(parsed.notes.is_empty());
    }

    #[test]
    fn test_analysis_result_roundtrip() {
        let result = AnalysisResult {
            repository_url: "https://example.com/repo.git".to_string(),
            analysis_type: "full".to_string(),
            overview: ProjectOverview::default(),
            dependency_graph: DependencyGraph::default(),
            core_features: CoreFeatures::default(),
            documents: vec![DocOutcome {
                title: "Overview".to_string(),
                doc_name: "overview".to_string(),
                success: true,
                error: None,
            }],
            generated_at: Utc::now(),
        };

        let json = serde_json::to_string(&result).unwrap();
        let back: AnalysisResult = serde_json::from_str(&json).unwrap();
        assert_eq!(back.documents_written(), 1);
    }
}
