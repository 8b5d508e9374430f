//! Progress Reporting
//!
//! The pipeline reports coarse stage checkpoints through a `ProgressSink`;
//! what happens to those reports is the caller's choice. The `ProgressStore`
//! implementation keeps the latest record per repository behind a TTL so an
//! external poller can observe a run; the CLI renders reports directly.
//!
//! Percentages are a user-facing heartbeat, not a measurement. Failed runs
//! keep their record (marked failed) so pollers see the terminal state
//! instead of a vanished entry.

use std::time::{Duration, Instant};

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

use crate::constants::progress::RECORD_TTL_SECS;

/// Lifecycle status of one analysis run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisStatus {
    Pending,
    Analyzing,
    Completed,
    Failed,
}

/// Latest observed state of one run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisProgress {
    pub stage: String,
    /// Checkpoint percentage, 0 to 100
    pub progress: u8,
    pub details: Option<String>,
    pub status: AnalysisStatus,
}

/// Receives stage checkpoints from a running pipeline.
/// Calls are synchronous and must be cheap; they happen on the hot path.
pub trait ProgressSink: Send + Sync {
    fn on_progress(&self, stage: &str, progress: u8, details: Option<&str>);

    fn on_status(&self, _status: AnalysisStatus) {}

    /// Terminal failure with a human-readable reason. The record is marked
    /// failed and retained, never deleted, so pollers observe the outcome.
    fn on_failed(&self, details: &str) {
        let _ = details;
        self.on_status(AnalysisStatus::Failed);
    }
}

/// Sink that drops every report
#[derive(Debug, Default)]
pub struct NullSink;

impl ProgressSink for NullSink {
    fn on_progress(&self, _stage: &str, _progress: u8, _details: Option<&str>) {}
}

// =============================================================================
// TTL'd Store
// =============================================================================

struct Record {
    progress: AnalysisProgress,
    written_at: Instant,
}

/// Latest progress per repository URL, expired lazily on read
pub struct ProgressStore {
    records: DashMap<String, Record>,
    ttl: Duration,
}

impl Default for ProgressStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressStore {
    pub fn new() -> Self {
        Self::with_ttl(Duration::from_secs(RECORD_TTL_SECS))
    }

    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            records: DashMap::new(),
            ttl,
        }
    }

    /// A sink scoped to one repository's record in this store
    pub fn sink_for(self: &Arc<Self>, repository_url: impl Into<String>) -> ScopedSink {
        ScopedSink {
            store: Arc::clone(self),
            repository_url: repository_url.into(),
        }
    }

    pub fn get(&self, repository_url: &str) -> Option<AnalysisProgress> {
        let entry = self.records.get(repository_url)?;
        if entry.written_at.elapsed() >= self.ttl {
            drop(entry);
            self.records.remove(repository_url);
            return None;
        }
        Some(entry.progress.clone())
    }

    pub fn set(&self, repository_url: &str, progress: AnalysisProgress) {
        self.records.insert(
            repository_url.to_string(),
            Record {
                progress,
                written_at: Instant::now(),
            },
        );
    }

    fn update(&self, repository_url: &str, f: impl FnOnce(&mut AnalysisProgress)) {
        let mut entry = self
            .records
            .entry(repository_url.to_string())
            .or_insert_with(|| Record {
                progress: AnalysisProgress {
                    stage: String::new(),
                    progress: 0,
                    details: None,
                    status: AnalysisStatus::Pending,
                },
                written_at: Instant::now(),
            });
        f(&mut entry.progress);
        entry.written_at = Instant::now();
    }
}

/// `ProgressSink` bound to one repository's record
pub struct ScopedSink {
    store: Arc<ProgressStore>,
    repository_url: String,
}

impl ProgressSink for ScopedSink {
    fn on_progress(&self, stage: &str, progress: u8, details: Option<&str>) {
        debug!(
            "Progress {} {}% ({})",
            self.repository_url,
            progress,
            stage
        );
        self.store.update(&self.repository_url, |record| {
            record.stage = stage.to_string();
            record.progress = progress.min(100);
            record.details = details.map(str::to_string);
            if record.status == AnalysisStatus::Pending {
                record.status = AnalysisStatus::Analyzing;
            }
        });
    }

    fn on_status(&self, status: AnalysisStatus) {
        self.store.update(&self.repository_url, |record| {
            record.status = status;
        });
    }

    fn on_failed(&self, details: &str) {
        self.store.update(&self.repository_url, |record| {
            record.status = AnalysisStatus::Failed;
            record.details = Some(details.to_string());
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scoped_sink_writes_through() {
        let store = Arc::new(ProgressStore::new());
        let sink = store.sink_for("https://example.com/repo");

        sink.on_progress("overview", 30, Some("scanning modules"));

        let record = store.get("https://example.com/repo").unwrap();
        assert_eq!(record.stage, "overview");
        assert_eq!(record.progress, 30);
        assert_eq!(record.status, AnalysisStatus::Analyzing);
    }

    #[test]
    fn test_failed_record_is_retained() {
        let store = Arc::new(ProgressStore::new());
        let sink = store.sink_for("repo");

        sink.on_progress("dependencies", 40, None);
        sink.on_failed("stage dependencies: no JSON object found");

        let record = store.get("repo").unwrap();
        assert_eq!(record.status, AnalysisStatus::Failed);
        assert_eq!(record.progress, 40);
        assert!(record.details.unwrap().contains("dependencies"));
    }

    #[test]
    fn test_expired_record_disappears() {
        let store = Arc::new(ProgressStore::with_ttl(Duration::from_millis(0)));
        let sink = store.sink_for("repo");
        sink.on_progress("overview", 10, None);

        assert!(store.get("repo").is_none());
    }

    #[test]
    fn test_progress_clamped_to_100() {
        let store = Arc::new(ProgressStore::new());
        let sink = store.sink_for("repo");
        sink.on_progress("publishing", 250, None);

        assert_eq!(store.get("repo").unwrap().progress, 100);
    }
}
