//! Document Store and Result Cache
//!
//! Persistence seams for the pipeline: documents go into a `DocumentStore`
//! as drafts and become visible atomically on `publish`; finished analysis
//! results go into a TTL'd `Cache` keyed by a repository fingerprint.
//!
//! Both traits ship with in-memory implementations used by the CLI and
//! tests; deployments with durable backends implement the same traits.

use std::collections::HashMap;

use async_trait::async_trait;
use dashmap::DashMap;
use serde_json::Value;
use std::time::{Duration, Instant};
use tracing::{debug, info};

use crate::types::Result;

/// Draft-then-publish storage for generated documents.
///
/// Saves land in a per-project draft set; `publish` replaces the project's
/// published set with the current drafts so readers never observe a
/// half-written generation.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn save_doc(
        &self,
        project_key: &str,
        doc_name: &str,
        language: &str,
        content: &str,
    ) -> Result<()>;

    /// Read from the published set only
    async fn get_doc(
        &self,
        project_key: &str,
        doc_name: &str,
        language: &str,
    ) -> Result<Option<String>>;

    /// Swap the draft set in as the published set, discarding the previous
    /// publication. Returns the number of documents now published.
    async fn publish(&self, project_key: &str) -> Result<usize>;

    /// Published `(doc_name, language)` pairs for a project
    async fn list_published(&self, project_key: &str) -> Result<Vec<(String, String)>>;
}

/// Expiring key-value store for finished analysis results
#[async_trait]
pub trait Cache: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Value>>;

    async fn set(&self, key: &str, value: Value, ttl: Duration) -> Result<()>;
}

// =============================================================================
// In-Memory Document Store
// =============================================================================

type DocSet = HashMap<(String, String), String>;

/// Process-local document store
#[derive(Default)]
pub struct MemoryDocStore {
    drafts: DashMap<String, DocSet>,
    published: DashMap<String, DocSet>,
}

impl MemoryDocStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DocumentStore for MemoryDocStore {
    async fn save_doc(
        &self,
        project_key: &str,
        doc_name: &str,
        language: &str,
        content: &str,
    ) -> Result<()> {
        debug!("Draft saved: {}/{} [{}]", project_key, doc_name, language);
        self.drafts
            .entry(project_key.to_string())
            .or_default()
            .insert(
                (doc_name.to_string(), language.to_string()),
                content.to_string(),
            );
        Ok(())
    }

    async fn get_doc(
        &self,
        project_key: &str,
        doc_name: &str,
        language: &str,
    ) -> Result<Option<String>> {
        Ok(self.published.get(project_key).and_then(|set| {
            set.get(&(doc_name.to_string(), language.to_string()))
                .cloned()
        }))
    }

    async fn publish(&self, project_key: &str) -> Result<usize> {
        let drafts = self
            .drafts
            .remove(project_key)
            .map(|(_, set)| set)
            .unwrap_or_default();
        let count = drafts.len();

        // Replaces the entire previous publication for this project
        self.published.insert(project_key.to_string(), drafts);
        info!("Published {} documents for {}", count, project_key);
        Ok(count)
    }

    async fn list_published(&self, project_key: &str) -> Result<Vec<(String, String)>> {
        let mut names: Vec<(String, String)> = self
            .published
            .get(project_key)
            .map(|set| set.keys().cloned().collect())
            .unwrap_or_default();
        names.sort();
        Ok(names)
    }
}

// =============================================================================
// In-Memory Cache
// =============================================================================

struct CacheEntry {
    value: Value,
    written_at: Instant,
    ttl: Duration,
}

/// Process-local TTL cache, expired lazily on read
#[derive(Default)]
pub struct MemoryCache {
    entries: DashMap<String, CacheEntry>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Cache for MemoryCache {
    async fn get(&self, key: &str) -> Result<Option<Value>> {
        let Some(entry) = self.entries.get(key) else {
            return Ok(None);
        };
        if entry.written_at.elapsed() >= entry.ttl {
            drop(entry);
            self.entries.remove(key);
            return Ok(None);
        }
        Ok(Some(entry.value.clone()))
    }

    async fn set(&self, key: &str, value: Value, ttl: Duration) -> Result<()> {
        self.entries.insert(
            key.to_string(),
            CacheEntry {
                value,
                written_at: Instant::now(),
                ttl,
            },
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_drafts_invisible_until_publish() {
        let store = MemoryDocStore::new();
        store.save_doc("proj", "overview", "en", "# Overview").await.unwrap();

        assert!(store.get_doc("proj", "overview", "en").await.unwrap().is_none());

        assert_eq!(store.publish("proj").await.unwrap(), 1);
        assert_eq!(
            store.get_doc("proj", "overview", "en").await.unwrap().as_deref(),
            Some("# Overview")
        );
    }

    #[tokio::test]
    async fn test_publish_replaces_previous_set() {
        let store = MemoryDocStore::new();
        store.save_doc("proj", "old-doc", "en", "old").await.unwrap();
        store.publish("proj").await.unwrap();

        store.save_doc("proj", "new-doc", "en", "new").await.unwrap();
        store.publish("proj").await.unwrap();

        assert!(store.get_doc("proj", "old-doc", "en").await.unwrap().is_none());
        assert!(store.get_doc("proj", "new-doc", "en").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_languages_stored_independently() {
        let store = MemoryDocStore::new();
        store.save_doc("proj", "overview", "en", "english").await.unwrap();
        store.save_doc("proj", "overview", "ko", "korean").await.unwrap();
        store.publish("proj").await.unwrap();

        assert_eq!(
            store.get_doc("proj", "overview", "ko").await.unwrap().as_deref(),
            Some("korean")
        );
        assert_eq!(store.list_published("proj").await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_cache_respects_ttl() {
        let cache = MemoryCache::new();
        cache
            .set("k", json!({"v": 1}), Duration::from_secs(60))
            .await
            .unwrap();
        assert!(cache.get("k").await.unwrap().is_some());

        cache.set("gone", json!(2), Duration::from_secs(0)).await.unwrap();
        assert!(cache.get("gone").await.unwrap().is_none());
    }
}
