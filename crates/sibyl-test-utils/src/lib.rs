//! Shared test doubles for the Sibyl crates: scripted LLM clients, static
//! dataset directories, and an in-memory insight store.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use chrono::Utc;
use futures::future::BoxFuture;
use uuid::Uuid;

use sibyl_core::config::ModelConfig;
use sibyl_core::error::{Result, SibylError};
use sibyl_core::traits::{DatasetDirectory, InsightStore, LlmClient};
use sibyl_core::types::*;

/// A model config suitable for tests; no network calls are ever made.
pub fn test_model_config() -> ModelConfig {
    ModelConfig {
        provider: "test".to_string(),
        model_id: "test-model".to_string(),
        api_key: None,
        base_url: None,
        max_tokens: 256,
        temperature: 0.0,
        timeout_secs: 5,
    }
}

/// `n` connected datasets named `ds1..dsN`.
pub fn sample_datasets(n: usize) -> Vec<DatasetRef> {
    (1..=n)
        .map(|i| DatasetRef::new(format!("id-{}", i), format!("ds{}", i), "warehouse"))
        .collect()
}

/// An LLM double that always returns the same completion and records every
/// conversation it was sent.
pub struct StaticLlm {
    response: String,
    requests: Mutex<Vec<Vec<Message>>>,
}

impl StaticLlm {
    pub fn new(response: impl Into<String>) -> Self {
        Self {
            response: response.into(),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Number of completions served.
    pub fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    /// The conversation sent on the most recent call.
    pub fn last_messages(&self) -> Vec<Message> {
        self.requests
            .lock()
            .unwrap()
            .last()
            .cloned()
            .unwrap_or_default()
    }
}

impl LlmClient for StaticLlm {
    fn complete(
        &self,
        _config: &ModelConfig,
        messages: Vec<Message>,
    ) -> BoxFuture<'_, Result<Completion>> {
        self.requests.lock().unwrap().push(messages);
        let response = self.response.clone();
        Box::pin(async move { Ok(Completion::text(response)) })
    }
}

/// An LLM double that fails every call with the given request error.
pub struct FailingLlm {
    message: String,
}

impl FailingLlm {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl LlmClient for FailingLlm {
    fn complete(
        &self,
        _config: &ModelConfig,
        _messages: Vec<Message>,
    ) -> BoxFuture<'_, Result<Completion>> {
        let message = self.message.clone();
        Box::pin(async move { Err(SibylError::LlmRequest(message)) })
    }
}

/// An LLM double that fails with a retryable error N times, then succeeds.
pub struct FlakyLlm {
    remaining_failures: AtomicUsize,
    response: String,
    calls: AtomicUsize,
}

impl FlakyLlm {
    pub fn new(failures: usize, response: impl Into<String>) -> Self {
        Self {
            remaining_failures: AtomicUsize::new(failures),
            response: response.into(),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl LlmClient for FlakyLlm {
    fn complete(
        &self,
        _config: &ModelConfig,
        _messages: Vec<Message>,
    ) -> BoxFuture<'_, Result<Completion>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let failing = self
            .remaining_failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        let response = self.response.clone();
        Box::pin(async move {
            if failing {
                Err(SibylError::LlmRequest("request timeout".into()))
            } else {
                Ok(Completion::text(response))
            }
        })
    }
}

/// A dataset directory serving a fixed list.
pub struct StaticDirectory {
    datasets: Vec<DatasetRef>,
}

impl StaticDirectory {
    pub fn new(datasets: Vec<DatasetRef>) -> Self {
        Self { datasets }
    }

    pub fn empty() -> Self {
        Self { datasets: vec![] }
    }
}

impl DatasetDirectory for StaticDirectory {
    fn list_datasets(&self) -> BoxFuture<'_, Result<Vec<DatasetRef>>> {
        let datasets = self.datasets.clone();
        Box::pin(async move { Ok(datasets) })
    }
}

/// A dataset directory that fails every call.
pub struct FailingDirectory {
    message: String,
}

impl FailingDirectory {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl DatasetDirectory for FailingDirectory {
    fn list_datasets(&self) -> BoxFuture<'_, Result<Vec<DatasetRef>>> {
        let message = self.message.clone();
        Box::pin(async move { Err(SibylError::Directory(message)) })
    }
}

/// In-memory insight store implementing the persistence boundary contract.
#[derive(Default)]
pub struct MemoryInsightStore {
    inner: Mutex<HashMap<String, StoredInsight>>,
}

impl MemoryInsightStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Persist an insight, returning its generated id.
    pub fn put(&self, insight: Insight) -> String {
        let id = Uuid::new_v4().to_string();
        let stored = StoredInsight {
            id: id.clone(),
            insight,
            created_at: Utc::now(),
        };
        self.inner.lock().unwrap().insert(id.clone(), stored);
        id
    }
}

impl InsightStore for MemoryInsightStore {
    fn list(&self, filter: InsightFilter) -> BoxFuture<'_, Result<Vec<StoredInsight>>> {
        let mut items: Vec<StoredInsight> = self
            .inner
            .lock()
            .unwrap()
            .values()
            .filter(|s| {
                filter.kind.map_or(true, |k| s.insight.kind == k)
                    && filter
                        .min_confidence
                        .map_or(true, |min| s.insight.confidence >= min)
            })
            .cloned()
            .collect();
        items.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Box::pin(async move { Ok(items) })
    }

    fn get(&self, id: &str) -> BoxFuture<'_, Result<Option<StoredInsight>>> {
        let found = self.inner.lock().unwrap().get(id).cloned();
        Box::pin(async move { Ok(found) })
    }

    fn delete(&self, id: &str) -> BoxFuture<'_, Result<()>> {
        self.inner.lock().unwrap().remove(id);
        Box::pin(async move { Ok(()) })
    }
}
