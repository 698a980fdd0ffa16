use futures::future::BoxFuture;

use crate::config::ModelConfig;
use crate::error::Result;
use crate::types::*;

/// LLM capability — whole-completion chat.
///
/// Any network, provider, or timeout failure surfaces as an `Err`; callers
/// treat these as recoverable and substitute a fallback, never a crash.
pub trait LlmClient: Send + Sync + 'static {
    /// Send a conversation and receive the model's completion.
    fn complete(
        &self,
        config: &ModelConfig,
        messages: Vec<Message>,
    ) -> BoxFuture<'_, Result<Completion>>;
}

/// Dataset directory — read-only view of the datasets connected for the
/// current tenant/session. An empty list is a valid state, not an error.
pub trait DatasetDirectory: Send + Sync + 'static {
    fn list_datasets(&self) -> BoxFuture<'_, Result<Vec<DatasetRef>>>;
}

/// Insight persistence — external store keyed by opaque string ids.
///
/// The orchestration core only produces `Insight` records; persisting them
/// is the store implementation's concern.
pub trait InsightStore: Send + Sync + 'static {
    /// List stored insights matching the filter.
    fn list(&self, filter: InsightFilter) -> BoxFuture<'_, Result<Vec<StoredInsight>>>;

    /// Fetch a single insight by id.
    fn get(&self, id: &str) -> BoxFuture<'_, Result<Option<StoredInsight>>>;

    /// Delete an insight by id.
    fn delete(&self, id: &str) -> BoxFuture<'_, Result<()>>;
}
