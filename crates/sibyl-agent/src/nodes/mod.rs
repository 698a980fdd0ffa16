pub mod conversational;
pub mod retrieval;
pub mod synthesis;

pub use conversational::ConversationalNode;
pub use retrieval::DataRetrievalNode;
pub use synthesis::InsightSynthesisNode;

use futures::future::BoxFuture;

use sibyl_core::error::Result;
use sibyl_core::types::{AgentId, DatasetRef};

use crate::state::{SharedState, StateUpdate};

/// At most this many dataset names are embedded in an LLM prompt context.
const DATASET_CONTEXT_LIMIT: usize = 3;

/// One step of the orchestration graph.
///
/// A node receives a read view of the shared state and returns a partial
/// update plus a routing directive. It never mutates state in place.
/// External-call failures propagate as `Err`; the engine substitutes the
/// node's declared `fallback` when one exists and falls back to its own
/// safety net otherwise.
pub trait AgentNode: Send + Sync {
    /// Stable identifier used for routing.
    fn id(&self) -> AgentId;

    /// Human-readable name.
    fn name(&self) -> &str;

    /// Execute one hop.
    fn execute<'a>(&'a self, state: &'a SharedState) -> BoxFuture<'a, Result<StateUpdate>>;

    /// The node's declared fallback policy: a safe update merged in place of
    /// a failed `execute`. `None` leaves failures to the engine's safety
    /// net, which aborts the run.
    fn fallback(&self, state: &SharedState) -> Option<StateUpdate> {
        let _ = state;
        None
    }
}

/// Prompt context summarizing connected data sources, truncated to the
/// first `DATASET_CONTEXT_LIMIT` names.
pub(crate) fn data_source_context(datasets: &[DatasetRef]) -> String {
    if datasets.is_empty() {
        return "No data sources are connected yet.".to_string();
    }

    let names: Vec<&str> = datasets
        .iter()
        .take(DATASET_CONTEXT_LIMIT)
        .map(|d| d.name.as_str())
        .collect();

    let mut context = format!("Connected data sources: {}", names.join(", "));
    if datasets.len() > DATASET_CONTEXT_LIMIT {
        context.push_str(&format!(
            " (+{} more)",
            datasets.len() - DATASET_CONTEXT_LIMIT
        ));
    }
    context
}
