use std::sync::Arc;

use futures::future::BoxFuture;
use tracing::debug;

use sibyl_core::error::Result;
use sibyl_core::traits::DatasetDirectory;
use sibyl_core::types::AgentId;

use super::{conversational, synthesis, AgentNode};
use crate::state::{SharedState, StateUpdate};

/// Routing id for the data-retrieval node.
pub const AGENT_ID: &str = "data_retrieval";

/// Fetches the connected datasets and hands off: to insight synthesis when
/// anything was found, otherwise to the conversational node so the user
/// still gets guidance.
pub struct DataRetrievalNode {
    directory: Arc<dyn DatasetDirectory>,
}

impl DataRetrievalNode {
    pub fn new(directory: Arc<dyn DatasetDirectory>) -> Self {
        Self { directory }
    }
}

impl AgentNode for DataRetrievalNode {
    fn id(&self) -> AgentId {
        AgentId::from(AGENT_ID)
    }

    fn name(&self) -> &str {
        "Data Retrieval"
    }

    fn execute<'a>(&'a self, _state: &'a SharedState) -> BoxFuture<'a, Result<StateUpdate>> {
        Box::pin(async move {
            let datasets = self.directory.list_datasets().await?;
            debug!(count = datasets.len(), "Dataset directory listed");

            let next = if datasets.is_empty() {
                conversational::AGENT_ID
            } else {
                synthesis::AGENT_ID
            };

            Ok(StateUpdate::continue_to(AgentId::from(next)).with_datasets(datasets))
        })
    }

    fn fallback(&self, _state: &SharedState) -> Option<StateUpdate> {
        // Directory down: continue with no datasets so the conversational
        // node can still close the run.
        Some(StateUpdate::continue_to(AgentId::from(
            conversational::AGENT_ID,
        )))
    }
}
