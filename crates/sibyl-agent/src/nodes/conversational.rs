use std::sync::Arc;

use futures::future::BoxFuture;
use tracing::debug;

use sibyl_core::config::ModelConfig;
use sibyl_core::error::Result;
use sibyl_core::traits::LlmClient;
use sibyl_core::types::*;

use super::{data_source_context, AgentNode};
use crate::fallback;
use crate::state::{SharedState, StateUpdate};

/// Routing id for the conversational node.
pub const AGENT_ID: &str = "conversational";

const SYSTEM_PROMPT: &str = "You are a friendly analytics assistant. Answer the user's \
question conversationally. When data sources are connected, ground your answer in them; \
otherwise explain what you can do once a data source is connected.";

/// Terminal node for general questions: answers directly via the LLM and
/// ends the run.
pub struct ConversationalNode {
    llm: Arc<dyn LlmClient>,
    model: ModelConfig,
}

impl ConversationalNode {
    pub fn new(llm: Arc<dyn LlmClient>, model: ModelConfig) -> Self {
        Self { llm, model }
    }
}

impl AgentNode for ConversationalNode {
    fn id(&self) -> AgentId {
        AgentId::from(AGENT_ID)
    }

    fn name(&self) -> &str {
        "Conversational"
    }

    fn execute<'a>(&'a self, state: &'a SharedState) -> BoxFuture<'a, Result<StateUpdate>> {
        Box::pin(async move {
            let context = data_source_context(&state.relevant_datasets);
            let messages = vec![
                Message::system(format!("{}\n\n{}", SYSTEM_PROMPT, context)),
                Message::user(state.user_query.clone()),
            ];

            let completion = self.llm.complete(&self.model, messages).await?;
            let content = completion.content;
            debug!(chars = content.len(), "Conversational completion received");

            Ok(StateUpdate::terminal()
                .with_summary(content.clone())
                .with_insight(Insight::new(
                    InsightKind::Narrative,
                    "AI Assistant",
                    content.clone(),
                    1.0,
                ))
                .with_message(Message::assistant(content)))
        })
    }

    fn fallback(&self, _state: &SharedState) -> Option<StateUpdate> {
        Some(fallback::safety_net_update())
    }
}
