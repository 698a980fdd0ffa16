use std::sync::Arc;

use futures::future::BoxFuture;
use tracing::{debug, warn};

use sibyl_core::config::ModelConfig;
use sibyl_core::error::Result;
use sibyl_core::traits::LlmClient;
use sibyl_core::types::*;

use super::{data_source_context, AgentNode};
use crate::state::{SharedState, StateUpdate};

/// Routing id for the insight-synthesis node.
pub const AGENT_ID: &str = "insight_synthesis";

const SYSTEM_PROMPT: &str = "You are an analytics engine. Given a user question and the \
connected data sources, reply with a JSON array of insight objects, each shaped as \
{\"type\": \"summary\"|\"trend\"|\"anomaly\"|\"comparison\"|\"narrative\", \"title\": string, \
\"content\": string, \"confidence\": number between 0 and 1}. Reply with JSON only.";

const FALLBACK_SUMMARY: &str = "I couldn't analyze your connected data just now. \
Try again in a moment — or ask me what I can do!";

/// Terminal node that asks the LLM for structured insights over the
/// retrieved datasets.
pub struct InsightSynthesisNode {
    llm: Arc<dyn LlmClient>,
    model: ModelConfig,
}

impl InsightSynthesisNode {
    pub fn new(llm: Arc<dyn LlmClient>, model: ModelConfig) -> Self {
        Self { llm, model }
    }
}

/// Parse a completion as a JSON insight array, tolerating markdown fences.
/// Returns `None` when nothing parseable was found.
fn parse_insights(content: &str) -> Option<Vec<Insight>> {
    let trimmed = content
        .trim()
        .trim_start_matches("```json")
        .trim_start_matches("```")
        .trim_end_matches("```")
        .trim();

    serde_json::from_str::<Vec<Insight>>(trimmed)
        .ok()
        .filter(|insights| !insights.is_empty())
}

impl AgentNode for InsightSynthesisNode {
    fn id(&self) -> AgentId {
        AgentId::from(AGENT_ID)
    }

    fn name(&self) -> &str {
        "Insight Synthesis"
    }

    fn execute<'a>(&'a self, state: &'a SharedState) -> BoxFuture<'a, Result<StateUpdate>> {
        Box::pin(async move {
            let context = data_source_context(&state.relevant_datasets);
            let messages = vec![
                Message::system(format!("{}\n\n{}", SYSTEM_PROMPT, context)),
                Message::user(state.user_query.clone()),
            ];

            let completion = self.llm.complete(&self.model, messages).await?;

            let insights = match parse_insights(&completion.content) {
                Some(insights) => insights,
                None => {
                    // Plain-text reply: keep it as a single narrative insight.
                    warn!("Completion was not a JSON insight array, wrapping as narrative");
                    vec![Insight::new(
                        InsightKind::Narrative,
                        "Analysis",
                        completion.content.clone(),
                        0.5,
                    )]
                }
            };
            debug!(count = insights.len(), "Insights synthesized");

            let summary = insights[0].content.clone();
            let mut update = StateUpdate::terminal()
                .with_summary(summary.clone())
                .with_message(Message::assistant(summary));
            update.insights = insights;
            Ok(update)
        })
    }

    fn fallback(&self, _state: &SharedState) -> Option<StateUpdate> {
        Some(
            StateUpdate::terminal()
                .with_summary(FALLBACK_SUMMARY)
                .with_message(Message::assistant(FALLBACK_SUMMARY)),
        )
    }
}
