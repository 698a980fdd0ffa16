use sibyl_core::types::{AgentId, QueryIntent};

use crate::nodes;
use crate::state::SharedState;

/// Keywords signalling the user wants data fetched or displayed.
const RETRIEVAL_KEYWORDS: &[&str] = &[
    "show", "display", "plot", "chart", "graph", "trend", "report", "metric", "data", "dataset",
    "sales", "revenue", "compare", "top ", "how many", "count", "average", "total", "breakdown",
];

/// Keywords signalling the user wants analysis over data already in hand.
const ANALYSIS_KEYWORDS: &[&str] = &[
    "insight", "analyze", "analyse", "anomal", "pattern", "correlat", "summarize", "summarise",
    "why did", "what changed",
];

/// Classifies a query into an intent and resolves the agent that should
/// handle it.
///
/// Classification is a pure function of the query text and the current
/// state: total (every query maps to some intent, conversational by
/// default) and deterministic (identical inputs yield identical results).
/// Nodes choosing their own successor may invoke it again.
#[derive(Debug, Clone, Default)]
pub struct Router;

impl Router {
    pub fn new() -> Self {
        Self
    }

    /// Map a query to an intent. Tie-break: the more specific
    /// retrieval/analysis intents win over the conversational default.
    pub fn classify(&self, query: &str, state: &SharedState) -> QueryIntent {
        let query = query.to_lowercase();

        let wants_analysis = ANALYSIS_KEYWORDS.iter().any(|k| query.contains(k));
        let wants_retrieval = RETRIEVAL_KEYWORDS.iter().any(|k| query.contains(k));

        // Analysis over already-retrieved datasets skips the retrieval hop.
        if wants_analysis && !state.relevant_datasets.is_empty() {
            return QueryIntent::InsightSynthesis;
        }
        if wants_retrieval || wants_analysis {
            return QueryIntent::DataRetrieval;
        }
        QueryIntent::Conversational
    }

    /// The agent registered for an intent.
    pub fn agent_for(&self, intent: QueryIntent) -> AgentId {
        match intent {
            QueryIntent::DataRetrieval => AgentId::from(nodes::retrieval::AGENT_ID),
            QueryIntent::InsightSynthesis => AgentId::from(nodes::synthesis::AGENT_ID),
            QueryIntent::Conversational => AgentId::from(nodes::conversational::AGENT_ID),
        }
    }

    /// Classify and resolve in one step.
    pub fn route(&self, query: &str, state: &SharedState) -> AgentId {
        self.agent_for(self.classify(query, state))
    }
}
