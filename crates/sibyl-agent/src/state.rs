use serde::{Deserialize, Serialize};

use sibyl_core::types::*;

/// The mutable record threaded through one orchestration run.
///
/// Exclusively owned by the `Engine` for the duration of a run. Nodes
/// receive `&SharedState` and return a `StateUpdate`; the engine merges
/// node output through `apply` only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SharedState {
    /// The inbound query. Immutable once seeded.
    pub user_query: String,
    /// Intent assigned by the router.
    pub classification: Option<QueryIntent>,
    /// Datasets accumulated by retrieval-capable nodes.
    pub relevant_datasets: Vec<DatasetRef>,
    /// Append-only across the run.
    pub insights: Vec<Insight>,
    /// The latest agent's user-facing text; overwritten, not accumulated.
    pub summary: Option<String>,
    /// Append-only conversational transcript.
    pub messages: Vec<Message>,
    /// Executed hops. Written by the engine only; `StateUpdate` carries no
    /// hop field, so a node cannot forge it.
    pub hop_count: usize,
}

impl SharedState {
    /// Seed fresh state for a query; the transcript starts with the user
    /// message.
    pub fn new(query: impl Into<String>) -> Self {
        Self::with_history(query, Vec::new())
    }

    /// Seed state with prior session messages ahead of the new user query.
    pub fn with_history(query: impl Into<String>, prior: Vec<Message>) -> Self {
        let user_query = query.into();
        let mut messages = prior;
        messages.push(Message::user(user_query.clone()));
        Self {
            user_query,
            classification: None,
            relevant_datasets: Vec::new(),
            insights: Vec::new(),
            summary: None,
            messages,
            hop_count: 0,
        }
    }

    /// Merge a node's partial update: overlay `Some` scalar fields, append
    /// sequences. Append-only for `insights` and `messages`; duplicate
    /// dataset ids are skipped. Never fails.
    pub fn apply(&mut self, update: StateUpdate) {
        if let Some(classification) = update.classification {
            self.classification = Some(classification);
        }

        for dataset in update.datasets {
            if !self.relevant_datasets.iter().any(|d| d.id == dataset.id) {
                self.relevant_datasets.push(dataset);
            }
        }

        for mut insight in update.insights {
            insight.confidence = insight.confidence.clamp(0.0, 1.0);
            self.insights.push(insight);
        }

        // An empty summary would violate the terminal-summary guarantee.
        if let Some(summary) = update.summary {
            if !summary.is_empty() {
                self.summary = Some(summary);
            }
        }

        self.messages.extend(update.messages);
    }
}

/// A node's partial update: only the fields the node is responsible for,
/// plus the routing directive consumed by the engine after the merge.
#[derive(Debug, Clone, Default)]
pub struct StateUpdate {
    pub classification: Option<QueryIntent>,
    pub datasets: Vec<DatasetRef>,
    pub insights: Vec<Insight>,
    pub summary: Option<String>,
    pub messages: Vec<Message>,
    pub directive: Directive,
}

impl StateUpdate {
    /// An empty terminal update.
    pub fn terminal() -> Self {
        Self::default()
    }

    /// An empty update handing off to another agent.
    pub fn continue_to(agent: AgentId) -> Self {
        Self {
            directive: Directive::Continue(agent),
            ..Self::default()
        }
    }

    pub fn with_summary(mut self, summary: impl Into<String>) -> Self {
        self.summary = Some(summary.into());
        self
    }

    pub fn with_message(mut self, message: Message) -> Self {
        self.messages.push(message);
        self
    }

    pub fn with_insight(mut self, insight: Insight) -> Self {
        self.insights.push(insight);
        self
    }

    pub fn with_datasets(mut self, datasets: Vec<DatasetRef>) -> Self {
        self.datasets = datasets;
        self
    }
}
