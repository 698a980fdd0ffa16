use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for one orchestration run.
#[derive(Debug, Clone, Hash, Eq, PartialEq, Serialize, Deserialize)]
pub struct RunId(pub String);

impl RunId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RunId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of an agent node in the orchestration graph.
#[derive(Debug, Clone, Hash, Eq, PartialEq, Serialize, Deserialize)]
pub struct AgentId(pub String);

impl AgentId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for AgentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for AgentId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Role in a conversation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// A single entry in the run transcript.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
            timestamp: Utc::now(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
            timestamp: Utc::now(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
            timestamp: Utc::now(),
        }
    }
}

/// Reference to a connected dataset, as reported by the dataset directory.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DatasetRef {
    pub id: String,
    pub name: String,
    pub source_type: String,
}

impl DatasetRef {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        source_type: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            source_type: source_type.into(),
        }
    }
}

/// Kind of insight produced by an agent node.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum InsightKind {
    Summary,
    Trend,
    Anomaly,
    Comparison,
    Narrative,
}

/// An insight record produced during a run.
///
/// Confidence is clamped to [0, 1] on construction and again when merged
/// into shared state, so downstream consumers never see out-of-range values.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Insight {
    #[serde(rename = "type")]
    pub kind: InsightKind,
    pub title: String,
    pub content: String,
    pub confidence: f32,
}

impl Insight {
    pub fn new(
        kind: InsightKind,
        title: impl Into<String>,
        content: impl Into<String>,
        confidence: f32,
    ) -> Self {
        Self {
            kind,
            title: title.into(),
            content: content.into(),
            confidence: confidence.clamp(0.0, 1.0),
        }
    }
}

/// An insight as held by an external persistence store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredInsight {
    pub id: String,
    pub insight: Insight,
    pub created_at: DateTime<Utc>,
}

/// Filter for listing persisted insights.
#[derive(Debug, Clone, Default)]
pub struct InsightFilter {
    pub kind: Option<InsightKind>,
    pub min_confidence: Option<f32>,
}

/// Query intent assigned by the router.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum QueryIntent {
    DataRetrieval,
    InsightSynthesis,
    Conversational,
}

/// Routing directive returned by a node after each hop.
///
/// The engine consumes the directive once; a node must set it explicitly on
/// every hop to continue the chain.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Directive {
    Continue(AgentId),
    #[default]
    Terminate,
}

impl Directive {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Directive::Terminate)
    }
}

/// Terminal status of an orchestration run.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Completed,
    Aborted,
}

/// A whole completion from the LLM.
#[derive(Debug, Clone)]
pub struct Completion {
    pub content: String,
    pub input_tokens: u64,
    pub output_tokens: u64,
}

impl Completion {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            input_tokens: 0,
            output_tokens: 0,
        }
    }
}

/// Orchestration event broadcast to all subscribers.
#[derive(Debug, Clone)]
pub enum OrchestratorEvent {
    /// A run started.
    RunStarted { run_id: RunId, query: String },
    /// A node began executing.
    NodeStarted { run_id: RunId, agent: AgentId },
    /// A node finished and its update was merged.
    NodeCompleted {
        run_id: RunId,
        agent: AgentId,
        elapsed_ms: u64,
        terminal: bool,
    },
    /// A node errored and its declared fallback was substituted.
    NodeFallback {
        run_id: RunId,
        agent: AgentId,
        error: String,
    },
    /// A run reached a terminal state.
    RunCompleted {
        run_id: RunId,
        status: RunStatus,
        hops: usize,
    },
}
