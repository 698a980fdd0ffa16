//! End-to-end orchestration runs against test doubles: routing, fallback
//! containment, hop limits, cancellation, and the terminal-summary
//! guarantee.

use std::sync::{Arc, Mutex};

use futures::future::BoxFuture;

use sibyl_agent::fallback::FALLBACK_SUMMARY;
use sibyl_agent::nodes::conversational;
use sibyl_agent::{
    AgentNode, ConversationalNode, DataRetrievalNode, Engine, InsightSynthesisNode, Router,
    SharedState, StateUpdate,
};
use sibyl_core::config::OrchestratorConfig;
use sibyl_core::error::{Result, SibylError};
use sibyl_core::event::EventBus;
use sibyl_core::traits::{DatasetDirectory, InsightStore, LlmClient};
use sibyl_core::types::*;
use sibyl_test_utils::{
    sample_datasets, test_model_config, FailingLlm, MemoryInsightStore, StaticDirectory, StaticLlm,
};

const INSIGHTS_JSON: &str = r#"[
    {"type": "trend", "title": "Sales trending up", "content": "Sales rose 12% week over week.", "confidence": 0.82}
]"#;

fn full_engine(
    llm: Arc<dyn LlmClient>,
    directory: Arc<dyn DatasetDirectory>,
    bus: Arc<EventBus>,
) -> Engine {
    let model = test_model_config();
    let nodes: Vec<Arc<dyn AgentNode>> = vec![
        Arc::new(ConversationalNode::new(llm.clone(), model.clone())),
        Arc::new(DataRetrievalNode::new(directory)),
        Arc::new(InsightSynthesisNode::new(llm, model)),
    ];
    Engine::new(nodes, Router::new(), OrchestratorConfig::default(), bus)
}

#[tokio::test]
async fn scenario_1_conversational_guidance() {
    let llm = Arc::new(StaticLlm::new(
        "I can chart, summarize, and explain your data once you connect a source.",
    ));
    let engine = full_engine(
        llm,
        Arc::new(StaticDirectory::empty()),
        Arc::new(EventBus::default()),
    );

    let outcome = engine.run("What can you do?").await;

    assert_eq!(outcome.status, RunStatus::Completed);
    assert_eq!(outcome.state.classification, Some(QueryIntent::Conversational));
    assert_eq!(outcome.state.hop_count, 1);
    assert!(outcome.state.summary.as_deref().unwrap().contains("connect a source"));
    assert_eq!(outcome.state.insights.len(), 1);
    assert_eq!(outcome.state.insights[0].title, "AI Assistant");
    assert_eq!(outcome.state.insights[0].confidence, 1.0);
}

#[tokio::test]
async fn scenario_2_prompt_context_truncated_to_three_datasets() {
    let llm = Arc::new(StaticLlm::new(INSIGHTS_JSON));
    let engine = full_engine(
        llm.clone(),
        Arc::new(StaticDirectory::new(sample_datasets(5))),
        Arc::new(EventBus::default()),
    );

    let outcome = engine.run("Show me sales trends").await;

    assert_eq!(outcome.status, RunStatus::Completed);
    assert_eq!(outcome.state.classification, Some(QueryIntent::DataRetrieval));
    // All five datasets were retrieved into state...
    assert_eq!(outcome.state.relevant_datasets.len(), 5);

    // ...but the LLM prompt context named exactly the first three.
    let prompt = llm.last_messages();
    let system = &prompt[0].content;
    assert!(system.contains("ds1"));
    assert!(system.contains("ds2"));
    assert!(system.contains("ds3"));
    assert!(!system.contains("ds4"));
    assert!(!system.contains("ds5"));

    assert_eq!(outcome.state.insights.len(), 1);
    assert_eq!(outcome.state.insights[0].kind, InsightKind::Trend);
    assert_eq!(
        outcome.state.summary.as_deref(),
        Some("Sales rose 12% week over week.")
    );
}

#[tokio::test]
async fn scenario_3_llm_failure_yields_fixed_fallback() {
    let llm = Arc::new(FailingLlm::new("request timeout"));
    let engine = full_engine(
        llm,
        Arc::new(StaticDirectory::empty()),
        Arc::new(EventBus::default()),
    );

    let outcome = engine.run("What can you do?").await;

    assert_eq!(outcome.status, RunStatus::Completed);
    assert_eq!(outcome.state.summary.as_deref(), Some(FALLBACK_SUMMARY));
    assert!(outcome.state.insights.is_empty());
}

/// A misconfigured node that always routes back to itself.
struct LoopNode;

impl AgentNode for LoopNode {
    fn id(&self) -> AgentId {
        AgentId::from(conversational::AGENT_ID)
    }

    fn name(&self) -> &str {
        "Loop"
    }

    fn execute<'a>(&'a self, _state: &'a SharedState) -> BoxFuture<'a, Result<StateUpdate>> {
        Box::pin(async move {
            Ok(StateUpdate::continue_to(AgentId::from(
                conversational::AGENT_ID,
            )))
        })
    }
}

#[tokio::test]
async fn scenario_4_hop_limit_aborts_runaway_graph() {
    let nodes: Vec<Arc<dyn AgentNode>> = vec![Arc::new(LoopNode)];
    let engine = Engine::new(
        nodes,
        Router::new(),
        OrchestratorConfig {
            max_hops: 3,
            history_limit: 50,
        },
        Arc::new(EventBus::default()),
    );

    let outcome = engine.run("hello").await;

    assert_eq!(outcome.status, RunStatus::Aborted);
    assert_eq!(outcome.state.hop_count, 3);
    assert_eq!(outcome.state.summary.as_deref(), Some(FALLBACK_SUMMARY));
}

/// A node that hands off to an agent id nothing is registered under.
struct BadHandoffNode;

impl AgentNode for BadHandoffNode {
    fn id(&self) -> AgentId {
        AgentId::from(conversational::AGENT_ID)
    }

    fn name(&self) -> &str {
        "Bad Handoff"
    }

    fn execute<'a>(&'a self, _state: &'a SharedState) -> BoxFuture<'a, Result<StateUpdate>> {
        Box::pin(async move { Ok(StateUpdate::continue_to(AgentId::from("nonexistent"))) })
    }
}

#[tokio::test]
async fn unknown_agent_id_aborts_with_safety_net() {
    let nodes: Vec<Arc<dyn AgentNode>> = vec![Arc::new(BadHandoffNode)];
    let engine = Engine::new(
        nodes,
        Router::new(),
        OrchestratorConfig::default(),
        Arc::new(EventBus::default()),
    );

    let outcome = engine.run("hello").await;

    assert_eq!(outcome.status, RunStatus::Aborted);
    assert_eq!(outcome.state.hop_count, 1);
    assert_eq!(outcome.state.summary.as_deref(), Some(FALLBACK_SUMMARY));
}

/// A node that fails without declaring any fallback policy.
struct NoFallbackNode;

impl AgentNode for NoFallbackNode {
    fn id(&self) -> AgentId {
        AgentId::from(conversational::AGENT_ID)
    }

    fn name(&self) -> &str {
        "No Fallback"
    }

    fn execute<'a>(&'a self, _state: &'a SharedState) -> BoxFuture<'a, Result<StateUpdate>> {
        Box::pin(async move { Err(SibylError::LlmRequest("boom".into())) })
    }
}

#[tokio::test]
async fn node_without_fallback_trips_engine_safety_net() {
    let nodes: Vec<Arc<dyn AgentNode>> = vec![Arc::new(NoFallbackNode)];
    let engine = Engine::new(
        nodes,
        Router::new(),
        OrchestratorConfig::default(),
        Arc::new(EventBus::default()),
    );

    let outcome = engine.run("hello").await;

    assert_eq!(outcome.status, RunStatus::Aborted);
    assert_eq!(outcome.state.summary.as_deref(), Some(FALLBACK_SUMMARY));
}

/// A chain step that records the sequence lengths it observed, appends one
/// insight and one message, and hands off to `next` (or terminates).
struct ChainNode {
    id: &'static str,
    next: Option<&'static str>,
    observed: Arc<Mutex<Vec<(usize, usize)>>>,
}

impl AgentNode for ChainNode {
    fn id(&self) -> AgentId {
        AgentId::from(self.id)
    }

    fn name(&self) -> &str {
        self.id
    }

    fn execute<'a>(&'a self, state: &'a SharedState) -> BoxFuture<'a, Result<StateUpdate>> {
        Box::pin(async move {
            self.observed
                .lock()
                .unwrap()
                .push((state.insights.len(), state.messages.len()));

            let mut update = StateUpdate::terminal()
                .with_insight(Insight::new(InsightKind::Summary, self.id, "step", 0.5))
                .with_message(Message::assistant(format!("{} done", self.id)));
            update.directive = match self.next {
                Some(next) => Directive::Continue(AgentId::from(next)),
                None => Directive::Terminate,
            };
            if self.next.is_none() {
                update.summary = Some("chain complete".into());
            }
            Ok(update)
        })
    }
}

#[tokio::test]
async fn insights_and_messages_grow_monotonically_across_hops() {
    let observed = Arc::new(Mutex::new(Vec::new()));
    let nodes: Vec<Arc<dyn AgentNode>> = vec![
        Arc::new(ChainNode {
            id: conversational::AGENT_ID,
            next: Some("step2"),
            observed: observed.clone(),
        }),
        Arc::new(ChainNode {
            id: "step2",
            next: Some("step3"),
            observed: observed.clone(),
        }),
        Arc::new(ChainNode {
            id: "step3",
            next: None,
            observed: observed.clone(),
        }),
    ];
    let engine = Engine::new(
        nodes,
        Router::new(),
        OrchestratorConfig::default(),
        Arc::new(EventBus::default()),
    );

    let outcome = engine.run("hello").await;

    assert_eq!(outcome.status, RunStatus::Completed);
    assert_eq!(outcome.state.hop_count, 3);
    assert_eq!(outcome.state.insights.len(), 3);
    // user query + 3 assistant messages
    assert_eq!(outcome.state.messages.len(), 4);
    assert_eq!(outcome.state.summary.as_deref(), Some("chain complete"));

    let snapshots = observed.lock().unwrap().clone();
    assert_eq!(snapshots, vec![(0, 1), (1, 2), (2, 3)]);
}

#[tokio::test]
async fn run_publishes_lifecycle_events_in_order() {
    let bus = Arc::new(EventBus::default());
    let mut rx = bus.subscribe();

    let llm = Arc::new(StaticLlm::new("hi there"));
    let engine = full_engine(llm, Arc::new(StaticDirectory::empty()), bus);
    engine.run("hello").await;

    let mut kinds = Vec::new();
    while let Ok(event) = rx.try_recv() {
        kinds.push(match event {
            OrchestratorEvent::RunStarted { .. } => "run_started",
            OrchestratorEvent::NodeStarted { .. } => "node_started",
            OrchestratorEvent::NodeCompleted { .. } => "node_completed",
            OrchestratorEvent::NodeFallback { .. } => "node_fallback",
            OrchestratorEvent::RunCompleted { .. } => "run_completed",
        });
    }
    assert_eq!(
        kinds,
        vec!["run_started", "node_started", "node_completed", "run_completed"]
    );
}

#[tokio::test]
async fn retrieval_with_empty_directory_ends_conversationally() {
    let llm = Arc::new(StaticLlm::new("Connect a data source first!"));
    let engine = full_engine(
        llm,
        Arc::new(StaticDirectory::empty()),
        Arc::new(EventBus::default()),
    );

    let outcome = engine.run("Show me sales trends").await;

    assert_eq!(outcome.status, RunStatus::Completed);
    // retrieval hop + conversational hop
    assert_eq!(outcome.state.hop_count, 2);
    assert!(outcome.state.relevant_datasets.is_empty());
    assert_eq!(
        outcome.state.summary.as_deref(),
        Some("Connect a data source first!")
    );
}

#[tokio::test]
async fn produced_insights_round_trip_through_a_store() {
    let llm = Arc::new(StaticLlm::new(INSIGHTS_JSON));
    let engine = full_engine(
        llm,
        Arc::new(StaticDirectory::new(sample_datasets(2))),
        Arc::new(EventBus::default()),
    );

    let outcome = engine.run("Show me sales trends").await;
    assert_eq!(outcome.state.insights.len(), 1);

    // The external store persists what the run produced.
    let store = MemoryInsightStore::new();
    let id = store.put(outcome.state.insights[0].clone());

    let listed = store
        .list(InsightFilter {
            kind: Some(InsightKind::Trend),
            min_confidence: Some(0.5),
        })
        .await
        .unwrap();
    assert_eq!(listed.len(), 1);

    let fetched = store.get(&id).await.unwrap().unwrap();
    assert_eq!(fetched.insight.title, "Sales trending up");

    store.delete(&id).await.unwrap();
    assert!(store.get(&id).await.unwrap().is_none());
}
