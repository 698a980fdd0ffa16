use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use sibyl_core::config::OrchestratorConfig;
use sibyl_core::event::EventBus;
use sibyl_core::types::*;

use crate::fallback;
use crate::nodes::AgentNode;
use crate::router::Router;
use crate::state::SharedState;

/// Outcome of one orchestration run: the terminal status plus the final
/// state snapshot, guaranteed to carry a non-empty summary.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub run_id: RunId,
    pub status: RunStatus,
    pub state: SharedState,
}

/// Drives the agent graph: seeds state, routes to an entry node, merges
/// each node's update, follows directives, and enforces the hop limit.
///
/// Each run exclusively owns its `SharedState`; the engine is `&self`
/// throughout, so independent runs may execute concurrently.
pub struct Engine {
    nodes: HashMap<AgentId, Arc<dyn AgentNode>>,
    router: Router,
    config: OrchestratorConfig,
    event_bus: Arc<EventBus>,
    cancel: CancellationToken,
}

impl Engine {
    pub fn new(
        nodes: Vec<Arc<dyn AgentNode>>,
        router: Router,
        config: OrchestratorConfig,
        event_bus: Arc<EventBus>,
    ) -> Self {
        let nodes = nodes.into_iter().map(|n| (n.id(), n)).collect();
        Self {
            nodes,
            router,
            config,
            event_bus,
            cancel: CancellationToken::new(),
        }
    }

    /// Get a cancellation token for this engine. Cancellation is observed
    /// between hops and races any in-flight node execution.
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Run one query from fresh state.
    pub async fn run(&self, query: &str) -> RunOutcome {
        self.run_with_history(query, Vec::new()).await
    }

    /// Run one query, carrying prior session messages into the transcript.
    ///
    /// Always returns a terminal state: failures are contained by node
    /// fallbacks or the engine's safety net, never surfaced as errors.
    pub async fn run_with_history(&self, query: &str, mut prior: Vec<Message>) -> RunOutcome {
        let run_id = RunId::new();
        let started = Instant::now();

        if prior.len() > self.config.history_limit {
            let skip = prior.len() - self.config.history_limit;
            prior.drain(..skip);
        }
        let mut state = SharedState::with_history(query, prior);

        self.event_bus.publish(OrchestratorEvent::RunStarted {
            run_id: run_id.clone(),
            query: query.to_string(),
        });

        let intent = self.router.classify(query, &state);
        state.classification = Some(intent);
        let mut current = self.router.agent_for(intent);

        info!(run_id = %run_id, entry = %current, ?intent, "Starting orchestration run");

        let status = loop {
            if self.cancel.is_cancelled() {
                warn!(run_id = %run_id, "Run cancelled between hops");
                break RunStatus::Aborted;
            }

            // Runaway-graph guard
            if state.hop_count >= self.config.max_hops {
                warn!(
                    run_id = %run_id,
                    max_hops = self.config.max_hops,
                    "Hop limit reached without termination, aborting run"
                );
                break RunStatus::Aborted;
            }

            // Unknown agent id is a configuration error, never a silent no-op.
            let node = match self.nodes.get(&current) {
                Some(n) => Arc::clone(n),
                None => {
                    error!(run_id = %run_id, agent = %current, "Unknown agent id, aborting run");
                    break RunStatus::Aborted;
                }
            };

            self.event_bus.publish(OrchestratorEvent::NodeStarted {
                run_id: run_id.clone(),
                agent: current.clone(),
            });

            let hop_start = Instant::now();
            let result = tokio::select! {
                result = node.execute(&state) => result,
                _ = self.cancel.cancelled() => {
                    // The in-flight call is dropped; its late result is
                    // never merged anywhere.
                    warn!(run_id = %run_id, agent = %current, "Run cancelled mid-node");
                    break RunStatus::Aborted;
                }
            };
            let elapsed_ms = hop_start.elapsed().as_millis() as u64;

            let update = match result {
                Ok(update) => update,
                Err(e) => match node.fallback(&state) {
                    Some(fb) => {
                        warn!(
                            run_id = %run_id,
                            agent = %current,
                            error = %e,
                            "Node failed, applying its declared fallback"
                        );
                        self.event_bus.publish(OrchestratorEvent::NodeFallback {
                            run_id: run_id.clone(),
                            agent: current.clone(),
                            error: e.to_string(),
                        });
                        fb
                    }
                    None => {
                        error!(
                            run_id = %run_id,
                            agent = %current,
                            error = %e,
                            "Node failed with no declared fallback, aborting run"
                        );
                        break RunStatus::Aborted;
                    }
                },
            };

            // The directive is consumed here, once; it never persists into
            // the next hop.
            let directive = update.directive.clone();
            state.apply(update);
            state.hop_count += 1;

            debug!(
                run_id = %run_id,
                agent = %current,
                elapsed_ms,
                hops = state.hop_count,
                "Node update merged"
            );
            self.event_bus.publish(OrchestratorEvent::NodeCompleted {
                run_id: run_id.clone(),
                agent: current.clone(),
                elapsed_ms,
                terminal: directive.is_terminal(),
            });

            match directive {
                Directive::Terminate => break RunStatus::Completed,
                Directive::Continue(next) => current = next,
            }
        };

        // Terminal-summary guarantee: whatever happened above, the caller
        // gets a presentable summary.
        if state.summary.as_deref().map_or(true, str::is_empty) {
            state.apply(fallback::safety_net_update());
        }

        info!(
            run_id = %run_id,
            ?status,
            hops = state.hop_count,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Run reached terminal state"
        );
        self.event_bus.publish(OrchestratorEvent::RunCompleted {
            run_id: run_id.clone(),
            status,
            hops: state.hop_count,
        });

        RunOutcome {
            run_id,
            status,
            state,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nodes::ConversationalNode;
    use sibyl_test_utils::{test_model_config, StaticLlm};

    fn single_node_engine(response: &str) -> Engine {
        let llm = Arc::new(StaticLlm::new(response));
        let nodes: Vec<Arc<dyn AgentNode>> =
            vec![Arc::new(ConversationalNode::new(llm, test_model_config()))];
        Engine::new(
            nodes,
            Router::new(),
            OrchestratorConfig::default(),
            Arc::new(EventBus::default()),
        )
    }

    #[tokio::test]
    async fn test_single_hop_completes() {
        let engine = single_node_engine("hello!");
        let outcome = engine.run("hi").await;

        assert_eq!(outcome.status, RunStatus::Completed);
        assert_eq!(outcome.state.hop_count, 1);
        assert_eq!(outcome.state.summary.as_deref(), Some("hello!"));
        assert_eq!(outcome.state.classification, Some(QueryIntent::Conversational));
    }

    #[tokio::test]
    async fn test_cancelled_before_start_aborts_with_summary() {
        let engine = single_node_engine("hello!");
        engine.cancel_token().cancel();

        let outcome = engine.run("hi").await;
        assert_eq!(outcome.status, RunStatus::Aborted);
        assert_eq!(outcome.state.hop_count, 0);
        assert_eq!(
            outcome.state.summary.as_deref(),
            Some(fallback::FALLBACK_SUMMARY)
        );
    }

    #[tokio::test]
    async fn test_history_trimmed_to_limit() {
        let llm = Arc::new(StaticLlm::new("ok"));
        let nodes: Vec<Arc<dyn AgentNode>> =
            vec![Arc::new(ConversationalNode::new(llm, test_model_config()))];
        let engine = Engine::new(
            nodes,
            Router::new(),
            OrchestratorConfig {
                max_hops: 8,
                history_limit: 2,
            },
            Arc::new(EventBus::default()),
        );

        let prior: Vec<Message> = (0..5).map(|i| Message::user(format!("m{}", i))).collect();
        let outcome = engine.run_with_history("hi", prior).await;

        // 2 kept prior + user query + assistant reply
        assert_eq!(outcome.state.messages.len(), 4);
        assert_eq!(outcome.state.messages[0].content, "m3");
    }
}
