//! Agent orchestration — routes a user query through a directed graph of
//! specialized agent nodes until a terminal node produces a final response.
//!
//! The `Engine` owns a `SharedState` for the duration of one run. Each
//! `AgentNode` receives a read view of that state and returns a
//! `StateUpdate` (merged by the engine) plus a `Directive` naming the next
//! hop or terminating the run. Failures are contained per node via declared
//! fallback policies; the engine guarantees a terminal state with a
//! user-presentable summary no matter what fails.

pub mod engine;
pub mod fallback;
pub mod nodes;
pub mod router;
pub mod state;

pub use engine::{Engine, RunOutcome};
pub use nodes::{AgentNode, ConversationalNode, DataRetrievalNode, InsightSynthesisNode};
pub use router::Router;
pub use state::{SharedState, StateUpdate};
