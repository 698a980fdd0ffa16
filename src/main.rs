use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use futures::future::BoxFuture;
use tracing::info;
use tracing_subscriber::EnvFilter;

use sibyl_agent::{
    AgentNode, ConversationalNode, DataRetrievalNode, Engine, InsightSynthesisNode, Router,
};
use sibyl_core::config::AppConfig;
use sibyl_core::error::Result;
use sibyl_core::event::EventBus;
use sibyl_core::traits::{DatasetDirectory, LlmClient};
use sibyl_core::types::DatasetRef;
use sibyl_llm::RetryingClient;

#[derive(Parser)]
#[command(name = "sibyl", version, about = "Conversational analytics agent runtime")]
struct Cli {
    /// Path to config file
    #[arg(short, long, default_value = "sibyl.toml")]
    config: PathBuf,

    /// The question to ask
    #[arg(trailing_var_arg = true, required = true)]
    query: Vec<String>,
}

/// The CLI ships without a dataset connector; deployments wire a real
/// directory behind the same trait.
struct NoDatasets;

impl DatasetDirectory for NoDatasets {
    fn list_datasets(&self) -> BoxFuture<'_, Result<Vec<DatasetRef>>> {
        Box::pin(async { Ok(Vec::new()) })
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let config = AppConfig::load(&cli.config)?;
    let query = cli.query.join(" ");

    let primary = sibyl_llm::create_client(&config.model);
    let fallbacks = config
        .fallback_models
        .iter()
        .map(|m| (m.clone(), sibyl_llm::create_client(m)))
        .collect();
    let llm: Arc<dyn LlmClient> = Arc::new(RetryingClient::new(
        primary,
        fallbacks,
        config.retry.clone(),
    ));

    let model = config.model.clone();
    let nodes: Vec<Arc<dyn AgentNode>> = vec![
        Arc::new(ConversationalNode::new(llm.clone(), model.clone())),
        Arc::new(DataRetrievalNode::new(Arc::new(NoDatasets))),
        Arc::new(InsightSynthesisNode::new(llm, model)),
    ];
    let engine = Engine::new(
        nodes,
        Router::new(),
        config.orchestrator.clone(),
        Arc::new(EventBus::default()),
    );

    let outcome = engine.run(&query).await;
    info!(
        run_id = %outcome.run_id,
        status = ?outcome.status,
        hops = outcome.state.hop_count,
        "Run finished"
    );

    println!("{}", outcome.state.summary.unwrap_or_default());
    for insight in &outcome.state.insights {
        println!("  - [{:.2}] {}", insight.confidence, insight.title);
    }

    Ok(())
}
