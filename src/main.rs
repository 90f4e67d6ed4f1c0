use anyhow::Result;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use clustersim_engine::{ClusterEngine, CommandInterpreter, EngineConfig};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting ClusterSim Engine");

    // Load configuration
    let config = EngineConfig::load()?;
    tracing::info!("Configuration loaded");

    // Build the engine and start the reconciliation loop
    let engine = Arc::new(ClusterEngine::new(config.clone()));
    engine.start();
    tracing::info!(
        "✅ Cluster bootstrapped with {} node(s), capacity {} pods each",
        config.node_count,
        config.node_capacity
    );

    // Stream engine events the way external layers would
    let mut event_rx = engine.events().watch();
    tokio::spawn(async move {
        while let Ok(event) = event_rx.recv().await {
            match serde_json::to_string(&event) {
                Ok(json) => tracing::info!("event: {}", json),
                Err(e) => tracing::warn!("event serialization failed: {}", e),
            }
        }
    });

    let interpreter = CommandInterpreter::new(engine.clone());

    // Interactive shell over stdin
    println!("ClusterSim shell. Type kubectl commands, or \"exit\" to quit.");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if line == "exit" || line == "quit" {
            break;
        }

        let result = interpreter.execute(line).await;
        if result.success {
            println!("{}", result.message);
        } else {
            println!("error: {}", result.message);
        }
        if let Some(data) = &result.data {
            for summary in data {
                match serde_json::to_string(summary) {
                    Ok(json) => println!("  {}", json),
                    Err(e) => tracing::warn!("summary serialization failed: {}", e),
                }
            }
        }
    }

    engine.shutdown();
    tracing::info!("ClusterSim Engine stopped");

    Ok(())
}
