use std::time::Duration;

use anyhow::Result;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct EngineConfig {
    /// Fixed number of nodes created at bootstrap
    #[serde(default = "default_node_count")]
    pub node_count: u32,

    /// Pods a node hosts before first-fit placement skips it
    #[serde(default = "default_node_capacity")]
    pub node_capacity: u32,

    #[serde(default = "default_reconcile_interval_ms")]
    pub reconcile_interval_ms: u64,

    /// Deterministic Pending→Running delay per pod
    #[serde(default = "default_promotion_delay_ms")]
    pub promotion_delay_ms: u64,

    /// Delay between Terminating and physical removal
    #[serde(default = "default_grace_period_ms")]
    pub grace_period_ms: u64,
}

fn default_node_count() -> u32 {
    3
}

fn default_node_capacity() -> u32 {
    4
}

fn default_reconcile_interval_ms() -> u64 {
    1500
}

fn default_promotion_delay_ms() -> u64 {
    1000
}

fn default_grace_period_ms() -> u64 {
    2000
}

impl EngineConfig {
    pub fn load() -> Result<Self> {
        // Load .env file if it exists
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .add_source(config::Environment::with_prefix("CLUSTERSIM"))
            .build()?;

        let settings: EngineConfig = config
            .try_deserialize()
            .unwrap_or_else(|_| EngineConfig::default());

        Ok(settings)
    }

    pub fn reconcile_interval(&self) -> Duration {
        Duration::from_millis(self.reconcile_interval_ms)
    }

    pub fn promotion_delay(&self) -> Duration {
        Duration::from_millis(self.promotion_delay_ms)
    }

    pub fn grace_period(&self) -> Duration {
        Duration::from_millis(self.grace_period_ms)
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            node_count: default_node_count(),
            node_capacity: default_node_capacity(),
            reconcile_interval_ms: default_reconcile_interval_ms(),
            promotion_delay_ms: default_promotion_delay_ms(),
            grace_period_ms: default_grace_period_ms(),
        }
    }
}
