//! Cluster engine
//!
//! `ClusterEngine` owns the resource store, the event bus, and the
//! reconciliation loop task. Callers construct one instance, start it, and
//! tear it down; there is no ambient global state.

pub mod reconciler;
pub mod store;

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::info;

use crate::config::EngineConfig;
use crate::error::{EngineError, EngineResult};
use crate::events::{ClusterEvent, EventBus};
use crate::models::{ResourceKind, ServiceType};

use reconciler::run_tick;
use store::ResourceStore;

/// The reconciliation engine: single source of cluster state
///
/// Commands mutate desired state through the methods here; the loop converges
/// actual state on a fixed interval. Every successful create/delete/scale
/// publishes exactly one matching event after the store lock is released.
pub struct ClusterEngine {
    store: Arc<RwLock<ResourceStore>>,
    events: Arc<EventBus>,
    config: EngineConfig,
    loop_task: Mutex<Option<JoinHandle<()>>>,
}

impl ClusterEngine {
    pub fn new(config: EngineConfig) -> Self {
        let store = ResourceStore::bootstrap(config.node_count, config.node_capacity);
        Self {
            store: Arc::new(RwLock::new(store)),
            events: Arc::new(EventBus::new()),
            config,
            loop_task: Mutex::new(None),
        }
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Spawn the reconciliation loop; idempotent
    pub fn start(&self) {
        let mut guard = self.loop_task.lock().unwrap_or_else(|e| e.into_inner());
        if guard.is_some() {
            return;
        }

        let store = self.store.clone();
        let events = self.events.clone();
        let interval = self.config.reconcile_interval();
        let promotion_delay = self.config.promotion_delay();
        let grace_period = self.config.grace_period();

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let summary = {
                    let mut store = store.write().await;
                    run_tick(&mut store, promotion_delay, grace_period)
                };
                for event in summary.events {
                    events.publish(event);
                }
            }
        });

        *guard = Some(handle);
        info!(
            "reconciliation loop started (interval {}ms)",
            interval.as_millis()
        );
    }

    /// Stop the loop and with it every pending promotion/grace deadline
    ///
    /// Deadlines are realized by the loop's sweeps, so aborting the task is
    /// the single cancellation point; nothing fires against disposed state.
    pub fn shutdown(&self) {
        let mut guard = self.loop_task.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(handle) = guard.take() {
            handle.abort();
            info!("reconciliation loop stopped");
        }
    }

    /// Run one reconciliation pass now (tests and embedders drive this)
    pub async fn tick(&self) {
        let summary = {
            let mut store = self.store.write().await;
            run_tick(
                &mut store,
                self.config.promotion_delay(),
                self.config.grace_period(),
            )
        };
        for event in summary.events {
            self.events.publish(event);
        }
    }

    /// Read access to the store for listings and summaries
    pub async fn with_store<R>(&self, f: impl FnOnce(&ResourceStore) -> R) -> R {
        let store = self.store.read().await;
        f(&store)
    }

    // ---- Desired-state mutations (the command surface calls these) ----

    pub async fn create_pod(&self, name: &str, image: &str) -> EngineResult<()> {
        {
            let mut store = self.store.write().await;
            store.create_pod(name, image, None, false, self.config.promotion_delay())?;
        }
        self.events.publish(ClusterEvent::PodCreated {
            name: name.to_string(),
        });
        Ok(())
    }

    pub async fn delete_pod(&self, name: &str) -> EngineResult<()> {
        let newly_terminated = {
            let mut store = self.store.write().await;
            store.delete_pod(name, self.config.grace_period())?
        };
        if newly_terminated {
            self.events.publish(ClusterEvent::PodDeleted {
                name: name.to_string(),
            });
        }
        Ok(())
    }

    pub async fn create_deployment(
        &self,
        name: &str,
        image: &str,
        replicas: u32,
    ) -> EngineResult<()> {
        {
            let mut store = self.store.write().await;
            store.create_deployment(name, image, replicas)?;
        }
        self.events.publish(ClusterEvent::DeploymentCreated {
            name: name.to_string(),
            replicas,
        });
        Ok(())
    }

    pub async fn delete_deployment(&self, name: &str) -> EngineResult<()> {
        let cascade = {
            let mut store = self.store.write().await;
            store.delete_deployment(name, self.config.grace_period())?
        };
        self.events.publish(ClusterEvent::DeploymentDeleted {
            name: name.to_string(),
        });
        for pod_name in cascade {
            self.events
                .publish(ClusterEvent::PodDeleted { name: pod_name });
        }
        Ok(())
    }

    /// Mutate desired replicas; the next tick converges toward it
    pub async fn scale_deployment(&self, name: &str, replicas: u32) -> EngineResult<()> {
        {
            let mut store = self.store.write().await;
            let deployment = store
                .deployment_mut(name)
                .ok_or_else(|| EngineError::not_found(ResourceKind::Deployment, name))?;
            deployment.replicas = replicas;
        }
        self.events.publish(ClusterEvent::DeploymentScaled {
            name: name.to_string(),
            new_replicas: replicas,
        });
        Ok(())
    }

    /// Set a new image, remembering exactly one prior image for rollback
    pub async fn update_image(&self, name: &str, image: &str) -> EngineResult<()> {
        {
            let mut store = self.store.write().await;
            let deployment = store
                .deployment_mut(name)
                .ok_or_else(|| EngineError::not_found(ResourceKind::Deployment, name))?;
            deployment.previous_image = Some(deployment.image.clone());
            deployment.image = image.to_string();
        }
        self.events.publish(ClusterEvent::ImageUpdated {
            name: name.to_string(),
            image: image.to_string(),
        });
        Ok(())
    }

    /// Restore the previous image; fails when there is no history
    pub async fn rollback(&self, name: &str) -> EngineResult<String> {
        let restored = {
            let mut store = self.store.write().await;
            let deployment = store
                .deployment_mut(name)
                .ok_or_else(|| EngineError::not_found(ResourceKind::Deployment, name))?;
            let previous = deployment.previous_image.take().ok_or_else(|| {
                EngineError::validation(format!(
                    "deployment \"{}\" has no rollout history to undo",
                    name
                ))
            })?;
            deployment.image = previous.clone();
            previous
        };
        self.events.publish(ClusterEvent::RolledBack {
            name: name.to_string(),
            image: restored.clone(),
        });
        Ok(restored)
    }

    pub async fn create_service(&self, name: &str, service_type: ServiceType) -> EngineResult<()> {
        {
            let mut store = self.store.write().await;
            store.create_service(name, service_type)?;
        }
        self.events.publish(ClusterEvent::ServiceCreated {
            name: name.to_string(),
            service_type,
        });
        Ok(())
    }

    pub async fn delete_service(&self, name: &str) -> EngineResult<()> {
        {
            let mut store = self.store.write().await;
            store.delete_service(name)?;
        }
        self.events.publish(ClusterEvent::ServiceDeleted {
            name: name.to_string(),
        });
        Ok(())
    }

    pub async fn create_config_map(
        &self,
        name: &str,
        data: BTreeMap<String, String>,
    ) -> EngineResult<()> {
        {
            let mut store = self.store.write().await;
            store.create_config_map(name, data)?;
        }
        self.events.publish(ClusterEvent::ConfigMapCreated {
            name: name.to_string(),
        });
        Ok(())
    }

    pub async fn delete_config_map(&self, name: &str) -> EngineResult<()> {
        {
            let mut store = self.store.write().await;
            store.delete_config_map(name)?;
        }
        self.events.publish(ClusterEvent::ConfigMapDeleted {
            name: name.to_string(),
        });
        Ok(())
    }

    pub async fn create_secret(
        &self,
        name: &str,
        data: BTreeMap<String, String>,
    ) -> EngineResult<()> {
        {
            let mut store = self.store.write().await;
            store.create_secret(name, data)?;
        }
        self.events.publish(ClusterEvent::SecretCreated {
            name: name.to_string(),
        });
        Ok(())
    }

    pub async fn delete_secret(&self, name: &str) -> EngineResult<()> {
        {
            let mut store = self.store.write().await;
            store.delete_secret(name)?;
        }
        self.events.publish(ClusterEvent::SecretDeleted {
            name: name.to_string(),
        });
        Ok(())
    }
}

impl Drop for ClusterEngine {
    fn drop(&mut self) {
        self.shutdown();
    }
}
