//! Cluster lifecycle events
//!
//! A typed event enum published synchronously to registered handlers, with a
//! broadcast mirror for streaming consumers. External layers (UI, missions)
//! subscribe here and must tolerate events for resources they do not track.

use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use serde::Serialize;
use strum::{Display, EnumDiscriminants, EnumString};
use tokio::sync::broadcast;

use crate::models::{PodPhase, ServiceType};

/// Events emitted on resource lifecycle transitions
#[derive(Debug, Clone, PartialEq, Serialize, EnumDiscriminants)]
#[serde(tag = "type", content = "data")]
#[strum_discriminants(
    name(EventKind),
    derive(Hash, Display, EnumString),
    strum(serialize_all = "snake_case")
)]
pub enum ClusterEvent {
    #[serde(rename = "pod:created")]
    PodCreated { name: String },
    #[serde(rename = "pod:deleted")]
    PodDeleted { name: String },
    #[serde(rename = "pod:phase_changed")]
    PodPhaseChanged { name: String, phase: PodPhase },
    #[serde(rename = "deployment:created")]
    DeploymentCreated { name: String, replicas: u32 },
    #[serde(rename = "deployment:scaled")]
    DeploymentScaled { name: String, new_replicas: u32 },
    #[serde(rename = "deployment:deleted")]
    DeploymentDeleted { name: String },
    #[serde(rename = "deployment:image_updated")]
    ImageUpdated { name: String, image: String },
    #[serde(rename = "deployment:rolled_back")]
    RolledBack { name: String, image: String },
    #[serde(rename = "service:created")]
    ServiceCreated {
        name: String,
        service_type: ServiceType,
    },
    #[serde(rename = "service:deleted")]
    ServiceDeleted { name: String },
    #[serde(rename = "configmap:created")]
    ConfigMapCreated { name: String },
    #[serde(rename = "configmap:deleted")]
    ConfigMapDeleted { name: String },
    #[serde(rename = "secret:created")]
    SecretCreated { name: String },
    #[serde(rename = "secret:deleted")]
    SecretDeleted { name: String },
}

impl ClusterEvent {
    /// Discriminant used as the subscription key
    pub fn kind(&self) -> EventKind {
        self.into()
    }
}

/// Handle returned by `subscribe`, used to unsubscribe
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubscriptionId(u64);

type Handler = Box<dyn Fn(&ClusterEvent) + Send + Sync>;

/// Synchronous publish/subscribe channel for cluster events
///
/// Handlers run in subscription order on the publisher's thread. A panicking
/// handler is caught and logged; it never blocks the remaining handlers or
/// the publisher. `watch` exposes the same stream over a broadcast channel.
pub struct EventBus {
    handlers: Mutex<HashMap<EventKind, Vec<(SubscriptionId, Handler)>>>,
    next_id: AtomicU64,
    broadcast_tx: broadcast::Sender<ClusterEvent>,
}

impl EventBus {
    pub fn new() -> Self {
        let (broadcast_tx, _) = broadcast::channel(100);
        Self {
            handlers: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(1),
            broadcast_tx,
        }
    }

    /// Register a handler for one event kind
    pub fn subscribe<F>(&self, kind: EventKind, handler: F) -> SubscriptionId
    where
        F: Fn(&ClusterEvent) + Send + Sync + 'static,
    {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let mut handlers = self.handlers.lock().unwrap_or_else(|e| e.into_inner());
        handlers
            .entry(kind)
            .or_default()
            .push((id, Box::new(handler)));
        id
    }

    /// Remove a previously registered handler; returns false if unknown
    pub fn unsubscribe(&self, kind: EventKind, id: SubscriptionId) -> bool {
        let mut handlers = self.handlers.lock().unwrap_or_else(|e| e.into_inner());
        match handlers.get_mut(&kind) {
            Some(list) => {
                let before = list.len();
                list.retain(|(sub_id, _)| *sub_id != id);
                list.len() < before
            }
            None => false,
        }
    }

    /// Subscribe as a stream, for consumers that poll rather than register
    pub fn watch(&self) -> broadcast::Receiver<ClusterEvent> {
        self.broadcast_tx.subscribe()
    }

    /// Deliver an event to every handler of its kind, in subscription order
    pub fn publish(&self, event: ClusterEvent) {
        let handlers = self.handlers.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(list) = handlers.get(&event.kind()) {
            for (id, handler) in list {
                let outcome = catch_unwind(AssertUnwindSafe(|| handler(&event)));
                if outcome.is_err() {
                    tracing::error!(
                        "event handler {:?} panicked on {}; continuing delivery",
                        id,
                        event.kind()
                    );
                }
            }
        }
        drop(handlers);

        // No receivers is fine; the send result is intentionally ignored
        let _ = self.broadcast_tx.send(event);
    }

    /// Number of registered handlers across all kinds
    pub fn handler_count(&self) -> usize {
        let handlers = self.handlers.lock().unwrap_or_else(|e| e.into_inner());
        handlers.values().map(Vec::len).sum()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}
