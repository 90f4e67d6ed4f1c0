//! Structured command results
//!
//! The engine is embedded, so outcomes are records rather than exit codes:
//! `{success, message, data}` with `data` a flat array of typed summaries.

use serde::Serialize;

use crate::engine::store::ResourceStore;
use crate::models::{
    ConfigMap, Deployment, Node, Pod, PodPhase, ReplicaSet, Secret, Service, ServiceType,
};

/// Result of one command invocation
#[derive(Debug, Serialize)]
pub struct CommandResult {
    /// Whether the command was successful
    pub success: bool,
    /// Human-readable outcome
    pub message: String,
    /// Resource summaries (present on `get`)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Vec<ResourceSummary>>,
}

impl CommandResult {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
            data: None,
        }
    }

    pub fn with_data(message: impl Into<String>, data: Vec<ResourceSummary>) -> Self {
        Self {
            success: true,
            message: message.into(),
            data: Some(data),
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            data: None,
        }
    }
}

/// Flat per-resource summary record
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum ResourceSummary {
    Pod(PodSummary),
    Node(NodeSummary),
    Deployment(DeploymentSummary),
    ReplicaSet(ReplicaSetSummary),
    Service(ServiceSummary),
    KeyValue(KeyValueSummary),
}

#[derive(Debug, Clone, Serialize)]
pub struct PodSummary {
    pub name: String,
    pub phase: PodPhase,
    pub node: String,
    pub image: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,
}

impl From<&Pod> for PodSummary {
    fn from(pod: &Pod) -> Self {
        Self {
            name: pod.name.clone(),
            phase: pod.phase,
            node: pod.node_name.clone(),
            image: pod.image.clone(),
            owner: pod.owner.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct NodeSummary {
    pub name: String,
    pub capacity: u32,
    pub pods: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct DeploymentSummary {
    pub name: String,
    pub replicas: u32,
    /// Running owned pods as last observed by the loop
    pub ready: u32,
    pub image: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReplicaSetSummary {
    pub name: String,
    pub owner: String,
    pub desired: u32,
    pub current: u32,
}

impl From<&ReplicaSet> for ReplicaSetSummary {
    fn from(rs: &ReplicaSet) -> Self {
        Self {
            name: rs.name.clone(),
            owner: rs.owner.clone(),
            desired: rs.desired,
            current: rs.current,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ServiceSummary {
    pub name: String,
    #[serde(rename = "type")]
    pub service_type: ServiceType,
}

impl From<&Service> for ServiceSummary {
    fn from(service: &Service) -> Self {
        Self {
            name: service.name.clone(),
            service_type: service.service_type,
        }
    }
}

/// ConfigMap/Secret listing; secret values are never shown, only key counts
#[derive(Debug, Clone, Serialize)]
pub struct KeyValueSummary {
    pub name: String,
    pub keys: usize,
}

impl From<&ConfigMap> for KeyValueSummary {
    fn from(cm: &ConfigMap) -> Self {
        Self {
            name: cm.name.clone(),
            keys: cm.data.len(),
        }
    }
}

impl From<&Secret> for KeyValueSummary {
    fn from(secret: &Secret) -> Self {
        Self {
            name: secret.name.clone(),
            keys: secret.data.len(),
        }
    }
}

pub fn node_summary(store: &ResourceStore, node: &Node) -> NodeSummary {
    NodeSummary {
        name: node.name.clone(),
        capacity: node.capacity,
        pods: store.pods_on_node(&node.name),
    }
}

pub fn deployment_summary(store: &ResourceStore, deployment: &Deployment) -> DeploymentSummary {
    let ready = store
        .replica_set_for(&deployment.name)
        .map(|rs| rs.current)
        .unwrap_or(0);
    DeploymentSummary {
        name: deployment.name.clone(),
        replicas: deployment.replicas,
        ready,
        image: deployment.image.clone(),
    }
}
