use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A worker node hosting simulated Pods
///
/// Nodes exist from cluster bootstrap and are never created or deleted by
/// commands. Hosted-pod membership is derived by querying Pods by
/// `node_name` — the node does not control pod lifecycle, it only hosts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Node {
    pub uid: Uuid,
    pub name: String,
    /// Maximum pods this node hosts before first-fit placement skips it
    pub capacity: u32,
    pub created_at: DateTime<Utc>,
}

impl Node {
    pub fn new(name: String, capacity: u32) -> Self {
        Self {
            uid: Uuid::new_v4(),
            name,
            capacity,
            created_at: Utc::now(),
        }
    }
}
