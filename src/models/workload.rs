use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Declares a desired replica count and container image
///
/// `previous_image` holds exactly one prior image for single-level rollback;
/// updating the image again overwrites it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Deployment {
    pub uid: Uuid,
    pub name: String,
    pub image: String,
    #[serde(default)]
    pub previous_image: Option<String>,
    pub replicas: u32,
    pub created_at: DateTime<Utc>,
}

impl Deployment {
    pub fn new(name: String, image: String, replicas: u32) -> Self {
        Self {
            uid: Uuid::new_v4(),
            name,
            image,
            previous_image: None,
            replicas,
            created_at: Utc::now(),
        }
    }
}

/// Maintains a target count of Pods for a Deployment
///
/// Created lazily by the reconciliation loop; at most one per Deployment,
/// no revision history. Owned-pod membership is derived from `Pod::owner`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplicaSet {
    pub uid: Uuid,
    pub name: String,
    /// Name of the owning Deployment
    pub owner: String,
    pub desired: u32,
    /// Count of owned pods currently Running, refreshed each tick
    pub current: u32,
    pub created_at: DateTime<Utc>,
}

impl ReplicaSet {
    pub fn new(name: String, owner: String, desired: u32) -> Self {
        Self {
            uid: Uuid::new_v4(),
            name,
            owner,
            desired,
            current: 0,
            created_at: Utc::now(),
        }
    }
}
