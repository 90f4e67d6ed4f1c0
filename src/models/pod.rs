use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::Display;
use uuid::Uuid;

/// Lifecycle phase of a Pod
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
pub enum PodPhase {
    /// Scheduled to a node, container not yet started
    Pending,
    /// Container up and counting toward replica totals
    Running,
    /// Marked for deletion, awaiting the grace period
    Terminating,
    Failed,
    Succeeded,
}

/// The smallest simulated workload unit, hosted by exactly one Node
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pod {
    pub uid: Uuid,
    pub name: String,
    pub image: String,
    pub phase: PodPhase,
    /// Name of the hosting Node
    pub node_name: String,
    /// Name of the owning ReplicaSet, if any
    #[serde(default)]
    pub owner: Option<String>,
    /// Store-wide creation counter; defines creation order for scale-down
    pub sequence: u64,
    pub created_at: DateTime<Utc>,
}

impl Pod {
    pub fn new(
        name: String,
        image: String,
        node_name: String,
        owner: Option<String>,
        sequence: u64,
    ) -> Self {
        Self {
            uid: Uuid::new_v4(),
            name,
            image,
            phase: PodPhase::Pending,
            node_name,
            owner,
            sequence,
            created_at: Utc::now(),
        }
    }

    /// Whether this pod still occupies a replica slot
    pub fn is_active(&self) -> bool {
        matches!(self.phase, PodPhase::Pending | PodPhase::Running)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_pod_starts_pending() {
        let pod = Pod::new(
            "web-1".to_string(),
            "nginx:latest".to_string(),
            "node-1".to_string(),
            None,
            1,
        );
        assert_eq!(pod.phase, PodPhase::Pending);
        assert!(pod.is_active());
        assert!(pod.owner.is_none());
    }

    #[test]
    fn test_terminating_pod_is_not_active() {
        let mut pod = Pod::new(
            "web-1".to_string(),
            "nginx:latest".to_string(),
            "node-1".to_string(),
            Some("web-rs".to_string()),
            1,
        );
        pod.phase = PodPhase::Terminating;
        assert!(!pod.is_active());
    }

    #[test]
    fn test_phase_serializes_as_pascal_case() {
        let json = serde_json::to_string(&PodPhase::Running).unwrap();
        assert_eq!(json, "\"Running\"");
    }
}
