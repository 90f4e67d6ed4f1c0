use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// The resource kinds managed by the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    /// Accepts the usual kubectl spellings: pod, pods, po
    #[strum(to_string = "pod", serialize = "pods", serialize = "po")]
    Pod,
    #[strum(to_string = "node", serialize = "nodes", serialize = "no")]
    Node,
    #[strum(to_string = "deployment", serialize = "deployments", serialize = "deploy")]
    Deployment,
    #[strum(to_string = "replicaset", serialize = "replicasets", serialize = "rs")]
    ReplicaSet,
    #[strum(to_string = "service", serialize = "services", serialize = "svc")]
    Service,
    #[strum(to_string = "configmap", serialize = "configmaps", serialize = "cm")]
    ConfigMap,
    #[strum(to_string = "secret", serialize = "secrets")]
    Secret,
}
