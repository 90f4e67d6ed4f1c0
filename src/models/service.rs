use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use uuid::Uuid;

/// How a Service is exposed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, Default)]
pub enum ServiceType {
    #[default]
    ClusterIP,
    NodePort,
    LoadBalancer,
}

/// A stable virtual endpoint in front of a workload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Service {
    pub uid: Uuid,
    pub name: String,
    #[serde(rename = "type")]
    pub service_type: ServiceType,
    pub created_at: DateTime<Utc>,
}

impl Service {
    pub fn new(name: String, service_type: ServiceType) -> Self {
        Self {
            uid: Uuid::new_v4(),
            name,
            service_type,
            created_at: Utc::now(),
        }
    }
}
