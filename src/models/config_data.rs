use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

/// Plain key/value configuration data
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigMap {
    pub uid: Uuid,
    pub name: String,
    #[serde(default)]
    pub data: BTreeMap<String, String>,
    pub created_at: DateTime<Utc>,
}

impl ConfigMap {
    pub fn new(name: String, data: BTreeMap<String, String>) -> Self {
        Self {
            uid: Uuid::new_v4(),
            name,
            data,
            created_at: Utc::now(),
        }
    }
}

/// Key/value data that should not be shown in plain listings
///
/// The simulator stores values as-is; only the summaries redact them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Secret {
    pub uid: Uuid,
    pub name: String,
    #[serde(default)]
    pub data: BTreeMap<String, String>,
    pub created_at: DateTime<Utc>,
}

impl Secret {
    pub fn new(name: String, data: BTreeMap<String, String>) -> Self {
        Self {
            uid: Uuid::new_v4(),
            name,
            data,
            created_at: Utc::now(),
        }
    }
}
