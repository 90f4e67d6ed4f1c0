//! Engine error taxonomy
//!
//! Every domain error is a value; nothing crosses the command boundary as a
//! panic. The interpreter converts these into failure results.

use thiserror::Error;

use crate::models::ResourceKind;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    /// Create on a name that already exists within the kind
    #[error("{kind} \"{name}\" already exists")]
    Duplicate { kind: ResourceKind, name: String },

    /// Operation on a name that does not exist within the kind
    #[error("{kind} \"{name}\" not found")]
    NotFound { kind: ResourceKind, name: String },

    /// No node has free capacity for the pod
    #[error("no node has free capacity for pod \"{0}\"")]
    Capacity(String),

    /// Malformed command: missing name, bad count, unknown verb or kind
    #[error("{0}")]
    Validation(String),
}

impl EngineError {
    pub fn duplicate(kind: ResourceKind, name: impl Into<String>) -> Self {
        Self::Duplicate {
            kind,
            name: name.into(),
        }
    }

    pub fn not_found(kind: ResourceKind, name: impl Into<String>) -> Self {
        Self::NotFound {
            kind,
            name: name.into(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }
}

pub type EngineResult<T> = Result<T, EngineError>;
