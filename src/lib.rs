//! ClusterSim Engine Library
//!
//! This library contains the core components of the ClusterSim reconciliation
//! engine: the typed resource store, the reconciliation loop, the command
//! interpreter and the event bus. Rendering, missions and persistence live in
//! external layers that consume the event surface.

pub mod command;
pub mod config;
pub mod engine;
pub mod error;
pub mod events;
pub mod models;

pub use command::{CommandInterpreter, CommandResult};
pub use config::EngineConfig;
pub use engine::ClusterEngine;
pub use error::{EngineError, EngineResult};
pub use events::{ClusterEvent, EventBus, EventKind};
