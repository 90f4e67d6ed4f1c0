//! Command interpreter
//!
//! Parses `kubectl`-style command lines and dispatches them to engine
//! operations. This is the single point where domain errors become
//! user-facing failure results; `execute` never panics and never throws.

pub mod parser;
pub mod result;

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::engine::store::ResourceStore;
use crate::engine::ClusterEngine;
use crate::error::{EngineError, EngineResult};
use crate::models::{ResourceKind, ServiceType};

pub use parser::{parse, ParsedCommand, Verb};
pub use result::{CommandResult, ResourceSummary};

use result::{deployment_summary, node_summary};

/// Container image used when --image is not given
pub const DEFAULT_IMAGE: &str = "nginx:latest";

pub struct CommandInterpreter {
    engine: Arc<ClusterEngine>,
}

impl CommandInterpreter {
    pub fn new(engine: Arc<ClusterEngine>) -> Self {
        Self { engine }
    }

    /// Parse and dispatch one command line
    pub async fn execute(&self, line: &str) -> CommandResult {
        let cmd = match parser::parse(line) {
            Ok(cmd) => cmd,
            Err(e) => return CommandResult::failure(e.to_string()),
        };
        match self.dispatch(&cmd).await {
            Ok(result) => result,
            Err(e) => CommandResult::failure(e.to_string()),
        }
    }

    async fn dispatch(&self, cmd: &ParsedCommand) -> EngineResult<CommandResult> {
        match cmd.verb {
            Verb::Create => self.create(cmd).await,
            Verb::Get => self.get(cmd).await,
            Verb::Delete => self.delete(cmd).await,
            Verb::Scale => self.scale(cmd).await,
            Verb::Set => self.set_image(cmd).await,
            Verb::Rollout => self.rollout_undo(cmd).await,
            // Defined as permanently unimplemented
            Verb::Apply => Ok(CommandResult::failure(
                "apply is not supported; use create, scale and delete",
            )),
        }
    }

    async fn create(&self, cmd: &ParsedCommand) -> EngineResult<CommandResult> {
        let name = require_name(cmd)?;
        match cmd.kind {
            ResourceKind::Pod => {
                cmd.reject_unknown_flags(&["image"])?;
                let image = cmd.flag("image").unwrap_or(DEFAULT_IMAGE);
                self.engine.create_pod(name, image).await?;
                Ok(CommandResult::ok(format!("pod \"{}\" created", name)))
            }
            ResourceKind::Deployment => {
                cmd.reject_unknown_flags(&["image", "replicas"])?;
                let replicas = parse_count(cmd.flag("replicas").unwrap_or("1"))?;
                let image = cmd.flag("image").unwrap_or(DEFAULT_IMAGE);
                self.engine.create_deployment(name, image, replicas).await?;
                Ok(CommandResult::ok(format!(
                    "deployment \"{}\" created with {} replica(s)",
                    name, replicas
                )))
            }
            ResourceKind::Service => {
                cmd.reject_unknown_flags(&["type"])?;
                let service_type = match cmd.flag("type") {
                    Some(raw) => raw.parse::<ServiceType>().map_err(|_| {
                        EngineError::validation(format!(
                            "unknown service type \"{}\"; try ClusterIP, NodePort or LoadBalancer",
                            raw
                        ))
                    })?,
                    None => ServiceType::default(),
                };
                self.engine.create_service(name, service_type).await?;
                Ok(CommandResult::ok(format!(
                    "service \"{}\" created ({})",
                    name, service_type
                )))
            }
            ResourceKind::ConfigMap => {
                cmd.reject_unknown_flags(&["from-literal"])?;
                let data = parse_literals(cmd)?;
                self.engine.create_config_map(name, data).await?;
                Ok(CommandResult::ok(format!("configmap \"{}\" created", name)))
            }
            ResourceKind::Secret => {
                cmd.reject_unknown_flags(&["from-literal"])?;
                let data = parse_literals(cmd)?;
                self.engine.create_secret(name, data).await?;
                Ok(CommandResult::ok(format!("secret \"{}\" created", name)))
            }
            ResourceKind::Node => Err(EngineError::validation(
                "nodes are fixed at cluster bootstrap and cannot be created or deleted",
            )),
            ResourceKind::ReplicaSet => Err(EngineError::validation(
                "replicasets are managed by their owning deployment",
            )),
        }
    }

    async fn get(&self, cmd: &ParsedCommand) -> EngineResult<CommandResult> {
        cmd.reject_unknown_flags(&[])?;
        let kind = cmd.kind;
        let filter = cmd.name.clone();
        let summaries = self
            .engine
            .with_store(move |store| collect_summaries(store, kind, filter.as_deref()))
            .await;

        if let Some(name) = &cmd.name {
            if summaries.is_empty() {
                return Err(EngineError::not_found(kind, name));
            }
        }

        let message = format!("{} {}", summaries.len(), plural(kind, summaries.len()));
        Ok(CommandResult::with_data(message, summaries))
    }

    async fn delete(&self, cmd: &ParsedCommand) -> EngineResult<CommandResult> {
        cmd.reject_unknown_flags(&[])?;
        let name = require_name(cmd)?;
        match cmd.kind {
            ResourceKind::Pod => {
                self.engine.delete_pod(name).await?;
                Ok(CommandResult::ok(format!("pod \"{}\" deleted", name)))
            }
            ResourceKind::Deployment => {
                self.engine.delete_deployment(name).await?;
                Ok(CommandResult::ok(format!(
                    "deployment \"{}\" deleted (replicaset and pods removed)",
                    name
                )))
            }
            ResourceKind::Service => {
                self.engine.delete_service(name).await?;
                Ok(CommandResult::ok(format!("service \"{}\" deleted", name)))
            }
            ResourceKind::ConfigMap => {
                self.engine.delete_config_map(name).await?;
                Ok(CommandResult::ok(format!("configmap \"{}\" deleted", name)))
            }
            ResourceKind::Secret => {
                self.engine.delete_secret(name).await?;
                Ok(CommandResult::ok(format!("secret \"{}\" deleted", name)))
            }
            ResourceKind::Node => Err(EngineError::validation(
                "nodes are fixed at cluster bootstrap and cannot be created or deleted",
            )),
            ResourceKind::ReplicaSet => Err(EngineError::validation(
                "replicasets are managed by their owning deployment; delete the deployment instead",
            )),
        }
    }

    async fn scale(&self, cmd: &ParsedCommand) -> EngineResult<CommandResult> {
        if cmd.kind != ResourceKind::Deployment {
            return Err(EngineError::validation(format!(
                "cannot scale a {}",
                cmd.kind
            )));
        }
        cmd.reject_unknown_flags(&["replicas"])?;
        let name = require_name(cmd)?;
        let raw = cmd
            .args
            .first()
            .map(String::as_str)
            .or_else(|| cmd.flag("replicas"))
            .ok_or_else(|| {
                EngineError::validation(
                    "missing replica count; usage: kubectl scale deployment <name> <count>",
                )
            })?;
        let replicas = parse_count(raw)?;
        self.engine.scale_deployment(name, replicas).await?;
        Ok(CommandResult::ok(format!(
            "deployment \"{}\" scaled to {}",
            name, replicas
        )))
    }

    async fn set_image(&self, cmd: &ParsedCommand) -> EngineResult<CommandResult> {
        if cmd.kind != ResourceKind::Deployment {
            return Err(EngineError::validation(format!(
                "cannot set the image of a {}",
                cmd.kind
            )));
        }
        cmd.reject_unknown_flags(&[])?;
        let name = require_name(cmd)?;
        let image = cmd.args.first().ok_or_else(|| {
            EngineError::validation(
                "missing image; usage: kubectl set image deployment <name> <image>",
            )
        })?;
        self.engine.update_image(name, image).await?;
        Ok(CommandResult::ok(format!(
            "deployment \"{}\" image set to {}",
            name, image
        )))
    }

    async fn rollout_undo(&self, cmd: &ParsedCommand) -> EngineResult<CommandResult> {
        if cmd.kind != ResourceKind::Deployment {
            return Err(EngineError::validation(format!(
                "cannot roll back a {}",
                cmd.kind
            )));
        }
        cmd.reject_unknown_flags(&[])?;
        let name = require_name(cmd)?;
        let image = self.engine.rollback(name).await?;
        Ok(CommandResult::ok(format!(
            "deployment \"{}\" rolled back to {}",
            name, image
        )))
    }
}

fn require_name(cmd: &ParsedCommand) -> EngineResult<&str> {
    cmd.name.as_deref().ok_or_else(|| {
        EngineError::validation(format!("missing name for \"{} {}\"", cmd.verb, cmd.kind))
    })
}

fn parse_count(raw: &str) -> EngineResult<u32> {
    raw.parse::<u32>().map_err(|_| {
        EngineError::validation(format!(
            "replica count must be a non-negative integer, got \"{}\"",
            raw
        ))
    })
}

fn parse_literals(cmd: &ParsedCommand) -> EngineResult<BTreeMap<String, String>> {
    let mut data = BTreeMap::new();
    for literal in cmd.flag_values("from-literal") {
        let (key, value) = literal.split_once('=').ok_or_else(|| {
            EngineError::validation(format!(
                "--from-literal requires key=value, got \"{}\"",
                literal
            ))
        })?;
        data.insert(key.to_string(), value.to_string());
    }
    Ok(data)
}

fn plural(kind: ResourceKind, count: usize) -> String {
    if count == 1 {
        kind.to_string()
    } else {
        format!("{}s", kind)
    }
}

/// Build the flat summary array for a `get`
fn collect_summaries(
    store: &ResourceStore,
    kind: ResourceKind,
    filter: Option<&str>,
) -> Vec<ResourceSummary> {
    let wanted = |name: &str| filter.map_or(true, |f| f == name);
    match kind {
        ResourceKind::Pod => store
            .pods()
            .filter(|p| wanted(&p.name))
            .map(|p| ResourceSummary::Pod(p.into()))
            .collect(),
        ResourceKind::Node => store
            .nodes()
            .iter()
            .filter(|n| wanted(&n.name))
            .map(|n| ResourceSummary::Node(node_summary(store, n)))
            .collect(),
        ResourceKind::Deployment => store
            .deployments()
            .filter(|d| wanted(&d.name))
            .map(|d| ResourceSummary::Deployment(deployment_summary(store, d)))
            .collect(),
        ResourceKind::ReplicaSet => store
            .replica_sets()
            .filter(|rs| wanted(&rs.name))
            .map(|rs| ResourceSummary::ReplicaSet(rs.into()))
            .collect(),
        ResourceKind::Service => store
            .services()
            .filter(|s| wanted(&s.name))
            .map(|s| ResourceSummary::Service(s.into()))
            .collect(),
        ResourceKind::ConfigMap => store
            .config_maps()
            .filter(|cm| wanted(&cm.name))
            .map(|cm| ResourceSummary::KeyValue(cm.into()))
            .collect(),
        ResourceKind::Secret => store
            .secrets()
            .filter(|s| wanted(&s.name))
            .map(|s| ResourceSummary::KeyValue(s.into()))
            .collect(),
    }
}
