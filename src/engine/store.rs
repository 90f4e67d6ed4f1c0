//! Typed resource store
//!
//! One keyed collection per resource kind, enforcing name uniqueness and the
//! ownership tree (Deployment → ReplicaSet → Pod). All cluster mutation goes
//! through these operations; invariants are enforced nowhere else.

use std::collections::BTreeMap;
use std::time::Duration;

use tokio::time::Instant;

use crate::error::{EngineError, EngineResult};
use crate::models::{
    ConfigMap, Deployment, Node, Pod, PodPhase, ReplicaSet, ResourceKind, Secret, Service,
    ServiceType,
};

/// Single source of mutable cluster state
pub struct ResourceStore {
    nodes: Vec<Node>,
    pods: BTreeMap<String, Pod>,
    replica_sets: BTreeMap<String, ReplicaSet>,
    deployments: BTreeMap<String, Deployment>,
    services: BTreeMap<String, Service>,
    config_maps: BTreeMap<String, ConfigMap>,
    secrets: BTreeMap<String, Secret>,
    /// Monotonic pod creation counter; also keeps generated names unique
    pod_sequence: u64,
    /// Rotating cursor for round-robin placement once every node is full
    spillover_cursor: usize,
    /// Pending pods waiting to be promoted to Running
    promotions: BTreeMap<String, Instant>,
    /// Terminating pods awaiting physical removal
    graves: BTreeMap<String, Instant>,
}

impl ResourceStore {
    /// Create a store with a fixed set of nodes (`node-1..node-N`)
    pub fn bootstrap(node_count: u32, node_capacity: u32) -> Self {
        let nodes = (1..=node_count)
            .map(|i| Node::new(format!("node-{}", i), node_capacity))
            .collect();
        Self {
            nodes,
            pods: BTreeMap::new(),
            replica_sets: BTreeMap::new(),
            deployments: BTreeMap::new(),
            services: BTreeMap::new(),
            config_maps: BTreeMap::new(),
            secrets: BTreeMap::new(),
            pod_sequence: 0,
            spillover_cursor: 0,
            promotions: BTreeMap::new(),
            graves: BTreeMap::new(),
        }
    }

    // ---- Nodes ----

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn node(&self, name: &str) -> Option<&Node> {
        self.nodes.iter().find(|n| n.name == name)
    }

    /// Pods currently hosted by a node, Terminating ones included
    pub fn pods_on_node(&self, node_name: &str) -> usize {
        self.pods
            .values()
            .filter(|p| p.node_name == node_name)
            .count()
    }

    /// First node (bootstrap order) with free capacity
    fn first_fit(&self) -> Option<String> {
        self.nodes
            .iter()
            .find(|n| self.pods_on_node(&n.name) < n.capacity as usize)
            .map(|n| n.name.clone())
    }

    /// Round-robin over all nodes, used when every node is at capacity
    fn spillover(&mut self) -> Option<String> {
        if self.nodes.is_empty() {
            return None;
        }
        let node = &self.nodes[self.spillover_cursor % self.nodes.len()];
        self.spillover_cursor = self.spillover_cursor.wrapping_add(1);
        Some(node.name.clone())
    }

    // ---- Pods ----

    /// Create a pod and place it on a node
    ///
    /// With `strict_capacity` the create fails with `Capacity` when no node
    /// has room (the reconciler retries next tick); without it, placement
    /// falls back to round-robin over the full nodes so direct commands
    /// always succeed. Duplicate names fail before any placement side effect.
    pub fn create_pod(
        &mut self,
        name: &str,
        image: &str,
        owner: Option<String>,
        strict_capacity: bool,
        promotion_delay: Duration,
    ) -> EngineResult<&Pod> {
        if self.pods.contains_key(name) {
            return Err(EngineError::duplicate(ResourceKind::Pod, name));
        }
        if let Some(rs_name) = &owner {
            if !self.replica_sets.contains_key(rs_name) {
                return Err(EngineError::not_found(
                    ResourceKind::ReplicaSet,
                    rs_name.as_str(),
                ));
            }
        }

        let node_name = match self.first_fit() {
            Some(node) => node,
            None if strict_capacity => return Err(EngineError::Capacity(name.to_string())),
            None => self
                .spillover()
                .ok_or_else(|| EngineError::Capacity(name.to_string()))?,
        };

        self.pod_sequence += 1;
        let pod = Pod::new(
            name.to_string(),
            image.to_string(),
            node_name,
            owner,
            self.pod_sequence,
        );
        self.promotions
            .insert(name.to_string(), Instant::now() + promotion_delay);
        self.pods.insert(name.to_string(), pod);
        Ok(&self.pods[name])
    }

    pub fn pod(&self, name: &str) -> Option<&Pod> {
        self.pods.get(name)
    }

    /// All pods in name order
    pub fn pods(&self) -> impl Iterator<Item = &Pod> {
        self.pods.values()
    }

    /// Pods owned by a ReplicaSet, in creation order
    pub fn owned_pods(&self, rs_name: &str) -> Vec<&Pod> {
        let mut owned: Vec<&Pod> = self
            .pods
            .values()
            .filter(|p| p.owner.as_deref() == Some(rs_name))
            .collect();
        owned.sort_by_key(|p| p.sequence);
        owned
    }

    /// Count of owned pods currently Running
    pub fn running_owned(&self, rs_name: &str) -> u32 {
        self.pods
            .values()
            .filter(|p| p.owner.as_deref() == Some(rs_name) && p.phase == PodPhase::Running)
            .count() as u32
    }

    /// Two-phase delete: mark Terminating now, purge after the grace period
    ///
    /// Returns `true` when the pod was newly marked, `false` when it was
    /// already Terminating (idempotent, the grace deadline is not reset).
    pub fn delete_pod(&mut self, name: &str, grace: Duration) -> EngineResult<bool> {
        let pod = self
            .pods
            .get_mut(name)
            .ok_or_else(|| EngineError::not_found(ResourceKind::Pod, name))?;
        if pod.phase == PodPhase::Terminating {
            return Ok(false);
        }
        pod.phase = PodPhase::Terminating;
        self.promotions.remove(name);
        self.graves
            .insert(name.to_string(), Instant::now() + grace);
        Ok(true)
    }

    /// Promote Pending pods whose delay has elapsed; returns their names
    pub fn promote_due(&mut self, now: Instant) -> Vec<String> {
        let due: Vec<String> = self
            .promotions
            .iter()
            .filter(|(_, at)| **at <= now)
            .map(|(name, _)| name.clone())
            .collect();
        for name in &due {
            self.promotions.remove(name);
            if let Some(pod) = self.pods.get_mut(name) {
                pod.phase = PodPhase::Running;
            }
        }
        due
    }

    /// Physically remove Terminating pods past their grace deadline
    pub fn purge_due(&mut self, now: Instant) -> Vec<String> {
        let due: Vec<String> = self
            .graves
            .iter()
            .filter(|(_, at)| **at <= now)
            .map(|(name, _)| name.clone())
            .collect();
        for name in &due {
            self.graves.remove(name);
            self.pods.remove(name);
        }
        due
    }

    // ---- Deployments ----

    pub fn create_deployment(
        &mut self,
        name: &str,
        image: &str,
        replicas: u32,
    ) -> EngineResult<&Deployment> {
        if self.deployments.contains_key(name) {
            return Err(EngineError::duplicate(ResourceKind::Deployment, name));
        }
        self.deployments.insert(
            name.to_string(),
            Deployment::new(name.to_string(), image.to_string(), replicas),
        );
        Ok(&self.deployments[name])
    }

    pub fn deployment(&self, name: &str) -> Option<&Deployment> {
        self.deployments.get(name)
    }

    pub fn deployment_mut(&mut self, name: &str) -> Option<&mut Deployment> {
        self.deployments.get_mut(name)
    }

    pub fn deployments(&self) -> impl Iterator<Item = &Deployment> {
        self.deployments.values()
    }

    /// Cascade delete: remove the ReplicaSet, then pod-delete every owned pod
    ///
    /// Returns the names of pods newly marked Terminating.
    pub fn delete_deployment(&mut self, name: &str, grace: Duration) -> EngineResult<Vec<String>> {
        if !self.deployments.contains_key(name) {
            return Err(EngineError::not_found(ResourceKind::Deployment, name));
        }

        let rs_name = self
            .replica_sets
            .values()
            .find(|rs| rs.owner == name)
            .map(|rs| rs.name.clone());

        let mut deleted = Vec::new();
        if let Some(rs_name) = rs_name {
            let owned: Vec<String> = self
                .owned_pods(&rs_name)
                .iter()
                .map(|p| p.name.clone())
                .collect();
            for pod_name in owned {
                if self.delete_pod(&pod_name, grace)? {
                    deleted.push(pod_name.clone());
                }
                // Owner is gone after this call; drop the dangling reference
                if let Some(pod) = self.pods.get_mut(&pod_name) {
                    pod.owner = None;
                }
            }
            self.replica_sets.remove(&rs_name);
        }

        self.deployments.remove(name);
        Ok(deleted)
    }

    // ---- ReplicaSets ----

    pub fn create_replica_set(
        &mut self,
        name: &str,
        owner: &str,
        desired: u32,
    ) -> EngineResult<&ReplicaSet> {
        if self.replica_sets.contains_key(name) {
            return Err(EngineError::duplicate(ResourceKind::ReplicaSet, name));
        }
        if !self.deployments.contains_key(owner) {
            return Err(EngineError::not_found(ResourceKind::Deployment, owner));
        }
        self.replica_sets.insert(
            name.to_string(),
            ReplicaSet::new(name.to_string(), owner.to_string(), desired),
        );
        Ok(&self.replica_sets[name])
    }

    pub fn replica_set(&self, name: &str) -> Option<&ReplicaSet> {
        self.replica_sets.get(name)
    }

    pub fn replica_set_mut(&mut self, name: &str) -> Option<&mut ReplicaSet> {
        self.replica_sets.get_mut(name)
    }

    pub fn replica_sets(&self) -> impl Iterator<Item = &ReplicaSet> {
        self.replica_sets.values()
    }

    /// The (at most one) ReplicaSet owned by a Deployment
    pub fn replica_set_for(&self, deployment: &str) -> Option<&ReplicaSet> {
        self.replica_sets.values().find(|rs| rs.owner == deployment)
    }

    // ---- Services ----

    pub fn create_service(
        &mut self,
        name: &str,
        service_type: ServiceType,
    ) -> EngineResult<&Service> {
        if self.services.contains_key(name) {
            return Err(EngineError::duplicate(ResourceKind::Service, name));
        }
        self.services
            .insert(name.to_string(), Service::new(name.to_string(), service_type));
        Ok(&self.services[name])
    }

    pub fn service(&self, name: &str) -> Option<&Service> {
        self.services.get(name)
    }

    pub fn services(&self) -> impl Iterator<Item = &Service> {
        self.services.values()
    }

    pub fn delete_service(&mut self, name: &str) -> EngineResult<()> {
        self.services
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| EngineError::not_found(ResourceKind::Service, name))
    }

    // ---- ConfigMaps / Secrets ----

    pub fn create_config_map(
        &mut self,
        name: &str,
        data: BTreeMap<String, String>,
    ) -> EngineResult<&ConfigMap> {
        if self.config_maps.contains_key(name) {
            return Err(EngineError::duplicate(ResourceKind::ConfigMap, name));
        }
        self.config_maps
            .insert(name.to_string(), ConfigMap::new(name.to_string(), data));
        Ok(&self.config_maps[name])
    }

    pub fn config_map(&self, name: &str) -> Option<&ConfigMap> {
        self.config_maps.get(name)
    }

    pub fn config_maps(&self) -> impl Iterator<Item = &ConfigMap> {
        self.config_maps.values()
    }

    pub fn delete_config_map(&mut self, name: &str) -> EngineResult<()> {
        self.config_maps
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| EngineError::not_found(ResourceKind::ConfigMap, name))
    }

    pub fn create_secret(
        &mut self,
        name: &str,
        data: BTreeMap<String, String>,
    ) -> EngineResult<&Secret> {
        if self.secrets.contains_key(name) {
            return Err(EngineError::duplicate(ResourceKind::Secret, name));
        }
        self.secrets
            .insert(name.to_string(), Secret::new(name.to_string(), data));
        Ok(&self.secrets[name])
    }

    pub fn secret(&self, name: &str) -> Option<&Secret> {
        self.secrets.get(name)
    }

    pub fn secrets(&self) -> impl Iterator<Item = &Secret> {
        self.secrets.values()
    }

    pub fn delete_secret(&mut self, name: &str) -> EngineResult<()> {
        self.secrets
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| EngineError::not_found(ResourceKind::Secret, name))
    }

    /// Generated pod name from the creation counter, skipping taken names
    pub fn next_pod_name(&self, rs_name: &str) -> String {
        let mut seq = self.pod_sequence + 1;
        loop {
            let name = format!("{}-{}", rs_name, seq);
            if !self.pods.contains_key(&name) {
                return name;
            }
            seq += 1;
        }
    }
}
