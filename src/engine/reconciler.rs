//! Reconciliation tick
//!
//! Compares desired replica counts against actual pod state and issues
//! create/delete operations until they converge. The tick is a synchronous
//! function over the store so tests can drive it directly; the engine runs it
//! on a fixed interval.

use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::error::EngineError;
use crate::events::ClusterEvent;
use crate::models::PodPhase;

use super::store::ResourceStore;

/// What a single tick did, plus the events to publish for it
#[derive(Debug, Default)]
pub struct TickSummary {
    pub promoted: Vec<String>,
    pub created: Vec<String>,
    pub deleted: Vec<String>,
    pub purged: Vec<String>,
    pub events: Vec<ClusterEvent>,
}

/// Run one reconciliation pass
///
/// Order matters: promotions land first so replica counts are fresh, then
/// each deployment is converged, then expired Terminating pods are purged.
pub fn run_tick(
    store: &mut ResourceStore,
    promotion_delay: Duration,
    grace_period: Duration,
) -> TickSummary {
    let now = Instant::now();
    let mut summary = TickSummary::default();

    // Sweep 1: promote Pending pods whose delay has elapsed
    for name in store.promote_due(now) {
        summary.events.push(ClusterEvent::PodPhaseChanged {
            name: name.clone(),
            phase: PodPhase::Running,
        });
        summary.promoted.push(name);
    }

    // Sweep 2: converge every deployment toward its desired replica count
    let deployments: Vec<(String, u32, String)> = store
        .deployments()
        .map(|d| (d.name.clone(), d.replicas, d.image.clone()))
        .collect();

    for (dep_name, desired, image) in deployments {
        reconcile_deployment(store, &dep_name, desired, &image, promotion_delay, grace_period, &mut summary);
    }

    // Sweep 3: physically remove pods past their grace deadline
    summary.purged = store.purge_due(now);

    if !summary.promoted.is_empty() || !summary.created.is_empty() || !summary.deleted.is_empty() {
        debug!(
            "tick: {} promoted, {} created, {} deleted, {} purged",
            summary.promoted.len(),
            summary.created.len(),
            summary.deleted.len(),
            summary.purged.len()
        );
    }

    summary
}

/// Converge one deployment: lazy ReplicaSet, diff, scale up or down
fn reconcile_deployment(
    store: &mut ResourceStore,
    dep_name: &str,
    desired: u32,
    image: &str,
    promotion_delay: Duration,
    grace_period: Duration,
    summary: &mut TickSummary,
) {
    // Resolve or lazily create the deployment's single ReplicaSet
    let rs_name = match store.replica_set_for(dep_name) {
        Some(rs) => rs.name.clone(),
        None => {
            let rs_name = format!("{}-rs", dep_name);
            match store.create_replica_set(&rs_name, dep_name, desired) {
                Ok(_) => info!("created replicaset {} for deployment {}", rs_name, dep_name),
                Err(e) => {
                    warn!("could not create replicaset for {}: {}", dep_name, e);
                    return;
                }
            }
            rs_name
        }
    };

    // Desired is always re-synced; the deployment may have been scaled
    if let Some(rs) = store.replica_set_mut(&rs_name) {
        rs.desired = desired;
    }

    // Pending pods hold their replica slot, only Terminating ones are free
    let active: Vec<(String, u64)> = store
        .owned_pods(&rs_name)
        .iter()
        .filter(|p| p.is_active())
        .map(|p| (p.name.clone(), p.sequence))
        .collect();

    if (active.len() as u32) < desired {
        let missing = desired - active.len() as u32;
        for _ in 0..missing {
            let pod_name = store.next_pod_name(&rs_name);
            match store.create_pod(&pod_name, image, Some(rs_name.clone()), true, promotion_delay)
            {
                Ok(_) => {
                    summary
                        .events
                        .push(ClusterEvent::PodCreated { name: pod_name.clone() });
                    summary.created.push(pod_name);
                }
                Err(EngineError::Capacity(_)) => {
                    // Exhausted; leave the shortfall for the next tick
                    debug!("no capacity for {}, retrying next tick", rs_name);
                    break;
                }
                Err(e) => {
                    warn!("failed to create pod for {}: {}", rs_name, e);
                    break;
                }
            }
        }
    } else if (active.len() as u32) > desired {
        // Most recently created go first, long-running pods are preserved
        let excess = active.len() - desired as usize;
        let mut victims = active;
        victims.sort_by_key(|(_, sequence)| *sequence);
        for (pod_name, _) in victims.into_iter().rev().take(excess) {
            match store.delete_pod(&pod_name, grace_period) {
                Ok(true) => {
                    summary
                        .events
                        .push(ClusterEvent::PodDeleted { name: pod_name.clone() });
                    summary.deleted.push(pod_name);
                }
                Ok(false) => {}
                Err(e) => warn!("failed to delete pod {}: {}", pod_name, e),
            }
        }
    }

    let running = store.running_owned(&rs_name);
    if let Some(rs) = store.replica_set_mut(&rs_name) {
        rs.current = running;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DELAY: Duration = Duration::from_millis(1000);
    const GRACE: Duration = Duration::from_millis(2000);

    fn settle(store: &mut ResourceStore, ticks: usize) -> Vec<TickSummary> {
        (0..ticks).map(|_| run_tick(store, DELAY, GRACE)).collect()
    }

    #[tokio::test(start_paused = true)]
    async fn test_tick_expands_deployment_into_pods() {
        let mut store = ResourceStore::bootstrap(3, 4);
        store.create_deployment("web", "nginx:latest", 3).unwrap();

        let summary = run_tick(&mut store, DELAY, GRACE);
        assert_eq!(summary.created.len(), 3);
        assert!(store.replica_set("web-rs").is_some());
        assert_eq!(store.owned_pods("web-rs").len(), 3);

        // Pods are Pending until the promotion delay elapses; no double-create
        let summary = run_tick(&mut store, DELAY, GRACE);
        assert!(summary.created.is_empty());

        tokio::time::advance(Duration::from_millis(1100)).await;
        let summary = run_tick(&mut store, DELAY, GRACE);
        assert_eq!(summary.promoted.len(), 3);
        assert_eq!(store.replica_set("web-rs").unwrap().current, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_scale_down_removes_newest_first() {
        let mut store = ResourceStore::bootstrap(3, 4);
        store.create_deployment("web", "nginx:latest", 5).unwrap();
        settle(&mut store, 1);
        tokio::time::advance(Duration::from_millis(1100)).await;
        settle(&mut store, 1);

        store.deployment_mut("web").unwrap().replicas = 3;
        let summary = run_tick(&mut store, DELAY, GRACE);
        assert_eq!(summary.deleted, vec!["web-rs-5", "web-rs-4"]);

        let survivors: Vec<&str> = store
            .owned_pods("web-rs")
            .iter()
            .filter(|p| p.is_active())
            .map(|p| p.name.as_str())
            .collect();
        assert_eq!(survivors, vec!["web-rs-1", "web-rs-2", "web-rs-3"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_capacity_shortfall_is_retried() {
        let mut store = ResourceStore::bootstrap(1, 2);
        store.create_deployment("web", "nginx:latest", 3).unwrap();

        let summary = run_tick(&mut store, DELAY, GRACE);
        assert_eq!(summary.created.len(), 2);

        // Free a slot: drop the desired count of an interfering pod by
        // deleting one replica directly, then let the grace period expire
        store.delete_pod("web-rs-1", GRACE).unwrap();
        tokio::time::advance(Duration::from_millis(2100)).await;
        let summary = run_tick(&mut store, DELAY, GRACE);

        // The purged slot is reused on the following tick
        let summary_next = run_tick(&mut store, DELAY, GRACE);
        let created: usize = summary.created.len() + summary_next.created.len();
        assert!(created >= 1, "shortfall should be retried once space frees");
        assert_eq!(
            store.owned_pods("web-rs").iter().filter(|p| p.is_active()).count(),
            2
        );
    }
}
