//! Tests for the resource store
//!
//! These tests verify name uniqueness, ownership references and the
//! two-phase pod deletion bookkeeping.

use std::time::Duration;

use clustersim_engine::engine::store::ResourceStore;
use clustersim_engine::error::EngineError;
use clustersim_engine::models::{PodPhase, ResourceKind, ServiceType};
use tokio::time::Instant;

const DELAY: Duration = Duration::from_millis(1000);
const GRACE: Duration = Duration::from_millis(2000);

#[tokio::test]
async fn test_names_are_unique_per_kind() {
    let mut store = ResourceStore::bootstrap(3, 4);

    assert!(store.create_deployment("web", "nginx:latest", 2).is_ok());
    let err = store.create_deployment("web", "redis:7", 1).unwrap_err();
    assert!(matches!(err, EngineError::Duplicate { kind, .. } if kind == ResourceKind::Deployment));

    // The failed create mutated nothing
    assert_eq!(store.deployments().count(), 1);
    assert_eq!(store.deployment("web").unwrap().image, "nginx:latest");
    assert_eq!(store.deployment("web").unwrap().replicas, 2);

    // The same name is free in a different kind
    assert!(store.create_service("web", ServiceType::ClusterIP).is_ok());
    assert!(store.create_pod("web", "nginx:latest", None, false, DELAY).is_ok());
}

#[tokio::test]
async fn test_repeated_duplicate_attempts_never_mutate() {
    let mut store = ResourceStore::bootstrap(3, 4);
    store
        .create_pod("web", "nginx:latest", None, false, DELAY)
        .unwrap();
    let placed_on = store.pod("web").unwrap().node_name.clone();

    for _ in 0..5 {
        assert!(store
            .create_pod("web", "redis:7", None, false, DELAY)
            .is_err());
    }
    assert_eq!(store.pods().count(), 1);
    assert_eq!(store.pod("web").unwrap().image, "nginx:latest");
    assert_eq!(store.pod("web").unwrap().node_name, placed_on);
}

#[tokio::test]
async fn test_pod_owner_must_be_a_live_replicaset() {
    let mut store = ResourceStore::bootstrap(3, 4);
    let err = store
        .create_pod(
            "web-rs-1",
            "nginx:latest",
            Some("web-rs".to_string()),
            false,
            DELAY,
        )
        .unwrap_err();
    assert!(matches!(err, EngineError::NotFound { kind, .. } if kind == ResourceKind::ReplicaSet));

    store.create_deployment("web", "nginx:latest", 1).unwrap();
    store.create_replica_set("web-rs", "web", 1).unwrap();
    assert!(store
        .create_pod(
            "web-rs-1",
            "nginx:latest",
            Some("web-rs".to_string()),
            false,
            DELAY,
        )
        .is_ok());
}

#[tokio::test]
async fn test_replicaset_requires_live_deployment() {
    let mut store = ResourceStore::bootstrap(3, 4);
    assert!(store.create_replica_set("web-rs", "web", 1).is_err());
}

#[tokio::test]
async fn test_pods_are_placed_on_existing_nodes() {
    let mut store = ResourceStore::bootstrap(2, 2);
    for i in 0..6 {
        store
            .create_pod(&format!("p{}", i), "alpine:3.18", None, false, DELAY)
            .unwrap();
    }
    for pod in store.pods() {
        assert!(
            store.node(&pod.node_name).is_some(),
            "pod {} placed on unknown node {}",
            pod.name,
            pod.node_name
        );
    }
}

#[tokio::test(start_paused = true)]
async fn test_terminating_pod_exists_but_does_not_count_as_running() {
    let mut store = ResourceStore::bootstrap(1, 4);
    store.create_deployment("web", "nginx:latest", 1).unwrap();
    store.create_replica_set("web-rs", "web", 1).unwrap();
    store
        .create_pod(
            "web-rs-1",
            "nginx:latest",
            Some("web-rs".to_string()),
            false,
            DELAY,
        )
        .unwrap();

    tokio::time::advance(Duration::from_millis(1100)).await;
    store.promote_due(Instant::now());
    assert_eq!(store.running_owned("web-rs"), 1);

    store.delete_pod("web-rs-1", GRACE).unwrap();
    assert_eq!(store.pod("web-rs-1").unwrap().phase, PodPhase::Terminating);
    assert_eq!(store.running_owned("web-rs"), 0);
    // Still visible to readers until the grace period expires
    assert!(store.pod("web-rs-1").is_some());

    tokio::time::advance(Duration::from_millis(2100)).await;
    store.purge_due(Instant::now());
    assert!(store.pod("web-rs-1").is_none());
}

#[tokio::test]
async fn test_cascade_delete_removes_replicaset_and_marks_pods() {
    let mut store = ResourceStore::bootstrap(3, 4);
    store.create_deployment("web", "nginx:latest", 2).unwrap();
    store.create_replica_set("web-rs", "web", 2).unwrap();
    for i in 1..=2 {
        store
            .create_pod(
                &format!("web-rs-{}", i),
                "nginx:latest",
                Some("web-rs".to_string()),
                false,
                DELAY,
            )
            .unwrap();
    }

    let deleted = store.delete_deployment("web", GRACE).unwrap();
    assert_eq!(deleted.len(), 2);
    assert!(store.deployment("web").is_none());
    assert!(store.replica_set("web-rs").is_none());
    for name in ["web-rs-1", "web-rs-2"] {
        assert_eq!(store.pod(name).unwrap().phase, PodPhase::Terminating);
    }
}

#[tokio::test]
async fn test_delete_missing_resource_reports_not_found() {
    let mut store = ResourceStore::bootstrap(3, 4);
    assert!(matches!(
        store.delete_pod("ghost", GRACE),
        Err(EngineError::NotFound { .. })
    ));
    assert!(matches!(
        store.delete_deployment("ghost", GRACE),
        Err(EngineError::NotFound { .. })
    ));
    assert!(matches!(
        store.delete_service("ghost"),
        Err(EngineError::NotFound { .. })
    ));
}
