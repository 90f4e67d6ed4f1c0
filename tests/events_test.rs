//! Tests for the event surface
//!
//! Every successful create/delete/scale publishes exactly one matching event;
//! handler failures never break delivery.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use clustersim_engine::events::{ClusterEvent, EventBus, EventKind};
use clustersim_engine::models::{PodPhase, ServiceType};
use clustersim_engine::{ClusterEngine, CommandInterpreter, EngineConfig};

/// Collects every event of one kind for later assertions
fn recorder(bus: &EventBus, kind: EventKind) -> Arc<Mutex<Vec<ClusterEvent>>> {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    bus.subscribe(kind, move |event| {
        sink.lock().unwrap().push(event.clone());
    });
    seen
}

#[tokio::test]
async fn test_command_events_match_payloads() {
    let engine = Arc::new(ClusterEngine::new(EngineConfig::default()));
    let interpreter = CommandInterpreter::new(engine.clone());

    let pod_created = recorder(engine.events(), EventKind::PodCreated);
    let pod_deleted = recorder(engine.events(), EventKind::PodDeleted);
    let dep_created = recorder(engine.events(), EventKind::DeploymentCreated);
    let dep_scaled = recorder(engine.events(), EventKind::DeploymentScaled);
    let svc_created = recorder(engine.events(), EventKind::ServiceCreated);
    let cm_created = recorder(engine.events(), EventKind::ConfigMapCreated);
    let secret_created = recorder(engine.events(), EventKind::SecretCreated);

    interpreter.execute("kubectl create pod web").await;
    interpreter.execute("kubectl delete pod web").await;
    interpreter
        .execute("kubectl create deployment api --replicas=3")
        .await;
    interpreter.execute("kubectl scale deployment api 5").await;
    interpreter
        .execute("kubectl create service front --type=LoadBalancer")
        .await;
    interpreter
        .execute("kubectl create configmap cfg --from-literal=a=1")
        .await;
    interpreter.execute("kubectl create secret creds").await;

    assert_eq!(
        pod_created.lock().unwrap().as_slice(),
        &[ClusterEvent::PodCreated {
            name: "web".to_string()
        }]
    );
    assert_eq!(
        pod_deleted.lock().unwrap().as_slice(),
        &[ClusterEvent::PodDeleted {
            name: "web".to_string()
        }]
    );
    assert_eq!(
        dep_created.lock().unwrap().as_slice(),
        &[ClusterEvent::DeploymentCreated {
            name: "api".to_string(),
            replicas: 3
        }]
    );
    assert_eq!(
        dep_scaled.lock().unwrap().as_slice(),
        &[ClusterEvent::DeploymentScaled {
            name: "api".to_string(),
            new_replicas: 5
        }]
    );
    assert_eq!(
        svc_created.lock().unwrap().as_slice(),
        &[ClusterEvent::ServiceCreated {
            name: "front".to_string(),
            service_type: ServiceType::LoadBalancer
        }]
    );
    assert_eq!(
        cm_created.lock().unwrap().as_slice(),
        &[ClusterEvent::ConfigMapCreated {
            name: "cfg".to_string()
        }]
    );
    assert_eq!(
        secret_created.lock().unwrap().as_slice(),
        &[ClusterEvent::SecretCreated {
            name: "creds".to_string()
        }]
    );
}

#[tokio::test]
async fn test_failed_commands_emit_nothing() {
    let engine = Arc::new(ClusterEngine::new(EngineConfig::default()));
    let interpreter = CommandInterpreter::new(engine.clone());

    let pod_created = recorder(engine.events(), EventKind::PodCreated);

    interpreter.execute("kubectl create pod web").await;
    interpreter.execute("kubectl create pod web").await;
    interpreter.execute("kubectl create pod").await;

    assert_eq!(pod_created.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn test_deleting_terminating_pod_emits_once() {
    let engine = Arc::new(ClusterEngine::new(EngineConfig::default()));
    let pod_deleted = recorder(engine.events(), EventKind::PodDeleted);

    engine.create_pod("web", "nginx:latest").await.unwrap();
    engine.delete_pod("web").await.unwrap();
    // Already Terminating: still a success, but no second publication
    engine.delete_pod("web").await.unwrap();

    assert_eq!(pod_deleted.lock().unwrap().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_reconciler_emits_pod_events() {
    let engine = Arc::new(ClusterEngine::new(EngineConfig::default()));
    let pod_created = recorder(engine.events(), EventKind::PodCreated);
    let phase_changed = recorder(engine.events(), EventKind::PodPhaseChanged);

    engine
        .create_deployment("web", "nginx:latest", 2)
        .await
        .unwrap();
    engine.tick().await;
    assert_eq!(pod_created.lock().unwrap().len(), 2);

    tokio::time::advance(Duration::from_millis(1500)).await;
    engine.tick().await;
    let promoted = phase_changed.lock().unwrap();
    assert_eq!(promoted.len(), 2);
    assert!(promoted.iter().all(|event| matches!(
        event,
        ClusterEvent::PodPhaseChanged {
            phase: PodPhase::Running,
            ..
        }
    )));
}

#[tokio::test]
async fn test_panicking_handler_does_not_stop_delivery() {
    let bus = EventBus::new();
    let order = Arc::new(Mutex::new(Vec::new()));

    let first = order.clone();
    bus.subscribe(EventKind::PodCreated, move |_| {
        first.lock().unwrap().push("first");
    });
    bus.subscribe(EventKind::PodCreated, |_| {
        panic!("handler blew up");
    });
    let last = order.clone();
    bus.subscribe(EventKind::PodCreated, move |_| {
        last.lock().unwrap().push("last");
    });

    bus.publish(ClusterEvent::PodCreated {
        name: "web".to_string(),
    });

    // Subscription order held and the panic was contained
    assert_eq!(order.lock().unwrap().as_slice(), &["first", "last"]);
}

#[tokio::test]
async fn test_watch_mirrors_publications() {
    let engine = Arc::new(ClusterEngine::new(EngineConfig::default()));
    let mut rx = engine.events().watch();

    engine
        .create_service("front", ServiceType::NodePort)
        .await
        .unwrap();

    let event = rx.recv().await.unwrap();
    assert_eq!(
        event,
        ClusterEvent::ServiceCreated {
            name: "front".to_string(),
            service_type: ServiceType::NodePort
        }
    );
}

#[tokio::test]
async fn test_unsubscribed_handler_is_skipped() {
    let bus = EventBus::new();
    let seen = Arc::new(Mutex::new(Vec::new()));

    let sink = seen.clone();
    let id = bus.subscribe(EventKind::SecretCreated, move |event| {
        sink.lock().unwrap().push(event.clone());
    });

    bus.publish(ClusterEvent::SecretCreated {
        name: "one".to_string(),
    });
    assert!(bus.unsubscribe(EventKind::SecretCreated, id));
    bus.publish(ClusterEvent::SecretCreated {
        name: "two".to_string(),
    });

    assert_eq!(seen.lock().unwrap().len(), 1);
}
