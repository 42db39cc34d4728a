//! End-to-end cluster scenarios against the in-memory runtime.

use std::sync::Arc;
use std::time::Duration;

use minicluster::application::config::ClusterConfig;
use minicluster::application::{ClusterOrchestrator, ClusterState, ShutdownReason, ShutdownSignal};
use minicluster::domain::{DestroyOutcome, MasterState, Role};
use minicluster::error::{ConfigError, Error};
use minicluster::port::store::ClusterStore;
use minicluster::testkit::config::{fast_config, fast_config_with, worker_resources};
use minicluster::testkit::observer::ScriptedObserver;
use minicluster::testkit::runtime::FakeRuntime;
use minicluster::testkit::store::MemoryStore;

// =============================================================================
// Fixtures
// =============================================================================

struct Cluster {
    runtime: Arc<FakeRuntime>,
    store: Arc<MemoryStore>,
    shutdown: ShutdownSignal,
    orchestrator: ClusterOrchestrator,
}

fn cluster(observer: ScriptedObserver) -> Cluster {
    let runtime = Arc::new(FakeRuntime::new());
    let store = Arc::new(MemoryStore::new());
    let shutdown = ShutdownSignal::new();
    let orchestrator =
        ClusterOrchestrator::new(runtime.clone(), store.clone(), Arc::new(observer), &shutdown);
    Cluster {
        runtime,
        store,
        shutdown,
        orchestrator,
    }
}

async fn wait_until_empty(runtime: &FakeRuntime) {
    for _ in 0..100 {
        if runtime.live_ids().is_empty() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("containers still alive: {:?}", runtime.live_ids());
}

// =============================================================================
// Bring-up
// =============================================================================

#[tokio::test(start_paused = true)]
async fn three_worker_cluster_comes_up_in_dependency_order() {
    let mut c = cluster(ScriptedObserver::leader_after(2));
    let config = fast_config(c.runtime.clone(), 3);

    c.orchestrator.create(&config).await.unwrap();
    c.orchestrator.start().await.unwrap();
    let state = c
        .orchestrator
        .wait_for_state(MasterState::has_leader)
        .await
        .unwrap();

    assert!(state.has_leader());
    assert_eq!(c.orchestrator.state(), ClusterState::Running);
    assert_eq!(
        c.runtime.live_roles(),
        vec![Role::Coordination, Role::Master, Role::Worker, Role::Worker, Role::Worker]
    );
    for id in c.runtime.live_ids() {
        assert!(c.runtime.is_running(&id));
    }

    let info = c.orchestrator.info().await.unwrap().unwrap();
    assert_eq!(info.members.len(), 5);
    assert_eq!(info.running_members(), 5);
    assert!(info.master_url.as_deref().is_some_and(|url| url.ends_with(":5050")));
}

#[tokio::test]
async fn mapped_master_is_reached_through_localhost() {
    let mut c = cluster(ScriptedObserver::leader_after(0));
    let config = fast_config_with(c.runtime.clone(), 1, |b| b.map_ports_to_host(true));

    let identity = c.orchestrator.create(&config).await.unwrap().clone();

    assert_eq!(identity.master_url.as_deref(), Some("http://localhost:5050"));
    let master = identity.member(Role::Master).unwrap();
    let spec = c.runtime.spec_of(&master.container_id).unwrap();
    assert!(spec
        .ports
        .iter()
        .any(|p| p.container_port == 5050 && p.host_port == Some(5050)));
}

#[tokio::test(start_paused = true)]
async fn leaderless_master_times_out_and_destroy_cleans_up() {
    let mut c = cluster(ScriptedObserver::never_ready());
    let config = fast_config(c.runtime.clone(), 2);

    c.orchestrator.create(&config).await.unwrap();
    c.orchestrator.start().await.unwrap();
    let err = c
        .orchestrator
        .wait_for_state(MasterState::has_leader)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Timeout { .. }));

    c.orchestrator.destroy().await.unwrap();
    assert!(c.runtime.live_ids().is_empty());
    assert_eq!(c.store.load().unwrap(), None);
}

// =============================================================================
// Configuration failures
// =============================================================================

#[tokio::test]
async fn resource_count_mismatch_fails_before_any_runtime_call() {
    let runtime = Arc::new(FakeRuntime::new());

    let err = ClusterConfig::builder()
        .runtime(runtime.clone())
        .workers(3)
        .worker_resources(worker_resources(2))
        .build()
        .unwrap_err();

    assert!(matches!(
        err,
        ConfigError::InvalidValue {
            field: "worker_resources",
            ..
        }
    ));
    assert_eq!(runtime.call_count(), 0);
}

// =============================================================================
// Partial failure and teardown
// =============================================================================

#[tokio::test]
async fn failure_after_master_removes_exactly_what_was_created() {
    let mut c = cluster(ScriptedObserver::leader_after(0));
    c.runtime.fail_create(Role::Worker);
    let config = fast_config(c.runtime.clone(), 2);

    let err = c.orchestrator.create(&config).await.unwrap_err();
    assert!(matches!(err, Error::Runtime { .. }));

    let created = c.runtime.created_ids();
    assert_eq!(created.len(), 2);
    let persisted = c.store.load().unwrap().unwrap();
    assert_eq!(persisted.members.len(), 2);

    let outcome = c.orchestrator.destroy().await.unwrap();
    let DestroyOutcome::Destroyed { removed, failed, .. } = outcome else {
        panic!("expected a destroyed cluster");
    };
    assert!(failed.is_empty());
    assert_eq!(removed.len(), 2);
    // Master before coordination.
    assert_eq!(c.runtime.remove_attempts(), vec![created[1].clone(), created[0].clone()]);
    assert!(c.runtime.live_ids().is_empty());
}

#[tokio::test]
async fn destroy_twice_is_not_an_error() {
    let mut c = cluster(ScriptedObserver::leader_after(0));
    let config = fast_config(c.runtime.clone(), 1);
    let cluster_id = c.orchestrator.create(&config).await.unwrap().cluster_id.clone();

    let first = c.orchestrator.destroy().await.unwrap();
    let second = c.orchestrator.destroy().await.unwrap();

    assert_eq!(first.cluster_id(), Some(cluster_id.as_str()));
    assert_eq!(second, DestroyOutcome::NotRunning);
    assert_eq!(c.orchestrator.state(), ClusterState::Destroyed);
}

#[tokio::test]
async fn containers_removed_out_of_band_still_destroy_cleanly() {
    let mut c = cluster(ScriptedObserver::leader_after(0));
    let config = fast_config(c.runtime.clone(), 2);
    let identity = c.orchestrator.create(&config).await.unwrap().clone();
    let worker = identity.member(Role::Worker).unwrap().container_id.clone();
    c.runtime.vanish(&worker);

    let outcome = c.orchestrator.destroy().await.unwrap();

    let DestroyOutcome::Destroyed { removed, failed, .. } = outcome else {
        panic!("expected a destroyed cluster");
    };
    assert!(failed.is_empty());
    assert_eq!(removed.len(), 4);
}

#[tokio::test]
async fn failed_removal_is_reported_and_identity_still_cleared() {
    let mut c = cluster(ScriptedObserver::leader_after(0));
    let config = fast_config(c.runtime.clone(), 1);
    let identity = c.orchestrator.create(&config).await.unwrap().clone();
    let master = identity.member(Role::Master).unwrap().container_id.clone();
    c.runtime.fail_remove(&master);

    let outcome = c.orchestrator.destroy().await.unwrap();

    let DestroyOutcome::Destroyed { removed, failed, .. } = outcome else {
        panic!("expected a destroyed cluster");
    };
    assert_eq!(removed.len(), 2);
    assert_eq!(failed.len(), 1);
    assert_eq!(failed[0].0, master);
    assert_eq!(c.store.load().unwrap(), None);
}

#[tokio::test]
async fn removal_already_underway_counts_as_removed() {
    let mut c = cluster(ScriptedObserver::leader_after(0));
    let config = fast_config(c.runtime.clone(), 1);
    let identity = c.orchestrator.create(&config).await.unwrap().clone();
    let master = identity.member(Role::Master).unwrap().container_id.clone();
    c.runtime.removing_elsewhere(&master);

    let outcome = c.orchestrator.destroy().await.unwrap();

    let DestroyOutcome::Destroyed { removed, failed, .. } = outcome else {
        panic!("expected a destroyed cluster");
    };
    assert!(failed.is_empty());
    assert_eq!(removed.len(), 3);
    assert!(removed.contains(&master));
    assert!(c.runtime.live_ids().is_empty());
}

// =============================================================================
// Shutdown
// =============================================================================

#[tokio::test]
async fn shutdown_signal_runs_cleanup_hook() {
    let mut c = cluster(ScriptedObserver::leader_after(0));
    let config = fast_config(c.runtime.clone(), 2);
    c.orchestrator.create(&config).await.unwrap();
    assert_eq!(c.runtime.live_ids().len(), 4);

    c.shutdown.trigger(ShutdownReason::Interrupt);
    wait_until_empty(&c.runtime).await;

    assert_eq!(c.orchestrator.lifecycle().tracked_count(), 0);
}

#[tokio::test]
async fn detached_cluster_survives_shutdown() {
    let mut c = cluster(ScriptedObserver::leader_after(0));
    let config = fast_config(c.runtime.clone(), 1);
    c.orchestrator.create(&config).await.unwrap();
    c.orchestrator.lifecycle().detach();

    c.shutdown.trigger(ShutdownReason::Terminate);
    tokio::time::sleep(Duration::from_millis(50)).await;
    drop(c.orchestrator);

    assert_eq!(c.runtime.live_ids().len(), 3);
}

#[tokio::test(start_paused = true)]
async fn shutdown_interrupts_wait_for_state() {
    let mut c = cluster(ScriptedObserver::never_ready());
    let config = fast_config(c.runtime.clone(), 1);
    c.orchestrator.create(&config).await.unwrap();
    c.orchestrator.start().await.unwrap();

    let shutdown = c.shutdown.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(250)).await;
        shutdown.trigger(ShutdownReason::Interrupt);
    });

    let err = c
        .orchestrator
        .wait_for_state(MasterState::has_leader)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Cancelled));
}
