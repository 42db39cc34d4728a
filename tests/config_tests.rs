//! Settings files and the cluster builder, through to the specs the runtime
//! receives.

use std::fs;
use std::path::Path;
use std::sync::Arc;

use minicluster::application::config::{ClusterConfig, ImageRef};
use minicluster::application::{ClusterOrchestrator, ShutdownSignal};
use minicluster::domain::Role;
use minicluster::error::ConfigError;
use minicluster::infrastructure::config::settings::Settings;
use minicluster::testkit::config::worker_resources;
use minicluster::testkit::observer::ScriptedObserver;
use minicluster::testkit::runtime::FakeRuntime;
use minicluster::testkit::store::MemoryStore;

fn config_from(path: &Path, runtime: &Arc<FakeRuntime>) -> ClusterConfig {
    Settings::load(path)
        .unwrap()
        .into_builder()
        .unwrap()
        .runtime(runtime.clone())
        .build()
        .unwrap()
}

async fn create(config: &ClusterConfig, runtime: &Arc<FakeRuntime>) -> ClusterOrchestrator {
    let mut orchestrator = ClusterOrchestrator::new(
        runtime.clone(),
        Arc::new(MemoryStore::new()),
        Arc::new(ScriptedObserver::leader_after(0)),
        &ShutdownSignal::new(),
    );
    orchestrator.create(config).await.unwrap();
    orchestrator.lifecycle().detach();
    orchestrator
}

// =============================================================================
// Builder validation
// =============================================================================

#[test]
fn zero_workers_is_rejected() {
    let err = ClusterConfig::builder()
        .runtime(Arc::new(FakeRuntime::new()))
        .workers(0)
        .build()
        .unwrap_err();

    assert!(matches!(err, ConfigError::InvalidValue { field: "workers", .. }));
}

#[test]
fn zero_master_port_is_rejected() {
    let err = ClusterConfig::builder()
        .runtime(Arc::new(FakeRuntime::new()))
        .workers(1)
        .worker_resources(worker_resources(1))
        .master_port(0)
        .build()
        .unwrap_err();

    assert!(matches!(err, ConfigError::InvalidValue { field: "master_port", .. }));
}

#[test]
fn blank_environment_key_is_rejected() {
    let err = ClusterConfig::builder()
        .runtime(Arc::new(FakeRuntime::new()))
        .workers(1)
        .worker_resources(worker_resources(1))
        .env(" ", "x")
        .build()
        .unwrap_err();

    assert!(matches!(err, ConfigError::InvalidValue { field: "environment", .. }));
}

#[test]
fn missing_runtime_is_reported() {
    let err = ClusterConfig::builder()
        .workers(1)
        .worker_resources(worker_resources(1))
        .build()
        .unwrap_err();

    assert!(matches!(err, ConfigError::NoRuntime { .. }));
}

#[test]
fn image_references_keep_registry_ports() {
    assert_eq!(
        ImageRef::parse("registry.local:5000/mesos-master").unwrap(),
        ImageRef::new("registry.local:5000/mesos-master", "latest")
    );
    assert_eq!(
        ImageRef::parse("jplock/zookeeper:3.4.6").unwrap().to_string(),
        "jplock/zookeeper:3.4.6"
    );
    assert!(ImageRef::parse("busybox:").is_err());
}

// =============================================================================
// Settings file to running specs
// =============================================================================

#[tokio::test]
async fn settings_file_shapes_every_container() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("minicluster.toml");
    fs::write(
        &path,
        r#"
[cluster]
workers = 2
worker_resources = ["cpus(*):1", "cpus(*):2"]
master_port = 5151
zk_path = "/team"
environment = { MESOS_LOGGING_LEVEL = "WARNING", LIBPROCESS_IP = "0.0.0.0" }

[images]
master = "registry.local:5000/mesos-master:1.0"
"#,
    )
    .unwrap();
    let runtime = Arc::new(FakeRuntime::new());
    let config = config_from(&path, &runtime);

    let orchestrator = create(&config, &runtime).await;

    let identity = orchestrator.identity().unwrap();
    let coordination = identity.member(Role::Coordination).unwrap();
    let coordination_ip = runtime.ip_of(&coordination.container_id).unwrap();
    let master = runtime
        .spec_of(&identity.member(Role::Master).unwrap().container_id)
        .unwrap();
    assert_eq!(master.image, "registry.local:5000/mesos-master:1.0");
    assert_eq!(
        master.env_value("MESOS_ZK"),
        Some(format!("zk://{coordination_ip}:2181/team").as_str())
    );
    assert_eq!(master.env_value("MESOS_PORT"), Some("5151"));
    assert_eq!(master.env_value("MESOS_LOGGING_LEVEL"), Some("WARNING"));
    assert_eq!(master.env_value("LIBPROCESS_IP"), Some("0.0.0.0"));

    let resources: Vec<String> = identity
        .members_with(Role::Worker)
        .map(|w| {
            runtime
                .spec_of(&w.container_id)
                .unwrap()
                .env_value("MESOS_RESOURCES")
                .unwrap()
                .to_string()
        })
        .collect();
    assert_eq!(resources, vec!["cpus(*):1", "cpus(*):2"]);
    assert!(runtime.pulled().contains(&"registry.local:5000/mesos-master:1.0".to_string()));
}

#[tokio::test]
async fn disabled_pulls_never_touch_the_registry() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("minicluster.toml");
    fs::write(&path, "[cluster]\nworkers = 1\npull_images = false\n").unwrap();
    let runtime = Arc::new(FakeRuntime::new());
    let config = config_from(&path, &runtime);

    create(&config, &runtime).await;

    assert!(runtime.pulled().is_empty());
    assert_eq!(runtime.live_ids().len(), 3);
}

#[tokio::test]
async fn worker_build_context_builds_instead_of_pulling() {
    let dir = tempfile::tempdir().unwrap();
    let context = dir.path().join("worker");
    fs::create_dir(&context).unwrap();
    fs::write(context.join("Dockerfile"), "FROM busybox\n").unwrap();
    let path = dir.path().join("minicluster.toml");
    fs::write(
        &path,
        format!(
            "[cluster]\nworkers = 1\nworker_build_context = {:?}\n\n[images]\nworker = \"local/worker:dev\"\n",
            context.display().to_string()
        ),
    )
    .unwrap();
    let runtime = Arc::new(FakeRuntime::new());
    let config = config_from(&path, &runtime);

    create(&config, &runtime).await;

    assert_eq!(runtime.built(), vec!["local/worker:dev".to_string()]);
    assert!(!runtime.pulled().iter().any(|image| image.starts_with("local/worker")));
}
