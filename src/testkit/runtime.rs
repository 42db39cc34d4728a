//! In-memory [`ContainerRuntime`] for testing.
//!
//! [`FakeRuntime`] keeps containers in a map and records every call. Failure
//! modes are switched on per role or per container so tests can script
//! partial failures without a container daemon.

use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use futures_util::stream;

use crate::domain::{ContainerSpec, Role};
use crate::error::{Error, Result};
use crate::port::runtime::{
    ContainerInspection, ContainerRuntime, ContainerStatus, ExecOutput, LogStream,
};

/// A container held by the fake runtime.
#[derive(Debug, Clone)]
pub struct FakeContainer {
    pub spec: ContainerSpec,
    pub running: bool,
    pub ip_address: Option<String>,
}

#[derive(Default)]
struct State {
    next_id: usize,
    containers: BTreeMap<String, FakeContainer>,
    created: Vec<String>,
    remove_attempts: Vec<String>,
    pulled: Vec<String>,
    built: Vec<(PathBuf, String)>,
    pull_log: Vec<String>,
    build_log: Vec<String>,
    unresponsive: HashSet<Role>,
    fail_create: HashSet<Role>,
    fail_remove: HashSet<String>,
    removing_elsewhere: HashSet<String>,
    no_ips: bool,
}

/// Scriptable in-memory container runtime.
///
/// Defaults: every container answers the liveness command, gets an address
/// in `172.17.0.0/16`, and pulls and builds succeed.
pub struct FakeRuntime {
    state: Mutex<State>,
    calls: AtomicUsize,
}

impl FakeRuntime {
    pub fn new() -> Self {
        let state = State {
            pull_log: vec!["Pulling fs layer".into(), "Download complete".into()],
            build_log: vec!["Step 1/1 : FROM busybox".into(), "Successfully built 5e1f00d".into()],
            ..State::default()
        };
        Self {
            state: Mutex::new(state),
            calls: AtomicUsize::new(0),
        }
    }

    fn state(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    fn record_call(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }

    // -- scripting ----------------------------------------------------------

    /// Containers of `role` never pass the liveness command.
    pub fn set_unresponsive(&self, role: Role) {
        self.state().unresponsive.insert(role);
    }

    /// Creating a container of `role` fails.
    pub fn fail_create(&self, role: Role) {
        self.state().fail_create.insert(role);
    }

    /// Removing container `id` fails (the container stays).
    pub fn fail_remove(&self, id: &str) {
        self.state().fail_remove.insert(id.to_string());
    }

    /// Another client is already removing container `id`: removal requests
    /// answer with a conflict while the container disappears anyway.
    pub fn removing_elsewhere(&self, id: &str) {
        self.state().removing_elsewhere.insert(id.to_string());
    }

    /// Whether new containers get an address.
    pub fn set_assign_ips(&self, assign: bool) {
        self.state().no_ips = !assign;
    }

    pub fn set_pull_log(&self, lines: &[&str]) {
        self.state().pull_log = lines.iter().map(|l| (*l).to_string()).collect();
    }

    pub fn set_build_log(&self, lines: &[&str]) {
        self.state().build_log = lines.iter().map(|l| (*l).to_string()).collect();
    }

    /// Simulate a container exiting on its own.
    pub fn stop(&self, id: &str) {
        if let Some(container) = self.state().containers.get_mut(id) {
            container.running = false;
        }
    }

    /// Simulate a container removed behind the manager's back.
    pub fn vanish(&self, id: &str) {
        self.state().containers.remove(id);
    }

    // -- inspection ---------------------------------------------------------

    /// Total number of runtime calls made.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Ids of containers that still exist, in creation order.
    pub fn live_ids(&self) -> Vec<String> {
        let state = self.state();
        state
            .created
            .iter()
            .filter(|id| state.containers.contains_key(*id))
            .cloned()
            .collect()
    }

    /// Every id ever created, in order.
    pub fn created_ids(&self) -> Vec<String> {
        self.state().created.clone()
    }

    /// Every removal attempt, in order, including repeats.
    pub fn remove_attempts(&self) -> Vec<String> {
        self.state().remove_attempts.clone()
    }

    pub fn is_running(&self, id: &str) -> bool {
        self.state().containers.get(id).is_some_and(|c| c.running)
    }

    pub fn spec_of(&self, id: &str) -> Option<ContainerSpec> {
        self.state().containers.get(id).map(|c| c.spec.clone())
    }

    pub fn ip_of(&self, id: &str) -> Option<String> {
        self.state().containers.get(id).and_then(|c| c.ip_address.clone())
    }

    /// Roles of live containers, in creation order.
    pub fn live_roles(&self) -> Vec<Role> {
        let state = self.state();
        state
            .created
            .iter()
            .filter_map(|id| state.containers.get(id))
            .map(|c| c.spec.role)
            .collect()
    }

    /// Images pulled, as `name:tag`.
    pub fn pulled(&self) -> Vec<String> {
        self.state().pulled.clone()
    }

    /// Tags built.
    pub fn built(&self) -> Vec<String> {
        self.state().built.iter().map(|(_, tag)| tag.clone()).collect()
    }
}

impl Default for FakeRuntime {
    fn default() -> Self {
        Self::new()
    }
}

fn log_stream(lines: Vec<String>) -> LogStream {
    Box::pin(stream::iter(lines.into_iter().map(Ok)))
}

#[async_trait]
impl ContainerRuntime for FakeRuntime {
    async fn create_container(&self, spec: &ContainerSpec) -> Result<String> {
        self.record_call();
        let mut state = self.state();
        if state.fail_create.contains(&spec.role) {
            return Err(Error::runtime("create container", format!("scripted failure for {}", spec.name)));
        }
        if state.containers.values().any(|c| c.spec.name == spec.name) {
            return Err(Error::runtime("create container", format!("name {} already in use", spec.name)));
        }

        state.next_id += 1;
        let n = state.next_id;
        let id = format!("fake{n:060x}");
        let ip_address = (!state.no_ips).then(|| format!("172.17.{}.{}", n / 250, n % 250 + 2));
        state.containers.insert(
            id.clone(),
            FakeContainer {
                spec: spec.clone(),
                running: false,
                ip_address,
            },
        );
        state.created.push(id.clone());
        Ok(id)
    }

    async fn start_container(&self, id: &str) -> Result<()> {
        self.record_call();
        match self.state().containers.get_mut(id) {
            Some(container) => {
                container.running = true;
                Ok(())
            }
            None => Err(Error::NotFound(format!("container {id}"))),
        }
    }

    async fn inspect_container(&self, id: &str) -> Result<ContainerInspection> {
        self.record_call();
        let state = self.state();
        let container = state
            .containers
            .get(id)
            .ok_or_else(|| Error::NotFound(format!("container {id}")))?;
        Ok(ContainerInspection {
            id: id.to_string(),
            status: if container.running {
                ContainerStatus::Running
            } else {
                ContainerStatus::Exited
            },
            ip_address: container.ip_address.clone(),
        })
    }

    async fn exec(&self, id: &str, cmd: &[String]) -> Result<ExecOutput> {
        self.record_call();
        let state = self.state();
        let container = state
            .containers
            .get(id)
            .ok_or_else(|| Error::NotFound(format!("container {id}")))?;
        if !container.running {
            return Err(Error::runtime("exec", format!("container {id} is not running")));
        }
        if state.unresponsive.contains(&container.spec.role) {
            return Ok(ExecOutput {
                stdout: String::new(),
                stderr: "connection refused".into(),
                exit_code: 1,
            });
        }

        let stdout = match cmd.split_first() {
            Some((program, args)) if program == "echo" => format!("{}\n", args.join(" ")),
            _ => String::new(),
        };
        Ok(ExecOutput {
            stdout,
            stderr: String::new(),
            exit_code: 0,
        })
    }

    async fn pull_image(&self, name: &str, tag: &str) -> Result<LogStream> {
        self.record_call();
        let mut state = self.state();
        state.pulled.push(format!("{name}:{tag}"));
        Ok(log_stream(state.pull_log.clone()))
    }

    async fn build_image(&self, context: &Path, tag: &str) -> Result<LogStream> {
        self.record_call();
        let mut state = self.state();
        state.built.push((context.to_path_buf(), tag.to_string()));
        Ok(log_stream(state.build_log.clone()))
    }

    async fn remove_container(&self, id: &str) -> Result<()> {
        self.record_call();
        let mut state = self.state();
        state.remove_attempts.push(id.to_string());
        if state.fail_remove.contains(id) {
            return Err(Error::runtime("remove container", format!("scripted failure for {id}")));
        }
        if state.removing_elsewhere.contains(id) {
            state.containers.remove(id);
            return Err(Error::RemovalInProgress(format!("container {id}")));
        }
        if state.containers.remove(id).is_none() {
            return Err(Error::NotFound(format!("container {id}")));
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "fake"
    }
}
