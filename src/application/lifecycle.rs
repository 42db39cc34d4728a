//! Container lifecycle management.
//!
//! The [`ContainerLifecycleManager`] creates, starts, probes and tracks the
//! containers of one process. Everything it creates is registered in the
//! tracked set before anything else can fail, and the set is torn down
//! automatically when the shutdown signal fires, on [`release`], or when an
//! armed manager is dropped.
//!
//! [`release`]: ContainerLifecycleManager::release

use std::collections::{HashSet, VecDeque};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use futures_util::StreamExt;
use parking_lot::Mutex;
use tokio::runtime::{Handle, RuntimeFlavor};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::probe::{ProbePolicy, ReadinessProbe};
use crate::domain::{short_id, Container, ContainerSpec};
use crate::error::{Error, Result};
use super::shutdown::ShutdownSignal;
use crate::port::runtime::{tolerate_missing, ContainerRuntime, LogStream};

/// Token echoed by the liveness command.
const LIVENESS_TOKEN: &str = "minicluster-alive";

/// Lines kept from pull/build output for error reports.
const LOG_TAIL_LINES: usize = 20;

/// Pull output meaning the image is now (or already was) local.
const PULL_SUCCESS_MARKERS: &[&str] = &[
    "Download complete",
    "Already exists",
    "Downloaded newer image",
    "Image is up to date",
];

/// Build output meaning the build produced an image.
const BUILD_SUCCESS_MARKERS: &[&str] = &["Successfully built"];

/// Outcome of a best-effort removal pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StopReport {
    /// Ids removed, or already gone.
    pub removed: Vec<String>,
    /// Ids whose removal failed, with the reason.
    pub failed: Vec<(String, String)>,
}

impl StopReport {
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

struct Inner {
    runtime: Arc<dyn ContainerRuntime>,
    tracked: Mutex<Vec<Container>>,
    auto_cleanup: AtomicBool,
    probe_policy: Mutex<ProbePolicy>,
    cancel: watch::Receiver<bool>,
}

impl Inner {
    async fn stop_all(&self) -> StopReport {
        let targets: Vec<String> = self.tracked.lock().iter().map(|c| c.id.clone()).collect();
        if targets.is_empty() {
            return StopReport::default();
        }

        info!(count = targets.len(), "Removing tracked containers");
        let report = self.remove_ids(&targets).await;
        self.untrack(&targets);
        report
    }

    async fn remove_ids(&self, ids: &[String]) -> StopReport {
        let mut report = StopReport::default();
        for id in ids {
            match tolerate_missing(self.runtime.remove_container(id).await) {
                Ok(()) => {
                    info!(container = %short_id(id), "Removed container");
                    report.removed.push(id.clone());
                }
                Err(e) => {
                    warn!(container = %short_id(id), error = %e, "Failed to remove container");
                    report.failed.push((id.clone(), e.to_string()));
                }
            }
        }
        report
    }

    fn untrack(&self, ids: &[String]) {
        let ids: HashSet<&String> = ids.iter().collect();
        self.tracked.lock().retain(|c| !ids.contains(&c.id));
    }
}

/// Creates, probes and tracks the containers of one process.
pub struct ContainerLifecycleManager {
    inner: Arc<Inner>,
    hook: Option<JoinHandle<()>>,
}

impl ContainerLifecycleManager {
    /// Create a manager and register its cleanup hook on `shutdown`.
    ///
    /// The hook is spawned once, here; it requires a tokio runtime and is
    /// skipped (with a warning) outside one.
    pub fn new(runtime: Arc<dyn ContainerRuntime>, shutdown: &ShutdownSignal) -> Self {
        let inner = Arc::new(Inner {
            runtime,
            tracked: Mutex::new(Vec::new()),
            auto_cleanup: AtomicBool::new(true),
            probe_policy: Mutex::new(ProbePolicy::container()),
            cancel: shutdown.subscribe(),
        });

        let hook = match Handle::try_current() {
            Ok(handle) => {
                let inner = inner.clone();
                let shutdown = shutdown.clone();
                Some(handle.spawn(async move {
                    shutdown.triggered().await;
                    if inner.auto_cleanup.load(Ordering::SeqCst) {
                        info!("Running shutdown cleanup hook");
                        let report = inner.stop_all().await;
                        if !report.is_clean() {
                            warn!(failed = report.failed.len(), "Cleanup hook left containers behind");
                        }
                    }
                }))
            }
            Err(_) => {
                warn!("No async runtime; shutdown cleanup hook not registered");
                None
            }
        };

        Self { inner, hook }
    }

    /// Replace the container readiness policy (default 10s / 1s).
    #[must_use]
    pub fn with_probe_policy(self, policy: ProbePolicy) -> Self {
        *self.inner.probe_policy.lock() = policy;
        self
    }

    /// Replace the container readiness policy on a shared manager.
    pub fn set_probe_policy(&self, policy: ProbePolicy) {
        *self.inner.probe_policy.lock() = policy;
    }

    /// The runtime every container operation goes through.
    #[must_use]
    pub fn runtime(&self) -> &Arc<dyn ContainerRuntime> {
        &self.inner.runtime
    }

    /// Pull `name:tag`, succeeding only if the output reports completion or a
    /// local copy.
    pub async fn pull_image(&self, name: &str, tag: &str) -> Result<()> {
        let image = format!("{name}:{tag}");
        info!(image = %image, "Pulling image");

        let stream = self
            .inner
            .runtime
            .pull_image(name, tag)
            .await
            .map_err(|e| Error::ImagePull {
                image: image.clone(),
                log_tail: e.to_string(),
            })?;
        let capture = LogCapture::consume(stream, PULL_SUCCESS_MARKERS).await;

        if capture.matched {
            info!(image = %image, "Image available");
            Ok(())
        } else {
            Err(Error::ImagePull {
                image,
                log_tail: capture.tail(),
            })
        }
    }

    /// Build `context` into an image tagged `tag`, succeeding only on an
    /// explicit success marker in the output.
    pub async fn build_image(&self, context: &Path, tag: &str) -> Result<()> {
        if !context.is_dir() {
            return Err(Error::ImageBuild {
                tag: tag.to_string(),
                log_tail: format!("build context {} is not a directory", context.display()),
            });
        }
        info!(tag = %tag, context = %context.display(), "Building image");

        let stream = self
            .inner
            .runtime
            .build_image(context, tag)
            .await
            .map_err(|e| Error::ImageBuild {
                tag: tag.to_string(),
                log_tail: e.to_string(),
            })?;
        let capture = LogCapture::consume(stream, BUILD_SUCCESS_MARKERS).await;

        if capture.matched {
            info!(tag = %tag, "Image built");
            Ok(())
        } else {
            Err(Error::ImageBuild {
                tag: tag.to_string(),
                log_tail: capture.tail(),
            })
        }
    }

    /// Create a container and track it. Nothing is started.
    pub async fn create(&self, spec: &ContainerSpec) -> Result<String> {
        debug!(name = %spec.name, role = %spec.role, image = %spec.image, "Creating container");
        let id = self.inner.runtime.create_container(spec).await?;
        self.inner
            .tracked
            .lock()
            .push(Container::new(id.clone(), spec.role, spec.name.clone()));
        info!(name = %spec.name, container = %short_id(&id), "Created container");
        Ok(id)
    }

    /// Start a tracked container and wait for it to answer the liveness
    /// command. On timeout the container keeps running and stays tracked.
    pub async fn start_and_probe(&self, id: &str) -> Result<()> {
        self.inner.runtime.start_container(id).await?;
        info!(container = %short_id(id), "Started container");
        self.await_liveness(id).await
    }

    /// Create, start and probe a container, returning its id.
    ///
    /// The id is tracked as soon as the runtime returns it, so cleanup covers
    /// the container even when this call fails with [`Error::Readiness`].
    pub async fn create_and_start(&self, spec: &ContainerSpec) -> Result<String> {
        let id = self.create(spec).await?;
        self.start_and_probe(&id).await?;
        Ok(id)
    }

    async fn await_liveness(&self, id: &str) -> Result<()> {
        let policy = *self.inner.probe_policy.lock();
        let probe = ReadinessProbe::new(format!("container {} liveness", short_id(id)), policy)
            .with_cancel(self.inner.cancel.clone());
        let command = vec!["echo".to_string(), LIVENESS_TOKEN.to_string()];

        let result = probe
            .until(|| {
                let runtime = self.inner.runtime.clone();
                let command = command.clone();
                let id = id.to_string();
                async move {
                    match runtime.exec(&id, &command).await {
                        Ok(output) => output.success() && output.stdout.contains(LIVENESS_TOKEN),
                        Err(e) => {
                            debug!(container = %short_id(&id), error = %e, "Liveness check failed");
                            false
                        }
                    }
                }
            })
            .await;

        match result {
            Ok(outcome) => {
                debug!(container = %short_id(id), attempts = outcome.attempts, "Container live");
                Ok(())
            }
            Err(Error::Timeout {
                elapsed, attempts, ..
            }) => {
                warn!(container = %short_id(id), attempts, "Container did not become live");
                Err(Error::Readiness {
                    container_id: id.to_string(),
                    elapsed,
                    attempts,
                })
            }
            Err(e) => Err(e),
        }
    }

    /// IP address of a container, cached on the tracked entry.
    pub async fn inspect_ip(&self, id: &str) -> Result<String> {
        let inspection = self.inner.runtime.inspect_container(id).await?;
        let ip = inspection
            .ip_address
            .filter(|ip| !ip.is_empty())
            .ok_or_else(|| Error::Network {
                container_id: id.to_string(),
                reason: "no address assigned".into(),
            })?;

        if let Some(container) = self.inner.tracked.lock().iter_mut().find(|c| c.id == id) {
            container.ip_address = Some(ip.clone());
        }
        Ok(ip)
    }

    /// Force-remove every tracked container, best-effort.
    ///
    /// Safe to call concurrently with itself and with the cleanup hook:
    /// removing a container that is already gone counts as success.
    pub async fn stop_all(&self) -> StopReport {
        self.inner.stop_all().await
    }

    /// Force-remove the given containers, tracked or not, best-effort.
    pub async fn remove(&self, ids: &[String]) -> StopReport {
        let report = self.inner.remove_ids(ids).await;
        self.inner.untrack(ids);
        report
    }

    /// Snapshot of the tracked containers in creation order.
    #[must_use]
    pub fn tracked(&self) -> Vec<Container> {
        self.inner.tracked.lock().clone()
    }

    /// Number of containers still owned by this manager.
    #[must_use]
    pub fn tracked_count(&self) -> usize {
        self.inner.tracked.lock().len()
    }

    /// Whether tracked containers are removed on shutdown and drop.
    #[must_use]
    pub fn is_armed(&self) -> bool {
        self.inner.auto_cleanup.load(Ordering::SeqCst)
    }

    /// Disarm automatic cleanup so the containers outlive this process.
    pub fn detach(&self) -> Vec<Container> {
        self.inner.auto_cleanup.store(false, Ordering::SeqCst);
        let tracked = self.tracked();
        info!(count = tracked.len(), "Detached containers from process lifetime");
        tracked
    }

    /// Normal-exit cleanup: remove everything tracked unless detached.
    pub async fn release(&self) -> Option<StopReport> {
        if self.is_armed() {
            Some(self.stop_all().await)
        } else {
            None
        }
    }
}

impl Drop for ContainerLifecycleManager {
    fn drop(&mut self) {
        if let Some(hook) = self.hook.take() {
            hook.abort();
        }
        if !self.is_armed() || self.inner.tracked.lock().is_empty() {
            return;
        }

        warn!("Lifecycle manager dropped with live containers; removing them");
        let inner = self.inner.clone();
        match Handle::try_current() {
            Ok(handle) if handle.runtime_flavor() == RuntimeFlavor::MultiThread => {
                tokio::task::block_in_place(|| {
                    handle.block_on(inner.stop_all());
                });
            }
            Ok(handle) => {
                handle.spawn(async move {
                    inner.stop_all().await;
                });
            }
            Err(_) => match tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
            {
                Ok(rt) => {
                    rt.block_on(inner.stop_all());
                }
                Err(e) => warn!(error = %e, "Could not run drop cleanup"),
            },
        }
    }
}

/// Keeps the tail of a log stream and whether a marker line was seen.
struct LogCapture {
    tail: VecDeque<String>,
    matched: bool,
}

impl LogCapture {
    async fn consume(mut stream: LogStream, markers: &[&str]) -> Self {
        let mut capture = Self {
            tail: VecDeque::with_capacity(LOG_TAIL_LINES),
            matched: false,
        };

        while let Some(line) = stream.next().await {
            match line {
                Ok(line) => {
                    info!("{line}");
                    if markers.iter().any(|marker| line.contains(marker)) {
                        capture.matched = true;
                    }
                    capture.push(line);
                }
                Err(e) => {
                    capture.push(format!("error: {e}"));
                    capture.matched = false;
                    break;
                }
            }
        }
        capture
    }

    fn push(&mut self, line: String) {
        if self.tail.len() == LOG_TAIL_LINES {
            self.tail.pop_front();
        }
        self.tail.push_back(line);
    }

    fn tail(&self) -> String {
        self.tail.iter().cloned().collect::<Vec<_>>().join("\n")
    }
}
