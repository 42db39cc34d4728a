//! Bounded polling until a condition holds.

use std::future::Future;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::Instant;
use tracing::{debug, trace};

use crate::error::{Error, Result};
use super::shutdown::wait_triggered;

/// Timeout and poll interval for a probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProbePolicy {
    pub timeout: Duration,
    pub poll_interval: Duration,
}

impl ProbePolicy {
    #[must_use]
    pub const fn new(timeout: Duration, poll_interval: Duration) -> Self {
        Self {
            timeout,
            poll_interval,
        }
    }

    /// Container liveness: up to 10 seconds, polled every second.
    #[must_use]
    pub const fn container() -> Self {
        Self::new(Duration::from_secs(10), Duration::from_secs(1))
    }

    /// Cluster-level readiness: up to 60 seconds, polled every second.
    #[must_use]
    pub const fn cluster() -> Self {
        Self::new(Duration::from_secs(60), Duration::from_secs(1))
    }
}

impl Default for ProbePolicy {
    fn default() -> Self {
        Self::container()
    }
}

/// How a successful probe went.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProbeOutcome {
    pub attempts: u32,
    pub elapsed: Duration,
}

/// Repeatedly evaluates a predicate until it holds or the policy times out.
///
/// The first evaluation happens immediately. Between evaluations the probe
/// sleeps the full poll interval. A single evaluation may run for the rest of
/// the budget (never less than one poll interval) before it counts as false,
/// so a never-true or hung predicate fails after at most
/// `timeout + poll_interval`. Each call to [`ReadinessProbe::until`] starts
/// from scratch.
#[derive(Debug, Clone)]
pub struct ReadinessProbe {
    condition: String,
    policy: ProbePolicy,
    cancel: Option<watch::Receiver<bool>>,
}

impl ReadinessProbe {
    pub fn new(condition: impl Into<String>, policy: ProbePolicy) -> Self {
        Self {
            condition: condition.into(),
            policy,
            cancel: None,
        }
    }

    /// Abort promptly with [`Error::Cancelled`] once `cancel` turns `true`.
    #[must_use]
    pub fn with_cancel(mut self, cancel: watch::Receiver<bool>) -> Self {
        self.cancel = Some(cancel);
        self
    }

    #[must_use]
    pub fn policy(&self) -> ProbePolicy {
        self.policy
    }

    /// Poll `predicate` until it returns `true`.
    pub async fn until<F, Fut>(&self, mut predicate: F) -> Result<ProbeOutcome>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = bool>,
    {
        let started = Instant::now();
        let mut cancel = self.cancel.clone();
        let mut attempts = 0u32;

        loop {
            if cancel.as_ref().is_some_and(|rx| *rx.borrow()) {
                return Err(Error::Cancelled);
            }

            attempts += 1;
            let budget = self
                .policy
                .timeout
                .saturating_sub(started.elapsed())
                .max(self.policy.poll_interval);
            let check = tokio::time::timeout(budget, predicate());
            let checked = match cancel.as_mut() {
                Some(rx) => {
                    tokio::select! {
                        result = check => result,
                        () = wait_triggered(rx) => return Err(Error::Cancelled),
                    }
                }
                None => check.await,
            };
            let satisfied = match checked {
                Ok(satisfied) => satisfied,
                Err(_) => {
                    debug!(condition = %self.condition, attempts, ?budget, "Probe check overran its budget");
                    false
                }
            };

            if satisfied {
                let elapsed = started.elapsed();
                debug!(condition = %self.condition, attempts, ?elapsed, "Probe satisfied");
                return Ok(ProbeOutcome { attempts, elapsed });
            }

            let elapsed = started.elapsed();
            if elapsed >= self.policy.timeout {
                return Err(Error::Timeout {
                    condition: self.condition.clone(),
                    elapsed,
                    attempts,
                });
            }
            trace!(condition = %self.condition, attempts, "Probe not yet satisfied");

            match cancel.as_mut() {
                Some(rx) => {
                    tokio::select! {
                        () = tokio::time::sleep(self.policy.poll_interval) => {}
                        () = wait_triggered(rx) => return Err(Error::Cancelled),
                    }
                }
                None => tokio::time::sleep(self.policy.poll_interval).await,
            }
        }
    }
}
