//! Remediation executor.
//!
//! The single choke point for every container restart, regardless of
//! whether it was triggered by an alert webhook, the health poll loop,
//! or a manual request. An in-flight set guarantees at most one
//! concurrent restart attempt per container; a duplicate concurrent
//! request is dropped with a distinguishable outcome, never queued.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, PoisonError};

use serde::Serialize;
use tracing::{error, info};

use crate::metrics::MetricsSink;
use crate::runtime::ContainerRuntime;
use crate::safety;

/// Why a remediation request ended the way it did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RestartReason {
    /// The container was restarted.
    Restarted,
    /// Another restart of the same container was already in flight;
    /// this request was dropped, not deferred.
    AlreadyInFlight,
    /// The container is absent from the current runtime listing.
    NotFound,
    /// The container has not opted in via the safety label.
    NotLabeled,
    /// The runtime call failed.
    RuntimeError,
}

/// Outcome of one remediation request. Transient: used to decide
/// logging and the manual-restart response, never persisted.
#[derive(Debug, Clone, Serialize)]
pub struct RestartOutcome {
    pub container: String,
    pub reason: RestartReason,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl RestartOutcome {
    fn new(container: &str, reason: RestartReason) -> Self {
        Self {
            container: container.to_string(),
            reason,
            detail: None,
        }
    }

    fn with_detail(container: &str, reason: RestartReason, detail: String) -> Self {
        Self {
            container: container.to_string(),
            reason,
            detail: Some(detail),
        }
    }

    /// Whether a restart was actually issued and accepted.
    #[must_use]
    pub fn succeeded(&self) -> bool {
        self.reason == RestartReason::Restarted
    }

    /// Human-readable failure description for API responses.
    #[must_use]
    pub fn error_message(&self) -> String {
        match self.reason {
            RestartReason::Restarted => "restarted".to_string(),
            RestartReason::AlreadyInFlight => {
                format!("restart of {} already in flight", self.container)
            }
            RestartReason::NotFound => format!("container {} not found", self.container),
            RestartReason::NotLabeled => {
                format!("container {} is not opted in to automated restarts", self.container)
            }
            RestartReason::RuntimeError => self
                .detail
                .clone()
                .unwrap_or_else(|| "container runtime error".to_string()),
        }
    }
}

/// Membership in the in-flight set, released on drop.
///
/// The release must survive future cancellation: axum drops a handler
/// future when the client disconnects, and a restart can be mid-call at
/// that point. Tying removal to `Drop` keeps the entry from leaking and
/// permanently blocking later requests for the same container.
struct InFlightGuard<'a> {
    set: &'a Mutex<HashSet<String>>,
    name: String,
}

impl<'a> InFlightGuard<'a> {
    /// Claim the in-flight entry for `name`, or `None` if another
    /// attempt already holds it.
    fn acquire(set: &'a Mutex<HashSet<String>>, name: &str) -> Option<Self> {
        let mut entries = set.lock().unwrap_or_else(PoisonError::into_inner);
        if entries.insert(name.to_string()) {
            Some(Self {
                set,
                name: name.to_string(),
            })
        } else {
            None
        }
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.set
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.name);
    }
}

/// Orchestrates runtime listing, the safety gate, and the restart call.
pub struct RemediationExecutor {
    runtime: Arc<dyn ContainerRuntime>,
    metrics: Arc<MetricsSink>,
    allowed_label: String,
    /// Containers currently undergoing a restart attempt. Held behind a
    /// std mutex; never locked across an await point.
    in_flight: Mutex<HashSet<String>>,
}

impl RemediationExecutor {
    pub fn new(
        runtime: Arc<dyn ContainerRuntime>,
        metrics: Arc<MetricsSink>,
        allowed_label: &str,
    ) -> Self {
        Self {
            runtime,
            metrics,
            allowed_label: allowed_label.to_string(),
            in_flight: Mutex::new(HashSet::new()),
        }
    }

    /// Attempt to restart a container by name.
    ///
    /// A restart is only issued when the container exists in the current
    /// listing, carries the opt-in label, and no other restart of the
    /// same container is in flight. The in-flight entry is released on
    /// every path, including cancellation of the calling future.
    pub async fn remediate(&self, name: &str) -> RestartOutcome {
        let Some(_guard) = InFlightGuard::acquire(&self.in_flight, name) else {
            info!("restart of {name} already in flight, dropping duplicate request");
            return RestartOutcome::new(name, RestartReason::AlreadyInFlight);
        };

        self.attempt_restart(name).await
    }

    async fn attempt_restart(&self, name: &str) -> RestartOutcome {
        let containers = match self.runtime.list_containers().await {
            Ok(containers) => containers,
            Err(e) => {
                error!("cannot list containers while remediating {name}: {e}");
                return RestartOutcome::with_detail(name, RestartReason::RuntimeError, e.to_string());
            }
        };

        let Some(container) = containers.into_iter().find(|c| c.name == name) else {
            info!("container {name} not found, skipping");
            return RestartOutcome::new(name, RestartReason::NotFound);
        };

        if !safety::is_eligible(&container, &self.allowed_label) {
            info!("skip {name}: missing label {}=true", self.allowed_label);
            return RestartOutcome::new(name, RestartReason::NotLabeled);
        }

        info!("restarting container {name}");
        match self.runtime.restart(&container.id).await {
            Ok(()) => {
                self.metrics.record_restart();
                info!("restarted container {name}");
                RestartOutcome::new(name, RestartReason::Restarted)
            }
            Err(e) => {
                error!("restart of {name} failed: {e}");
                RestartOutcome::with_detail(name, RestartReason::RuntimeError, e.to_string())
            }
        }
    }
}
