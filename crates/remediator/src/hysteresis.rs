//! Health poll loop with hysteresis.
//!
//! Each pass walks the full container listing and keeps a per-name
//! count of consecutive unhealthy observations. When an opted-in
//! container stays unhealthy for `threshold` consecutive passes, one
//! restart is issued through the executor and the count resets to zero
//! regardless of the restart outcome. A single good observation clears
//! the count immediately.
//!
//! Known limitation: because the count resets right after the trip,
//! before recovery is confirmed, a container whose healthcheck flaps
//! can be restarted once per `threshold` passes.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::executor::RemediationExecutor;
use crate::runtime::{ContainerRuntime, HealthStatus};
use crate::safety;

/// Per-container consecutive-unhealthy tracking and the trip decision.
pub struct HealthHysteresis {
    runtime: Arc<dyn ContainerRuntime>,
    executor: Arc<RemediationExecutor>,
    allowed_label: String,
    threshold: u32,
    /// Consecutive unhealthy observations per container name. An absent
    /// entry means zero.
    counts: Mutex<HashMap<String, u32>>,
    /// Single-flight guard over a whole poll pass so a slow runtime
    /// cannot cause overlapping passes.
    pass_guard: Mutex<()>,
}

impl HealthHysteresis {
    pub fn new(
        runtime: Arc<dyn ContainerRuntime>,
        executor: Arc<RemediationExecutor>,
        allowed_label: &str,
        threshold: u32,
    ) -> Self {
        Self {
            runtime,
            executor,
            allowed_label: allowed_label.to_string(),
            threshold,
            counts: Mutex::new(HashMap::new()),
            pass_guard: Mutex::new(()),
        }
    }

    /// Run the poll loop forever at a fixed cadence.
    ///
    /// The period is wall-clock fixed: a slow pass does not push later
    /// passes back. A pass that outlasts the period skips the missed
    /// tick instead of bursting to catch up.
    pub async fn run(self: Arc<Self>, period: Duration) {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        loop {
            ticker.tick().await;
            self.tick().await;
        }
    }

    /// One full pass over the current container listing.
    ///
    /// Failures are isolated per container: an inspect error on one
    /// container never blocks the rest of the pass, and a listing
    /// error aborts only this pass.
    pub async fn tick(&self) {
        let Ok(_pass) = self.pass_guard.try_lock() else {
            debug!("previous health pass still running, skipping tick");
            return;
        };

        let containers = match self.runtime.list_containers().await {
            Ok(containers) => containers,
            Err(e) => {
                warn!("health pass aborted, cannot list containers: {e}");
                return;
            }
        };

        for container in &containers {
            // Not opted in: skip entirely, counter not advanced.
            if !safety::is_eligible(container, &self.allowed_label) {
                continue;
            }

            let status = match self.runtime.inspect_health(&container.id).await {
                Ok(status) => status,
                Err(e) => {
                    warn!("cannot inspect health of {}: {e}", container.name);
                    continue;
                }
            };

            if status == HealthStatus::Unhealthy {
                let count = self.bump(&container.name).await;
                debug!("{} unhealthy x{count}", container.name);
                if count >= self.threshold {
                    warn!(
                        "auto-restarting {}: unhealthy x{count}",
                        container.name
                    );
                    let outcome = self.executor.remediate(&container.name).await;
                    if !outcome.succeeded() {
                        warn!(
                            "auto-restart of {} did not complete: {}",
                            container.name,
                            outcome.error_message()
                        );
                    }
                    // Reset regardless of the outcome so a tripped
                    // container is not restarted again every pass.
                    self.reset(&container.name).await;
                }
            } else {
                self.reset(&container.name).await;
            }
        }

        // A container that disappeared while degrading must not leave
        // its count behind for a future container with the same name.
        self.counts
            .lock()
            .await
            .retain(|name, _| containers.iter().any(|c| &c.name == name));
    }

    async fn bump(&self, name: &str) -> u32 {
        let mut counts = self.counts.lock().await;
        let count = counts.entry(name.to_string()).or_insert(0);
        *count += 1;
        *count
    }

    async fn reset(&self, name: &str) {
        self.counts.lock().await.remove(name);
    }

    #[cfg(test)]
    async fn count_for(&self, name: &str) -> u32 {
        self.counts.lock().await.get(name).copied().unwrap_or(0)
    }
}
