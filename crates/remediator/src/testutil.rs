//! In-process fake of the container runtime for tests.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::Barrier;

use crate::runtime::{ContainerRef, ContainerRuntime, HealthStatus, RuntimeError};

/// Scriptable [`ContainerRuntime`] that records restart calls.
#[derive(Default)]
pub struct FakeRuntime {
    containers: Mutex<Vec<ContainerRef>>,
    health: Mutex<HashMap<String, HealthStatus>>,
    restarted: Mutex<Vec<String>>,
    list_calls: Mutex<usize>,
    fail_restart: bool,
    fail_list: bool,
    /// Rendezvous points inside `restart`, consumed by the first
    /// restart call that sees them: that call crosses the first barrier
    /// on entry and the second before returning. Lets a test hold one
    /// restart in flight deterministically while later calls proceed.
    restart_barriers: Mutex<Option<(Arc<Barrier>, Arc<Barrier>)>>,
}

impl FakeRuntime {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a container carrying `autoheal=true`.
    pub fn add_labeled(&self, name: &str) {
        self.add_with_labels(name, &[("autoheal", "true")]);
    }

    /// Add a container with no labels at all.
    pub fn add_unlabeled(&self, name: &str) {
        self.add_with_labels(name, &[]);
    }

    pub fn add_with_labels(&self, name: &str, labels: &[(&str, &str)]) {
        self.containers.lock().unwrap().push(ContainerRef {
            id: format!("id-{name}"),
            name: name.to_string(),
            labels: labels
                .iter()
                .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
                .collect(),
        });
    }

    /// Script the health reported for a container ID.
    pub fn set_health(&self, id: &str, status: HealthStatus) {
        self.health.lock().unwrap().insert(id.to_string(), status);
    }

    /// Drop a container from the listing, as if it were removed.
    pub fn remove_container(&self, name: &str) {
        self.containers.lock().unwrap().retain(|c| c.name != name);
    }

    pub fn restart_calls(&self) -> Vec<String> {
        self.restarted.lock().unwrap().clone()
    }

    pub fn restart_count(&self) -> usize {
        self.restarted.lock().unwrap().len()
    }

    pub fn list_call_count(&self) -> usize {
        *self.list_calls.lock().unwrap()
    }

    pub fn failing_restarts(mut self) -> Self {
        self.fail_restart = true;
        self
    }

    pub fn failing_listing(mut self) -> Self {
        self.fail_list = true;
        self
    }

    pub fn holding_restarts(self, entered: Arc<Barrier>, release: Arc<Barrier>) -> Self {
        *self.restart_barriers.lock().unwrap() = Some((entered, release));
        self
    }
}

#[async_trait]
impl ContainerRuntime for FakeRuntime {
    async fn list_containers(&self) -> Result<Vec<ContainerRef>, RuntimeError> {
        *self.list_calls.lock().unwrap() += 1;
        if self.fail_list {
            return Err(RuntimeError::Unavailable("simulated outage".to_string()));
        }
        Ok(self.containers.lock().unwrap().clone())
    }

    async fn inspect_health(&self, id: &str) -> Result<HealthStatus, RuntimeError> {
        Ok(self
            .health
            .lock()
            .unwrap()
            .get(id)
            .copied()
            .unwrap_or(HealthStatus::Unknown))
    }

    async fn restart(&self, id: &str) -> Result<(), RuntimeError> {
        let barriers = self.restart_barriers.lock().unwrap().take();
        if let Some((entered, release)) = barriers {
            entered.wait().await;
            release.wait().await;
        }
        if self.fail_restart {
            return Err(RuntimeError::Api("simulated restart failure".to_string()));
        }
        self.restarted.lock().unwrap().push(id.to_string());
        Ok(())
    }
}
