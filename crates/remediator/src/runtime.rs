//! Container runtime gateway.
//!
//! Thin capability wrapper over the Docker Engine API: list containers,
//! inspect one container's health, restart one container. No caching -
//! every decision re-lists and re-inspects so the runtime stays the
//! source of truth.

use std::collections::HashMap;

use async_trait::async_trait;
use bollard::errors::Error as BollardError;
use bollard::models::{ContainerSummary, HealthStatusEnum};
use bollard::query_parameters::{
    InspectContainerOptions, ListContainersOptionsBuilder, RestartContainerOptions,
};
use bollard::{Docker, API_DEFAULT_VERSION};
use thiserror::Error;
use tracing::debug;

/// Timeout for Docker API calls when connecting over a socket path.
const DOCKER_TIMEOUT_SECS: u64 = 120;

/// Errors from the container runtime.
#[derive(Debug, Error)]
pub enum RuntimeError {
    /// The runtime endpoint could not be reached at all.
    #[error("container runtime unavailable: {0}")]
    Unavailable(String),
    /// The runtime was reachable but rejected or failed the call.
    #[error("container runtime error: {0}")]
    Api(String),
}

impl From<BollardError> for RuntimeError {
    fn from(err: BollardError) -> Self {
        match err {
            BollardError::DockerResponseServerError {
                status_code,
                message,
            } => Self::Api(format!("{status_code}: {message}")),
            other => Self::Unavailable(other.to_string()),
        }
    }
}

/// Health of a container as reported by its healthcheck.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HealthStatus {
    /// No health information available (e.g. no healthcheck configured,
    /// or the check has not produced a result yet).
    Unknown,
    /// Healthcheck passing.
    Healthy,
    /// Healthcheck failing.
    Unhealthy,
    /// Container explicitly reports no healthcheck.
    None,
}

impl From<Option<HealthStatusEnum>> for HealthStatus {
    fn from(status: Option<HealthStatusEnum>) -> Self {
        match status {
            Some(HealthStatusEnum::HEALTHY) => Self::Healthy,
            Some(HealthStatusEnum::UNHEALTHY) => Self::Unhealthy,
            Some(HealthStatusEnum::NONE) => Self::None,
            // STARTING and EMPTY carry no verdict yet.
            _ => Self::Unknown,
        }
    }
}

/// A container as seen in the current runtime listing.
///
/// Obtained fresh per decision cycle, never retained across cycles.
#[derive(Debug, Clone)]
pub struct ContainerRef {
    /// Runtime-assigned container ID.
    pub id: String,
    /// Primary container name, without the leading slash.
    pub name: String,
    /// Container labels.
    pub labels: HashMap<String, String>,
}

/// Capability surface the remediation engine needs from the runtime.
#[async_trait]
pub trait ContainerRuntime: Send + Sync {
    /// List all containers, including stopped ones.
    async fn list_containers(&self) -> Result<Vec<ContainerRef>, RuntimeError>;

    /// Inspect one container's healthcheck status.
    async fn inspect_health(&self, id: &str) -> Result<HealthStatus, RuntimeError>;

    /// Restart one container. Not retried here; idempotency of a
    /// restart-while-restarting is runtime-defined.
    async fn restart(&self, id: &str) -> Result<(), RuntimeError>;
}

/// Docker Engine implementation of [`ContainerRuntime`].
#[derive(Debug, Clone)]
pub struct DockerRuntime {
    docker: Docker,
}

impl DockerRuntime {
    /// Connect using the platform-local Docker defaults.
    pub fn connect_local() -> Result<Self, RuntimeError> {
        let docker = Docker::connect_with_local_defaults()
            .map_err(|e| RuntimeError::Unavailable(e.to_string()))?;
        Ok(Self { docker })
    }

    /// Connect to a specific Unix socket path.
    pub fn connect_socket(path: &str) -> Result<Self, RuntimeError> {
        let docker = Docker::connect_with_socket(path, DOCKER_TIMEOUT_SECS, API_DEFAULT_VERSION)
            .map_err(|e| RuntimeError::Unavailable(e.to_string()))?;
        Ok(Self { docker })
    }
}

#[async_trait]
impl ContainerRuntime for DockerRuntime {
    async fn list_containers(&self) -> Result<Vec<ContainerRef>, RuntimeError> {
        let options = ListContainersOptionsBuilder::new().all(true).build();
        let summaries = self.docker.list_containers(Some(options)).await?;

        let mut containers = Vec::with_capacity(summaries.len());
        for summary in summaries {
            match container_ref_from_summary(summary) {
                Some(container) => containers.push(container),
                None => debug!("skipping listed container without id or name"),
            }
        }
        Ok(containers)
    }

    async fn inspect_health(&self, id: &str) -> Result<HealthStatus, RuntimeError> {
        let details = self
            .docker
            .inspect_container(id, None::<InspectContainerOptions>)
            .await?;

        let status = details
            .state
            .and_then(|state| state.health)
            .and_then(|health| health.status);
        Ok(HealthStatus::from(status))
    }

    async fn restart(&self, id: &str) -> Result<(), RuntimeError> {
        self.docker
            .restart_container(id, None::<RestartContainerOptions>)
            .await?;
        Ok(())
    }
}

/// Convert a Docker listing entry into a [`ContainerRef`].
///
/// Docker reports names with a leading slash (`/api`); the engine works
/// with bare names throughout. Entries missing an ID or name are
/// unusable and yield `None`.
fn container_ref_from_summary(summary: ContainerSummary) -> Option<ContainerRef> {
    let id = summary.id?;
    let name = summary
        .names
        .as_ref()
        .and_then(|names| names.first())
        .map(|name| name.trim_start_matches('/').to_string())
        .filter(|name| !name.is_empty())?;

    Some(ContainerRef {
        id,
        name,
        labels: summary.labels.unwrap_or_default(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_strips_leading_slash() {
        let summary = ContainerSummary {
            id: Some("abc123".to_string()),
            names: Some(vec!["/api".to_string()]),
            labels: Some(HashMap::from([(
                "autoheal".to_string(),
                "true".to_string(),
            )])),
            ..ContainerSummary::default()
        };

        let container = container_ref_from_summary(summary).expect("should convert");
        assert_eq!(container.id, "abc123");
        assert_eq!(container.name, "api");
        assert_eq!(container.labels.get("autoheal").map(String::as_str), Some("true"));
    }

    #[test]
    fn test_summary_without_name_is_skipped() {
        let summary = ContainerSummary {
            id: Some("abc123".to_string()),
            names: None,
            ..ContainerSummary::default()
        };
        assert!(container_ref_from_summary(summary).is_none());

        let summary = ContainerSummary {
            id: None,
            names: Some(vec!["/api".to_string()]),
            ..ContainerSummary::default()
        };
        assert!(container_ref_from_summary(summary).is_none());
    }

    #[test]
    fn test_summary_without_labels_gets_empty_map() {
        let summary = ContainerSummary {
            id: Some("abc123".to_string()),
            names: Some(vec!["/worker".to_string()]),
            labels: None,
            ..ContainerSummary::default()
        };

        let container = container_ref_from_summary(summary).expect("should convert");
        assert!(container.labels.is_empty());
    }

    #[test]
    fn test_health_status_mapping() {
        assert_eq!(
            HealthStatus::from(Some(HealthStatusEnum::HEALTHY)),
            HealthStatus::Healthy
        );
        assert_eq!(
            HealthStatus::from(Some(HealthStatusEnum::UNHEALTHY)),
            HealthStatus::Unhealthy
        );
        assert_eq!(
            HealthStatus::from(Some(HealthStatusEnum::NONE)),
            HealthStatus::None
        );
        assert_eq!(
            HealthStatus::from(Some(HealthStatusEnum::STARTING)),
            HealthStatus::Unknown
        );
        assert_eq!(HealthStatus::from(None), HealthStatus::Unknown);
    }
}
