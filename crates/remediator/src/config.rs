//! Engine configuration and the static alert routing table.
//!
//! Both are built once at startup and read-only afterwards; no
//! scattered environment lookups in the decision paths.

use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

/// Default label key a container must carry with value `"true"` to opt
/// in to automated restarts.
pub const DEFAULT_ALLOWED_LABEL: &str = "autoheal";

/// Default consecutive-unhealthy observations before an auto-restart.
pub const DEFAULT_UNHEALTHY_THRESHOLD: u32 = 3;

/// Default seconds between health poll passes.
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 20;

/// Immutable engine configuration, constructed once in `main`.
#[derive(Debug, Clone)]
pub struct RemediatorConfig {
    /// Label key checked by the safety gate.
    pub allowed_label: String,
    /// Consecutive unhealthy observations that trip an auto-restart.
    pub unhealthy_threshold: u32,
    /// Interval between health poll passes.
    pub poll_interval: Duration,
}

impl Default for RemediatorConfig {
    fn default() -> Self {
        Self {
            allowed_label: DEFAULT_ALLOWED_LABEL.to_string(),
            unhealthy_threshold: DEFAULT_UNHEALTHY_THRESHOLD,
            poll_interval: Duration::from_secs(DEFAULT_POLL_INTERVAL_SECS),
        }
    }
}

/// Static mapping from alert name to the containers to restart.
///
/// Keys are exact alert names; values are ordered target lists. Unknown
/// alert names resolve to no targets, which means "no remediation
/// defined" rather than an error.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(transparent)]
pub struct RoutingTable {
    routes: HashMap<String, Vec<String>>,
}

impl RoutingTable {
    /// Built-in routes matching the alerts this agent ships rules for.
    pub fn builtin() -> Self {
        let mut routes = HashMap::new();
        routes.insert("TargetDown".to_string(), vec!["api".to_string()]);
        routes.insert("ApiHighErrorRate".to_string(), vec!["api".to_string()]);
        Self { routes }
    }

    /// Load a routing table from a JSON file of the form
    /// `{"AlertName": ["container", ...], ...}`.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read routes file: {}", path.display()))?;
        Self::from_json(&content)
            .with_context(|| format!("Failed to parse routes file: {}", path.display()))
    }

    /// Parse a routing table from a JSON string.
    pub fn from_json(json: &str) -> Result<Self> {
        let table: Self = serde_json::from_str(json)?;
        Ok(table)
    }

    /// Resolve an alert name to its remediation targets, in order.
    ///
    /// Unknown names yield an empty slice.
    pub fn resolve_targets(&self, alert_name: &str) -> &[String] {
        self.routes
            .get(alert_name)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Number of routed alert names.
    pub fn len(&self) -> usize {
        self.routes.len()
    }

    /// Whether the table has no routes at all.
    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}
