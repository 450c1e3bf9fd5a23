//! Alertmanager webhook payload types.
//!
//! Reference: <https://prometheus.io/docs/alerting/latest/configuration/#webhook_config>
//!
//! Deserialization is deliberately lenient: Alertmanager's webhook is
//! fire-and-forget, so a body with missing fields (including a missing
//! `alerts` list) is treated as an empty notification, not an error.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Alertmanager webhook payload.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AlertmanagerPayload {
    /// Version of the payload format
    pub version: String,
    /// Unique identifier for this group of alerts
    pub group_key: String,
    /// Status: "firing" or "resolved"
    pub status: String,
    /// Receiver that matched this alert
    pub receiver: String,
    /// Labels common to all alerts in this group
    pub group_labels: HashMap<String, String>,
    /// Labels common to all alerts (may include group labels)
    pub common_labels: HashMap<String, String>,
    /// External URL for Alertmanager
    #[serde(rename = "externalURL")]
    pub external_url: String,
    /// List of alerts in this notification
    pub alerts: Vec<AlertmanagerAlert>,
}

/// Individual alert from Alertmanager.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AlertmanagerAlert {
    /// Status: "firing" or "resolved"
    pub status: String,
    /// Alert labels
    pub labels: HashMap<String, String>,
    /// Alert annotations
    pub annotations: HashMap<String, String>,
    /// When the alert started firing
    pub starts_at: Option<DateTime<Utc>>,
    /// When the alert was resolved (if resolved)
    pub ends_at: Option<DateTime<Utc>>,
    /// Unique fingerprint for this alert
    pub fingerprint: String,
}

impl AlertmanagerAlert {
    /// Get the alert name.
    #[must_use]
    pub fn name(&self) -> &str {
        self.labels
            .get("alertname")
            .map_or("unknown", String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_body_parses() {
        let payload: AlertmanagerPayload = serde_json::from_str(
            r#"{"alerts":[{"labels":{"alertname":"TargetDown"}}]}"#,
        )
        .expect("should parse");

        assert_eq!(payload.alerts.len(), 1);
        assert_eq!(payload.alerts[0].name(), "TargetDown");
    }

    #[test]
    fn test_missing_alerts_is_empty_list() {
        let payload: AlertmanagerPayload = serde_json::from_str("{}").expect("should parse");
        assert!(payload.alerts.is_empty());
    }

    #[test]
    fn test_alert_without_alertname() {
        let payload: AlertmanagerPayload =
            serde_json::from_str(r#"{"alerts":[{"labels":{"severity":"critical"}}]}"#)
                .expect("should parse");
        assert_eq!(payload.alerts[0].name(), "unknown");
    }

    #[test]
    fn test_full_alertmanager_body() {
        let payload: AlertmanagerPayload = serde_json::from_str(
            r#"{
                "version": "4",
                "groupKey": "{}:{alertname=\"TargetDown\"}",
                "status": "firing",
                "receiver": "remediator",
                "groupLabels": {"alertname": "TargetDown"},
                "commonLabels": {"alertname": "TargetDown", "severity": "critical"},
                "externalURL": "http://alertmanager:9093",
                "alerts": [{
                    "status": "firing",
                    "labels": {"alertname": "TargetDown", "instance": "api:3000"},
                    "annotations": {"summary": "api is down"},
                    "startsAt": "2024-01-15T10:00:00Z",
                    "fingerprint": "d41d8cd98f00b204"
                }]
            }"#,
        )
        .expect("should parse");

        assert_eq!(payload.status, "firing");
        assert_eq!(payload.alerts[0].name(), "TargetDown");
        assert!(payload.alerts[0].starts_at.is_some());
    }
}
