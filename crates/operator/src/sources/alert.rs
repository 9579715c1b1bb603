use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

pub const DEFAULT_NAMESPACE: &str = "prod";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Priority {
    P0,
    P1,
    P2,
    P3,
    Unknown,
}

impl From<&str> for Priority {
    fn from(s: &str) -> Self {
        match s {
            "P0" => Priority::P0,
            "P1" => Priority::P1,
            "P2" => Priority::P2,
            "P3" => Priority::P3,
            _ => Priority::Unknown,
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Priority::P0 => write!(f, "P0"),
            Priority::P1 => write!(f, "P1"),
            Priority::P2 => write!(f, "P2"),
            Priority::P3 => write!(f, "P3"),
            Priority::Unknown => write!(f, "unknown"),
        }
    }
}

/// Normalized view of one alert from the monitoring system.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlertRecord {
    pub alert_name: String,
    pub priority: Priority,
    /// Raw `priority` label, echoed back in outcomes.
    pub priority_label: String,
    pub instance_name: String,
    pub namespace: String,
    pub team: String,
    pub self_heal_enabled: bool,
    labels: HashMap<String, String>,
}

impl AlertRecord {
    /// Builds a record from Alertmanager labels.
    ///
    /// The instance is read from `pod_name` falling back to `pod`, the
    /// namespace from `namespace` then `kubernetes_namespace` then `prod`.
    /// Self-healing is enabled only by the exact label value `"true"`.
    pub fn from_labels(labels: HashMap<String, String>) -> Self {
        let get = |key: &str| labels.get(key).cloned();

        let priority_label = get("priority").unwrap_or_default();
        let namespace = get("namespace")
            .or_else(|| get("kubernetes_namespace"))
            .unwrap_or_else(|| DEFAULT_NAMESPACE.to_string());

        Self {
            alert_name: get("alertname").unwrap_or_default(),
            priority: Priority::from(priority_label.as_str()),
            priority_label,
            instance_name: get("pod_name").or_else(|| get("pod")).unwrap_or_default(),
            namespace,
            team: get("techteam").unwrap_or_default(),
            self_heal_enabled: labels.get("self_healing").map(String::as_str) == Some("true"),
            labels,
        }
    }

    pub fn label(&self, key: &str) -> Option<&str> {
        self.labels.get(key).map(String::as_str)
    }

    pub fn labels(&self) -> &HashMap<String, String> {
        &self.labels
    }
}
