use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use tracing::warn;

use super::AlertRecord;

// AlertManager webhook payload structures. Only `alerts[].labels` is
// consumed; the envelope fields are optional so hand-crafted payloads work.
// Alerts are kept as raw JSON so one malformed entry cannot reject the batch.
#[derive(Debug, Deserialize, Serialize)]
pub struct AlertManagerWebhook {
    #[serde(default)]
    pub receiver: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    pub alerts: Vec<Value>,
    #[serde(rename = "groupKey", default)]
    pub group_key: Option<String>,
    #[serde(default)]
    pub version: Option<String>,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct AlertManagerAlert {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub labels: HashMap<String, Value>,
    #[serde(default)]
    pub annotations: HashMap<String, Value>,
    #[serde(default)]
    pub fingerprint: Option<String>,
}

impl AlertManagerAlert {
    /// Label values that are not strings are dropped, so they can never
    /// satisfy a label match.
    pub fn string_labels(self) -> HashMap<String, String> {
        self.labels
            .into_iter()
            .filter_map(|(key, value)| match value {
                Value::String(s) => Some((key, s)),
                _ => None,
            })
            .collect()
    }
}

impl AlertManagerWebhook {
    /// Entries that are not alert objects are logged and skipped.
    pub fn into_records(self) -> Vec<AlertRecord> {
        self.alerts
            .into_iter()
            .enumerate()
            .filter_map(|(index, raw)| match serde_json::from_value::<AlertManagerAlert>(raw) {
                Ok(alert) => Some(AlertRecord::from_labels(alert.string_labels())),
                Err(e) => {
                    warn!("Skipping malformed alert at index {}: {}", index, e);
                    None
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_full_alertmanager_payload() {
        let payload = json!({
            "receiver": "selfheal",
            "status": "firing",
            "groupKey": "{}:{alertname=\"pod cpu high\"}",
            "version": "4",
            "externalURL": "http://alertmanager:9093",
            "alerts": [{
                "status": "firing",
                "labels": {
                    "alertname": "pod cpu high",
                    "priority": "P1",
                    "pod": "svc-7",
                    "techteam": "checkout",
                    "self_healing": "true"
                },
                "annotations": {"summary": "cpu > 90%"},
                "startsAt": "2024-05-01T10:00:00Z",
                "fingerprint": "abc123"
            }]
        });

        let webhook: AlertManagerWebhook = serde_json::from_value(payload).unwrap();
        let records = webhook.into_records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].alert_name, "pod cpu high");
        assert_eq!(records[0].instance_name, "svc-7");
        assert_eq!(records[0].namespace, "prod");
        assert!(records[0].self_heal_enabled);
    }

    #[test]
    fn minimal_payload_only_needs_labels() {
        let webhook: AlertManagerWebhook =
            serde_json::from_value(json!({"alerts": [{"labels": {"alertname": "x"}}, {}]})).unwrap();
        let records = webhook.into_records();
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].alert_name, "");
    }

    #[test]
    fn non_string_labels_are_dropped() {
        let webhook: AlertManagerWebhook = serde_json::from_value(json!({"alerts": [{
            "labels": {
                "alertname": "pod cpu high",
                "priority": "P1",
                "pod_name": "acquiring-1",
                "self_healing": true,
                "replicas": 3
            }
        }]}))
        .unwrap();

        let records = webhook.into_records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].instance_name, "acquiring-1");
        assert!(!records[0].self_heal_enabled);
        assert_eq!(records[0].label("replicas"), None);
    }

    #[test]
    fn malformed_entries_do_not_hide_the_rest() {
        let webhook: AlertManagerWebhook = serde_json::from_value(json!({"alerts": [
            "not-an-alert",
            {"labels": "not-a-map"},
            {"labels": {"alertname": "pod memory high", "pod": "svc-9"}}
        ]}))
        .unwrap();

        let records = webhook.into_records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].instance_name, "svc-9");
    }

    #[test]
    fn missing_alerts_is_rejected() {
        assert!(serde_json::from_value::<AlertManagerWebhook>(json!({"receiver": "x"})).is_err());
    }
}
