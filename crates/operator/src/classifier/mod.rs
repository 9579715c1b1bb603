//! Alert classification.
//!
//! Maps an [`AlertRecord`] to the action the coordinator should take. Rules
//! are evaluated top-down and the first rule that returns a decision wins.
//! Keyword matching is case-sensitive substring matching.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::sources::{AlertRecord, Priority};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CaptureKind {
    Thread,
    Heap,
}

impl CaptureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            CaptureKind::Thread => "thread",
            CaptureKind::Heap => "heap",
        }
    }
}

impl fmt::Display for CaptureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionClass {
    Ignore,
    RemediateOnly,
    CaptureThenRemediate { kind: CaptureKind },
}

impl ActionClass {
    /// Value reported as `dump_type` in outcomes.
    pub fn dump_type(&self) -> &'static str {
        match self {
            ActionClass::CaptureThenRemediate { kind } => kind.as_str(),
            _ => "NA",
        }
    }
}

pub const PAYMENT_TEAM: &str = "payment";
pub const PAYMENT_LATENCY_ALERT: &str = "p99 Level Accept API RT";
pub const POD_KEYWORD: &str = "pod";
pub const ACQUIRING_KEYWORD: &str = "acquiring";
pub const CPU_KEYWORD: &str = "cpu";
pub const MEMORY_KEYWORD: &str = "memory";

/// A named predicate that either decides the action or defers to the next rule.
pub struct Rule {
    pub name: &'static str,
    decide: fn(&AlertRecord) -> Option<ActionClass>,
}

impl Rule {
    pub fn apply(&self, alert: &AlertRecord) -> Option<ActionClass> {
        (self.decide)(alert)
    }
}

pub static RULES: &[Rule] = &[
    Rule {
        name: "not-eligible",
        decide: not_eligible,
    },
    Rule {
        name: "payment-latency",
        decide: payment_latency,
    },
    Rule {
        name: "acquiring-pod",
        decide: acquiring_pod,
    },
    Rule {
        name: "pod-resource",
        decide: pod_resource,
    },
];

fn not_eligible(alert: &AlertRecord) -> Option<ActionClass> {
    (alert.priority != Priority::P1 || !alert.self_heal_enabled).then_some(ActionClass::Ignore)
}

fn payment_latency(alert: &AlertRecord) -> Option<ActionClass> {
    (alert.team == PAYMENT_TEAM && alert.alert_name == PAYMENT_LATENCY_ALERT)
        .then_some(ActionClass::RemediateOnly)
}

fn acquiring_pod(alert: &AlertRecord) -> Option<ActionClass> {
    if !alert.alert_name.contains(POD_KEYWORD) || !alert.instance_name.contains(ACQUIRING_KEYWORD) {
        return None;
    }
    if alert.alert_name.contains(CPU_KEYWORD) || alert.alert_name.contains(MEMORY_KEYWORD) {
        Some(ActionClass::RemediateOnly)
    } else {
        Some(ActionClass::Ignore)
    }
}

fn pod_resource(alert: &AlertRecord) -> Option<ActionClass> {
    if !alert.alert_name.contains(POD_KEYWORD) {
        return None;
    }
    let decision = if alert.alert_name.contains(CPU_KEYWORD) {
        ActionClass::CaptureThenRemediate {
            kind: CaptureKind::Thread,
        }
    } else if alert.alert_name.contains(MEMORY_KEYWORD) {
        ActionClass::CaptureThenRemediate {
            kind: CaptureKind::Heap,
        }
    } else {
        ActionClass::Ignore
    };
    Some(decision)
}

/// Returns the matching rule's name alongside the decision, `None` for the fallback.
pub fn classify_with_rule(alert: &AlertRecord) -> (ActionClass, Option<&'static str>) {
    RULES
        .iter()
        .find_map(|rule| rule.apply(alert).map(|class| (class, Some(rule.name))))
        .unwrap_or((ActionClass::Ignore, None))
}

pub fn classify(alert: &AlertRecord) -> ActionClass {
    classify_with_rule(alert).0
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn alert(name: &str, priority: &str, pod: &str, team: &str, self_heal: &str) -> AlertRecord {
        let mut labels = HashMap::new();
        labels.insert("alertname".to_string(), name.to_string());
        labels.insert("priority".to_string(), priority.to_string());
        labels.insert("pod".to_string(), pod.to_string());
        labels.insert("techteam".to_string(), team.to_string());
        labels.insert("self_healing".to_string(), self_heal.to_string());
        AlertRecord::from_labels(labels)
    }

    const THREAD: ActionClass = ActionClass::CaptureThenRemediate {
        kind: CaptureKind::Thread,
    };
    const HEAP: ActionClass = ActionClass::CaptureThenRemediate {
        kind: CaptureKind::Heap,
    };

    #[test]
    fn non_p1_or_disabled_is_ignored() {
        for priority in ["P0", "P2", "P3", "p1", ""] {
            let a = alert("pod cpu high", priority, "svc-7", "payment", "true");
            assert_eq!(classify(&a), ActionClass::Ignore, "priority {:?}", priority);
        }
        for flag in ["false", "True", ""] {
            let a = alert("pod cpu high", "P1", "svc-7", "payment", flag);
            assert_eq!(classify(&a), ActionClass::Ignore, "self_healing {:?}", flag);
        }
    }

    #[test]
    fn payment_latency_is_remediated_only() {
        let a = alert(PAYMENT_LATENCY_ALERT, "P1", "accept-api-1", "payment", "true");
        assert_eq!(classify_with_rule(&a), (ActionClass::RemediateOnly, Some("payment-latency")));

        // exact match on both the team and the alert name
        let a = alert("p99 level accept api rt", "P1", "accept-api-1", "payment", "true");
        assert_eq!(classify(&a), ActionClass::Ignore);
        let a = alert(PAYMENT_LATENCY_ALERT, "P1", "accept-api-1", "Payment", "true");
        assert_eq!(classify(&a), ActionClass::Ignore);
    }

    #[test]
    fn acquiring_pods_are_never_captured() {
        let a = alert("pod cpu high", "P1", "acquiring-svc-7", "acq", "true");
        assert_eq!(classify_with_rule(&a), (ActionClass::RemediateOnly, Some("acquiring-pod")));

        let a = alert("pod memory high", "P1", "acquiring-svc-7", "acq", "true");
        assert_eq!(classify(&a), ActionClass::RemediateOnly);

        let a = alert("pod restarts", "P1", "acquiring-svc-7", "acq", "true");
        assert_eq!(classify_with_rule(&a), (ActionClass::Ignore, Some("acquiring-pod")));
    }

    #[test]
    fn pod_resource_alerts_capture() {
        assert_eq!(classify(&alert("pod cpu high", "P1", "svc-7", "t", "true")), THREAD);
        assert_eq!(classify(&alert("pod memory high", "P1", "svc-7", "t", "true")), HEAP);
        // cpu is checked before memory
        assert_eq!(classify(&alert("pod cpu memory", "P1", "svc-7", "t", "true")), THREAD);
        assert_eq!(classify(&alert("pod restarts", "P1", "svc-7", "t", "true")), ActionClass::Ignore);
    }

    #[test]
    fn keyword_matching_is_case_sensitive() {
        assert_eq!(classify(&alert("Pod cpu high", "P1", "svc-7", "t", "true")), ActionClass::Ignore);
        assert_eq!(classify(&alert("pod CPU high", "P1", "svc-7", "t", "true")), ActionClass::Ignore);
        assert_eq!(classify(&alert("pod Memory high", "P1", "svc-7", "t", "true")), ActionClass::Ignore);
        // "Acquiring" does not trigger the acquiring rule, so the pod is captured
        assert_eq!(classify(&alert("pod cpu high", "P1", "Acquiring-svc", "t", "true")), THREAD);
        // substrings anywhere in the name match
        assert_eq!(classify(&alert("HighpodcpuUsage", "P1", "svc-7", "t", "true")), THREAD);
    }

    #[test]
    fn unrelated_alerts_fall_through() {
        let a = alert("node disk full", "P1", "svc-7", "t", "true");
        assert_eq!(classify_with_rule(&a), (ActionClass::Ignore, None));
    }

    #[test]
    fn classification_is_total_and_deterministic() {
        let names = ["pod cpu", "pod memory", "pod", "cpu", PAYMENT_LATENCY_ALERT, ""];
        let pods = ["acquiring-1", "svc-1", ""];
        let teams = ["payment", "other"];
        let priorities = ["P0", "P1", "P2", "P3"];
        let flags = ["true", "false"];

        for n in names {
            for p in pods {
                for t in teams {
                    for pr in priorities {
                        for f in flags {
                            let a = alert(n, pr, p, t, f);
                            let first = classify(&a);
                            assert_eq!(first, classify(&a));
                            if pr != "P1" || f != "true" {
                                assert_eq!(first, ActionClass::Ignore);
                            }
                        }
                    }
                }
            }
        }
    }

    #[test]
    fn dump_type_labels() {
        assert_eq!(ActionClass::RemediateOnly.dump_type(), "NA");
        assert_eq!(ActionClass::Ignore.dump_type(), "NA");
        assert_eq!(THREAD.dump_type(), "thread");
        assert_eq!(HEAP.dump_type(), "heap");
    }
}
