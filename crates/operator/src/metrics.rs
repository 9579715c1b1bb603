use lazy_static::lazy_static;
use prometheus::{Encoder, IntCounterVec, Opts, Registry, TextEncoder};

lazy_static! {
    pub static ref REGISTRY: Registry = Registry::new();
    pub static ref REQUESTS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new(
            "selfhealing_api_requests_total",
            "Total number of requests to selfhealing API"
        ),
        &["endpoint"]
    )
    .unwrap();
    pub static ref ALERTS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new(
            "selfhealing_api_alerts_total",
            "Total number of alert triggers in selfhealing API"
        ),
        &["alertname", "pod_name"]
    )
    .unwrap();
    pub static ref REMEDIATIONS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new(
            "selfhealing_remediations_total",
            "Remediation tasks by result"
        ),
        &["result"]
    )
    .unwrap();
}

/// Registers every collector with [`REGISTRY`]. Each one is attempted on its
/// own; a collector that is already registered counts as success, so the
/// call is idempotent. The first other failure is returned.
pub fn register_metrics() -> prometheus::Result<()> {
    let collectors: Vec<Box<dyn prometheus::core::Collector>> = vec![
        Box::new(REQUESTS_TOTAL.clone()),
        Box::new(ALERTS_TOTAL.clone()),
        Box::new(REMEDIATIONS_TOTAL.clone()),
    ];

    let mut first_error = None;
    for collector in collectors {
        match REGISTRY.register(collector) {
            Ok(()) | Err(prometheus::Error::AlreadyReg) => {}
            Err(e) => {
                first_error.get_or_insert(e);
            }
        }
    }
    first_error.map_or(Ok(()), Err)
}

pub fn record_remediation(result: &str) {
    REMEDIATIONS_TOTAL.with_label_values(&[result]).inc();
}

// Function to gather metrics for exposition
pub fn gather_metrics() -> crate::Result<String> {
    let mut buffer = vec![];
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    encoder
        .encode(&metric_families, &mut buffer)
        .map_err(|e| crate::Error::Internal(format!("failed to encode metrics: {}", e)))?;
    String::from_utf8(buffer)
        .map_err(|e| crate::Error::Internal(format!("metrics are not valid UTF-8: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gathered_output_contains_counters() {
        let _ = register_metrics();
        ALERTS_TOTAL.with_label_values(&["pod cpu high", "svc-7"]).inc();
        record_remediation("remediated");

        let text = gather_metrics().unwrap();
        assert!(text.contains("selfhealing_api_alerts_total"));
        assert!(text.contains("selfhealing_remediations_total"));
    }

    #[test]
    fn registration_survives_an_already_registered_collector() {
        let _ = REGISTRY.register(Box::new(REQUESTS_TOTAL.clone()));

        assert!(register_metrics().is_ok());
        assert!(register_metrics().is_ok());

        REQUESTS_TOTAL.with_label_values(&["/"]).inc();
        ALERTS_TOTAL.with_label_values(&["pod memory high", "svc-9"]).inc();
        record_remediation("captured");
        let names: Vec<String> = REGISTRY
            .gather()
            .iter()
            .map(|family| family.get_name().to_string())
            .collect();
        for expected in [
            "selfhealing_api_requests_total",
            "selfhealing_api_alerts_total",
            "selfhealing_remediations_total",
        ] {
            assert!(names.iter().any(|n| n == expected), "{} not registered", expected);
        }
    }
}
