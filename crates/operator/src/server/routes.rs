use axum::{
    extract::State,
    response::{IntoResponse, Response},
    Json,
};
use http::{header, StatusCode};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{error, info};

use super::Server;
use crate::{
    metrics::{gather_metrics, REQUESTS_TOTAL},
    remediation::RemediationOutcome,
    sources::AlertManagerWebhook,
};

pub const WELCOME_MESSAGE: &str = "Welcome to PG2.0 selfhealing API.";

pub async fn welcome() -> Json<Value> {
    REQUESTS_TOTAL.with_label_values(&["/"]).inc();
    Json(json!({ "message": WELCOME_MESSAGE }))
}

pub async fn receive_alerts(
    State(server): State<Arc<Server>>,
    Json(payload): Json<AlertManagerWebhook>,
) -> Json<Vec<RemediationOutcome>> {
    REQUESTS_TOTAL.with_label_values(&["/alert"]).inc();

    let alerts = payload.into_records();
    info!("Received {} alerts", alerts.len());

    let outcomes = server.coordinator.handle(alerts).await;
    info!("Returning {} synchronous outcomes", outcomes.len());
    Json(outcomes)
}

pub async fn metrics() -> Response {
    match gather_metrics() {
        Ok(body) => (
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            body,
        )
            .into_response(),
        Err(e) => {
            error!("Failed to gather metrics: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}
