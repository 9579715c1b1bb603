mod routes;

use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::{remediation::RemediationCoordinator, Error, Result};

pub use routes::WELCOME_MESSAGE;

pub struct Server {
    coordinator: RemediationCoordinator,
}

impl Server {
    pub fn new(coordinator: RemediationCoordinator) -> Self {
        Self { coordinator }
    }

    pub fn build_router(self) -> Router {
        let state = Arc::new(self);

        Router::new()
            .route("/", get(routes::welcome))
            .route("/alert", post(routes::receive_alerts))
            .route("/metrics", get(routes::metrics))
            .layer(TraceLayer::new_for_http())
            .with_state(state)
    }

    pub async fn start(self, addr: &str) -> Result<()> {
        let listener = TcpListener::bind(addr).await?;
        info!("Listening on {}", listener.local_addr()?);
        axum::serve(listener, self.build_router())
            .await
            .map_err(|e| Error::Internal(format!("server error: {}", e)))
    }
}
