use std::sync::Arc;
use tracing::{error, info};

use super::Orchestrator;
use crate::Result;

/// Answers whether a pod is safe to remediate.
#[derive(Clone)]
pub struct ReadinessOracle {
    orchestrator: Arc<dyn Orchestrator>,
}

impl ReadinessOracle {
    pub fn new(orchestrator: Arc<dyn Orchestrator>) -> Self {
        Self { orchestrator }
    }

    /// `Ok(false)` when the pod is missing or not fully ready; lookup failures
    /// are propagated so callers never act on an unknown state.
    pub async fn is_ready(&self, namespace: &str, name: &str) -> Result<bool> {
        match self.orchestrator.get_pod(namespace, name).await {
            Ok(Some(state)) => Ok(state.is_ready()),
            Ok(None) => {
                info!("Pod {}/{} not found.", namespace, name);
                Ok(false)
            }
            Err(e) => {
                error!("Error checking pod status for {}/{}: {}", namespace, name, e);
                Err(e)
            }
        }
    }
}
