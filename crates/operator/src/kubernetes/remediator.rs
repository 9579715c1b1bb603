use std::sync::Arc;
use tracing::info;

use super::Orchestrator;
use crate::{Error, Result};

/// Deletes pods and relies on their controller to reschedule them.
#[derive(Clone)]
pub struct Remediator {
    orchestrator: Arc<dyn Orchestrator>,
}

impl Remediator {
    pub fn new(orchestrator: Arc<dyn Orchestrator>) -> Self {
        Self { orchestrator }
    }

    pub async fn remediate(&self, namespace: &str, name: &str) -> Result<()> {
        self.orchestrator
            .delete_pod(namespace, name)
            .await
            .map_err(|e| match e {
                Error::Remediation(_) => e,
                other => Error::Remediation(other.to_string()),
            })?;
        info!("Terminated pod {}/{}", namespace, name);
        Ok(())
    }
}
