pub mod client;
pub mod readiness;
pub mod remediator;

use async_trait::async_trait;
use std::path::Path;

use crate::Result;

pub use client::KubeClient;
pub use readiness::ReadinessOracle;
pub use remediator::Remediator;

/// Snapshot of the pod fields readiness depends on.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PodState {
    pub phase: Option<String>,
    /// One entry per declared container. A container without a reported
    /// status is `false`.
    pub containers_ready: Vec<bool>,
}

impl PodState {
    pub fn running(containers_ready: Vec<bool>) -> Self {
        Self {
            phase: Some("Running".to_string()),
            containers_ready,
        }
    }

    pub fn is_ready(&self) -> bool {
        self.phase.as_deref() == Some("Running")
            && !self.containers_ready.is_empty()
            && self.containers_ready.iter().all(|ready| *ready)
    }
}

/// Control-plane operations on pods.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Orchestrator: Send + Sync {
    /// Returns `Ok(None)` when the pod does not exist. Every other failure is
    /// an error.
    async fn get_pod(&self, namespace: &str, name: &str) -> Result<Option<PodState>>;

    async fn delete_pod(&self, namespace: &str, name: &str) -> Result<()>;
}

/// Commands run inside a pod's default container.
#[async_trait]
pub trait PodExec: Send + Sync {
    /// Runs `command` and writes its stdout to `dest`.
    async fn exec_to_file(
        &self,
        namespace: &str,
        name: &str,
        command: Vec<String>,
        dest: &Path,
    ) -> Result<()>;

    /// Runs `command`, discarding its output.
    async fn exec(&self, namespace: &str, name: &str, command: Vec<String>) -> Result<()>;

    /// Copies `remote_path` from the pod to `dest`.
    async fn copy_from_pod(
        &self,
        namespace: &str,
        name: &str,
        remote_path: &str,
        dest: &Path,
    ) -> Result<()>;
}
