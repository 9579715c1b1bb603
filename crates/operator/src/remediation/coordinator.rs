use futures::FutureExt;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use super::{InFlightGuard, InFlightRegistry, RemediationOutcome, RemediationTask, TaskState, WorkerPool};
use crate::capture::DiagnosticCapturer;
use crate::classifier::{classify_with_rule, ActionClass, CaptureKind};
use crate::kubernetes::{Orchestrator, ReadinessOracle, Remediator};
use crate::metrics::{record_remediation, ALERTS_TOTAL};
use crate::notify::Notifier;
use crate::sources::AlertRecord;
use crate::Result;

/// Turns alert batches into remediation work.
///
/// Remediate-only alerts are handled on the caller's task and reported in the
/// returned outcomes. Capture-bearing alerts are queued on the worker pool and
/// reported only through notifications.
#[derive(Clone)]
pub struct RemediationCoordinator {
    pipeline: Arc<Pipeline>,
    pool: WorkerPool,
    inflight: InFlightRegistry,
}

struct Pipeline {
    readiness: ReadinessOracle,
    remediator: Remediator,
    capturer: Arc<DiagnosticCapturer>,
    notifier: Arc<Notifier>,
    folder_link: String,
}

impl RemediationCoordinator {
    pub fn new(
        orchestrator: Arc<dyn Orchestrator>,
        capturer: Arc<DiagnosticCapturer>,
        notifier: Arc<Notifier>,
        pool: WorkerPool,
        folder_link: impl Into<String>,
    ) -> Self {
        Self {
            pipeline: Arc::new(Pipeline {
                readiness: ReadinessOracle::new(orchestrator.clone()),
                remediator: Remediator::new(orchestrator),
                capturer,
                notifier,
                folder_link: folder_link.into(),
            }),
            pool,
            inflight: InFlightRegistry::new(),
        }
    }

    pub fn inflight(&self) -> &InFlightRegistry {
        &self.inflight
    }

    pub async fn handle(&self, alerts: Vec<AlertRecord>) -> Vec<RemediationOutcome> {
        let mut outcomes = Vec::new();

        for alert in alerts {
            ALERTS_TOTAL
                .with_label_values(&[alert.alert_name.as_str(), alert.instance_name.as_str()])
                .inc();

            let (namespace, name) = (alert.namespace.clone(), alert.instance_name.clone());
            match self.handle_alert(alert).await {
                Ok(Some(outcome)) => outcomes.push(outcome),
                Ok(None) => {}
                Err(e) => {
                    error!("Remediation of {}/{} failed: {}", namespace, name, e);
                    record_remediation("failed");
                }
            }
        }

        outcomes
    }

    async fn handle_alert(&self, alert: AlertRecord) -> Result<Option<RemediationOutcome>> {
        let (action, rule) = classify_with_rule(&alert);
        if action == ActionClass::Ignore {
            debug!(
                rule = rule.unwrap_or("default"),
                "Ignoring alert {} for pod {}", alert.alert_name, alert.instance_name
            );
            record_remediation("ignored");
            return Ok(None);
        }
        info!(
            rule = rule.unwrap_or("default"),
            action = action.dump_type(),
            "Alert {} matched for {}/{}",
            alert.alert_name,
            alert.namespace,
            alert.instance_name
        );

        let Some(guard) = self.inflight.try_acquire(&alert.namespace, &alert.instance_name) else {
            warn!(
                "Remediation already in progress for {}/{}, skipping",
                alert.namespace, alert.instance_name
            );
            record_remediation("duplicate");
            return Ok(None);
        };

        let mut task = RemediationTask::new(alert, action);
        let (namespace, name) = (task.alert.namespace.clone(), task.alert.instance_name.clone());

        if !self.pipeline.readiness.is_ready(&namespace, &name).await? {
            info!("Pod {}/{} is not ready, skipping", namespace, name);
            task.advance(TaskState::Skipped)?;
            record_remediation("not_ready");
            return Ok(None);
        }
        task.advance(TaskState::ReadinessChecked)?;

        match action {
            ActionClass::RemediateOnly => {
                let outcome = self.pipeline.remediate_only(&mut task).await?;
                drop(guard);
                record_remediation("remediated");
                Ok(Some(outcome))
            }
            ActionClass::CaptureThenRemediate { kind } => {
                self.dispatch(task, kind, guard);
                Ok(None)
            }
            ActionClass::Ignore => Ok(None),
        }
    }

    fn dispatch(&self, task: RemediationTask, kind: CaptureKind, guard: InFlightGuard) {
        let pipeline = self.pipeline.clone();
        let (namespace, name) = (task.alert.namespace.clone(), task.alert.instance_name.clone());
        let id = task.id;

        let job = async move {
            let _guard = guard;
            let (namespace, name) = (task.alert.namespace.clone(), task.alert.instance_name.clone());
            match pipeline.capture_then_remediate(task, kind).await {
                Ok(result) => record_remediation(result),
                Err(e) => {
                    error!("Remediation of {}/{} failed: {}", namespace, name, e);
                    record_remediation("failed");
                }
            }
        }
        .boxed();

        match self.pool.submit(job) {
            Ok(()) => {
                info!(task = %id, "Queued {} dump for {}/{}", kind, namespace, name);
                record_remediation("dispatched");
            }
            Err(e) => {
                warn!("Dropping {} dump for {}/{}: {}", kind, namespace, name, e);
                record_remediation("rejected");
            }
        }
    }
}

impl Pipeline {
    async fn remediate_only(&self, task: &mut RemediationTask) -> Result<RemediationOutcome> {
        let (namespace, name) = (task.alert.namespace.clone(), task.alert.instance_name.clone());
        self.remediator.remediate(&namespace, &name).await?;
        task.advance(TaskState::Remediated)?;

        let outcome = task.outcome(Some(self.folder_link.clone()));
        self.notifier.notify(&outcome).await;
        task.advance(TaskState::Notified)?;
        Ok(outcome)
    }

    async fn capture_then_remediate(
        &self,
        mut task: RemediationTask,
        kind: CaptureKind,
    ) -> Result<&'static str> {
        let (namespace, name) = (task.alert.namespace.clone(), task.alert.instance_name.clone());
        task.advance(TaskState::CaptureInProgress)?;

        let link = self.capturer.capture(kind, &namespace, &name).await;

        let result = if self.readiness.is_ready(&namespace, &name).await? {
            self.remediator.remediate(&namespace, &name).await?;
            task.advance(TaskState::Remediated)?;
            "remediated"
        } else {
            info!("Pod {}/{} no longer ready after capture, not deleting", namespace, name);
            "captured"
        };

        let outcome = task.outcome(link);
        self.notifier.notify(&outcome).await;
        task.advance(TaskState::Notified)?;
        Ok(result)
    }
}
