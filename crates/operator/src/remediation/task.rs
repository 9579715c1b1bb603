use serde::Serialize;
use std::fmt;
use uuid::Uuid;

use crate::classifier::ActionClass;
use crate::sources::AlertRecord;
use crate::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskState {
    Created,
    ReadinessChecked,
    CaptureInProgress,
    Remediated,
    Notified,
    Skipped,
}

impl TaskState {
    pub fn can_transition_to(self, next: TaskState) -> bool {
        use TaskState::*;
        matches!(
            (self, next),
            (Created, ReadinessChecked)
                | (Created, Skipped)
                | (ReadinessChecked, CaptureInProgress)
                | (ReadinessChecked, Remediated)
                | (ReadinessChecked, Skipped)
                | (CaptureInProgress, Remediated)
                | (CaptureInProgress, Notified)
                | (CaptureInProgress, Skipped)
                | (Remediated, Notified)
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, TaskState::Notified | TaskState::Skipped)
    }
}

impl fmt::Display for TaskState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskState::Created => write!(f, "Created"),
            TaskState::ReadinessChecked => write!(f, "ReadinessChecked"),
            TaskState::CaptureInProgress => write!(f, "CaptureInProgress"),
            TaskState::Remediated => write!(f, "Remediated"),
            TaskState::Notified => write!(f, "Notified"),
            TaskState::Skipped => write!(f, "Skipped"),
        }
    }
}

/// One alert moving through the remediation pipeline. Owned by whichever
/// task is executing it.
#[derive(Debug)]
pub struct RemediationTask {
    pub id: Uuid,
    pub alert: AlertRecord,
    pub action: ActionClass,
    state: TaskState,
}

impl RemediationTask {
    pub fn new(alert: AlertRecord, action: ActionClass) -> Self {
        Self {
            id: Uuid::new_v4(),
            alert,
            action,
            state: TaskState::Created,
        }
    }

    pub fn state(&self) -> TaskState {
        self.state
    }

    pub fn advance(&mut self, next: TaskState) -> Result<()> {
        if !self.state.can_transition_to(next) {
            return Err(Error::Internal(format!(
                "illegal task transition {} -> {} for {}/{}",
                self.state, next, self.alert.namespace, self.alert.instance_name
            )));
        }
        self.state = next;
        Ok(())
    }

    pub fn outcome(&self, file_link: Option<String>) -> RemediationOutcome {
        RemediationOutcome {
            alertname: self.alert.alert_name.clone(),
            pod: self.alert.instance_name.clone(),
            namespace: self.alert.namespace.clone(),
            techteam: self.alert.team.clone(),
            priority: self.alert.priority_label.clone(),
            dump_type: self.action.dump_type().to_string(),
            file_link,
        }
    }
}

/// Returned from `POST /alert` and sent to notification channels.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RemediationOutcome {
    pub alertname: String,
    pub pod: String,
    pub namespace: String,
    pub techteam: String,
    pub priority: String,
    pub dump_type: String,
    pub file_link: Option<String>,
}

impl RemediationOutcome {
    pub fn captured(&self) -> bool {
        self.dump_type != "NA"
    }
}
