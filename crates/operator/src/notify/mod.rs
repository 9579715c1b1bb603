//! Remediation notifications.
//!
//! [`Notifier`] fans an outcome out to every enabled [`NotifyChannel`].
//! Delivery is best-effort: failures are logged and never reach the caller.

pub mod slack;

use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::config::SlackConfig;
use crate::remediation::RemediationOutcome;
use crate::Result;

pub use slack::SlackChannel;

#[async_trait]
pub trait NotifyChannel: Send + Sync {
    fn name(&self) -> &'static str;

    fn enabled(&self) -> bool;

    async fn send(&self, outcome: &RemediationOutcome) -> Result<()>;
}

pub struct Notifier {
    channels: Vec<Arc<dyn NotifyChannel>>,
}

impl Notifier {
    pub fn new(slack: SlackConfig, http: reqwest::Client) -> Self {
        let slack = SlackChannel::new(slack, http);
        if slack.enabled() {
            info!("Slack notifications enabled");
            Self::with_channels(vec![Arc::new(slack)])
        } else {
            warn!("No notification channels configured");
            Self::disabled()
        }
    }

    pub fn with_channels(channels: Vec<Arc<dyn NotifyChannel>>) -> Self {
        Self { channels }
    }

    pub fn disabled() -> Self {
        Self { channels: vec![] }
    }

    pub fn has_channels(&self) -> bool {
        !self.channels.is_empty()
    }

    pub async fn notify(&self, outcome: &RemediationOutcome) {
        if self.channels.is_empty() {
            debug!("No channels configured, skipping notification for {}", outcome.pod);
            return;
        }

        for channel in &self.channels {
            if !channel.enabled() {
                debug!(channel = channel.name(), "Channel disabled, skipping");
                continue;
            }
            match channel.send(outcome).await {
                Ok(()) => info!(
                    channel = channel.name(),
                    "Notification sent for {} namespace {} and pod {}",
                    outcome.alertname,
                    outcome.namespace,
                    outcome.pod
                ),
                Err(e) => error!(
                    channel = channel.name(),
                    error = %e,
                    "Failed to send notification"
                ),
            }
        }
    }
}
