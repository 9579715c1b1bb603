//! Slack incoming-webhook channel using Block Kit.

use async_trait::async_trait;
use serde::Serialize;
use tracing::debug;

use super::NotifyChannel;
use crate::config::SlackConfig;
use crate::remediation::RemediationOutcome;
use crate::{Error, Result};

const USERNAME: &str = "Pod terminated Status";
const ICON_EMOJI: &str = ":alert:";

#[derive(Debug, Serialize)]
pub struct SlackMessage {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub channel: Option<String>,
    pub username: &'static str,
    pub icon_emoji: &'static str,
    pub blocks: Vec<Block>,
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Block {
    Header {
        text: Text,
    },
    Section {
        #[serde(skip_serializing_if = "Option::is_none")]
        text: Option<Text>,
        #[serde(skip_serializing_if = "Option::is_none")]
        fields: Option<Vec<Text>>,
        #[serde(skip_serializing_if = "Option::is_none")]
        accessory: Option<Button>,
    },
}

#[derive(Debug, Serialize)]
pub struct Text {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub text: String,
}

impl Text {
    fn plain(text: impl Into<String>) -> Self {
        Self {
            kind: "plain_text",
            text: text.into(),
        }
    }

    fn mrkdwn(text: impl Into<String>) -> Self {
        Self {
            kind: "mrkdwn",
            text: text.into(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct Button {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub text: Text,
    pub value: &'static str,
    pub url: String,
    pub action_id: &'static str,
}

pub struct SlackChannel {
    config: SlackConfig,
    client: reqwest::Client,
}

impl SlackChannel {
    pub fn new(config: SlackConfig, client: reqwest::Client) -> Self {
        Self { config, client }
    }

    pub fn format_message(&self, outcome: &RemediationOutcome) -> SlackMessage {
        let mut blocks = vec![
            Block::Header {
                text: Text::plain(format!(
                    "Pod terminated || techteam: {} || severity: info",
                    outcome.techteam
                )),
            },
            Block::Section {
                text: None,
                fields: Some(vec![
                    Text::mrkdwn(format!("*Pod Name:*\n`{}`", outcome.pod)),
                    Text::mrkdwn(format!("*Alertname Name:*\n{}", outcome.alertname)),
                    Text::mrkdwn(format!("*Namespace:*\n{}", outcome.namespace)),
                    Text::mrkdwn(format!("*Priority:*\n{}", outcome.priority)),
                ]),
                accessory: None,
            },
        ];

        if let (true, Some(link)) = (outcome.captured(), outcome.file_link.as_ref()) {
            blocks.push(Block::Section {
                text: Some(Text::mrkdwn(format!(
                    ":technologist: *{} dump link* :point_right:",
                    outcome.dump_type
                ))),
                fields: None,
                accessory: Some(Button {
                    kind: "button",
                    text: Text::plain("Download me"),
                    value: "click_me_123",
                    url: link.clone(),
                    action_id: "button-action",
                }),
            });
        }

        SlackMessage {
            channel: self.config.channel.clone(),
            username: USERNAME,
            icon_emoji: ICON_EMOJI,
            blocks,
        }
    }
}

#[async_trait]
impl NotifyChannel for SlackChannel {
    fn name(&self) -> &'static str {
        "slack"
    }

    fn enabled(&self) -> bool {
        self.config.webhook_url.is_some()
    }

    async fn send(&self, outcome: &RemediationOutcome) -> Result<()> {
        let url = self
            .config
            .webhook_url
            .as_deref()
            .ok_or_else(|| Error::Notification("SLACK_WEBHOOK_URL is not set".to_string()))?;

        let message = self.format_message(outcome);
        debug!("Posting Slack message: {}", serde_json::to_string(&message)?);

        let response = self
            .client
            .post(url)
            .json(&message)
            .send()
            .await
            .map_err(|e| Error::Notification(format!("request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Notification(format!("Slack returned {}: {}", status, body)));
        }
        Ok(())
    }
}
