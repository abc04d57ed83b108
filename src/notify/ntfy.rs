use super::message::Notification;
use super::DeliverySink;
use crate::config::NotifierConfig;
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use std::time::Duration;

/// ntfy JSON publish body (POST to the server root).
#[derive(Debug, Serialize)]
struct PublishRequest<'a> {
    topic: &'a str,
    title: &'a str,
    message: &'a str,
    priority: u8,
    tags: &'a [String],
    #[serde(skip_serializing_if = "Option::is_none")]
    click: Option<&'a str>,
    markdown: bool,
}

pub struct NtfyNotifier {
    client: Client,
    server: String,
    topic: String,
    dry_run: bool,
}

impl NtfyNotifier {
    pub fn new(config: &NotifierConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_millis(config.request_timeout_ms))
            .build()
            .context("failed to build ntfy HTTP client")?;

        Ok(Self {
            client,
            server: config.server.trim_end_matches('/').to_string(),
            topic: config.topic.clone(),
            dry_run: config.dry_run,
        })
    }

    async fn publish(&self, notification: &Notification) -> Result<()> {
        let body = PublishRequest {
            topic: &self.topic,
            title: &notification.title,
            message: &notification.body,
            priority: notification.priority.level(),
            tags: &notification.tags,
            click: notification.click_url.as_deref(),
            markdown: true,
        };

        let resp = self
            .client
            .post(&self.server)
            .json(&body)
            .send()
            .await
            .context("ntfy request failed")?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            anyhow::bail!("ntfy publish failed ({}): {}", status, body);
        }
        Ok(())
    }
}

#[async_trait]
impl DeliverySink for NtfyNotifier {
    async fn deliver(&self, notification: &Notification) -> bool {
        if self.dry_run {
            tracing::info!(
                topic = %self.topic,
                title = %notification.title,
                priority = notification.priority.as_str(),
                body_len = notification.body.len(),
                "DRY RUN: would publish notification"
            );
            return true;
        }

        match self.publish(notification).await {
            Ok(()) => {
                tracing::info!(topic = %self.topic, title = %notification.title, "notification sent");
                true
            }
            Err(e) => {
                tracing::warn!(
                    topic = %self.topic,
                    title = %notification.title,
                    error = %format!("{:#}", e),
                    "notification failed"
                );
                false
            }
        }
    }
}
