// ABOUTME: Webhook backend - pushes messages to a Discord-style channel webhook as embeds.
// ABOUTME: Any 2xx (normally 204) is success; other statuses are rejections. Never retries.

use crate::envelope::{DispatchMeta, OutboundMessage, Priority};
use crate::target::AgentTarget;
use crate::traits::{BackendError, BackendKind, DeliveryBackend};
use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Longest embed description the channel accepts.
pub const MAX_DESCRIPTION_CHARS: usize = 4096;

/// Body of a webhook POST.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WebhookPayload {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default)]
    pub embeds: Vec<Embed>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Embed {
    pub title: String,
    pub description: String,
    pub color: u32,
    #[serde(default)]
    pub fields: Vec<EmbedField>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub footer: Option<EmbedFooter>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbedField {
    pub name: String,
    pub value: String,
    #[serde(default)]
    pub inline: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbedFooter {
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon_url: Option<String>,
}

impl Embed {
    pub fn new(title: impl Into<String>, description: impl Into<String>, color: u32) -> Self {
        Self {
            title: title.into(),
            description: truncate_chars(&description.into(), MAX_DESCRIPTION_CHARS),
            color,
            fields: Vec::new(),
            footer: None,
            timestamp: Some(Utc::now().to_rfc3339()),
        }
    }

    pub fn field(mut self, name: impl Into<String>, value: impl Into<String>, inline: bool) -> Self {
        self.fields.push(EmbedField {
            name: name.into(),
            value: value.into(),
            inline,
        });
        self
    }

    pub fn footer(mut self, text: impl Into<String>) -> Self {
        self.footer = Some(EmbedFooter {
            text: text.into(),
            icon_url: None,
        });
        self
    }
}

/// Cut `text` to at most `max` characters, marking the cut with an ellipsis.
pub fn truncate_chars(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let mut cut: String = text.chars().take(max.saturating_sub(1)).collect();
    cut.push('…');
    cut
}

/// Embed color for a message priority.
pub fn priority_color(priority: Priority) -> u32 {
    match priority {
        Priority::Low => 0x95a5a6,
        Priority::Normal => 0x3498db,
        Priority::High => 0xe67e22,
        Priority::Urgent => 0xe74c3c,
    }
}

pub struct WebhookBackend {
    client: reqwest::Client,
    default_url: Option<String>,
    username: Option<String>,
    avatar_url: Option<String>,
}

impl WebhookBackend {
    pub fn new(default_url: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            default_url,
            username: None,
            avatar_url: None,
        }
    }

    /// Build with a request timeout on the underlying HTTP client.
    pub fn with_timeout(default_url: Option<String>, timeout: Duration) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            default_url,
            username: None,
            avatar_url: None,
        })
    }

    pub fn with_identity(mut self, username: Option<String>, avatar_url: Option<String>) -> Self {
        self.username = username;
        self.avatar_url = avatar_url;
        self
    }

    pub fn default_url(&self) -> Option<&str> {
        self.default_url.as_deref()
    }

    /// Wrap embeds in a payload carrying this backend's identity.
    pub fn payload(&self, content: Option<String>, embeds: Vec<Embed>) -> WebhookPayload {
        WebhookPayload {
            content,
            embeds,
            username: self.username.clone(),
            avatar_url: self.avatar_url.clone(),
        }
    }

    /// POST a payload. Success is any 2xx status.
    pub async fn post(&self, url: &str, payload: &WebhookPayload) -> Result<(), BackendError> {
        let response = self
            .client
            .post(url)
            .json(payload)
            .send()
            .await
            .map_err(|e| BackendError::Transport(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            tracing::debug!(status = %status, "Webhook accepted payload");
            return Ok(());
        }
        let body = response.text().await.unwrap_or_default();
        Err(BackendError::Rejected(format!(
            "webhook returned {}: {}",
            status,
            truncate_chars(body.trim(), 200)
        )))
    }

    /// POST to the default URL, reporting the outcome as a boolean.
    pub async fn post_default(&self, payload: &WebhookPayload) -> bool {
        let Some(url) = self.default_url.as_deref() else {
            tracing::warn!("Webhook URL not configured, notification dropped");
            return false;
        };
        match self.post(url, payload).await {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(error = %e, "Webhook notification failed");
                false
            }
        }
    }
}

/// Embed used when an agent message is pushed to a channel.
pub fn message_embed(message: &OutboundMessage, meta: &DispatchMeta) -> Embed {
    Embed::new(
        format!("Message for {}", message.agent_id),
        message.text.clone(),
        priority_color(meta.priority),
    )
    .field("From", meta.sender.clone(), true)
    .field("Priority", meta.priority.to_string(), true)
    .field("Type", meta.message_type.to_string(), true)
    .footer(format!("Request {}", message.request_id))
}

#[async_trait]
impl DeliveryBackend for WebhookBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Webhook
    }

    async fn send(
        &self,
        message: &OutboundMessage,
        target: &AgentTarget,
        meta: &DispatchMeta,
    ) -> Result<(), BackendError> {
        let (url, channel_id) = match target {
            AgentTarget::Channel {
                webhook_url,
                channel_id,
            } => (
                webhook_url.as_deref().or(self.default_url.as_deref()),
                channel_id.as_deref(),
            ),
            _ => (self.default_url.as_deref(), None),
        };
        let url = url.ok_or_else(|| {
            BackendError::NotConfigured(format!("no webhook URL for {}", message.agent_id))
        })?;

        let content = channel_id.map(|id| format!("<#{}>", id));
        let payload = self.payload(content, vec![message_embed(message, meta)]);
        self.post(url, &payload).await?;

        tracing::info!(
            agent = %message.agent_id,
            request_id = %message.request_id,
            "Message pushed to channel webhook"
        );
        Ok(())
    }
}
