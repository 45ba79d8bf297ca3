// ABOUTME: Inbox backend - writes each message as a timestamped Markdown file.
// ABOUTME: Files land in <root>/<agent_id>/inbox/ unless the target names its own directory.

use crate::envelope::{DispatchMeta, OutboundMessage};
use crate::target::AgentTarget;
use crate::traits::{BackendError, BackendKind, DeliveryBackend};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};

pub struct InboxBackend {
    workspace_root: PathBuf,
}

impl InboxBackend {
    /// `workspace_root` is the directory holding one folder per agent.
    pub fn new(workspace_root: impl Into<PathBuf>) -> Self {
        Self {
            workspace_root: workspace_root.into(),
        }
    }

    pub fn workspace_root(&self) -> &Path {
        &self.workspace_root
    }

    /// Directory a message for `agent_id` is written to.
    pub fn inbox_dir(&self, agent_id: &str, target: &AgentTarget) -> PathBuf {
        match target {
            AgentTarget::Inbox { path } => path.clone(),
            _ => self
                .workspace_root
                .join(sanitize_component(agent_id))
                .join("inbox"),
        }
    }
}

/// Keep ids usable as a single path component.
fn sanitize_component(raw: &str) -> String {
    let cleaned: String = raw
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    if cleaned.is_empty() {
        "unnamed".to_string()
    } else {
        cleaned
    }
}

/// File name for a message written at `at`.
pub fn inbox_file_name(request_id: &str, at: DateTime<Utc>) -> String {
    format!(
        "{}_{}.md",
        at.format("%Y%m%d_%H%M%S"),
        sanitize_component(request_id)
    )
}

/// Markdown body of an inbox file.
pub fn render_inbox_message(
    message: &OutboundMessage,
    meta: &DispatchMeta,
    at: DateTime<Utc>,
) -> String {
    format!(
        "# MESSAGE FROM {sender}\n\n\
         **From:** {sender}\n\
         **To:** {recipient}\n\
         **Priority:** {priority}\n\
         **Type:** {message_type}\n\
         **Message ID:** {id}\n\
         **Timestamp:** {timestamp}\n\n\
         ---\n\n\
         {body}\n",
        sender = meta.sender,
        recipient = message.agent_id,
        priority = meta.priority,
        message_type = meta.message_type,
        id = message.request_id,
        timestamp = at.to_rfc3339(),
        body = message.text,
    )
}

#[async_trait]
impl DeliveryBackend for InboxBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Inbox
    }

    async fn send(
        &self,
        message: &OutboundMessage,
        target: &AgentTarget,
        meta: &DispatchMeta,
    ) -> Result<(), BackendError> {
        let now = Utc::now();
        let dir = self.inbox_dir(&message.agent_id, target);
        tokio::fs::create_dir_all(&dir).await?;

        let path = dir.join(inbox_file_name(&message.request_id, now));
        tokio::fs::write(&path, render_inbox_message(message, meta, now)).await?;

        tracing::info!(
            agent = %message.agent_id,
            path = %path.display(),
            "Message written to agent inbox"
        );
        Ok(())
    }
}
