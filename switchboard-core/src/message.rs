// ABOUTME: Wire and validated forms of a routed message, plus the routing outcome enum.
// ABOUTME: A Message can only be built from typed parts or by validating an InboundMessage.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use switchboard_delivery::{DispatchMeta, MessageType, Priority};

/// Recipient names that address every known agent.
pub const BROADCAST_RECIPIENTS: [&str; 2] = ["all", "*"];

/// Timestamp as producers send it: epoch seconds or an ISO-8601 string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawTimestamp {
    Epoch(f64),
    Text(String),
}

impl From<DateTime<Utc>> for RawTimestamp {
    fn from(at: DateTime<Utc>) -> Self {
        Self::Text(at.to_rfc3339())
    }
}

/// Message exactly as a producer submitted it. Nothing is trusted yet.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InboundMessage {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default, rename = "type")]
    pub message_type: Option<String>,
    #[serde(default)]
    pub priority: Option<String>,
    #[serde(default)]
    pub sender: Option<String>,
    #[serde(default)]
    pub recipient: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub timestamp: Option<RawTimestamp>,
    #[serde(default)]
    pub retry_count: Option<u32>,
}

/// A validated message. The router's queue only ever holds these.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Message {
    id: String,
    message_type: MessageType,
    priority: Priority,
    sender: String,
    recipient: String,
    content: String,
    timestamp: DateTime<Utc>,
    retry_count: u32,
}

impl Message {
    /// Build a message from typed parts with a fresh id and the current time.
    pub fn new(
        message_type: MessageType,
        sender: impl Into<String>,
        recipient: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            message_type,
            priority: Priority::Normal,
            sender: sender.into(),
            recipient: recipient.into(),
            content: content.into(),
            timestamp: Utc::now(),
            retry_count: 0,
        }
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    // Validator entry point; field checks have already happened.
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn from_parts(
        id: String,
        message_type: MessageType,
        priority: Priority,
        sender: String,
        recipient: String,
        content: String,
        timestamp: DateTime<Utc>,
        retry_count: u32,
    ) -> Self {
        Self {
            id,
            message_type,
            priority,
            sender,
            recipient,
            content,
            timestamp,
            retry_count,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn message_type(&self) -> MessageType {
        self.message_type
    }

    pub fn priority(&self) -> Priority {
        self.priority
    }

    pub fn sender(&self) -> &str {
        &self.sender
    }

    pub fn recipient(&self) -> &str {
        &self.recipient
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn retry_count(&self) -> u32 {
        self.retry_count
    }

    /// True when the message fans out to every agent.
    pub fn is_broadcast(&self) -> bool {
        self.message_type == MessageType::Broadcast
            || BROADCAST_RECIPIENTS
                .iter()
                .any(|r| self.recipient.eq_ignore_ascii_case(r))
    }

    /// Copy of this message for another delivery attempt.
    pub(crate) fn next_attempt(&self) -> Self {
        Self {
            retry_count: self.retry_count.saturating_add(1),
            ..self.clone()
        }
    }

    /// Gateway metadata carried by this message.
    pub fn dispatch_meta(&self) -> DispatchMeta {
        DispatchMeta::from_sender(self.sender.clone())
            .with_priority(self.priority)
            .with_type(self.message_type)
            .with_request_id(self.id.clone())
    }
}

/// What happened to a message handed to the router.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoutingResult {
    Success,
    Failed,
    Queued,
    Retry,
}

impl RoutingResult {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Failed => "failed",
            Self::Queued => "queued",
            Self::Retry => "retry",
        }
    }
}

impl fmt::Display for RoutingResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
