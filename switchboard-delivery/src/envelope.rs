// ABOUTME: Message primitives shared by every delivery backend.
// ABOUTME: Defines MessageType, Priority, the outbound message and its dispatch metadata.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Error returned when a wire string names no known enum variant.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown {kind}: {value}")]
pub struct ParseEnumError {
    pub kind: &'static str,
    pub value: String,
}

/// Semantic intent of a message. Says nothing about how it is delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageType {
    AgentToAgent,
    SystemToAgent,
    HumanToAgent,
    CaptainToAgent,
    Broadcast,
    Onboarding,
    Coordination,
    Status,
}

impl MessageType {
    pub const ALL: [MessageType; 8] = [
        Self::AgentToAgent,
        Self::SystemToAgent,
        Self::HumanToAgent,
        Self::CaptainToAgent,
        Self::Broadcast,
        Self::Onboarding,
        Self::Coordination,
        Self::Status,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AgentToAgent => "agent_to_agent",
            Self::SystemToAgent => "system_to_agent",
            Self::HumanToAgent => "human_to_agent",
            Self::CaptainToAgent => "captain_to_agent",
            Self::Broadcast => "broadcast",
            Self::Onboarding => "onboarding",
            Self::Coordination => "coordination",
            Self::Status => "status",
        }
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MessageType {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == wanted)
            .ok_or_else(|| ParseEnumError {
                kind: "message type",
                value: s.to_string(),
            })
    }
}

/// Delivery priority. Ordered so that `Urgent > High > Normal > Low`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    #[default]
    Normal,
    High,
    Urgent,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Normal => "normal",
            Self::High => "high",
            Self::Urgent => "urgent",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Priority {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(Self::Low),
            "normal" => Ok(Self::Normal),
            "high" => Ok(Self::High),
            "urgent" => Ok(Self::Urgent),
            _ => Err(ParseEnumError {
                kind: "priority",
                value: s.to_string(),
            }),
        }
    }
}

/// The text a backend is asked to deliver to one agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutboundMessage {
    /// Correlates the delivery with the producer's request
    pub request_id: String,
    /// Logical agent the message is addressed to
    pub agent_id: String,
    /// Message body
    pub text: String,
}

impl OutboundMessage {
    pub fn new(
        request_id: impl Into<String>,
        agent_id: impl Into<String>,
        text: impl Into<String>,
    ) -> Self {
        Self {
            request_id: request_id.into(),
            agent_id: agent_id.into(),
            text: text.into(),
        }
    }
}

/// Metadata travelling with a dispatch.
///
/// Backends receive the full metadata first. A backend that cannot honor it
/// answers `BackendError::MetadataUnsupported` and is then called once more
/// with [`DispatchMeta::minimal`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DispatchMeta {
    /// Producer-supplied request id; generated by the gateway when absent
    #[serde(default)]
    pub request_id: Option<String>,
    pub sender: String,
    #[serde(default)]
    pub priority: Priority,
    pub message_type: MessageType,
    /// Free-form producer tags (e.g. a Discord interaction id)
    #[serde(default)]
    pub tags: BTreeMap<String, Value>,
}

impl Default for DispatchMeta {
    fn default() -> Self {
        Self {
            request_id: None,
            sender: "System".to_string(),
            priority: Priority::Normal,
            message_type: MessageType::SystemToAgent,
            tags: BTreeMap::new(),
        }
    }
}

impl DispatchMeta {
    pub fn from_sender(sender: impl Into<String>) -> Self {
        Self {
            sender: sender.into(),
            ..Self::default()
        }
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_type(mut self, message_type: MessageType) -> Self {
        self.message_type = message_type;
        self
    }

    pub fn with_request_id(mut self, request_id: impl Into<String>) -> Self {
        self.request_id = Some(request_id.into());
        self
    }

    pub fn with_tag(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.tags.insert(key.into(), value.into());
        self
    }

    /// Reduced form kept for backends that only understand sender + text.
    pub fn minimal(&self) -> Self {
        Self {
            request_id: self.request_id.clone(),
            sender: self.sender.clone(),
            ..Self::default()
        }
    }

    /// True when nothing beyond the sender and request id is set.
    pub fn is_minimal(&self) -> bool {
        self.priority == Priority::Normal
            && self.message_type == MessageType::SystemToAgent
            && self.tags.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_type_parses_every_wire_name() {
        for t in MessageType::ALL {
            assert_eq!(t.as_str().parse::<MessageType>().unwrap(), t);
        }
        assert!("direct_message".parse::<MessageType>().is_err());
    }

    #[test]
    fn test_message_type_parse_ignores_case_like_priority() {
        assert_eq!(
            "AGENT_TO_AGENT".parse::<MessageType>().unwrap(),
            MessageType::AgentToAgent
        );
        assert_eq!(" Status ".parse::<MessageType>().unwrap(), MessageType::Status);
        let err = "Direct_Message".parse::<MessageType>().unwrap_err();
        assert_eq!(err.kind, "message type");
        assert_eq!(err.value, "Direct_Message");
    }

    #[test]
    fn test_message_type_serde_matches_as_str() {
        let json = serde_json::to_string(&MessageType::CaptainToAgent).unwrap();
        assert_eq!(json, "\"captain_to_agent\"");
    }

    #[test]
    fn test_priority_ordering_and_parse() {
        assert!(Priority::Urgent > Priority::High);
        assert!(Priority::High > Priority::Normal);
        assert!(Priority::Normal > Priority::Low);
        assert_eq!("URGENT".parse::<Priority>().unwrap(), Priority::Urgent);
        let err = "critical".parse::<Priority>().unwrap_err();
        assert_eq!(err.kind, "priority");
    }

    #[test]
    fn test_minimal_meta_drops_rich_fields() {
        let meta = DispatchMeta::from_sender("Captain")
            .with_priority(Priority::Urgent)
            .with_type(MessageType::CaptainToAgent)
            .with_tag("interaction", "abc");
        assert!(!meta.is_minimal());
        let minimal = meta.minimal();
        assert!(minimal.is_minimal());
        assert_eq!(minimal.sender, "Captain");
    }
}
