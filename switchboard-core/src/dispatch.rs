// ABOUTME: DispatchResult - immutable record of one gateway delivery attempt.
// ABOUTME: Fields are private; callers read them through accessors or serialize to JSON.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use switchboard_delivery::BackendKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DispatchStatus {
    Sent,
    Failed,
    Skipped,
    Error,
}

impl DispatchStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sent => "sent",
            Self::Failed => "failed",
            Self::Skipped => "skipped",
            Self::Error => "error",
        }
    }

    /// Nothing is left to do for this dispatch.
    pub fn is_settled(&self) -> bool {
        matches!(self, Self::Sent | Self::Skipped)
    }
}

impl fmt::Display for DispatchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DispatchResult {
    request_id: String,
    agent: String,
    backend: Option<BackendKind>,
    status: DispatchStatus,
    timestamp: DateTime<Utc>,
    #[serde(default)]
    extra: BTreeMap<String, Value>,
}

impl DispatchResult {
    pub(crate) fn new(
        request_id: impl Into<String>,
        agent: impl Into<String>,
        backend: Option<BackendKind>,
        status: DispatchStatus,
    ) -> Self {
        Self {
            request_id: request_id.into(),
            agent: agent.into(),
            backend,
            status,
            timestamp: Utc::now(),
            extra: BTreeMap::new(),
        }
    }

    pub(crate) fn with_extra(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }

    pub fn request_id(&self) -> &str {
        &self.request_id
    }

    pub fn agent(&self) -> &str {
        &self.agent
    }

    pub fn backend(&self) -> Option<BackendKind> {
        self.backend
    }

    pub fn status(&self) -> DispatchStatus {
        self.status
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn extra(&self) -> &BTreeMap<String, Value> {
        &self.extra
    }

    pub fn extra_value(&self, key: &str) -> Option<&Value> {
        self.extra.get(key)
    }

    pub fn to_json(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serializes_wire_names() {
        let result = DispatchResult::new("r1", "Agent-2", Some(BackendKind::Inbox), DispatchStatus::Sent)
            .with_extra("fallback_from", vec!["ui_automation"]);
        let json = result.to_json();
        assert_eq!(json["status"], "sent");
        assert_eq!(json["backend"], "inbox");
        assert_eq!(json["agent"], "Agent-2");
        assert_eq!(json["extra"]["fallback_from"][0], "ui_automation");
    }

    #[test]
    fn test_missing_backend_serializes_as_null() {
        let result = DispatchResult::new("r1", "Agent-9", None, DispatchStatus::Skipped);
        assert!(result.to_json()["backend"].is_null());
        assert!(result.status().is_settled());
        assert!(!DispatchStatus::Error.is_settled());
    }
}
