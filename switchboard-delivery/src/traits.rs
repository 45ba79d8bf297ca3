// ABOUTME: Core DeliveryBackend trait that all backends implement.
// ABOUTME: One canonical send(message, target, meta) signature plus an adapter for legacy senders.

use crate::envelope::{DispatchMeta, OutboundMessage};
use crate::target::AgentTarget;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Which delivery mechanism a backend implements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    UiAutomation,
    Inbox,
    Webhook,
}

impl BackendKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::UiAutomation => "ui_automation",
            Self::Inbox => "inbox",
            Self::Webhook => "webhook",
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors a backend reports for a single delivery attempt.
#[derive(Debug, Error)]
pub enum BackendError {
    /// The far end answered but refused the delivery (e.g. HTTP 500).
    #[error("delivery rejected: {0}")]
    Rejected(String),
    /// The request never got a proper answer.
    #[error("transport error: {0}")]
    Transport(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    /// The UI driver failed to perform a step.
    #[error("ui driver error: {0}")]
    Driver(String),
    /// The backend lacks the settings it needs (e.g. no webhook URL).
    #[error("backend not configured: {0}")]
    NotConfigured(String),
    /// The backend cannot handle this target or operation at all.
    #[error("unsupported: {0}")]
    Unsupported(String),
    /// The backend only accepts minimal metadata; retry with `DispatchMeta::minimal`.
    #[error("backend does not accept rich metadata")]
    MetadataUnsupported,
}

impl BackendError {
    /// A clean refusal, as opposed to something having gone wrong.
    pub fn is_rejection(&self) -> bool {
        matches!(self, Self::Rejected(_))
    }
}

/// Core trait that all delivery backends implement.
#[async_trait]
pub trait DeliveryBackend: Send + Sync {
    /// Backend kind for logging, metrics, and dispatch results
    fn kind(&self) -> BackendKind;

    /// Deliver one message to one resolved target.
    async fn send(
        &self,
        message: &OutboundMessage,
        target: &AgentTarget,
        meta: &DispatchMeta,
    ) -> Result<(), BackendError>;

    /// Read back what the target currently shows. Most backends cannot.
    async fn receive(&self, _target: &AgentTarget) -> Result<String, BackendError> {
        Err(BackendError::Unsupported(format!(
            "{} backend cannot read agent output",
            self.kind()
        )))
    }
}

/// Legacy two-argument sender: agent id and text, returning whether it was delivered.
#[async_trait]
pub trait SimpleSender: Send + Sync {
    async fn send_text(&self, agent_id: &str, text: &str) -> anyhow::Result<bool>;
}

/// Adapts a [`SimpleSender`] to [`DeliveryBackend`] so the gateway never
/// branches on calling convention.
pub struct SimpleBackendAdapter<S> {
    kind: BackendKind,
    inner: S,
}

impl<S: SimpleSender> SimpleBackendAdapter<S> {
    pub fn new(kind: BackendKind, inner: S) -> Self {
        Self { kind, inner }
    }
}

#[async_trait]
impl<S: SimpleSender> DeliveryBackend for SimpleBackendAdapter<S> {
    fn kind(&self) -> BackendKind {
        self.kind
    }

    async fn send(
        &self,
        message: &OutboundMessage,
        _target: &AgentTarget,
        meta: &DispatchMeta,
    ) -> Result<(), BackendError> {
        if !meta.is_minimal() {
            return Err(BackendError::MetadataUnsupported);
        }
        match self.inner.send_text(&message.agent_id, &message.text).await {
            Ok(true) => Ok(()),
            Ok(false) => Err(BackendError::Rejected(format!(
                "{} sender declined message for {}",
                self.kind, message.agent_id
            ))),
            Err(e) => Err(BackendError::Transport(e.to_string())),
        }
    }
}
