// ABOUTME: Messaging gateway - resolves an agent to a target and dispatches with fallback.
// ABOUTME: Converts every backend outcome into a DispatchResult; never propagates backend errors.

use crate::coordinates::CoordinateStore;
use crate::dispatch::{DispatchResult, DispatchStatus};
use crate::lifecycle::{AgentState, LifecycleTracker};
use crate::metrics;
use serde_json::{json, Value};
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Instant;
use switchboard_delivery::{
    AgentTarget, BackendError, BackendKind, CacheSection, CoordinationCache, DeliveryBackend,
    DispatchMeta, MessageType, OutboundMessage, Priority,
};

/// Prompt appended to operator status requests. `{agent}` and
/// `{requested_by}` are substituted before sending.
pub const DEFAULT_SUMMARY_PROMPT: &str = "STATUS REQUEST for {agent} from {requested_by}: \
reply with a short summary of your current task, progress since your last report, \
blockers, and your next step.";

/// Agents whose windows are monitored for UI automation by default.
pub const DEFAULT_UI_AGENTS: [&str; 4] = ["Agent-1", "Agent-2", "Agent-3", "Agent-4"];

pub struct GatewayBuilder {
    coordinates: Arc<CoordinateStore>,
    ui: Option<Arc<dyn DeliveryBackend>>,
    inbox: Option<Arc<dyn DeliveryBackend>>,
    webhook: Option<Arc<dyn DeliveryBackend>>,
    ui_agents: BTreeSet<String>,
    dry_run: bool,
    summary_prompt: String,
    cache: Option<Arc<CoordinationCache>>,
    lifecycle: Option<Arc<LifecycleTracker>>,
}

impl GatewayBuilder {
    pub fn ui_backend(mut self, backend: Arc<dyn DeliveryBackend>) -> Self {
        self.ui = Some(backend);
        self
    }

    pub fn inbox_backend(mut self, backend: Arc<dyn DeliveryBackend>) -> Self {
        self.inbox = Some(backend);
        self
    }

    pub fn webhook_backend(mut self, backend: Arc<dyn DeliveryBackend>) -> Self {
        self.webhook = Some(backend);
        self
    }

    /// Replace the set of agents eligible for UI automation.
    pub fn ui_agents<I, S>(mut self, agents: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.ui_agents = agents.into_iter().map(Into::into).collect();
        self
    }

    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn summary_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.summary_prompt = prompt.into();
        self
    }

    pub fn cache(mut self, cache: Arc<CoordinationCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn lifecycle(mut self, lifecycle: Arc<LifecycleTracker>) -> Self {
        self.lifecycle = Some(lifecycle);
        self
    }

    pub fn build(self) -> MessagingGateway {
        MessagingGateway {
            coordinates: self.coordinates,
            ui: self.ui,
            inbox: self.inbox,
            webhook: self.webhook,
            ui_agents: self.ui_agents,
            dry_run: self.dry_run,
            summary_prompt: self.summary_prompt,
            cache: self.cache,
            lifecycle: self.lifecycle.unwrap_or_default(),
        }
    }
}

pub struct MessagingGateway {
    coordinates: Arc<CoordinateStore>,
    ui: Option<Arc<dyn DeliveryBackend>>,
    inbox: Option<Arc<dyn DeliveryBackend>>,
    webhook: Option<Arc<dyn DeliveryBackend>>,
    ui_agents: BTreeSet<String>,
    dry_run: bool,
    summary_prompt: String,
    cache: Option<Arc<CoordinationCache>>,
    lifecycle: Arc<LifecycleTracker>,
}

impl MessagingGateway {
    pub fn builder(coordinates: Arc<CoordinateStore>) -> GatewayBuilder {
        GatewayBuilder {
            coordinates,
            ui: None,
            inbox: None,
            webhook: None,
            ui_agents: DEFAULT_UI_AGENTS.iter().map(|a| a.to_string()).collect(),
            dry_run: false,
            summary_prompt: DEFAULT_SUMMARY_PROMPT.to_string(),
            cache: None,
            lifecycle: None,
        }
    }

    pub fn coordinates(&self) -> &CoordinateStore {
        &self.coordinates
    }

    pub fn lifecycle(&self) -> &LifecycleTracker {
        &self.lifecycle
    }

    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    pub fn is_ui_eligible(&self, agent_id: &str) -> bool {
        self.ui_agents.contains(agent_id)
    }

    fn backend(&self, kind: BackendKind) -> Option<&Arc<dyn DeliveryBackend>> {
        match kind {
            BackendKind::UiAutomation => self.ui.as_ref(),
            BackendKind::Inbox => self.inbox.as_ref(),
            BackendKind::Webhook => self.webhook.as_ref(),
        }
    }

    /// Backends to try for `target`, most preferred first. Unconfigured ones are left out.
    pub fn backend_chain(&self, agent_id: &str, target: &AgentTarget) -> Vec<BackendKind> {
        let preferred: &[BackendKind] = match target {
            AgentTarget::UiAutomation { .. } if self.is_ui_eligible(agent_id) => {
                &[BackendKind::UiAutomation, BackendKind::Inbox]
            }
            AgentTarget::UiAutomation { .. } | AgentTarget::Inbox { .. } => &[BackendKind::Inbox],
            AgentTarget::Channel { .. } => &[BackendKind::Webhook, BackendKind::Inbox],
        };
        preferred
            .iter()
            .copied()
            .filter(|kind| self.backend(*kind).is_some())
            .collect()
    }

    /// Deliver `text` to `agent_id`, falling back through the backend chain.
    pub async fn send(&self, agent_id: &str, text: &str, meta: DispatchMeta) -> DispatchResult {
        let request_id = meta
            .request_id
            .clone()
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

        if self.dry_run {
            tracing::info!(
                agent = %agent_id,
                request_id = %request_id,
                chars = text.chars().count(),
                "Dry run, message not delivered"
            );
            return DispatchResult::new(request_id, agent_id, None, DispatchStatus::Skipped)
                .with_extra("dry_run", true);
        }

        let started = Instant::now();
        let target = match self.coordinates.get_target(agent_id) {
            Ok(target) => target.clone(),
            Err(e) => {
                tracing::warn!(agent = %agent_id, error = %e, "Cannot resolve agent");
                let result = DispatchResult::new(request_id, agent_id, None, DispatchStatus::Error)
                    .with_extra("error", e.to_string());
                return self.finish(result, started).await;
            }
        };

        let chain = self.backend_chain(agent_id, &target);
        if chain.is_empty() {
            tracing::warn!(agent = %agent_id, target = target.kind(), "No backend available");
            let result = DispatchResult::new(request_id, agent_id, None, DispatchStatus::Failed)
                .with_extra("error", "no backend available");
            return self.finish(result, started).await;
        }

        let message = OutboundMessage::new(request_id.clone(), agent_id, text);
        let mut failures: Vec<(BackendKind, BackendError)> = Vec::new();

        for kind in chain {
            let Some(backend) = self.backend(kind) else {
                continue;
            };
            match self.attempt(backend.as_ref(), &message, &target, &meta).await {
                Ok(simple) => {
                    let mut result = DispatchResult::new(
                        request_id.clone(),
                        agent_id,
                        Some(kind),
                        DispatchStatus::Sent,
                    );
                    if simple {
                        result = result.with_extra("convention", "simple");
                    }
                    if !failures.is_empty() {
                        result = result.with_extra("fallback_from", failure_list(&failures));
                    }
                    if meta.message_type == MessageType::Onboarding {
                        if let Err(e) = self.lifecycle.transition(agent_id, AgentState::Onboarding) {
                            tracing::warn!(agent = %agent_id, error = %e, "Lifecycle not updated after onboarding send");
                        }
                    }
                    return self.finish(result, started).await;
                }
                Err(e) => {
                    tracing::warn!(
                        agent = %agent_id,
                        backend = %kind,
                        error = %e,
                        "Backend failed, trying next"
                    );
                    metrics::record_backend_failure(kind.as_str());
                    failures.push((kind, e));
                }
            }
        }

        let status = if failures.iter().all(|(_, e)| e.is_rejection()) {
            DispatchStatus::Failed
        } else {
            DispatchStatus::Error
        };
        let result = DispatchResult::new(request_id, agent_id, None, status)
            .with_extra("errors", failure_list(&failures));
        self.finish(result, started).await
    }

    /// One backend, full metadata first, then once more with minimal metadata
    /// if the backend refuses the rich form. Returns whether the minimal form was used.
    async fn attempt(
        &self,
        backend: &dyn DeliveryBackend,
        message: &OutboundMessage,
        target: &AgentTarget,
        meta: &DispatchMeta,
    ) -> Result<bool, BackendError> {
        match backend.send(message, target, meta).await {
            Ok(()) => Ok(false),
            Err(BackendError::MetadataUnsupported) => {
                tracing::debug!(
                    backend = %backend.kind(),
                    agent = %message.agent_id,
                    "Backend refused rich metadata, retrying with minimal form"
                );
                backend
                    .send(message, target, &meta.minimal())
                    .await
                    .map(|()| true)
            }
            Err(e) => Err(e),
        }
    }

    async fn finish(&self, result: DispatchResult, started: Instant) -> DispatchResult {
        let backend = result.backend().map_or("none", |b| b.as_str());
        metrics::record_dispatch(backend, result.status().as_str(), started.elapsed());

        match result.status() {
            DispatchStatus::Sent => tracing::info!(
                agent = %result.agent(),
                request_id = %result.request_id(),
                backend,
                "Message dispatched"
            ),
            status => tracing::warn!(
                agent = %result.agent(),
                request_id = %result.request_id(),
                status = %status,
                "Message not delivered"
            ),
        }

        if let Some(cache) = &self.cache {
            let entry = json!({
                "event": "dispatch",
                "request_id": result.request_id(),
                "agent": result.agent(),
                "backend": result.backend(),
                "status": result.status(),
            });
            if let Err(e) = cache.record(CacheSection::Events, entry).await {
                tracing::warn!(error = %e, "Failed to record dispatch in coordination cache");
            }
        }
        result
    }

    /// Send the same text to every known agent, one after another in id order.
    pub async fn broadcast(&self, text: &str, meta: DispatchMeta) -> Vec<DispatchResult> {
        let agents = self.coordinates.agent_ids();
        tracing::info!(agents = agents.len(), sender = %meta.sender, "Broadcasting message");
        let mut results = Vec::with_capacity(agents.len());
        for agent_id in agents {
            let mut per_agent = meta.clone();
            per_agent.request_id = meta
                .request_id
                .as_ref()
                .map(|id| format!("{}-{}", id, agent_id));
            results.push(self.send(&agent_id, text, per_agent).await);
        }
        results
    }

    /// Ask an agent for a status summary on behalf of `requested_by`.
    pub async fn request_agent_summary(
        &self,
        agent_id: &str,
        requested_by: &str,
        context: Option<&str>,
    ) -> DispatchResult {
        let prompt = self
            .summary_prompt
            .replace("{agent}", agent_id)
            .replace("{requested_by}", requested_by);
        let text = match context.map(str::trim).filter(|c| !c.is_empty()) {
            Some(context) => format!("{}\n\n{}", context, prompt),
            None => prompt,
        };
        let meta = DispatchMeta::from_sender(requested_by)
            .with_type(MessageType::Status)
            .with_priority(Priority::High);
        self.send(agent_id, &text, meta).await
    }

    /// Best-effort read of what the agent's window currently shows.
    pub async fn get_agent_status(&self, agent_id: &str) -> Value {
        let error = |reason: String| json!({ "agent": agent_id, "status": "error", "error": reason });

        if self.dry_run {
            return json!({ "agent": agent_id, "status": "skipped", "dry_run": true });
        }
        let target = match self.coordinates.get_target(agent_id) {
            Ok(target) => target,
            Err(e) => return error(e.to_string()),
        };
        let Some(ui) = &self.ui else {
            return error("ui automation backend not configured".to_string());
        };
        match ui.receive(target).await {
            Ok(text) => json!({
                "agent": agent_id,
                "status": "ok",
                "text": text,
                "lifecycle": self.lifecycle.state(agent_id),
            }),
            Err(e) => {
                tracing::warn!(agent = %agent_id, error = %e, "Agent status read failed");
                error(e.to_string())
            }
        }
    }
}

fn failure_list(failures: &[(BackendKind, BackendError)]) -> Value {
    Value::Array(
        failures
            .iter()
            .map(|(kind, e)| json!({ "backend": kind, "error": e.to_string() }))
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use switchboard_delivery::testing::RecordingBackend;
    use switchboard_delivery::Point;

    fn store() -> Arc<CoordinateStore> {
        Arc::new(
            CoordinateStore::from_json_str(
                r#"{
                    "Agent-1": {"chat_input_coordinates": [1, 1]},
                    "Agent-6": {"chat_input_coordinates": [6, 6]},
                    "Agent-7": {"inbox_path": "/tmp/agent-7"},
                    "Agent-8": {"webhook_url": "http://localhost/hook"}
                }"#,
            )
            .unwrap(),
        )
    }

    #[test]
    fn test_backend_chain_by_target_and_eligibility() {
        let gateway = MessagingGateway::builder(store())
            .ui_backend(Arc::new(RecordingBackend::new(BackendKind::UiAutomation)))
            .inbox_backend(Arc::new(RecordingBackend::new(BackendKind::Inbox)))
            .webhook_backend(Arc::new(RecordingBackend::new(BackendKind::Webhook)))
            .build();
        let ui = AgentTarget::ui("w", Point::new(0, 0), Point::new(0, 0));
        assert_eq!(
            gateway.backend_chain("Agent-1", &ui),
            vec![BackendKind::UiAutomation, BackendKind::Inbox]
        );
        assert_eq!(gateway.backend_chain("Agent-6", &ui), vec![BackendKind::Inbox]);
        assert_eq!(
            gateway.backend_chain("Agent-7", &AgentTarget::inbox("/tmp/x")),
            vec![BackendKind::Inbox]
        );
        let channel = AgentTarget::Channel {
            webhook_url: None,
            channel_id: Some("1".to_string()),
        };
        assert_eq!(
            gateway.backend_chain("Agent-8", &channel),
            vec![BackendKind::Webhook, BackendKind::Inbox]
        );
    }

    #[test]
    fn test_unconfigured_backends_drop_out_of_chain() {
        let gateway = MessagingGateway::builder(store())
            .inbox_backend(Arc::new(RecordingBackend::new(BackendKind::Inbox)))
            .build();
        let ui = AgentTarget::ui("w", Point::new(0, 0), Point::new(0, 0));
        assert_eq!(gateway.backend_chain("Agent-1", &ui), vec![BackendKind::Inbox]);
    }

    #[tokio::test]
    async fn test_summary_prompt_substitutes_agent_and_requester() {
        let inbox = RecordingBackend::new(BackendKind::Inbox);
        let gateway = MessagingGateway::builder(store())
            .inbox_backend(Arc::new(inbox.clone()))
            .summary_prompt("{agent}, report to {requested_by}.")
            .build();
        let result = gateway
            .request_agent_summary("Agent-7", "Captain", Some("  after deploy  "))
            .await;
        assert_eq!(result.status(), DispatchStatus::Sent);

        let sends = inbox.sends();
        assert_eq!(sends[0].message.text, "after deploy\n\nAgent-7, report to Captain.");
        assert_eq!(sends[0].meta.message_type, MessageType::Status);
        assert_eq!(sends[0].meta.priority, Priority::High);
        assert_eq!(sends[0].meta.sender, "Captain");
    }
}
