// ABOUTME: Typed webhook notifications (devlog, status, coordination, contracts, errors, missions).
// ABOUTME: Pure embed formatters plus a fire-and-forget notifier that also feeds the audit cache.

use crate::backends::webhook::{priority_color, Embed, WebhookBackend};
use crate::cache::{CacheSection, CoordinationCache};
use crate::envelope::Priority;
use serde_json::json;
use std::sync::Arc;

pub const COLOR_DEVLOG: u32 = 0x3498db;
pub const COLOR_STATUS: u32 = 0x2ecc71;
pub const COLOR_COORDINATION: u32 = 0x9b59b6;
pub const COLOR_CONTRACT: u32 = 0xe67e22;
pub const COLOR_ERROR: u32 = 0xe74c3c;
pub const COLOR_RECOVERY: u32 = 0x27ae60;
pub const COLOR_MISSION: u32 = 0x1abc9c;

const FOOTER: &str = "Switchboard coordination";

pub fn devlog_embed(agent_id: &str, title: &str, body: &str) -> Embed {
    Embed::new(format!("Devlog: {}", title), body, COLOR_DEVLOG)
        .field("Agent", agent_id, true)
        .footer(FOOTER)
}

pub fn agent_status_embed(agent_id: &str, status: &str, detail: Option<&str>) -> Embed {
    let color = match status.to_ascii_lowercase().as_str() {
        "error" | "failed" | "offline" => COLOR_ERROR,
        "busy" | "onboarding" => COLOR_CONTRACT,
        _ => COLOR_STATUS,
    };
    Embed::new(
        format!("Agent status: {}", agent_id),
        detail.unwrap_or("No details reported"),
        color,
    )
    .field("Status", status, true)
    .footer(FOOTER)
}

pub fn coordination_event_embed(
    event: &str,
    participants: &[String],
    priority: Priority,
    detail: &str,
) -> Embed {
    let who = if participants.is_empty() {
        "none".to_string()
    } else {
        participants.join(", ")
    };
    let color = if priority >= Priority::High {
        priority_color(priority)
    } else {
        COLOR_COORDINATION
    };
    Embed::new(format!("Coordination: {}", event), detail, color)
        .field("Participants", who, false)
        .field("Priority", priority.to_string(), true)
        .footer(FOOTER)
}

pub fn contract_assignment_embed(
    contract_id: &str,
    agent_id: &str,
    title: &str,
    points: Option<u32>,
) -> Embed {
    let mut embed = Embed::new(format!("Contract assigned: {}", title), "", COLOR_CONTRACT)
        .field("Contract", contract_id, true)
        .field("Agent", agent_id, true);
    if let Some(points) = points {
        embed = embed.field("Points", points.to_string(), true);
    }
    embed.footer(FOOTER)
}

pub fn error_embed(source: &str, error: &str, context: Option<&str>) -> Embed {
    let mut embed = Embed::new(format!("Error in {}", source), error, COLOR_ERROR);
    if let Some(context) = context {
        embed = embed.field("Context", context, false);
    }
    embed.footer(FOOTER)
}

pub fn recovery_embed(source: &str, action: &str) -> Embed {
    Embed::new(format!("Recovered: {}", source), action, COLOR_RECOVERY).footer(FOOTER)
}

pub fn mission_progress_embed(mission: &str, percent: u8, summary: &str) -> Embed {
    let percent = percent.min(100);
    let filled = usize::from(percent / 10);
    let bar = format!("{}{}", "#".repeat(filled), "-".repeat(10 - filled));
    Embed::new(format!("Mission progress: {}", mission), summary, COLOR_MISSION)
        .field("Progress", format!("[{}] {}%", bar, percent), false)
        .footer(FOOTER)
}

/// Posts notifications to the configured channel webhook.
///
/// Each call reports success as a boolean and never retries. Contract
/// assignments, mission progress and coordination events are also written
/// to the audit cache when one is attached, whether or not the post worked.
pub struct WebhookNotifier {
    backend: Arc<WebhookBackend>,
    cache: Option<Arc<CoordinationCache>>,
}

impl WebhookNotifier {
    pub fn new(backend: Arc<WebhookBackend>) -> Self {
        Self {
            backend,
            cache: None,
        }
    }

    pub fn with_cache(mut self, cache: Arc<CoordinationCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    async fn post(&self, embed: Embed) -> bool {
        let payload = self.backend.payload(None, vec![embed]);
        self.backend.post_default(&payload).await
    }

    async fn audit(&self, section: CacheSection, entry: serde_json::Value) {
        if let Some(cache) = &self.cache {
            if let Err(e) = cache.record(section, entry).await {
                tracing::warn!(error = %e, "Failed to append coordination audit entry");
            }
        }
    }

    pub async fn send_devlog_update(&self, agent_id: &str, title: &str, body: &str) -> bool {
        self.post(devlog_embed(agent_id, title, body)).await
    }

    pub async fn send_agent_status(&self, agent_id: &str, status: &str, detail: Option<&str>) -> bool {
        self.post(agent_status_embed(agent_id, status, detail)).await
    }

    pub async fn send_coordination_event(
        &self,
        event: &str,
        participants: &[String],
        priority: Priority,
        detail: &str,
    ) -> bool {
        let sent = self
            .post(coordination_event_embed(event, participants, priority, detail))
            .await;
        self.audit(
            CacheSection::Events,
            json!({
                "event": event,
                "participants": participants,
                "priority": priority,
                "detail": detail,
                "notified": sent,
            }),
        )
        .await;
        sent
    }

    pub async fn send_contract_assignment(
        &self,
        contract_id: &str,
        agent_id: &str,
        title: &str,
        points: Option<u32>,
    ) -> bool {
        let sent = self
            .post(contract_assignment_embed(contract_id, agent_id, title, points))
            .await;
        self.audit(
            CacheSection::Assignments,
            json!({
                "contract_id": contract_id,
                "agent": agent_id,
                "title": title,
                "points": points,
                "notified": sent,
            }),
        )
        .await;
        sent
    }

    pub async fn send_error_alert(&self, source: &str, error: &str, context: Option<&str>) -> bool {
        self.post(error_embed(source, error, context)).await
    }

    pub async fn send_recovery_notice(&self, source: &str, action: &str) -> bool {
        self.post(recovery_embed(source, action)).await
    }

    pub async fn send_mission_progress(&self, mission: &str, percent: u8, summary: &str) -> bool {
        let sent = self
            .post(mission_progress_embed(mission, percent, summary))
            .await;
        self.audit(
            CacheSection::MissionProgress,
            json!({
                "mission": mission,
                "percent": percent.min(100),
                "summary": summary,
                "notified": sent,
            }),
        )
        .await;
        sent
    }
}
