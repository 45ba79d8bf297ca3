// ABOUTME: UI automation backend - types messages into monitored agent windows.
// ABOUTME: Runs activate/click/click/paste/enter with a settle delay between every step.

use crate::envelope::{DispatchMeta, OutboundMessage};
use crate::target::AgentTarget;
use crate::traits::{BackendError, BackendKind, DeliveryBackend};
use crate::ui::UiDriver;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

/// Default pause between UI steps so focus changes take effect.
pub const DEFAULT_STEP_DELAY: Duration = Duration::from_millis(250);

pub struct UiAutomationBackend {
    driver: Arc<dyn UiDriver>,
    step_delay: Duration,
}

impl UiAutomationBackend {
    pub fn new(driver: Arc<dyn UiDriver>) -> Self {
        Self {
            driver,
            step_delay: DEFAULT_STEP_DELAY,
        }
    }

    pub fn with_step_delay(mut self, step_delay: Duration) -> Self {
        self.step_delay = step_delay;
        self
    }

    pub fn driver_name(&self) -> &'static str {
        self.driver.name()
    }

    async fn settle(&self) {
        if !self.step_delay.is_zero() {
            tokio::time::sleep(self.step_delay).await;
        }
    }
}

/// Text typed into the agent window. Rich metadata becomes a one-line header.
pub fn compose_ui_text(message: &OutboundMessage, meta: &DispatchMeta) -> String {
    if meta.is_minimal() {
        return message.text.clone();
    }
    format!(
        "[{}] {} -> {} ({}):\n{}",
        meta.message_type.as_str().to_uppercase(),
        meta.sender,
        message.agent_id,
        meta.priority,
        message.text
    )
}

#[async_trait]
impl DeliveryBackend for UiAutomationBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::UiAutomation
    }

    async fn send(
        &self,
        message: &OutboundMessage,
        target: &AgentTarget,
        meta: &DispatchMeta,
    ) -> Result<(), BackendError> {
        let AgentTarget::UiAutomation {
            window_title,
            focus_xy,
            input_xy,
        } = target
        else {
            return Err(BackendError::Unsupported(format!(
                "ui automation cannot deliver to a {} target",
                target.kind()
            )));
        };

        tracing::debug!(
            agent = %message.agent_id,
            window = %window_title,
            focus = %focus_xy,
            input = %input_xy,
            driver = self.driver.name(),
            "Typing message into agent window"
        );

        self.driver.activate_window(window_title).await?;
        self.settle().await;
        self.driver.click(*focus_xy).await?;
        self.settle().await;
        self.driver.click(*input_xy).await?;
        self.settle().await;
        self.driver
            .paste_text(&compose_ui_text(message, meta))
            .await?;
        self.settle().await;
        self.driver.press_enter().await?;

        tracing::info!(
            agent = %message.agent_id,
            request_id = %message.request_id,
            "Message delivered via UI automation"
        );
        Ok(())
    }

    async fn receive(&self, target: &AgentTarget) -> Result<String, BackendError> {
        match target {
            AgentTarget::UiAutomation { window_title, .. } => {
                self.driver.read_text(window_title).await
            }
            other => Err(BackendError::Unsupported(format!(
                "cannot read agent output from a {} target",
                other.kind()
            ))),
        }
    }
}
