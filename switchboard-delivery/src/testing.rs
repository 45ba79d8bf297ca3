// ABOUTME: Recording test doubles for delivery backends and UI drivers.
// ABOUTME: Allows deterministic gateway and router tests without touching screens, disks, or networks.
//!
//! # Example
//!
//! ```no_run
//! use switchboard_delivery::testing::{RecordingBackend, ScriptedOutcome};
//! use switchboard_delivery::BackendKind;
//!
//! let ui = RecordingBackend::new(BackendKind::UiAutomation)
//!     .then(ScriptedOutcome::Fail("window not found".to_string()));
//! let inbox = RecordingBackend::new(BackendKind::Inbox);
//! // hand clones to the gateway, keep the originals to inspect calls
//! # let _ = (ui, inbox);
//! ```

use crate::envelope::{DispatchMeta, OutboundMessage};
use crate::target::{AgentTarget, Point};
use crate::traits::{BackendError, BackendKind, DeliveryBackend};
use crate::ui::UiDriver;
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// What the next `send` call should do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptedOutcome {
    Deliver,
    /// Answer `BackendError::Rejected`
    Reject(String),
    /// Answer `BackendError::Transport`
    Fail(String),
    /// Answer `MetadataUnsupported` unless the metadata is minimal.
    /// Consumed per call like any other outcome.
    RequireMinimalMeta,
    /// Panic inside `send`, as a misbehaving backend would.
    Panic(String),
}

/// One recorded `send` call.
#[derive(Debug, Clone)]
pub struct RecordedSend {
    pub message: OutboundMessage,
    pub target: AgentTarget,
    pub meta: DispatchMeta,
}

struct RecordingState {
    script: Mutex<VecDeque<ScriptedOutcome>>,
    fallback: Mutex<ScriptedOutcome>,
    sends: Mutex<Vec<RecordedSend>>,
    receive_text: Mutex<Option<String>>,
    delay: Mutex<Duration>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

/// Backend that records every call and answers from a script.
///
/// Clones share state, so a test can hand one clone to the gateway and
/// inspect calls through another.
#[derive(Clone)]
pub struct RecordingBackend {
    kind: BackendKind,
    state: Arc<RecordingState>,
}

impl RecordingBackend {
    pub fn new(kind: BackendKind) -> Self {
        Self {
            kind,
            state: Arc::new(RecordingState {
                script: Mutex::new(VecDeque::new()),
                fallback: Mutex::new(ScriptedOutcome::Deliver),
                sends: Mutex::new(Vec::new()),
                receive_text: Mutex::new(None),
                delay: Mutex::new(Duration::ZERO),
                in_flight: AtomicUsize::new(0),
                max_in_flight: AtomicUsize::new(0),
            }),
        }
    }

    /// Queue an outcome for the next call.
    pub fn then(self, outcome: ScriptedOutcome) -> Self {
        self.push_outcome(outcome);
        self
    }

    /// Outcome used once the script is exhausted.
    pub fn otherwise(self, outcome: ScriptedOutcome) -> Self {
        self.set_fallback(outcome);
        self
    }

    /// Text returned by `receive`; `None` makes `receive` fail.
    pub fn with_receive_text(self, text: Option<&str>) -> Self {
        self.set_receive_text(text);
        self
    }

    /// Queue an outcome on a backend that has already been handed out.
    pub fn push_outcome(&self, outcome: ScriptedOutcome) {
        self.state
            .script
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push_back(outcome);
    }

    pub fn set_fallback(&self, outcome: ScriptedOutcome) {
        *self.state.fallback.lock().unwrap_or_else(|e| e.into_inner()) = outcome;
    }

    pub fn set_receive_text(&self, text: Option<&str>) {
        *self
            .state
            .receive_text
            .lock()
            .unwrap_or_else(|e| e.into_inner()) = text.map(str::to_string);
    }

    /// Hold every send for `delay` to widen race windows in tests.
    pub fn with_delay(self, delay: Duration) -> Self {
        *self.state.delay.lock().unwrap_or_else(|e| e.into_inner()) = delay;
        self
    }

    pub fn sends(&self) -> Vec<RecordedSend> {
        self.state
            .sends
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn send_count(&self) -> usize {
        self.state
            .sends
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .len()
    }

    /// Highest number of sends observed running at the same time.
    pub fn max_in_flight(&self) -> usize {
        self.state.max_in_flight.load(Ordering::SeqCst)
    }

    fn next_outcome(&self) -> ScriptedOutcome {
        let scripted = self
            .state
            .script
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .pop_front();
        scripted.unwrap_or_else(|| {
            self.state
                .fallback
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .clone()
        })
    }
}

#[async_trait]
impl DeliveryBackend for RecordingBackend {
    fn kind(&self) -> BackendKind {
        self.kind
    }

    async fn send(
        &self,
        message: &OutboundMessage,
        target: &AgentTarget,
        meta: &DispatchMeta,
    ) -> Result<(), BackendError> {
        let current = self.state.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.state.max_in_flight.fetch_max(current, Ordering::SeqCst);

        self.state
            .sends
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(RecordedSend {
                message: message.clone(),
                target: target.clone(),
                meta: meta.clone(),
            });

        let delay = *self.state.delay.lock().unwrap_or_else(|e| e.into_inner());
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        let result = match self.next_outcome() {
            ScriptedOutcome::Deliver => Ok(()),
            ScriptedOutcome::Reject(why) => Err(BackendError::Rejected(why)),
            ScriptedOutcome::Fail(why) => Err(BackendError::Transport(why)),
            ScriptedOutcome::RequireMinimalMeta if meta.is_minimal() => Ok(()),
            ScriptedOutcome::RequireMinimalMeta => Err(BackendError::MetadataUnsupported),
            ScriptedOutcome::Panic(why) => {
                self.state.in_flight.fetch_sub(1, Ordering::SeqCst);
                panic!("{}", why);
            }
        };

        self.state.in_flight.fetch_sub(1, Ordering::SeqCst);
        result
    }

    async fn receive(&self, _target: &AgentTarget) -> Result<String, BackendError> {
        self.state
            .receive_text
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
            .ok_or_else(|| BackendError::Driver("window text unavailable".to_string()))
    }
}

/// A single step performed on a [`RecordingDriver`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UiStep {
    Activate(String),
    Click(Point),
    Paste(String),
    Enter,
    Read(String),
}

/// UI driver that records steps instead of moving the mouse.
#[derive(Clone, Default)]
pub struct RecordingDriver {
    steps: Arc<Mutex<Vec<UiStep>>>,
    fail_on_paste: bool,
    window_text: Option<String>,
}

impl RecordingDriver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_paste(mut self) -> Self {
        self.fail_on_paste = true;
        self
    }

    pub fn with_window_text(mut self, text: &str) -> Self {
        self.window_text = Some(text.to_string());
        self
    }

    pub fn steps(&self) -> Vec<UiStep> {
        self.steps.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    fn push(&self, step: UiStep) {
        self.steps
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(step);
    }
}

#[async_trait]
impl UiDriver for RecordingDriver {
    fn name(&self) -> &'static str {
        "recording"
    }

    async fn activate_window(&self, title: &str) -> Result<(), BackendError> {
        self.push(UiStep::Activate(title.to_string()));
        Ok(())
    }

    async fn click(&self, at: Point) -> Result<(), BackendError> {
        self.push(UiStep::Click(at));
        Ok(())
    }

    async fn paste_text(&self, text: &str) -> Result<(), BackendError> {
        if self.fail_on_paste {
            return Err(BackendError::Driver("clipboard unavailable".to_string()));
        }
        self.push(UiStep::Paste(text.to_string()));
        Ok(())
    }

    async fn press_enter(&self) -> Result<(), BackendError> {
        self.push(UiStep::Enter);
        Ok(())
    }

    async fn read_text(&self, title: &str) -> Result<String, BackendError> {
        self.push(UiStep::Read(title.to_string()));
        self.window_text
            .clone()
            .ok_or_else(|| BackendError::Driver(format!("no text captured for {}", title)))
    }
}
