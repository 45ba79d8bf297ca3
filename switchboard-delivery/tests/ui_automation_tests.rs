// ABOUTME: Tests for the UI automation backend driven by a recording driver.
// ABOUTME: Checks step order, text composition, and failure propagation.

use std::sync::Arc;
use std::time::Duration;
use switchboard_delivery::testing::{RecordingDriver, UiStep};
use switchboard_delivery::{
    AgentTarget, BackendError, DeliveryBackend, DispatchMeta, MessageType, OutboundMessage, Point,
    Priority, UiAutomationBackend,
};

fn window() -> AgentTarget {
    AgentTarget::ui("Cursor - Agent-1", Point::new(-1265, 171), Point::new(-1269, 481))
}

fn backend(driver: &RecordingDriver) -> UiAutomationBackend {
    UiAutomationBackend::new(Arc::new(driver.clone())).with_step_delay(Duration::ZERO)
}

#[tokio::test]
async fn test_steps_run_in_order() {
    let driver = RecordingDriver::new();
    let message = OutboundMessage::new("m-1", "Agent-1", "Review PR 12");
    let meta = DispatchMeta::from_sender("Agent-4")
        .with_priority(Priority::High)
        .with_type(MessageType::AgentToAgent);

    backend(&driver).send(&message, &window(), &meta).await.unwrap();

    assert_eq!(
        driver.steps(),
        vec![
            UiStep::Activate("Cursor - Agent-1".to_string()),
            UiStep::Click(Point::new(-1265, 171)),
            UiStep::Click(Point::new(-1269, 481)),
            UiStep::Paste("[AGENT_TO_AGENT] Agent-4 -> Agent-1 (high):\nReview PR 12".to_string()),
            UiStep::Enter,
        ]
    );
}

#[tokio::test]
async fn test_minimal_meta_pastes_bare_text() {
    let driver = RecordingDriver::new();
    let message = OutboundMessage::new("m-2", "Agent-1", "just the text");
    let meta = DispatchMeta::from_sender("Agent-4").minimal();

    backend(&driver).send(&message, &window(), &meta).await.unwrap();

    assert!(driver
        .steps()
        .contains(&UiStep::Paste("just the text".to_string())));
}

#[tokio::test]
async fn test_paste_failure_stops_before_enter() {
    let driver = RecordingDriver::new().failing_paste();
    let message = OutboundMessage::new("m-3", "Agent-1", "hello");

    let err = backend(&driver)
        .send(&message, &window(), &DispatchMeta::default())
        .await
        .unwrap_err();

    assert!(matches!(err, BackendError::Driver(_)));
    assert!(!driver.steps().contains(&UiStep::Enter));
}

#[tokio::test]
async fn test_non_ui_target_is_unsupported() {
    let driver = RecordingDriver::new();
    let message = OutboundMessage::new("m-4", "Agent-7", "hello");

    let err = backend(&driver)
        .send(&message, &AgentTarget::inbox("/tmp/inbox"), &DispatchMeta::default())
        .await
        .unwrap_err();

    assert!(matches!(err, BackendError::Unsupported(_)));
    assert!(driver.steps().is_empty());
}

#[tokio::test]
async fn test_receive_reads_window_text() {
    let driver = RecordingDriver::new().with_window_text("Contract C-12 done");
    let ui = backend(&driver);

    assert_eq!(ui.receive(&window()).await.unwrap(), "Contract C-12 done");
    assert_eq!(
        driver.steps(),
        vec![UiStep::Read("Cursor - Agent-1".to_string())]
    );

    let empty = RecordingDriver::new();
    assert!(backend(&empty).receive(&window()).await.is_err());
}

#[tokio::test(start_paused = true)]
async fn test_step_delay_is_applied_between_steps() {
    let driver = RecordingDriver::new();
    let ui = UiAutomationBackend::new(Arc::new(driver.clone()))
        .with_step_delay(Duration::from_millis(100));
    let message = OutboundMessage::new("m-5", "Agent-1", "hello");

    let started = tokio::time::Instant::now();
    ui.send(&message, &window(), &DispatchMeta::default())
        .await
        .unwrap();

    // Four pauses between five steps
    assert!(started.elapsed() >= Duration::from_millis(400));
    assert_eq!(ui.driver_name(), "recording");
}
