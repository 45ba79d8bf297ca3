// ABOUTME: End-to-end tests for the assembled Switchboard built from configuration
// ABOUTME: Uses the noop UI driver and temp directories so nothing touches the desktop

use std::path::{Path, PathBuf};
use switchboard::config::Config;
use switchboard::Switchboard;
use switchboard_core::{DispatchMeta, DispatchStatus};
use switchboard_delivery::{BackendKind, DriverKind, DriverPreference, DriverRegistry};

struct Fixture {
    dir: tempfile::TempDir,
}

impl Fixture {
    fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let coordinates = serde_json::json!({
            "Agent-1": {"chat_input_coordinates": [100, 200]},
            "Agent-7": {"inbox_path": dir.path().join("agent7-inbox")},
        });
        std::fs::write(
            dir.path().join("coordinates.json"),
            serde_json::to_string(&coordinates).unwrap(),
        )
        .unwrap();
        Self { dir }
    }

    fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    fn config(&self) -> Config {
        let mut config = Config::default();
        config.coordinates.path = self.path("coordinates.json").to_string_lossy().to_string();
        config.gateway.workspace_root = self.path("workspaces").to_string_lossy().to_string();
        config.ui.driver = DriverPreference::Noop;
        config.ui.step_delay_ms = 0;
        config.webhook.cache_path = Some(self.path("cache.json").to_string_lossy().to_string());
        config
    }
}

fn file_count(dir: &Path) -> usize {
    std::fs::read_dir(dir).map(|d| d.count()).unwrap_or(0)
}

#[tokio::test]
async fn test_build_wires_ui_and_inbox_delivery() {
    let fixture = Fixture::new();
    let app = Switchboard::build(fixture.config()).unwrap();
    assert_eq!(app.ui_driver(), Some(DriverKind::Noop));
    assert!(!app.gateway().coordinates().is_default());

    let ui = app
        .gateway()
        .send("Agent-1", "hello", DispatchMeta::from_sender("Captain"))
        .await;
    assert_eq!(ui.status(), DispatchStatus::Sent);
    assert_eq!(ui.backend(), Some(BackendKind::UiAutomation));

    let inbox = app
        .gateway()
        .send("Agent-7", "hello", DispatchMeta::from_sender("Captain"))
        .await;
    assert_eq!(inbox.status(), DispatchStatus::Sent);
    assert_eq!(inbox.backend(), Some(BackendKind::Inbox));
    assert_eq!(file_count(&fixture.path("agent7-inbox")), 1);

    // Every dispatch lands in the audit cache
    let cache: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(fixture.path("cache.json")).unwrap())
            .unwrap();
    assert_eq!(cache["events"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_missing_ui_driver_falls_back_to_inbox() {
    let fixture = Fixture::new();
    let registry = DriverRegistry::new()
        .register(DriverKind::Xdotool, || Err(anyhow::anyhow!("no display")));
    let mut config = fixture.config();
    config.ui.driver = DriverPreference::Auto;

    let app = Switchboard::build_with_registry(config, &registry).unwrap();
    assert_eq!(app.ui_driver(), None);

    let result = app
        .gateway()
        .send("Agent-1", "hello", DispatchMeta::default())
        .await;
    assert_eq!(result.backend(), Some(BackendKind::Inbox));
    assert_eq!(
        file_count(&fixture.path("workspaces").join("Agent-1").join("inbox")),
        1
    );
}

#[tokio::test]
async fn test_dry_run_delivers_nothing() {
    let fixture = Fixture::new();
    let mut config = fixture.config();
    config.gateway.dry_run = true;
    let app = Switchboard::build(config).unwrap();

    let result = app
        .gateway()
        .send("Agent-7", "hello", DispatchMeta::default())
        .await;
    assert_eq!(result.status(), DispatchStatus::Skipped);
    assert_eq!(file_count(&fixture.path("agent7-inbox")), 0);
}

#[tokio::test]
async fn test_route_lines_reports_each_message() {
    let fixture = Fixture::new();
    let app = Switchboard::build(fixture.config()).unwrap();

    let input = [
        r#"{"id":"m-1","type":"agent_to_agent","sender":"Agent-2","recipient":"Agent-7","content":"sync at noon","timestamp":1767225600}"#,
        "",
        "not json at all",
        r#"{"id":"m-2","type":"agent_to_agent","recipient":"Agent-7","content":"no sender","timestamp":1767225600}"#,
        r#"{"id":"m-3","type":"status","priority":"high","sender":"Captain","recipient":"Agent-99","content":"who?","timestamp":"2026-01-01T00:00:00Z"}"#,
    ]
    .join("\n");
    let mut output = Vec::new();

    let summary = app.route_lines(input.as_bytes(), &mut output).await.unwrap();

    assert_eq!(summary.queued, 2);
    assert_eq!(summary.rejected, 2);
    assert_eq!(summary.succeeded, 1);
    assert_eq!(summary.failed, 1);
    assert!(!app.router().is_running());

    let records: Vec<serde_json::Value> = String::from_utf8(output)
        .unwrap()
        .lines()
        .map(|l| serde_json::from_str(l).unwrap())
        .collect();
    assert_eq!(records.len(), 2);
    assert_eq!(records[0]["message_id"], "m-1");
    assert_eq!(records[0]["result"], "success");
    assert_eq!(records[0]["dispatches"][0]["backend"], "inbox");
    assert_eq!(records[1]["message_id"], "m-3");
    assert_eq!(records[1]["result"], "failed");
    assert_eq!(records[1]["dispatches"][0]["status"], "error");
}

#[tokio::test(flavor = "current_thread")]
async fn test_route_lines_completes_on_single_threaded_runtime() {
    let fixture = Fixture::new();
    let app = Switchboard::build(fixture.config()).unwrap();

    let input = r#"{"id":"m-1","type":"agent_to_agent","sender":"Agent-2","recipient":"Agent-7","content":"hi","timestamp":1767225600}"#;
    let mut output = Vec::new();
    let summary = tokio::time::timeout(
        std::time::Duration::from_secs(10),
        app.route_lines(input.as_bytes(), &mut output),
    )
    .await
    .expect("route_lines did not finish")
    .unwrap();

    assert_eq!(summary.succeeded, 1);
    assert!(!app.router().is_running());
    // Routing again after shutdown starts a fresh worker
    let again = app.route_lines(input.as_bytes(), Vec::new()).await.unwrap();
    assert_eq!(again.succeeded, 1);
    assert!(!app.router().is_running());
}

#[tokio::test]
async fn test_notifier_audits_to_configured_cache() {
    let fixture = Fixture::new();
    let app = Switchboard::build(fixture.config()).unwrap();

    // No webhook URL configured: the post fails but the audit entry is kept
    assert!(
        !app.notifier()
            .send_contract_assignment("C-1", "Agent-7", "Inbox cleanup", None)
            .await
    );
    let cache: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(fixture.path("cache.json")).unwrap())
            .unwrap();
    assert_eq!(cache["assignments"][0]["contract_id"], "C-1");
}
