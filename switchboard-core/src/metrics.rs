// ABOUTME: Metric helpers for routing and dispatch, recorded through the `metrics` facade.
// ABOUTME: No exporter is installed here; whichever recorder the host installs receives them.

use std::time::Duration;

pub const MESSAGES_ROUTED: &str = "switchboard_messages_routed_total";
pub const MESSAGES_REJECTED: &str = "switchboard_messages_rejected_total";
pub const DISPATCHES: &str = "switchboard_dispatches_total";
pub const DISPATCH_DURATION: &str = "switchboard_dispatch_duration_seconds";
pub const QUEUE_DEPTH: &str = "switchboard_queue_depth";
pub const BACKEND_FAILURES: &str = "switchboard_backend_failures_total";

/// Worker finished with a message.
pub fn record_message_routed(result: &'static str) {
    metrics::counter!(MESSAGES_ROUTED, "result" => result).increment(1);
}

/// Producer submitted something the validator refused.
pub fn record_message_rejected() {
    metrics::counter!(MESSAGES_REJECTED).increment(1);
}

pub fn record_dispatch(backend: &'static str, status: &'static str, elapsed: Duration) {
    metrics::counter!(DISPATCHES, "backend" => backend, "status" => status).increment(1);
    metrics::histogram!(DISPATCH_DURATION, "backend" => backend).record(elapsed.as_secs_f64());
}

pub fn record_backend_failure(backend: &'static str) {
    metrics::counter!(BACKEND_FAILURES, "backend" => backend).increment(1);
}

pub fn set_queue_depth(depth: usize) {
    metrics::gauge!(QUEUE_DEPTH).set(depth as f64);
}
