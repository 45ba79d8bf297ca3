// ABOUTME: Message router - validates producer messages, queues them, and runs the single routing worker.
// ABOUTME: The worker owns a dedicated thread and current-thread runtime; at most one dispatch is in flight.

use crate::dispatch::DispatchResult;
use crate::gateway::MessagingGateway;
use crate::message::{InboundMessage, Message, RoutingResult};
use crate::metrics;
use crate::queue::{MessageQueue, QueueDiscipline};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};
use tokio::sync::{broadcast, watch};

pub const DEFAULT_HISTORY_LIMIT: usize = 500;
pub const DEFAULT_STOP_TIMEOUT: Duration = Duration::from_secs(2);
const EVENT_CAPACITY: usize = 256;
const JOIN_POLL: Duration = Duration::from_millis(10);

#[derive(Debug, Clone)]
pub struct RouterOptions {
    pub discipline: QueueDiscipline,
    /// Extra attempts for a message whose dispatch did not go through
    pub max_retries: u32,
    pub history_limit: usize,
}

impl Default for RouterOptions {
    fn default() -> Self {
        Self {
            discipline: QueueDiscipline::Fifo,
            max_retries: 0,
            history_limit: DEFAULT_HISTORY_LIMIT,
        }
    }
}

/// Outcome of one dequeued message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteRecord {
    pub message_id: String,
    pub recipient: String,
    pub result: RoutingResult,
    /// 1 for the first attempt
    pub attempt: u32,
    pub dispatches: Vec<DispatchResult>,
    pub routed_at: DateTime<Utc>,
}

/// State shared between the router handle and its worker thread.
struct RouterCore {
    gateway: Arc<MessagingGateway>,
    queue: MessageQueue,
    max_retries: u32,
    history: Mutex<VecDeque<RouteRecord>>,
    history_limit: usize,
    events: broadcast::Sender<RouteRecord>,
}

impl RouterCore {
    async fn process(&self, message: Message) {
        let meta = message.dispatch_meta();
        let dispatches = if message.is_broadcast() {
            self.gateway.broadcast(message.content(), meta).await
        } else {
            vec![
                self.gateway
                    .send(message.recipient(), message.content(), meta)
                    .await,
            ]
        };

        let settled = !dispatches.is_empty() && dispatches.iter().all(|d| d.status().is_settled());
        let result = if settled {
            RoutingResult::Success
        } else if message.retry_count() < self.max_retries {
            let depth = self.queue.push(message.next_attempt());
            metrics::set_queue_depth(depth);
            RoutingResult::Retry
        } else {
            RoutingResult::Failed
        };

        let record = RouteRecord {
            message_id: message.id().to_string(),
            recipient: message.recipient().to_string(),
            result,
            attempt: message.retry_count() + 1,
            dispatches,
            routed_at: Utc::now(),
        };

        match result {
            RoutingResult::Success => tracing::debug!(
                message_id = %record.message_id,
                recipient = %record.recipient,
                "Message routed"
            ),
            _ => tracing::warn!(
                message_id = %record.message_id,
                recipient = %record.recipient,
                result = %result,
                attempt = record.attempt,
                "Message dispatch did not complete"
            ),
        }
        self.publish(record);
    }

    /// Record a dispatch that panicked. The message is not retried.
    fn record_panic(&self, message_id: String, recipient: String, attempt: u32, reason: String) {
        tracing::error!(
            message_id = %message_id,
            recipient = %recipient,
            panic = %reason,
            "Dispatch panicked, message marked failed"
        );
        self.publish(RouteRecord {
            message_id,
            recipient,
            result: RoutingResult::Failed,
            attempt,
            dispatches: Vec::new(),
            routed_at: Utc::now(),
        });
    }

    fn publish(&self, record: RouteRecord) {
        metrics::record_message_routed(record.result.as_str());
        {
            let mut history = self.history.lock().unwrap_or_else(|e| e.into_inner());
            history.push_back(record.clone());
            while history.len() > self.history_limit {
                history.pop_front();
            }
        }
        // No subscribers is fine
        let _ = self.events.send(record);
    }
}

fn panic_reason(err: tokio::task::JoinError) -> String {
    match err.try_into_panic() {
        Ok(payload) => payload
            .downcast_ref::<&str>()
            .map(|s| s.to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "non-string panic payload".to_string()),
        Err(err) => err.to_string(),
    }
}

async fn run_worker(core: Arc<RouterCore>, mut stop: watch::Receiver<bool>) {
    tracing::info!(discipline = %core.queue.discipline(), "Routing worker started");
    loop {
        if *stop.borrow() {
            break;
        }
        let message = tokio::select! {
            biased;
            _ = stop.changed() => break,
            message = core.queue.pop() => message,
        };
        metrics::set_queue_depth(core.queue.len());

        // A panic inside dispatch stays in its own task
        let message_id = message.id().to_string();
        let recipient = message.recipient().to_string();
        let attempt = message.retry_count() + 1;
        let task = tokio::spawn({
            let core = Arc::clone(&core);
            async move { core.process(message).await }
        });
        if let Err(e) = task.await {
            core.record_panic(message_id, recipient, attempt, panic_reason(e));
        }
    }
    tracing::info!(pending = core.queue.len(), "Routing worker stopped");
}

struct Worker {
    stop: watch::Sender<bool>,
    thread: JoinHandle<()>,
}

impl Worker {
    fn stopping(&self) -> bool {
        *self.stop.borrow()
    }
}

pub struct MessageRouter {
    core: Arc<RouterCore>,
    worker: Mutex<Option<Worker>>,
}

impl MessageRouter {
    pub fn new(gateway: Arc<MessagingGateway>, options: RouterOptions) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            core: Arc::new(RouterCore {
                gateway,
                queue: MessageQueue::new(options.discipline),
                max_retries: options.max_retries,
                history: Mutex::new(VecDeque::new()),
                history_limit: options.history_limit.max(1),
                events,
            }),
            worker: Mutex::new(None),
        }
    }

    pub fn gateway(&self) -> &Arc<MessagingGateway> {
        &self.core.gateway
    }

    /// Validate and enqueue a producer message. Never waits for dispatch.
    pub fn route_message(&self, message: Option<InboundMessage>) -> RoutingResult {
        let Some(inbound) = message else {
            tracing::warn!("Rejected empty message");
            metrics::record_message_rejected();
            return RoutingResult::Failed;
        };
        match Message::try_from(inbound) {
            Ok(message) => self.route(message),
            Err(e) => {
                tracing::warn!(error = %e, "Rejected invalid message");
                metrics::record_message_rejected();
                RoutingResult::Failed
            }
        }
    }

    /// Enqueue an already validated message.
    pub fn route(&self, message: Message) -> RoutingResult {
        tracing::debug!(
            message_id = %message.id(),
            recipient = %message.recipient(),
            priority = %message.priority(),
            "Message queued"
        );
        let depth = self.core.queue.push(message);
        metrics::set_queue_depth(depth);
        RoutingResult::Queued
    }

    /// Spawn the routing worker. Returns false if one is already running or stopping.
    pub fn start(&self) -> bool {
        let mut slot = self.worker.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(existing) = slot.as_ref().filter(|w| !w.thread.is_finished()) {
            tracing::warn!(
                stopping = existing.stopping(),
                "Routing worker already active, start ignored"
            );
            return false;
        }
        if let Some(finished) = slot.take() {
            if finished.thread.join().is_err() {
                tracing::error!("Previous routing worker panicked");
            }
        }

        let runtime = match tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
        {
            Ok(rt) => rt,
            Err(e) => {
                tracing::error!(error = %e, "Failed to create routing worker runtime");
                return false;
            }
        };
        let (stop_tx, stop_rx) = watch::channel(false);
        let core = Arc::clone(&self.core);
        let spawned = std::thread::Builder::new()
            .name("switchboard-router".to_string())
            .spawn(move || runtime.block_on(run_worker(core, stop_rx)));

        match spawned {
            Ok(thread) => {
                *slot = Some(Worker {
                    stop: stop_tx,
                    thread,
                });
                true
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to spawn routing worker thread");
                false
            }
        }
    }

    /// Ask the worker to exit after its current dispatch. Returns false when
    /// there was nothing to stop.
    pub fn stop(&self) -> bool {
        let slot = self.worker.lock().unwrap_or_else(|e| e.into_inner());
        match slot.as_ref() {
            Some(worker) if !worker.stopping() && !worker.thread.is_finished() => {
                // send_replace works even if the worker already dropped its receiver
                worker.stop.send_replace(true);
                tracing::info!("Routing worker stop requested");
                true
            }
            _ => false,
        }
    }

    /// Wait up to `timeout` for the worker thread to exit. A worker still
    /// alive afterwards is reported and left in place.
    pub fn join(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        loop {
            {
                let mut slot = self.worker.lock().unwrap_or_else(|e| e.into_inner());
                match slot.as_ref().map(|w| w.thread.is_finished()) {
                    None => return true,
                    Some(true) => {
                        if let Some(worker) = slot.take() {
                            if worker.thread.join().is_err() {
                                tracing::error!("Routing worker panicked");
                            }
                        }
                        return true;
                    }
                    Some(false) if Instant::now() >= deadline => {
                        tracing::warn!(
                            timeout_ms = timeout.as_millis() as u64,
                            "Routing worker still running after join timeout"
                        );
                        return false;
                    }
                    Some(false) => {}
                }
            }
            std::thread::sleep(JOIN_POLL);
        }
    }

    /// Stop and join.
    pub fn shutdown(&self, timeout: Duration) -> bool {
        self.stop();
        self.join(timeout)
    }

    pub fn is_running(&self) -> bool {
        self.worker
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .as_ref()
            .is_some_and(|w| !w.stopping() && !w.thread.is_finished())
    }

    pub fn queue_len(&self) -> usize {
        self.core.queue.len()
    }

    /// Receive every route record produced from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<RouteRecord> {
        self.core.events.subscribe()
    }

    /// Most recent route records, oldest first.
    pub fn history(&self) -> Vec<RouteRecord> {
        self.core
            .history
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .cloned()
            .collect()
    }
}

impl Drop for MessageRouter {
    fn drop(&mut self) {
        self.stop();
    }
}
