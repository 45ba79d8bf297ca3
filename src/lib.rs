// ABOUTME: Composition root wiring config, coordinates, backends, gateway and router together
// ABOUTME: Also drives line-delimited JSON routing for the CLI `route` command

pub use switchboard_core::{config, paths};

use anyhow::{Context, Result};
use serde::Serialize;
use std::sync::Arc;
use switchboard_core::config::Config;
use switchboard_core::{
    CoordinateStore, InboundMessage, LifecycleTracker, MessageRouter, MessagingGateway,
    RoutingResult,
};
use switchboard_delivery::notify::WebhookNotifier;
use switchboard_delivery::{
    CoordinationCache, DeliveryBackend, DriverKind, DriverRegistry, InboxBackend,
    UiAutomationBackend, WebhookBackend,
};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::broadcast::error::RecvError;

/// Every long-lived component, built once and shared by `Arc`.
pub struct Switchboard {
    config: Config,
    gateway: Arc<MessagingGateway>,
    router: Arc<MessageRouter>,
    notifier: WebhookNotifier,
    ui_driver: Option<DriverKind>,
}

impl Switchboard {
    /// Build every component from configuration. Does not start the router.
    pub fn build(config: Config) -> Result<Self> {
        Self::build_with_registry(config, &DriverRegistry::default())
    }

    /// Like [`Switchboard::build`] with a caller-supplied UI driver registry.
    pub fn build_with_registry(config: Config, registry: &DriverRegistry) -> Result<Self> {
        let coordinates = Arc::new(CoordinateStore::load(&config.coordinates.path));

        let ui_driver = match registry.select(config.ui.driver) {
            Ok((kind, driver)) => Some((
                kind,
                UiAutomationBackend::new(driver).with_step_delay(config.ui.step_delay()),
            )),
            Err(e) => {
                tracing::warn!(error = %e, "UI automation disabled, falling back to inbox delivery");
                None
            }
        };

        let webhook = Arc::new(
            WebhookBackend::with_timeout(config.webhook.url.clone(), config.webhook.timeout())
                .context("Failed to build webhook HTTP client")?
                .with_identity(
                    config.webhook.username.clone(),
                    config.webhook.avatar_url.clone(),
                ),
        );
        let cache = Arc::new(CoordinationCache::new(
            config.webhook.cache_file(),
            config.webhook.cache_limit,
        ));
        let lifecycle = Arc::new(LifecycleTracker::new());

        let mut builder = MessagingGateway::builder(Arc::clone(&coordinates))
            .inbox_backend(Arc::new(InboxBackend::new(&config.gateway.workspace_root)))
            .webhook_backend(Arc::clone(&webhook) as Arc<dyn DeliveryBackend>)
            .ui_agents(config.gateway.ui_agents.iter().cloned())
            .dry_run(config.gateway.dry_run)
            .summary_prompt(config.gateway.summary_prompt.clone())
            .cache(Arc::clone(&cache))
            .lifecycle(lifecycle);
        let ui_kind = match ui_driver {
            Some((kind, backend)) => {
                builder = builder.ui_backend(Arc::new(backend));
                Some(kind)
            }
            None => None,
        };
        let gateway = Arc::new(builder.build());

        let router = Arc::new(MessageRouter::new(Arc::clone(&gateway), config.router.options()));
        let notifier = WebhookNotifier::new(webhook).with_cache(cache);

        tracing::info!(
            agents = coordinates.len(),
            default_roster = coordinates.is_default(),
            ui_driver = ?ui_kind,
            dry_run = config.gateway.dry_run,
            queue = %config.router.queue,
            "Switchboard assembled"
        );

        Ok(Self {
            config,
            gateway,
            router,
            notifier,
            ui_driver: ui_kind,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn gateway(&self) -> &Arc<MessagingGateway> {
        &self.gateway
    }

    pub fn router(&self) -> &MessageRouter {
        &self.router
    }

    pub fn notifier(&self) -> &WebhookNotifier {
        &self.notifier
    }

    /// Driver behind the UI automation backend, if one could be selected.
    pub fn ui_driver(&self) -> Option<DriverKind> {
        self.ui_driver
    }

    /// Stop the routing worker and wait for it within the configured timeout.
    /// Blocks the calling thread while waiting.
    pub fn shutdown(&self) -> bool {
        self.router.shutdown(self.config.router.stop_timeout())
    }

    /// Route one JSON message per input line and write each route record as
    /// a JSON line. Returns once every accepted message reached a final result.
    pub async fn route_lines<R, W>(&self, input: R, mut output: W) -> Result<RouteSummary>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut events = self.router.subscribe();
        self.router.start();

        let mut summary = RouteSummary::default();
        let mut lines = input.lines();
        while let Some(line) = lines.next_line().await.context("Failed to read input")? {
            if line.trim().is_empty() {
                continue;
            }
            let inbound = match serde_json::from_str::<InboundMessage>(&line) {
                Ok(inbound) => Some(inbound),
                Err(e) => {
                    tracing::warn!(error = %e, "Input line is not a JSON message");
                    None
                }
            };
            match self.router.route_message(inbound) {
                RoutingResult::Queued => summary.queued += 1,
                _ => summary.rejected += 1,
            }
        }

        while summary.settled() < summary.queued {
            let record = match events.recv().await {
                Ok(record) => record,
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "Route records dropped before they were printed");
                    summary.dropped += skipped as usize;
                    continue;
                }
                Err(RecvError::Closed) => break,
            };
            match record.result {
                RoutingResult::Success => summary.succeeded += 1,
                RoutingResult::Failed => summary.failed += 1,
                _ => {}
            }
            let mut line = serde_json::to_vec(&record)?;
            line.push(b'\n');
            output.write_all(&line).await?;
        }
        output.flush().await?;

        // Joining polls with a blocking sleep, keep it off the async worker
        let router = Arc::clone(&self.router);
        let timeout = self.config.router.stop_timeout();
        tokio::task::spawn_blocking(move || router.shutdown(timeout))
            .await
            .context("Router shutdown task failed")?;
        Ok(summary)
    }
}

/// Counts reported by [`Switchboard::route_lines`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RouteSummary {
    pub queued: usize,
    pub rejected: usize,
    pub succeeded: usize,
    pub failed: usize,
    /// Records the output fell too far behind to print
    pub dropped: usize,
}

impl RouteSummary {
    fn settled(&self) -> usize {
        self.succeeded + self.failed + self.dropped
    }
}
