//! Gateway — the main loop connecting the transport, the watermark
//! tracker, the classifier, the directory, and the handler chain.
//!
//! Includes: automatic user registration, flow context persistence,
//! periodic expiry sweeps, and graceful shutdown with a final snapshot.

mod dispatch;
mod handlers;
mod pipeline;
mod stdio;

pub use dispatch::{Dispatcher, Handler, HandlerResult, Inbound};
pub use stdio::StdioGateway;

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::Utc;
use kora_classifier::Classifier;
use kora_core::{
    config::Config,
    error::KoraError,
    message::Message,
    traits::{MessageGateway, MessageSender, UserLookup},
};
use kora_directory::Directory;
use kora_flows::ContextManager;
use kora_watermark::WatermarkTracker;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::commands::builtins::{build_registry, register_builtin_flows};
use crate::commands::cooldown::CooldownMap;
use crate::commands::permissions::PermissionService;
use handlers::{CommandHandler, ContextualHandler, FlowHandler};

/// Adapts the transport to the narrow send capability handlers get.
struct TransportSender(Arc<dyn MessageGateway>);

#[async_trait]
impl MessageSender for TransportSender {
    async fn send_text(&self, conversation_id: &str, text: &str) -> Result<(), KoraError> {
        self.0.send(conversation_id, text).await
    }
}

/// The central gateway routing inbound messages through the pipeline.
pub struct Gateway {
    pub(super) transport: Arc<dyn MessageGateway>,
    pub(super) directory: Directory,
    pub(super) tracker: Arc<WatermarkTracker>,
    pub(super) classifier: Classifier,
    pub(super) flows: Arc<ContextManager>,
    pub(super) dispatcher: Dispatcher,
    pub(super) cooldowns: Arc<CooldownMap>,
    pub(super) cleanup_interval: Duration,
    pub(super) uptime: Instant,
}

impl Gateway {
    /// Wire up the full pipeline: flows, registry, permissions, handler
    /// chain. Restores persisted flow contexts from the directory.
    pub async fn new(
        config: &Config,
        transport: Arc<dyn MessageGateway>,
        directory: Directory,
        tracker: Arc<WatermarkTracker>,
    ) -> Result<Self, KoraError> {
        let classifier = Classifier::new(config.classifier.clone());

        let mut flows = ContextManager::new();
        register_builtin_flows(
            &mut flows,
            chrono::Duration::seconds(config.flows.max_duration_secs as i64),
        )?;
        let saved = directory.load_active_contexts().await?;
        if !saved.is_empty() {
            info!("restoring {} active flow context(s)", saved.len());
            flows.restore(saved);
        }
        let flows = Arc::new(flows);

        let registry = Arc::new(build_registry(config.commands.case_insensitive)?);
        let permissions = Arc::new(PermissionService::new(config));
        let cooldowns = Arc::new(CooldownMap::new());
        let sender: Arc<dyn MessageSender> = Arc::new(TransportSender(transport.clone()));
        let directory_lookup: Arc<dyn UserLookup> = Arc::new(directory.clone());
        let uptime = Instant::now();

        let dispatcher = Dispatcher::new(vec![
            Arc::new(CommandHandler {
                prefix: config.classifier.prefix,
                registry,
                permissions,
                cooldowns: cooldowns.clone(),
                directory: directory_lookup.clone(),
                flows: flows.clone(),
                uptime,
                session_id: tracker.session_id().to_string(),
            }) as Arc<dyn Handler>,
            Arc::new(FlowHandler {
                flows: flows.clone(),
                directory: directory_lookup,
                sender,
            }),
            Arc::new(ContextualHandler),
        ]);

        Ok(Self {
            transport,
            directory,
            tracker,
            classifier,
            flows,
            dispatcher,
            cooldowns,
            cleanup_interval: Duration::from_secs(config.flows.cleanup_interval_secs),
            uptime,
        })
    }

    /// Run the main event loop until the inbound channel closes or a
    /// shutdown signal arrives.
    pub async fn run(self: Arc<Self>, mut rx: mpsc::Receiver<Message>) -> anyhow::Result<()> {
        info!(
            "Kora gateway running | transport: {} | session: {}",
            self.transport.name(),
            self.tracker.session_id(),
        );

        let mut cleanup = tokio::time::interval(self.cleanup_interval);
        cleanup.tick().await; // first tick fires immediately

        loop {
            tokio::select! {
                incoming = rx.recv() => {
                    let Some(msg) = incoming else {
                        info!("inbound channel closed");
                        break;
                    };
                    let outcome = self.process_message(msg.clone()).await;
                    if outcome.should_reply {
                        if let Some(text) = outcome.response {
                            if let Err(e) = self.transport.send(&msg.conversation_id, &text).await {
                                error!("failed to send reply to {}: {e}", msg.conversation_id);
                            }
                        }
                    }
                }
                _ = cleanup.tick() => {
                    self.sweep().await;
                }
                _ = tokio::signal::ctrl_c() => {
                    info!("Received shutdown signal");
                    break;
                }
            }
        }

        self.shutdown().await;
        Ok(())
    }

    /// Periodic maintenance: reap expired flows, drop stale cooldowns.
    /// A reaped flow that already reached its terminal step still gets
    /// its profile patch applied.
    async fn sweep(&self) {
        let reaped = self.flows.cleanup_expired();
        for (user_id, completion) in &reaped {
            if let Err(e) = self.directory.remove_context(user_id).await {
                warn!("failed to remove expired context for {user_id}: {e}");
            }
            if let Some(completion) = completion {
                let patch = handlers::completion_patch(completion);
                if let Err(e) = self.directory.update_user(user_id, &patch).await {
                    warn!(
                        "profile update for expired flow '{}' failed: {e}",
                        completion.flow_id
                    );
                }
            }
        }
        let dropped = self.cooldowns.sweep(Utc::now());
        if !reaped.is_empty() || dropped > 0 {
            debug!("sweep: {} flow(s) expired, {dropped} cooldown(s) dropped", reaped.len());
        }
    }

    /// Graceful shutdown: persist active contexts and the watermark.
    async fn shutdown(&self) {
        info!("Shutting down...");

        for ctx in self.flows.export_active() {
            if let Err(e) = self.directory.save_context(&ctx).await {
                warn!("failed to persist context for {}: {e}", ctx.user_id);
            }
        }

        if let Err(e) = self.tracker.snapshot().await {
            warn!("final watermark snapshot failed: {e}");
        }

        info!("Shutdown complete.");
    }
}
