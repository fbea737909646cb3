//! The per-message processing pipeline.
//!
//! Order is fixed: watermark gate, user resolution, classification,
//! handler dispatch, context persistence, watermark advance. A message
//! is only marked processed after dispatch, so a crash mid-pipeline
//! leads to a redelivery retry rather than a lost message.

use chrono::Utc;
use kora_core::{
    error::KoraError,
    message::{Message, ProcessOutcome},
    traits::UserLookup,
    user::{User, UserLevel},
};
use kora_watermark::Decision;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::dispatch::Inbound;
use super::Gateway;
use crate::replies;

impl Gateway {
    /// Run one message through the pipeline and return what (if
    /// anything) to send back.
    pub async fn process_message(&self, msg: Message) -> ProcessOutcome {
        if let Decision::Reject(reason) = self.tracker.should_process(&msg) {
            debug!("skipping message {}: {reason:?}", msg.id);
            return ProcessOutcome::silent();
        }

        // A directory failure leaves the message unmarked so a
        // redelivery can retry once the database is back.
        let user = match self.resolve_user(&msg).await {
            Ok(user) => user,
            Err(e) => {
                error!("user resolution failed for {}: {e}", msg.conversation_id);
                return ProcessOutcome::silent();
            }
        };

        if !user.active {
            debug!("ignoring message from deactivated user {}", user.id);
            self.tracker.mark_processed(&msg).await;
            return ProcessOutcome::silent();
        }

        let classification = self.classifier.classify(&msg.text);
        debug!(
            "message {} classified as {:?} ({:.2})",
            msg.id, classification.category, classification.confidence,
        );

        let had_flow = self.flows.active_context(&user.id).is_some();
        let inbound = Inbound {
            message: msg.clone(),
            classification,
            user,
        };

        let result = self.dispatcher.dispatch(&inbound).await;

        // Keep the persisted context in step with the in-memory one.
        match self.flows.active_context(&inbound.user.id) {
            Some(ctx) => {
                if let Err(e) = self.directory.save_context(&ctx).await {
                    warn!("failed to persist context for {}: {e}", inbound.user.id);
                }
            }
            None if had_flow => {
                if let Err(e) = self.directory.remove_context(&inbound.user.id).await {
                    warn!("failed to remove context for {}: {e}", inbound.user.id);
                }
            }
            None => {}
        }

        self.tracker.mark_processed(&msg).await;

        match result {
            Some(result) => match result.response {
                Some(text) => ProcessOutcome::reply(text),
                None => ProcessOutcome::silent(),
            },
            None => ProcessOutcome::reply(replies::fallback(
                inbound.classification.category,
                &inbound.user.language,
            )),
        }
    }

    /// Look the sender up in the directory, registering them on first
    /// contact with the default profile.
    async fn resolve_user(&self, msg: &Message) -> Result<User, KoraError> {
        if let Some(user) = self
            .directory
            .get_user_by_conversation(&msg.conversation_id)
            .await?
        {
            return Ok(user);
        }

        let user = User {
            id: Uuid::new_v4().to_string(),
            conversation_id: msg.conversation_id.clone(),
            display_name: None,
            level: UserLevel::Basic,
            active: true,
            language: "es".to_string(),
            created_at: Utc::now(),
        };
        self.directory.create_user(&user).await?;
        info!(
            "new user {} registered for conversation {}",
            user.id, user.conversation_id
        );
        Ok(user)
    }
}
