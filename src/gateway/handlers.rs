//! The three built-in handlers: commands, active flows, contextual replies.

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use chrono::Utc;
use kora_core::classification::Category;
use kora_core::error::KoraError;
use kora_core::traits::{MessageSender, UserLookup};
use kora_core::user::UserPatch;
use kora_flows::{ContextManager, FlowCompletion, STEP_LANGUAGE, STEP_NAME};
use tracing::warn;

use super::dispatch::{Handler, HandlerResult, Inbound};
use crate::commands::cooldown::CooldownMap;
use crate::commands::permissions::{PermissionDenial, PermissionService};
use crate::commands::registry::{CommandRegistry, RegisteredCommand};
use crate::commands::CommandInvocation;
use crate::replies;

/// Executes registered commands, both prefixed and contextual.
/// Runs before everything else so `/cancel` works inside a flow.
pub struct CommandHandler {
    pub prefix: char,
    pub registry: Arc<CommandRegistry>,
    pub permissions: Arc<PermissionService>,
    pub cooldowns: Arc<CooldownMap>,
    pub directory: Arc<dyn UserLookup>,
    pub flows: Arc<ContextManager>,
    pub uptime: Instant,
    pub session_id: String,
}

impl CommandHandler {
    /// Resolve the command this message names, if any.
    ///
    /// `None` means the message is not a command at all; `Some(None)`
    /// means it looks like one but nothing matched (unknown or disabled
    /// prefixed command).
    fn resolve<'a>(&'a self, text: &str) -> Option<Option<(&'a RegisteredCommand, String)>> {
        if let Some(stripped) = text.strip_prefix(self.prefix) {
            let stripped = stripped.trim_start();
            let (token, args) = match stripped.split_once(char::is_whitespace) {
                Some((token, rest)) => (token, rest.trim().to_string()),
                None => (stripped, String::new()),
            };
            return Some(
                self.registry
                    .resolve(token)
                    .filter(|cmd| cmd.descriptor.enabled)
                    .map(|cmd| (cmd, args)),
            );
        }

        let lowered = text.to_lowercase();
        self.registry
            .resolve_contextual(&lowered)
            .filter(|cmd| cmd.descriptor.enabled)
            .map(|cmd| Some((cmd, String::new())))
    }
}

#[async_trait]
impl Handler for CommandHandler {
    fn name(&self) -> &'static str {
        "commands"
    }

    fn priority(&self) -> u8 {
        10
    }

    fn can_handle(&self, inbound: &Inbound) -> bool {
        self.resolve(inbound.message.text.trim()).is_some()
    }

    async fn handle(&self, inbound: &Inbound) -> Result<HandlerResult, KoraError> {
        let user = &inbound.user;
        let lang = &user.language;
        let text = inbound.message.text.trim();

        let (cmd, args) = match self.resolve(text) {
            Some(Some(found)) => found,
            Some(None) => {
                return Ok(HandlerResult::reply(replies::fallback(
                    Category::Command,
                    lang,
                )))
            }
            None => return Ok(HandlerResult::pass()),
        };
        let descriptor = &cmd.descriptor;
        let now = Utc::now();

        if let Err(denial) = self.permissions.validate(user, descriptor.min_level, now) {
            let reply = match denial {
                PermissionDenial::Level => replies::denied_level(lang),
                PermissionDenial::Window { start, end } => replies::denied_window(start, end, lang),
                PermissionDenial::Quota { quota } => replies::denied_quota(quota, lang),
            };
            return Ok(HandlerResult::reply(reply));
        }

        if let Some(remaining) = self.cooldowns.remaining(&user.id, &descriptor.name, now) {
            return Ok(HandlerResult::reply(replies::cooldown_active(
                remaining, lang,
            )));
        }

        let invocation = CommandInvocation {
            user,
            text,
            args: &args,
            directory: self.directory.as_ref(),
            flows: &self.flows,
            registry: &self.registry,
            uptime: &self.uptime,
            session_id: &self.session_id,
        };

        let started = Instant::now();
        let outcome = cmd.executor.execute(&invocation).await;
        let duration_ms = started.elapsed().as_millis() as u64;
        self.registry
            .record_execution(&descriptor.name, outcome.success, duration_ms);

        if outcome.success {
            self.permissions.record_usage(&user.id, now);
            self.cooldowns
                .set(&user.id, &descriptor.name, descriptor.cooldown_secs, now);
        }

        Ok(HandlerResult::reply(outcome.text))
    }
}

/// Profile fields collected by a finished flow, as a directory patch.
pub(super) fn completion_patch(completion: &FlowCompletion) -> UserPatch {
    UserPatch {
        display_name: completion.step_data.get(STEP_NAME).cloned(),
        language: completion.step_data.get(STEP_LANGUAGE).cloned(),
        ..UserPatch::default()
    }
}

/// Routes messages into the user's active guided flow and applies the
/// completion when the flow finishes: profile patch plus reward message.
pub struct FlowHandler {
    pub flows: Arc<ContextManager>,
    pub directory: Arc<dyn UserLookup>,
    pub sender: Arc<dyn MessageSender>,
}

#[async_trait]
impl Handler for FlowHandler {
    fn name(&self) -> &'static str {
        "flows"
    }

    fn priority(&self) -> u8 {
        20
    }

    fn can_handle(&self, inbound: &Inbound) -> bool {
        self.flows.active_context(&inbound.user.id).is_some()
    }

    async fn handle(&self, inbound: &Inbound) -> Result<HandlerResult, KoraError> {
        let user = &inbound.user;
        let outcome = self.flows.process(&user.id, inbound.message.text.trim())?;

        if outcome.completed {
            if let Some(completion) = self.flows.exit(&user.id) {
                let name = completion.step_data.get(STEP_NAME).cloned();
                let language = completion.step_data.get(STEP_LANGUAGE).cloned();

                let patch = completion_patch(&completion);
                if let Err(e) = self.directory.update_user(&user.id, &patch).await {
                    warn!("profile update after flow '{}' failed: {e}", completion.flow_id);
                }

                let lang = language.unwrap_or_else(|| user.language.clone());
                let reward =
                    replies::welcome_reward(name.as_deref().unwrap_or(&user.conversation_id), &lang);
                if let Err(e) = self
                    .sender
                    .send_text(&inbound.message.conversation_id, &reward)
                    .await
                {
                    warn!("reward send for flow '{}' failed: {e}", completion.flow_id);
                }
            }
        }

        Ok(HandlerResult::reply(outcome.response))
    }
}

/// Replies to messages that matched vocabulary keywords but nothing
/// stronger. Last resort before the canned fallback.
pub struct ContextualHandler;

#[async_trait]
impl Handler for ContextualHandler {
    fn name(&self) -> &'static str {
        "contextual"
    }

    fn priority(&self) -> u8 {
        30
    }

    fn can_handle(&self, inbound: &Inbound) -> bool {
        inbound.classification.category == Category::Contextual
            && !inbound.classification.matched_keywords.is_empty()
    }

    async fn handle(&self, inbound: &Inbound) -> Result<HandlerResult, KoraError> {
        Ok(HandlerResult::reply(replies::contextual(
            &inbound.classification.matched_keywords,
            &inbound.user.language,
        )))
    }
}
