//! Command registry, permissions, cooldowns, and the built-in manifest.

pub mod builtins;
pub mod cooldown;
pub mod permissions;
pub mod registry;

#[cfg(test)]
mod tests;

use async_trait::async_trait;
use kora_core::command::CommandOutcome;
use kora_core::traits::UserLookup;
use kora_core::user::User;
use kora_flows::ContextManager;
use std::time::Instant;

use registry::CommandRegistry;

/// Everything a command executor may touch. Narrow references only —
/// executors never see the dispatcher or the watermark tracker.
pub struct CommandInvocation<'a> {
    pub user: &'a User,
    /// Full message text.
    pub text: &'a str,
    /// Text after the command token, trimmed. Empty when absent.
    pub args: &'a str,
    pub directory: &'a dyn UserLookup,
    pub flows: &'a ContextManager,
    pub registry: &'a CommandRegistry,
    pub uptime: &'a Instant,
    pub session_id: &'a str,
}

/// A unit of command logic registered alongside its descriptor.
#[async_trait]
pub trait CommandExecutor: Send + Sync {
    async fn execute(&self, inv: &CommandInvocation<'_>) -> CommandOutcome;
}
