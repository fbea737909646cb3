//! Priority handler dispatch.

use async_trait::async_trait;
use kora_core::classification::Classification;
use kora_core::error::KoraError;
use kora_core::message::Message;
use kora_core::user::User;
use std::sync::Arc;
use tracing::{debug, error};

/// A classified message paired with its sender's profile — the unit the
/// handler chain operates on.
pub struct Inbound {
    pub message: Message,
    pub classification: Classification,
    pub user: User,
}

/// What a handler did with a message.
pub struct HandlerResult {
    /// True stops the chain; later handlers never see the message.
    pub handled: bool,
    /// Text to send back. `None` with `handled` means deliberate silence.
    pub response: Option<String>,
}

impl HandlerResult {
    pub fn reply(text: impl Into<String>) -> Self {
        Self {
            handled: true,
            response: Some(text.into()),
        }
    }

    pub fn pass() -> Self {
        Self {
            handled: false,
            response: None,
        }
    }
}

/// One link in the processing chain. Lower priority runs first.
#[async_trait]
pub trait Handler: Send + Sync {
    fn name(&self) -> &'static str;

    fn priority(&self) -> u8;

    /// Cheap predicate; must not mutate state.
    fn can_handle(&self, inbound: &Inbound) -> bool;

    async fn handle(&self, inbound: &Inbound) -> Result<HandlerResult, KoraError>;
}

/// Runs handlers in priority order until one claims the message.
///
/// A handler error is isolated: it is logged and the chain continues, so
/// one broken handler cannot take the agent down.
pub struct Dispatcher {
    handlers: Vec<Arc<dyn Handler>>,
}

impl Dispatcher {
    pub fn new(mut handlers: Vec<Arc<dyn Handler>>) -> Self {
        handlers.sort_by_key(|h| h.priority());
        Self { handlers }
    }

    /// First claiming handler's result, or `None` when the whole chain
    /// passed.
    pub async fn dispatch(&self, inbound: &Inbound) -> Option<HandlerResult> {
        for handler in &self.handlers {
            if !handler.can_handle(inbound) {
                continue;
            }
            match handler.handle(inbound).await {
                Ok(result) if result.handled => {
                    debug!(
                        "message {} handled by {}",
                        inbound.message.id,
                        handler.name()
                    );
                    return Some(result);
                }
                Ok(_) => {}
                Err(e) => {
                    error!("handler {} failed: {e}", handler.name());
                }
            }
        }
        None
    }
}
