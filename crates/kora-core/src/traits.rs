use crate::{
    error::KoraError,
    user::{User, UserPatch},
};
use async_trait::async_trait;

/// Outbound transport — the remote gateway process that accepts sends.
///
/// Delivery of inbound messages is the collaborator's side of the contract;
/// the core only consumes already-delivered `Message` records.
#[async_trait]
pub trait MessageGateway: Send + Sync {
    /// Human-readable gateway name.
    fn name(&self) -> &str;

    /// Send text to a conversation.
    async fn send(&self, conversation_id: &str, text: &str) -> Result<(), KoraError>;
}

/// Narrow send capability injected into handlers that need to push
/// messages outside the request/reply cycle. Handlers get this instead of
/// the dispatcher itself.
#[async_trait]
pub trait MessageSender: Send + Sync {
    async fn send_text(&self, conversation_id: &str, text: &str) -> Result<(), KoraError>;
}

/// User directory collaborator. Must be reachable at startup; an
/// unavailable directory aborts initialization.
#[async_trait]
pub trait UserLookup: Send + Sync {
    async fn get_user_by_conversation(
        &self,
        conversation_id: &str,
    ) -> Result<Option<User>, KoraError>;

    async fn create_user(&self, user: &User) -> Result<(), KoraError>;

    /// Apply a partial update. `None` fields in the patch are untouched.
    async fn update_user(&self, user_id: &str, patch: &UserPatch) -> Result<(), KoraError>;
}
