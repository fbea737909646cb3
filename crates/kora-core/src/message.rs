use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// An inbound message delivered by the gateway. Immutable once received.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    /// Gateway-assigned id, unique per gateway.
    pub id: String,
    /// Conversation (chat) the message belongs to.
    pub conversation_id: String,
    /// Platform-specific sender ID.
    pub sender_id: String,
    /// Message text content.
    pub text: String,
    pub timestamp: DateTime<Utc>,
    /// True for our own outbound messages echoed back by the gateway.
    #[serde(default)]
    pub from_self: bool,
    /// Attached media, if any. The core only threads the reference through;
    /// it never fetches content.
    #[serde(default)]
    pub media: Option<MediaRef>,
}

/// Reference to a media attachment on a message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaRef {
    pub kind: MediaKind,
    pub url: Option<String>,
    pub filename: Option<String>,
}

/// Supported media kinds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum MediaKind {
    Image,
    Audio,
    Video,
    Document,
    Other,
}

/// An outbound reply routed back through the gateway.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Reply {
    pub conversation_id: String,
    pub text: String,
}

/// Result of running a message through the processing pipeline.
///
/// `should_reply` is false for silently skipped messages (duplicates,
/// stale redeliveries, own echoes) — the caller must not send anything.
#[derive(Debug, Clone, Default)]
pub struct ProcessOutcome {
    pub response: Option<String>,
    pub should_reply: bool,
}

impl ProcessOutcome {
    /// A silent skip: no response, nothing sent.
    pub fn silent() -> Self {
        Self::default()
    }

    /// A reply to send back to the conversation.
    pub fn reply(text: impl Into<String>) -> Self {
        Self {
            response: Some(text.into()),
            should_reply: true,
        }
    }
}
