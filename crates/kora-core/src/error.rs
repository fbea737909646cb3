use thiserror::Error;

/// Top-level error type for Kora.
///
/// Only `Directory` failures during startup are fatal; everything else is
/// recovered locally (user-facing text or a logged event) and the pipeline
/// keeps running.
#[derive(Debug, Error)]
pub enum KoraError {
    /// Flow step input rejected by its validation rule. Carries the
    /// user-facing message; never mutates flow state.
    #[error("validation failed: {0}")]
    Validation(String),

    /// User level, time window, or quota check failed.
    #[error("permission denied: {0}")]
    PermissionDenied(String),

    /// Command re-invoked before its per-user cooldown elapsed.
    #[error("cooldown active: {0}s remaining")]
    CooldownActive(u64),

    /// Message already processed — silent skip, never surfaced to the user.
    #[error("duplicate message: {0}")]
    DuplicateMessage(String),

    /// A dispatch handler failed. Logged; the pipeline continues with the
    /// next handler.
    #[error("handler '{handler}' failed: {reason}")]
    Handler { handler: String, reason: String },

    /// Durable snapshot or context persistence failed. In-memory state
    /// remains authoritative until the next successful write.
    #[error("persistence error: {0}")]
    Persistence(String),

    /// Command name or alias not found in the registry.
    #[error("unknown command: {0}")]
    UnknownCommand(String),

    /// Two descriptors claim the same name or alias.
    #[error("duplicate command: {0}")]
    DuplicateCommand(String),

    /// User directory error.
    #[error("directory error: {0}")]
    Directory(String),

    /// Gateway transport error.
    #[error("gateway error: {0}")]
    Gateway(String),

    /// Configuration error (bad file, invalid flow graph, bad manifest).
    #[error("config error: {0}")]
    Config(String),

    /// I/O error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
