use crate::user::UserLevel;
use serde::{Deserialize, Serialize};

/// How a command is triggered.
///
/// Explicit tagged variants — dispatch matches exhaustively instead of
/// probing descriptors for optional capabilities.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum CommandKind {
    /// Triggered by the configured prefix character (e.g. `/help`).
    Prefixed,
    /// Triggered by plain-text keywords anywhere in the message.
    Contextual { triggers: Vec<String> },
}

/// Category tag used for grouping commands in help output and stats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CommandCategory {
    General,
    Profile,
    Flow,
    Admin,
}

/// A command known to the registry. Registered once at startup; immutable
/// afterwards except for the enabled flag.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandDescriptor {
    /// Unique name, without prefix. Uniqueness is case-insensitive when
    /// the registry is configured to fold case.
    pub name: String,
    /// Alternate names. Globally unique across all commands.
    #[serde(default)]
    pub aliases: Vec<String>,
    pub kind: CommandKind,
    pub min_level: UserLevel,
    /// Per-user re-execution delay. Zero disables the cooldown.
    #[serde(default)]
    pub cooldown_secs: u64,
    pub category: CommandCategory,
    pub description: String,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_enabled() -> bool {
    true
}

impl CommandDescriptor {
    pub fn new(
        name: impl Into<String>,
        kind: CommandKind,
        min_level: UserLevel,
        category: CommandCategory,
        description: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            aliases: Vec::new(),
            kind,
            min_level,
            cooldown_secs: 0,
            category,
            description: description.into(),
            enabled: true,
        }
    }

    pub fn with_aliases(mut self, aliases: &[&str]) -> Self {
        self.aliases = aliases.iter().map(|a| a.to_string()).collect();
        self
    }

    pub fn with_cooldown(mut self, secs: u64) -> Self {
        self.cooldown_secs = secs;
        self
    }
}

/// Result of executing a command.
#[derive(Debug, Clone)]
pub struct CommandOutcome {
    pub text: String,
    /// False marks a failed execution in registry stats; the text is still
    /// sent to the user.
    pub success: bool,
}

impl CommandOutcome {
    pub fn ok(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            success: true,
        }
    }

    pub fn failed(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            success: false,
        }
    }
}
