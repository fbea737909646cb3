//! Name/alias → descriptor lookup and execution bookkeeping.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use kora_core::command::{CommandDescriptor, CommandKind};
use kora_core::error::KoraError;
use tracing::info;

use super::CommandExecutor;

/// A descriptor paired with its executor.
pub struct RegisteredCommand {
    pub descriptor: CommandDescriptor,
    pub executor: Arc<dyn CommandExecutor>,
}

/// Running totals per command. Introspection only — never gates dispatch.
#[derive(Debug, Clone, Copy, Default)]
pub struct CommandStats {
    pub executions: u64,
    pub failures: u64,
    pub total_duration_ms: u64,
}

impl CommandStats {
    pub fn avg_duration_ms(&self) -> u64 {
        if self.executions == 0 {
            0
        } else {
            self.total_duration_ms / self.executions
        }
    }
}

/// Startup-time command registry. Registration happens once, from an
/// explicit manifest, before the gateway starts taking messages; after
/// that only the enabled flag and the stats move.
pub struct CommandRegistry {
    case_insensitive: bool,
    commands: HashMap<String, RegisteredCommand>,
    /// Folded alias → canonical name.
    aliases: HashMap<String, String>,
    stats: Mutex<HashMap<String, CommandStats>>,
}

impl CommandRegistry {
    pub fn new(case_insensitive: bool) -> Self {
        Self {
            case_insensitive,
            commands: HashMap::new(),
            aliases: HashMap::new(),
            stats: Mutex::new(HashMap::new()),
        }
    }

    fn fold(&self, name: &str) -> String {
        if self.case_insensitive {
            name.to_lowercase()
        } else {
            name.to_string()
        }
    }

    fn is_taken(&self, folded: &str) -> bool {
        self.commands.contains_key(folded) || self.aliases.contains_key(folded)
    }

    /// Register a command. Fails when the name or any alias is already
    /// taken by another command's name or alias.
    pub fn register(
        &mut self,
        descriptor: CommandDescriptor,
        executor: Arc<dyn CommandExecutor>,
    ) -> Result<(), KoraError> {
        let canonical = self.fold(&descriptor.name);
        if self.is_taken(&canonical) {
            return Err(KoraError::DuplicateCommand(descriptor.name.clone()));
        }
        for alias in &descriptor.aliases {
            let folded = self.fold(alias);
            if folded == canonical || self.is_taken(&folded) {
                return Err(KoraError::DuplicateCommand(alias.clone()));
            }
        }

        for alias in &descriptor.aliases {
            self.aliases.insert(self.fold(alias), canonical.clone());
        }
        info!(
            "command registered: {} (aliases: {:?})",
            descriptor.name, descriptor.aliases
        );
        self.commands.insert(
            canonical,
            RegisteredCommand {
                descriptor,
                executor,
            },
        );
        Ok(())
    }

    /// Look up a command by name or alias.
    pub fn resolve(&self, name_or_alias: &str) -> Option<&RegisteredCommand> {
        let folded = self.fold(name_or_alias);
        let canonical = self.aliases.get(&folded).unwrap_or(&folded);
        self.commands.get(canonical)
    }

    /// Find a contextual command whose trigger appears as a word in
    /// `text` (already lowercased).
    pub fn resolve_contextual(&self, text: &str) -> Option<&RegisteredCommand> {
        self.commands.values().find(|cmd| match &cmd.descriptor.kind {
            CommandKind::Contextual { triggers } => triggers.iter().any(|t| {
                text.split(|c: char| !c.is_alphanumeric())
                    .any(|word| word == self.fold(t))
            }),
            CommandKind::Prefixed => false,
        })
    }

    /// Flip the enabled flag. Returns false for unknown commands.
    pub fn set_enabled(&mut self, name: &str, enabled: bool) -> bool {
        let folded = self.fold(name);
        match self.commands.get_mut(&folded) {
            Some(cmd) => {
                cmd.descriptor.enabled = enabled;
                true
            }
            None => false,
        }
    }

    /// Record an execution for introspection.
    pub fn record_execution(&self, name: &str, success: bool, duration_ms: u64) {
        let folded = self.fold(name);
        let mut stats = self.stats.lock().expect("stats lock poisoned");
        let entry = stats.entry(folded).or_default();
        entry.executions += 1;
        entry.total_duration_ms += duration_ms;
        if !success {
            entry.failures += 1;
        }
    }

    pub fn stats(&self, name: &str) -> CommandStats {
        let folded = self.fold(name);
        self.stats
            .lock()
            .expect("stats lock poisoned")
            .get(&folded)
            .copied()
            .unwrap_or_default()
    }

    /// All descriptors, in no particular order.
    pub fn descriptors(&self) -> Vec<&CommandDescriptor> {
        self.commands.values().map(|c| &c.descriptor).collect()
    }

    /// Total executions across all commands.
    pub fn total_executions(&self) -> u64 {
        self.stats
            .lock()
            .expect("stats lock poisoned")
            .values()
            .map(|s| s.executions)
            .sum()
    }
}
