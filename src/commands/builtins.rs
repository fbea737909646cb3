//! Built-in commands shipped with the agent.
//!
//! Registered from an explicit manifest at startup. Every executor is
//! instant — no network, no provider calls.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use kora_core::command::{CommandCategory, CommandDescriptor, CommandKind, CommandOutcome};
use kora_core::error::KoraError;
use kora_core::user::{UserLevel, UserPatch};
use kora_flows::{welcome_flow, WELCOME_FLOW_ID};
use tracing::warn;

use super::registry::CommandRegistry;
use super::{CommandExecutor, CommandInvocation};
use crate::replies;

/// Build the registry and populate it with the built-in manifest.
pub fn build_registry(case_insensitive: bool) -> Result<CommandRegistry, KoraError> {
    let mut registry = CommandRegistry::new(case_insensitive);

    registry.register(
        CommandDescriptor::new(
            "help",
            CommandKind::Prefixed,
            UserLevel::Basic,
            CommandCategory::General,
            "Lista los comandos disponibles",
        ),
        Arc::new(HelpCommand),
    )?;

    registry.register(
        CommandDescriptor::new(
            "status",
            CommandKind::Prefixed,
            UserLevel::Standard,
            CommandCategory::General,
            "Estado del agente",
        ),
        Arc::new(StatusCommand),
    )?;

    registry.register(
        CommandDescriptor::new(
            "profile",
            CommandKind::Prefixed,
            UserLevel::Basic,
            CommandCategory::Profile,
            "Muestra tu perfil",
        )
        .with_aliases(&["perfil"]),
        Arc::new(ProfileCommand),
    )?;

    registry.register(
        CommandDescriptor::new(
            "language",
            CommandKind::Prefixed,
            UserLevel::Basic,
            CommandCategory::Profile,
            "Cambia tu idioma: /language es|en|pt",
        )
        .with_aliases(&["lang", "idioma"])
        .with_cooldown(5),
        Arc::new(LanguageCommand),
    )?;

    registry.register(
        CommandDescriptor::new(
            "start",
            CommandKind::Prefixed,
            UserLevel::Basic,
            CommandCategory::Flow,
            "Inicia la configuración de tu perfil",
        )
        .with_cooldown(30),
        Arc::new(StartCommand),
    )?;

    // Same flow, reachable without the prefix.
    registry.register(
        CommandDescriptor::new(
            "bienvenida",
            CommandKind::Contextual {
                triggers: vec!["empezar".to_string(), "comenzar".to_string()],
            },
            UserLevel::Basic,
            CommandCategory::Flow,
            "Inicia la configuración al escribir 'empezar'",
        )
        .with_cooldown(30),
        Arc::new(StartCommand),
    )?;

    registry.register(
        CommandDescriptor::new(
            "cancel",
            CommandKind::Prefixed,
            UserLevel::Basic,
            CommandCategory::Flow,
            "Cancela el flujo en curso",
        )
        .with_aliases(&["cancelar"]),
        Arc::new(CancelCommand),
    )?;

    Ok(registry)
}

/// Register the flows the built-in commands depend on.
pub fn register_builtin_flows(
    flows: &mut kora_flows::ContextManager,
    max_duration: chrono::Duration,
) -> Result<(), KoraError> {
    flows.register_flow(welcome_flow(max_duration))
}

struct HelpCommand;

#[async_trait]
impl CommandExecutor for HelpCommand {
    async fn execute(&self, inv: &CommandInvocation<'_>) -> CommandOutcome {
        let header = match inv.user.language.as_str() {
            "en" => "Available commands:",
            "pt" => "Comandos disponíveis:",
            _ => "Comandos disponibles:",
        };

        let mut lines: Vec<String> = inv
            .registry
            .descriptors()
            .into_iter()
            .filter(|d| d.enabled)
            .map(|d| match &d.kind {
                CommandKind::Prefixed => format!("/{} — {}", d.name, d.description),
                CommandKind::Contextual { triggers } => {
                    format!("{} ({}) — {}", d.name, triggers.join(", "), d.description)
                }
            })
            .collect();
        lines.sort();

        CommandOutcome::ok(format!("{header}\n{}", lines.join("\n")))
    }
}

struct StatusCommand;

#[async_trait]
impl CommandExecutor for StatusCommand {
    async fn execute(&self, inv: &CommandInvocation<'_>) -> CommandOutcome {
        let uptime_secs = inv.uptime.elapsed().as_secs();
        let active_flows = inv.flows.export_active().len();
        let executions = inv.registry.total_executions();

        let text = match inv.user.language.as_str() {
            "en" => format!(
                "Kora is up.\nUptime: {}m {}s\nSession: {}\nCommands served: {executions}\nActive flows: {active_flows}",
                uptime_secs / 60,
                uptime_secs % 60,
                inv.session_id,
            ),
            "pt" => format!(
                "Kora está no ar.\nTempo ativo: {}m {}s\nSessão: {}\nComandos atendidos: {executions}\nFluxos ativos: {active_flows}",
                uptime_secs / 60,
                uptime_secs % 60,
                inv.session_id,
            ),
            _ => format!(
                "Kora está en línea.\nTiempo activo: {}m {}s\nSesión: {}\nComandos atendidos: {executions}\nFlujos activos: {active_flows}",
                uptime_secs / 60,
                uptime_secs % 60,
                inv.session_id,
            ),
        };
        CommandOutcome::ok(text)
    }
}

struct ProfileCommand;

#[async_trait]
impl CommandExecutor for ProfileCommand {
    async fn execute(&self, inv: &CommandInvocation<'_>) -> CommandOutcome {
        let user = inv.user;
        let name = user.display_name.as_deref().unwrap_or("—");
        let since = user.created_at.format("%Y-%m-%d");

        let text = match user.language.as_str() {
            "en" => format!(
                "Your profile:\nName: {name}\nLevel: {}\nLanguage: {}\nMember since: {since}",
                user.level.as_str(),
                user.language,
            ),
            "pt" => format!(
                "Seu perfil:\nNome: {name}\nNível: {}\nIdioma: {}\nMembro desde: {since}",
                user.level.as_str(),
                user.language,
            ),
            _ => format!(
                "Tu perfil:\nNombre: {name}\nNivel: {}\nIdioma: {}\nMiembro desde: {since}",
                user.level.as_str(),
                user.language,
            ),
        };
        CommandOutcome::ok(text)
    }
}

struct LanguageCommand;

#[async_trait]
impl CommandExecutor for LanguageCommand {
    async fn execute(&self, inv: &CommandInvocation<'_>) -> CommandOutcome {
        let choice = inv.args.trim().to_lowercase();
        if !kora_flows::LANGUAGES.contains(&choice.as_str()) {
            let text = match inv.user.language.as_str() {
                "en" => "Usage: /language es|en|pt",
                "pt" => "Uso: /language es|en|pt",
                _ => "Uso: /language es|en|pt",
            };
            return CommandOutcome::failed(text);
        }

        let patch = UserPatch {
            language: Some(choice.clone()),
            ..UserPatch::default()
        };
        if let Err(e) = inv.directory.update_user(&inv.user.id, &patch).await {
            warn!("language change for {} failed: {e}", inv.user.id);
            return CommandOutcome::failed(replies::internal_error(&inv.user.language));
        }

        // Confirm in the newly chosen language.
        let text = match choice.as_str() {
            "en" => "Done! I'll speak English from now on.",
            "pt" => "Pronto! Vou falar português de agora em diante.",
            _ => "¡Listo! Hablaré español de ahora en adelante.",
        };
        CommandOutcome::ok(text)
    }
}

struct StartCommand;

#[async_trait]
impl CommandExecutor for StartCommand {
    async fn execute(&self, inv: &CommandInvocation<'_>) -> CommandOutcome {
        if let Err(e) = inv
            .flows
            .enter(&inv.user.id, WELCOME_FLOW_ID, HashMap::new())
        {
            warn!("welcome flow entry for {} failed: {e}", inv.user.id);
            return CommandOutcome::failed(replies::internal_error(&inv.user.language));
        }

        // Consume the greeting step so the first prompt goes out now and
        // the user's next message lands on the name request.
        match inv.flows.process(&inv.user.id, inv.text) {
            Ok(outcome) => CommandOutcome::ok(outcome.response),
            Err(e) => {
                warn!("welcome flow greeting for {} failed: {e}", inv.user.id);
                CommandOutcome::failed(replies::internal_error(&inv.user.language))
            }
        }
    }
}

struct CancelCommand;

#[async_trait]
impl CommandExecutor for CancelCommand {
    async fn execute(&self, inv: &CommandInvocation<'_>) -> CommandOutcome {
        if inv.flows.active_context(&inv.user.id).is_none() {
            let text = match inv.user.language.as_str() {
                "en" => "There's nothing to cancel.",
                "pt" => "Não há nada para cancelar.",
                _ => "No hay nada que cancelar.",
            };
            return CommandOutcome::ok(text);
        }

        // A cancelled flow that already reached its terminal step still
        // gets its completion applied rather than silently dropped.
        if let Some(completion) = inv.flows.exit(&inv.user.id) {
            let patch = UserPatch {
                display_name: completion.step_data.get(kora_flows::STEP_NAME).cloned(),
                language: completion.step_data.get(kora_flows::STEP_LANGUAGE).cloned(),
                ..UserPatch::default()
            };
            if let Err(e) = inv.directory.update_user(&inv.user.id, &patch).await {
                warn!("completion patch for {} failed: {e}", inv.user.id);
            }
        }

        let text = match inv.user.language.as_str() {
            "en" => "Flow cancelled. Type /start to begin again.",
            "pt" => "Fluxo cancelado. Digite /start para recomeçar.",
            _ => "Flujo cancelado. Escribe /start para empezar de nuevo.",
        };
        CommandOutcome::ok(text)
    }
}
