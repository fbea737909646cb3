use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Instant;

use async_trait::async_trait;
use chrono::{Duration, TimeZone, Utc};
use kora_core::command::{CommandCategory, CommandDescriptor, CommandKind, CommandOutcome};
use kora_core::config::{Config, TierPolicy};
use kora_core::error::KoraError;
use kora_core::traits::UserLookup;
use kora_core::user::{User, UserLevel, UserPatch};
use kora_flows::ContextManager;

use super::builtins::{build_registry, register_builtin_flows};
use super::cooldown::CooldownMap;
use super::permissions::{PermissionDenial, PermissionService};
use super::registry::CommandRegistry;
use super::{CommandExecutor, CommandInvocation};

struct Noop;

#[async_trait]
impl CommandExecutor for Noop {
    async fn execute(&self, _inv: &CommandInvocation<'_>) -> CommandOutcome {
        CommandOutcome::ok("ok")
    }
}

fn descriptor(name: &str) -> CommandDescriptor {
    CommandDescriptor::new(
        name,
        CommandKind::Prefixed,
        UserLevel::Basic,
        CommandCategory::General,
        "test command",
    )
}

fn user(level: UserLevel) -> User {
    User {
        id: "u1".to_string(),
        conversation_id: "conv1".to_string(),
        display_name: None,
        level,
        active: true,
        language: "es".to_string(),
        created_at: Utc::now(),
    }
}

/// Records patches instead of hitting a database.
#[derive(Default)]
struct MockDirectory {
    patches: Mutex<Vec<UserPatch>>,
}

#[async_trait]
impl UserLookup for MockDirectory {
    async fn get_user_by_conversation(
        &self,
        _conversation_id: &str,
    ) -> Result<Option<User>, KoraError> {
        Ok(None)
    }

    async fn create_user(&self, _user: &User) -> Result<(), KoraError> {
        Ok(())
    }

    async fn update_user(&self, _user_id: &str, patch: &UserPatch) -> Result<(), KoraError> {
        self.patches.lock().unwrap().push(patch.clone());
        Ok(())
    }
}

// --- registry ---

#[test]
fn test_register_and_resolve() {
    let mut reg = CommandRegistry::new(true);
    reg.register(descriptor("help").with_aliases(&["ayuda"]), Arc::new(Noop))
        .unwrap();

    assert!(reg.resolve("help").is_some());
    assert!(reg.resolve("ayuda").is_some());
    assert!(reg.resolve("nope").is_none());
}

#[test]
fn test_case_insensitive_resolution() {
    let mut reg = CommandRegistry::new(true);
    reg.register(descriptor("Help"), Arc::new(Noop)).unwrap();
    assert!(reg.resolve("HELP").is_some());
    assert!(reg.resolve("help").is_some());
}

#[test]
fn test_case_sensitive_registry() {
    let mut reg = CommandRegistry::new(false);
    reg.register(descriptor("Help"), Arc::new(Noop)).unwrap();
    assert!(reg.resolve("help").is_none());
    assert!(reg.resolve("Help").is_some());
}

#[test]
fn test_duplicate_name_rejected() {
    let mut reg = CommandRegistry::new(true);
    reg.register(descriptor("help"), Arc::new(Noop)).unwrap();
    let err = reg.register(descriptor("HELP"), Arc::new(Noop)).unwrap_err();
    assert!(matches!(err, KoraError::DuplicateCommand(_)));
}

#[test]
fn test_alias_colliding_with_name_rejected() {
    let mut reg = CommandRegistry::new(true);
    reg.register(descriptor("help"), Arc::new(Noop)).unwrap();
    assert!(reg
        .register(descriptor("manual").with_aliases(&["help"]), Arc::new(Noop))
        .is_err());
}

#[test]
fn test_alias_colliding_with_alias_rejected() {
    let mut reg = CommandRegistry::new(true);
    reg.register(descriptor("help").with_aliases(&["h"]), Arc::new(Noop))
        .unwrap();
    assert!(reg
        .register(descriptor("history").with_aliases(&["h"]), Arc::new(Noop))
        .is_err());
}

#[test]
fn test_set_enabled() {
    let mut reg = CommandRegistry::new(true);
    reg.register(descriptor("help"), Arc::new(Noop)).unwrap();

    assert!(reg.set_enabled("help", false));
    assert!(!reg.resolve("help").unwrap().descriptor.enabled);
    assert!(reg.set_enabled("help", true));
    assert!(!reg.set_enabled("ghost", false));
}

#[test]
fn test_stats_recording() {
    let mut reg = CommandRegistry::new(true);
    reg.register(descriptor("help"), Arc::new(Noop)).unwrap();

    reg.record_execution("help", true, 10);
    reg.record_execution("help", false, 30);

    let stats = reg.stats("help");
    assert_eq!(stats.executions, 2);
    assert_eq!(stats.failures, 1);
    assert_eq!(stats.total_duration_ms, 40);
    assert_eq!(stats.avg_duration_ms(), 20);
    assert_eq!(reg.total_executions(), 2);
}

// --- cooldowns ---

#[test]
fn test_cooldown_denies_then_allows() {
    let map = CooldownMap::new();
    let t0 = Utc.with_ymd_and_hms(2026, 1, 1, 12, 0, 0).unwrap();

    map.set("u1", "help", 5, t0);
    assert_eq!(map.remaining("u1", "help", t0), Some(5));
    assert_eq!(
        map.remaining("u1", "help", t0 + Duration::seconds(3)),
        Some(2)
    );
    assert_eq!(map.remaining("u1", "help", t0 + Duration::seconds(5)), None);
}

#[test]
fn test_cooldown_is_per_user_and_command() {
    let map = CooldownMap::new();
    let t0 = Utc.with_ymd_and_hms(2026, 1, 1, 12, 0, 0).unwrap();

    map.set("u1", "help", 5, t0);
    assert_eq!(map.remaining("u2", "help", t0), None);
    assert_eq!(map.remaining("u1", "status", t0), None);
}

#[test]
fn test_zero_cooldown_is_noop() {
    let map = CooldownMap::new();
    let t0 = Utc.with_ymd_and_hms(2026, 1, 1, 12, 0, 0).unwrap();
    map.set("u1", "help", 0, t0);
    assert_eq!(map.remaining("u1", "help", t0), None);
}

#[test]
fn test_cooldown_sweep_drops_expired() {
    let map = CooldownMap::new();
    let t0 = Utc.with_ymd_and_hms(2026, 1, 1, 12, 0, 0).unwrap();
    map.set("u1", "help", 5, t0);
    map.set("u2", "help", 500, t0);

    assert_eq!(map.sweep(t0 + Duration::seconds(10)), 1);
    assert_eq!(
        map.remaining("u2", "help", t0 + Duration::seconds(10)),
        Some(490)
    );
}

// --- permissions ---

fn service_with(level: &str, policy: TierPolicy) -> PermissionService {
    let mut config = Config::default();
    config.tiers.insert(level.to_string(), policy);
    PermissionService::new(&config)
}

#[test]
fn test_blocked_user_always_denied() {
    let svc = PermissionService::new(&Config::default());
    let now = Utc.with_ymd_and_hms(2026, 1, 1, 12, 0, 0).unwrap();
    assert_eq!(
        svc.validate(&user(UserLevel::Blocked), UserLevel::Basic, now),
        Err(PermissionDenial::Level)
    );
}

#[test]
fn test_insufficient_level_denied() {
    let svc = PermissionService::new(&Config::default());
    let now = Utc.with_ymd_and_hms(2026, 1, 1, 12, 0, 0).unwrap();
    assert_eq!(
        svc.validate(&user(UserLevel::Basic), UserLevel::Admin, now),
        Err(PermissionDenial::Level)
    );
    assert!(svc
        .validate(&user(UserLevel::Admin), UserLevel::Admin, now)
        .is_ok());
}

#[test]
fn test_outside_window_denied() {
    let svc = service_with(
        "basic",
        TierPolicy {
            window_start_hour: 8,
            window_end_hour: 22,
            hourly_quota: -1,
        },
    );
    let night = Utc.with_ymd_and_hms(2026, 1, 1, 23, 30, 0).unwrap();
    assert_eq!(
        svc.validate(&user(UserLevel::Basic), UserLevel::Basic, night),
        Err(PermissionDenial::Window { start: 8, end: 22 })
    );

    let day = Utc.with_ymd_and_hms(2026, 1, 1, 12, 0, 0).unwrap();
    assert!(svc
        .validate(&user(UserLevel::Basic), UserLevel::Basic, day)
        .is_ok());
}

#[test]
fn test_quota_exhaustion_and_rollover() {
    let svc = service_with(
        "basic",
        TierPolicy {
            window_start_hour: 0,
            window_end_hour: 24,
            hourly_quota: 2,
        },
    );
    let u = user(UserLevel::Basic);
    let t0 = Utc.with_ymd_and_hms(2026, 1, 1, 12, 0, 0).unwrap();

    svc.record_usage(&u.id, t0);
    svc.record_usage(&u.id, t0 + Duration::minutes(1));
    assert_eq!(
        svc.validate(&u, UserLevel::Basic, t0 + Duration::minutes(2)),
        Err(PermissionDenial::Quota { quota: 2 })
    );

    // Usage rolls out of the window an hour later.
    assert!(svc
        .validate(&u, UserLevel::Basic, t0 + Duration::minutes(61))
        .is_ok());
}

#[test]
fn test_negative_quota_is_unlimited() {
    let svc = service_with(
        "admin",
        TierPolicy {
            window_start_hour: 0,
            window_end_hour: 24,
            hourly_quota: -1,
        },
    );
    let u = user(UserLevel::Admin);
    let t0 = Utc.with_ymd_and_hms(2026, 1, 1, 12, 0, 0).unwrap();
    for i in 0..100 {
        svc.record_usage(&u.id, t0 + Duration::seconds(i));
    }
    assert!(svc
        .validate(&u, UserLevel::Admin, t0 + Duration::minutes(5))
        .is_ok());
}

#[test]
fn test_quota_checked_per_user() {
    let svc = service_with(
        "basic",
        TierPolicy {
            window_start_hour: 0,
            window_end_hour: 24,
            hourly_quota: 1,
        },
    );
    let t0 = Utc.with_ymd_and_hms(2026, 1, 1, 12, 0, 0).unwrap();
    svc.record_usage("u1", t0);

    let mut other = user(UserLevel::Basic);
    other.id = "u2".to_string();
    assert!(svc.validate(&other, UserLevel::Basic, t0).is_ok());
}

// --- builtins ---

fn flows() -> ContextManager {
    let mut flows = ContextManager::new();
    register_builtin_flows(&mut flows, Duration::minutes(30)).unwrap();
    flows
}

#[test]
fn test_builtin_manifest_registers_cleanly() {
    let reg = build_registry(true).unwrap();
    for name in ["help", "status", "profile", "language", "start", "cancel"] {
        assert!(reg.resolve(name).is_some(), "missing builtin {name}");
    }
    assert!(reg.resolve("lang").is_some());
    assert!(matches!(
        reg.resolve("bienvenida").unwrap().descriptor.kind,
        CommandKind::Contextual { .. }
    ));
}

#[tokio::test]
async fn test_help_lists_enabled_commands() {
    let reg = build_registry(true).unwrap();
    let flows = flows();
    let dir = MockDirectory::default();
    let uptime = Instant::now();
    let u = user(UserLevel::Basic);

    let inv = CommandInvocation {
        user: &u,
        text: "/help",
        args: "",
        directory: &dir,
        flows: &flows,
        registry: &reg,
        uptime: &uptime,
        session_id: "s1",
    };
    let out = reg.resolve("help").unwrap().executor.execute(&inv).await;
    assert!(out.success);
    assert!(out.text.contains("/status"));
    assert!(out.text.contains("/cancel"));
}

#[tokio::test]
async fn test_language_command_patches_directory() {
    let reg = build_registry(true).unwrap();
    let flows = flows();
    let dir = MockDirectory::default();
    let uptime = Instant::now();
    let u = user(UserLevel::Basic);

    let inv = CommandInvocation {
        user: &u,
        text: "/language en",
        args: "en",
        directory: &dir,
        flows: &flows,
        registry: &reg,
        uptime: &uptime,
        session_id: "s1",
    };
    let out = reg.resolve("language").unwrap().executor.execute(&inv).await;
    assert!(out.success);

    let patches = dir.patches.lock().unwrap();
    assert_eq!(patches.len(), 1);
    assert_eq!(patches[0].language.as_deref(), Some("en"));
}

#[tokio::test]
async fn test_language_command_rejects_unknown() {
    let reg = build_registry(true).unwrap();
    let flows = flows();
    let dir = MockDirectory::default();
    let uptime = Instant::now();
    let u = user(UserLevel::Basic);

    let inv = CommandInvocation {
        user: &u,
        text: "/language klingon",
        args: "klingon",
        directory: &dir,
        flows: &flows,
        registry: &reg,
        uptime: &uptime,
        session_id: "s1",
    };
    let out = reg.resolve("language").unwrap().executor.execute(&inv).await;
    assert!(!out.success);
    assert!(dir.patches.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_start_enters_welcome_and_prompts_for_name() {
    let reg = build_registry(true).unwrap();
    let flows = flows();
    let dir = MockDirectory::default();
    let uptime = Instant::now();
    let u = user(UserLevel::Basic);

    let inv = CommandInvocation {
        user: &u,
        text: "/start",
        args: "",
        directory: &dir,
        flows: &flows,
        registry: &reg,
        uptime: &uptime,
        session_id: "s1",
    };
    let out = reg.resolve("start").unwrap().executor.execute(&inv).await;
    assert!(out.success);
    assert!(out.text.contains("llamas"));

    let ctx = flows.active_context("u1").expect("flow entered");
    assert_eq!(ctx.flow_id, kora_flows::WELCOME_FLOW_ID);
    assert_eq!(ctx.current_step, kora_flows::STEP_NAME);
}

#[tokio::test]
async fn test_cancel_without_flow() {
    let reg = build_registry(true).unwrap();
    let flows = flows();
    let dir = MockDirectory::default();
    let uptime = Instant::now();
    let u = user(UserLevel::Basic);

    let inv = CommandInvocation {
        user: &u,
        text: "/cancel",
        args: "",
        directory: &dir,
        flows: &flows,
        registry: &reg,
        uptime: &uptime,
        session_id: "s1",
    };
    let out = reg.resolve("cancel").unwrap().executor.execute(&inv).await;
    assert!(out.success);
    assert!(flows.active_context("u1").is_none());
}

#[tokio::test]
async fn test_cancel_deactivates_flow() {
    let reg = build_registry(true).unwrap();
    let flows = flows();
    flows
        .enter("u1", kora_flows::WELCOME_FLOW_ID, HashMap::new())
        .unwrap();
    let dir = MockDirectory::default();
    let uptime = Instant::now();
    let u = user(UserLevel::Basic);

    let inv = CommandInvocation {
        user: &u,
        text: "/cancel",
        args: "",
        directory: &dir,
        flows: &flows,
        registry: &reg,
        uptime: &uptime,
        session_id: "s1",
    };
    let out = reg.resolve("cancel").unwrap().executor.execute(&inv).await;
    assert!(out.success);
    assert!(flows.active_context("u1").is_none());
}
