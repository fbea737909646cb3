//! Level, time-window, and hourly-quota checks for command execution.

use chrono::{DateTime, Duration, Timelike, Utc};
use kora_core::config::{Config, TierPolicy};
use kora_core::user::{User, UserLevel};
use std::collections::HashMap;
use std::sync::Mutex;

/// Why a command was refused. Checks run in a fixed order (level, then
/// window, then quota) so a blocked user never burns quota.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PermissionDenial {
    Level,
    Window { start: u32, end: u32 },
    Quota { quota: i64 },
}

/// Gates command execution per user tier.
pub struct PermissionService {
    tiers: HashMap<String, TierPolicy>,
    /// Successful execution timestamps per user, pruned to the last hour.
    usage: Mutex<HashMap<String, Vec<DateTime<Utc>>>>,
}

impl PermissionService {
    pub fn new(config: &Config) -> Self {
        Self {
            tiers: config.tiers.clone(),
            usage: Mutex::new(HashMap::new()),
        }
    }

    fn policy(&self, level: UserLevel) -> TierPolicy {
        self.tiers.get(level.as_str()).copied().unwrap_or_default()
    }

    /// Check whether `user` may run a command requiring `min_level` at
    /// `now`. Clock injected for testability.
    pub fn validate(
        &self,
        user: &User,
        min_level: UserLevel,
        now: DateTime<Utc>,
    ) -> Result<(), PermissionDenial> {
        if user.level == UserLevel::Blocked || user.level < min_level {
            return Err(PermissionDenial::Level);
        }

        let policy = self.policy(user.level);
        let hour = now.hour();
        if hour < policy.window_start_hour || hour >= policy.window_end_hour {
            return Err(PermissionDenial::Window {
                start: policy.window_start_hour,
                end: policy.window_end_hour,
            });
        }

        if policy.hourly_quota >= 0 && self.usage_in_last_hour(&user.id, now) >= policy.hourly_quota
        {
            return Err(PermissionDenial::Quota {
                quota: policy.hourly_quota,
            });
        }

        Ok(())
    }

    /// Count an execution against the user's hourly quota.
    pub fn record_usage(&self, user_id: &str, now: DateTime<Utc>) {
        let mut usage = self.usage.lock().expect("usage lock poisoned");
        let entries = usage.entry(user_id.to_string()).or_default();
        let cutoff = now - Duration::hours(1);
        entries.retain(|t| *t > cutoff);
        entries.push(now);
    }

    fn usage_in_last_hour(&self, user_id: &str, now: DateTime<Utc>) -> i64 {
        let cutoff = now - Duration::hours(1);
        self.usage
            .lock()
            .expect("usage lock poisoned")
            .get(user_id)
            .map(|entries| entries.iter().filter(|t| **t > cutoff).count() as i64)
            .unwrap_or(0)
    }
}
