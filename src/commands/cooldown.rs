//! Per-user, per-command cooldowns.

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Mutex;

/// Tracks when each (user, command) pair may run again. Expired entries
/// are evicted lazily on the next touch of the same key and in bulk by
/// the gateway's periodic sweep.
#[derive(Default)]
pub struct CooldownMap {
    until: Mutex<HashMap<(String, String), DateTime<Utc>>>,
}

impl CooldownMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seconds left on the cooldown, rounded up. `None` when the pair is
    /// free to run.
    pub fn remaining(&self, user_id: &str, command: &str, now: DateTime<Utc>) -> Option<u64> {
        let key = (user_id.to_string(), command.to_string());
        let mut until = self.until.lock().expect("cooldown lock poisoned");
        match until.get(&key) {
            Some(&expiry) if expiry > now => {
                let millis = (expiry - now).num_milliseconds().max(0) as u64;
                Some(millis.div_ceil(1000))
            }
            Some(_) => {
                until.remove(&key);
                None
            }
            None => None,
        }
    }

    /// Start a cooldown. Zero seconds is a no-op.
    pub fn set(&self, user_id: &str, command: &str, secs: u64, now: DateTime<Utc>) {
        if secs == 0 {
            return;
        }
        let expiry = now + chrono::Duration::seconds(secs as i64);
        self.until
            .lock()
            .expect("cooldown lock poisoned")
            .insert((user_id.to_string(), command.to_string()), expiry);
    }

    /// Drop every expired entry. Returns how many were removed.
    pub fn sweep(&self, now: DateTime<Utc>) -> usize {
        let mut until = self.until.lock().expect("cooldown lock poisoned");
        let before = until.len();
        until.retain(|_, expiry| *expiry > now);
        before - until.len()
    }
}
