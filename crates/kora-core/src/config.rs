use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

use crate::error::KoraError;
use crate::user::UserLevel;

/// Top-level Kora configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub kora: KoraConfig,
    #[serde(default)]
    pub classifier: ClassifierConfig,
    #[serde(default)]
    pub watermark: WatermarkConfig,
    #[serde(default)]
    pub flows: FlowConfig,
    #[serde(default)]
    pub directory: DirectoryConfig,
    #[serde(default)]
    pub commands: CommandsConfig,
    /// Per-tier time window and hourly quota, keyed by level name
    /// ("basic", "standard", ...). Missing tiers fall back to defaults.
    #[serde(default)]
    pub tiers: HashMap<String, TierPolicy>,
}

/// General agent settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KoraConfig {
    #[serde(default = "default_name")]
    pub name: String,
    #[serde(default = "default_data_dir")]
    pub data_dir: String,
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for KoraConfig {
    fn default() -> Self {
        Self {
            name: default_name(),
            data_dir: default_data_dir(),
            log_level: default_log_level(),
        }
    }
}

/// Classifier settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifierConfig {
    /// Prefix character that marks a command (`/help`).
    #[serde(default = "default_prefix")]
    pub prefix: char,
    /// Cap on extracted keywords per message.
    #[serde(default = "default_max_keywords")]
    pub max_keywords: usize,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            prefix: default_prefix(),
            max_keywords: default_max_keywords(),
        }
    }
}

/// Watermark tracker settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatermarkConfig {
    /// Maximum processed ids remembered; oldest are evicted beyond this.
    #[serde(default = "default_processed_capacity")]
    pub processed_capacity: usize,
    /// Snapshot to disk every N `mark_processed` calls.
    #[serde(default = "default_snapshot_every")]
    pub snapshot_every: u64,
    /// Snapshot file path, relative to `data_dir` unless absolute.
    #[serde(default = "default_snapshot_file")]
    pub snapshot_file: String,
    /// Messages older than process start minus this window are rejected.
    #[serde(default = "default_startup_window_mins")]
    pub startup_window_mins: i64,
}

impl Default for WatermarkConfig {
    fn default() -> Self {
        Self {
            processed_capacity: default_processed_capacity(),
            snapshot_every: default_snapshot_every(),
            snapshot_file: default_snapshot_file(),
            startup_window_mins: default_startup_window_mins(),
        }
    }
}

/// Conversation flow settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlowConfig {
    /// How often the gateway sweeps expired contexts.
    #[serde(default = "default_cleanup_interval_secs")]
    pub cleanup_interval_secs: u64,
    /// Maximum lifetime of a guided flow before the sweep reaps it.
    #[serde(default = "default_flow_max_duration_secs")]
    pub max_duration_secs: u64,
}

impl Default for FlowConfig {
    fn default() -> Self {
        Self {
            cleanup_interval_secs: default_cleanup_interval_secs(),
            max_duration_secs: default_flow_max_duration_secs(),
        }
    }
}

/// User directory (SQLite) settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DirectoryConfig {
    #[serde(default = "default_db_path")]
    pub db_path: String,
}

impl Default for DirectoryConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
        }
    }
}

/// Command registry settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandsConfig {
    /// Fold case when resolving names and aliases.
    #[serde(default = "default_true")]
    pub case_insensitive: bool,
}

impl Default for CommandsConfig {
    fn default() -> Self {
        Self {
            case_insensitive: true,
        }
    }
}

/// Time-of-day window and hourly quota for a user tier.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct TierPolicy {
    /// Commands allowed from this hour (inclusive).
    #[serde(default)]
    pub window_start_hour: u32,
    /// Commands allowed until this hour (exclusive). 24 = no upper bound.
    #[serde(default = "default_window_end")]
    pub window_end_hour: u32,
    /// Commands per hour. `-1` = unlimited.
    #[serde(default = "default_quota")]
    pub hourly_quota: i64,
}

impl Default for TierPolicy {
    fn default() -> Self {
        Self {
            window_start_hour: 0,
            window_end_hour: default_window_end(),
            hourly_quota: default_quota(),
        }
    }
}

impl Config {
    /// Resolve the policy for a user level, falling back to the default
    /// (always-open, limited) policy when the tier is not configured.
    pub fn tier_policy(&self, level: UserLevel) -> TierPolicy {
        self.tiers
            .get(level.as_str())
            .copied()
            .unwrap_or_default()
    }
}

fn default_name() -> String {
    "kora".to_string()
}
fn default_data_dir() -> String {
    "~/.kora".to_string()
}
fn default_log_level() -> String {
    "info".to_string()
}
fn default_prefix() -> char {
    '/'
}
fn default_max_keywords() -> usize {
    5
}
fn default_processed_capacity() -> usize {
    1000
}
fn default_snapshot_every() -> u64 {
    25
}
fn default_snapshot_file() -> String {
    "watermark.json".to_string()
}
fn default_startup_window_mins() -> i64 {
    60
}
fn default_cleanup_interval_secs() -> u64 {
    60
}
fn default_flow_max_duration_secs() -> u64 {
    1800
}
fn default_db_path() -> String {
    "~/.kora/kora.db".to_string()
}
fn default_true() -> bool {
    true
}
fn default_window_end() -> u32 {
    24
}
fn default_quota() -> i64 {
    30
}

/// Expand `~` to home directory.
pub fn shellexpand(path: &str) -> String {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = std::env::var_os("HOME") {
            return format!("{}/{rest}", home.to_string_lossy());
        }
    }
    path.to_string()
}

/// Load configuration from a TOML file, falling back to defaults when the
/// file does not exist.
pub fn load(path: &str) -> Result<Config, KoraError> {
    let path = Path::new(path);
    if !path.exists() {
        tracing::info!(
            "Config file not found at {}, using defaults",
            path.display()
        );
        return Ok(Config::default());
    }

    let content = std::fs::read_to_string(path)
        .map_err(|e| KoraError::Config(format!("failed to read {}: {}", path.display(), e)))?;

    let config: Config = toml::from_str(&content)
        .map_err(|e| KoraError::Config(format!("failed to parse config: {}", e)))?;

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cfg = Config::default();
        assert_eq!(cfg.classifier.prefix, '/');
        assert_eq!(cfg.watermark.processed_capacity, 1000);
        assert_eq!(cfg.watermark.startup_window_mins, 60);
        assert!(cfg.commands.case_insensitive);
    }

    #[test]
    fn test_tier_policy_from_toml() {
        let toml_str = r#"
            [tiers.basic]
            window_start_hour = 8
            window_end_hour = 22
            hourly_quota = 10

            [tiers.admin]
            hourly_quota = -1
        "#;
        let cfg: Config = toml::from_str(toml_str).unwrap();
        let basic = cfg.tier_policy(UserLevel::Basic);
        assert_eq!(basic.window_start_hour, 8);
        assert_eq!(basic.window_end_hour, 22);
        assert_eq!(basic.hourly_quota, 10);

        let admin = cfg.tier_policy(UserLevel::Admin);
        assert_eq!(admin.hourly_quota, -1);
        // Unspecified fields keep defaults.
        assert_eq!(admin.window_end_hour, 24);
    }

    #[test]
    fn test_unconfigured_tier_falls_back() {
        let cfg = Config::default();
        let policy = cfg.tier_policy(UserLevel::Standard);
        assert_eq!(policy.window_start_hour, 0);
        assert_eq!(policy.window_end_hour, 24);
        assert_eq!(policy.hourly_quota, 30);
    }

    #[test]
    fn test_level_ordering() {
        assert!(UserLevel::Blocked < UserLevel::Basic);
        assert!(UserLevel::Basic < UserLevel::Standard);
        assert!(UserLevel::Standard < UserLevel::Advanced);
        assert!(UserLevel::Advanced < UserLevel::Admin);
    }
}
