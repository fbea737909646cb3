use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Ordered user hierarchy. Commands declare a minimum level; the ordering
/// here is the whole comparison (`Blocked < Basic < Standard < Advanced < Admin`).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "lowercase")]
pub enum UserLevel {
    Blocked,
    #[default]
    Basic,
    Standard,
    Advanced,
    Admin,
}

impl UserLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            UserLevel::Blocked => "blocked",
            UserLevel::Basic => "basic",
            UserLevel::Standard => "standard",
            UserLevel::Advanced => "advanced",
            UserLevel::Admin => "admin",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "blocked" => Some(UserLevel::Blocked),
            "basic" => Some(UserLevel::Basic),
            "standard" => Some(UserLevel::Standard),
            "advanced" => Some(UserLevel::Advanced),
            "admin" => Some(UserLevel::Admin),
            _ => None,
        }
    }
}

/// A user known to the directory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    /// Conversation the user is bound to (one conversation per user).
    pub conversation_id: String,
    pub display_name: Option<String>,
    pub level: UserLevel,
    /// Inactive users are banned from command execution.
    pub active: bool,
    /// Preferred reply language ("es", "en", "pt").
    pub language: String,
    pub created_at: DateTime<Utc>,
}

/// Partial update applied through `UserLookup::update_user`.
/// `None` fields are left untouched.
#[derive(Debug, Clone, Default)]
pub struct UserPatch {
    pub display_name: Option<String>,
    pub level: Option<UserLevel>,
    pub language: Option<String>,
    pub active: Option<bool>,
}
