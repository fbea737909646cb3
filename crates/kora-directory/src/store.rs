use async_trait::async_trait;
use chrono::{DateTime, Utc};
use kora_core::{
    config::{shellexpand, DirectoryConfig},
    error::KoraError,
    traits::UserLookup,
    user::{User, UserLevel, UserPatch},
};
use kora_flows::ConversationContext;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::str::FromStr;
use tracing::info;

/// Persistent user directory backed by SQLite.
#[derive(Clone)]
pub struct Directory {
    pool: SqlitePool,
}

impl Directory {
    /// Open (or create) the directory database and run migrations.
    pub async fn new(config: &DirectoryConfig) -> Result<Self, KoraError> {
        let db_path = shellexpand(&config.db_path);

        // Ensure parent directory exists.
        if let Some(parent) = std::path::Path::new(&db_path).parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| KoraError::Directory(format!("failed to create data dir: {e}")))?;
        }

        let opts = SqliteConnectOptions::from_str(&format!("sqlite:{db_path}"))
            .map_err(|e| KoraError::Directory(format!("invalid db path: {e}")))?
            .create_if_missing(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal);

        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .connect_with(opts)
            .await
            .map_err(|e| KoraError::Directory(format!("failed to connect to sqlite: {e}")))?;

        Self::run_migrations(&pool).await?;

        info!("user directory initialized at {db_path}");

        Ok(Self { pool })
    }

    /// Run SQL migrations, tracking which have already been applied.
    pub(crate) async fn run_migrations(pool: &SqlitePool) -> Result<(), KoraError> {
        sqlx::raw_sql(
            "CREATE TABLE IF NOT EXISTS _migrations (
                name TEXT PRIMARY KEY,
                applied_at TEXT NOT NULL DEFAULT (datetime('now'))
            );",
        )
        .execute(pool)
        .await
        .map_err(|e| KoraError::Directory(format!("failed to create migrations table: {e}")))?;

        let migrations: &[(&str, &str)] =
            &[("001_init", include_str!("../migrations/001_init.sql"))];

        for (name, sql) in migrations {
            let applied: Option<(String,)> =
                sqlx::query_as("SELECT name FROM _migrations WHERE name = ?")
                    .bind(name)
                    .fetch_optional(pool)
                    .await
                    .map_err(|e| {
                        KoraError::Directory(format!("failed to check migration {name}: {e}"))
                    })?;

            if applied.is_some() {
                continue;
            }

            sqlx::raw_sql(sql)
                .execute(pool)
                .await
                .map_err(|e| KoraError::Directory(format!("migration {name} failed: {e}")))?;

            sqlx::query("INSERT INTO _migrations (name) VALUES (?)")
                .bind(name)
                .execute(pool)
                .await
                .map_err(|e| {
                    KoraError::Directory(format!("failed to record migration {name}: {e}"))
                })?;
        }
        Ok(())
    }

    /// Ephemeral in-memory directory. Single connection, since every
    /// `:memory:` connection is its own database.
    pub async fn in_memory() -> Result<Self, KoraError> {
        let opts = SqliteConnectOptions::from_str("sqlite::memory:")
            .map_err(|e| KoraError::Directory(format!("invalid db path: {e}")))?;
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(opts)
            .await
            .map_err(|e| KoraError::Directory(format!("failed to connect to sqlite: {e}")))?;
        Self::run_migrations(&pool).await?;
        Ok(Self { pool })
    }

    #[cfg(test)]
    pub(crate) fn from_pool(pool: SqlitePool) -> Self {
        Self { pool }
    }

    // --- Guided-flow context persistence ---

    /// Upsert the context for its user (one context per user).
    pub async fn save_context(&self, ctx: &ConversationContext) -> Result<(), KoraError> {
        let step_data = serde_json::to_string(&ctx.step_data)
            .map_err(|e| KoraError::Persistence(format!("serialize step data: {e}")))?;
        sqlx::query(
            "INSERT INTO contexts \
             (id, user_id, flow_id, current_step, step_data, created_at, expires_at, active, completed, hook_fired) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?) \
             ON CONFLICT(user_id) DO UPDATE SET \
               id = excluded.id, flow_id = excluded.flow_id, \
               current_step = excluded.current_step, step_data = excluded.step_data, \
               created_at = excluded.created_at, expires_at = excluded.expires_at, \
               active = excluded.active, completed = excluded.completed, \
               hook_fired = excluded.hook_fired",
        )
        .bind(&ctx.id)
        .bind(&ctx.user_id)
        .bind(&ctx.flow_id)
        .bind(&ctx.current_step)
        .bind(&step_data)
        .bind(ctx.created_at.to_rfc3339())
        .bind(ctx.expires_at.to_rfc3339())
        .bind(ctx.active)
        .bind(ctx.completed)
        .bind(ctx.hook_fired)
        .execute(&self.pool)
        .await
        .map_err(|e| KoraError::Persistence(format!("save context failed: {e}")))?;
        Ok(())
    }

    /// Remove the user's persisted context, if any.
    pub async fn remove_context(&self, user_id: &str) -> Result<(), KoraError> {
        sqlx::query("DELETE FROM contexts WHERE user_id = ?")
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(|e| KoraError::Persistence(format!("remove context failed: {e}")))?;
        Ok(())
    }

    /// All active contexts, for restoring flows after a restart.
    pub async fn load_active_contexts(&self) -> Result<Vec<ConversationContext>, KoraError> {
        type Row = (
            String,
            String,
            String,
            String,
            String,
            String,
            String,
            bool,
            bool,
            bool,
        );
        let rows: Vec<Row> = sqlx::query_as(
            "SELECT id, user_id, flow_id, current_step, step_data, created_at, expires_at, \
                    active, completed, hook_fired \
             FROM contexts WHERE active = 1",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| KoraError::Persistence(format!("load contexts failed: {e}")))?;

        let mut contexts = Vec::with_capacity(rows.len());
        for (id, user_id, flow_id, current_step, step_data, created_at, expires_at, active, completed, hook_fired) in
            rows
        {
            contexts.push(ConversationContext {
                id,
                user_id,
                flow_id,
                current_step,
                step_data: serde_json::from_str(&step_data)
                    .map_err(|e| KoraError::Persistence(format!("decode step data: {e}")))?,
                created_at: parse_ts(&created_at)?,
                expires_at: parse_ts(&expires_at)?,
                active,
                completed,
                hook_fired,
            });
        }
        Ok(contexts)
    }
}

fn parse_ts(raw: &str) -> Result<DateTime<Utc>, KoraError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| KoraError::Persistence(format!("bad timestamp '{raw}': {e}")))
}

fn row_to_user(
    (id, conversation_id, display_name, level, active, language, created_at): (
        String,
        String,
        Option<String>,
        String,
        bool,
        String,
        String,
    ),
) -> Result<User, KoraError> {
    Ok(User {
        id,
        conversation_id,
        display_name,
        level: UserLevel::parse(&level).unwrap_or_default(),
        active,
        language,
        created_at: parse_ts(&created_at)?,
    })
}

#[async_trait]
impl UserLookup for Directory {
    async fn get_user_by_conversation(
        &self,
        conversation_id: &str,
    ) -> Result<Option<User>, KoraError> {
        let row: Option<(String, String, Option<String>, String, bool, String, String)> =
            sqlx::query_as(
                "SELECT id, conversation_id, display_name, level, active, language, created_at \
                 FROM users WHERE conversation_id = ?",
            )
            .bind(conversation_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| KoraError::Directory(format!("query failed: {e}")))?;

        row.map(row_to_user).transpose()
    }

    async fn create_user(&self, user: &User) -> Result<(), KoraError> {
        sqlx::query(
            "INSERT INTO users (id, conversation_id, display_name, level, active, language, created_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&user.id)
        .bind(&user.conversation_id)
        .bind(&user.display_name)
        .bind(user.level.as_str())
        .bind(user.active)
        .bind(&user.language)
        .bind(user.created_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|e| KoraError::Directory(format!("create user failed: {e}")))?;
        Ok(())
    }

    async fn update_user(&self, user_id: &str, patch: &UserPatch) -> Result<(), KoraError> {
        if let Some(ref name) = patch.display_name {
            sqlx::query("UPDATE users SET display_name = ? WHERE id = ?")
                .bind(name)
                .bind(user_id)
                .execute(&self.pool)
                .await
                .map_err(|e| KoraError::Directory(format!("update display_name failed: {e}")))?;
        }
        if let Some(level) = patch.level {
            sqlx::query("UPDATE users SET level = ? WHERE id = ?")
                .bind(level.as_str())
                .bind(user_id)
                .execute(&self.pool)
                .await
                .map_err(|e| KoraError::Directory(format!("update level failed: {e}")))?;
        }
        if let Some(ref language) = patch.language {
            sqlx::query("UPDATE users SET language = ? WHERE id = ?")
                .bind(language)
                .bind(user_id)
                .execute(&self.pool)
                .await
                .map_err(|e| KoraError::Directory(format!("update language failed: {e}")))?;
        }
        if let Some(active) = patch.active {
            sqlx::query("UPDATE users SET active = ? WHERE id = ?")
                .bind(active)
                .bind(user_id)
                .execute(&self.pool)
                .await
                .map_err(|e| KoraError::Directory(format!("update active failed: {e}")))?;
        }
        Ok(())
    }
}
