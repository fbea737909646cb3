//! JSON snapshot persistence for watermark state.
//!
//! Writes go to a temp file in the same directory, then rename over the
//! target, so a crash mid-write never leaves a truncated snapshot.

use chrono::{DateTime, Utc};
use kora_core::error::KoraError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use tracing::warn;

/// On-disk watermark state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatermarkSnapshot {
    /// Session that wrote this snapshot. Informational only — each
    /// process start generates a new one.
    pub session_id: String,
    pub global_last_processed: Option<DateTime<Utc>>,
    #[serde(default)]
    pub per_conversation: HashMap<String, DateTime<Utc>>,
    /// Processed ids, oldest first.
    #[serde(default)]
    pub processed_ids: Vec<String>,
}

/// Read the snapshot at `path`. Missing or unreadable files yield `None`
/// (with a warning for the unreadable case) — recovery starts fresh.
pub async fn read(path: &Path) -> Option<WatermarkSnapshot> {
    let bytes = match tokio::fs::read(path).await {
        Ok(b) => b,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
        Err(e) => {
            warn!("failed to read watermark snapshot {}: {e}", path.display());
            return None;
        }
    };
    match serde_json::from_slice(&bytes) {
        Ok(snap) => Some(snap),
        Err(e) => {
            warn!(
                "corrupt watermark snapshot {}, starting fresh: {e}",
                path.display()
            );
            None
        }
    }
}

/// Write the snapshot atomically (temp file + rename).
pub async fn write(path: &Path, snapshot: &WatermarkSnapshot) -> Result<(), KoraError> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| KoraError::Persistence(format!("create snapshot dir: {e}")))?;
    }

    let bytes = serde_json::to_vec_pretty(snapshot)
        .map_err(|e| KoraError::Persistence(format!("serialize snapshot: {e}")))?;

    let tmp = path.with_extension("json.tmp");
    tokio::fs::write(&tmp, &bytes)
        .await
        .map_err(|e| KoraError::Persistence(format!("write snapshot: {e}")))?;
    tokio::fs::rename(&tmp, path)
        .await
        .map_err(|e| KoraError::Persistence(format!("rename snapshot: {e}")))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_write_then_read() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("w.json");
        let snap = WatermarkSnapshot {
            session_id: "s1".into(),
            global_last_processed: Some(Utc::now()),
            per_conversation: HashMap::from([("c1".to_string(), Utc::now())]),
            processed_ids: vec!["m1".into(), "m2".into()],
        };
        write(&path, &snap).await.unwrap();

        let loaded = read(&path).await.unwrap();
        assert_eq!(loaded.session_id, "s1");
        assert_eq!(loaded.processed_ids, vec!["m1", "m2"]);
        assert!(loaded.per_conversation.contains_key("c1"));
    }

    #[tokio::test]
    async fn test_missing_file_is_none() {
        let dir = tempfile::tempdir().unwrap();
        assert!(read(&dir.path().join("absent.json")).await.is_none());
    }

    #[tokio::test]
    async fn test_no_tmp_file_left_behind() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("w.json");
        let snap = WatermarkSnapshot {
            session_id: "s1".into(),
            global_last_processed: None,
            per_conversation: HashMap::new(),
            processed_ids: vec![],
        };
        write(&path, &snap).await.unwrap();
        assert!(path.exists());
        assert!(!path.with_extension("json.tmp").exists());
    }
}
