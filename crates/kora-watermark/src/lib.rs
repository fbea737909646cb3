//! # kora-watermark
//!
//! Durable, monotonic dedup/ordering guard for inbound messages.
//!
//! Tracks three things: a bounded ring of recently processed message ids,
//! a global last-processed timestamp, and a per-conversation
//! last-processed timestamp. A message is admitted only if it is new by
//! all three measures, falls inside the startup replay window, and is not
//! our own echo.
//!
//! State snapshots to a JSON file every N marks and on clean shutdown.
//! The last snapshot is authoritative on restart; messages processed
//! after it but before a crash may be reprocessed. That window is a
//! documented tradeoff, not a defect.

mod ring;
mod snapshot;

pub use ring::ProcessedRing;
pub use snapshot::WatermarkSnapshot;

use chrono::{DateTime, Duration, Utc};
use kora_core::{config::WatermarkConfig, error::KoraError, message::Message};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Mutex;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Admission decision for an inbound message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Accept,
    Reject(RejectReason),
}

/// Why a message was rejected, in check order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    /// Id already in the processed ring.
    Duplicate,
    /// Timestamp at or before the global watermark.
    StaleGlobal,
    /// Timestamp at or before this conversation's watermark.
    StaleConversation,
    /// Older than process start minus the startup window — history replay.
    BeforeStartupWindow,
    /// Our own outbound echo.
    FromSelf,
}

struct Inner {
    processed: ProcessedRing,
    global_last: Option<DateTime<Utc>>,
    per_conversation: HashMap<String, DateTime<Utc>>,
    marks_since_snapshot: u64,
}

/// Durable watermark tracker. One per process.
pub struct WatermarkTracker {
    inner: Mutex<Inner>,
    /// Serializes snapshot writes — an in-flight write blocks the next one.
    write_lock: tokio::sync::Mutex<()>,
    snapshot_path: PathBuf,
    snapshot_every: u64,
    started_at: DateTime<Utc>,
    startup_window: Duration,
    session_id: String,
}

impl WatermarkTracker {
    /// Create a tracker from the last snapshot on disk, or fresh state if
    /// none exists. A new session id is generated either way.
    pub async fn load(config: &WatermarkConfig, snapshot_path: PathBuf) -> Self {
        let session_id = Uuid::new_v4().to_string();
        let snapshot = snapshot::read(&snapshot_path).await;

        let inner = match snapshot {
            Some(s) => {
                info!(
                    "watermark snapshot loaded: {} ids, global={:?}",
                    s.processed_ids.len(),
                    s.global_last_processed
                );
                Inner {
                    processed: ProcessedRing::from_ids(config.processed_capacity, s.processed_ids),
                    global_last: s.global_last_processed,
                    per_conversation: s.per_conversation,
                    marks_since_snapshot: 0,
                }
            }
            None => {
                info!("no watermark snapshot found, starting fresh");
                Inner {
                    processed: ProcessedRing::new(config.processed_capacity),
                    global_last: None,
                    per_conversation: HashMap::new(),
                    marks_since_snapshot: 0,
                }
            }
        };

        Self {
            inner: Mutex::new(inner),
            write_lock: tokio::sync::Mutex::new(()),
            snapshot_path,
            snapshot_every: config.snapshot_every.max(1),
            started_at: Utc::now(),
            startup_window: Duration::minutes(config.startup_window_mins),
            session_id,
        }
    }

    /// Session id regenerated each process start.
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Decide whether a message should be processed. Checks run in fixed
    /// order and the first failing check names the rejection.
    pub fn should_process(&self, msg: &Message) -> Decision {
        let inner = self.inner.lock().expect("watermark lock poisoned");

        if inner.processed.contains(&msg.id) {
            return Decision::Reject(RejectReason::Duplicate);
        }
        if let Some(global) = inner.global_last {
            if msg.timestamp <= global {
                return Decision::Reject(RejectReason::StaleGlobal);
            }
        }
        if let Some(conv) = inner.per_conversation.get(&msg.conversation_id) {
            if msg.timestamp <= *conv {
                return Decision::Reject(RejectReason::StaleConversation);
            }
        }
        if msg.timestamp < self.started_at - self.startup_window {
            return Decision::Reject(RejectReason::BeforeStartupWindow);
        }
        if msg.from_self {
            return Decision::Reject(RejectReason::FromSelf);
        }
        Decision::Accept
    }

    /// Record a message as processed: remember its id, advance the global
    /// and per-conversation watermarks (never backward), and snapshot
    /// every N marks.
    pub async fn mark_processed(&self, msg: &Message) {
        let due = {
            let mut inner = self.inner.lock().expect("watermark lock poisoned");
            inner.processed.insert(msg.id.clone());

            if inner.global_last.is_none_or(|g| msg.timestamp > g) {
                inner.global_last = Some(msg.timestamp);
            }
            let conv = inner
                .per_conversation
                .entry(msg.conversation_id.clone())
                .or_insert(msg.timestamp);
            if msg.timestamp > *conv {
                *conv = msg.timestamp;
            }

            inner.marks_since_snapshot += 1;
            if inner.marks_since_snapshot >= self.snapshot_every {
                inner.marks_since_snapshot = 0;
                true
            } else {
                false
            }
        };

        if due {
            if let Err(e) = self.snapshot().await {
                warn!("periodic watermark snapshot failed: {e}");
            }
        }
    }

    /// Write the current state to disk. Failures are non-fatal to the
    /// caller; in-memory state stays authoritative.
    pub async fn snapshot(&self) -> Result<(), KoraError> {
        let _guard = self.write_lock.lock().await;
        let snap = {
            let inner = self.inner.lock().expect("watermark lock poisoned");
            WatermarkSnapshot {
                session_id: self.session_id.clone(),
                global_last_processed: inner.global_last,
                per_conversation: inner.per_conversation.clone(),
                processed_ids: inner.processed.ids(),
            }
        };
        snapshot::write(&self.snapshot_path, &snap).await?;
        debug!(
            "watermark snapshot written: {} ids",
            snap.processed_ids.len()
        );
        Ok(())
    }

    /// Current global watermark, for introspection.
    pub fn global_last_processed(&self) -> Option<DateTime<Utc>> {
        self.inner.lock().expect("watermark lock poisoned").global_last
    }

    /// Current watermark for one conversation.
    pub fn conversation_last_processed(&self, conversation_id: &str) -> Option<DateTime<Utc>> {
        self.inner
            .lock()
            .expect("watermark lock poisoned")
            .per_conversation
            .get(conversation_id)
            .copied()
    }

    /// Number of remembered processed ids.
    pub fn processed_count(&self) -> usize {
        self.inner.lock().expect("watermark lock poisoned").processed.len()
    }
}
