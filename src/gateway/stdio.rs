//! Line-oriented local transport, for running the agent in a terminal.

use async_trait::async_trait;
use chrono::Utc;
use kora_core::{error::KoraError, message::Message, traits::MessageGateway};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::error;
use uuid::Uuid;

/// Stdin in, stdout out. One conversation, one sender.
pub struct StdioGateway;

impl StdioGateway {
    /// Forward stdin lines as inbound messages until EOF. Dropping the
    /// receiver stops the forwarder.
    pub fn start(tx: mpsc::Sender<Message>) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            let mut lines = BufReader::new(tokio::io::stdin()).lines();
            loop {
                match lines.next_line().await {
                    Ok(Some(line)) => {
                        let text = line.trim().to_string();
                        if text.is_empty() {
                            continue;
                        }
                        let msg = Message {
                            id: Uuid::new_v4().to_string(),
                            conversation_id: "stdio".to_string(),
                            sender_id: "local".to_string(),
                            text,
                            timestamp: Utc::now(),
                            from_self: false,
                            media: None,
                        };
                        if tx.send(msg).await.is_err() {
                            break;
                        }
                    }
                    Ok(None) => break,
                    Err(e) => {
                        error!("stdin read failed: {e}");
                        break;
                    }
                }
            }
        })
    }
}

#[async_trait]
impl MessageGateway for StdioGateway {
    fn name(&self) -> &str {
        "stdio"
    }

    async fn send(&self, _conversation_id: &str, text: &str) -> Result<(), KoraError> {
        println!("{text}");
        Ok(())
    }
}
