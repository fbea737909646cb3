mod commands;
mod gateway;
mod replies;

use clap::{Parser, Subcommand};
use kora_core::config::{self, shellexpand};
use kora_directory::Directory;
use kora_watermark::WatermarkTracker;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::mpsc;

#[derive(Parser)]
#[command(
    name = "kora",
    version,
    about = "Kora — conversational agent message router"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to config file.
    #[arg(short, long, default_value = "config.toml")]
    config: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the agent on the stdio transport.
    Start,
    /// Show configuration and persisted state.
    Status,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    match cli.command {
        Commands::Start => {
            let cfg = config::load(&cli.config)?;

            // The directory must be reachable at startup; everything
            // else degrades, this aborts.
            let directory = Directory::new(&cfg.directory).await?;

            let tracker = Arc::new(
                WatermarkTracker::load(&cfg.watermark, snapshot_path(&cfg)).await,
            );

            let transport = Arc::new(gateway::StdioGateway);

            println!("Kora — starting agent (Ctrl-C to stop)...");
            let gw = Arc::new(
                gateway::Gateway::new(&cfg, transport, directory, tracker).await?,
            );

            let (tx, rx) = mpsc::channel(256);
            let _stdin_task = gateway::StdioGateway::start(tx);
            gw.run(rx).await?;
        }
        Commands::Status => {
            let cfg = config::load(&cli.config)?;
            println!("Kora — Status\n");
            println!("Config: {}", cli.config);
            println!("Name: {}", cfg.kora.name);
            println!("Data dir: {}", cfg.kora.data_dir);
            println!("Directory db: {}", cfg.directory.db_path);
            println!();

            let path = snapshot_path(&cfg);
            match std::fs::read_to_string(&path) {
                Ok(raw) => match serde_json::from_str::<serde_json::Value>(&raw) {
                    Ok(snapshot) => {
                        println!("Watermark snapshot: {}", path.display());
                        if let Some(session) = snapshot.get("session_id") {
                            println!("  last session: {session}");
                        }
                        if let Some(global) = snapshot.get("global_last_processed") {
                            println!("  global watermark: {global}");
                        }
                        if let Some(ids) = snapshot.get("processed_ids").and_then(|v| v.as_array())
                        {
                            println!("  remembered ids: {}", ids.len());
                        }
                    }
                    Err(_) => println!("Watermark snapshot: {} (corrupt)", path.display()),
                },
                Err(_) => println!("Watermark snapshot: none"),
            }
        }
    }

    Ok(())
}

/// Snapshot file path, relative to the data dir unless absolute.
fn snapshot_path(cfg: &kora_core::config::Config) -> PathBuf {
    let file = PathBuf::from(&cfg.watermark.snapshot_file);
    if file.is_absolute() {
        file
    } else {
        PathBuf::from(shellexpand(&cfg.kora.data_dir)).join(file)
    }
}
