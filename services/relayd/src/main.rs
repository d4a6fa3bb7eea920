//! Relay daemon for hushpost
//!
//! Serves the store-and-forward HTTP surface and runs the retention
//! sweeper until interrupted.

use std::path::PathBuf;
use std::sync::Arc;

use actix_web::{middleware, web, App, HttpServer};
use clap::Parser;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use hushpost_relay::{
    configure, json_config, AppState, MailboxStore, MemoryMailbox, RelayConfig, RelayService,
    SledMailbox, Sweeper,
};

/// Relay daemon CLI arguments
#[derive(Parser, Debug)]
#[command(name = "relayd")]
#[command(about = "Hushpost store-and-forward relay")]
struct Args {
    /// Path to a JSON config file; defaults apply when omitted
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the configured listen address (host:port)
    #[arg(short, long)]
    listen: Option<String>,

    /// Log level
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Initialize logging
    let log_level = match args.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(true)
        .with_thread_ids(true)
        .json()
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .expect("Failed to set tracing subscriber");

    // Resolve configuration
    let mut config = match &args.config {
        Some(path) => RelayConfig::load(path)?,
        None => RelayConfig::default(),
    };
    if let Some(listen) = args.listen {
        config.listen_addr = listen;
    }
    config.validate()?;

    if config.pow_difficulty == 0 {
        warn!("Proof-of-work is disabled; submissions are unpriced");
    }

    // Initialize storage
    let store: Arc<dyn MailboxStore> = match &config.storage.path {
        Some(path) => {
            info!("Opening sled mailbox at {}", path.display());
            Arc::new(SledMailbox::open(path)?)
        }
        None => {
            info!("Using in-memory mailbox");
            Arc::new(MemoryMailbox::new())
        }
    };

    let sweeper = Sweeper::spawn(
        Arc::clone(&store),
        config.retention_secs,
        config.sweep_interval_secs,
    );

    let service = Arc::new(RelayService::new(config.clone(), store)?);
    let app_state = web::Data::new(AppState { service });

    info!(
        "Starting relay on {} (difficulty {}, {} peers{})",
        config.listen_addr,
        config.pow_difficulty,
        config.peers.len(),
        if config.requires_mac() { ", trusted" } else { "" }
    );

    // Start HTTP server
    let max_request_bytes = config.max_request_bytes;
    HttpServer::new(move || {
        App::new()
            .app_data(app_state.clone())
            .app_data(json_config(max_request_bytes))
            .wrap(middleware::Logger::default())
            .configure(configure)
    })
    .bind(config.listen_addr.as_str())?
    .run()
    .await?;

    info!("Server stopped; shutting down sweeper");
    sweeper.shutdown().await;

    Ok(())
}
