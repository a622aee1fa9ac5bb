use anyhow::{Context, Result};
use callscribe::{create_router, AppState, Config, TranscriptArchiver};
use clap::Parser;
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Debug, Parser)]
#[command(name = "callscribe", about = "Real-time voice-call transcript coordinator")]
struct Args {
    /// Config file path (extension optional)
    #[arg(long, default_value = "config/callscribe")]
    config: String,

    /// Override the HTTP listen port
    #[arg(long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let args = Args::parse();
    let mut cfg = Config::load(&args.config)?;
    if let Some(port) = args.port {
        cfg.service.http.port = port;
    }

    info!("{} v{}", cfg.service.name, env!("CARGO_PKG_VERSION"));

    let mut state = AppState::new(cfg.service.http.send_queue);

    if cfg.nats.enabled {
        match TranscriptArchiver::connect(&cfg.nats.url).await {
            Ok(archiver) => state = state.with_archiver(Arc::new(archiver)),
            Err(e) => warn!("Transcript archiving disabled: {}", e),
        }
    }

    let addr = format!("{}:{}", cfg.service.http.bind, cfg.service.http.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("Listening on {}", listener.local_addr()?);

    axum::serve(listener, create_router(state))
        .await
        .context("HTTP server failed")?;

    Ok(())
}
