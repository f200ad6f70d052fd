use anyhow::Result;
use clap::Parser;
use interview_speech::pipeline::{ChunkProcessor, SessionFinalizer};
use interview_speech::services::{MemoryInterviewStore, MemoryObjectStore, ScriptedTranscriber};
use interview_speech::session::{spawn_idle_sweeper, SessionCache};
use interview_speech::{AppState, Config};
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(name = "interview-speech", about = "Live-interview speech pipeline")]
struct Args {
    /// Config file path (without extension, config-crate style)
    #[arg(long, default_value = "config/interview-speech")]
    config: String,

    /// Override the HTTP port from the config file
    #[arg(long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let args = Args::parse();

    let cfg = match Config::load(&args.config) {
        Ok(cfg) => cfg,
        Err(e) => {
            warn!("Could not load config {} ({}), using defaults", args.config, e);
            Config::default()
        }
    };
    let port = args.port.unwrap_or(cfg.service.http.port);

    info!("{} starting", cfg.service.name);

    let cache = Arc::new(SessionCache::new(cfg.pipeline.cache_capacity));
    // Dev wiring: in-memory collaborators behind the trait seams. Production
    // deployments plug in the real object store, recognizer and database.
    let storage = Arc::new(MemoryObjectStore::default());
    let transcriber = Arc::new(ScriptedTranscriber::default());
    let store = Arc::new(MemoryInterviewStore::default());

    let processor = Arc::new(ChunkProcessor::new(
        Arc::clone(&cache),
        storage.clone(),
        transcriber,
    ));
    let finalizer = Arc::new(SessionFinalizer::new(
        Arc::clone(&cache),
        storage,
        store,
        cfg.pipeline.finalize_config(),
    ));

    spawn_idle_sweeper(
        Arc::clone(&cache),
        cfg.pipeline.sweep_interval(),
        cfg.pipeline.idle_timeout(),
    );

    let app = interview_speech::create_router(AppState::new(cache, processor, finalizer));

    let addr = format!("{}:{}", cfg.service.http.bind, port);
    info!("HTTP server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
