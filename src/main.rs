use anyhow::Result;
use audioscribe::pipeline::{JobQueue, NatsQueue, Orchestrator};
use audioscribe::{create_router, AppState, Config, MemoryStore, Store};
use clap::Parser;
use std::sync::Arc;
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "audioscribe", about = "Audio transcription service")]
struct Args {
    /// Config file base path, without extension
    #[arg(short, long, default_value = "config/audioscribe")]
    config: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let args = Args::parse();
    let cfg = Config::load(&args.config)?;

    info!("Audioscribe v0.1.0");
    info!("Loaded config: {}", cfg.service.name);
    info!(
        "HTTP server will bind to {}:{}",
        cfg.service.http.bind, cfg.service.http.port
    );
    info!("Recordings directory: {}", cfg.storage.recordings_path);

    std::fs::create_dir_all(&cfg.storage.recordings_path)?;

    let store: Arc<dyn Store> = Arc::new(MemoryStore::new());

    let nats = NatsQueue::connect(&cfg.pipeline.nats_url, cfg.pipeline.subject_prefix.clone())
        .await?;
    let subscriber = nats.subscribe_all().await?;
    let queue: Arc<dyn JobQueue> = Arc::new(nats);

    let orchestrator = Arc::new(Orchestrator::new(store.clone(), queue, cfg.clone()));

    let worker = orchestrator.clone();
    tokio::spawn(async move {
        if let Err(e) = worker.run_nats_worker(subscriber).await {
            error!("Pipeline worker exited with error: {:#}", e);
        }
    });

    let state = AppState::new(store, orchestrator);
    let app = create_router(state);

    let addr = format!("{}:{}", cfg.service.http.bind, cfg.service.http.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Listening on {}", addr);
    axum::serve(listener, app).await?;

    Ok(())
}
