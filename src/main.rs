use std::error::Error;
use std::sync::Arc;

use clap::Parser;
use tracing::{debug, info, warn};

use logstream::broker::{Broker, Dispatcher};
use logstream::config::{DEFAULT_CONFIG_PATH, Settings, load_config_from};
use logstream::dataset::Dataset;
use logstream::record::LogRecord;
use logstream::transport::{AppState, bind, build_router, serve};
use logstream::utils::error::DeliveryError;
use logstream::utils::logging;

/// In-memory log ingestion and streaming server.
#[derive(Debug, Parser)]
#[command(name = "logstream", version, about)]
struct Cli {
    /// Configuration file, with or without extension.
    #[arg(long, default_value = DEFAULT_CONFIG_PATH)]
    config: String,

    /// Override `server.host`.
    #[arg(long)]
    host: Option<String>,

    /// Override `server.port`.
    #[arg(long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() {
    if let Err(e) = run(Cli::parse()).await {
        eprintln!("logstream: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn Error>> {
    dotenvy::dotenv().ok();

    let mut settings: Settings = load_config_from(&cli.config)?;
    if let Some(host) = cli.host {
        settings.server.host = host;
    }
    if let Some(port) = cli.port {
        settings.server.port = port;
    }

    logging::init(&settings.logging.level);
    debug!(?settings, "configuration loaded");

    let dataset = match settings.dataset.path.as_deref() {
        Some(path) => Dataset::load(path).unwrap_or_else(|e| {
            warn!(path, error = %e, "cannot load dataset, using built-in sample");
            Dataset::builtin()
        }),
        None => Dataset::builtin(),
    };

    let broker = Arc::new(Broker::new());
    let topic = settings.broker.topic.clone();

    // Local consumer so ingested records show up in the server log.
    broker.subscribe(&topic, |record: &LogRecord| -> Result<(), DeliveryError> {
        debug!(
            topic = %record.topic,
            offset = record.offset,
            service = record.service(),
            level = %record.level(),
            "{}",
            record.entry.message
        );
        Ok(())
    });

    let dispatcher = Dispatcher::new(Arc::clone(&broker), settings.broker.dispatch_config());
    dispatcher.start();

    let state = Arc::new(AppState::new(Arc::clone(&broker), dataset, &topic));
    let router = build_router(state, settings.server.request_timeout());

    let listener = bind(&settings.server.addr()).await?;
    let served = serve(listener, router, async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "cannot listen for shutdown signal");
            std::future::pending::<()>().await;
        }
        info!("shutdown signal received");
    })
    .await;

    dispatcher.stop().await;
    served?;
    info!("server stopped");
    Ok(())
}
