use anyhow::Result;
use axum::routing::get;
use clap::Parser;
use metrics_exporter_prometheus::PrometheusBuilder;
use pgelastic::config::LoggingConfig;
use pgelastic::store::{MemoryBackend, PostgresBackend, StorageBackend};
use pgelastic::{Config, DocumentStore};
use std::path::Path;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "pgelastic-server")]
#[command(about = "Elasticsearch-compatible API backed by PostgreSQL")]
#[command(version)]
struct Args {
    /// Configuration file path
    #[arg(short, long, default_value = "pgelastic.toml")]
    config: String,

    /// Host to bind to (overrides config)
    #[arg(long)]
    host: Option<String>,

    /// Port to listen on (overrides config)
    #[arg(short, long)]
    port: Option<u16>,

    /// Keep all data in process memory instead of PostgreSQL
    #[arg(long)]
    memory: bool,
}

fn init_tracing(logging: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));
    let registry = tracing_subscriber::registry().with(filter);

    if logging.format == "json" {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = Config::load_or_default(Path::new(&args.config))?;
    if let Some(host) = args.host {
        config.server.host = host;
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }

    init_tracing(&config.logging);
    tracing::info!("Config file: {}", args.config);

    let backend: Arc<dyn StorageBackend> = if args.memory {
        tracing::warn!("Running with the in-memory backend; data is lost on exit");
        Arc::new(MemoryBackend::new())
    } else {
        Arc::new(PostgresBackend::connect(&config.postgres).await?)
    };

    let store = Arc::new(DocumentStore::new(backend));
    store.initialize().await?;

    let mut app = pgelastic_es_compat::es_compat_router(store, config.server.max_body_size);

    if config.metrics.enabled {
        let handle = PrometheusBuilder::new().install_recorder()?;
        app = app.route(
            "/_metrics",
            get(move || {
                let handle = handle.clone();
                async move { handle.render() }
            }),
        );
        tracing::info!("Prometheus metrics at /_metrics");
    }

    let app = app.layer(TraceLayer::new_for_http());

    let addr = config.server.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
}
