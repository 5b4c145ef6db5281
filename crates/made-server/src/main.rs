//! HTTP facade for the cognitive memory degradation engine. Converts
//! personality-assessment snapshots into decay parameters, serves a
//! persistent store of agent cognitive states, and drives the clock-based
//! degradation loop on demand.

mod config;
mod dto;
mod routes;

use std::net::SocketAddr;
use std::sync::Arc;

use clap::Parser;
use made_core::linguistic::{GeminiClient, LinguisticClient, NullClient};
use made_core::store::Store;
use tower_http::trace::TraceLayer;
use tracing::{error, info, Level};
use tracing_subscriber::EnvFilter;

use crate::config::Config;
use crate::routes::{router, AppState};

#[derive(Parser, Debug)]
#[command(name = "made-server", version, about = "Cognitive memory degradation engine HTTP facade")]
struct Cli {
    /// Path to the SQLite store file, overriding MADE_SQLITE_PATH.
    #[arg(long)]
    sqlite_path: Option<std::path::PathBuf>,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(Level::INFO.into()))
        .with_target(false)
        .init();

    info!("made-server v{} starting...", env!("CARGO_PKG_VERSION"));

    let mut config = Config::from_env();
    if let Some(path) = cli.sqlite_path {
        config.sqlite_path = path;
    }

    info!(store_url = %config.store_url, "document-store URL accepted for interface parity; embedded SQLite is the actual backing store");

    let store = match Store::open(&config.sqlite_path) {
        Ok(s) => {
            info!(path = %config.sqlite_path.display(), "cognitive record store initialized");
            Arc::new(s)
        }
        Err(e) => {
            error!("failed to initialize cognitive record store: {e}");
            std::process::exit(1);
        }
    };

    let linguistic: Arc<dyn LinguisticClient> = match &config.linguistic_api_key {
        Some(key) => {
            info!("linguistic dispatcher: Gemini client configured");
            Arc::new(GeminiClient::new(key.clone()))
        }
        None => {
            info!("linguistic dispatcher: no credential configured, running fallback-only");
            Arc::new(NullClient)
        }
    };

    let bind_address = config.bind_address;
    let port = config.port;
    let state = Arc::new(AppState::new(store, linguistic, config));

    let app = router(state).layer(TraceLayer::new_for_http());

    let addr = SocketAddr::new(bind_address, port);
    info!("listening on http://{addr}");

    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(l) => l,
        Err(e) => {
            error!("failed to bind {addr}: {e}");
            std::process::exit(1);
        }
    };

    if let Err(e) = axum::serve(listener, app).with_graceful_shutdown(shutdown_signal()).await {
        error!("server error: {e}");
        std::process::exit(1);
    }

    info!("made-server shutting down");
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c().await.expect("failed to listen for ctrl+c");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to listen for SIGTERM")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("received Ctrl+C, shutting down"),
        _ = terminate => info!("received SIGTERM, shutting down"),
    }
}
