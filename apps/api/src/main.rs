mod compiler;
mod config;
mod db;
mod errors;
mod layout;
mod llm_client;
mod models;
mod routes;
mod state;
mod store;
mod tailoring;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::compiler::PdfLatexCompiler;
use crate::config::Config;
use crate::db::create_pool;
use crate::llm_client::LlmClient;
use crate::routes::{build_router, cors_layer};
use crate::state::AppState;
use crate::store::ResumeStore;
use crate::tailoring::artifacts::ArtifactStore;
use crate::tailoring::Tailor;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on malformed env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!(
                "{crate_name}={level},tower_http={level}",
                crate_name = env!("CARGO_CRATE_NAME"),
                level = &config.rust_log
            ))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Resume Tailor API v{}", env!("CARGO_PKG_VERSION"));

    // Initialize SQLite and restore the saved resume / context
    let db = create_pool(&config.database_url).await?;
    let store = Arc::new(ResumeStore::new(db));
    if store.restore().await? {
        info!("Saved resume loaded");
    } else {
        info!("No saved resume found. Upload one via the extension.");
    }

    // Initialize LLM client
    let llm = LlmClient::new(config.llm_settings())?;
    if llm.has_credential() {
        info!("LLM client initialized (model: {})", llm.model());
    } else {
        warn!("PERPLEXITY_API_KEY is not set; tailoring requests will fail until it is configured");
    }

    // Compiler and published-PDF directory
    let compiler = PdfLatexCompiler::new(config.pdflatex_bin.clone(), config.compile_timeout);
    let artifacts = ArtifactStore::new(&config.compiled_dir);
    artifacts.ensure_dir().await?;
    info!("Compiled PDFs are published to {}", artifacts.dir().display());

    let policy = config.fit_policy;
    info!(
        "Fit policy: target {:.2}-{:.2}, max {} adjustments",
        policy.low, policy.high, policy.max_attempts
    );
    let tailor = Tailor::new(
        Arc::clone(&store),
        Arc::new(llm),
        Arc::new(compiler),
        artifacts.clone(),
        policy,
    );

    // Build app state
    let state = AppState {
        store: Arc::clone(&store),
        tailor: Arc::new(tailor),
        artifacts,
    };

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer());

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    store.close().await;
    info!("Shut down cleanly");
    Ok(())
}

/// Resolves on Ctrl-C, or SIGTERM on Unix.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl-C: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!("Failed to listen for SIGTERM: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("Shutdown signal received");
}
