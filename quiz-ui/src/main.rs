//! quiz-ui - local multi-step quiz service
//!
//! Serves the quiz JSON API and analytics event stream consumed by the
//! browser front-end, and forwards completed quizzes to the collection
//! endpoint.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use quiz_common::collection::WebhookClient;
use quiz_common::config::ConfigResolver;
use quiz_common::location::IpApiClient;
use quiz_common::pipeline::ResponseMode;
use quiz_ui::{build_router, AppState};
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Command-line arguments for quiz-ui
#[derive(Parser, Debug)]
#[command(name = "quiz-ui")]
#[command(about = "Multi-step quiz service")]
#[command(version)]
struct Args {
    /// Path to the TOML config file
    #[arg(short, long, env = "QUIZ_CONFIG")]
    config: Option<PathBuf>,

    /// Port to listen on (overrides config)
    #[arg(short, long, env = "QUIZ_PORT")]
    port: Option<u16>,

    /// Collection endpoint URL (overrides config)
    #[arg(long, env = "QUIZ_COLLECTION_URL")]
    collection_url: Option<String>,

    /// Treat endpoint responses as analysis payloads (overrides config)
    #[arg(long)]
    analysis: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let resolver = ConfigResolver::new();
    let config_path = resolver.resolve(args.config.as_deref());
    let mut config = resolver
        .load(args.config.as_deref())
        .context("Failed to load configuration")?;

    // Initialize tracing; RUST_LOG wins over the configured level
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!(
                    "quiz_ui={level},quiz_common={level},tower_http={level}",
                    level = config.logging.level
                )
                .into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!(
        "Starting quiz-ui v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    match config_path {
        Some(path) if path.exists() => info!("Config file: {}", path.display()),
        Some(path) => warn!("Config file {} not found, using defaults", path.display()),
        None => info!("No config file, using compiled defaults"),
    }

    if let Some(port) = args.port {
        config.port = port;
    }
    if let Some(url) = args.collection_url {
        config.collection.url = url;
    }
    if args.analysis {
        config.collection.response_mode = ResponseMode::Analysis;
    }

    let definition = config
        .quiz_definition()
        .context("Invalid quiz definition")?;
    info!(
        "Quiz has {} steps, lead capture at step {}",
        definition.total_steps(),
        definition.lead_capture_step()
    );

    if config.collection.url.contains("YOUR-N8N-INSTANCE") {
        warn!("Collection endpoint is still the placeholder URL; submissions will fail");
    }
    info!(
        "Collection endpoint: {} ({:?})",
        config.collection.url, config.collection.response_mode
    );

    let geo = IpApiClient::new(
        config.geolocation.url.clone(),
        Duration::from_millis(config.geolocation.timeout_ms),
    )
    .context("Failed to create geolocation client")?;
    let endpoint = WebhookClient::new(config.collection.url.clone())
        .context("Failed to create collection client")?;

    let state = AppState::new(
        definition,
        Arc::new(geo),
        Arc::new(endpoint),
        config.pipeline_settings(),
    );
    let app = build_router(state);

    let addr: SocketAddr = format!("{}:{}", config.bind_host, config.port)
        .parse()
        .context("Invalid bind address")?;

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;
    info!("quiz-ui listening on http://{}", addr);
    info!("Health check: http://{}/health", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
