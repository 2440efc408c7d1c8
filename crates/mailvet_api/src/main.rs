//! Email Deliverability Verification API Server
//!
//! Thin HTTP front-end over the mailvet_core pipeline, built with axum and
//! tokio. Accepts single addresses, JSON batches and line-oriented file
//! uploads of up to 50,000 addresses.

use axum::extract::DefaultBodyLimit;
use axum::Router;
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use mailvet_core::AddressVerifier;
use std::{net::SocketAddr, sync::Arc};
use tokio::signal;
use tower_http::{
    compression::CompressionLayer,
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::{info, Level};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod api_handler;
mod config;
mod routes;
mod upload;

use config::AppConfig;

/// Largest accepted request body; a full 50,000-address upload stays well
/// inside this.
const MAX_BODY_BYTES: usize = 8 * 1024 * 1024;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub verifier: Arc<AddressVerifier>,
    pub config: Arc<AppConfig>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration
    let config = load_config()?;

    // Initialize tracing/logging
    init_tracing(&config)?;

    info!("Starting mailvet API v{}", env!("CARGO_PKG_VERSION"));

    // Initialize the verification pipeline
    let verifier = AddressVerifier::new(config.verifier.to_core())
        .map_err(|e| format!("Failed to initialize address verifier: {}", e))?;

    info!(
        "Verifier initialized - concurrency {}, group delay {}ms, probe timeout {}ms",
        config.verifier.concurrent_limit,
        config.verifier.rate_limit_delay_ms,
        config.verifier.smtp_timeout_ms
    );

    // Create shared application state
    let app_state = AppState {
        verifier: Arc::new(verifier),
        config: Arc::new(config.clone()),
    };

    // Build the router
    let app = create_router(app_state);

    // Start the server
    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    let listener = tokio::net::TcpListener::bind(addr).await?;

    info!("Server listening on {}", addr);
    info!("Health check available at http://{}/health", addr);
    info!("Single-address API: http://{}/v1/verify", addr);
    info!("Batch API: http://{}/v1/verify-batch", addr);

    // Start server with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shut down gracefully");
    Ok(())
}

/// Create the main application router
fn create_router(state: AppState) -> Router {
    let mut router = routes::build_routes(Arc::new(state));

    // Add middleware layers
    router = router
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(
            CorsLayer::new()
                .allow_origin(tower_http::cors::Any)
                .allow_methods([axum::http::Method::GET, axum::http::Method::POST])
                .allow_headers(tower_http::cors::Any),
        )
        .layer(CompressionLayer::new())
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES));

    router
}

/// Load application configuration from environment and files
fn load_config() -> Result<AppConfig, Box<dyn std::error::Error>> {
    // Start with a base configuration using defaults
    let mut figment = Figment::from(Serialized::defaults(AppConfig::default()));

    // Try to load config file if it exists (optional)
    if std::path::Path::new("Config.toml").exists() {
        figment = figment.merge(Toml::file("Config.toml"));
    }

    // Override with environment variables
    figment = figment.merge(Env::prefixed(config::ENV_PREFIX).split("_"));

    let config: AppConfig = figment.extract()?;

    Ok(config)
}

/// Initialize tracing and logging
fn init_tracing(config: &AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| config.observability.log_level.clone().into());

    if config.observability.json_logs {
        // JSON format for production
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        // Human-readable format for development
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }

    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, starting graceful shutdown");
        },
        _ = terminate => {
            info!("Received SIGTERM, starting graceful shutdown");
        },
    }
}
