//! kweb-server - Knowledge Web topic service
//!
//! Backs the knowledge web explorer UI: expands topic nodes into child
//! topics, generates article titles and bodies, serves topic images and
//! persists tree snapshots.

use anyhow::Result;
use clap::Parser;
use kweb_common::config::{resolve_config_path, RootFolderInitializer, RootFolderResolver};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use kweb_server::services::KnowledgePipeline;
use kweb_server::AppState;

#[derive(Debug, Parser)]
#[command(name = "kweb-server", version, about = "Knowledge Web topic service")]
struct Cli {
    /// Path to the TOML config file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Root folder for the database and image cache
    #[arg(long)]
    root_folder: Option<PathBuf>,

    /// Port to listen on (overrides config and KWEB_PORT)
    #[arg(long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Config is read before tracing init so its log level applies; messages
    // logged while loading are dropped.
    let config_path = resolve_config_path(cli.config.as_deref());
    let mut config = kweb_server::config::load_service_config(&config_path)?;
    if let Some(port) = cli.port {
        config.server.port = port;
    }

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.logging.level)),
        )
        .init();

    info!(
        "Starting kweb-server v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );
    info!("Config file: {}", config_path.display());

    let resolver = RootFolderResolver::new(cli.root_folder, config.root_folder.clone());
    let initializer = RootFolderInitializer::new(resolver.resolve());
    initializer
        .ensure_directory_exists()
        .map_err(|e| anyhow::anyhow!("Failed to initialize root folder: {}", e))?;
    info!("Root folder: {}", initializer.root_folder().display());

    let db_path = initializer.database_path();
    let db_pool = kweb_server::db::init_database(&db_path).await?;
    info!("Database: {}", db_path.display());

    let pipeline = kweb_server::config::build_pipeline(&config, initializer.images_path())?;

    let state = AppState::new(db_pool, pipeline);
    let pipeline = Arc::clone(&state.pipeline);
    let app = kweb_server::build_router(state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Listening on http://{}", addr);
    info!("Health check: http://{}/health", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(pipeline))
        .await?;

    info!("Server shutdown complete");
    Ok(())
}

/// Resolves on Ctrl+C or SIGTERM, then stops new generation calls so
/// in-flight requests drain with fallback text
async fn shutdown_signal(pipeline: Arc<KnowledgePipeline>) {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
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

    pipeline.shutdown();
}
