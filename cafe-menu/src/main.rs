//! cafe-menu - Café menu lens service
//!
//! Suggests dishes from a photo, serves the dish catalog and mirrors it from
//! Notion.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use cafe_common::config::{
    default_config_path, RootFolderInitializer, RootFolderResolver, TomlConfig, DEFAULT_PORT,
};
use clap::Parser;
use tokio::signal;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use cafe_menu::config::{resolve_matcher_config, resolve_notion_settings, resolve_vision_settings};
use cafe_menu::services::{CatalogSource, LabelSource, NotionClient, VisionClient};
use cafe_menu::AppState;

/// Command-line arguments for cafe-menu
#[derive(Parser, Debug)]
#[command(name = "cafe-menu")]
#[command(about = "Photo-based dish suggestions and menu catalog service")]
#[command(version)]
struct Args {
    /// Port to listen on (overrides TOML)
    #[arg(short, long, env = "CAFE_MENU_PORT")]
    port: Option<u16>,

    /// Root folder holding the database
    #[arg(short, long)]
    root_folder: Option<PathBuf>,

    /// TOML config file (default: ~/.config/cafe-menu/config.toml)
    #[arg(short, long, env = "CAFE_MENU_CONFIG")]
    config: Option<PathBuf>,

    /// Add the sample dishes missing from the catalog, then exit
    #[arg(long)]
    seed: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config_path = args.config.clone().or_else(default_config_path);
    let (toml_config, config_load) = TomlConfig::load_or_default(config_path.as_deref());

    // RUST_LOG overrides the configured level
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!(
                    "cafe_menu={level},cafe_common={level},tower_http=info",
                    level = toml_config.logging.level
                )
                .into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!(
        "Starting cafe-menu v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );
    config_load.log();

    // Root folder: CLI → ENV → TOML → OS default
    let root_folder = RootFolderResolver::new()
        .with_cli_arg(args.root_folder.clone())
        .with_toml(&toml_config)
        .resolve();
    let initializer = RootFolderInitializer::new(root_folder);
    initializer
        .ensure_directory_exists()
        .context("Failed to initialize root folder")?;

    let db_path = initializer.database_path();
    info!("Database: {}", db_path.display());
    let db = cafe_common::db::init_database(&db_path)
        .await
        .context("Failed to open database")?;

    if args.seed {
        let added = cafe_menu::db::seed::seed_sample_dishes(&db)
            .await
            .context("Failed to seed sample dishes")?;
        info!(added, "Sample dishes seeded");
        return Ok(());
    }

    let label_source: Option<Arc<dyn LabelSource>> = match resolve_vision_settings(&toml_config) {
        Some(settings) => Some(Arc::new(
            VisionClient::new(settings).context("Failed to create Vision client")?,
        )),
        None => None,
    };

    let catalog: Option<Arc<dyn CatalogSource>> = match resolve_notion_settings(&toml_config) {
        Some(settings) => Some(Arc::new(
            NotionClient::new(settings).context("Failed to create Notion client")?,
        )),
        None => None,
    };

    let matcher = resolve_matcher_config(&toml_config);
    info!(
        min_score = matcher.min_score,
        max_results = matcher.max_results,
        fallback = ?matcher.fallback,
        "Dish matcher configured"
    );

    let state = AppState::new(db, label_source, catalog, matcher)
        .context("Failed to create application state")?;
    let app = cafe_menu::build_router(state);

    let port = args.port.or(toml_config.port).unwrap_or(DEFAULT_PORT);
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;
    info!("Listening on http://{}", addr);
    info!("Health check: http://127.0.0.1:{}/health", port);

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
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
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
                tracing::error!("Failed to install signal handler: {}", e);
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
