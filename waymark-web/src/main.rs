//! waymark-web - map application view-model service
//!
//! Owns the curated location list, venue enrichment, realtime comments
//! and the auth session, and serves observable state to the browser UI
//! via HTTP + SSE.

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};
use waymark_common::config::{Config, Overrides};
use waymark_common::events::EventBus;

use waymark_web::auth::AuthSession;
use waymark_web::store::{RealtimeStore, SqliteStore};
use waymark_web::venue::VenueClient;
use waymark_web::view::MainView;
use waymark_web::{build_router, AppState};

/// Command-line options (highest-priority configuration tier)
#[derive(Debug, Parser)]
#[command(name = "waymark-web", version)]
struct Cli {
    /// Data folder holding waymark.db
    #[arg(long)]
    root_folder: Option<String>,

    /// Path to a TOML config file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Address to bind (host:port)
    #[arg(long)]
    bind_address: Option<String>,

    /// URL of the static location feed
    #[arg(long)]
    locations_url: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    info!("Starting waymark-web v{}", env!("CARGO_PKG_VERSION"));

    let cli = Cli::parse();
    let config = Config::resolve(&Overrides {
        root_folder: cli.root_folder,
        config_file: cli.config,
        bind_address: cli.bind_address,
        locations_url: cli.locations_url,
    })?;

    config.ensure_root_folder()?;
    let db_path = config.database_path();
    info!("Database: {}", db_path.display());
    let db = waymark_common::db::init_database(&db_path).await?;

    let event_bus = EventBus::new(100);
    let store = Arc::new(SqliteStore::new(db.clone()));
    let store_dyn: Arc<dyn RealtimeStore> = store.clone();
    let venue_api = Arc::new(VenueClient::new(config.venue.clone()));

    let view = MainView::new(
        db.clone(),
        venue_api,
        Arc::clone(&store_dyn),
        event_bus.clone(),
        config.locations_url.clone(),
    );
    let auth = AuthSession::new(Arc::clone(&store_dyn), event_bus.clone());

    let state = AppState::new(db, event_bus, store_dyn, view, auth);

    // The initial feed load is non-fatal; the connectivity watcher
    // retries it when the store comes back online.
    if let Err(e) = state.view.load().await {
        warn!("location feed load failed: {}", e);
        *state.last_error.write().await = Some(e.to_string());
    }
    state.view.spawn_connectivity_watcher();

    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&config.bind_address).await?;
    info!("waymark-web listening on http://{}", config.bind_address);
    info!("Health check: http://{}/health", config.bind_address);

    axum::serve(listener, app).await?;

    Ok(())
}
