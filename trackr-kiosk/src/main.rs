//! trackr-kiosk - library attendance kiosk
//!
//! Serves the student check-in page and the librarian admin pages from a
//! single process backed by a local SQLite database and a spreadsheet roster.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use trackr_common::config::{resolve_root_folder, KioskConfig, Secrets, ROOT_FOLDER_ENV};
use trackr_common::db::{init_database, sync_roster_backup, RosterSync};
use trackr_common::{Clock, SystemClock};
use trackr_kiosk::{build_router, AppState};

/// Command-line arguments for trackr-kiosk
#[derive(Parser, Debug)]
#[command(name = "trackr-kiosk")]
#[command(about = "Library attendance kiosk")]
#[command(version)]
struct Args {
    /// Port to listen on (overrides config.toml)
    #[arg(short, long, env = "TRACKR_PORT")]
    port: Option<u16>,

    /// Folder holding config.toml, the roster and the database
    #[arg(short, long)]
    root_folder: Option<PathBuf>,

    /// Address to bind (overrides config.toml)
    #[arg(short, long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "trackr_kiosk=info,trackr_common=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!(
        "Starting trackr kiosk (trackr-kiosk) v{}",
        env!("CARGO_PKG_VERSION")
    );

    let args = Args::parse();

    let root_folder = resolve_root_folder(args.root_folder.as_deref(), ROOT_FOLDER_ENV);
    std::fs::create_dir_all(&root_folder)
        .with_context(|| format!("Failed to create root folder {}", root_folder.display()))?;
    info!("Root folder: {}", root_folder.display());

    let config = KioskConfig::load(&root_folder).context("Failed to load configuration")?;
    let secrets = Secrets::from_env().context("Failed to read admin credentials")?;

    let db_path = config.database_path(&root_folder);
    info!("Database path: {}", db_path.display());
    let pool = match init_database(&db_path).await {
        Ok(pool) => {
            info!("✓ Database ready");
            pool
        }
        Err(e) => {
            error!("Failed to open database: {}", e);
            return Err(e.into());
        }
    };

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let bind_addr = args.bind.clone().unwrap_or_else(|| config.bind_addr.clone());
    let port = args.port.unwrap_or(config.port);

    let state = AppState::new(pool, &root_folder, config, secrets, Arc::clone(&clock))
        .context("Failed to build application state")?;

    match sync_roster_backup(&state.db, state.roster.store(), clock.now()).await {
        Ok(RosterSync::BackedUp(count)) => info!("Roster loaded: {} students", count),
        Ok(RosterSync::Restored(count)) => warn!("Roster restored from backup: {} students", count),
        Ok(RosterSync::Missing) => warn!("Starting with an empty roster"),
        Err(e) => warn!("Roster backup failed: {}", e),
    }

    let app = build_router(state);

    let addr = format!("{}:{}", bind_addr, port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("trackr-kiosk listening on http://{}", addr);
    info!("Health check: http://{}/health", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
