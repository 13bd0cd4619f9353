//! postula-desk - Applicant intake form service
//!
//! Serves the form workflow (create, edit, delete candidates) and a live
//! snapshot feed of the candidate collection to the browser front end.

use anyhow::{Context, Result};
use clap::Parser;
use postula_common::config::{find_config_file, load_service_config, resolve_root_folder};
use postula_common::{CandidateStore, MemoryStore, SqliteStore};
use postula_desk::{build_router, AppState};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info, warn};

#[derive(Debug, Parser)]
#[command(name = "postula-desk", version, about = "Applicant intake form service")]
struct Args {
    /// Folder holding the candidate database
    #[arg(long)]
    root_folder: Option<PathBuf>,

    /// Address to listen on (overrides config.toml)
    #[arg(long)]
    bind: Option<String>,

    /// Port to listen on (overrides config.toml)
    #[arg(long)]
    port: Option<u16>,

    /// Keep candidates in memory only; nothing is written to disk
    #[arg(long)]
    in_memory: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    info!(
        "Starting Postula Desk (postula-desk) v{}",
        env!("CARGO_PKG_VERSION")
    );

    let args = Args::parse();

    let config_file = find_config_file();
    match &config_file {
        Some(path) => info!("Config file: {}", path.display()),
        None => info!("No config file found, using defaults"),
    }
    let service = load_service_config(config_file.as_deref())?;

    let store: Arc<dyn CandidateStore> = if args.in_memory {
        warn!("Running with in-memory store; candidates are lost on exit");
        Arc::new(MemoryStore::with_event_capacity(service.event_capacity))
    } else {
        let root_folder = resolve_root_folder(args.root_folder.as_deref(), config_file.as_deref())?;
        let db_path = root_folder.join(&service.database_file);
        info!("Database path: {}", db_path.display());

        let sqlite = match SqliteStore::open(&db_path, service.event_capacity).await {
            Ok(store) => {
                info!("✓ Connected to database");
                store
            }
            Err(e) => {
                error!("Failed to open database: {}", e);
                return Err(e).context("opening candidate database");
            }
        };
        Arc::new(sqlite)
    };

    let state = AppState::new(store);
    let app = build_router(state);

    let bind = args.bind.unwrap_or(service.bind);
    let port = args.port.unwrap_or(service.port);
    let listener = tokio::net::TcpListener::bind((bind.as_str(), port)).await?;
    info!("postula-desk listening on http://{}:{}", bind, port);
    info!("Health check: http://{}:{}/health", bind, port);

    axum::serve(listener, app).await?;

    Ok(())
}
