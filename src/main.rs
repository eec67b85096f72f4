use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use research_hub_api::config::{self, AppConfig};
use research_hub_api::database::{DatabaseManager, MemoryStore, PgStore, Store};
use research_hub_api::services::{mailer_from_config, LocalFileStorage};
use research_hub_api::{app, AppState};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "research-hub")]
#[command(about = "Research Hub API server")]
#[command(version)]
struct Args {
    #[arg(long, help = "Port to listen on (overrides PORT / HUB_API_PORT)")]
    port: Option<u16>,

    #[arg(long, help = "Use the in-process store instead of PostgreSQL (data is lost on exit)")]
    memory: bool,

    #[arg(long, help = "Apply database migrations and exit")]
    migrate_only: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present so DATABASE_URL, JWT_SECRET, etc. are picked up
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    let config: &AppConfig = config::config();
    tracing::info!("Starting Research Hub API in {:?} mode", config.environment);

    if config.security.jwt_secret.trim().is_empty() {
        anyhow::bail!("JWT_SECRET must be set outside development");
    }

    if args.migrate_only {
        let pool = DatabaseManager::connect(&config.database).await?;
        DatabaseManager::migrate(&pool).await?;
        return Ok(());
    }

    let store: Arc<dyn Store> = if args.memory {
        tracing::warn!("Using the in-process store; nothing will be persisted");
        Arc::new(MemoryStore::new())
    } else {
        let pool = DatabaseManager::connect(&config.database)
            .await
            .context("connecting to PostgreSQL (use --memory to run without a database)")?;
        Arc::new(PgStore::new(pool))
    };

    let files = LocalFileStorage::new(&config.storage.upload_dir)
        .await
        .with_context(|| format!("creating upload directory {}", config.storage.upload_dir))?;
    let mailer = mailer_from_config(&config.email)?;

    let state = AppState {
        store,
        mailer,
        files: Arc::new(files),
        config: Arc::new(config.clone()),
    };

    let port = args.port.unwrap_or(config.api.port);
    let bind_addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", bind_addr))?;

    tracing::info!("Research Hub API listening on http://{}", bind_addr);

    axum::serve(listener, app(state).into_make_service_with_connect_info::<SocketAddr>()).await?;
    Ok(())
}
