//! SchoolHub - multi-tenant school management platform

use anyhow::{Context, Result};
use clap::Parser;
use metrics_exporter_prometheus::PrometheusBuilder;
use schoolhub_api::{AppState, create_router};
use schoolhub_auth::{RoutePolicy, SessionManager};
use schoolhub_db::{Database, MemoryStore, SchoolRepository, UserRepository};
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

mod bootstrap;
mod config;

use config::{Config, DatabaseBackend, LogFormat, LoggingConfig};

/// SchoolHub - multi-tenant school management platform
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Configuration file path
    #[arg(short, long, default_value = "config/default.toml")]
    config: String,

    /// Bind address
    #[arg(long, env = "SCHOOLHUB_BIND")]
    bind: Option<String>,

    /// Port
    #[arg(short, long, env = "SCHOOLHUB_PORT")]
    port: Option<u16>,

    /// Session signing secret
    #[arg(long, env = "SCHOOLHUB_SESSION_SECRET", hide_env_values = true)]
    session_secret: Option<String>,

    /// Password for the first super admin
    #[arg(long, env = "SCHOOLHUB_BOOTSTRAP_PASSWORD", hide_env_values = true)]
    bootstrap_password: Option<String>,
}

type Stores = (Arc<dyn UserRepository>, Arc<dyn SchoolRepository>);

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = Config::load(&args.config)?;
    if let Some(secret) = args.session_secret {
        config.auth.session_secret = Some(secret);
    }
    if let Some(password) = args.bootstrap_password {
        config.bootstrap.super_admin_password = Some(password);
    }

    init_logging(&config.logging);

    info!(
        "Starting SchoolHub v{} ({:?})",
        env!("CARGO_PKG_VERSION"),
        config.server.environment
    );

    let secret = config.session_secret()?;
    let (users, schools) = open_stores(&config).await?;

    bootstrap::ensure_super_admin(users.as_ref(), &config.bootstrap).await?;

    let metrics_handle = if config.metrics.enabled {
        let handle = PrometheusBuilder::new()
            .install_recorder()
            .context("Failed to install Prometheus recorder")?;
        Some(Arc::new(handle))
    } else {
        None
    };

    let sessions = Arc::new(SessionManager::new(&secret));
    let state = AppState::new(
        users,
        schools,
        sessions,
        RoutePolicy::default(),
        config.is_production(),
    );

    let app = create_router(state, metrics_handle).layer(TraceLayer::new_for_http());

    let bind_addr = args.bind.unwrap_or(config.server.bind_address);
    let port = args.port.unwrap_or(config.server.port);
    let addr: SocketAddr = format!("{}:{}", bind_addr, port)
        .parse()
        .with_context(|| format!("Invalid bind address {}:{}", bind_addr, port))?;

    info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

/// Open the configured user and school store
async fn open_stores(config: &Config) -> Result<Stores> {
    match config.database.backend {
        DatabaseBackend::Sqlite => {
            let path = &config.database.path;
            if let Some(parent) = Path::new(path).parent()
                && !parent.as_os_str().is_empty()
            {
                tokio::fs::create_dir_all(parent)
                    .await
                    .with_context(|| format!("Failed to create {}", parent.display()))?;
            }

            let db = Arc::new(Database::new(&format!("sqlite:{}?mode=rwc", path)).await?);
            info!("Using SQLite store at {}", path);
            let users: Arc<dyn UserRepository> = db.clone();
            let schools: Arc<dyn SchoolRepository> = db;
            Ok((users, schools))
        }
        DatabaseBackend::Memory => {
            if config.is_production() {
                warn!("In-memory store configured in production; all data is lost on restart");
            }
            let store = Arc::new(MemoryStore::new());
            info!("Using in-memory store");
            let users: Arc<dyn UserRepository> = store.clone();
            let schools: Arc<dyn SchoolRepository> = store;
            Ok((users, schools))
        }
    }
}

/// Initialize logging
fn init_logging(logging: &LoggingConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));

    match logging.format {
        LogFormat::Json => tracing_subscriber::registry()
            .with(fmt::layer().json())
            .with(filter)
            .init(),
        LogFormat::Pretty => tracing_subscriber::registry()
            .with(fmt::layer())
            .with(filter)
            .init(),
    }
}

/// Wait for shutdown signal
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
