//! Event bracket HTTP server backed by PostgreSQL.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Error};
use eb_server::{api, config::ServerConfig, logging, metrics};
use event_bracket::{
    BracketManager,
    db::Database,
};
use pico_args::Arguments;
use tracing::{info, warn};

const HELP: &str = "\
Run the event bracket server

USAGE:
  eb_server [OPTIONS]

OPTIONS:
  --bind       IP:PORT     Server socket bind address  [default: env SERVER_BIND or 127.0.0.1:8080]
  --db-url     URL         Database connection string  [default: env DATABASE_URL or postgres://postgres@localhost/event_brackets]

FLAGS:
      --migrate            Apply pending schema migrations before serving
  -h, --help               Print help information

ENVIRONMENT:
  SERVER_BIND                  Server bind address (e.g., 0.0.0.0:8080)
  DATABASE_URL                 PostgreSQL connection string
  DB_MAX_CONNECTIONS           Pool size
  BRACKET_SHUFFLE_SEED         Fixed seed for round-1 shuffling
  BRACKET_QUERY_TIMEOUT_SECS   Per-query deadline
  METRICS_BIND                 Prometheus exporter address (disabled when unset)
  RUST_LOG                     Log filter (default: info,sqlx=warn,hyper=warn)
";

#[tokio::main]
async fn main() -> Result<(), Error> {
    // Load .env file if it exists
    let _ = dotenvy::dotenv();

    let mut pargs = Arguments::from_env();

    // Help has a higher priority and should be handled separately.
    if pargs.contains(["-h", "--help"]) {
        print!("{HELP}");
        return Ok(());
    }

    let migrate = pargs.contains("--migrate");
    let bind: Option<SocketAddr> = pargs.opt_value_from_str("--bind")?;
    let database_url: Option<String> = pargs.opt_value_from_str("--db-url")?;
    let unused = pargs.finish();

    logging::init();
    if !unused.is_empty() {
        warn!("Ignoring unknown arguments: {:?}", unused);
    }

    let config = ServerConfig::from_env(bind, database_url)?;
    config.validate()?;

    if let Some(addr) = config.metrics_bind {
        metrics::init_metrics(addr).map_err(Error::msg)?;
        info!("Prometheus metrics exported at http://{}/metrics", addr);
    }

    let db = Database::new(&config.database)
        .await
        .context("Failed to connect to database")?;
    info!("Database connected successfully");

    if migrate {
        db.migrate().await.context("Failed to apply migrations")?;
        info!("Migrations applied");
    }

    let store = db.bracket_store(&config.bracket);
    let manager = BracketManager::with_config(Arc::new(store), &config.bracket);

    if config.bracket.shuffle_seed.is_some() {
        warn!("BRACKET_SHUFFLE_SEED is set, round-1 seeding is deterministic");
    }

    let state = api::AppState {
        manager: Arc::new(manager),
        roster: Arc::new(db.team_roster()),
    };
    let app = api::create_router(state);

    let listener = tokio::net::TcpListener::bind(config.bind)
        .await
        .with_context(|| format!("Failed to bind to {}", config.bind))?;

    info!(
        "Server is running at http://{}. Press Ctrl+C to stop.",
        config.bind
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Shutting down server...");
    db.close().await;

    Ok(())
}

/// Graceful shutdown signal
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
}
