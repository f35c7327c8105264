//! Bracket storage.
//!
//! The engine talks to storage only through the [`BracketStore`] and
//! [`BracketTransaction`] traits. [`PgBracketStore`] is the production
//! implementation; [`MemoryBracketStore`] backs tests and local runs.

use sqlx::postgres::{PgPool, PgPoolOptions};
use std::sync::Arc;

use crate::bracket::BracketConfig;

pub mod config;
pub mod memory;
pub mod postgres;
pub mod repository;
pub mod timeouts;

pub use config::DatabaseConfig;
pub use memory::{MemoryBracketStore, MemoryTransaction, StaticRoster};
pub use postgres::{PgBracketStore, PgBracketTransaction, PgTeamRoster};
pub use repository::{BracketStore, BracketTransaction, TeamRoster};

/// Shared PostgreSQL pool and the stores built on top of it
#[derive(Clone)]
pub struct Database {
    pool: Arc<PgPool>,
}

impl Database {
    /// Connect a pool sized by `config`
    ///
    /// ```no_run
    /// use event_bracket::db::{Database, DatabaseConfig};
    ///
    /// #[tokio::main]
    /// async fn main() -> Result<(), sqlx::Error> {
    ///     let db = Database::new(&DatabaseConfig::from_env()).await?;
    ///     db.migrate().await?;
    ///     Ok(())
    /// }
    /// ```
    pub async fn new(config: &DatabaseConfig) -> Result<Self, sqlx::Error> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(config.acquire_timeout)
            .idle_timeout(config.idle_timeout)
            .max_lifetime(config.max_lifetime)
            .connect(&config.database_url)
            .await?;

        log::info!(
            "Connected to PostgreSQL ({}..{} connections)",
            config.min_connections,
            config.max_connections
        );

        Ok(Self {
            pool: Arc::new(pool),
        })
    }

    /// Apply pending schema migrations from `migrations/`
    pub async fn migrate(&self) -> Result<(), sqlx::Error> {
        sqlx::migrate!("../migrations").run(self.pool.as_ref()).await?;
        Ok(())
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Bracket store using the configured query deadline
    pub fn bracket_store(&self, config: &BracketConfig) -> PgBracketStore {
        PgBracketStore::new(self.pool.clone()).with_query_timeout(config.query_timeout)
    }

    /// Roster reader over the registration `teams` table
    pub fn team_roster(&self) -> PgTeamRoster {
        PgTeamRoster::new(self.pool.clone())
    }

    /// Wait for checked-out connections and close the pool
    pub async fn close(&self) {
        self.pool.close().await;
    }
}
