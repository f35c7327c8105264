//! Tournament bracket engine for event sports.
//!
//! This module provides:
//! - Single-elimination and round-robin bracket generation
//! - Match result recording with automatic round advancement
//! - Round-robin standings and champion selection
//! - Manual overrides for stuck or hand-run tournaments
//!
//! ## Example
//!
//! ```no_run
//! use event_bracket::bracket::{BracketConfig, BracketManager, BracketType};
//! use event_bracket::db::{Database, DatabaseConfig};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let db = Database::new(&DatabaseConfig::from_env()).await?;
//!     let store = db.bracket_store(&BracketConfig::default());
//!     let manager = BracketManager::new(Arc::new(store));
//!
//!     let bracket_id = manager
//!         .create_bracket(7, "Football", BracketType::SingleElimination, &[11, 12, 13, 14])
//!         .await?;
//!     println!("Created bracket: {}", bracket_id);
//!
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod errors;
pub mod generator;
pub mod manager;
pub mod models;
pub mod shuffle;
pub mod standings;

pub use config::BracketConfig;
pub use errors::{BracketError, BracketResult};
pub use manager::BracketManager;
pub use models::{
    Bracket, BracketId, BracketState, BracketSummary, BracketType, EventId, Match, MatchId,
    MatchResult, MatchStatus, NewBracket, Pairing, RoundOutcome, RoundTally, TeamId, TeamStanding,
    TournamentProgress,
};
pub use shuffle::{NoShuffle, RandomShuffler, SeededShuffler, TeamShuffler};
