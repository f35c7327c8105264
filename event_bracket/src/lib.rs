//! # Event Bracket
//!
//! Tournament bracket engine for multi-sport events.
//!
//! Brackets are generated from a list of confirmed teams, either as a
//! single-elimination tree or a round-robin group. Recording a match result
//! checks whether its round is finished and, if so, pairs the winners into the
//! next round or crowns the champion. All of this happens inside one storage
//! transaction per request.
//!
//! ## Core Modules
//!
//! - [`bracket`]: Bracket generation, result recording, advancement and standings
//! - [`db`]: Storage traits with PostgreSQL and in-memory implementations

/// Bracket engine.
pub mod bracket;
pub use bracket::{
    BracketConfig, BracketError, BracketManager, BracketResult, BracketType, RoundOutcome,
};

/// Storage layer.
pub mod db;
pub use db::{BracketStore, BracketTransaction, Database, DatabaseConfig, TeamRoster};
