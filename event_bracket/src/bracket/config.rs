//! Bracket engine configuration.

use std::sync::Arc;
use std::time::Duration;

use super::shuffle::{RandomShuffler, SeededShuffler, TeamShuffler};
use crate::db::config::secs_env_or;
use crate::db::timeouts::DEFAULT_QUERY_TIMEOUT;

/// Engine settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BracketConfig {
    /// Fixed seed for round-1 shuffling; random when unset
    pub shuffle_seed: Option<u64>,
    /// Deadline for each storage query
    pub query_timeout: Duration,
}

impl BracketConfig {
    /// Load from `BRACKET_SHUFFLE_SEED` and `BRACKET_QUERY_TIMEOUT_SECS`
    pub fn from_env() -> Self {
        Self {
            shuffle_seed: std::env::var("BRACKET_SHUFFLE_SEED")
                .ok()
                .and_then(|v| v.parse().ok()),
            query_timeout: secs_env_or("BRACKET_QUERY_TIMEOUT_SECS", DEFAULT_QUERY_TIMEOUT),
        }
    }

    /// Shuffler matching the configured seed
    pub fn shuffler(&self) -> Arc<dyn TeamShuffler> {
        match self.shuffle_seed {
            Some(seed) => Arc::new(SeededShuffler::new(seed)),
            None => Arc::new(RandomShuffler),
        }
    }
}

impl Default for BracketConfig {
    fn default() -> Self {
        Self {
            shuffle_seed: None,
            query_timeout: DEFAULT_QUERY_TIMEOUT,
        }
    }
}
