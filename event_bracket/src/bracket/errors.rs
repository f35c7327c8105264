//! Bracket error types.

use std::time::Duration;
use thiserror::Error;

use super::models::{BracketId, EventId, MatchId, TeamId};

/// Bracket errors
#[derive(Debug, Error)]
pub enum BracketError {
    /// Unknown bracket format
    #[error("Invalid bracket type: {0}")]
    InvalidBracketType(String),

    /// Not enough teams to build a bracket
    #[error("Insufficient teams: need {needed}, have {current}")]
    InsufficientTeams { needed: usize, current: usize },

    /// Same team listed twice
    #[error("Team {0} listed more than once")]
    DuplicateTeam(TeamId),

    /// Event already has a bracket for this sport
    #[error("Event {event_id} already has a {sport_name} bracket")]
    BracketExists { event_id: EventId, sport_name: String },

    /// Bracket not found
    #[error("Bracket not found: {0}")]
    BracketNotFound(BracketId),

    /// Match not found
    #[error("Match not found: {0}")]
    MatchNotFound(MatchId),

    /// Winner is not one of the match participants
    #[error("Team {team_id} is not playing in match {match_id}")]
    InvalidWinner { match_id: MatchId, team_id: TeamId },

    /// Negative score
    #[error("Invalid score: {0}")]
    InvalidScore(i32),

    /// Result already recorded for this match
    #[error("Match {0} already has a result")]
    MatchAlreadyCompleted(MatchId),

    /// Bracket finished, no further changes allowed
    #[error("Bracket {0} is already completed")]
    BracketCompleted(BracketId),

    /// Round still has unplayed matches
    #[error("Round {round} is not complete: {completed}/{total} matches completed")]
    RoundNotComplete {
        round: u32,
        completed: u64,
        total: u64,
    },

    /// Stored matches contradict the bracket rules
    #[error("Inconsistent bracket state: {0}")]
    InconsistentState(String),

    /// Query exceeded its deadline
    #[error("Database operation timed out after {0:?}")]
    Timeout(Duration),

    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl BracketError {
    /// Whether the caller caused this error (bad input or wrong state)
    pub fn is_client_error(&self) -> bool {
        !matches!(
            self,
            BracketError::Database(_)
                | BracketError::Timeout(_)
                | BracketError::InconsistentState(_)
        )
    }

    /// Get a client-safe error message that doesn't leak storage details
    pub fn client_message(&self) -> String {
        match self {
            BracketError::Database(_) => "Internal server error".to_string(),
            BracketError::Timeout(_) => "Storage temporarily unavailable".to_string(),
            _ => self.to_string(),
        }
    }
}

/// Result type for bracket operations
pub type BracketResult<T> = Result<T, BracketError>;
