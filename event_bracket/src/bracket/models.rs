//! Bracket data models for single-elimination and round-robin tournaments.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::errors::BracketError;

/// Bracket ID type
pub type BracketId = i64;

/// Match ID type
pub type MatchId = i64;

/// Team ID type (owned by the registration side of the application)
pub type TeamId = i64;

/// Event ID type
pub type EventId = i64;

/// Bracket format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BracketType {
    /// Losers are eliminated, winners advance round over round
    SingleElimination,
    /// Every team plays every other team once, all in round 1
    RoundRobin,
}

impl BracketType {
    /// Storage and wire representation
    pub fn as_str(&self) -> &'static str {
        match self {
            BracketType::SingleElimination => "single_elimination",
            BracketType::RoundRobin => "round_robin",
        }
    }
}

impl fmt::Display for BracketType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BracketType {
    type Err = BracketError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "single_elimination" => Ok(BracketType::SingleElimination),
            "round_robin" => Ok(BracketType::RoundRobin),
            other => Err(BracketError::InvalidBracketType(other.to_string())),
        }
    }
}

/// Match status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchStatus {
    Scheduled,
    Completed,
}

impl MatchStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchStatus::Scheduled => "scheduled",
            MatchStatus::Completed => "completed",
        }
    }

    /// Parse a stored status, treating unknown values as scheduled
    pub fn from_db(s: &str) -> Self {
        match s {
            "completed" => MatchStatus::Completed,
            _ => MatchStatus::Scheduled,
        }
    }
}

/// A tournament bracket for one sport within one event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bracket {
    pub id: BracketId,
    pub event_id: EventId,
    /// Sport or activity name the bracket is played for
    pub sport_name: String,
    pub bracket_type: BracketType,
    pub created_at: DateTime<Utc>,
}

/// Fields needed to insert a bracket row
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewBracket {
    pub event_id: EventId,
    pub sport_name: String,
    pub bracket_type: BracketType,
}

/// Progress of a bracket through its rounds (1:1 with [`Bracket`])
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TournamentProgress {
    pub bracket_id: BracketId,
    /// Round currently being played (1-indexed)
    pub current_round: u32,
    /// Rounds needed to finish the bracket
    pub total_rounds: u32,
    /// Set exactly once, when the bracket completes
    pub champion_team_id: Option<TeamId>,
    pub is_completed: bool,
}

impl TournamentProgress {
    /// Progress row for a freshly generated bracket
    pub fn initial(bracket_id: BracketId, total_rounds: u32) -> Self {
        Self {
            bracket_id,
            current_round: 1,
            total_rounds,
            champion_team_id: None,
            is_completed: false,
        }
    }
}

/// A single match inside a bracket
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Match {
    pub id: MatchId,
    pub bracket_id: BracketId,
    pub round_number: u32,
    pub match_number: u32,
    pub team1_id: TeamId,
    /// `None` for a bye
    pub team2_id: Option<TeamId>,
    pub winner_team_id: Option<TeamId>,
    pub team1_score: Option<i32>,
    pub team2_score: Option<i32>,
    pub status: MatchStatus,
    pub match_date: Option<DateTime<Utc>>,
    pub venue: Option<String>,
}

impl Match {
    pub fn is_bye(&self) -> bool {
        self.team2_id.is_none()
    }

    pub fn is_completed(&self) -> bool {
        self.status == MatchStatus::Completed
    }

    /// Whether `team_id` plays in this match
    pub fn involves(&self, team_id: TeamId) -> bool {
        self.team1_id == team_id || self.team2_id == Some(team_id)
    }
}

/// A generated pairing, not yet bound to a stored match row
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pairing {
    pub round_number: u32,
    pub match_number: u32,
    pub team1_id: TeamId,
    pub team2_id: Option<TeamId>,
}

impl Pairing {
    pub fn is_bye(&self) -> bool {
        self.team2_id.is_none()
    }

    /// Status the match row starts in; byes are completed at creation
    pub fn initial_status(&self) -> MatchStatus {
        if self.is_bye() {
            MatchStatus::Completed
        } else {
            MatchStatus::Scheduled
        }
    }

    /// Winner the match row starts with; a bye's sole team advances
    pub fn initial_winner(&self) -> Option<TeamId> {
        if self.is_bye() {
            Some(self.team1_id)
        } else {
            None
        }
    }
}

/// A recorded match result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchResult {
    pub team1_score: i32,
    pub team2_score: i32,
    pub winner_team_id: TeamId,
}

/// Completed vs. total match counts over a round or a whole bracket
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundTally {
    pub total: u64,
    pub completed: u64,
}

impl RoundTally {
    /// True once every match is completed and there is at least one match
    pub fn is_resolved(&self) -> bool {
        self.total > 0 && self.total == self.completed
    }
}

/// Round-robin standings row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamStanding {
    pub team_id: TeamId,
    pub wins: u32,
    pub points: u32,
    pub matches_played: u32,
}

impl TeamStanding {
    pub fn new(team_id: TeamId) -> Self {
        Self {
            team_id,
            wins: 0,
            points: 0,
            matches_played: 0,
        }
    }
}

/// What happened to a bracket after a result or a manual override
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum RoundOutcome {
    /// Round still has unplayed matches
    InProgress {
        round: u32,
        completed: u64,
        total: u64,
    },
    /// Next round was generated
    Advanced {
        next_round: u32,
        matches_created: usize,
    },
    /// Bracket finished with a champion
    Champion { team_id: TeamId },
    /// Round already has a successor or the bracket is finished
    AlreadyAdvanced { round: u32 },
    /// Nothing to do for this bracket type
    Unchanged,
}

/// Full bracket view returned to callers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BracketState {
    pub bracket: Bracket,
    pub progress: TournamentProgress,
    /// Ordered by round, then match number
    pub matches: Vec<Match>,
}

/// Bracket with its progress, used for per-event listings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BracketSummary {
    pub bracket: Bracket,
    pub progress: TournamentProgress,
}
