//! Storage traits for brackets, progress and matches.
//!
//! Every bracket operation runs inside one [`BracketTransaction`]. Dropping a
//! transaction without calling [`BracketTransaction::commit`] discards all of
//! its writes.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::bracket::{
    Bracket, BracketId, BracketResult, EventId, Match, MatchId, MatchResult, NewBracket, Pairing,
    RoundTally, TeamId, TournamentProgress,
};

/// Source of bracket transactions
#[async_trait]
pub trait BracketStore: Send + Sync {
    type Tx: BracketTransaction;

    /// Open a new transaction
    async fn begin(&self) -> BracketResult<Self::Tx>;

    /// Check that the backing storage is reachable
    async fn health_check(&self) -> BracketResult<()>;
}

/// Operations available inside a bracket transaction
#[async_trait]
pub trait BracketTransaction: Send {
    /// Insert a bracket row and return it with its assigned id
    async fn insert_bracket(&mut self, bracket: &NewBracket) -> BracketResult<Bracket>;

    /// Find a bracket by id
    async fn find_bracket(&mut self, bracket_id: BracketId) -> BracketResult<Option<Bracket>>;

    /// All brackets for an event, newest first
    async fn list_event_brackets(&mut self, event_id: EventId) -> BracketResult<Vec<Bracket>>;

    /// Insert the progress row of a new bracket
    async fn insert_progress(&mut self, progress: &TournamentProgress) -> BracketResult<()>;

    /// Find the progress row of a bracket
    async fn find_progress(
        &mut self,
        bracket_id: BracketId,
    ) -> BracketResult<Option<TournamentProgress>>;

    /// Move a bracket to `round`
    async fn set_current_round(&mut self, bracket_id: BracketId, round: u32) -> BracketResult<()>;

    /// Mark the bracket completed with `champion`
    ///
    /// Returns `false` if the bracket was already completed, in which case
    /// nothing changes.
    async fn complete_tournament(
        &mut self,
        bracket_id: BracketId,
        champion: TeamId,
    ) -> BracketResult<bool>;

    /// Insert one match row per pairing; byes start completed
    async fn insert_matches(
        &mut self,
        bracket_id: BracketId,
        pairings: &[Pairing],
    ) -> BracketResult<u64>;

    /// Find a match by id
    async fn find_match(&mut self, match_id: MatchId) -> BracketResult<Option<Match>>;

    /// Matches of a bracket ordered by round, then match number
    ///
    /// With `round` set only that round is returned.
    async fn list_matches(
        &mut self,
        bracket_id: BracketId,
        round: Option<u32>,
    ) -> BracketResult<Vec<Match>>;

    /// Completed vs. total matches in a round, or across the bracket
    async fn count_matches(
        &mut self,
        bracket_id: BracketId,
        round: Option<u32>,
    ) -> BracketResult<RoundTally>;

    /// Recorded winners of a round ordered by match number
    async fn round_winners(&mut self, bracket_id: BracketId, round: u32)
    -> BracketResult<Vec<TeamId>>;

    /// Highest round number with any match
    async fn max_round(&mut self, bracket_id: BracketId) -> BracketResult<Option<u32>>;

    /// Store a result on a scheduled match and mark it completed
    ///
    /// Returns `false` if the match was not in the scheduled state.
    async fn record_result(&mut self, match_id: MatchId, result: &MatchResult)
    -> BracketResult<bool>;

    /// Set date and venue of a match; returns `false` if it does not exist
    async fn update_schedule(
        &mut self,
        match_id: MatchId,
        match_date: Option<DateTime<Utc>>,
        venue: Option<&str>,
    ) -> BracketResult<bool>;

    /// Make every write of this transaction visible
    async fn commit(self) -> BracketResult<()>;
}

/// Confirmed team roster provided by the registration side
#[async_trait]
pub trait TeamRoster: Send + Sync {
    /// Confirmed team ids for an event in roster order
    async fn confirmed_teams(&self, event_id: EventId) -> BracketResult<Vec<TeamId>>;
}
