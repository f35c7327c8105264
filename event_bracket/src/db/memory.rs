//! In-memory bracket store for tests and local runs.
//!
//! Transactions take an exclusive lock on the shared state and work on a
//! private copy. `commit` publishes the copy; dropping the transaction
//! discards it.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

use super::repository::{BracketStore, BracketTransaction, TeamRoster};
use crate::bracket::{
    Bracket, BracketError, BracketId, BracketResult, EventId, Match, MatchId, MatchResult,
    MatchStatus, NewBracket, Pairing, RoundTally, TeamId, TournamentProgress,
};

#[derive(Debug, Clone, Default)]
struct MemoryState {
    brackets: BTreeMap<BracketId, Bracket>,
    progress: HashMap<BracketId, TournamentProgress>,
    matches: BTreeMap<MatchId, Match>,
    next_bracket_id: BracketId,
    next_match_id: MatchId,
    /// Fail `insert_matches` once this many rows would exist, for rollback tests
    match_limit: Option<usize>,
}

impl MemoryState {
    fn bracket_matches(&self, bracket_id: BracketId) -> impl Iterator<Item = &Match> {
        self.matches
            .values()
            .filter(move |m| m.bracket_id == bracket_id)
    }
}

/// Bracket store that keeps everything in process memory
#[derive(Clone, Default)]
pub struct MemoryBracketStore {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryBracketStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `insert_matches` fail once the store would hold more than `limit` matches
    pub async fn set_match_limit(&self, limit: Option<usize>) {
        self.state.lock().await.match_limit = limit;
    }

    /// Number of committed matches across all brackets
    pub async fn match_count(&self) -> usize {
        self.state.lock().await.matches.len()
    }

    /// Number of committed brackets
    pub async fn bracket_count(&self) -> usize {
        self.state.lock().await.brackets.len()
    }

    /// Overwrite a stored match, for tests that need an unusual state
    pub async fn put_match(&self, m: Match) {
        self.state.lock().await.matches.insert(m.id, m);
    }
}

#[async_trait]
impl BracketStore for MemoryBracketStore {
    type Tx = MemoryTransaction;

    async fn begin(&self) -> BracketResult<Self::Tx> {
        let guard = self.state.clone().lock_owned().await;
        let working = guard.clone();
        Ok(MemoryTransaction { guard, working })
    }

    async fn health_check(&self) -> BracketResult<()> {
        Ok(())
    }
}

/// Open in-memory transaction holding the store lock
pub struct MemoryTransaction {
    guard: OwnedMutexGuard<MemoryState>,
    working: MemoryState,
}

#[async_trait]
impl BracketTransaction for MemoryTransaction {
    async fn insert_bracket(&mut self, bracket: &NewBracket) -> BracketResult<Bracket> {
        self.working.next_bracket_id += 1;
        let stored = Bracket {
            id: self.working.next_bracket_id,
            event_id: bracket.event_id,
            sport_name: bracket.sport_name.clone(),
            bracket_type: bracket.bracket_type,
            created_at: Utc::now(),
        };
        self.working.brackets.insert(stored.id, stored.clone());
        Ok(stored)
    }

    async fn find_bracket(&mut self, bracket_id: BracketId) -> BracketResult<Option<Bracket>> {
        Ok(self.working.brackets.get(&bracket_id).cloned())
    }

    async fn list_event_brackets(&mut self, event_id: EventId) -> BracketResult<Vec<Bracket>> {
        let mut brackets: Vec<Bracket> = self
            .working
            .brackets
            .values()
            .filter(|b| b.event_id == event_id)
            .cloned()
            .collect();
        brackets.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(brackets)
    }

    async fn insert_progress(&mut self, progress: &TournamentProgress) -> BracketResult<()> {
        self.working
            .progress
            .insert(progress.bracket_id, progress.clone());
        Ok(())
    }

    async fn find_progress(
        &mut self,
        bracket_id: BracketId,
    ) -> BracketResult<Option<TournamentProgress>> {
        Ok(self.working.progress.get(&bracket_id).cloned())
    }

    async fn set_current_round(&mut self, bracket_id: BracketId, round: u32) -> BracketResult<()> {
        if let Some(progress) = self.working.progress.get_mut(&bracket_id) {
            progress.current_round = round;
        }
        Ok(())
    }

    async fn complete_tournament(
        &mut self,
        bracket_id: BracketId,
        champion: TeamId,
    ) -> BracketResult<bool> {
        match self.working.progress.get_mut(&bracket_id) {
            Some(progress) if !progress.is_completed => {
                progress.champion_team_id = Some(champion);
                progress.is_completed = true;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn insert_matches(
        &mut self,
        bracket_id: BracketId,
        pairings: &[Pairing],
    ) -> BracketResult<u64> {
        for pairing in pairings {
            if let Some(limit) = self.working.match_limit {
                if self.working.matches.len() >= limit {
                    return Err(BracketError::Database(sqlx::Error::Protocol(format!(
                        "match limit of {limit} reached"
                    ))));
                }
            }

            self.working.next_match_id += 1;
            let id = self.working.next_match_id;
            self.working.matches.insert(
                id,
                Match {
                    id,
                    bracket_id,
                    round_number: pairing.round_number,
                    match_number: pairing.match_number,
                    team1_id: pairing.team1_id,
                    team2_id: pairing.team2_id,
                    winner_team_id: pairing.initial_winner(),
                    team1_score: None,
                    team2_score: None,
                    status: pairing.initial_status(),
                    match_date: None,
                    venue: None,
                },
            );
        }
        Ok(pairings.len() as u64)
    }

    async fn find_match(&mut self, match_id: MatchId) -> BracketResult<Option<Match>> {
        Ok(self.working.matches.get(&match_id).cloned())
    }

    async fn list_matches(
        &mut self,
        bracket_id: BracketId,
        round: Option<u32>,
    ) -> BracketResult<Vec<Match>> {
        let mut matches: Vec<Match> = self
            .working
            .bracket_matches(bracket_id)
            .filter(|m| round.is_none_or(|r| m.round_number == r))
            .cloned()
            .collect();
        matches.sort_by_key(|m| (m.round_number, m.match_number));
        Ok(matches)
    }

    async fn count_matches(
        &mut self,
        bracket_id: BracketId,
        round: Option<u32>,
    ) -> BracketResult<RoundTally> {
        let tally = self
            .working
            .bracket_matches(bracket_id)
            .filter(|m| round.is_none_or(|r| m.round_number == r))
            .fold(RoundTally::default(), |mut tally, m| {
                tally.total += 1;
                if m.is_completed() {
                    tally.completed += 1;
                }
                tally
            });
        Ok(tally)
    }

    async fn round_winners(
        &mut self,
        bracket_id: BracketId,
        round: u32,
    ) -> BracketResult<Vec<TeamId>> {
        let mut decided: Vec<&Match> = self
            .working
            .bracket_matches(bracket_id)
            .filter(|m| m.round_number == round && m.winner_team_id.is_some())
            .collect();
        decided.sort_by_key(|m| m.match_number);
        Ok(decided.iter().filter_map(|m| m.winner_team_id).collect())
    }

    async fn max_round(&mut self, bracket_id: BracketId) -> BracketResult<Option<u32>> {
        Ok(self
            .working
            .bracket_matches(bracket_id)
            .map(|m| m.round_number)
            .max())
    }

    async fn record_result(
        &mut self,
        match_id: MatchId,
        result: &MatchResult,
    ) -> BracketResult<bool> {
        match self.working.matches.get_mut(&match_id) {
            Some(m) if m.status == MatchStatus::Scheduled => {
                m.team1_score = Some(result.team1_score);
                m.team2_score = Some(result.team2_score);
                m.winner_team_id = Some(result.winner_team_id);
                m.status = MatchStatus::Completed;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn update_schedule(
        &mut self,
        match_id: MatchId,
        match_date: Option<DateTime<Utc>>,
        venue: Option<&str>,
    ) -> BracketResult<bool> {
        match self.working.matches.get_mut(&match_id) {
            Some(m) => {
                m.match_date = match_date;
                m.venue = venue.map(str::to_string);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn commit(mut self) -> BracketResult<()> {
        *self.guard = std::mem::take(&mut self.working);
        Ok(())
    }
}

/// Fixed roster, keyed by event
#[derive(Debug, Clone, Default)]
pub struct StaticRoster {
    teams: HashMap<EventId, Vec<TeamId>>,
}

impl StaticRoster {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_event(mut self, event_id: EventId, teams: Vec<TeamId>) -> Self {
        self.teams.insert(event_id, teams);
        self
    }
}

#[async_trait]
impl TeamRoster for StaticRoster {
    async fn confirmed_teams(&self, event_id: EventId) -> BracketResult<Vec<TeamId>> {
        Ok(self.teams.get(&event_id).cloned().unwrap_or_default())
    }
}
