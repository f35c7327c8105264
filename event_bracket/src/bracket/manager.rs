//! Bracket manager: creation, result recording, round advancement and champions.

use chrono::{DateTime, Utc};
use std::sync::Arc;

use super::config::BracketConfig;
use super::errors::{BracketError, BracketResult};
use super::generator;
use super::models::{
    Bracket, BracketId, BracketState, BracketSummary, BracketType, EventId, MatchId, MatchResult,
    NewBracket, RoundOutcome, TeamId, TeamStanding, TournamentProgress,
};
use super::shuffle::{RandomShuffler, TeamShuffler};
use super::standings;
use crate::db::{BracketStore, BracketTransaction, TeamRoster};

/// Bracket manager
///
/// Each public operation runs in exactly one storage transaction. Errors
/// drop the transaction, so no partial match set or progress update is ever
/// committed.
pub struct BracketManager<S: BracketStore> {
    store: Arc<S>,
    shuffler: Arc<dyn TeamShuffler>,
}

impl<S: BracketStore> Clone for BracketManager<S> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            shuffler: self.shuffler.clone(),
        }
    }
}

impl<S: BracketStore> BracketManager<S> {
    /// Create a new bracket manager with random round-1 seeding
    pub fn new(store: Arc<S>) -> Self {
        Self {
            store,
            shuffler: Arc::new(RandomShuffler),
        }
    }

    /// Create a bracket manager using the configured shuffler
    pub fn with_config(store: Arc<S>, config: &BracketConfig) -> Self {
        Self {
            store,
            shuffler: config.shuffler(),
        }
    }

    /// Replace the round-1 shuffler
    pub fn with_shuffler(mut self, shuffler: Arc<dyn TeamShuffler>) -> Self {
        self.shuffler = shuffler;
        self
    }

    /// Backing store
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Create a bracket with its round-1 matches and progress row
    ///
    /// # Errors
    ///
    /// * `BracketError::InsufficientTeams` - Fewer than 2 teams
    /// * `BracketError::DuplicateTeam` - A team id appears twice
    /// * `BracketError::BracketExists` - The event already has a bracket for this sport
    pub async fn create_bracket(
        &self,
        event_id: EventId,
        sport_name: &str,
        bracket_type: BracketType,
        team_ids: &[TeamId],
    ) -> BracketResult<BracketId> {
        let generated = generator::generate(bracket_type, team_ids, self.shuffler.as_ref())?;

        let mut tx = self.store.begin().await?;

        let existing = tx.list_event_brackets(event_id).await?;
        if existing.iter().any(|b| b.sport_name == sport_name) {
            return Err(BracketError::BracketExists {
                event_id,
                sport_name: sport_name.to_string(),
            });
        }

        let bracket = tx
            .insert_bracket(&NewBracket {
                event_id,
                sport_name: sport_name.to_string(),
                bracket_type,
            })
            .await?;

        tx.insert_progress(&TournamentProgress::initial(bracket.id, generated.total_rounds))
            .await?;
        let inserted = tx.insert_matches(bracket.id, &generated.pairings).await?;

        tx.commit().await?;

        log::info!(
            "Created {} bracket {} for event {} ({}): {} teams, {} matches, {} rounds",
            bracket_type,
            bracket.id,
            event_id,
            sport_name,
            team_ids.len(),
            inserted,
            generated.total_rounds
        );

        Ok(bracket.id)
    }

    /// Create a bracket from the event's confirmed roster
    pub async fn create_bracket_from_roster(
        &self,
        roster: &dyn TeamRoster,
        event_id: EventId,
        sport_name: &str,
        bracket_type: BracketType,
    ) -> BracketResult<BracketId> {
        let teams = roster.confirmed_teams(event_id).await?;
        self.create_bracket(event_id, sport_name, bracket_type, &teams)
            .await
    }

    /// Record a match result and run round completion for its bracket
    ///
    /// # Errors
    ///
    /// * `BracketError::MatchNotFound` - No such match
    /// * `BracketError::MatchAlreadyCompleted` - The match already has a result
    /// * `BracketError::InvalidWinner` - Winner is not playing in the match
    /// * `BracketError::BracketCompleted` - The bracket already has a champion
    pub async fn record_match_result(
        &self,
        match_id: MatchId,
        team1_score: i32,
        team2_score: i32,
        winner_team_id: TeamId,
    ) -> BracketResult<RoundOutcome> {
        for score in [team1_score, team2_score] {
            if score < 0 {
                return Err(BracketError::InvalidScore(score));
            }
        }

        let mut tx = self.store.begin().await?;

        let m = tx
            .find_match(match_id)
            .await?
            .ok_or(BracketError::MatchNotFound(match_id))?;
        let (bracket, progress) = load_bracket(&mut tx, m.bracket_id).await?;

        if progress.is_completed {
            return Err(BracketError::BracketCompleted(bracket.id));
        }
        if m.is_completed() {
            return Err(BracketError::MatchAlreadyCompleted(match_id));
        }
        if m.is_bye() || !m.involves(winner_team_id) {
            return Err(BracketError::InvalidWinner {
                match_id,
                team_id: winner_team_id,
            });
        }

        let result = MatchResult {
            team1_score,
            team2_score,
            winner_team_id,
        };
        if !tx.record_result(match_id, &result).await? {
            return Err(BracketError::MatchAlreadyCompleted(match_id));
        }

        log::debug!(
            "Match {} result {}-{}, winner {}",
            match_id,
            team1_score,
            team2_score,
            winner_team_id
        );

        let outcome = evaluate_completion(&mut tx, &bracket, &progress, m.round_number).await?;
        tx.commit().await?;

        Ok(outcome)
    }

    /// Bracket, progress and all matches ordered by round, then match number
    pub async fn get_bracket_state(&self, bracket_id: BracketId) -> BracketResult<BracketState> {
        let mut tx = self.store.begin().await?;
        let (bracket, progress) = load_bracket(&mut tx, bracket_id).await?;
        let matches = tx.list_matches(bracket_id, None).await?;
        tx.commit().await?;

        Ok(BracketState {
            bracket,
            progress,
            matches,
        })
    }

    /// All brackets of an event with their progress, newest first
    pub async fn list_event_brackets(&self, event_id: EventId) -> BracketResult<Vec<BracketSummary>> {
        let mut tx = self.store.begin().await?;
        let brackets = tx.list_event_brackets(event_id).await?;

        let mut summaries = Vec::with_capacity(brackets.len());
        for bracket in brackets {
            let progress = tx
                .find_progress(bracket.id)
                .await?
                .ok_or_else(|| missing_progress(bracket.id))?;
            summaries.push(BracketSummary { bracket, progress });
        }
        tx.commit().await?;

        Ok(summaries)
    }

    /// Current points table of a bracket, without changing anything
    pub async fn compute_standings(&self, bracket_id: BracketId) -> BracketResult<Vec<TeamStanding>> {
        let mut tx = self.store.begin().await?;
        load_bracket(&mut tx, bracket_id).await?;
        let matches = tx.list_matches(bracket_id, None).await?;
        tx.commit().await?;

        Ok(standings::compute_standings(&matches))
    }

    /// Set the date and venue of a match
    pub async fn update_match_schedule(
        &self,
        match_id: MatchId,
        match_date: Option<DateTime<Utc>>,
        venue: Option<&str>,
    ) -> BracketResult<()> {
        let mut tx = self.store.begin().await?;
        if !tx.update_schedule(match_id, match_date, venue).await? {
            return Err(BracketError::MatchNotFound(match_id));
        }
        tx.commit().await?;

        log::debug!("Rescheduled match {}", match_id);
        Ok(())
    }

    /// Generate the round after `current_round` by hand
    ///
    /// Round robin has nothing to generate and returns `Unchanged`.
    ///
    /// # Errors
    ///
    /// * `BracketError::RoundNotComplete` - The round has unplayed matches
    /// * `BracketError::InconsistentState` - The round has no winners
    pub async fn manual_advance_round(
        &self,
        bracket_id: BracketId,
        current_round: u32,
    ) -> BracketResult<RoundOutcome> {
        let mut tx = self.store.begin().await?;
        let (bracket, progress) = load_bracket(&mut tx, bracket_id).await?;

        if bracket.bracket_type == BracketType::RoundRobin {
            log::info!(
                "Bracket {} is round robin, all matches already exist in round 1",
                bracket_id
            );
            return Ok(RoundOutcome::Unchanged);
        }
        if progress.is_completed {
            return Err(BracketError::BracketCompleted(bracket_id));
        }

        let tally = tx.count_matches(bracket_id, Some(current_round)).await?;
        if !tally.is_resolved() {
            return Err(BracketError::RoundNotComplete {
                round: current_round,
                completed: tally.completed,
                total: tally.total,
            });
        }

        let outcome = advance_round(&mut tx, &progress, current_round).await?;
        tx.commit().await?;

        Ok(outcome)
    }

    /// Decide the champion by hand
    ///
    /// Single elimination takes the only decided match of the highest round.
    /// Round robin takes the top of the standings, or `None` if nothing has
    /// been played.
    pub async fn manual_set_champion(&self, bracket_id: BracketId) -> BracketResult<Option<TeamId>> {
        let mut tx = self.store.begin().await?;
        let (bracket, progress) = load_bracket(&mut tx, bracket_id).await?;

        if progress.is_completed {
            return Err(BracketError::BracketCompleted(bracket_id));
        }

        let champion = match bracket.bracket_type {
            BracketType::SingleElimination => {
                let last_round = tx.max_round(bracket_id).await?.ok_or_else(|| {
                    BracketError::InconsistentState(format!("bracket {bracket_id} has no matches"))
                })?;

                let winners = tx.round_winners(bracket_id, last_round).await?;
                let [champion] = winners.as_slice() else {
                    log::warn!(
                        "Bracket {}: round {} has {} decided matches, cannot pick a champion",
                        bracket_id,
                        last_round,
                        winners.len()
                    );
                    return Err(BracketError::InconsistentState(format!(
                        "round {last_round} has {} decided matches, expected exactly 1",
                        winners.len()
                    )));
                };

                tx.complete_tournament(bracket_id, *champion).await?;
                log::info!("Bracket {}: champion set by hand to {}", bracket_id, champion);
                Some(*champion)
            }
            BracketType::RoundRobin => settle_round_robin(&mut tx, bracket_id).await?,
        };

        tx.commit().await?;
        Ok(champion)
    }
}

fn missing_progress(bracket_id: BracketId) -> BracketError {
    BracketError::InconsistentState(format!("bracket {bracket_id} has no progress row"))
}

async fn load_bracket<T: BracketTransaction>(
    tx: &mut T,
    bracket_id: BracketId,
) -> BracketResult<(Bracket, TournamentProgress)> {
    let bracket = tx
        .find_bracket(bracket_id)
        .await?
        .ok_or(BracketError::BracketNotFound(bracket_id))?;
    let progress = tx
        .find_progress(bracket_id)
        .await?
        .ok_or_else(|| missing_progress(bracket_id))?;
    Ok((bracket, progress))
}

/// Check whether the round containing a just-recorded match is resolved
async fn evaluate_completion<T: BracketTransaction>(
    tx: &mut T,
    bracket: &Bracket,
    progress: &TournamentProgress,
    round: u32,
) -> BracketResult<RoundOutcome> {
    match bracket.bracket_type {
        BracketType::SingleElimination => {
            let tally = tx.count_matches(bracket.id, Some(round)).await?;
            log::info!(
                "Bracket {} round {} progress: {}/{} matches completed",
                bracket.id,
                round,
                tally.completed,
                tally.total
            );

            if tally.is_resolved() {
                advance_round(tx, progress, round).await
            } else {
                Ok(RoundOutcome::InProgress {
                    round,
                    completed: tally.completed,
                    total: tally.total,
                })
            }
        }
        BracketType::RoundRobin => {
            let tally = tx.count_matches(bracket.id, None).await?;
            log::info!(
                "Bracket {} round robin progress: {}/{} matches completed",
                bracket.id,
                tally.completed,
                tally.total
            );

            if !tally.is_resolved() {
                return Ok(RoundOutcome::InProgress {
                    round,
                    completed: tally.completed,
                    total: tally.total,
                });
            }

            match settle_round_robin(tx, bracket.id).await? {
                Some(team_id) => Ok(RoundOutcome::Champion { team_id }),
                None => Err(BracketError::InconsistentState(format!(
                    "bracket {} finished without a champion",
                    bracket.id
                ))),
            }
        }
    }
}

/// Pair the winners of a resolved single-elimination round
///
/// Only the current round advances; anything older is reported as already
/// advanced so repeated evaluation never duplicates matches.
async fn advance_round<T: BracketTransaction>(
    tx: &mut T,
    progress: &TournamentProgress,
    round: u32,
) -> BracketResult<RoundOutcome> {
    let bracket_id = progress.bracket_id;

    if progress.is_completed || round != progress.current_round {
        log::debug!(
            "Bracket {}: round {} already advanced (current round {})",
            bracket_id,
            round,
            progress.current_round
        );
        return Ok(RoundOutcome::AlreadyAdvanced { round });
    }

    let next_round = round + 1;
    if tx.count_matches(bracket_id, Some(next_round)).await?.total > 0 {
        log::warn!(
            "Bracket {}: round {} already has matches, not regenerating",
            bracket_id,
            next_round
        );
        return Ok(RoundOutcome::AlreadyAdvanced { round });
    }

    let winners = tx.round_winners(bracket_id, round).await?;
    match winners.as_slice() {
        [] => {
            log::error!("Bracket {}: no winners found for round {}", bracket_id, round);
            Err(BracketError::InconsistentState(format!(
                "round {round} of bracket {bracket_id} has no winners"
            )))
        }
        [champion] => {
            tx.complete_tournament(bracket_id, *champion).await?;
            log::info!("Bracket {} complete, champion: {}", bracket_id, champion);
            Ok(RoundOutcome::Champion { team_id: *champion })
        }
        _ => {
            tx.set_current_round(bracket_id, next_round).await?;
            let pairings = generator::pair_sequential(next_round, &winners);
            tx.insert_matches(bracket_id, &pairings).await?;

            log::info!(
                "Bracket {}: generated round {} with {} winners ({} matches)",
                bracket_id,
                next_round,
                winners.len(),
                pairings.len()
            );

            Ok(RoundOutcome::Advanced {
                next_round,
                matches_created: pairings.len(),
            })
        }
    }
}

/// Crown the top of the round-robin table
async fn settle_round_robin<T: BracketTransaction>(
    tx: &mut T,
    bracket_id: BracketId,
) -> BracketResult<Option<TeamId>> {
    let matches = tx.list_matches(bracket_id, None).await?;
    let table = standings::compute_standings(&matches);

    let Some(champion) = standings::champion(&table) else {
        log::warn!(
            "Bracket {}: no completed matches, no champion determined",
            bracket_id
        );
        return Ok(None);
    };

    if tx.complete_tournament(bracket_id, champion).await? {
        let top = &table[0];
        log::info!(
            "Bracket {} round robin champion: {} with {} points ({} wins)",
            bracket_id,
            champion,
            top.points,
            top.wins
        );
    }

    Ok(Some(champion))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bracket::MatchStatus;
    use crate::bracket::shuffle::NoShuffle;
    use crate::db::MemoryBracketStore;

    fn manager() -> BracketManager<MemoryBracketStore> {
        BracketManager::new(Arc::new(MemoryBracketStore::new())).with_shuffler(Arc::new(NoShuffle))
    }

    async fn match_id(
        mgr: &BracketManager<MemoryBracketStore>,
        bracket_id: BracketId,
        round: u32,
        match_number: u32,
    ) -> MatchId {
        mgr.get_bracket_state(bracket_id)
            .await
            .unwrap()
            .matches
            .iter()
            .find(|m| m.round_number == round && m.match_number == match_number)
            .map(|m| m.id)
            .expect("match exists")
    }

    #[tokio::test]
    async fn test_create_rejects_single_team_before_writing() {
        let mgr = manager();
        let err = mgr
            .create_bracket(1, "Chess", BracketType::RoundRobin, &[1])
            .await
            .unwrap_err();

        assert!(matches!(err, BracketError::InsufficientTeams { .. }));
        assert_eq!(mgr.store().bracket_count().await, 0);
    }

    #[tokio::test]
    async fn test_create_rejects_second_bracket_for_same_sport() {
        let mgr = manager();
        mgr.create_bracket(1, "Chess", BracketType::RoundRobin, &[1, 2])
            .await
            .unwrap();

        let err = mgr
            .create_bracket(1, "Chess", BracketType::SingleElimination, &[1, 2])
            .await
            .unwrap_err();
        assert!(matches!(err, BracketError::BracketExists { event_id: 1, .. }));

        // Different sport in the same event is fine
        mgr.create_bracket(1, "Football", BracketType::RoundRobin, &[1, 2])
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_bye_is_completed_at_creation() {
        let mgr = manager();
        let id = mgr
            .create_bracket(1, "Volleyball", BracketType::SingleElimination, &[1, 2, 3])
            .await
            .unwrap();

        let state = mgr.get_bracket_state(id).await.unwrap();
        assert_eq!(state.progress.total_rounds, 2);
        assert_eq!(state.matches.len(), 2);

        let bye = &state.matches[1];
        assert!(bye.is_bye());
        assert_eq!(bye.team1_id, 3);
        assert_eq!(bye.winner_team_id, Some(3));
        assert_eq!(bye.status, MatchStatus::Completed);
    }

    #[tokio::test]
    async fn test_record_rejects_outsider_winner() {
        let mgr = manager();
        let id = mgr
            .create_bracket(1, "Tennis", BracketType::SingleElimination, &[1, 2])
            .await
            .unwrap();
        let m = match_id(&mgr, id, 1, 1).await;

        let err = mgr.record_match_result(m, 2, 0, 9).await.unwrap_err();
        assert!(matches!(err, BracketError::InvalidWinner { team_id: 9, .. }));

        let err = mgr.record_match_result(m, -1, 0, 1).await.unwrap_err();
        assert!(matches!(err, BracketError::InvalidScore(-1)));
    }

    #[tokio::test]
    async fn test_record_on_bye_is_rejected() {
        let mgr = manager();
        let id = mgr
            .create_bracket(1, "Tennis", BracketType::SingleElimination, &[1, 2, 3])
            .await
            .unwrap();
        let bye = match_id(&mgr, id, 1, 2).await;

        let err = mgr.record_match_result(bye, 1, 0, 3).await.unwrap_err();
        assert!(matches!(err, BracketError::MatchAlreadyCompleted(_)));
    }

    #[tokio::test]
    async fn test_two_team_final_crowns_champion() {
        let mgr = manager();
        let id = mgr
            .create_bracket(1, "Tennis", BracketType::SingleElimination, &[1, 2])
            .await
            .unwrap();
        let m = match_id(&mgr, id, 1, 1).await;

        let outcome = mgr.record_match_result(m, 6, 4, 2).await.unwrap();
        assert_eq!(outcome, RoundOutcome::Champion { team_id: 2 });

        let state = mgr.get_bracket_state(id).await.unwrap();
        assert!(state.progress.is_completed);
        assert_eq!(state.progress.champion_team_id, Some(2));
        assert_eq!(state.progress.current_round, 1);
        assert_eq!(state.matches.len(), 1);
    }

    #[tokio::test]
    async fn test_unknown_ids() {
        let mgr = manager();
        assert!(matches!(
            mgr.get_bracket_state(42).await,
            Err(BracketError::BracketNotFound(42))
        ));
        assert!(matches!(
            mgr.record_match_result(7, 1, 0, 1).await,
            Err(BracketError::MatchNotFound(7))
        ));
        assert!(matches!(
            mgr.update_match_schedule(7, None, Some("Court 1")).await,
            Err(BracketError::MatchNotFound(7))
        ));
    }

    #[tokio::test]
    async fn test_update_match_schedule() {
        let mgr = manager();
        let id = mgr
            .create_bracket(1, "Tennis", BracketType::RoundRobin, &[1, 2])
            .await
            .unwrap();
        let m = match_id(&mgr, id, 1, 1).await;
        let when = Utc::now();

        mgr.update_match_schedule(m, Some(when), Some("Court 3"))
            .await
            .unwrap();

        let state = mgr.get_bracket_state(id).await.unwrap();
        assert_eq!(state.matches[0].match_date, Some(when));
        assert_eq!(state.matches[0].venue.as_deref(), Some("Court 3"));
    }

    #[tokio::test]
    async fn test_manual_advance_round_robin_is_unchanged() {
        let mgr = manager();
        let id = mgr
            .create_bracket(1, "Chess", BracketType::RoundRobin, &[1, 2, 3])
            .await
            .unwrap();

        let outcome = mgr.manual_advance_round(id, 1).await.unwrap();
        assert_eq!(outcome, RoundOutcome::Unchanged);
        assert_eq!(mgr.get_bracket_state(id).await.unwrap().matches.len(), 3);
    }

    #[tokio::test]
    async fn test_manual_advance_requires_completed_round() {
        let mgr = manager();
        let id = mgr
            .create_bracket(1, "Chess", BracketType::SingleElimination, &[1, 2, 3, 4])
            .await
            .unwrap();

        let err = mgr.manual_advance_round(id, 1).await.unwrap_err();
        assert!(matches!(
            err,
            BracketError::RoundNotComplete {
                round: 1,
                completed: 0,
                total: 2
            }
        ));
    }
}
