//! Integration tests for full bracket lifecycles
//!
//! These drive tournaments from creation to champion through
//! `BracketManager` on top of the in-memory store.

use event_bracket::bracket::{
    BracketError, BracketId, BracketManager, BracketType, Match, MatchId, MatchStatus, NoShuffle,
    RoundOutcome, SeededShuffler,
};
use event_bracket::db::{MemoryBracketStore, StaticRoster};
use std::sync::Arc;

type Manager = BracketManager<MemoryBracketStore>;

/// Manager with unshuffled round-1 seeding
fn setup_manager() -> (Manager, MemoryBracketStore) {
    let store = MemoryBracketStore::new();
    let manager = BracketManager::new(Arc::new(store.clone())).with_shuffler(Arc::new(NoShuffle));
    (manager, store)
}

async fn find_match(manager: &Manager, bracket_id: BracketId, round: u32, number: u32) -> Match {
    manager
        .get_bracket_state(bracket_id)
        .await
        .expect("bracket exists")
        .matches
        .into_iter()
        .find(|m| m.round_number == round && m.match_number == number)
        .unwrap_or_else(|| panic!("no match {number} in round {round}"))
}

async fn match_id(manager: &Manager, bracket_id: BracketId, round: u32, number: u32) -> MatchId {
    find_match(manager, bracket_id, round, number).await.id
}

#[tokio::test]
async fn test_four_team_single_elimination() {
    let (manager, _) = setup_manager();
    let (a, b, c, d) = (1, 2, 3, 4);

    let id = manager
        .create_bracket(1, "Football", BracketType::SingleElimination, &[a, b, c, d])
        .await
        .unwrap();

    let state = manager.get_bracket_state(id).await.unwrap();
    assert_eq!(state.progress.total_rounds, 2);
    assert_eq!(state.progress.current_round, 1);
    assert_eq!(state.matches.len(), 2);

    let m1 = match_id(&manager, id, 1, 1).await;
    let outcome = manager.record_match_result(m1, 3, 1, a).await.unwrap();
    assert_eq!(
        outcome,
        RoundOutcome::InProgress {
            round: 1,
            completed: 1,
            total: 2
        }
    );

    let m2 = match_id(&manager, id, 1, 2).await;
    let outcome = manager.record_match_result(m2, 0, 2, d).await.unwrap();
    assert_eq!(
        outcome,
        RoundOutcome::Advanced {
            next_round: 2,
            matches_created: 1
        }
    );

    let final_match = find_match(&manager, id, 2, 1).await;
    assert_eq!(final_match.team1_id, a);
    assert_eq!(final_match.team2_id, Some(d));
    assert_eq!(final_match.status, MatchStatus::Scheduled);

    let outcome = manager
        .record_match_result(final_match.id, 2, 1, a)
        .await
        .unwrap();
    assert_eq!(outcome, RoundOutcome::Champion { team_id: a });

    let state = manager.get_bracket_state(id).await.unwrap();
    assert_eq!(state.matches.len(), 3);
    assert_eq!(state.progress.current_round, 2);
    assert!(state.progress.is_completed);
    assert_eq!(state.progress.champion_team_id, Some(a));
}

#[tokio::test]
async fn test_five_teams_carry_byes_through_rounds() {
    let (manager, _) = setup_manager();

    let id = manager
        .create_bracket(1, "Basketball", BracketType::SingleElimination, &[1, 2, 3, 4, 5])
        .await
        .unwrap();

    let state = manager.get_bracket_state(id).await.unwrap();
    assert_eq!(state.progress.total_rounds, 3);
    assert_eq!(state.matches.len(), 3);
    assert!(state.matches[2].is_bye());
    assert_eq!(state.matches[2].winner_team_id, Some(5));

    let m1 = match_id(&manager, id, 1, 1).await;
    let m2 = match_id(&manager, id, 1, 2).await;
    manager.record_match_result(m1, 1, 0, 1).await.unwrap();
    let outcome = manager.record_match_result(m2, 1, 0, 3).await.unwrap();
    assert_eq!(
        outcome,
        RoundOutcome::Advanced {
            next_round: 2,
            matches_created: 2
        }
    );

    // Winners [1, 3, 5] in match order
    let r2m1 = find_match(&manager, id, 2, 1).await;
    let r2m2 = find_match(&manager, id, 2, 2).await;
    assert_eq!((r2m1.team1_id, r2m1.team2_id), (1, Some(3)));
    assert!(r2m2.is_bye());
    assert_eq!(r2m2.team1_id, 5);

    let outcome = manager.record_match_result(r2m1.id, 2, 3, 3).await.unwrap();
    assert_eq!(
        outcome,
        RoundOutcome::Advanced {
            next_round: 3,
            matches_created: 1
        }
    );

    let final_match = find_match(&manager, id, 3, 1).await;
    assert_eq!((final_match.team1_id, final_match.team2_id), (3, Some(5)));

    let outcome = manager
        .record_match_result(final_match.id, 0, 1, 5)
        .await
        .unwrap();
    assert_eq!(outcome, RoundOutcome::Champion { team_id: 5 });

    let state = manager.get_bracket_state(id).await.unwrap();
    assert_eq!(state.progress.current_round, 3);
    assert_eq!(state.progress.champion_team_id, Some(5));
}

#[tokio::test]
async fn test_three_team_round_robin() {
    let (manager, _) = setup_manager();
    let (a, b, c) = (1, 2, 3);

    let id = manager
        .create_bracket(1, "Chess", BracketType::RoundRobin, &[a, b, c])
        .await
        .unwrap();

    let state = manager.get_bracket_state(id).await.unwrap();
    assert_eq!(state.progress.total_rounds, 1);
    assert_eq!(state.matches.len(), 3);
    assert!(state.matches.iter().all(|m| m.round_number == 1));

    let ab = match_id(&manager, id, 1, 1).await;
    let ac = match_id(&manager, id, 1, 2).await;
    let bc = match_id(&manager, id, 1, 3).await;

    manager.record_match_result(ab, 2, 0, a).await.unwrap();
    let outcome = manager.record_match_result(ac, 1, 0, a).await.unwrap();
    assert_eq!(
        outcome,
        RoundOutcome::InProgress {
            round: 1,
            completed: 2,
            total: 3
        }
    );

    let outcome = manager.record_match_result(bc, 0, 4, c).await.unwrap();
    assert_eq!(outcome, RoundOutcome::Champion { team_id: a });

    let standings = manager.compute_standings(id).await.unwrap();
    let table: Vec<_> = standings.iter().map(|s| (s.team_id, s.points)).collect();
    assert_eq!(table, vec![(a, 6), (c, 3), (b, 0)]);

    let state = manager.get_bracket_state(id).await.unwrap();
    assert!(state.progress.is_completed);
    assert_eq!(state.progress.champion_team_id, Some(a));
}

#[tokio::test]
async fn test_manual_advance_after_auto_advance_is_noop() {
    let (manager, store) = setup_manager();

    let id = manager
        .create_bracket(1, "Football", BracketType::SingleElimination, &[1, 2, 3, 4])
        .await
        .unwrap();

    let m1 = match_id(&manager, id, 1, 1).await;
    let m2 = match_id(&manager, id, 1, 2).await;
    manager.record_match_result(m1, 1, 0, 1).await.unwrap();
    manager.record_match_result(m2, 1, 0, 3).await.unwrap();
    assert_eq!(store.match_count().await, 3);

    for _ in 0..2 {
        let outcome = manager.manual_advance_round(id, 1).await.unwrap();
        assert_eq!(outcome, RoundOutcome::AlreadyAdvanced { round: 1 });
    }

    assert_eq!(store.match_count().await, 3);
    let state = manager.get_bracket_state(id).await.unwrap();
    assert_eq!(state.progress.current_round, 2);
}

#[tokio::test]
async fn test_failed_advancement_rolls_back_result() {
    let (manager, store) = setup_manager();

    let id = manager
        .create_bracket(1, "Football", BracketType::SingleElimination, &[1, 2, 3, 4])
        .await
        .unwrap();

    let m1 = match_id(&manager, id, 1, 1).await;
    let m2 = match_id(&manager, id, 1, 2).await;
    manager.record_match_result(m1, 1, 0, 1).await.unwrap();

    // Generating the final will fail, so recording m2 must leave no trace
    store.set_match_limit(Some(2)).await;
    let err = manager.record_match_result(m2, 1, 0, 3).await.unwrap_err();
    assert!(matches!(err, BracketError::Database(_)));

    let untouched = find_match(&manager, id, 1, 2).await;
    assert_eq!(untouched.status, MatchStatus::Scheduled);
    assert_eq!(untouched.winner_team_id, None);
    assert_eq!(store.match_count().await, 2);
    assert_eq!(
        manager.get_bracket_state(id).await.unwrap().progress.current_round,
        1
    );

    store.set_match_limit(None).await;
    let outcome = manager.record_match_result(m2, 1, 0, 3).await.unwrap();
    assert_eq!(
        outcome,
        RoundOutcome::Advanced {
            next_round: 2,
            matches_created: 1
        }
    );
}

#[tokio::test]
async fn test_round_without_winners_is_inconsistent() {
    let (manager, store) = setup_manager();

    let id = manager
        .create_bracket(1, "Football", BracketType::SingleElimination, &[1, 2, 3, 4])
        .await
        .unwrap();

    for number in 1..=2 {
        let mut m = find_match(&manager, id, 1, number).await;
        m.status = MatchStatus::Completed;
        m.winner_team_id = None;
        store.put_match(m).await;
    }

    let err = manager.manual_advance_round(id, 1).await.unwrap_err();
    assert!(matches!(err, BracketError::InconsistentState(_)));
    assert_eq!(store.match_count().await, 2);

    let state = manager.get_bracket_state(id).await.unwrap();
    assert_eq!(state.progress.current_round, 1);
    assert!(!state.progress.is_completed);
}

#[tokio::test]
async fn test_completed_match_cannot_be_recorded_again() {
    let (manager, _) = setup_manager();

    let id = manager
        .create_bracket(1, "Chess", BracketType::RoundRobin, &[1, 2, 3])
        .await
        .unwrap();
    let m = match_id(&manager, id, 1, 1).await;

    manager.record_match_result(m, 1, 0, 1).await.unwrap();
    let err = manager.record_match_result(m, 0, 1, 2).await.unwrap_err();
    assert!(matches!(err, BracketError::MatchAlreadyCompleted(id) if id == m));

    let stored = find_match(&manager, id, 1, 1).await;
    assert_eq!(stored.winner_team_id, Some(1));
    assert_eq!((stored.team1_score, stored.team2_score), (Some(1), Some(0)));
}

#[tokio::test]
async fn test_completed_bracket_rejects_mutations() {
    let (manager, _) = setup_manager();

    let id = manager
        .create_bracket(1, "Tennis", BracketType::SingleElimination, &[1, 2])
        .await
        .unwrap();
    let m = match_id(&manager, id, 1, 1).await;
    manager.record_match_result(m, 2, 0, 1).await.unwrap();

    assert!(matches!(
        manager.manual_advance_round(id, 1).await,
        Err(BracketError::BracketCompleted(_))
    ));
    assert!(matches!(
        manager.manual_set_champion(id).await,
        Err(BracketError::BracketCompleted(_))
    ));
}

#[tokio::test]
async fn test_manual_champion_single_elimination() {
    let (manager, store) = setup_manager();

    let id = manager
        .create_bracket(1, "Football", BracketType::SingleElimination, &[1, 2, 3, 4])
        .await
        .unwrap();

    // Two decided matches in the highest round is ambiguous
    for (number, winner) in [(1, 2), (2, 4)] {
        let mut m = find_match(&manager, id, 1, number).await;
        m.status = MatchStatus::Completed;
        m.winner_team_id = Some(winner);
        store.put_match(m).await;
    }
    let err = manager.manual_set_champion(id).await.unwrap_err();
    assert!(matches!(err, BracketError::InconsistentState(_)));

    let outcome = manager.manual_advance_round(id, 1).await.unwrap();
    assert_eq!(
        outcome,
        RoundOutcome::Advanced {
            next_round: 2,
            matches_created: 1
        }
    );

    let mut final_match = find_match(&manager, id, 2, 1).await;
    final_match.status = MatchStatus::Completed;
    final_match.winner_team_id = Some(4);
    store.put_match(final_match).await;

    assert_eq!(manager.manual_set_champion(id).await.unwrap(), Some(4));
    let state = manager.get_bracket_state(id).await.unwrap();
    assert!(state.progress.is_completed);
    assert_eq!(state.progress.champion_team_id, Some(4));
}

#[tokio::test]
async fn test_manual_champion_round_robin() {
    let (manager, _) = setup_manager();

    let id = manager
        .create_bracket(1, "Chess", BracketType::RoundRobin, &[1, 2, 3])
        .await
        .unwrap();

    // Nothing played yet: no champion, bracket stays open
    assert_eq!(manager.manual_set_champion(id).await.unwrap(), None);
    assert!(!manager.get_bracket_state(id).await.unwrap().progress.is_completed);

    let bc = match_id(&manager, id, 1, 3).await;
    manager.record_match_result(bc, 1, 3, 3).await.unwrap();

    assert_eq!(manager.manual_set_champion(id).await.unwrap(), Some(3));

    let ab = match_id(&manager, id, 1, 1).await;
    let err = manager.record_match_result(ab, 1, 0, 1).await.unwrap_err();
    assert!(matches!(err, BracketError::BracketCompleted(_)));
}

#[tokio::test]
async fn test_concurrent_final_results_advance_once() {
    let (manager, store) = setup_manager();

    let id = manager
        .create_bracket(1, "Football", BracketType::SingleElimination, &[1, 2, 3, 4])
        .await
        .unwrap();
    let m1 = match_id(&manager, id, 1, 1).await;
    let m2 = match_id(&manager, id, 1, 2).await;

    let first = {
        let manager = manager.clone();
        tokio::spawn(async move { manager.record_match_result(m1, 1, 0, 1).await })
    };
    let second = {
        let manager = manager.clone();
        tokio::spawn(async move { manager.record_match_result(m2, 1, 0, 4).await })
    };

    let outcomes = [first.await.unwrap().unwrap(), second.await.unwrap().unwrap()];
    let advanced = outcomes
        .iter()
        .filter(|o| matches!(o, RoundOutcome::Advanced { .. }))
        .count();

    assert_eq!(advanced, 1);
    assert_eq!(store.match_count().await, 3);
}

#[tokio::test]
async fn test_bracket_from_roster() {
    let (manager, _) = setup_manager();
    let roster = StaticRoster::new().with_event(7, vec![10, 20, 30, 40]);

    let id = manager
        .create_bracket_from_roster(&roster, 7, "Volleyball", BracketType::RoundRobin)
        .await
        .unwrap();
    assert_eq!(manager.get_bracket_state(id).await.unwrap().matches.len(), 6);

    let err = manager
        .create_bracket_from_roster(&roster, 8, "Volleyball", BracketType::RoundRobin)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        BracketError::InsufficientTeams {
            needed: 2,
            current: 0
        }
    ));
}

#[tokio::test]
async fn test_list_event_brackets_newest_first() {
    let (manager, _) = setup_manager();

    let football = manager
        .create_bracket(1, "Football", BracketType::SingleElimination, &[1, 2])
        .await
        .unwrap();
    let chess = manager
        .create_bracket(1, "Chess", BracketType::RoundRobin, &[1, 2, 3])
        .await
        .unwrap();
    manager
        .create_bracket(2, "Chess", BracketType::RoundRobin, &[4, 5])
        .await
        .unwrap();

    let summaries = manager.list_event_brackets(1).await.unwrap();
    let ids: Vec<_> = summaries.iter().map(|s| s.bracket.id).collect();
    assert_eq!(ids, vec![chess, football]);
    assert!(summaries.iter().all(|s| !s.progress.is_completed));

    assert!(manager.list_event_brackets(99).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_seeded_shuffle_gives_same_first_round() {
    let teams: Vec<i64> = (1..=8).collect();
    let mut pairings = Vec::new();

    for _ in 0..2 {
        let manager = BracketManager::new(Arc::new(MemoryBracketStore::new()))
            .with_shuffler(Arc::new(SeededShuffler::new(42)));
        let id = manager
            .create_bracket(1, "Football", BracketType::SingleElimination, &teams)
            .await
            .unwrap();
        let state = manager.get_bracket_state(id).await.unwrap();
        let round: Vec<_> = state
            .matches
            .iter()
            .map(|m| (m.team1_id, m.team2_id))
            .collect();
        pairings.push(round);
    }

    assert_eq!(pairings[0], pairings[1]);
    assert_eq!(pairings[0].len(), 4);
}
