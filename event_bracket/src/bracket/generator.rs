//! Match generation for new brackets and for later single-elimination rounds.

use std::collections::HashSet;

use super::errors::{BracketError, BracketResult};
use super::models::{BracketType, Pairing, TeamId};
use super::shuffle::TeamShuffler;

/// Minimum number of teams for any bracket
pub const MIN_TEAMS: usize = 2;

/// Initial match set and round count for a bracket
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedBracket {
    pub total_rounds: u32,
    pub pairings: Vec<Pairing>,
}

/// Check a team list before anything is generated or stored
pub fn validate_teams(teams: &[TeamId]) -> BracketResult<()> {
    if teams.len() < MIN_TEAMS {
        return Err(BracketError::InsufficientTeams {
            needed: MIN_TEAMS,
            current: teams.len(),
        });
    }

    let mut seen = HashSet::with_capacity(teams.len());
    for &team in teams {
        if !seen.insert(team) {
            return Err(BracketError::DuplicateTeam(team));
        }
    }

    Ok(())
}

/// Rounds needed to finish a bracket of `team_count` teams
///
/// Round robin plays everything in round 1. Single elimination needs
/// `ceil(log2(team_count))` rounds.
pub fn total_rounds(bracket_type: BracketType, team_count: usize) -> u32 {
    match bracket_type {
        BracketType::RoundRobin => 1,
        BracketType::SingleElimination => team_count.max(1).next_power_of_two().trailing_zeros(),
    }
}

/// Pair teams in order: (0,1), (2,3), ... with a trailing bye for an odd count
pub fn pair_sequential(round_number: u32, teams: &[TeamId]) -> Vec<Pairing> {
    teams
        .chunks(2)
        .zip(1..)
        .map(|(pair, match_number)| Pairing {
            round_number,
            match_number,
            team1_id: pair[0],
            team2_id: pair.get(1).copied(),
        })
        .collect()
}

/// Round-1 pairings for a single-elimination bracket
pub fn single_elimination(teams: &[TeamId], shuffler: &dyn TeamShuffler) -> Vec<Pairing> {
    let mut seeded = teams.to_vec();
    shuffler.shuffle(&mut seeded);
    pair_sequential(1, &seeded)
}

/// Every unordered pair of teams, all in round 1
pub fn round_robin(teams: &[TeamId]) -> Vec<Pairing> {
    let mut pairings = Vec::with_capacity(teams.len() * teams.len().saturating_sub(1) / 2);
    let mut match_number = 1;

    for (i, &home) in teams.iter().enumerate() {
        for &away in &teams[i + 1..] {
            pairings.push(Pairing {
                round_number: 1,
                match_number,
                team1_id: home,
                team2_id: Some(away),
            });
            match_number += 1;
        }
    }

    pairings
}

/// Validate the team list and build the initial matches for a bracket
pub fn generate(
    bracket_type: BracketType,
    teams: &[TeamId],
    shuffler: &dyn TeamShuffler,
) -> BracketResult<GeneratedBracket> {
    validate_teams(teams)?;

    let pairings = match bracket_type {
        BracketType::SingleElimination => single_elimination(teams, shuffler),
        BracketType::RoundRobin => round_robin(teams),
    };

    Ok(GeneratedBracket {
        total_rounds: total_rounds(bracket_type, teams.len()),
        pairings,
    })
}
