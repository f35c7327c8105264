//! Round-robin standings: 3 points for a win, 1 each for a draw.

use std::collections::BTreeMap;

use super::models::{Match, TeamId, TeamStanding};

pub const WIN_POINTS: u32 = 3;
pub const DRAW_POINTS: u32 = 1;

/// Build the standings table from a bracket's matches
///
/// Every team that appears in any match gets a row. Only completed matches
/// count. Rows are ordered by points, then wins, then team id.
pub fn compute_standings(matches: &[Match]) -> Vec<TeamStanding> {
    let mut table: BTreeMap<TeamId, TeamStanding> = BTreeMap::new();

    for m in matches {
        for team in std::iter::once(m.team1_id).chain(m.team2_id) {
            table.entry(team).or_insert_with(|| TeamStanding::new(team));
        }
    }

    for m in matches.iter().filter(|m| m.is_completed()) {
        let Some(team2) = m.team2_id else {
            continue;
        };

        for team in [m.team1_id, team2] {
            if let Some(row) = table.get_mut(&team) {
                row.matches_played += 1;
            }
        }

        match m.winner_team_id {
            Some(winner) if m.involves(winner) => {
                if let Some(row) = table.get_mut(&winner) {
                    row.wins += 1;
                    row.points += WIN_POINTS;
                }
            }
            _ => {
                for team in [m.team1_id, team2] {
                    if let Some(row) = table.get_mut(&team) {
                        row.points += DRAW_POINTS;
                    }
                }
            }
        }
    }

    // BTreeMap yields ascending team ids and sort_by is stable
    let mut standings: Vec<TeamStanding> = table.into_values().collect();
    standings.sort_by(|a, b| b.points.cmp(&a.points).then(b.wins.cmp(&a.wins)));
    standings
}

/// Top of the table, or `None` if no completed match has been played
pub fn champion(standings: &[TeamStanding]) -> Option<TeamId> {
    if standings.iter().all(|s| s.matches_played == 0) {
        return None;
    }
    standings.first().map(|s| s.team_id)
}
