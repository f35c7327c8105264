//! PostgreSQL implementation of the bracket storage traits.
#![allow(clippy::needless_raw_string_hashes)]

use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Postgres, Row, Transaction};
use std::sync::Arc;
use std::time::Duration;

use super::repository::{BracketStore, BracketTransaction, TeamRoster};
use super::timeouts::{DEFAULT_QUERY_TIMEOUT, with_timeout};
use crate::bracket::{
    Bracket, BracketError, BracketId, BracketResult, EventId, Match, MatchId, MatchResult,
    MatchStatus, NewBracket, Pairing, RoundTally, TeamId, TournamentProgress,
};

const MATCH_COLUMNS: &str = "id, bracket_id, round_number, match_number, team1_id, team2_id, \
     winner_team_id, team1_score, team2_score, status, match_date, venue";

/// Bracket store backed by a PostgreSQL pool
#[derive(Clone)]
pub struct PgBracketStore {
    pool: Arc<PgPool>,
    query_timeout: Duration,
}

impl PgBracketStore {
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self {
            pool,
            query_timeout: DEFAULT_QUERY_TIMEOUT,
        }
    }

    /// Override the per-query timeout
    pub fn with_query_timeout(mut self, query_timeout: Duration) -> Self {
        self.query_timeout = query_timeout;
        self
    }
}

#[async_trait]
impl BracketStore for PgBracketStore {
    type Tx = PgBracketTransaction;

    async fn begin(&self) -> BracketResult<Self::Tx> {
        let tx = with_timeout(self.query_timeout, self.pool.begin()).await?;
        Ok(PgBracketTransaction {
            tx,
            query_timeout: self.query_timeout,
        })
    }

    async fn health_check(&self) -> BracketResult<()> {
        with_timeout(
            self.query_timeout,
            sqlx::query("SELECT 1").execute(self.pool.as_ref()),
        )
        .await?;
        Ok(())
    }
}

/// An open PostgreSQL transaction; rolled back on drop
pub struct PgBracketTransaction {
    tx: Transaction<'static, Postgres>,
    query_timeout: Duration,
}

fn to_round(value: i32) -> BracketResult<u32> {
    u32::try_from(value)
        .map_err(|_| BracketError::InconsistentState(format!("negative round value {value}")))
}

fn bracket_from_row(row: &PgRow) -> BracketResult<Bracket> {
    let bracket_type: String = row.try_get("bracket_type")?;
    let bracket_type = bracket_type.parse().map_err(|_| {
        BracketError::InconsistentState(format!("unknown stored bracket type '{bracket_type}'"))
    })?;

    Ok(Bracket {
        id: row.try_get("id")?,
        event_id: row.try_get("event_id")?,
        sport_name: row.try_get("sport_name")?,
        bracket_type,
        created_at: row.try_get::<NaiveDateTime, _>("created_at")?.and_utc(),
    })
}

fn progress_from_row(row: &PgRow) -> BracketResult<TournamentProgress> {
    Ok(TournamentProgress {
        bracket_id: row.try_get("bracket_id")?,
        current_round: to_round(row.try_get("current_round")?)?,
        total_rounds: to_round(row.try_get("total_rounds")?)?,
        champion_team_id: row.try_get("champion_team_id")?,
        is_completed: row.try_get("is_completed")?,
    })
}

fn match_from_row(row: &PgRow) -> BracketResult<Match> {
    let status: String = row.try_get("status")?;
    Ok(Match {
        id: row.try_get("id")?,
        bracket_id: row.try_get("bracket_id")?,
        round_number: to_round(row.try_get("round_number")?)?,
        match_number: to_round(row.try_get("match_number")?)?,
        team1_id: row.try_get("team1_id")?,
        team2_id: row.try_get("team2_id")?,
        winner_team_id: row.try_get("winner_team_id")?,
        team1_score: row.try_get("team1_score")?,
        team2_score: row.try_get("team2_score")?,
        status: MatchStatus::from_db(&status),
        match_date: row
            .try_get::<Option<NaiveDateTime>, _>("match_date")?
            .map(|dt| dt.and_utc()),
        venue: row.try_get("venue")?,
    })
}

#[async_trait]
impl BracketTransaction for PgBracketTransaction {
    async fn insert_bracket(&mut self, bracket: &NewBracket) -> BracketResult<Bracket> {
        let row = with_timeout(
            self.query_timeout,
            sqlx::query(
                r#"
                INSERT INTO tournament_brackets (event_id, sport_name, bracket_type)
                VALUES ($1, $2, $3)
                RETURNING id, event_id, sport_name, bracket_type, created_at
                "#,
            )
            .bind(bracket.event_id)
            .bind(&bracket.sport_name)
            .bind(bracket.bracket_type.as_str())
            .fetch_one(&mut *self.tx),
        )
        .await?;

        bracket_from_row(&row)
    }

    async fn find_bracket(&mut self, bracket_id: BracketId) -> BracketResult<Option<Bracket>> {
        let row = with_timeout(
            self.query_timeout,
            sqlx::query(
                r#"
                SELECT id, event_id, sport_name, bracket_type, created_at
                FROM tournament_brackets
                WHERE id = $1
                "#,
            )
            .bind(bracket_id)
            .fetch_optional(&mut *self.tx),
        )
        .await?;

        row.as_ref().map(bracket_from_row).transpose()
    }

    async fn list_event_brackets(&mut self, event_id: EventId) -> BracketResult<Vec<Bracket>> {
        let rows = with_timeout(
            self.query_timeout,
            sqlx::query(
                r#"
                SELECT id, event_id, sport_name, bracket_type, created_at
                FROM tournament_brackets
                WHERE event_id = $1
                ORDER BY created_at DESC, id DESC
                "#,
            )
            .bind(event_id)
            .fetch_all(&mut *self.tx),
        )
        .await?;

        rows.iter().map(bracket_from_row).collect()
    }

    async fn insert_progress(&mut self, progress: &TournamentProgress) -> BracketResult<()> {
        with_timeout(
            self.query_timeout,
            sqlx::query(
                r#"
                INSERT INTO tournament_progress
                    (bracket_id, current_round, total_rounds, champion_team_id, is_completed)
                VALUES ($1, $2, $3, $4, $5)
                "#,
            )
            .bind(progress.bracket_id)
            .bind(progress.current_round as i32)
            .bind(progress.total_rounds as i32)
            .bind(progress.champion_team_id)
            .bind(progress.is_completed)
            .execute(&mut *self.tx),
        )
        .await?;

        Ok(())
    }

    async fn find_progress(
        &mut self,
        bracket_id: BracketId,
    ) -> BracketResult<Option<TournamentProgress>> {
        // Row lock serializes concurrent result recording on the same bracket
        let row = with_timeout(
            self.query_timeout,
            sqlx::query(
                r#"
                SELECT bracket_id, current_round, total_rounds, champion_team_id, is_completed
                FROM tournament_progress
                WHERE bracket_id = $1
                FOR UPDATE
                "#,
            )
            .bind(bracket_id)
            .fetch_optional(&mut *self.tx),
        )
        .await?;

        row.as_ref().map(progress_from_row).transpose()
    }

    async fn set_current_round(&mut self, bracket_id: BracketId, round: u32) -> BracketResult<()> {
        with_timeout(
            self.query_timeout,
            sqlx::query("UPDATE tournament_progress SET current_round = $1 WHERE bracket_id = $2")
                .bind(round as i32)
                .bind(bracket_id)
                .execute(&mut *self.tx),
        )
        .await?;

        Ok(())
    }

    async fn complete_tournament(
        &mut self,
        bracket_id: BracketId,
        champion: TeamId,
    ) -> BracketResult<bool> {
        let result = with_timeout(
            self.query_timeout,
            sqlx::query(
                r#"
                UPDATE tournament_progress
                SET champion_team_id = $1, is_completed = TRUE
                WHERE bracket_id = $2 AND is_completed = FALSE
                "#,
            )
            .bind(champion)
            .bind(bracket_id)
            .execute(&mut *self.tx),
        )
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn insert_matches(
        &mut self,
        bracket_id: BracketId,
        pairings: &[Pairing],
    ) -> BracketResult<u64> {
        let mut inserted = 0;
        for pairing in pairings {
            let result = with_timeout(
                self.query_timeout,
                sqlx::query(
                    r#"
                    INSERT INTO matches
                        (bracket_id, round_number, match_number, team1_id, team2_id, winner_team_id, status)
                    VALUES ($1, $2, $3, $4, $5, $6, $7)
                    "#,
                )
                .bind(bracket_id)
                .bind(pairing.round_number as i32)
                .bind(pairing.match_number as i32)
                .bind(pairing.team1_id)
                .bind(pairing.team2_id)
                .bind(pairing.initial_winner())
                .bind(pairing.initial_status().as_str())
                .execute(&mut *self.tx),
            )
            .await?;
            inserted += result.rows_affected();
        }

        Ok(inserted)
    }

    async fn find_match(&mut self, match_id: MatchId) -> BracketResult<Option<Match>> {
        let sql = format!("SELECT {MATCH_COLUMNS} FROM matches WHERE id = $1");
        let row = with_timeout(
            self.query_timeout,
            sqlx::query(&sql).bind(match_id).fetch_optional(&mut *self.tx),
        )
        .await?;

        row.as_ref().map(match_from_row).transpose()
    }

    async fn list_matches(
        &mut self,
        bracket_id: BracketId,
        round: Option<u32>,
    ) -> BracketResult<Vec<Match>> {
        let sql = format!(
            "SELECT {MATCH_COLUMNS} FROM matches \
             WHERE bracket_id = $1 AND ($2::INT IS NULL OR round_number = $2) \
             ORDER BY round_number, match_number"
        );
        let rows = with_timeout(
            self.query_timeout,
            sqlx::query(&sql)
                .bind(bracket_id)
                .bind(round.map(|r| r as i32))
                .fetch_all(&mut *self.tx),
        )
        .await?;

        rows.iter().map(match_from_row).collect()
    }

    async fn count_matches(
        &mut self,
        bracket_id: BracketId,
        round: Option<u32>,
    ) -> BracketResult<RoundTally> {
        let row = with_timeout(
            self.query_timeout,
            sqlx::query(
                r#"
                SELECT COUNT(*) AS total,
                       COUNT(*) FILTER (WHERE status = 'completed') AS completed
                FROM matches
                WHERE bracket_id = $1 AND ($2::INT IS NULL OR round_number = $2)
                "#,
            )
            .bind(bracket_id)
            .bind(round.map(|r| r as i32))
            .fetch_one(&mut *self.tx),
        )
        .await?;

        let total: i64 = row.try_get("total")?;
        let completed: i64 = row.try_get("completed")?;
        Ok(RoundTally {
            total: total.max(0) as u64,
            completed: completed.max(0) as u64,
        })
    }

    async fn round_winners(
        &mut self,
        bracket_id: BracketId,
        round: u32,
    ) -> BracketResult<Vec<TeamId>> {
        let rows = with_timeout(
            self.query_timeout,
            sqlx::query(
                r#"
                SELECT winner_team_id
                FROM matches
                WHERE bracket_id = $1 AND round_number = $2 AND winner_team_id IS NOT NULL
                ORDER BY match_number
                "#,
            )
            .bind(bracket_id)
            .bind(round as i32)
            .fetch_all(&mut *self.tx),
        )
        .await?;

        rows.iter()
            .map(|row| row.try_get("winner_team_id").map_err(BracketError::from))
            .collect()
    }

    async fn max_round(&mut self, bracket_id: BracketId) -> BracketResult<Option<u32>> {
        let row = with_timeout(
            self.query_timeout,
            sqlx::query("SELECT MAX(round_number) AS max_round FROM matches WHERE bracket_id = $1")
                .bind(bracket_id)
                .fetch_one(&mut *self.tx),
        )
        .await?;

        row.try_get::<Option<i32>, _>("max_round")?
            .map(to_round)
            .transpose()
    }

    async fn record_result(
        &mut self,
        match_id: MatchId,
        result: &MatchResult,
    ) -> BracketResult<bool> {
        let updated = with_timeout(
            self.query_timeout,
            sqlx::query(
                r#"
                UPDATE matches
                SET team1_score = $1, team2_score = $2, winner_team_id = $3, status = 'completed'
                WHERE id = $4 AND status = 'scheduled'
                "#,
            )
            .bind(result.team1_score)
            .bind(result.team2_score)
            .bind(result.winner_team_id)
            .bind(match_id)
            .execute(&mut *self.tx),
        )
        .await?;

        Ok(updated.rows_affected() == 1)
    }

    async fn update_schedule(
        &mut self,
        match_id: MatchId,
        match_date: Option<DateTime<Utc>>,
        venue: Option<&str>,
    ) -> BracketResult<bool> {
        let updated = with_timeout(
            self.query_timeout,
            sqlx::query("UPDATE matches SET match_date = $1, venue = $2 WHERE id = $3")
                .bind(match_date.map(|dt| dt.naive_utc()))
                .bind(venue)
                .bind(match_id)
                .execute(&mut *self.tx),
        )
        .await?;

        Ok(updated.rows_affected() == 1)
    }

    async fn commit(self) -> BracketResult<()> {
        with_timeout(self.query_timeout, self.tx.commit()).await?;
        Ok(())
    }
}

/// Roster lookup against the registration `teams` table
#[derive(Clone)]
pub struct PgTeamRoster {
    pool: Arc<PgPool>,
}

impl PgTeamRoster {
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TeamRoster for PgTeamRoster {
    async fn confirmed_teams(&self, event_id: EventId) -> BracketResult<Vec<TeamId>> {
        let rows = with_timeout(
            DEFAULT_QUERY_TIMEOUT,
            sqlx::query(
                r#"
                SELECT id
                FROM teams
                WHERE event_id = $1 AND status = 'confirmed'
                ORDER BY team_name, id
                "#,
            )
            .bind(event_id)
            .fetch_all(self.pool.as_ref()),
        )
        .await?;

        rows.iter()
            .map(|row| row.try_get("id").map_err(BracketError::from))
            .collect()
    }
}
