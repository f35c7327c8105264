//! Per-query deadlines for bracket storage.

use std::future::Future;
use std::time::Duration;

use crate::bracket::{BracketError, BracketResult};

/// Deadline applied to each query unless configured otherwise
pub const DEFAULT_QUERY_TIMEOUT: Duration = Duration::from_secs(5);

/// Run a sqlx future, failing with `BracketError::Timeout` once `limit` passes
///
/// ```no_run
/// use event_bracket::db::timeouts::{DEFAULT_QUERY_TIMEOUT, with_timeout};
/// # async fn example(pool: &sqlx::PgPool) -> event_bracket::BracketResult<()> {
/// let row = with_timeout(
///     DEFAULT_QUERY_TIMEOUT,
///     sqlx::query("SELECT id FROM matches WHERE id = $1")
///         .bind(1_i64)
///         .fetch_optional(pool),
/// )
/// .await?;
/// # Ok(())
/// # }
/// ```
pub async fn with_timeout<F, T>(limit: Duration, query: F) -> BracketResult<T>
where
    F: Future<Output = Result<T, sqlx::Error>>,
{
    tokio::time::timeout(limit, query)
        .await
        .map_err(|_| BracketError::Timeout(limit))?
        .map_err(BracketError::Database)
}
