//! SQLite-backed pull request store
//!
//! The review state is stored as two mutually-exclusive REAL columns
//! guarded by a schema CHECK; the row mapper refuses rows violating the
//! exclusivity.

use std::sync::Arc;

use async_trait::async_trait;
use repopulse_core::PullRequestStore;
use repopulse_domain::{
    PullRequest, PullRequestState, PullRequestUpsert, RepoPulseError, Result, ReviewState,
};
use rusqlite::{params, Row};
use tokio::task;

use super::manager::DbManager;
use super::{from_ts, opt_from_ts, opt_to_ts, to_ts};
use crate::errors::{map_join_error, InfraError};

const SELECT_COLUMNS: &str = "SELECT id, external_id, number, title, state, created_at, \
     updated_at, closed_at, merged_at, repository_id, author_id, reviews_count, \
     review_latency_hours, review_wait_hours FROM pull_requests";

const UPSERT_SQL: &str = "INSERT INTO pull_requests \
     (external_id, number, title, state, created_at, updated_at, closed_at, merged_at, \
      repository_id, author_id, reviews_count, review_latency_hours, review_wait_hours) \
     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13) \
     ON CONFLICT(external_id) DO UPDATE SET \
     number = excluded.number, title = excluded.title, state = excluded.state, \
     created_at = excluded.created_at, updated_at = excluded.updated_at, \
     closed_at = excluded.closed_at, merged_at = excluded.merged_at, \
     author_id = excluded.author_id, reviews_count = excluded.reviews_count, \
     review_latency_hours = excluded.review_latency_hours, \
     review_wait_hours = excluded.review_wait_hours";

/// SQLite implementation of the pull request store port.
pub struct SqlitePullRequestStore {
    db: Arc<DbManager>,
}

impl SqlitePullRequestStore {
    pub fn new(db: Arc<DbManager>) -> Self {
        Self { db }
    }
}

struct PullRequestRow {
    id: i64,
    external_id: i64,
    number: i64,
    title: String,
    state: String,
    created_at: i64,
    updated_at: i64,
    closed_at: Option<i64>,
    merged_at: Option<i64>,
    repository_id: i64,
    author_id: i64,
    reviews_count: i64,
    review_latency_hours: Option<f64>,
    review_wait_hours: Option<f64>,
}

fn read_row(row: &Row<'_>) -> rusqlite::Result<PullRequestRow> {
    Ok(PullRequestRow {
        id: row.get(0)?,
        external_id: row.get(1)?,
        number: row.get(2)?,
        title: row.get(3)?,
        state: row.get(4)?,
        created_at: row.get(5)?,
        updated_at: row.get(6)?,
        closed_at: row.get(7)?,
        merged_at: row.get(8)?,
        repository_id: row.get(9)?,
        author_id: row.get(10)?,
        reviews_count: row.get(11)?,
        review_latency_hours: row.get(12)?,
        review_wait_hours: row.get(13)?,
    })
}

impl PullRequestRow {
    fn into_domain(self) -> Result<PullRequest> {
        let review = match (self.review_latency_hours, self.review_wait_hours) {
            (Some(latency_hours), None) => ReviewState::Reviewed { latency_hours },
            (None, Some(wait_hours)) => ReviewState::Unreviewed { wait_hours },
            _ => {
                return Err(RepoPulseError::Database(format!(
                    "pull request {} has inconsistent review columns",
                    self.external_id
                )))
            }
        };
        Ok(PullRequest {
            id: self.id,
            external_id: self.external_id,
            number: self.number,
            title: self.title,
            state: PullRequestState::parse(&self.state)?,
            created_at: from_ts(self.created_at)?,
            updated_at: from_ts(self.updated_at)?,
            closed_at: opt_from_ts(self.closed_at)?,
            merged_at: opt_from_ts(self.merged_at)?,
            repository_id: self.repository_id,
            author_id: self.author_id,
            reviews_count: self.reviews_count,
            review,
        })
    }
}

#[async_trait]
impl PullRequestStore for SqlitePullRequestStore {
    async fn upsert(&self, upsert: &PullRequestUpsert) -> Result<()> {
        let db = Arc::clone(&self.db);
        let upsert = upsert.clone();
        task::spawn_blocking(move || {
            let conn = db.get_connection()?;
            conn.execute(
                UPSERT_SQL,
                params![
                    upsert.external_id,
                    upsert.number,
                    upsert.title,
                    upsert.state.as_str(),
                    to_ts(upsert.created_at),
                    to_ts(upsert.updated_at),
                    opt_to_ts(upsert.closed_at),
                    opt_to_ts(upsert.merged_at),
                    upsert.repository_id,
                    upsert.author_id,
                    upsert.reviews_count,
                    upsert.review.latency_hours(),
                    upsert.review.wait_hours(),
                ],
            )
            .map_err(InfraError::from)?;
            Ok(())
        })
        .await
        .map_err(map_join_error)?
    }

    async fn list_for_repository(&self, repository_id: i64) -> Result<Vec<PullRequest>> {
        let db = Arc::clone(&self.db);
        task::spawn_blocking(move || {
            let conn = db.get_connection()?;
            let sql = format!("{SELECT_COLUMNS} WHERE repository_id = ?1 ORDER BY created_at DESC");
            let mut stmt = conn.prepare(&sql).map_err(InfraError::from)?;
            let rows = stmt
                .query_map(params![repository_id], read_row)
                .map_err(InfraError::from)?
                .collect::<rusqlite::Result<Vec<_>>>()
                .map_err(InfraError::from)?;
            rows.into_iter().map(PullRequestRow::into_domain).collect()
        })
        .await
        .map_err(map_join_error)?
    }

    async fn count_for_repository(&self, repository_id: i64) -> Result<i64> {
        let db = Arc::clone(&self.db);
        task::spawn_blocking(move || {
            let conn = db.get_connection()?;
            conn.query_row(
                "SELECT COUNT(*) FROM pull_requests WHERE repository_id = ?1",
                params![repository_id],
                |row| row.get(0),
            )
            .map_err(|err| RepoPulseError::from(InfraError::from(err)))
        })
        .await
        .map_err(map_join_error)?
    }
}
