//! SQLite-backed issue store

use std::sync::Arc;

use async_trait::async_trait;
use repopulse_core::IssueStore;
use repopulse_domain::{Issue, IssueState, IssueUpsert, RepoPulseError, Result};
use rusqlite::{params, Row};
use tokio::task;

use super::manager::DbManager;
use super::{from_ts, opt_from_ts, opt_to_ts, to_ts};
use crate::errors::{map_join_error, InfraError};

const SELECT_COLUMNS: &str = "SELECT id, external_id, number, title, state, created_at, \
     updated_at, closed_at, repository_id, author_id, comments_count, \
     has_maintainer_response, time_to_first_response FROM issues";

const UPSERT_SQL: &str = "INSERT INTO issues \
     (external_id, number, title, state, created_at, updated_at, closed_at, repository_id, \
      author_id, comments_count, has_maintainer_response, time_to_first_response) \
     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12) \
     ON CONFLICT(external_id) DO UPDATE SET \
     number = excluded.number, title = excluded.title, state = excluded.state, \
     created_at = excluded.created_at, updated_at = excluded.updated_at, \
     closed_at = excluded.closed_at, author_id = excluded.author_id, \
     comments_count = excluded.comments_count, \
     has_maintainer_response = excluded.has_maintainer_response, \
     time_to_first_response = excluded.time_to_first_response";

/// SQLite implementation of the issue store port.
pub struct SqliteIssueStore {
    db: Arc<DbManager>,
}

impl SqliteIssueStore {
    pub fn new(db: Arc<DbManager>) -> Self {
        Self { db }
    }
}

struct IssueRow {
    id: i64,
    external_id: i64,
    number: i64,
    title: String,
    state: String,
    created_at: i64,
    updated_at: i64,
    closed_at: Option<i64>,
    repository_id: i64,
    author_id: i64,
    comments_count: i64,
    has_maintainer_response: bool,
    time_to_first_response: Option<f64>,
}

fn read_row(row: &Row<'_>) -> rusqlite::Result<IssueRow> {
    Ok(IssueRow {
        id: row.get(0)?,
        external_id: row.get(1)?,
        number: row.get(2)?,
        title: row.get(3)?,
        state: row.get(4)?,
        created_at: row.get(5)?,
        updated_at: row.get(6)?,
        closed_at: row.get(7)?,
        repository_id: row.get(8)?,
        author_id: row.get(9)?,
        comments_count: row.get(10)?,
        has_maintainer_response: row.get(11)?,
        time_to_first_response: row.get(12)?,
    })
}

impl IssueRow {
    fn into_domain(self) -> Result<Issue> {
        Ok(Issue {
            id: self.id,
            external_id: self.external_id,
            number: self.number,
            title: self.title,
            state: IssueState::parse(&self.state)?,
            created_at: from_ts(self.created_at)?,
            updated_at: from_ts(self.updated_at)?,
            closed_at: opt_from_ts(self.closed_at)?,
            repository_id: self.repository_id,
            author_id: self.author_id,
            comments_count: self.comments_count,
            has_maintainer_response: self.has_maintainer_response,
            time_to_first_response: self.time_to_first_response,
        })
    }
}

#[async_trait]
impl IssueStore for SqliteIssueStore {
    async fn upsert(&self, upsert: &IssueUpsert) -> Result<()> {
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
                    upsert.repository_id,
                    upsert.author_id,
                    upsert.comments_count,
                    upsert.has_maintainer_response,
                    upsert.time_to_first_response,
                ],
            )
            .map_err(InfraError::from)?;
            Ok(())
        })
        .await
        .map_err(map_join_error)?
    }

    async fn list_for_repository(&self, repository_id: i64) -> Result<Vec<Issue>> {
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
            rows.into_iter().map(IssueRow::into_domain).collect()
        })
        .await
        .map_err(map_join_error)?
    }

    async fn count_for_repository(&self, repository_id: i64) -> Result<i64> {
        let db = Arc::clone(&self.db);
        task::spawn_blocking(move || {
            let conn = db.get_connection()?;
            conn.query_row(
                "SELECT COUNT(*) FROM issues WHERE repository_id = ?1",
                params![repository_id],
                |row| row.get(0),
            )
            .map_err(|err| RepoPulseError::from(InfraError::from(err)))
        })
        .await
        .map_err(map_join_error)?
    }
}
